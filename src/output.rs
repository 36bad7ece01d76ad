use core::fmt::Write;

use heapless::{String, Vec};

use crate::{
    handler::SignalValue,
    table::TranslatedSignal,
    usb::{UsbBus, UsbDevice},
    MAX_MESSAGE_SIZE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    #[error("Serialized signal ({0:?}) does not fit in one message")]
    TooLong(&'static str),
    #[error("Message needs ({0:?}) bytes but the send queue only has ({1:?}) free")]
    NoRoom(usize, usize),
}

impl TranslatedSignal {
    /// Serializes the signal as one JSON line, e.g.
    /// `{"name":"engine_speed","value":1200}\r\n`.
    ///
    /// Non-finite numbers are written as `null`.
    pub fn as_bytes(&self) -> Result<Vec<u8, MAX_MESSAGE_SIZE>, OutputError> {
        let mut line: String<MAX_MESSAGE_SIZE> = String::new();

        self.write_json(&mut line)
            .map_err(|_| OutputError::TooLong(self.name))?;

        Ok(line.into_bytes())
    }

    fn write_json(&self, out: &mut impl Write) -> core::fmt::Result {
        write!(out, "{{\"name\":\"{}\",\"value\":", self.name)?;

        match self.value {
            SignalValue::Number(number) if number.is_finite() => write!(out, "{}", number)?,
            SignalValue::Number(_) => out.write_str("null")?,
            SignalValue::Boolean(boolean) => write!(out, "{}", boolean)?,
            SignalValue::State(state) => write!(out, "\"{}\"", state)?,
        }

        out.write_str("}\r\n")
    }
}

impl<B: UsbBus, const N: usize> UsbDevice<B, N> {
    /// Serializes a signal and queues it for the host. Nothing is queued
    /// unless the whole message fits.
    pub fn send_signal(&mut self, signal: &TranslatedSignal) -> Result<(), OutputError> {
        let bytes = signal.as_bytes()?;
        let free = self.send_queue().capacity() - self.send_queue().len();

        if bytes.len() > free {
            return Err(OutputError::NoRoom(bytes.len(), free));
        }

        self.send(&bytes)
            .map_err(|_| OutputError::NoRoom(bytes.len(), free))
    }
}
