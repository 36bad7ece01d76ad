use embedded_can::{Frame, Id};
use heapless::Vec;

use crate::{
    frame::payload_of,
    handler::SignalValue,
    signal::{CanSignal, SignalError},
};

/// A decoded signal that passed every send check and should go to the host
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TranslatedSignal {
    pub name: &'static str,
    pub value: SignalValue,
}

/// The configured set of signals, holding up to `N` entries.
///
/// Lookups are linear scans: tables are small and configured once at
/// startup.
#[derive(Debug, Clone, Default)]
pub struct SignalTable<const N: usize> {
    signals: Vec<CanSignal, N>,
}

impl<const N: usize> SignalTable<N> {
    pub const fn new() -> Self {
        Self { signals: Vec::new() }
    }

    /// Validates a signal and appends it to the table.
    pub fn add(&mut self, signal: CanSignal) -> Result<(), SignalError> {
        signal.validate()?;

        if self.lookup_by_name(signal.name()).is_some() {
            return Err(SignalError::DuplicateName(signal.name()));
        }

        self.signals
            .push(signal)
            .map_err(|_| SignalError::TableFull)
    }

    /// Builds a table from a list of signals, stopping at the first invalid one.
    pub fn from_signals(
        signals: impl IntoIterator<Item = CanSignal>,
    ) -> Result<Self, SignalError> {
        let mut table = Self::new();

        for signal in signals {
            table.add(signal)?;
        }

        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanSignal> {
        self.signals.iter()
    }

    /// Finds a signal by its exact, case sensitive name.
    pub fn lookup_by_name(&self, name: &str) -> Option<&CanSignal> {
        self.signals.iter().find(|signal| signal.name() == name)
    }

    /// Finds the first signal carried by frames with the given identifier.
    pub fn lookup_by_id(&self, id: Id) -> Option<&CanSignal> {
        self.signals.iter().find(|signal| signal.id() == id)
    }

    /// Every signal carried by frames with the given identifier
    pub fn signals_for_id(&self, id: Id) -> impl Iterator<Item = &CanSignal> {
        self.signals.iter().filter(move |signal| signal.id() == id)
    }

    /// Decodes every signal carried by `frame`, handing each one that should
    /// be forwarded to `on_signal`. Returns how many were forwarded.
    ///
    /// Remote frames and frames with more than 8 data bytes carry no signals.
    pub fn translate<F: Frame>(
        &mut self,
        frame: &F,
        mut on_signal: impl FnMut(TranslatedSignal),
    ) -> Result<usize, SignalError> {
        let Some(payload) = payload_of(frame) else {
            return Ok(0);
        };

        let id = frame.id();
        let mut forwarded = 0;

        for index in 0..self.signals.len() {
            if self.signals[index].id() != id {
                continue;
            }

            if let Some(translated) = self.translate_signal(index, &payload)? {
                on_signal(translated);
                forwarded += 1;
            }
        }

        Ok(forwarded)
    }

    fn translate_signal(
        &mut self,
        index: usize,
        payload: &[u8; 8],
    ) -> Result<Option<TranslatedSignal>, SignalError> {
        let value = self.signals[index].decode(payload)?;
        let handler = self.signals[index].handler();
        let handled = handler.apply(&mut self.signals, index, value);

        let signal = &mut self.signals[index];
        let due = signal.tick_send_clock();
        let changed = signal.send_same() || !signal.received() || signal.last_value() != value;
        signal.record(value);

        match handled.value {
            Some(value) if handled.send && due && changed => Ok(Some(TranslatedSignal {
                name: signal.name(),
                value,
            })),
            _ => {
                debug!("Suppressed signal {}", signal.name());
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_can::{ExtendedId, StandardId};
    use heapless::Vec;

    use super::*;
    use crate::{
        bits::BitRangeError,
        frame::CanMessage,
        handler::ValueHandler,
        signal::SignalState,
    };

    const DOOR_STATES: &[SignalState] = &[SignalState::new(0, "closed"), SignalState::new(1, "open")];

    fn engine_id() -> StandardId {
        StandardId::new(0x100).unwrap()
    }

    fn body_id() -> StandardId {
        StandardId::new(0x200).unwrap()
    }

    fn table() -> SignalTable<8> {
        SignalTable::from_signals([
            CanSignal::new(engine_id(), "EngineSpeed", 0, 16).with_scaling(0.25, 0.0),
            CanSignal::new(engine_id(), "EngineRunning", 16, 1)
                .with_handler(ValueHandler::Boolean)
                .with_send_same(true),
            CanSignal::new(engine_id(), "EngineCounter", 24, 8).with_handler(ValueHandler::Ignore),
            CanSignal::new(body_id(), "DoorStatus", 0, 2).with_states(DOOR_STATES),
        ])
        .unwrap()
    }

    fn translate_all<const N: usize>(
        table: &mut SignalTable<N>,
        frame: &CanMessage,
    ) -> Vec<TranslatedSignal, N> {
        let mut out = Vec::new();
        table
            .translate(frame, |signal| out.push(signal).unwrap())
            .unwrap();
        out
    }

    #[test]
    fn lookup_by_name_is_exact() {
        let table = table();

        assert_eq!(
            table.lookup_by_name("EngineSpeed").map(CanSignal::bit_size),
            Some(16)
        );
        assert!(table.lookup_by_name("enginespeed").is_none());
        assert!(table.lookup_by_name("Engine").is_none());
        assert!(table.lookup_by_name("").is_none());
    }

    #[test]
    fn lookup_by_id() {
        let table = table();

        assert_eq!(
            table.lookup_by_id(body_id().into()).map(CanSignal::name),
            Some("DoorStatus")
        );
        assert_eq!(
            table.lookup_by_id(engine_id().into()).map(CanSignal::name),
            Some("EngineSpeed")
        );
        assert!(table
            .lookup_by_id(ExtendedId::new(0x100).unwrap().into())
            .is_none());
        assert_eq!(table.signals_for_id(engine_id().into()).count(), 3);
    }

    #[test]
    fn add_rejects_invalid_signals() {
        let mut table = SignalTable::<2>::new();

        assert_eq!(table.add(CanSignal::new(engine_id(), "a", 0, 8)), Ok(()));
        assert_eq!(
            table.add(CanSignal::new(engine_id(), "a", 8, 8)),
            Err(SignalError::DuplicateName("a"))
        );
        assert_eq!(
            table.add(CanSignal::new(engine_id(), "b", 63, 2)),
            Err(SignalError::InvalidBitRange(BitRangeError::OutOfRange(63, 2)))
        );
        assert_eq!(table.add(CanSignal::new(engine_id(), "b", 8, 8)), Ok(()));
        assert_eq!(
            table.add(CanSignal::new(engine_id(), "c", 16, 8)),
            Err(SignalError::TableFull)
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn translates_frame_signals() {
        let mut table = table();
        let frame = CanMessage::new(engine_id(), &[0x0F, 0xA0, 0x80, 0x07]).unwrap();

        assert_eq!(
            translate_all(&mut table, &frame).as_slice(),
            &[
                TranslatedSignal {
                    name: "EngineSpeed",
                    value: SignalValue::Number(1000.0)
                },
                TranslatedSignal {
                    name: "EngineRunning",
                    value: SignalValue::Boolean(true)
                },
            ]
        );

        let counter = table.lookup_by_name("EngineCounter").unwrap();
        assert!(counter.received());
        assert_eq!(counter.last_value(), 7.0);
        assert!(!table.lookup_by_name("DoorStatus").unwrap().received());
    }

    #[test]
    fn unchanged_values_are_suppressed() {
        let mut table = table();
        let frame = CanMessage::new(engine_id(), &[0x00, 0x04, 0x00, 0x00]).unwrap();

        let first = translate_all(&mut table, &frame);
        assert!(first.iter().any(|signal| signal.name == "EngineSpeed"));

        let second = translate_all(&mut table, &frame);
        assert!(second.iter().all(|signal| signal.name != "EngineSpeed"));
        // send_same keeps forwarding
        assert!(second.iter().any(|signal| signal.name == "EngineRunning"));

        let changed = CanMessage::new(engine_id(), &[0x00, 0x08, 0x00, 0x00]).unwrap();
        assert_eq!(
            translate_all(&mut table, &changed).first(),
            Some(&TranslatedSignal {
                name: "EngineSpeed",
                value: SignalValue::Number(2.0)
            })
        );
    }

    #[test]
    fn first_receipt_always_sends() {
        let mut table = SignalTable::<1>::from_signals([CanSignal::new(engine_id(), "Zero", 0, 8)]).unwrap();
        let frame = CanMessage::new(engine_id(), &[0]).unwrap();

        // last_value starts at 0.0, but the signal was never received
        assert_eq!(table.translate(&frame, |_| {}), Ok(1));
        assert_eq!(table.translate(&frame, |_| {}), Ok(0));
    }

    #[test]
    fn unknown_states_are_dropped() {
        let mut table = table();

        let open = CanMessage::new(body_id(), &[0b0100_0000]).unwrap();
        assert_eq!(
            translate_all(&mut table, &open).as_slice(),
            &[TranslatedSignal {
                name: "DoorStatus",
                value: SignalValue::State("open")
            }]
        );

        let unknown = CanMessage::new(body_id(), &[0b1100_0000]).unwrap();
        assert!(translate_all(&mut table, &unknown).is_empty());
        assert!(table.lookup_by_name("DoorStatus").unwrap().received());
        assert_eq!(table.lookup_by_name("DoorStatus").unwrap().last_value(), 3.0);
    }

    #[test]
    fn send_frequency_skips_frames() {
        let mut table = SignalTable::<1>::from_signals([CanSignal::new(engine_id(), "Throttled", 0, 8)
            .with_send_frequency(2)
            .with_send_same(true)])
        .unwrap();
        let frame = CanMessage::new(engine_id(), &[1]).unwrap();

        let sent: [usize; 4] = core::array::from_fn(|_| table.translate(&frame, |_| {}).unwrap());
        assert_eq!(sent, [0, 1, 0, 1]);
    }

    #[test]
    fn ignores_other_and_remote_frames() {
        let mut table = table();

        let other = CanMessage::new(StandardId::new(0x300).unwrap(), &[0xFF; 8]).unwrap();
        assert_eq!(table.translate(&other, |_| {}), Ok(0));

        let remote = CanMessage::new_remote(engine_id(), 8).unwrap();
        assert_eq!(table.translate(&remote, |_| {}), Ok(0));
        assert!(table.iter().all(|signal| !signal.received()));
    }
}
