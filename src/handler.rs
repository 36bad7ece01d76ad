use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::signal::CanSignal;

/// Post-processing applied to a decoded signal value before it is forwarded.
///
/// The one byte representation is the code used in static signal
/// configuration tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = HandlerParseError, constructor = HandlerParseError::UnrecognizedHandler))]
#[repr(u8)]
pub enum ValueHandler {
    /// Forward the scaled number unchanged
    #[default]
    Passthrough = b'P',
    /// Translate the number to one of the signal's state names
    State = b'S',
    /// Forward `true` for any non-zero value
    Boolean = b'B',
    /// Track the value but never forward it
    Ignore = b'I',
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerParseError {
    #[error("Received a value handler with an unrecognized specifier ({0:?})")]
    UnrecognizedHandler(u8),
}

/// A signal value in the form it is sent to the host
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalValue {
    Number(f32),
    Boolean(bool),
    State(&'static str),
}

/// Outcome of running a value handler
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handled {
    /// The transformed value, `None` when the handler could not produce one
    pub value: Option<SignalValue>,
    /// Whether the handler wants the value forwarded
    pub send: bool,
}

impl Handled {
    const fn send(value: SignalValue) -> Self {
        Self {
            value: Some(value),
            send: true,
        }
    }
}

impl ValueHandler {
    /// Runs the handler for `signals[index]`. The whole table is passed so
    /// that handlers can consult sibling signals. `index` must be in bounds.
    pub(crate) fn apply(self, signals: &mut [CanSignal], index: usize, value: f32) -> Handled {
        match self {
            Self::State => state_handler(&signals[index], value),
            Self::Boolean => Handled::send(SignalValue::Boolean(value != 0.0)),
            Self::Ignore => {
                signals[index].set_last_value(value);

                Handled {
                    value: Some(SignalValue::Number(value)),
                    send: false,
                }
            }
            Self::Passthrough => Handled::send(SignalValue::Number(value)),
        }
    }
}

fn state_handler(signal: &CanSignal, value: f32) -> Handled {
    match signal.state_name(round(value)) {
        Some(name) => Handled::send(SignalValue::State(name)),
        None => Handled {
            value: None,
            send: false,
        },
    }
}

/// Rounds half away from zero. `f32::round` lives in `std`.
fn round(value: f32) -> i32 {
    if value >= 0.0 {
        (value + 0.5) as i32
    } else {
        (value - 0.5) as i32
    }
}
