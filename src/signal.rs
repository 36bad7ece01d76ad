use embedded_can::Id;

use crate::{
    bits::{check_range, extract_bits, BitRangeError},
    handler::ValueHandler,
};

/// Maps one integer value of a state-encoded signal to its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalState {
    pub value: i32,
    pub name: &'static str,
}

impl SignalState {
    pub const fn new(value: i32, name: &'static str) -> Self {
        Self { value, name }
    }
}

/// A signal to decode from the bus and forward to the host.
///
/// Built once from static configuration. Only the decode path touches the
/// runtime fields (`last_value`, `received` and the send clock).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanSignal {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: Id,
    name: &'static str,
    bit_position: u8,
    bit_size: u8,
    factor: f32,
    offset: f32,
    min_value: f32,
    max_value: f32,
    send_frequency: u16,
    send_clock: u16,
    send_same: bool,
    received: bool,
    states: &'static [SignalState],
    handler: ValueHandler,
    last_value: f32,
}

impl CanSignal {
    /// Creates a passthrough signal with a factor of 1, no offset, unbounded
    /// range, sent on every frame but only when its value changes.
    pub fn new(id: impl Into<Id>, name: &'static str, bit_position: u8, bit_size: u8) -> Self {
        Self {
            id: id.into(),
            name,
            bit_position,
            bit_size,
            factor: 1.0,
            offset: 0.0,
            min_value: f32::MIN,
            max_value: f32::MAX,
            send_frequency: 1,
            send_clock: 0,
            send_same: false,
            received: false,
            states: &[],
            handler: ValueHandler::Passthrough,
            last_value: 0.0,
        }
    }

    pub fn with_scaling(mut self, factor: f32, offset: f32) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    pub fn with_range(mut self, min_value: f32, max_value: f32) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    /// Only every `send_frequency`th decoded frame may be forwarded. 0 and 1
    /// both mean every frame.
    pub fn with_send_frequency(mut self, send_frequency: u16) -> Self {
        self.send_frequency = send_frequency;
        self
    }

    pub fn with_send_same(mut self, send_same: bool) -> Self {
        self.send_same = send_same;
        self
    }

    pub fn with_handler(mut self, handler: ValueHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Attaches state names and switches the signal to the state handler.
    pub fn with_states(mut self, states: &'static [SignalState]) -> Self {
        self.states = states;
        self.handler = ValueHandler::State;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bit_position(&self) -> u8 {
        self.bit_position
    }

    pub fn bit_size(&self) -> u8 {
        self.bit_size
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn send_frequency(&self) -> u16 {
        self.send_frequency
    }

    pub fn send_same(&self) -> bool {
        self.send_same
    }

    /// Whether a value has ever been decoded for this signal
    pub fn received(&self) -> bool {
        self.received
    }

    pub fn states(&self) -> &'static [SignalState] {
        self.states
    }

    pub fn handler(&self) -> ValueHandler {
        self.handler
    }

    /// The value decoded from the most recent frame carrying this signal
    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    pub(crate) fn set_last_value(&mut self, value: f32) {
        self.last_value = value;
    }

    /// Records a decoded value, whether or not it was forwarded.
    pub(crate) fn record(&mut self, value: f32) {
        self.last_value = value;
        self.received = true;
    }

    /// Advances the send clock by one decoded frame and reports whether this
    /// frame is allowed to be forwarded.
    pub(crate) fn tick_send_clock(&mut self) -> bool {
        if self.send_frequency <= 1 {
            return true;
        }

        if self.send_clock >= self.send_frequency - 1 {
            self.send_clock = 0;
            true
        } else {
            self.send_clock += 1;
            false
        }
    }

    /// Looks up the name mapped to an integer state value.
    pub fn state_name(&self, value: i32) -> Option<&'static str> {
        self.states
            .iter()
            .find(|state| state.value == value)
            .map(|state| state.name)
    }

    /// Extracts the raw bits of this signal from a payload and scales them.
    /// The result is not clamped to the signal's range.
    pub fn decode(&self, data: &[u8; 8]) -> Result<f32, SignalError> {
        let raw = extract_bits(data, self.bit_position, self.bit_size)?;

        Ok(raw as f32 * self.factor + self.offset)
    }

    /// Checks the configuration invariants of a single signal.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.name.is_empty() {
            return Err(SignalError::EmptyName);
        }

        check_range(self.bit_position, self.bit_size)?;

        if self.min_value > self.max_value {
            return Err(SignalError::InvalidRange(self.name));
        }

        match (self.handler, self.states.is_empty()) {
            (ValueHandler::State, true) => Err(SignalError::MissingStates(self.name)),
            (ValueHandler::State, false) | (_, true) => Ok(()),
            (_, false) => Err(SignalError::UnexpectedStates(self.name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalError {
    #[error("Tried to configure a signal without a name")]
    EmptyName,
    #[error("Tried to configure a second signal named ({0:?})")]
    DuplicateName(&'static str),
    #[error("Signal ({0:?}) has a minimum value above its maximum value")]
    InvalidRange(&'static str),
    #[error("Signal ({0:?}) uses the state handler but has no states")]
    MissingStates(&'static str),
    #[error("Signal ({0:?}) has states but does not use the state handler")]
    UnexpectedStates(&'static str),
    #[error("The signal table is full")]
    TableFull,
    #[error("Signal occupies an invalid bit range")]
    InvalidBitRange(#[from] BitRangeError),
}
