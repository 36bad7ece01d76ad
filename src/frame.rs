use embedded_can::{Frame, Id};

use crate::CAN_PAYLOAD_BYTES;

/// A classic CAN frame as delivered by the bus driver.
///
/// The payload is always stored as a full 8 bytes, zero padded past the DLC,
/// which is the layout the signal decoder reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanMessage {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: Id,
    dlc: usize,
    remote: bool,
    data: [u8; CAN_PAYLOAD_BYTES],
}

impl CanMessage {
    /// The full zero padded payload, regardless of DLC
    pub fn payload(&self) -> &[u8; CAN_PAYLOAD_BYTES] {
        &self.data
    }
}

impl Frame for CanMessage {
    /// Creates a data frame. `data` must be at most 8 bytes long or else
    /// `None` will be returned instead.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CAN_PAYLOAD_BYTES {
            return None;
        }

        let mut copy = [0u8; CAN_PAYLOAD_BYTES];
        copy[..data.len()].copy_from_slice(data);

        Some(Self {
            id: id.into(),
            dlc: data.len(),
            remote: false,
            data: copy,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CAN_PAYLOAD_BYTES {
            return None;
        }

        Some(Self {
            id: id.into(),
            dlc,
            remote: true,
            data: [0; CAN_PAYLOAD_BYTES],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc]
        }
    }
}

/// Copies the data of any frame into a zero padded 8 byte payload. Remote
/// frames and frames with more than 8 data bytes have no such payload.
pub fn payload_of(frame: &impl Frame) -> Option<[u8; CAN_PAYLOAD_BYTES]> {
    let data = frame.data();

    if frame.is_remote_frame() || data.len() > CAN_PAYLOAD_BYTES {
        return None;
    }

    let mut payload = [0u8; CAN_PAYLOAD_BYTES];
    payload[..data.len()].copy_from_slice(data);

    Some(payload)
}
