#![no_std]

//! Decodes CAN signals and relays them to a USB host.
//!
//! ```text
//! CanMessage -> SignalTable::translate -> TranslatedSignal -> UsbDevice::send_signal
//!                                                                  |
//!                                          UsbDevice::process_send_queue -> UsbBus
//! UsbBus -> UsbDevice::read_from_host -> callback
//! ```

#[macro_use]
mod fmt;

mod bits;
mod filter;
mod frame;
mod handler;
mod output;
mod queue;
mod signal;
mod table;
mod usb;

const CAN_PAYLOAD_BYTES: usize = 8;
const CAN_PAYLOAD_BITS: usize = CAN_PAYLOAD_BYTES * 8;

/// Largest chunk handed to the USB peripheral in one write
pub const USB_PACKET_SIZE: usize = 64;
/// Bytes taken from the send queue per drain step
pub const USB_SEND_BUFFER_SIZE: usize = 64;

/// Longest serialized signal message
pub const MAX_MESSAGE_SIZE: usize = 128;

pub use bits::*;
pub use filter::*;
pub use frame::*;
pub use handler::*;
pub use output::*;
pub use queue::*;
pub use signal::*;
pub use table::*;
pub use usb::*;

pub use embedded_can::{ExtendedId, Frame, Id, StandardId};
