//! Moves bytes between the application and the USB peripheral.
//!
//! Outbound data is queued with [`UsbDevice::send`] and drained by
//! [`UsbDevice::process_send_queue`] from the main loop. Inbound data is
//! polled with [`UsbDevice::read_from_host`], which buffers what the host
//! wrote and hands it to a processing callback.

use crate::{
    queue::{process_queue, ByteQueue, QueueFull},
    USB_PACKET_SIZE, USB_SEND_BUFFER_SIZE,
};

/// Polls of a busy IN endpoint before the host is presumed absent
pub const DEFAULT_RETRY_LIMIT: u32 = 50_000;

/// The narrow view of the USB peripheral driver the transfer engine needs.
///
/// Transfers are asynchronous: `write` and `read` start a transfer and return
/// a handle that stays busy until the hardware has finished with it.
pub trait UsbBus {
    type Handle: Copy;

    fn enable_endpoint(&mut self, endpoint: u8, direction: EndpointDirection);

    fn is_busy(&self, handle: Self::Handle) -> bool;

    /// Starts sending `data` to the host. The driver must not keep a
    /// reference to `data` past this call.
    fn write(&mut self, endpoint: u8, data: &[u8]) -> Self::Handle;

    /// Arms the endpoint to receive up to `len` bytes from the host.
    fn read(&mut self, endpoint: u8, len: usize) -> Self::Handle;

    /// Bytes delivered by a finished read. Empty if the host sent nothing.
    fn received(&self, handle: Self::Handle) -> &[u8];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointDirection {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// Events raised by the USB stack outside of the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbEvent {
    /// The host selected a configuration, endpoints may now be used
    Configured,
    /// The host issued a vendor request on the control endpoint
    ControlRequest(u8),
    /// Bus reset, suspend or anything else the core stack handles itself
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbConfig {
    pub in_endpoint: u8,
    pub out_endpoint: u8,
    /// Size of a single host to device transfer
    pub out_endpoint_size: usize,
    /// Largest chunk handed to a single write
    pub packet_size: usize,
    /// Busy polls allowed before a drain gives up
    pub retry_limit: u32,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            in_endpoint: 1,
            out_endpoint: 1,
            out_endpoint_size: USB_PACKET_SIZE,
            packet_size: USB_PACKET_SIZE,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

/// Result of draining the send queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drain {
    /// The queue is empty
    Complete { sent: usize },
    /// The host stopped accepting data; the rest stays queued
    Deferred { sent: usize, pending: usize },
}

/// Result of polling for host writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Read {
    /// The previous read is still in progress
    Pending,
    /// The read finished and a new one was armed
    Rearmed {
        received: usize,
        dropped: usize,
        consumed: bool,
    },
}

/// A USB device with one queue per direction.
///
/// `N` is the capacity of each queue.
pub struct UsbDevice<B: UsbBus, const N: usize> {
    bus: B,
    config: UsbConfig,
    configured: bool,
    send_queue: ByteQueue<N>,
    receive_queue: ByteQueue<N>,
    device_to_host: Option<B::Handle>,
    host_to_device: Option<B::Handle>,
    dropped: usize,
}

impl<B: UsbBus, const N: usize> UsbDevice<B, N> {
    pub fn new(bus: B, config: UsbConfig) -> Self {
        debug!("Initializing USB");

        Self {
            bus,
            config,
            configured: false,
            send_queue: ByteQueue::new(),
            receive_queue: ByteQueue::new(),
            device_to_host: None,
            host_to_device: None,
            dropped: 0,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn config(&self) -> &UsbConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn send_queue(&self) -> &ByteQueue<N> {
        &self.send_queue
    }

    pub fn receive_queue(&self) -> &ByteQueue<N> {
        &self.receive_queue
    }

    /// Host bytes dropped so far because the receive queue was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Reacts to a USB stack event. Vendor control requests are handed back
    /// to the caller for dispatch.
    pub fn handle_event(&mut self, event: UsbEvent) -> Option<u8> {
        match event {
            UsbEvent::Configured => {
                debug!("USB configured");
                self.configured = true;
                self.bus
                    .enable_endpoint(self.config.in_endpoint, EndpointDirection::In);
                self.bus
                    .enable_endpoint(self.config.out_endpoint, EndpointDirection::Out);
                None
            }
            UsbEvent::ControlRequest(request) => Some(request),
            UsbEvent::Other => None,
        }
    }

    /// Queues bytes for the host. Stops at the first byte that does not fit;
    /// the bytes before it stay queued.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), QueueFull> {
        bytes.iter().try_for_each(|byte| self.send_queue.push(*byte))
    }

    fn write_busy(&self) -> bool {
        self.device_to_host
            .is_some_and(|handle| self.bus.is_busy(handle))
    }

    /// Waits for the previous write to finish, giving up after the retry
    /// limit.
    fn wait_for_host(&self) -> bool {
        let mut polls = 0;

        while self.write_busy() {
            polls += 1;

            if polls > self.config.retry_limit {
                return false;
            }
        }

        true
    }

    /// Drains the send queue to the IN endpoint, one packet at a time.
    ///
    /// If the host has not configured the device or stops reading, the drain
    /// returns early instead of blocking the main loop and leaves the
    /// remaining bytes queued.
    pub fn process_send_queue(&mut self) -> Drain {
        let mut sent = 0;

        while !self.send_queue.is_empty() {
            if !self.configured || !self.wait_for_host() {
                debug!("USB host not reading, deferring {} bytes", self.send_queue.len());

                return Drain::Deferred {
                    sent,
                    pending: self.send_queue.len(),
                };
            }

            let mut buffer = [0u8; USB_SEND_BUFFER_SIZE];
            let mut count = 0;

            while count < buffer.len() {
                match self.send_queue.pop() {
                    Some(byte) => {
                        buffer[count] = byte;
                        count += 1;
                    }
                    None => break,
                }
            }

            self.write_buffer(&buffer[..count]);
            sent += count;
        }

        Drain::Complete { sent }
    }

    /// Writes an already dequeued buffer in packet sized chunks. Once started
    /// the buffer has to go out in full, so this waits without a limit.
    fn write_buffer(&mut self, buffer: &[u8]) {
        let packet_size = self.config.packet_size.max(1);

        for chunk in buffer.chunks(packet_size) {
            while self.write_busy() {}

            self.device_to_host = Some(self.bus.write(self.config.in_endpoint, chunk));
        }
    }

    fn arm_for_read(&mut self) {
        self.host_to_device = Some(
            self.bus
                .read(self.config.out_endpoint, self.config.out_endpoint_size),
        );
    }

    /// Collects a finished host write into the receive queue, runs `callback`
    /// over the queued bytes and arms the next read.
    ///
    /// Nothing happens while the previous read is still in progress.
    pub fn read_from_host(&mut self, callback: impl FnMut(&[u8]) -> bool) -> Read {
        let mut received = 0;
        let mut dropped = 0;
        let mut consumed = false;

        if let Some(handle) = self.host_to_device {
            if self.bus.is_busy(handle) {
                return Read::Pending;
            }

            let data = self.bus.received(handle);
            received = data.len();

            for byte in data {
                if self.receive_queue.push(*byte).is_err() {
                    dropped += 1;
                }
            }

            if dropped > 0 {
                warn!("Dropped {} bytes from host, queue is full", dropped);
                self.dropped += dropped;
            }

            if received > 0 {
                consumed = process_queue(&mut self.receive_queue, callback);
            }
        }

        self.arm_for_read();

        Read::Rearmed {
            received,
            dropped,
            consumed,
        }
    }
}
