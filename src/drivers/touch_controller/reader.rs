use std::{fmt::Display, time::Duration};

use crate::{
    sync::CancelToken,
    usb::{TransportError, UsbTransport},
};

use super::to_hex;

/// One interrupt IN packet. The buffer always has the endpoint's full packet
/// size; bytes past `received_length` are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReportPacket {
    bytes: Vec<u8>,
    received_length: usize,
}

impl RawReportPacket {
    /// Wrap received bytes in a buffer of `capacity` bytes
    pub fn new(mut data: Vec<u8>, capacity: usize) -> Self {
        let received_length = data.len().min(capacity);
        data.resize(capacity.max(received_length), 0);
        Self {
            bytes: data,
            received_length,
        }
    }

    /// The bytes received from the device
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.received_length]
    }

    /// The full packet buffer
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn received_length(&self) -> usize {
        self.received_length
    }
}

impl Display for RawReportPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_hex(&self.bytes))
    }
}

/// Reads packets from an interrupt IN endpoint. A poll that times out means
/// the device had no new data, so [ReportReader::next_packet] re-issues it.
#[derive(Debug, Clone)]
pub struct ReportReader {
    endpoint: u8,
    max_packet_size: usize,
    timeout: Duration,
    max_retries: Option<u32>,
}

impl ReportReader {
    pub fn new(endpoint: u8, max_packet_size: usize, timeout: Duration) -> Self {
        Self {
            endpoint,
            max_packet_size,
            timeout,
            max_retries: None,
        }
    }

    /// Give up with [TransportError::Timeout] once a timed out poll has been
    /// retried this many times in a row, so at most `max_retries + 1` polls
    /// are issued. Unlimited by default.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn endpoint(&self) -> u8 {
        self.endpoint
    }

    /// Issue a single read of one packet
    pub fn read<T>(&self, transport: &mut T) -> Result<RawReportPacket, TransportError>
    where
        T: UsbTransport + ?Sized,
    {
        let data = transport.interrupt_read(self.endpoint, self.max_packet_size, self.timeout)?;
        log::trace!(
            "Received {} bytes from bEndpointAddress 0x{:02x}",
            data.len(),
            self.endpoint
        );
        Ok(RawReportPacket::new(data, self.max_packet_size))
    }

    /// Read the next packet, re-issuing the read while the endpoint times out.
    /// Returns `Ok(None)` once `cancel` is set. Any other transport error ends
    /// the read.
    pub fn next_packet<T>(
        &self,
        transport: &mut T,
        cancel: &CancelToken,
    ) -> Result<Option<RawReportPacket>, TransportError>
    where
        T: UsbTransport + ?Sized,
    {
        let mut retries = 0;
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            match self.read(transport) {
                Ok(packet) => return Ok(Some(packet)),
                Err(e) if e.is_retryable() => {
                    log::trace!("NAK - {e}");
                    retries += 1;
                    if self.max_retries.is_some_and(|max| retries > max) {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
