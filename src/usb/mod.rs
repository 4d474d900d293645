pub mod control;
pub mod hidraw;
pub mod libusb;
#[cfg(test)]
pub mod mock;

use std::time::Duration;

use thiserror::Error;

use self::control::ControlRequest;

/// Possible errors from a USB transfer or interface operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("operation timed out")]
    Timeout,
    #[error("endpoint stalled")]
    Stall,
    #[error("device no longer exists")]
    NoDevice,
    #[error("resource busy")]
    Busy,
    #[error("access denied")]
    Access,
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns true if the operation may be re-issued. An interrupt poll that
    /// the device NAKs until the timeout elapses surfaces as [TransportError::Timeout].
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

/// Endpoints of a claimed interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterfaceEndpoints {
    /// Address of the first interrupt/bulk IN endpoint
    pub in_address: Option<u8>,
    /// Max packet size of the IN endpoint
    pub in_max_packet_size: usize,
    /// Address of the first interrupt/bulk OUT endpoint
    pub out_address: Option<u8>,
}

/// Identity of an attached device as reported during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Blocking USB transport consumed by the touch controller driver. Every call
/// blocks the calling thread for at most the given timeout. Kernel driver
/// handling defaults to no-ops for platforms or backends without it.
pub trait UsbTransport {
    /// Issue a control transfer on endpoint 0. For device-to-host requests the
    /// returned buffer holds the data stage (at most `request.length` bytes).
    /// For host-to-device requests it is empty.
    fn control_transfer(
        &mut self,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Read up to `max_length` bytes from an interrupt IN endpoint
    fn interrupt_read(
        &mut self,
        endpoint: u8,
        max_length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Write `data` to an interrupt OUT endpoint, returning the number of bytes written
    fn interrupt_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError>;

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError>;

    /// Returns the IN/OUT endpoints of the given interface
    fn endpoints(&mut self, interface: u8) -> Result<InterfaceEndpoints, TransportError>;

    /// Manufacturer string descriptor, if the device has one
    fn manufacturer(&mut self) -> Result<Option<String>, TransportError>;

    /// Product string descriptor, if the device has one
    fn product(&mut self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }

    fn kernel_driver_active(&mut self, _interface: u8) -> Result<bool, TransportError> {
        Ok(false)
    }

    fn detach_kernel_driver(&mut self, _interface: u8) -> Result<(), TransportError> {
        Ok(())
    }

    fn attach_kernel_driver(&mut self, _interface: u8) -> Result<(), TransportError> {
        Ok(())
    }

    /// Reset the device. Handles may be invalid afterwards.
    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: UsbTransport + ?Sized> UsbTransport for Box<T> {
    fn control_transfer(
        &mut self,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).control_transfer(request, timeout)
    }

    fn interrupt_read(
        &mut self,
        endpoint: u8,
        max_length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).interrupt_read(endpoint, max_length, timeout)
    }

    fn interrupt_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        (**self).interrupt_write(endpoint, data, timeout)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        (**self).claim_interface(interface)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        (**self).release_interface(interface)
    }

    fn endpoints(&mut self, interface: u8) -> Result<InterfaceEndpoints, TransportError> {
        (**self).endpoints(interface)
    }

    fn manufacturer(&mut self) -> Result<Option<String>, TransportError> {
        (**self).manufacturer()
    }

    fn product(&mut self) -> Result<Option<String>, TransportError> {
        (**self).product()
    }

    fn kernel_driver_active(&mut self, interface: u8) -> Result<bool, TransportError> {
        (**self).kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        (**self).detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        (**self).attach_kernel_driver(interface)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}
