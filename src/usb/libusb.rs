//! [UsbTransport] backed by libusb. Talks to the device directly, so the
//! kernel HID driver has to be detached from an interface before it can be
//! claimed.

use std::time::Duration;

use rusb::{Direction, GlobalContext, TransferType};

use super::{
    control::{ControlRequest, Direction as RequestDirection},
    DeviceEntry, InterfaceEndpoints, TransportError, UsbTransport,
};

impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Timeout => TransportError::Timeout,
            rusb::Error::Pipe => TransportError::Stall,
            rusb::Error::NoDevice => TransportError::NoDevice,
            rusb::Error::Busy => TransportError::Busy,
            rusb::Error::Access => TransportError::Access,
            err => TransportError::Other(err.to_string()),
        }
    }
}

pub struct LibusbTransport {
    handle: rusb::DeviceHandle<GlobalContext>,
}

impl LibusbTransport {
    /// Open the first device matching the given vendor and product id.
    /// Returns `Ok(None)` if no such device is attached.
    pub fn open(vid: u16, pid: u16) -> Result<Option<Self>, TransportError> {
        for device in rusb::devices()?.iter() {
            let descriptor = device.device_descriptor()?;
            if descriptor.vendor_id() != vid || descriptor.product_id() != pid {
                continue;
            }
            log::debug!(
                "Opening {vid:04x}:{pid:04x} on bus {} addr {}",
                device.bus_number(),
                device.address()
            );
            let handle = device.open()?;

            return Ok(Some(Self { handle }));
        }

        Ok(None)
    }

    fn read_string(&self, index: Option<u8>) -> Result<Option<String>, TransportError> {
        let Some(index) = index else {
            return Ok(None);
        };
        let value = self.handle.read_string_descriptor_ascii(index)?;
        let value = value.trim_end_matches(char::from(0)).trim().to_string();
        Ok(Some(value))
    }
}

impl UsbTransport for LibusbTransport {
    fn control_transfer(
        &mut self,
        request: &ControlRequest,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let request_type = request.request_type_byte();
        match request.direction {
            RequestDirection::DeviceToHost => {
                let mut buf = vec![0; request.length as usize];
                let read = self.handle.read_control(
                    request_type,
                    request.request,
                    request.value,
                    request.index,
                    &mut buf,
                    timeout,
                )?;
                buf.truncate(read);
                Ok(buf)
            }
            RequestDirection::HostToDevice => {
                let written = self.handle.write_control(
                    request_type,
                    request.request,
                    request.value,
                    request.index,
                    &request.payload,
                    timeout,
                )?;
                if written != request.payload.len() {
                    return Err(TransportError::Other(format!(
                        "short control write: {written}/{}",
                        request.payload.len()
                    )));
                }
                Ok(Vec::new())
            }
        }
    }

    fn interrupt_read(
        &mut self,
        endpoint: u8,
        max_length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0; max_length];
        let read = self.handle.read_interrupt(endpoint, &mut buf, timeout)?;
        buf.truncate(read);
        Ok(buf)
    }

    fn interrupt_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        Ok(self.handle.write_interrupt(endpoint, data, timeout)?)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        Ok(self.handle.claim_interface(interface)?)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        Ok(self.handle.release_interface(interface)?)
    }

    fn endpoints(&mut self, interface: u8) -> Result<InterfaceEndpoints, TransportError> {
        let config = self.handle.device().active_config_descriptor()?;
        let mut endpoints = InterfaceEndpoints::default();

        // Only the default alternate setting is considered
        let alt_settings = config
            .interfaces()
            .filter(|iface| iface.number() == interface)
            .filter_map(|iface| iface.descriptors().next());
        for descriptor in alt_settings {
            for endpoint in descriptor.endpoint_descriptors() {
                if !matches!(
                    endpoint.transfer_type(),
                    TransferType::Interrupt | TransferType::Bulk
                ) {
                    continue;
                }
                match endpoint.direction() {
                    Direction::In if endpoints.in_address.is_none() => {
                        endpoints.in_address = Some(endpoint.address());
                        endpoints.in_max_packet_size = endpoint.max_packet_size() as usize;
                    }
                    Direction::Out if endpoints.out_address.is_none() => {
                        endpoints.out_address = Some(endpoint.address());
                    }
                    _ => (),
                }
            }
        }
        log::trace!("Interface {interface} endpoints: {endpoints:?}");

        Ok(endpoints)
    }

    fn manufacturer(&mut self) -> Result<Option<String>, TransportError> {
        let descriptor = self.handle.device().device_descriptor()?;
        self.read_string(descriptor.manufacturer_string_index())
    }

    fn product(&mut self) -> Result<Option<String>, TransportError> {
        let descriptor = self.handle.device().device_descriptor()?;
        self.read_string(descriptor.product_string_index())
    }

    fn kernel_driver_active(&mut self, interface: u8) -> Result<bool, TransportError> {
        if !rusb::supports_detach_kernel_driver() {
            return Ok(false);
        }
        match self.handle.kernel_driver_active(interface) {
            Ok(active) => Ok(active),
            Err(rusb::Error::NotSupported) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        if !rusb::supports_detach_kernel_driver() {
            return Ok(());
        }
        Ok(self.handle.detach_kernel_driver(interface)?)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        if !rusb::supports_detach_kernel_driver() {
            return Ok(());
        }
        Ok(self.handle.attach_kernel_driver(interface)?)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(self.handle.reset()?)
    }
}

/// Returns every device attached to the bus. String descriptors are read on a
/// best-effort basis since opening a device may not be permitted.
pub fn list_devices() -> Result<Vec<DeviceEntry>, TransportError> {
    let mut entries = Vec::new();
    for device in rusb::devices()?.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(descriptor) => descriptor,
            Err(e) => {
                log::debug!("Unable to read device descriptor: {e}");
                continue;
            }
        };

        let (manufacturer, product) = match device.open() {
            Ok(handle) => (
                handle.read_manufacturer_string_ascii(&descriptor).ok(),
                handle.read_product_string_ascii(&descriptor).ok(),
            ),
            Err(e) => {
                log::trace!(
                    "Unable to open {:04x}:{:04x}: {e}",
                    descriptor.vendor_id(),
                    descriptor.product_id()
                );
                (None, None)
            }
        };

        entries.push(DeviceEntry {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            manufacturer,
            product,
        });
    }

    Ok(entries)
}
