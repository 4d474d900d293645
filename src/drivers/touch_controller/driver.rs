use std::time::Duration;

use packed_struct::PackedStruct;
use thiserror::Error;

use crate::{
    config::{ManufacturerProfile, ProfileRegistry, RegistryError},
    constants::{CONTROL_TIMEOUT, READ_TIMEOUT, TOUCH_INTERFACE, VENDOR_INTERFACE},
    sync::CancelToken,
    usb::{InterfaceEndpoints, TransportError, UsbTransport},
};

use super::{
    decoder::{extract_firmware_version, TouchReportDecoder},
    event::{FirmwareVersion, TouchEvent},
    hid_report::FirmwareQueryRequest,
    protocol::{build_get_touch_mode, build_set_touch_mode, decode_touch_mode_response},
    reader::{RawReportPacket, ReportReader},
    to_hex, DecodeError,
};

/// Possible errors talking to a touch controller
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Device {vid:04x}:{pid:04x} not found")]
    DeviceNotFound { vid: u16, pid: u16 },
    #[error("{0}")]
    UnsupportedManufacturer(#[from] RegistryError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Interface {interface} has no {direction} endpoint")]
    NoEndpoint {
        interface: u8,
        direction: &'static str,
    },
}

/// Exclusive claim of one interface. An active kernel driver is detached
/// before claiming. Dropping the claim releases the interface and re-attaches
/// the kernel driver; failures there are logged, never returned.
pub struct InterfaceClaim<'a, T: UsbTransport + ?Sized> {
    transport: &'a mut T,
    interface: u8,
    reattach: bool,
}

impl<'a, T: UsbTransport + ?Sized> InterfaceClaim<'a, T> {
    pub fn claim(transport: &'a mut T, interface: u8) -> Result<Self, TransportError> {
        let mut reattach = false;
        if transport.kernel_driver_active(interface)? {
            log::info!("Detaching kernel driver of interface {interface}");
            transport.detach_kernel_driver(interface)?;
            reattach = true;
        }

        log::debug!("Claiming interface {interface}");
        if let Err(e) = transport.claim_interface(interface) {
            if reattach {
                if let Err(e) = transport.attach_kernel_driver(interface) {
                    log::error!("Failed to re-attach kernel driver of interface {interface}: {e}");
                }
            }
            return Err(e);
        }

        Ok(Self {
            transport,
            interface,
            reattach,
        })
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn transport(&mut self) -> &mut T {
        &mut *self.transport
    }

    /// Returns the endpoints of the claimed interface
    pub fn endpoints(&mut self) -> Result<InterfaceEndpoints, TransportError> {
        self.transport.endpoints(self.interface)
    }
}

impl<T: UsbTransport + ?Sized> Drop for InterfaceClaim<'_, T> {
    fn drop(&mut self) {
        let interface = self.interface;
        log::debug!("Releasing interface {interface}");
        if let Err(e) = self.transport.release_interface(interface) {
            log::error!("Failed to release interface {interface}: {e}");
        }
        if self.reattach {
            log::debug!("Re-attaching kernel driver of interface {interface}");
            if let Err(e) = self.transport.attach_kernel_driver(interface) {
                log::error!("Failed to re-attach kernel driver of interface {interface}: {e}");
            }
        }
    }
}

/// Touch controller attached through a [UsbTransport]. Requests are issued
/// strictly one after another on the calling thread.
pub struct Driver<T: UsbTransport> {
    transport: T,
    manufacturer: Option<String>,
    control_timeout: Duration,
    read_timeout: Duration,
}

impl<T: UsbTransport> Driver<T> {
    pub fn new(mut transport: T) -> Result<Self, SessionError> {
        let manufacturer = transport.manufacturer()?;
        let product = transport
            .product()?
            .unwrap_or_else(|| "touch controller".to_string());
        match manufacturer.as_ref() {
            Some(name) => log::info!("Found {product} from {name}"),
            None => log::info!("Found {product} without a manufacturer string"),
        }

        Ok(Self {
            transport,
            manufacturer,
            control_timeout: CONTROL_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        })
    }

    /// Set the timeouts used for control transfers and interrupt reads
    pub fn with_timeouts(mut self, control_timeout: Duration, read_timeout: Duration) -> Self {
        self.control_timeout = control_timeout;
        self.read_timeout = read_timeout;
        self
    }

    /// Manufacturer string reported by the device
    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    /// Look up the profile matching the device's manufacturer
    pub fn profile<'r>(
        &self,
        registry: &'r ProfileRegistry,
    ) -> Result<&'r ManufacturerProfile, SessionError> {
        let name = self.manufacturer.as_deref().unwrap_or_default();
        Ok(registry.lookup(name)?)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Read the current touch mode code
    pub fn get_touch_mode(&mut self, profile: &ManufacturerProfile) -> Result<u8, SessionError> {
        let request = build_get_touch_mode(profile);
        let mut claim = InterfaceClaim::claim(&mut self.transport, TOUCH_INTERFACE)?;

        log::debug!("Sending {request}");
        let response = claim
            .transport()
            .control_transfer(&request, self.control_timeout)?;
        log::debug!("Received {}", to_hex(&response));

        Ok(decode_touch_mode_response(profile, &response)?)
    }

    /// Write a new touch mode code. Complete once the transfer returns.
    pub fn set_touch_mode(
        &mut self,
        profile: &ManufacturerProfile,
        mode: u8,
    ) -> Result<(), SessionError> {
        let request = build_set_touch_mode(profile, mode);
        let mut claim = InterfaceClaim::claim(&mut self.transport, TOUCH_INTERFACE)?;

        log::debug!("Sending {request} {}", to_hex(&request.payload));
        claim
            .transport()
            .control_transfer(&request, self.control_timeout)?;

        Ok(())
    }

    /// Query the firmware version over the vendor interface
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, SessionError> {
        let mut claim = InterfaceClaim::claim(&mut self.transport, VENDOR_INTERFACE)?;
        let endpoints = claim.endpoints()?;
        let out_address = endpoints.out_address.ok_or(SessionError::NoEndpoint {
            interface: VENDOR_INTERFACE,
            direction: "OUT",
        })?;
        let in_address = endpoints.in_address.ok_or(SessionError::NoEndpoint {
            interface: VENDOR_INTERFACE,
            direction: "IN",
        })?;

        let request = FirmwareQueryRequest::default()
            .pack()
            .map_err(DecodeError::from)?;
        log::debug!(
            "Sending data packet to bEndpointAddress 0x{out_address:02x}: {}",
            to_hex(&request)
        );
        claim
            .transport()
            .interrupt_write(out_address, &request, self.control_timeout)?;

        let reader = ReportReader::new(in_address, endpoints.in_max_packet_size, self.read_timeout);
        let packet = reader.read(claim.transport())?;
        log::debug!("Received {packet}");

        Ok(extract_firmware_version(packet.data())?)
    }

    /// Stream touch reports until `cancel` is set or `limit` packets have been
    /// read. Timed out polls are retried. Each packet is handed to `handler`
    /// together with its decoded touches. Returns the number of packets read.
    pub fn watch<F>(
        &mut self,
        decoder: &TouchReportDecoder,
        cancel: &CancelToken,
        limit: Option<usize>,
        mut handler: F,
    ) -> Result<usize, SessionError>
    where
        F: FnMut(&RawReportPacket, Result<Vec<TouchEvent>, DecodeError>),
    {
        let mut claim = InterfaceClaim::claim(&mut self.transport, TOUCH_INTERFACE)?;
        let endpoints = claim.endpoints()?;
        let in_address = endpoints.in_address.ok_or(SessionError::NoEndpoint {
            interface: TOUCH_INTERFACE,
            direction: "IN",
        })?;
        let reader = ReportReader::new(in_address, endpoints.in_max_packet_size, self.read_timeout);

        let mut count = 0;
        loop {
            if limit.is_some_and(|limit| count >= limit) {
                break;
            }
            let Some(packet) = reader.next_packet(claim.transport(), cancel)? else {
                log::info!("Stopped reading touch reports");
                break;
            };
            count += 1;
            log::trace!("Packet {count}: {packet}");
            let events = decoder.decode(packet.data());
            handler(&packet, events);
        }

        Ok(count)
    }

    /// Reset the device
    pub fn reset(&mut self) -> Result<(), SessionError> {
        log::debug!("Resetting device");
        self.transport.reset()?;
        Ok(())
    }
}
