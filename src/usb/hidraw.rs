//! [UsbTransport] backed by hidapi. The operating system HID driver stays bound
//! to the device, so claiming an interface only opens its hidraw node and the
//! kernel driver operations are no-ops. Report requests are routed through the
//! HID feature/input report calls; hidapi applies its own timeout to those.

use std::{collections::HashMap, time::Duration};

use hidapi::{HidApi, HidDevice, HidError};

use crate::constants::PACKET_SIZE;

use super::{
    control::{ControlRequest, Direction, ReportType, HID_GET_REPORT, HID_SET_REPORT},
    DeviceEntry, InterfaceEndpoints, TransportError, UsbTransport,
};

impl From<HidError> for TransportError {
    fn from(err: HidError) -> Self {
        TransportError::Other(err.to_string())
    }
}

/// Returns the synthetic IN endpoint address used for an interface
fn in_endpoint(interface: u8) -> u8 {
    0x80 | (interface + 1)
}

/// Returns the synthetic OUT endpoint address used for an interface
fn out_endpoint(interface: u8) -> u8 {
    interface + 1
}

/// Returns the interface a synthetic endpoint address belongs to
fn endpoint_interface(endpoint: u8) -> u8 {
    (endpoint & 0x7f).saturating_sub(1)
}

pub struct HidrawTransport {
    api: HidApi,
    vid: u16,
    pid: u16,
    /// Open hidraw nodes by interface number
    devices: HashMap<u8, HidDevice>,
}

impl HidrawTransport {
    /// Open the HID device matching the given vendor and product id. Returns
    /// `Ok(None)` if no such device is attached.
    pub fn open(vid: u16, pid: u16) -> Result<Option<Self>, TransportError> {
        let api = HidApi::new()?;
        let found = api
            .device_list()
            .any(|info| info.vendor_id() == vid && info.product_id() == pid);
        if !found {
            return Ok(None);
        }

        Ok(Some(Self {
            api,
            vid,
            pid,
            devices: HashMap::new(),
        }))
    }

    /// Returns the hidraw node for the given interface, opening it if needed
    fn device(&mut self, interface: u8) -> Result<&HidDevice, TransportError> {
        if !self.devices.contains_key(&interface) {
            let (vid, pid) = (self.vid, self.pid);
            let info = self
                .api
                .device_list()
                .find(|info| {
                    info.vendor_id() == vid
                        && info.product_id() == pid
                        && (info.interface_number() == interface as i32
                            || info.interface_number() == -1)
                })
                .ok_or(TransportError::NoDevice)?;
            log::debug!("Opening hidraw device {:?}", info.path());
            let device = info.open_device(&self.api)?;
            self.devices.insert(interface, device);
        }

        self.devices
            .get(&interface)
            .ok_or(TransportError::NoDevice)
    }

    fn device_info_string<F>(&self, getter: F) -> Option<String>
    where
        F: Fn(&hidapi::DeviceInfo) -> Option<&str>,
    {
        self.api
            .device_list()
            .filter(|info| info.vendor_id() == self.vid && info.product_id() == self.pid)
            .find_map(|info| getter(info).map(|value| value.trim().to_string()))
    }
}

impl UsbTransport for HidrawTransport {
    fn control_transfer(
        &mut self,
        request: &ControlRequest,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let interface = request.index as u8;
        let report_id = request.report_id();
        let report_type = request.report_type();
        let device = self.device(interface)?;

        match (request.direction, request.request, report_type) {
            (Direction::DeviceToHost, HID_GET_REPORT, Some(ReportType::Feature)) => {
                let mut buf = vec![0; request.length as usize];
                if let Some(first) = buf.first_mut() {
                    *first = report_id;
                }
                let read = device.get_feature_report(&mut buf)?;
                buf.truncate(read);
                Ok(buf)
            }
            (Direction::DeviceToHost, HID_GET_REPORT, Some(ReportType::Input)) => {
                let mut buf = vec![0; request.length as usize];
                if let Some(first) = buf.first_mut() {
                    *first = report_id;
                }
                let read = device.get_input_report(&mut buf)?;
                buf.truncate(read);
                Ok(buf)
            }
            (Direction::HostToDevice, HID_SET_REPORT, Some(ReportType::Feature)) => {
                device.send_feature_report(&request.payload)?;
                Ok(Vec::new())
            }
            (Direction::HostToDevice, HID_SET_REPORT, Some(ReportType::Output)) => {
                device.write(&request.payload)?;
                Ok(Vec::new())
            }
            _ => Err(TransportError::Other(format!(
                "request '{request}' cannot be expressed through hidraw"
            ))),
        }
    }

    fn interrupt_read(
        &mut self,
        endpoint: u8,
        max_length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let device = self.device(endpoint_interface(endpoint))?;
        let mut buf = vec![0; max_length];
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let read = device.read_timeout(&mut buf, timeout_ms)?;
        if read == 0 {
            return Err(TransportError::Timeout);
        }
        buf.truncate(read);
        Ok(buf)
    }

    fn interrupt_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        let device = self.device(endpoint_interface(endpoint))?;
        Ok(device.write(data)?)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.device(interface)?;
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.devices.remove(&interface);
        Ok(())
    }

    fn endpoints(&mut self, interface: u8) -> Result<InterfaceEndpoints, TransportError> {
        Ok(InterfaceEndpoints {
            in_address: Some(in_endpoint(interface)),
            in_max_packet_size: PACKET_SIZE,
            out_address: Some(out_endpoint(interface)),
        })
    }

    fn manufacturer(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.device_info_string(|info| info.manufacturer_string()))
    }

    fn product(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.device_info_string(|info| info.product_string()))
    }
}

/// Returns every HID device visible to hidapi, one entry per device
pub fn list_devices() -> Result<Vec<DeviceEntry>, TransportError> {
    let api = HidApi::new()?;
    let mut entries: Vec<DeviceEntry> = Vec::new();
    for info in api.device_list() {
        let known = entries
            .iter()
            .any(|e| e.vendor_id == info.vendor_id() && e.product_id == info.product_id());
        if known {
            continue;
        }
        entries.push(DeviceEntry {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            manufacturer: info.manufacturer_string().map(|s| s.to_string()),
            product: info.product_string().map(|s| s.to_string()),
        });
    }

    Ok(entries)
}
