//! Scripted [UsbTransport] for tests. Results are queued ahead of time and
//! every call is recorded.

use std::{collections::VecDeque, time::Duration};

use super::{control::ControlRequest, InterfaceEndpoints, TransportError, UsbTransport};

/// A recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Control(ControlRequest),
    InterruptRead(u8),
    InterruptWrite(u8, Vec<u8>),
    Claim(u8),
    Release(u8),
    Detach(u8),
    Attach(u8),
    Reset,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub manufacturer: Option<String>,
    pub endpoints: InterfaceEndpoints,
    pub kernel_driver_active: bool,
    pub control_results: VecDeque<Result<Vec<u8>, TransportError>>,
    pub read_results: VecDeque<Result<Vec<u8>, TransportError>>,
    pub claim_result: Option<TransportError>,
    pub release_result: Option<TransportError>,
    pub attach_result: Option<TransportError>,
    pub calls: Vec<Call>,
}

impl MockTransport {
    pub fn new(manufacturer: &str) -> Self {
        Self {
            manufacturer: Some(manufacturer.to_string()),
            endpoints: InterfaceEndpoints {
                in_address: Some(0x81),
                in_max_packet_size: 64,
                out_address: Some(0x02),
            },
            ..Default::default()
        }
    }

    pub fn push_control(&mut self, result: Result<Vec<u8>, TransportError>) {
        self.control_results.push_back(result);
    }

    pub fn push_read(&mut self, result: Result<Vec<u8>, TransportError>) {
        self.read_results.push_back(result);
    }

    /// Returns the recorded control requests
    pub fn control_requests(&self) -> Vec<&ControlRequest> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Control(request) => Some(request),
                _ => None,
            })
            .collect()
    }
}

impl UsbTransport for MockTransport {
    fn control_transfer(
        &mut self,
        request: &ControlRequest,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.calls.push(Call::Control(request.clone()));
        self.control_results
            .pop_front()
            .unwrap_or(Err(TransportError::Stall))
    }

    fn interrupt_read(
        &mut self,
        endpoint: u8,
        max_length: usize,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.calls.push(Call::InterruptRead(endpoint));
        let mut data = self
            .read_results
            .pop_front()
            .unwrap_or(Err(TransportError::NoDevice))?;
        data.truncate(max_length);
        Ok(data)
    }

    fn interrupt_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        self.calls.push(Call::InterruptWrite(endpoint, data.to_vec()));
        Ok(data.len())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.calls.push(Call::Claim(interface));
        match self.claim_result.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.calls.push(Call::Release(interface));
        match self.release_result.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn endpoints(&mut self, _interface: u8) -> Result<InterfaceEndpoints, TransportError> {
        Ok(self.endpoints)
    }

    fn manufacturer(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.manufacturer.clone())
    }

    fn kernel_driver_active(&mut self, _interface: u8) -> Result<bool, TransportError> {
        Ok(self.kernel_driver_active)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        self.calls.push(Call::Detach(interface));
        Ok(())
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<(), TransportError> {
        self.calls.push(Call::Attach(interface));
        match self.attach_result.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.calls.push(Call::Reset);
        Ok(())
    }
}
