use std::collections::VecDeque;
use std::error::Error;
use std::time::Duration;

use hidtouch::config::{ManufacturerProfile, ProfileRegistry};
use hidtouch::drivers::touch_controller::decoder::TouchReportDecoder;
use hidtouch::drivers::touch_controller::driver::Driver;
use hidtouch::drivers::touch_controller::event::TouchKind;
use hidtouch::drivers::touch_controller::protocol::resolve_label;
use hidtouch::sync::CancelToken;
use hidtouch::usb::control::{ControlRequest, Direction};
use hidtouch::usb::{InterfaceEndpoints, TransportError, UsbTransport};

/// Emulates a controller holding a touch mode in its feature report and
/// producing a fixed stream of touch reports.
struct FakeController {
    manufacturer: String,
    feature_report: [u8; 8],
    reports: VecDeque<Result<Vec<u8>, TransportError>>,
    claimed: Vec<u8>,
}

impl FakeController {
    fn new(profile: &ManufacturerProfile, mode: u8) -> Self {
        let mut feature_report = [0u8; 8];
        feature_report[0] = profile.touch_mode_report_id;
        feature_report[profile.touch_mode_offset] = mode;
        Self {
            manufacturer: profile.name.clone(),
            feature_report,
            reports: VecDeque::new(),
            claimed: Vec::new(),
        }
    }
}

impl UsbTransport for FakeController {
    fn control_transfer(
        &mut self,
        request: &ControlRequest,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        if !self.claimed.contains(&0) {
            return Err(TransportError::Busy);
        }
        match request.direction {
            Direction::DeviceToHost => Ok(self.feature_report.to_vec()),
            Direction::HostToDevice => {
                self.feature_report.copy_from_slice(&request.payload);
                Ok(Vec::new())
            }
        }
    }

    fn interrupt_read(
        &mut self,
        _endpoint: u8,
        _max_length: usize,
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.reports
            .pop_front()
            .unwrap_or(Err(TransportError::Timeout))
    }

    fn interrupt_write(
        &mut self,
        _endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, TransportError> {
        Ok(data.len())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.claimed.push(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        self.claimed.retain(|claimed| *claimed != interface);
        Ok(())
    }

    fn endpoints(&mut self, _interface: u8) -> Result<InterfaceEndpoints, TransportError> {
        Ok(InterfaceEndpoints {
            in_address: Some(0x81),
            in_max_packet_size: 64,
            out_address: Some(0x01),
        })
    }

    fn manufacturer(&mut self) -> Result<Option<String>, TransportError> {
        Ok(Some(self.manufacturer.clone()))
    }
}

#[tokio::test]
async fn test_set_then_get_touch_mode() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    for profile in registry.profiles() {
        let mut driver = Driver::new(FakeController::new(profile, 0x00))?;
        let profile = driver.profile(&registry)?;

        driver.set_touch_mode(profile, 0x01)?;
        let mode = driver.get_touch_mode(profile)?;
        assert_eq!(mode, 0x01, "touch mode of {}", profile.name);

        assert!(driver.into_transport().claimed.is_empty());
    }

    Ok(())
}

#[tokio::test]
async fn test_label_of_current_mode() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let profile = registry.lookup("NanoTS")?;
    let mut driver = Driver::new(FakeController::new(profile, 0x01))?;

    let mode = driver.get_touch_mode(profile)?;
    assert_eq!(resolve_label(profile, mode)?, "Multi Touch (Digitizer)");

    Ok(())
}

#[tokio::test]
async fn test_watch_touch_reports() -> Result<(), Box<dyn Error>> {
    let registry = ProfileRegistry::builtin();
    let profile = registry.lookup("NanoTS")?;
    let mut controller = FakeController::new(profile, 0x01);

    let mut report = vec![0u8; 64];
    report[10..19].copy_from_slice(&[0x40, 0x64, 0x00, 0xC8, 0x00, 0x0A, 0x00, 0x05, 0x00]);
    for _ in 0..3 {
        controller.reports.push_back(Err(TransportError::Timeout));
    }
    controller.reports.push_back(Ok(report));

    let mut driver = Driver::new(controller)?.with_timeouts(
        Duration::from_millis(10),
        Duration::from_millis(10),
    );
    let decoder = TouchReportDecoder::for_profile(profile);
    let cancel = CancelToken::new();
    let mut touches = Vec::new();
    let count = driver.watch(&decoder, &cancel, Some(1), |_packet, events| {
        touches.extend(events.unwrap_or_default());
    })?;

    assert_eq!(count, 1);
    assert_eq!(touches.len(), 1);
    assert_eq!(touches[0].kind, TouchKind::Palm);
    assert_eq!((touches[0].x, touches[0].y), (100, 200));
    assert_eq!((touches[0].width, touches[0].height), (10, 5));
    assert!(driver.into_transport().claimed.is_empty());

    Ok(())
}
