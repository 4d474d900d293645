use std::time::Duration;

/// Size of a touch controller interrupt IN packet
pub const PACKET_SIZE: usize = 64;
/// Size of the touch mode feature report
pub const FEATURE_REPORT_SIZE: usize = 8;

/// Interface carrying the touch reports and the touch mode feature report
pub const TOUCH_INTERFACE: u8 = 0;
/// Interface carrying the vendor firmware version report
pub const VENDOR_INTERFACE: u8 = 1;

/// Default timeout for control transfers
pub const CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default timeout for a single interrupt IN poll
pub const READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Millimetres per raw width unit
pub const WIDTH_MM_PER_UNIT: f32 = 0.095;
/// Millimetres per raw height unit
pub const HEIGHT_MM_PER_UNIT: f32 = 0.022;
