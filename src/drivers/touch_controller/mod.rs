pub mod decoder;
pub mod driver;
#[cfg(test)]
pub mod driver_test;
pub mod event;
pub mod hid_report;
pub mod protocol;
pub mod reader;

use packed_struct::PackingError;
use thiserror::Error;

// Touch report markers
pub const PALM_MARKER: u8 = 0x40;
pub const FOREIGN_OBJECT_MARKER: u8 = 0xC0;

/// Size of a touch block: the marker byte followed by four u16 fields
pub const TOUCH_BLOCK_SIZE: usize = 9;
/// Highest packet offset a touch block may start at
pub const MAX_MARKER_OFFSET: usize = 46;

/// Vendor command requesting the firmware version report
pub const FIRMWARE_QUERY_COMMAND: u8 = 0x76;
/// Minimum length of a firmware version report
pub const FIRMWARE_REPORT_MIN_SIZE: usize = 11;

/// Possible errors interpreting bytes received from the touch controller
#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
    #[error("report truncated: needed {needed} bytes but only {actual} are available")]
    Truncated { needed: usize, actual: usize },
    #[error("mode code 0x{code:02X} has no label for manufacturer '{manufacturer}'")]
    UnknownMode { manufacturer: String, code: u8 },
    #[error("unable to unpack report: {0:?}")]
    Packing(#[from] PackingError),
}

/// Format bytes as space separated hex
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<String>>()
        .join(" ")
}
