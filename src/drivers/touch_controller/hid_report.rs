use packed_struct::prelude::*;

use super::FIRMWARE_QUERY_COMMAND;

// Touch block as found at any offset of the interrupt report. Fields are
// little endian.
//
// # Marker: 0x40 (palm) | X: 100 | Y: 200 | Width: 10 | Height: 5
// 40 64 00 c8 00 0a 00 05 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "9")]
pub struct TouchBlock {
    #[packed_field(bytes = "0")]
    pub marker: u8,
    #[packed_field(bytes = "1..=2", endian = "lsb")]
    pub x: u16,
    #[packed_field(bytes = "3..=4", endian = "lsb")]
    pub y: u16,
    #[packed_field(bytes = "5..=6", endian = "lsb")]
    pub width: u16,
    #[packed_field(bytes = "7..=8", endian = "lsb")]
    pub height: u16,
}

// Leading bytes of the vendor report returned on interface 1 after a
// firmware query. Only the version bytes carry known meaning.
//
// # Version: v2.5
// 76 00 00 00 00 00 00 00 02 00 05
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "11")]
pub struct FirmwareVersionReport {
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    #[packed_field(bytes = "1..=7")]
    pub _unused1: [u8; 7],
    #[packed_field(bytes = "8")]
    pub major: u8,
    #[packed_field(bytes = "9")]
    pub _unused9: u8,
    #[packed_field(bytes = "10")]
    pub minor: u8,
}

// Vendor request written to the OUT endpoint of interface 1
// 76 00 00 .. 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "64")]
pub struct FirmwareQueryRequest {
    #[packed_field(bytes = "0")]
    pub command: u8,
    #[packed_field(bytes = "1..=63")]
    pub _reserved: [u8; 63],
}

impl Default for FirmwareQueryRequest {
    fn default() -> Self {
        Self {
            command: FIRMWARE_QUERY_COMMAND,
            _reserved: [0; 63],
        }
    }
}
