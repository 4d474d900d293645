use std::fmt::Display;

use packed_struct::prelude::*;

/// HID class request GET_REPORT
pub const HID_GET_REPORT: u8 = 0x01;
/// HID class request SET_REPORT
pub const HID_SET_REPORT: u8 = 0x09;

/// Direction of the data stage, encoded in bit 7 of bmRequestType
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

/// Request type, encoded in bits 5..6 of bmRequestType. Only class requests
/// are issued by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Class,
}

/// Recipient, encoded in bits 0..4 of bmRequestType
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Interface,
}

/// HID report types as carried in the high byte of wValue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Input = 0x01,
    Output = 0x02,
    Feature = 0x03,
}

impl ReportType {
    pub fn to_u8(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for ReportType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Input),
            0x02 => Ok(Self::Output),
            0x03 => Ok(Self::Feature),
            _ => Err(value),
        }
    }
}

/// Pack a report type and report id into wValue
pub fn report_value(report_type: ReportType, report_id: u8) -> u16 {
    ((report_type.to_u8() as u16) << 8) | report_id as u16
}

/// A class-specific control request addressed to an interface. Built per call
/// and handed to a [super::UsbTransport].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub direction: Direction,
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// Number of bytes in the data stage. Equals `payload.len()` for OUT
    /// requests and bounds the response buffer for IN requests.
    pub length: u16,
    /// Data stage for host-to-device requests. Empty for IN requests.
    pub payload: Vec<u8>,
}

impl ControlRequest {
    /// Build a device-to-host class request reading `length` bytes
    pub fn class_in(request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            direction: Direction::DeviceToHost,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request,
            value,
            index,
            length,
            payload: Vec::new(),
        }
    }

    /// Build a host-to-device class request carrying `payload`
    pub fn class_out(request: u8, value: u16, index: u16, payload: Vec<u8>) -> Self {
        Self {
            direction: Direction::HostToDevice,
            request_type: RequestType::Class,
            recipient: Recipient::Interface,
            request,
            value,
            index,
            length: payload.len() as u16,
            payload,
        }
    }

    /// Returns the bmRequestType byte (0xA1 for class IN, 0x21 for class OUT)
    pub fn request_type_byte(&self) -> u8 {
        let direction = match self.direction {
            Direction::HostToDevice => 0x00,
            Direction::DeviceToHost => 0x80,
        };
        let request_type = match self.request_type {
            RequestType::Class => 0x20,
        };
        let recipient = match self.recipient {
            Recipient::Interface => 0x01,
        };
        direction | request_type | recipient
    }

    /// Report type from the high byte of wValue, if it names one
    pub fn report_type(&self) -> Option<ReportType> {
        ReportType::try_from((self.value >> 8) as u8).ok()
    }

    /// Report id from the low byte of wValue
    pub fn report_id(&self) -> u8 {
        (self.value & 0x00ff) as u8
    }

    /// Returns the SETUP stage of this request
    pub fn setup_packet(&self) -> SetupPacket {
        SetupPacket {
            request_type: self.request_type_byte(),
            request: self.request,
            value: self.value,
            index: self.index,
            length: self.length,
        }
    }
}

impl Display for ControlRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:04X} {:04X} {:04X}",
            self.request_type_byte(),
            self.request,
            self.value,
            self.index,
            self.length
        )
    }
}

// SETUP stage of a GET_REPORT for feature report 0xA3
// A1 01 A3 03 00 00 08 00
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct SetupPacket {
    #[packed_field(bytes = "0")]
    pub request_type: u8,
    #[packed_field(bytes = "1")]
    pub request: u8,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub value: u16,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub index: u16,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub length: u16,
}
