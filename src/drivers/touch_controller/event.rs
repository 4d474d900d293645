use std::fmt::Display;

use crate::constants::{HEIGHT_MM_PER_UNIT, WIDTH_MM_PER_UNIT};

use super::hid_report::{FirmwareVersionReport, TouchBlock};

/// Classification of a touch block by its marker byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    Valid,
    Palm,
    ForeignObject,
}

impl Display for TouchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            TouchKind::Valid => "Valid touch",
            TouchKind::Palm => "Palm",
            TouchKind::ForeignObject => "Foreign Object",
        };
        write!(f, "{}", value)
    }
}

/// A touch decoded from one block of an interrupt report. Coordinates and
/// sizes are in raw controller units.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub kind: TouchKind,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub width_mm: f32,
    pub height_mm: f32,
    /// Offset of the marker byte inside the packet
    pub source_offset: usize,
}

impl TouchEvent {
    pub fn new(kind: TouchKind, block: TouchBlock, source_offset: usize) -> Self {
        Self {
            kind,
            x: block.x,
            y: block.y,
            width: block.width,
            height: block.height,
            width_mm: block.width as f32 * WIDTH_MM_PER_UNIT,
            height_mm: block.height as f32 * HEIGHT_MM_PER_UNIT,
            source_offset,
        }
    }
}

impl Display for TouchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at offset {}: location {}, {} size {:.3}mm, {:.3}mm",
            self.kind, self.source_offset, self.x, self.y, self.width_mm, self.height_mm
        )
    }
}

/// Firmware version reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl From<FirmwareVersionReport> for FirmwareVersion {
    fn from(report: FirmwareVersionReport) -> Self {
        Self {
            major: report.major,
            minor: report.minor,
        }
    }
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}
