use packed_struct::PackedStruct;

use crate::config::ManufacturerProfile;

use super::{
    event::{FirmwareVersion, TouchEvent, TouchKind},
    hid_report::{FirmwareVersionReport, TouchBlock},
    DecodeError, FIRMWARE_REPORT_MIN_SIZE, FOREIGN_OBJECT_MARKER, MAX_MARKER_OFFSET,
    PALM_MARKER, TOUCH_BLOCK_SIZE,
};

/// Marker byte values that start a touch block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchMarkers {
    pub palm: u8,
    pub foreign_object: u8,
    /// Marker of a valid touch. No such value has been observed on hardware,
    /// so it is only set when a manufacturer profile provides one.
    pub valid: Option<u8>,
}

impl Default for TouchMarkers {
    fn default() -> Self {
        Self {
            palm: PALM_MARKER,
            foreign_object: FOREIGN_OBJECT_MARKER,
            valid: None,
        }
    }
}

impl TouchMarkers {
    /// Returns the kind of touch the given byte marks, if any
    pub fn classify(&self, byte: u8) -> Option<TouchKind> {
        if byte == self.palm {
            Some(TouchKind::Palm)
        } else if byte == self.foreign_object {
            Some(TouchKind::ForeignObject)
        } else if Some(byte) == self.valid {
            Some(TouchKind::Valid)
        } else {
            None
        }
    }
}

/// Scans interrupt reports for touch blocks. Holds no state between packets.
#[derive(Debug, Clone, Default)]
pub struct TouchReportDecoder {
    markers: TouchMarkers,
}

impl TouchReportDecoder {
    pub fn new(markers: TouchMarkers) -> Self {
        Self { markers }
    }

    /// Create a decoder using the markers known for the given manufacturer
    pub fn for_profile(profile: &ManufacturerProfile) -> Self {
        Self::new(TouchMarkers {
            valid: profile.valid_touch_marker,
            ..Default::default()
        })
    }

    pub fn markers(&self) -> &TouchMarkers {
        &self.markers
    }

    /// Decode every touch block in the received bytes of a packet, in order of
    /// their offset. Every offset up to [MAX_MARKER_OFFSET] holding a marker
    /// byte starts a block, including offsets inside a previous block.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<TouchEvent>, DecodeError> {
        let mut events = Vec::new();
        for (offset, byte) in data.iter().enumerate().take(MAX_MARKER_OFFSET + 1) {
            let Some(kind) = self.markers.classify(*byte) else {
                continue;
            };
            let block = read_touch_block(data, offset)?;
            let event = TouchEvent::new(kind, block, offset);
            log::trace!("{event}");
            events.push(event);
        }

        Ok(events)
    }
}

/// Decode the touch blocks of a packet using the default markers
pub fn decode_touch_report(data: &[u8]) -> Result<Vec<TouchEvent>, DecodeError> {
    TouchReportDecoder::default().decode(data)
}

/// Unpack the touch block starting at `offset`. Fails if the block would start
/// past [MAX_MARKER_OFFSET] or extend past the received bytes.
pub fn read_touch_block(data: &[u8], offset: usize) -> Result<TouchBlock, DecodeError> {
    let end = offset + TOUCH_BLOCK_SIZE;
    if offset > MAX_MARKER_OFFSET {
        return Err(DecodeError::Truncated {
            needed: end,
            actual: data.len().min(MAX_MARKER_OFFSET + TOUCH_BLOCK_SIZE),
        });
    }
    let truncated = DecodeError::Truncated {
        needed: end,
        actual: data.len(),
    };
    let Some(bytes) = data.get(offset..end) else {
        return Err(truncated);
    };
    let bytes: &[u8; TOUCH_BLOCK_SIZE] = bytes.try_into().map_err(|_| truncated)?;

    Ok(TouchBlock::unpack(bytes)?)
}

/// Extract the firmware version from a vendor report
pub fn extract_firmware_version(data: &[u8]) -> Result<FirmwareVersion, DecodeError> {
    let truncated = DecodeError::Truncated {
        needed: FIRMWARE_REPORT_MIN_SIZE,
        actual: data.len(),
    };
    let Some(bytes) = data.get(..FIRMWARE_REPORT_MIN_SIZE) else {
        return Err(truncated);
    };
    let bytes: &[u8; FIRMWARE_REPORT_MIN_SIZE] = bytes.try_into().map_err(|_| truncated)?;
    let report = FirmwareVersionReport::unpack(bytes)?;

    Ok(report.into())
}
