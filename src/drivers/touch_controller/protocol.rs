//! Touch mode feature report commands.
//!
//! The mode is held in an 8-byte feature report. Byte 0 carries the report id
//! and the position of the mode byte depends on the manufacturer, see
//! [ManufacturerProfile].

use crate::{
    config::{ManufacturerProfile, SET_COMMAND_OFFSET},
    constants::{FEATURE_REPORT_SIZE, TOUCH_INTERFACE},
    usb::control::{report_value, ControlRequest, ReportType, HID_GET_REPORT, HID_SET_REPORT},
};

use super::DecodeError;

/// Build the GET_REPORT request reading the touch mode feature report
pub fn build_get_touch_mode(profile: &ManufacturerProfile) -> ControlRequest {
    ControlRequest::class_in(
        HID_GET_REPORT,
        report_value(ReportType::Feature, profile.touch_mode_report_id),
        TOUCH_INTERFACE as u16,
        FEATURE_REPORT_SIZE as u16,
    )
}

/// Build the SET_REPORT request writing `mode` into the touch mode feature
/// report. Bytes other than the report id, the optional command byte and the
/// mode are zero.
pub fn build_set_touch_mode(profile: &ManufacturerProfile, mode: u8) -> ControlRequest {
    let mut payload = vec![0; FEATURE_REPORT_SIZE];
    payload[0] = profile.touch_mode_report_id;
    if let Some(command) = profile.set_command {
        payload[SET_COMMAND_OFFSET] = command;
    }
    if let Some(field) = payload.get_mut(profile.touch_mode_offset) {
        *field = mode;
    }

    ControlRequest::class_out(
        HID_SET_REPORT,
        report_value(ReportType::Feature, profile.touch_mode_report_id),
        TOUCH_INTERFACE as u16,
        payload,
    )
}

/// Read the mode code out of a touch mode feature report
pub fn decode_touch_mode_response(
    profile: &ManufacturerProfile,
    response: &[u8],
) -> Result<u8, DecodeError> {
    let offset = profile.touch_mode_offset;
    response
        .get(offset)
        .copied()
        .ok_or(DecodeError::Truncated {
            needed: offset + 1,
            actual: response.len(),
        })
}

/// Returns the label of a mode code
pub fn resolve_label(profile: &ManufacturerProfile, mode: u8) -> Result<&str, DecodeError> {
    profile.label(mode).ok_or_else(|| DecodeError::UnknownMode {
        manufacturer: profile.name.clone(),
        code: mode,
    })
}
