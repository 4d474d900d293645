use std::collections::BTreeMap;

use hidtouch::{
    config::{ManufacturerProfile, ProfileRegistry},
    drivers::touch_controller::{
        decoder::TouchReportDecoder,
        driver::{Driver, SessionError},
        protocol::resolve_label,
    },
    sync::CancelToken,
    usb::UsbTransport,
};

use super::{open_driver, CliError, DeviceArgs, LayoutArgs};

/// Name to look the device up by in the registry
fn manufacturer_name<T: UsbTransport>(driver: &Driver<T>, args: &DeviceArgs) -> String {
    args.manufacturer
        .as_deref()
        .or(driver.manufacturer())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Returns the profile to use for the touch mode report. Layout arguments
/// override the registered profile, or stand in for it when the manufacturer
/// is not registered.
fn resolve_profile<T: UsbTransport>(
    driver: &Driver<T>,
    args: &DeviceArgs,
    layout: &LayoutArgs,
    registry: &ProfileRegistry,
) -> Result<ManufacturerProfile, CliError> {
    let name = manufacturer_name(driver, args);
    let mut profile = match registry.lookup(&name) {
        Ok(profile) => profile.clone(),
        Err(e) => {
            let (Some(rid), Some(offset)) = (layout.rid, layout.offset) else {
                return Err(SessionError::from(e).into());
            };
            log::info!("Using report id 0x{rid:02X} with mode offset {offset} for '{name}'");
            ManufacturerProfile {
                name: if name.is_empty() {
                    "Unknown".to_string()
                } else {
                    name
                },
                touch_mode_report_id: rid,
                touch_mode_offset: offset,
                set_command: None,
                valid_touch_marker: None,
                mode_labels: BTreeMap::new(),
            }
        }
    };

    if let Some(rid) = layout.rid {
        profile.touch_mode_report_id = rid;
    }
    if let Some(offset) = layout.offset {
        profile.touch_mode_offset = offset;
    }
    profile.validate()?;

    Ok(profile)
}

/// Returns a printable description of the given mode code
fn describe_mode(profile: &ManufacturerProfile, mode: u8) -> String {
    match resolve_label(profile, mode) {
        Ok(label) => format!("{label} (0x{mode:02X})"),
        Err(e) => {
            log::warn!("{e}");
            format!("0x{mode:02X}")
        }
    }
}

pub fn handle_get_mode(
    args: &DeviceArgs,
    layout: &LayoutArgs,
    registry: &ProfileRegistry,
) -> Result<(), CliError> {
    let mut driver = open_driver(args)?;
    let profile = resolve_profile(&driver, args, layout, registry)?;

    let mode = driver.get_touch_mode(&profile)?;
    println!("Current touch mode is {}", describe_mode(&profile, mode));

    Ok(())
}

pub fn handle_set_mode(
    args: &DeviceArgs,
    layout: &LayoutArgs,
    registry: &ProfileRegistry,
    mode: u8,
    reset: bool,
) -> Result<(), CliError> {
    let mut driver = open_driver(args)?;
    let profile = resolve_profile(&driver, args, layout, registry)?;

    driver.set_touch_mode(&profile, mode)?;
    println!("Touch mode set to {}", describe_mode(&profile, mode));

    if reset {
        // The device re-enumerates, so the handle may be gone once this returns
        if let Err(e) = driver.reset() {
            log::warn!("Device reset returned: {e}");
        }
    }

    Ok(())
}

pub fn handle_firmware(args: &DeviceArgs) -> Result<(), CliError> {
    let mut driver = open_driver(args)?;
    let version = driver.firmware_version()?;
    println!("Firmware version: {version}");

    Ok(())
}

pub fn handle_watch(
    args: &DeviceArgs,
    registry: &ProfileRegistry,
    cancel: &CancelToken,
    count: Option<usize>,
) -> Result<(), CliError> {
    let mut driver = open_driver(args)?;
    let name = manufacturer_name(&driver, args);
    let decoder = match registry.lookup(&name) {
        Ok(profile) => TouchReportDecoder::for_profile(profile),
        Err(e) => {
            log::debug!("{e}, using default touch markers");
            TouchReportDecoder::default()
        }
    };

    println!("Reading touch reports, press Ctrl+C to stop");
    let total = driver.watch(&decoder, cancel, count, |packet, events| {
        log::debug!("Received {} bytes", packet.received_length());
        match events {
            Ok(events) => {
                for event in events {
                    println!("{event}");
                }
            }
            Err(e) => log::warn!("Unable to decode packet: {e}"),
        }
    })?;
    println!("Read {total} packet(s)");

    Ok(())
}
