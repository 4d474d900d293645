use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use hidtouch::{
    config::ProfileRegistry,
    drivers::touch_controller::driver::SessionError,
    usb::{hidraw, libusb, DeviceEntry, TransportError},
};

use super::{Backend, CliError, DeviceArgs};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "VID")]
    vid: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Product")]
    product: String,
}

impl From<&DeviceEntry> for DeviceRow {
    fn from(entry: &DeviceEntry) -> Self {
        Self {
            vid: format!("0x{:04x}", entry.vendor_id),
            pid: format!("0x{:04x}", entry.product_id),
            manufacturer: entry.manufacturer.clone().unwrap_or_default(),
            product: entry.product.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct ManufacturerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Report ID")]
    report_id: String,
    #[tabled(rename = "Mode Offset")]
    offset: usize,
    #[tabled(rename = "Modes")]
    modes: String,
}

/// Returns all devices visible to the given backend
pub fn get_devices(backend: Backend) -> Result<Vec<DeviceEntry>, TransportError> {
    match backend {
        Backend::Libusb => libusb::list_devices(),
        Backend::Hidraw => hidraw::list_devices(),
    }
}

/// Print a table of all attached devices
pub fn print_devices(backend: Backend) -> Result<(), TransportError> {
    let devices = get_devices(backend)?;
    let count = devices.len();
    let rows: Vec<DeviceRow> = devices.iter().map(DeviceRow::from).collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header(format!("Attached Devices ({backend})")));
    println!("{table}");
    println!("Found {count} device(s)");

    Ok(())
}

pub fn handle_find(args: &DeviceArgs) -> Result<(), CliError> {
    let devices = get_devices(args.backend)?;
    let found = devices
        .iter()
        .find(|entry| entry.vendor_id == args.vid && entry.product_id == args.pid);

    let Some(entry) = found else {
        println!("Device {:04x}:{:04x} not found", args.vid, args.pid);
        print_devices(args.backend)?;
        return Err(SessionError::DeviceNotFound {
            vid: args.vid,
            pid: args.pid,
        }
        .into());
    };

    let product = entry.product.as_deref().unwrap_or("Unknown product");
    match entry.manufacturer.as_deref() {
        Some(manufacturer) => println!("Found {product} from {manufacturer}"),
        None => println!("Found {product}"),
    }

    Ok(())
}

pub fn handle_list(backend: Backend) -> Result<(), CliError> {
    print_devices(backend)?;
    Ok(())
}

pub fn handle_manufacturers(registry: &ProfileRegistry) {
    let rows: Vec<ManufacturerRow> = registry
        .profiles()
        .map(|profile| ManufacturerRow {
            name: profile.name.clone(),
            report_id: format!("0x{:02X}", profile.touch_mode_report_id),
            offset: profile.touch_mode_offset,
            modes: profile
                .mode_labels
                .iter()
                .map(|(code, label)| format!("{code}: {label}"))
                .collect::<Vec<String>>()
                .join("\n"),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Manufacturers"));
    println!("{table}");
}
