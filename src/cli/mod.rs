pub mod device;
pub mod touch;

use std::{error::Error, fmt::Display, num::ParseIntError, path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use device::{handle_find, handle_list, handle_manufacturers};
use hidtouch::{
    config::{path::get_manufacturers_paths, ProfileRegistry},
    drivers::touch_controller::driver::{Driver, SessionError},
    sync::CancelToken,
    usb::{hidraw::HidrawTransport, libusb::LibusbTransport, UsbTransport},
};
use touch::{handle_firmware, handle_get_mode, handle_set_mode, handle_watch};

/// Error type returned by every command handler
pub type CliError = Box<dyn Error + Send + Sync>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Additional directory to load manufacturer profiles from
    #[arg(long, global = true)]
    pub profiles: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check whether a device is attached
    Find {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// List all attached devices
    List {
        /// Backend used to enumerate devices
        #[arg(long, value_enum, default_value_t = Backend::Libusb)]
        backend: Backend,
    },
    /// List the registered manufacturer profiles
    Manufacturers,
    /// Get the current touch mode
    GetMode {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Set the touch mode
    SetMode {
        #[command(flatten)]
        device: DeviceArgs,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Touch mode code to write (decimal or 0x hex)
        #[arg(long, value_parser = parse_u8)]
        mode: u8,
        /// Reset the device after writing the mode
        #[arg(long, action)]
        reset: bool,
    },
    /// Get the firmware version
    Firmware {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Print touch reports as they arrive until interrupted
    Watch {
        #[command(flatten)]
        device: DeviceArgs,
        /// Stop after this many packets
        #[arg(long)]
        count: Option<usize>,
    },
}

/// Arguments selecting and opening a device
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Vendor ID (decimal or 0x hex)
    #[arg(long, value_parser = parse_u16)]
    pub vid: u16,
    /// Product ID (decimal or 0x hex)
    #[arg(long, value_parser = parse_u16)]
    pub pid: u16,
    /// Backend used to talk to the device
    #[arg(long, value_enum, default_value_t = Backend::Libusb)]
    pub backend: Backend,
    /// Transfer timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub timeout: u64,
    /// Manufacturer to use instead of the device's manufacturer string
    #[arg(long)]
    pub manufacturer: Option<String>,
}

impl DeviceArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Touch mode report layout for devices without a registered profile
#[derive(clap::Args, Debug, Clone)]
pub struct LayoutArgs {
    /// Report id of the touch mode feature report (decimal or 0x hex)
    #[arg(long, value_parser = parse_u8)]
    pub rid: Option<u8>,
    /// Byte offset of the mode inside the feature report
    #[arg(long)]
    pub offset: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Talk to the device directly through libusb
    Libusb,
    /// Go through the kernel's hidraw interface
    Hidraw,
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Backend::Libusb => "libusb",
            Backend::Hidraw => "hidraw",
        };
        write!(f, "{}", value)
    }
}

/// Run the given command. Blocks until the command completes, so this should
/// run on a thread that is allowed to block.
pub fn main_cli(args: Args, cancel: &CancelToken) -> Result<(), CliError> {
    let mut paths = get_manufacturers_paths();
    if let Some(path) = args.profiles {
        paths.push(path);
    }

    match args.cmd {
        Commands::Find { device } => handle_find(&device)?,
        Commands::List { backend } => handle_list(backend)?,
        Commands::Manufacturers => handle_manufacturers(&ProfileRegistry::load(&paths)),
        Commands::GetMode { device, layout } => {
            let registry = ProfileRegistry::load(&paths);
            handle_get_mode(&device, &layout, &registry)?
        }
        Commands::SetMode {
            device,
            layout,
            mode,
            reset,
        } => {
            let registry = ProfileRegistry::load(&paths);
            handle_set_mode(&device, &layout, &registry, mode, reset)?
        }
        Commands::Firmware { device } => handle_firmware(&device)?,
        Commands::Watch { device, count } => {
            let registry = ProfileRegistry::load(&paths);
            handle_watch(&device, &registry, cancel, count)?
        }
    }

    Ok(())
}

/// Open the device with the selected backend
pub fn open_driver(
    args: &DeviceArgs,
) -> Result<Driver<Box<dyn UsbTransport>>, SessionError> {
    let transport: Option<Box<dyn UsbTransport>> = match args.backend {
        Backend::Libusb => LibusbTransport::open(args.vid, args.pid)?
            .map(|transport| Box::new(transport) as Box<dyn UsbTransport>),
        Backend::Hidraw => HidrawTransport::open(args.vid, args.pid)?
            .map(|transport| Box::new(transport) as Box<dyn UsbTransport>),
    };
    let Some(transport) = transport else {
        println!("Device {:04x}:{:04x} not found", args.vid, args.pid);
        if let Err(e) = device::print_devices(args.backend) {
            log::error!("Unable to list devices: {e}");
        }
        return Err(SessionError::DeviceNotFound {
            vid: args.vid,
            pid: args.pid,
        });
    };

    let driver = Driver::new(transport)?.with_timeouts(args.timeout(), args.timeout());
    Ok(driver)
}

/// Parse an integer given in decimal or with a 0x prefix as hex
fn parse_int(value: &str) -> Result<u64, ParseIntError> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    }
}

fn parse_u16(value: &str) -> Result<u16, String> {
    let value = parse_int(value).map_err(|e| e.to_string())?;
    u16::try_from(value).map_err(|e| e.to_string())
}

fn parse_u8(value: &str) -> Result<u8, String> {
    let value = parse_int(value).map_err(|e| e.to_string())?;
    u8::try_from(value).map_err(|e| e.to_string())
}
