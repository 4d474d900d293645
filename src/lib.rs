pub mod config;
pub mod constants;
pub mod drivers;
pub mod sync;
pub mod usb;
