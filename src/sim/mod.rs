pub mod devices;
pub mod location;
pub mod runner;

#[cfg(test)]
pub mod mock;

pub use devices::{list_devices, pick_default};
pub use location::{set_location, DeviceTarget};
pub use runner::{CommandRunner, ProcessRunner, SimctlError};
