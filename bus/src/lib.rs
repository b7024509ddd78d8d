//! # dmagate bus model
//!
//! The bus subsystem as the control layer sees it: topological addresses,
//! device records, driver objects, and the directory through which devices
//! are looked up, bound, and released.
//!
//! ## Components
//!
//! - **Addresses**: [`PciAddress`] names a single PCI function
//! - **Devices**: [`PciDevice`] with its command register and driver slot
//! - **Drivers**: [`PciDriver`] objects carrying an ID table
//! - **Directory**: the [`DeviceDirectory`] trait and its in-memory
//!   implementation [`BusDirectory`]
//!
//! Whether a device is claimed is only ever discoverable through the
//! directory's driver slot; nothing above this crate keeps its own record
//! of bindings.

#![no_std]

extern crate alloc;

pub mod addr;
pub mod device;
pub mod directory;
pub mod driver;

pub use addr::PciAddress;
pub use device::{ClassCode, Command, DeviceInfo, PciDevice, ProductId, VendorId};
pub use directory::{BusDirectory, DeviceDirectory, DirectoryStats};
pub use driver::{DeviceMatch, DriverId, DriverInfo, PciDriver};

/// Bus subsystem error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No device exists at the given address
    NoSuchDevice,
    /// The device already has a driver bound to it
    AlreadyBound,
    /// The device has no driver bound to it
    NotBound,
    /// The driver id names no registered driver
    UnknownDriver,
    /// The directory refused to register the driver
    RegistrationRefused,
    /// Attachment was refused
    AttachRefused,
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoSuchDevice => write!(f, "No device at the given address"),
            Self::AlreadyBound => write!(f, "Device already has a driver"),
            Self::NotBound => write!(f, "Device has no driver"),
            Self::UnknownDriver => write!(f, "Driver is not registered"),
            Self::RegistrationRefused => write!(f, "Driver registration refused"),
            Self::AttachRefused => write!(f, "Attachment refused"),
        }
    }
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;
