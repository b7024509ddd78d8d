//! Device records as the directory tracks them.

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::addr::PciAddress;
use crate::driver::DriverId;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Vendor ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VendorId(pub u16);

/// Product (device) ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductId(pub u16);

/// Class code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassCode {
    /// Base class
    pub class: u8,
    /// Subclass
    pub subclass: u8,
    /// Programming interface
    pub prog_if: u8,
}

impl ClassCode {
    /// Create a new class code
    #[inline]
    pub const fn new(class: u8, subclass: u8, prog_if: u8) -> Self {
        Self {
            class,
            subclass,
            prog_if,
        }
    }

    /// Full class code as u32
    #[inline(always)]
    pub fn as_u32(&self) -> u32 {
        ((self.class as u32) << 16) | ((self.subclass as u32) << 8) | (self.prog_if as u32)
    }
}

// =============================================================================
// COMMAND REGISTER
// =============================================================================

bitflags! {
    /// PCI command register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Command: u16 {
        const IO_SPACE = 1 << 0;
        const MEMORY_SPACE = 1 << 1;
        const BUS_MASTER = 1 << 2;
        const SPECIAL_CYCLES = 1 << 3;
        const MEMORY_WRITE_INVALIDATE = 1 << 4;
        const VGA_PALETTE_SNOOP = 1 << 5;
        const PARITY_ERROR_RESPONSE = 1 << 6;
        const SERR_ENABLE = 1 << 8;
        const FAST_BACK_TO_BACK = 1 << 9;
        const INTERRUPT_DISABLE = 1 << 10;
    }
}

const_assert_eq!(Command::BUS_MASTER.bits(), 0x0004);

// =============================================================================
// DEVICE
// =============================================================================

/// A device present in the directory.
#[derive(Debug, Clone)]
pub struct PciDevice {
    address: PciAddress,
    /// Vendor ID
    pub vendor: VendorId,
    /// Product ID
    pub product: ProductId,
    /// Class code
    pub class: ClassCode,
    /// Command register state
    pub command: Command,
    /// Currently bound driver, if any
    pub(crate) driver: Option<DriverId>,
}

impl PciDevice {
    /// Create a new device with an empty command register and no driver
    pub fn new(address: PciAddress, vendor: VendorId, product: ProductId, class: ClassCode) -> Self {
        Self {
            address,
            vendor,
            product,
            class,
            command: Command::empty(),
            driver: None,
        }
    }

    /// The device's address
    #[inline]
    pub fn address(&self) -> PciAddress {
        self.address
    }

    /// Currently bound driver, if any
    #[inline]
    pub fn driver(&self) -> Option<DriverId> {
        self.driver
    }

    /// Has a driver attached?
    #[inline]
    pub fn has_driver(&self) -> bool {
        self.driver.is_some()
    }

    /// Is bus mastering enabled?
    #[inline]
    pub fn bus_master_enabled(&self) -> bool {
        self.command.contains(Command::BUS_MASTER)
    }

    /// Set or clear the bus-master bit
    pub fn set_bus_master(&mut self, enable: bool) {
        self.command.set(Command::BUS_MASTER, enable);
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A point-in-time view of one device, as returned by directory lookups.
///
/// Never stored: callers that care whether a device is still free must ask
/// the directory again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Address
    pub address: PciAddress,
    /// Vendor ID
    pub vendor: VendorId,
    /// Product ID
    pub product: ProductId,
    /// Class code
    pub class: ClassCode,
    /// Whether a driver is bound
    pub bound: bool,
    /// Whether bus mastering is enabled
    pub bus_master: bool,
}

impl From<&PciDevice> for DeviceInfo {
    fn from(device: &PciDevice) -> Self {
        Self {
            address: device.address,
            vendor: device.vendor,
            product: device.product,
            class: device.class,
            bound: device.has_driver(),
            bus_master: device.bus_master_enabled(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
