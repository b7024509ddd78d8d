//! Driver objects and ID-table matching.

use alloc::vec::Vec;

use crate::device::{PciDevice, ProductId, VendorId};

/// Driver ID, assigned by the directory at registration time
pub type DriverId = u64;

// =============================================================================
// MATCHING
// =============================================================================

/// Device matching criteria (one row of a driver's ID table)
#[derive(Debug, Clone, Copy)]
pub struct DeviceMatch {
    /// Required vendor, if any
    pub vendor: Option<VendorId>,
    /// Required product, if any
    pub product: Option<ProductId>,
    /// Required class code under `class_mask`, if any
    pub class: Option<u32>,
    /// Mask applied to the class code comparison
    pub class_mask: u32,
}

impl DeviceMatch {
    /// Match a specific vendor/product pair
    pub const fn vendor_product(vendor: VendorId, product: ProductId) -> Self {
        Self {
            vendor: Some(vendor),
            product: Some(product),
            class: None,
            class_mask: 0,
        }
    }

    /// Match a device class
    pub const fn class(class: u32, mask: u32) -> Self {
        Self {
            vendor: None,
            product: None,
            class: Some(class),
            class_mask: mask,
        }
    }

    /// Check whether a device satisfies this row
    pub fn matches(&self, device: &PciDevice) -> bool {
        if let Some(vendor) = self.vendor {
            if device.vendor != vendor {
                return false;
            }
        }

        if let Some(product) = self.product {
            if device.product != product {
                return false;
            }
        }

        if let Some(class) = self.class {
            if (device.class.as_u32() & self.class_mask) != (class & self.class_mask) {
                return false;
            }
        }

        true
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Driver metadata
#[derive(Debug, Clone)]
pub struct DriverInfo {
    /// Driver name (for logging)
    pub name: &'static str,
    /// ID table; empty means the driver matches no device
    pub match_table: Vec<DeviceMatch>,
}

impl DriverInfo {
    /// Create info with an empty ID table
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            match_table: Vec::new(),
        }
    }

    /// Append a row to the ID table
    pub fn with_match(mut self, entry: DeviceMatch) -> Self {
        self.match_table.push(entry);
        self
    }

    /// Check whether any ID-table row matches the device
    pub fn matches(&self, device: &PciDevice) -> bool {
        self.match_table.iter().any(|entry| entry.matches(device))
    }
}

/// A driver as seen by the directory.
pub trait PciDriver: Send + Sync {
    /// Driver metadata
    fn info(&self) -> &DriverInfo;

    /// Decide whether to take the device; `true` binds it
    fn probe(&self, device: &PciDevice) -> bool;

    /// Called when the device is detached from this driver
    fn remove(&self, _device: &mut PciDevice) {}
}

// =============================================================================
// TESTS
// =============================================================================
