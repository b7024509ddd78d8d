//! The enabler driver.
//!
//! A registered driver whose only purpose is to occupy a device's driver
//! slot. It declares no ID table and declines every probe, so the
//! directory's auto-bind pass never touches it; binding happens solely by
//! forced assignment. Its remove path clears bus mastering, which means
//! unregistering the driver is enough to restore any device it was holding.

use dmagate_bus::{DriverInfo, PciDevice, PciDriver};

/// Name the enabler driver registers under.
pub const ENABLER_DRIVER_NAME: &str = "dmagate";

/// The always-declining placeholder driver.
#[derive(Debug)]
pub struct EnablerDriver {
    info: DriverInfo,
}

impl EnablerDriver {
    /// Create a driver instance with an empty ID table
    pub fn new() -> Self {
        Self {
            info: DriverInfo::new(ENABLER_DRIVER_NAME),
        }
    }
}

impl Default for EnablerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PciDriver for EnablerDriver {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    // responds negatively to every probe request
    fn probe(&self, _device: &PciDevice) -> bool {
        false
    }

    fn remove(&self, device: &mut PciDevice) {
        device.set_bus_master(false);
        log::info!("{}: released", device.address());
    }
}

// =============================================================================
// TESTS
// =============================================================================
