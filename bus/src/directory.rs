//! The device directory: lookup, binding, and driver registration.
//!
//! [`DeviceDirectory`] is the seam between the bus model and anything that
//! manages bindings from above. [`BusDirectory`] is the in-memory
//! implementation; a platform backend would implement the same trait over
//! real enumeration state.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use spin::RwLock;

use crate::addr::PciAddress;
use crate::device::{DeviceInfo, PciDevice};
use crate::driver::{DriverId, PciDriver};
use crate::{BusError, BusResult};

// =============================================================================
// DIRECTORY INTERFACE
// =============================================================================

/// Device lookup and binding operations.
///
/// The driver slot kept per device is the single source of truth for
/// busy/free; there is deliberately no way to observe a binding except by
/// asking the directory.
pub trait DeviceDirectory: Send + Sync {
    /// Register a driver.
    ///
    /// Runs the match pass over every present, unbound device: a device is
    /// auto-bound when an ID-table row matches it and the driver's probe
    /// accepts it.
    fn register_driver(&self, driver: Arc<dyn PciDriver>) -> BusResult<DriverId>;

    /// Unregister a driver, detaching it from any device still bound to it
    /// (the driver's remove callback runs for each).
    fn unregister_driver(&self, id: DriverId) -> BusResult<()>;

    /// Find the device at `address`.
    fn lookup(&self, address: PciAddress) -> Option<DeviceInfo>;

    /// Whether the device at `address` has a driver bound.
    fn is_bound(&self, address: PciAddress) -> BusResult<bool>;

    /// Directly assign `driver` to the device, bypassing match and probe.
    ///
    /// Fails with [`BusError::AlreadyBound`] if any driver holds the device;
    /// this check is what serializes concurrent claim attempts.
    fn force_bind(&self, address: PciAddress, driver: DriverId) -> BusResult<()>;

    /// Finish attaching the device.
    ///
    /// A device with a pre-assigned driver is attached as-is, without
    /// consulting its probe. An unbound device goes through the normal
    /// match/probe pass instead.
    fn attach(&self, address: PciAddress) -> BusResult<()>;

    /// Drop the device's driver association without running remove.
    ///
    /// Rollback path for a forced assignment that never completed
    /// attachment.
    fn unbind(&self, address: PciAddress) -> BusResult<()>;

    /// Set or clear bus mastering on the device.
    fn set_bus_master(&self, address: PciAddress, enable: bool) -> BusResult<()>;
}

// =============================================================================
// IN-MEMORY DIRECTORY
// =============================================================================

/// In-memory device directory.
pub struct BusDirectory {
    /// Devices by address
    devices: RwLock<BTreeMap<PciAddress, PciDevice>>,
    /// Registered drivers
    drivers: RwLock<BTreeMap<DriverId, Arc<dyn PciDriver>>>,
    /// Next driver id
    next_driver_id: AtomicU64,
    /// Bindings made by the match pass
    auto_binds: AtomicU32,
    /// Bindings made by forced assignment
    forced_binds: AtomicU32,
}

impl BusDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(BTreeMap::new()),
            drivers: RwLock::new(BTreeMap::new()),
            next_driver_id: AtomicU64::new(1),
            auto_binds: AtomicU32::new(0),
            forced_binds: AtomicU32::new(0),
        }
    }

    /// Add a device, replacing any previous entry at the same address
    pub fn insert_device(&self, device: PciDevice) {
        self.devices.write().insert(device.address(), device);
    }

    /// Number of devices present
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Number of registered drivers
    pub fn driver_count(&self) -> usize {
        self.drivers.read().len()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> DirectoryStats {
        DirectoryStats {
            devices: self.device_count(),
            drivers: self.driver_count(),
            auto_binds: self.auto_binds.load(Ordering::Relaxed),
            forced_binds: self.forced_binds.load(Ordering::Relaxed),
        }
    }
}

impl Default for BusDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BusDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusDirectory")
            .field("devices", &self.device_count())
            .field("drivers", &self.driver_count())
            .finish_non_exhaustive()
    }
}

impl DeviceDirectory for BusDirectory {
    fn register_driver(&self, driver: Arc<dyn PciDriver>) -> BusResult<DriverId> {
        let id = self.next_driver_id.fetch_add(1, Ordering::SeqCst);
        self.drivers.write().insert(id, driver.clone());
        log::debug!("driver '{}' registered ({})", driver.info().name, id);

        // Match pass over every present, unbound device. A driver with an
        // empty ID table is never consulted.
        let mut devices = self.devices.write();
        for device in devices.values_mut() {
            if device.has_driver() {
                continue;
            }
            if driver.info().matches(device) && driver.probe(device) {
                device.driver = Some(id);
                self.auto_binds.fetch_add(1, Ordering::Relaxed);
                log::debug!("{}: bound to driver '{}'", device.address(), driver.info().name);
            }
        }

        Ok(id)
    }

    fn unregister_driver(&self, id: DriverId) -> BusResult<()> {
        let driver = self
            .drivers
            .write()
            .remove(&id)
            .ok_or(BusError::UnknownDriver)?;

        let mut devices = self.devices.write();
        for device in devices.values_mut() {
            if device.driver == Some(id) {
                driver.remove(device);
                device.driver = None;
                log::debug!(
                    "{}: detached from driver '{}'",
                    device.address(),
                    driver.info().name
                );
            }
        }

        Ok(())
    }

    fn lookup(&self, address: PciAddress) -> Option<DeviceInfo> {
        self.devices.read().get(&address).map(DeviceInfo::from)
    }

    fn is_bound(&self, address: PciAddress) -> BusResult<bool> {
        self.devices
            .read()
            .get(&address)
            .map(PciDevice::has_driver)
            .ok_or(BusError::NoSuchDevice)
    }

    fn force_bind(&self, address: PciAddress, driver: DriverId) -> BusResult<()> {
        if !self.drivers.read().contains_key(&driver) {
            return Err(BusError::UnknownDriver);
        }

        let mut devices = self.devices.write();
        let device = devices.get_mut(&address).ok_or(BusError::NoSuchDevice)?;
        if device.has_driver() {
            return Err(BusError::AlreadyBound);
        }
        device.driver = Some(driver);
        self.forced_binds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn attach(&self, address: PciAddress) -> BusResult<()> {
        let drivers = self.drivers.read();
        let mut devices = self.devices.write();
        let device = devices.get_mut(&address).ok_or(BusError::NoSuchDevice)?;

        match device.driver {
            // a pre-assigned driver is honored as-is, provided it is still
            // registered
            Some(id) => {
                if drivers.contains_key(&id) {
                    Ok(())
                } else {
                    Err(BusError::AttachRefused)
                }
            }
            // otherwise the normal match/probe pass decides
            None => {
                for (id, driver) in drivers.iter() {
                    if driver.info().matches(device) && driver.probe(device) {
                        device.driver = Some(*id);
                        self.auto_binds.fetch_add(1, Ordering::Relaxed);
                        return Ok(());
                    }
                }
                Err(BusError::AttachRefused)
            }
        }
    }

    fn unbind(&self, address: PciAddress) -> BusResult<()> {
        let mut devices = self.devices.write();
        let device = devices.get_mut(&address).ok_or(BusError::NoSuchDevice)?;
        if device.driver.take().is_none() {
            return Err(BusError::NotBound);
        }
        Ok(())
    }

    fn set_bus_master(&self, address: PciAddress, enable: bool) -> BusResult<()> {
        let mut devices = self.devices.write();
        let device = devices.get_mut(&address).ok_or(BusError::NoSuchDevice)?;
        device.set_bus_master(enable);
        Ok(())
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Directory statistics
#[derive(Debug, Clone, Copy)]
pub struct DirectoryStats {
    /// Devices present
    pub devices: usize,
    /// Drivers registered
    pub drivers: usize,
    /// Bindings made by the match pass
    pub auto_binds: u32,
    /// Bindings made by forced assignment
    pub forced_binds: u32,
}

// =============================================================================
// TESTS
// =============================================================================
