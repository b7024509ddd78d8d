//! Process-wide registration gate.

use alloc::sync::Arc;

use spin::Mutex;

use dmagate_bus::{DeviceDirectory, DriverId};

use crate::driver::EnablerDriver;
use crate::error::{ControlError, ControlResult};

/// Tracks whether the enabler driver is currently registered.
///
/// One instance is shared by every session of a control service; it is an
/// explicit service object, injected rather than reached through a global.
/// The slot holds the registered driver id and is `Some` if and only if the
/// driver is registered with the directory.
#[derive(Debug)]
pub struct RegistrationGate {
    slot: Mutex<Option<DriverId>>,
}

impl RegistrationGate {
    /// Create an unregistered gate
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Register the enabler driver if it is not registered yet.
    ///
    /// Idempotent: a second call returns the existing id. The lock covers
    /// the registration call itself, nothing more; device binding work
    /// happens outside it.
    pub fn register(&self, directory: &dyn DeviceDirectory) -> ControlResult<DriverId> {
        let mut slot = self.slot.lock();
        if let Some(id) = *slot {
            return Ok(id);
        }

        let id = directory
            .register_driver(Arc::new(EnablerDriver::new()))
            .map_err(|err| {
                log::warn!("enabler driver registration failed: {}", err);
                ControlError::RegistrationFailed
            })?;
        *slot = Some(id);
        Ok(id)
    }

    /// Unregister if registered, detaching the driver from any device still
    /// bound to it. No-op otherwise; never fails from the caller's view.
    pub fn unregister(&self, directory: &dyn DeviceDirectory) {
        let mut slot = self.slot.lock();
        if let Some(id) = slot.take() {
            if let Err(err) = directory.unregister_driver(id) {
                log::warn!("enabler driver {} not released cleanly: {}", id, err);
            }
        }
    }

    /// Whether the enabler driver is currently registered
    pub fn is_registered(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl Default for RegistrationGate {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
