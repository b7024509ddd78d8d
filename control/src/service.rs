//! Control service: the composition root.

use alloc::sync::Arc;
use core::fmt;

use dmagate_bus::DeviceDirectory;

use crate::gate::RegistrationGate;
use crate::session::ControlSession;

/// Owns the shared registration gate and hands out sessions.
///
/// This is the control-device shell: [`open`](Self::open) is the
/// device-open path, [`shutdown`](Self::shutdown) the unload path. All
/// state is injected; independent services over independent directories
/// never interfere.
pub struct ControlService {
    gate: Arc<RegistrationGate>,
    directory: Arc<dyn DeviceDirectory>,
}

impl ControlService {
    /// Create a service over a directory
    pub fn new(directory: Arc<dyn DeviceDirectory>) -> Self {
        Self {
            gate: Arc::new(RegistrationGate::new()),
            directory,
        }
    }

    /// Open a new control session. No side effect.
    pub fn open(&self) -> ControlSession {
        ControlSession::open(self.gate.clone(), self.directory.clone())
    }

    /// Whether the enabler driver is currently registered
    pub fn is_registered(&self) -> bool {
        self.gate.is_registered()
    }

    /// Final release on unload: drop any registration still in place
    pub fn shutdown(self) {
        self.gate.unregister(self.directory.as_ref());
    }
}

impl fmt::Debug for ControlService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlService")
            .field("registered", &self.is_registered())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use dmagate_bus::{BusDirectory, ClassCode, PciAddress, PciDevice, ProductId, VendorId};

    use crate::request::{ControlRequest, EnableArgs};

    use super::*;

    const NIC_ADDR: PciAddress = PciAddress::from_bdf(0, 3, 0);

    fn directory_with_nic() -> Arc<BusDirectory> {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(PciDevice::new(
            NIC_ADDR,
            VendorId(0x8086),
            ProductId(0x100e),
            ClassCode::new(0x02, 0x00, 0x00),
        ));
        directory
    }

    #[test]
    fn test_sessions_share_one_gate() {
        let service = ControlService::new(directory_with_nic());

        let mut first = service.open();
        let second = service.open();

        first
            .submit(ControlRequest::Enable(EnableArgs {
                domain: 0,
                bus: 0,
                slot: 3,
                function: 0,
            }))
            .unwrap();
        assert!(service.is_registered());

        // closing the idle handle releases the shared registration too:
        // release is unconditional and the gate is process-wide
        second.close();
        assert!(!service.is_registered());
        drop(first);
    }

    #[test]
    fn test_shutdown_releases_registration() {
        let directory = directory_with_nic();
        let service = ControlService::new(directory.clone());

        let mut session = service.open();
        session
            .submit(ControlRequest::Enable(EnableArgs {
                domain: 0,
                bus: 0,
                slot: 3,
                function: 0,
            }))
            .unwrap();

        // leak the session without closing it, then unload the service
        core::mem::forget(session);
        service.shutdown();

        assert!(!directory.lookup(NIC_ADDR).unwrap().bus_master);
    }

    #[test]
    fn test_independent_services_do_not_interfere() {
        let service_a = ControlService::new(directory_with_nic());
        let service_b = ControlService::new(directory_with_nic());

        let mut session = service_a.open();
        session
            .submit(ControlRequest::Enable(EnableArgs {
                domain: 0,
                bus: 0,
                slot: 3,
                function: 0,
            }))
            .unwrap();

        assert!(service_a.is_registered());
        assert!(!service_b.is_registered());
    }
}
