//! Forced binding of the enabler driver to one device.

use alloc::sync::Arc;
use core::fmt;

use dmagate_bus::{BusError, DeviceDirectory, DriverId, PciAddress};

use crate::error::{ControlError, ControlResult};
use crate::gate::RegistrationGate;
use crate::request::EnableArgs;

/// Binds the enabler driver to a specific device, bypassing the directory's
/// match/probe decision.
///
/// The binder keeps no device state of its own: whether a device is claimed
/// is only ever read back from the directory. It operates on a device for
/// the duration of one call and owns nothing beyond its injected handles.
pub struct ForcedBinder {
    gate: Arc<RegistrationGate>,
    directory: Arc<dyn DeviceDirectory>,
}

impl ForcedBinder {
    /// Create a binder over the shared gate and directory
    pub fn new(gate: Arc<RegistrationGate>, directory: Arc<dyn DeviceDirectory>) -> Self {
        Self { gate, directory }
    }

    /// Claim the device named by raw request arguments.
    ///
    /// An out-of-range part can name no device, so it takes the same exit
    /// as an address where lookup finds nothing.
    pub fn enable_args(&self, args: EnableArgs) -> ControlResult<()> {
        let driver = self.gate.register(self.directory.as_ref())?;
        match PciAddress::from_parts(args.domain, args.bus, args.slot, args.function) {
            Some(address) => self.claim(address, driver),
            None => self.fail(ControlError::InvalidAddress),
        }
    }

    /// Claim the device at `address` and enable bus mastering on it.
    ///
    /// Registration and the claim persist until [`disable`](Self::disable).
    pub fn enable(&self, address: PciAddress) -> ControlResult<()> {
        let driver = self.gate.register(self.directory.as_ref())?;
        self.claim(address, driver)
    }

    fn claim(&self, address: PciAddress, driver: DriverId) -> ControlResult<()> {
        let device = match self.directory.lookup(address) {
            Some(info) => info,
            None => return self.fail(ControlError::InvalidAddress),
        };
        if device.bound {
            return self.fail(ControlError::DeviceBusy);
        }

        if let Err(err) = self.directory.force_bind(address, driver) {
            return self.fail(match err {
                // lost the race for the driver slot
                BusError::AlreadyBound => ControlError::DeviceBusy,
                BusError::NoSuchDevice => ControlError::InvalidAddress,
                _ => ControlError::AttachFailed,
            });
        }
        if self.directory.attach(address).is_err() {
            let _ = self.directory.unbind(address);
            return self.fail(ControlError::AttachFailed);
        }
        if self.directory.set_bus_master(address, true).is_err() {
            let _ = self.directory.unbind(address);
            return self.fail(ControlError::AttachFailed);
        }

        log::info!("{}: claimed", address);
        Ok(())
    }

    /// Release whatever is claimed.
    ///
    /// Unregistering detaches the enabler driver from any device bound to
    /// it, and the driver's remove path clears bus mastering. Best-effort:
    /// the caller never sees a failure.
    pub fn disable(&self) {
        self.gate.unregister(self.directory.as_ref());
    }

    /// Failure exit: restore the pre-request state before surfacing the error
    fn fail(&self, error: ControlError) -> ControlResult<()> {
        self.gate.unregister(self.directory.as_ref());
        Err(error)
    }
}

impl fmt::Debug for ForcedBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForcedBinder")
            .field("registered", &self.gate.is_registered())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use dmagate_bus::{
        BusDirectory, BusResult, ClassCode, DeviceInfo, DeviceMatch, DriverInfo, PciDevice,
        PciDriver, ProductId, VendorId,
    };

    use super::*;

    const NIC_ADDR: PciAddress = PciAddress::from_bdf(0, 3, 0);
    const SSD_ADDR: PciAddress = PciAddress::from_bdf(1, 0, 0);

    fn nic() -> PciDevice {
        PciDevice::new(
            NIC_ADDR,
            VendorId(0x8086),
            ProductId(0x100e),
            ClassCode::new(0x02, 0x00, 0x00),
        )
    }

    fn ssd() -> PciDevice {
        PciDevice::new(
            SSD_ADDR,
            VendorId(0x144d),
            ProductId(0xa808),
            ClassCode::new(0x01, 0x08, 0x02),
        )
    }

    fn binder_over(directory: Arc<dyn DeviceDirectory>) -> ForcedBinder {
        ForcedBinder::new(Arc::new(RegistrationGate::new()), directory)
    }

    #[test]
    fn test_enable_unknown_address_unwinds() {
        let directory = Arc::new(BusDirectory::new());
        let binder = binder_over(directory.clone());

        let result = binder.enable(NIC_ADDR);

        assert_eq!(result, Err(ControlError::InvalidAddress));
        assert!(!binder.gate.is_registered());
        assert_eq!(directory.driver_count(), 0);
    }

    #[test]
    fn test_enable_out_of_range_args_unwinds() {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(nic());
        let binder = binder_over(directory.clone());

        let result = binder.enable_args(EnableArgs {
            domain: 0,
            bus: 0x1_0000,
            slot: 0,
            function: 0,
        });

        assert_eq!(result, Err(ControlError::InvalidAddress));
        assert!(!binder.gate.is_registered());
    }

    #[test]
    fn test_enable_busy_device_unwinds() {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(nic());
        let binder = binder_over(directory.clone());

        // first claim wins
        binder.enable(NIC_ADDR).unwrap();

        // a second binder over the same directory sees the device busy
        let second = binder_over(directory.clone());
        assert_eq!(second.enable(NIC_ADDR), Err(ControlError::DeviceBusy));
        assert!(!second.gate.is_registered());
    }

    /// Foreign driver that takes the NIC during the normal match pass.
    struct TakerDriver {
        info: DriverInfo,
    }

    impl TakerDriver {
        fn new() -> Self {
            Self {
                info: DriverInfo::new("e1000-test").with_match(DeviceMatch::vendor_product(
                    VendorId(0x8086),
                    ProductId(0x100e),
                )),
            }
        }
    }

    impl PciDriver for TakerDriver {
        fn info(&self) -> &DriverInfo {
            &self.info
        }

        fn probe(&self, _device: &PciDevice) -> bool {
            true
        }
    }

    #[test]
    fn test_enable_rejects_foreign_binding() {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(nic());
        directory
            .register_driver(Arc::new(TakerDriver::new()))
            .unwrap();
        let binder = binder_over(directory.clone());

        // busy means bound to any driver, not just ours
        assert_eq!(binder.enable(NIC_ADDR), Err(ControlError::DeviceBusy));
        assert!(!binder.gate.is_registered());
        assert!(directory.lookup(NIC_ADDR).unwrap().bound);
    }

    #[test]
    fn test_enable_claims_and_masters() {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(nic());
        let binder = binder_over(directory.clone());

        binder.enable(NIC_ADDR).unwrap();

        assert!(binder.gate.is_registered());
        let info = directory.lookup(NIC_ADDR).unwrap();
        assert!(info.bound);
        assert!(info.bus_master);
    }

    #[test]
    fn test_disable_releases_claim() {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(nic());
        let binder = binder_over(directory.clone());

        binder.enable(NIC_ADDR).unwrap();
        binder.disable();

        assert!(!binder.gate.is_registered());
        let info = directory.lookup(NIC_ADDR).unwrap();
        assert!(!info.bound);
        assert!(!info.bus_master);
    }

    #[test]
    fn test_disable_without_claim_is_noop() {
        let directory = Arc::new(BusDirectory::new());
        let binder = binder_over(directory);
        binder.disable();
        assert!(!binder.gate.is_registered());
    }

    #[test]
    fn test_second_enable_depends_only_on_target() {
        let directory = Arc::new(BusDirectory::new());
        directory.insert_device(nic());
        directory.insert_device(ssd());
        let binder = binder_over(directory.clone());

        binder.enable(NIC_ADDR).unwrap();
        binder.enable(SSD_ADDR).unwrap();

        assert!(directory.lookup(NIC_ADDR).unwrap().bus_master);
        assert!(directory.lookup(SSD_ADDR).unwrap().bus_master);

        // one release restores both: the driver is detached everywhere
        binder.disable();
        assert!(!directory.lookup(NIC_ADDR).unwrap().bus_master);
        assert!(!directory.lookup(SSD_ADDR).unwrap().bus_master);
    }

    /// Delegates to a real directory but refuses to finish any attachment.
    struct RefusingAttach(BusDirectory);

    impl DeviceDirectory for RefusingAttach {
        fn register_driver(&self, driver: Arc<dyn PciDriver>) -> BusResult<DriverId> {
            self.0.register_driver(driver)
        }

        fn unregister_driver(&self, id: DriverId) -> BusResult<()> {
            self.0.unregister_driver(id)
        }

        fn lookup(&self, address: PciAddress) -> Option<DeviceInfo> {
            self.0.lookup(address)
        }

        fn is_bound(&self, address: PciAddress) -> BusResult<bool> {
            self.0.is_bound(address)
        }

        fn force_bind(&self, address: PciAddress, driver: DriverId) -> BusResult<()> {
            self.0.force_bind(address, driver)
        }

        fn attach(&self, _address: PciAddress) -> BusResult<()> {
            Err(BusError::AttachRefused)
        }

        fn unbind(&self, address: PciAddress) -> BusResult<()> {
            self.0.unbind(address)
        }

        fn set_bus_master(&self, address: PciAddress, enable: bool) -> BusResult<()> {
            self.0.set_bus_master(address, enable)
        }
    }

    #[test]
    fn test_attach_refusal_rolls_back_forced_association() {
        let inner = BusDirectory::new();
        inner.insert_device(nic());
        let directory = Arc::new(RefusingAttach(inner));
        let binder = binder_over(directory.clone());

        assert_eq!(binder.enable(NIC_ADDR), Err(ControlError::AttachFailed));

        // the forced association was rolled back and the gate unwound
        assert!(!binder.gate.is_registered());
        let info = directory.lookup(NIC_ADDR).unwrap();
        assert!(!info.bound);
        assert!(!info.bus_master);
    }
}
