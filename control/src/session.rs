//! Control sessions.

use alloc::sync::Arc;

use dmagate_bus::DeviceDirectory;

use crate::binder::ForcedBinder;
use crate::error::ControlResult;
use crate::gate::RegistrationGate;
use crate::request::{ControlRequest, RequestCode};

/// Lifecycle of one control handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No enable request has succeeded on this handle
    Idle,
    /// An enable on this handle succeeded
    Claimed,
    /// The handle was closed and its claim released
    Released,
}

/// One open handle to the control surface.
///
/// Opening has no side effect. Closing (or dropping) always attempts a
/// release: it unregisters the enabler driver and thereby clears bus
/// mastering on whatever device is attached, a safe no-op when nothing is
/// registered.
#[derive(Debug)]
pub struct ControlSession {
    binder: ForcedBinder,
    state: SessionState,
}

impl ControlSession {
    /// Open a handle over the shared gate and directory
    pub fn open(gate: Arc<RegistrationGate>, directory: Arc<dyn DeviceDirectory>) -> Self {
        Self {
            binder: ForcedBinder::new(gate, directory),
            state: SessionState::Idle,
        }
    }

    /// Handle a raw request as it arrives from the caller
    pub fn handle_raw(&mut self, code: RequestCode, payload: &[u8]) -> ControlResult<()> {
        let request = ControlRequest::decode(code, payload)?;
        self.submit(request)
    }

    /// Submit a decoded request.
    ///
    /// A second enable on the same handle re-runs the full sequence; its
    /// outcome depends only on the target device's binding state. On
    /// failure the process-wide state is back to unregistered.
    pub fn submit(&mut self, request: ControlRequest) -> ControlResult<()> {
        match request {
            ControlRequest::Enable(args) => {
                self.binder.enable_args(args)?;
                self.state = SessionState::Claimed;
                Ok(())
            }
        }
    }

    /// Close the handle, releasing any claim. Cannot fail.
    pub fn close(self) {}

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    fn release(&mut self) {
        if self.state != SessionState::Released {
            self.binder.disable();
            self.state = SessionState::Released;
        }
    }
}

impl Drop for ControlSession {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// TESTS
// =============================================================================
