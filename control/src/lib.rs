//! # dmagate control surface
//!
//! Claim/release machinery for enabling bus mastering on a PCI device that
//! has no driver of its own.
//!
//! ## How a claim works
//!
//! ```text
//! session ── enable(addr) ──▶ binder ── register ──▶ gate ──▶ directory
//!                               │                               │
//!                               ├── lookup / busy check ────────┤
//!                               ├── force-bind + attach ────────┤
//!                               └── set bus master ─────────────┘
//! ```
//!
//! The [`RegistrationGate`] keeps a single, process-wide record of whether
//! the enabler driver is registered. The [`ForcedBinder`] performs one claim:
//! register the driver, locate the device, override the directory's normal
//! match/probe decision, and flip the bus-master bit. Any failure on that
//! path unwinds the registration before it surfaces, so a failed enable
//! never leaves the gate on without an attached device.
//!
//! A [`ControlSession`] is one open handle: it accepts enable requests and
//! releases everything when it closes. The [`EnablerDriver`] itself declines
//! every probe; it exists only so a registered driver identity can be
//! assigned to one specific device by hand.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use alloc::sync::Arc;
//! use dmagate_bus::BusDirectory;
//! use dmagate_control::{ControlService, ControlRequest, EnableArgs};
//!
//! let directory = Arc::new(BusDirectory::new());
//! let service = ControlService::new(directory);
//!
//! let mut session = service.open();
//! session.submit(ControlRequest::Enable(EnableArgs {
//!     domain: 0,
//!     bus: 0,
//!     slot: 3,
//!     function: 0,
//! }))?;
//! drop(session); // releases the claim, clears bus mastering
//! ```

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod binder;
pub mod driver;
pub mod error;
pub mod gate;
pub mod request;
pub mod service;
pub mod session;

pub use binder::ForcedBinder;
pub use driver::{EnablerDriver, ENABLER_DRIVER_NAME};
pub use error::{ControlError, ControlResult};
pub use gate::RegistrationGate;
pub use request::{ControlRequest, EnableArgs, RequestCode};
pub use service::ControlService;
pub use session::{ControlSession, SessionState};
