//! Control-surface error taxonomy.

use core::fmt;

/// Errors surfaced to the caller of the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlError {
    /// The request payload could not be read from the caller
    CopyFault,
    /// No device exists at the given address
    InvalidAddress,
    /// The device already has a driver bound to it
    DeviceBusy,
    /// Forced attachment was refused by the bus subsystem
    AttachFailed,
    /// The enabler driver could not be registered
    RegistrationFailed,
    /// The request code names no known operation
    UnsupportedRequest,
}

impl ControlError {
    /// Coarse classification, for logging
    pub const fn category(&self) -> &'static str {
        match self {
            Self::CopyFault | Self::UnsupportedRequest => "Request",
            Self::InvalidAddress | Self::DeviceBusy => "Device",
            Self::AttachFailed | Self::RegistrationFailed => "Binding",
        }
    }

    /// Whether the failure is attributable to the caller's input rather
    /// than to bus-subsystem state
    pub const fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            Self::CopyFault | Self::InvalidAddress | Self::UnsupportedRequest
        )
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CopyFault => write!(f, "Request payload could not be read"),
            Self::InvalidAddress => write!(f, "No device at the given address"),
            Self::DeviceBusy => write!(f, "Device already has a driver"),
            Self::AttachFailed => write!(f, "Forced attach refused"),
            Self::RegistrationFailed => write!(f, "Driver registration failed"),
            Self::UnsupportedRequest => write!(f, "Unsupported request"),
        }
    }
}

/// Result type for control operations
pub type ControlResult<T> = Result<T, ControlError>;

// =============================================================================
// TESTS
// =============================================================================
