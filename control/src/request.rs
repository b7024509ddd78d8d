//! Request codes and wire payloads for the control surface.

use core::fmt;
use core::mem;

use static_assertions::const_assert_eq;

use crate::error::{ControlError, ControlResult};

// =============================================================================
// REQUEST CODES
// =============================================================================

/// A control request code, as supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestCode(pub u32);

impl RequestCode {
    /// Enable bus mastering on one device
    pub const ENABLE: RequestCode = RequestCode(0x00d1_0001);
}

impl fmt::Display for RequestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// =============================================================================
// ENABLE PAYLOAD
// =============================================================================

/// Payload of an enable request: the four address parts exactly as the
/// caller supplies them. Range checking happens at lookup, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct EnableArgs {
    /// Domain (segment) number
    pub domain: u32,
    /// Bus number
    pub bus: u32,
    /// Slot (device) number
    pub slot: u32,
    /// Function number
    pub function: u32,
}

impl EnableArgs {
    /// Exact size of the encoded payload
    pub const ENCODED_LEN: usize = 16;

    /// Decode from the caller's buffer; any length mismatch fails
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        Some(Self {
            domain: read_u32(bytes, 0),
            bus: read_u32(bytes, 1),
            slot: read_u32(bytes, 2),
            function: read_u32(bytes, 3),
        })
    }

    /// Encode into a caller-shaped buffer
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[0..4].copy_from_slice(&self.domain.to_ne_bytes());
        buf[4..8].copy_from_slice(&self.bus.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.slot.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.function.to_ne_bytes());
        buf
    }
}

const_assert_eq!(EnableArgs::ENCODED_LEN, mem::size_of::<EnableArgs>());

fn read_u32(bytes: &[u8], index: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[index * 4..index * 4 + 4]);
    u32::from_ne_bytes(word)
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A decoded control request.
///
/// One variant today; decoding fails closed on anything else, so future
/// request types stay additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Enable bus mastering on the addressed device
    Enable(EnableArgs),
}

impl ControlRequest {
    /// Decode a raw request.
    ///
    /// A malformed payload is a [`ControlError::CopyFault`]; an unknown code
    /// is [`ControlError::UnsupportedRequest`]. Neither touches any state.
    pub fn decode(code: RequestCode, payload: &[u8]) -> ControlResult<Self> {
        match code {
            RequestCode::ENABLE => EnableArgs::decode(payload)
                .map(Self::Enable)
                .ok_or(ControlError::CopyFault),
            _ => Err(ControlError::UnsupportedRequest),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ARGS: EnableArgs = EnableArgs {
        domain: 0,
        bus: 3,
        slot: 0x1f,
        function: 2,
    };

    #[test]
    fn test_encode_decode() {
        let bytes = ARGS.encode();
        assert_eq!(EnableArgs::decode(&bytes), Some(ARGS));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let bytes = ARGS.encode();
        assert_eq!(EnableArgs::decode(&bytes[..12]), None);
        assert_eq!(EnableArgs::decode(&[]), None);

        let mut long = [0u8; 20];
        long[..16].copy_from_slice(&bytes);
        assert_eq!(EnableArgs::decode(&long), None);
    }

    #[test]
    fn test_decode_enable_request() {
        let request = ControlRequest::decode(RequestCode::ENABLE, &ARGS.encode()).unwrap();
        assert_eq!(request, ControlRequest::Enable(ARGS));
    }

    #[test]
    fn test_truncated_payload_is_copy_fault() {
        assert_eq!(
            ControlRequest::decode(RequestCode::ENABLE, &[0u8; 3]),
            Err(ControlError::CopyFault)
        );
    }

    #[test]
    fn test_unknown_code_is_unsupported() {
        assert_eq!(
            ControlRequest::decode(RequestCode(0xdead_beef), &ARGS.encode()),
            Err(ControlError::UnsupportedRequest)
        );
    }
}
