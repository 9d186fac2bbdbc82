//! Error types.
//!
//! Only resource exhaustion is reported through `Result`. Contract violations
//! (stale handles, malformed edit ranges) are caught by assertions at the call
//! site and are not recoverable.

use thiserror::Error;

/// Errors reported by the slot and layer APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Every id representable in the handle's id bits is in use or retired.
    #[error("handle id space exhausted: all {capacity} ids of a {id_bits}-bit handle are in use or retired")]
    CapacityExhausted { id_bits: u32, capacity: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
