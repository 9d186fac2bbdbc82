//! Engine - Handles, slot pools and run storage.
//!
//! The engine owns the data structures every layer builds on:
//! - Handle: Generation-tagged ids, one type per kind of object
//! - Registry: Slot allocation with generation checks and id reuse
//! - Runs: Variable-length payload per owner, compacted in place
//!
//! # Architecture
//!
//! Objects are NOT allocated individually. A handle's id indexes parallel
//! arrays, variable-length data sits in shared payload arrays:
//!
//! ```text
//! id 0: flags, properties, run 2 -> payload[5..9]
//! id 1: (free, generation 3)
//! id 2: flags, properties, run 0 -> payload[0..5]
//! ```

pub mod handle;
pub mod registry;
pub mod runs;

pub use handle::{
    AnimationHandle, AnimationKind, DataHandle, DataKind, Handle, HandleKind, NodeHandle, NodeKind,
};
pub use registry::HandlePool;
pub use runs::{CompactStats, Run, RunCompactor, RunState};
