//! # spark-layers
//!
//! Handle-based data layers for terminal UIs: generation-tagged handles,
//! compacting run storage, an animation scheduler and editable shaped text.
//!
//! ## Architecture
//!
//! Everything is addressed by typed handles into parallel arrays rather than
//! by references. Stale handles are detected by their generation, variable
//! length payload (glyphs, text bytes) lives in runs that are compacted once
//! per frame:
//!
//! ```text
//! key event → edit_for_key → TextLayer::edit_text → update_text → reshape
//! frame     → AnimationScheduler::tick → TextLayer::update → compaction
//! ```
//!
//! Node removal cascades explicitly: [`TextLayer::clean_nodes()`] returns
//! the removed data ids, which feed [`AnimationScheduler::clean_data()`].
//!
//! ## Modules
//!
//! - [`types`] - Core types (Nanoseconds, ShapeDirection, flag sets)
//! - [`engine`] - Handles, slot pool, run compactor
//! - [`state`] - Animation scheduler, easing, text editing, key input
//! - [`layers`] - Shaper boundary and the text layer
//! - [`error`] - Error type

pub mod engine;
pub mod error;
pub mod layers;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};

pub use engine::{
    AnimationHandle, CompactStats, DataHandle, Handle, HandleKind, HandlePool, NodeHandle,
    RunCompactor,
};

pub use layers::{MonospaceShaper, ShapedGlyph, Shaper, TextLayer, TextLayerConfig, TextState};

pub use state::{
    easing, edit_for_key, AnimationScheduler, AnimationState, Attachment, TextEdit, UpdateMasks,
};
