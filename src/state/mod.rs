//! State Module - Runtime state driven by time and input
//!
//! - **Animate** - Animation scheduler with play/pause/stop and attachment cleanup
//! - **Easing** - Easing functions for animation factors
//! - **Text edit** - Cursor-relative edit operations resolved against UTF-8 text
//! - **Input** - crossterm key events to text edits

pub mod animate;
pub mod easing;
pub mod input;
pub mod text_edit;

pub use animate::{AnimationScheduler, AnimationState, Attachment, UpdateMasks};
pub use easing::Easing;
pub use input::{edit_for_key, TextEditCommand};
pub use text_edit::{EditAction, TextEdit};
