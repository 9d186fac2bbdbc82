//! Layers - Data attached to nodes.
//!
//! A layer owns a pool of data handles plus everything stored per item. The
//! text layer shapes through a [`Shaper`] and keeps cursor state for
//! editable items.

pub mod shaper;
pub mod text;

pub use shaper::{detect_direction, MonospaceShaper, ShapedGlyph, Shaper};
pub use text::{TextLayer, TextLayerConfig, TextState};
