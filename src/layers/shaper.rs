//! Shaper boundary.
//!
//! Glyph shaping and font metrics live outside this crate. A layer only needs
//! glyph ids, positioning and the cluster each glyph came from; the last one
//! maps cursor byte offsets to glyph ranges for drawing selection and cursor.

use crate::types::{ShapeDirection, TextProperties};

/// One shaped glyph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapedGlyph {
    /// Font-specific glyph id.
    pub id: u32,
    /// Offset relative to the pen position.
    pub offset: [f32; 2],
    /// Pen advance after this glyph.
    pub advance: [f32; 2],
    /// Byte offset of the source cluster in the shaped text.
    pub cluster: u32,
}

/// Turns text into positioned glyphs.
pub trait Shaper {
    /// Shape `text`, appending glyphs in visual order to `glyphs`.
    ///
    /// # Returns
    ///
    /// The direction the text was shaped in. If `properties.direction` is
    /// [`ShapeDirection::Unspecified`] it's the detected one.
    fn shape(
        &mut self,
        text: &str,
        properties: &TextProperties,
        glyphs: &mut Vec<ShapedGlyph>,
    ) -> ShapeDirection;
}

/// Fixed-advance shaper with one glyph per character.
///
/// The glyph id is the Unicode codepoint. Direction detection looks at the
/// first strong character: Hebrew and Arabic make the text right-to-left,
/// anything else alphabetic left-to-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceShaper {
    pub advance: f32,
}

impl MonospaceShaper {
    pub fn new(advance: f32) -> Self {
        Self { advance }
    }
}

impl Default for MonospaceShaper {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn is_rtl(ch: char) -> bool {
    matches!(ch as u32,
        0x0590..=0x08ff | 0xfb1d..=0xfdff | 0xfe70..=0xfeff)
}

/// Direction of the first strong character, `Unspecified` if there's none.
pub fn detect_direction(text: &str) -> ShapeDirection {
    text.chars()
        .find_map(|ch| {
            if is_rtl(ch) {
                Some(ShapeDirection::RightToLeft)
            } else if ch.is_alphabetic() {
                Some(ShapeDirection::LeftToRight)
            } else {
                None
            }
        })
        .unwrap_or(ShapeDirection::Unspecified)
}

impl Shaper for MonospaceShaper {
    fn shape(
        &mut self,
        text: &str,
        properties: &TextProperties,
        glyphs: &mut Vec<ShapedGlyph>,
    ) -> ShapeDirection {
        let direction = match properties.direction {
            ShapeDirection::Unspecified => match detect_direction(text) {
                ShapeDirection::Unspecified => ShapeDirection::LeftToRight,
                detected => detected,
            },
            specified => specified,
        };

        let first = glyphs.len();
        let advance = match direction {
            ShapeDirection::TopToBottom | ShapeDirection::BottomToTop => [0.0, self.advance],
            _ => [self.advance, 0.0],
        };
        glyphs.extend(text.char_indices().map(|(cluster, ch)| ShapedGlyph {
            id: ch as u32,
            offset: [0.0, 0.0],
            advance,
            cluster: cluster as u32,
        }));
        if direction.is_reversed() {
            glyphs[first..].reverse();
        }

        direction
    }
}
