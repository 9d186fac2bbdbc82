//! Text Layer - Shaped text data with optional editing state.
//!
//! Data items are slots in a [`HandlePool`]. Per-item state lives in a
//! parallel array, glyphs and source bytes in two [`RunCompactor`]s:
//!
//! ```text
//! DataHandle {id 2, gen 1}
//!   data[2]          flags, properties, node, text state
//!   glyph run of 2   shaped glyphs
//!   text run of 2    source bytes, editable items only
//! ```
//!
//! Every change that affects shaped content appends a fresh glyph run (and
//! text run for editable items) and reshapes the whole item. The replaced
//! runs stay in the payload arrays until [`TextLayer::update()`] or
//! [`TextLayer::compact()`] reclaims them.

use std::ops::Range;

use crossterm::event::KeyEvent;
use tracing::trace;

use super::shaper::{ShapedGlyph, Shaper};
use crate::engine::handle::{DataHandle, DataKind, NodeHandle};
use crate::engine::registry::HandlePool;
use crate::engine::runs::{CompactStats, RunCompactor};
use crate::error::Result;
use crate::state::input::edit_for_key;
use crate::state::text_edit::{self, EditAction, TextEdit};
use crate::types::{
    LayerStates, Script, ShapeDirection, TextChanges, TextDataFlags, TextProperties,
};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Configuration for creating a text layer.
#[derive(Debug, Clone)]
pub struct TextLayerConfig {
    /// Properties used when `create()` gets none (default: everything detected)
    pub default_properties: TextProperties,
    /// Reclaim unused runs in `update()` (default: true)
    pub compact_on_update: bool,
}

impl Default for TextLayerConfig {
    fn default() -> Self {
        Self {
            default_properties: TextProperties::default(),
            compact_on_update: true,
        }
    }
}

// =============================================================================
// TEXT STATE
// =============================================================================

/// Cursor, selection and shaping results of an editable item.
///
/// Replaced as a whole whenever the content is reshaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextState {
    /// Byte offset of the cursor.
    pub cursor: u32,
    /// Byte offset of the selection anchor, equal to `cursor` if nothing is selected.
    pub selection: u32,
    pub language: String,
    pub script: Script,
    /// Resolved direction, never `Unspecified`.
    pub direction: ShapeDirection,
}

impl TextState {
    /// Selected byte range, empty if nothing is selected.
    pub fn selected(&self) -> Range<u32> {
        self.cursor.min(self.selection)..self.cursor.max(self.selection)
    }
}

#[derive(Debug, Clone, Default)]
struct TextData {
    flags: TextDataFlags,
    properties: TextProperties,
    direction: ShapeDirection,
    node: Option<NodeHandle>,
    edit: Option<TextState>,
    changes: TextChanges,
}

// =============================================================================
// LAYER
// =============================================================================

/// Shaped text items, each optionally editable.
pub struct TextLayer<S> {
    config: TextLayerConfig,
    shaper: S,
    pool: HandlePool<DataKind>,
    data: Vec<TextData>,
    glyphs: RunCompactor<ShapedGlyph>,
    text: RunCompactor<u8>,
    state: LayerStates,
    scratch_glyphs: Vec<ShapedGlyph>,
    scratch_text: Vec<u8>,
}

impl<S: Shaper> TextLayer<S> {
    pub fn new(shaper: S) -> Self {
        Self::with_config(shaper, TextLayerConfig::default())
    }

    pub fn with_config(shaper: S, config: TextLayerConfig) -> Self {
        Self {
            config,
            shaper,
            pool: HandlePool::new(),
            data: Vec::new(),
            glyphs: RunCompactor::new(),
            text: RunCompactor::new(),
            state: LayerStates::empty(),
            scratch_glyphs: Vec::new(),
            scratch_text: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Creation / removal
    // -------------------------------------------------------------------------

    /// Create a text item.
    ///
    /// # Arguments
    ///
    /// * `text` - Content to shape
    /// * `properties` - Shaping hints, the configured defaults if `None`
    /// * `flags` - [`TextDataFlags::EDITABLE`] keeps the bytes and a cursor at the end
    /// * `node` - Node the item is removed together with
    ///
    /// # Errors
    ///
    /// If the data id space is exhausted.
    pub fn create(
        &mut self,
        text: &str,
        properties: Option<TextProperties>,
        flags: TextDataFlags,
        node: Option<NodeHandle>,
    ) -> Result<DataHandle> {
        let handle = self.pool.create()?;
        let id = handle.id();
        let data = TextData {
            flags,
            properties: properties.unwrap_or_else(|| self.config.default_properties.clone()),
            node,
            ..TextData::default()
        };
        if id as usize == self.data.len() {
            self.data.push(data);
        } else {
            self.data[id as usize] = data;
        }

        self.assign_text(id, text.as_bytes());
        Ok(handle)
    }

    /// Replace the contents of an item.
    ///
    /// Keeps the current properties if `properties` is `None`. Passing flags
    /// without [`TextDataFlags::EDITABLE`] drops the editing state of a
    /// previously editable item, passing it creates a fresh one with the
    /// cursor at the end.
    pub fn set_text(
        &mut self,
        handle: DataHandle,
        text: &str,
        properties: Option<TextProperties>,
        flags: TextDataFlags,
    ) {
        let id = self.id(handle, "set_text");
        let data = &mut self.data[id as usize];
        if let Some(properties) = properties {
            data.properties = properties;
        }
        data.flags = flags;
        self.assign_text(id, text.as_bytes());
    }

    fn assign_text(&mut self, id: u32, text: &[u8]) {
        let direction = self.reshape(id, text);
        let data = &mut self.data[id as usize];
        data.direction = direction;

        if data.flags.contains(TextDataFlags::EDITABLE) {
            let len = text.len() as u32;
            data.edit = Some(TextState {
                cursor: len,
                selection: len,
                language: data.properties.language.clone(),
                script: data.properties.script,
                direction,
            });
            data.changes |= TextChanges::CURSOR;
            self.text.assign(id, text);
        } else {
            data.edit = None;
            self.text.mark_unused(id);
        }

        self.refresh_compact_state();
    }

    /// Shape `text` into a fresh glyph run.
    fn reshape(&mut self, id: u32, text: &[u8]) -> ShapeDirection {
        let text = String::from_utf8_lossy(text);
        let data = &mut self.data[id as usize];

        self.scratch_glyphs.clear();
        let shaped = self.shaper.shape(&text, &data.properties, &mut self.scratch_glyphs);
        let direction = match shaped {
            ShapeDirection::Unspecified => ShapeDirection::LeftToRight,
            resolved => resolved,
        };
        self.glyphs.assign(id, &self.scratch_glyphs);

        data.changes |= TextChanges::SHAPE;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
        direction
    }

    /// Remove an item. Its runs are reclaimed by the next compaction.
    ///
    /// # Panics
    ///
    /// If `handle` isn't valid.
    pub fn remove(&mut self, handle: DataHandle) {
        let id = self.id(handle, "remove");
        self.glyphs.mark_unused(id);
        self.text.mark_unused(id);
        self.data[id as usize] = TextData::default();
        self.pool.remove(handle);
        self.refresh_compact_state();
    }

    /// Remove items attached to nodes whose bit is set in `removed_nodes`.
    ///
    /// # Returns
    ///
    /// Mask of removed data ids, for cleaning animations attached to them.
    pub fn clean_nodes(&mut self, removed_nodes: &[bool]) -> Vec<bool> {
        let mut removed = vec![false; self.pool.capacity()];
        let doomed: Vec<DataHandle> = self
            .pool
            .iter()
            .filter(|handle| {
                self.data[handle.id() as usize]
                    .node
                    .is_some_and(|node| removed_nodes.get(node.id() as usize) == Some(&true))
            })
            .collect();
        for handle in doomed {
            removed[handle.id() as usize] = true;
            self.remove(handle);
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Move the cursor and selection anchor of an editable item.
    ///
    /// No-op without raising any change flag if both are already there.
    ///
    /// # Panics
    ///
    /// If the item isn't editable or either position is past the end.
    pub fn set_cursor(&mut self, handle: DataHandle, cursor: u32, selection: u32) {
        let id = self.editable_id(handle, "set_cursor");
        let len = self.text_len(id);
        assert!(
            cursor <= len && selection <= len,
            "TextLayer::set_cursor(): cursor {cursor} or selection {selection} out of range for {len} bytes"
        );

        let data = &mut self.data[id as usize];
        let Some(state) = data.edit.as_mut() else {
            return;
        };
        if state.cursor == cursor && state.selection == selection {
            return;
        }
        state.cursor = cursor;
        state.selection = selection;
        data.changes |= TextChanges::CURSOR;
        self.state |= LayerStates::NEEDS_DATA_UPDATE;
    }

    /// Remove `remove_size` bytes at `remove_offset`, then insert `insert` at
    /// `insert_offset` of the remaining text, then place the cursor.
    ///
    /// The primitive behind every content edit. `insert_offset` counts in the
    /// text after removal. A call removing and inserting nothing only moves
    /// the cursor and doesn't reshape.
    ///
    /// # Panics
    ///
    /// If the item isn't editable, the remove range isn't inside the text,
    /// `insert_offset` is past the remaining text or `cursor` / `selection`
    /// are past the resulting text. Also if the removed range or the insert
    /// position splits a UTF-8 sequence, stored text stays valid UTF-8.
    #[allow(clippy::too_many_arguments)]
    pub fn update_text(
        &mut self,
        handle: DataHandle,
        remove_offset: u32,
        remove_size: u32,
        insert_offset: u32,
        insert: &str,
        cursor: u32,
        selection: u32,
    ) {
        let id = self.editable_id(handle, "update_text");
        let len = self.text_len(id);

        let remaining = match remove_offset.checked_add(remove_size) {
            Some(end) if end <= len => len - remove_size,
            _ => panic!(
                "TextLayer::update_text(): remove range {remove_offset}+{remove_size} out of range for {len} bytes"
            ),
        };
        assert!(
            insert_offset <= remaining,
            "TextLayer::update_text(): insert offset {insert_offset} out of range for {remaining} bytes"
        );
        let insert_at = if insert_offset <= remove_offset {
            insert_offset
        } else {
            insert_offset + remove_size
        };
        assert!(
            remove_size == 0
                || (self.is_char_boundary(id, remove_offset)
                    && self.is_char_boundary(id, remove_offset + remove_size)),
            "TextLayer::update_text(): remove range {remove_offset}+{remove_size} splits a character"
        );
        assert!(
            insert.is_empty() || self.is_char_boundary(id, insert_at),
            "TextLayer::update_text(): insert offset {insert_offset} splits a character"
        );
        let result_len = u64::from(remaining) + insert.len() as u64;
        assert!(
            u64::from(cursor) <= result_len && u64::from(selection) <= result_len,
            "TextLayer::update_text(): cursor {cursor} or selection {selection} out of range for {result_len} bytes"
        );

        if remove_size == 0 && insert.is_empty() {
            self.set_cursor(handle, cursor, selection);
            return;
        }

        let (remove_offset, remove_size, insert_offset) =
            (remove_offset as usize, remove_size as usize, insert_offset as usize);
        let mut bytes = std::mem::take(&mut self.scratch_text);
        bytes.clear();
        {
            let old = self.text.get(id).unwrap_or_default();
            let removed_end = remove_offset + remove_size;
            if insert_offset <= remove_offset {
                bytes.extend_from_slice(&old[..insert_offset]);
                bytes.extend_from_slice(insert.as_bytes());
                bytes.extend_from_slice(&old[insert_offset..remove_offset]);
                bytes.extend_from_slice(&old[removed_end..]);
            } else {
                let split = removed_end + (insert_offset - remove_offset);
                bytes.extend_from_slice(&old[..remove_offset]);
                bytes.extend_from_slice(&old[removed_end..split]);
                bytes.extend_from_slice(insert.as_bytes());
                bytes.extend_from_slice(&old[split..]);
            }
        }
        trace!(
            %handle,
            remove_offset,
            remove_size,
            insert_offset,
            inserted = insert.len(),
            "updating text"
        );

        self.text.assign(id, &bytes);
        let direction = self.reshape(id, &bytes);
        self.scratch_text = bytes;

        let data = &mut self.data[id as usize];
        data.direction = direction;
        data.edit = Some(TextState {
            cursor,
            selection,
            language: data.properties.language.clone(),
            script: data.properties.script,
            direction,
        });
        data.changes |= TextChanges::CURSOR;
        self.refresh_compact_state();
    }

    /// Apply an editing operation at the cursor.
    ///
    /// `insert` is the text for the insert operations and has to be empty
    /// for all others.
    pub fn edit_text(&mut self, handle: DataHandle, edit: TextEdit, insert: &str) {
        let id = self.editable_id(handle, "edit_text");
        let Some(state) = self.data[id as usize].edit.as_ref() else {
            return;
        };
        let action = text_edit::resolve(
            self.text.get(id).unwrap_or_default(),
            state.cursor,
            state.selection,
            state.direction,
            edit,
            insert.as_bytes(),
        );

        match action {
            None => {}
            Some(EditAction::SetCursor { cursor, selection }) => {
                self.set_cursor(handle, cursor, selection);
            }
            Some(EditAction::Update {
                remove_offset,
                remove_size,
                insert_offset,
                cursor,
                selection,
            }) => {
                self.update_text(
                    handle,
                    remove_offset,
                    remove_size,
                    insert_offset,
                    insert,
                    cursor,
                    selection,
                );
            }
        }
    }

    /// Apply the edit a key event maps to.
    ///
    /// # Returns
    ///
    /// Whether the key had an editing meaning.
    pub fn handle_key(&mut self, handle: DataHandle, event: &KeyEvent) -> bool {
        match edit_for_key(event) {
            Some(command) => {
                self.edit_text(handle, command.edit, &command.text);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Update cycle
    // -------------------------------------------------------------------------

    /// Reclaim space of all unused glyph and text runs.
    pub fn compact(&mut self) -> CompactStats {
        let glyphs = self.glyphs.compact();
        let text = self.text.compact();
        self.state.remove(LayerStates::NEEDS_COMPACT);
        CompactStats {
            runs_removed: glyphs.runs_removed + text.runs_removed,
            payload_removed: glyphs.payload_removed + text.payload_removed,
        }
    }

    /// Consume pending work.
    ///
    /// Compacts if configured to, clears all per-item change flags and
    /// returns the layer state as it was before.
    pub fn update(&mut self) -> LayerStates {
        let states = self.state;
        if self.config.compact_on_update && states.contains(LayerStates::NEEDS_COMPACT) {
            self.compact();
        }
        for data in &mut self.data {
            data.changes = TextChanges::empty();
        }
        self.state.remove(LayerStates::NEEDS_DATA_UPDATE);
        states
    }

    fn refresh_compact_state(&mut self) {
        self.state.set(
            LayerStates::NEEDS_COMPACT,
            self.glyphs.needs_compaction() || self.text.needs_compaction(),
        );
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn is_valid(&self, handle: DataHandle) -> bool {
        self.pool.is_valid(handle)
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn used_count(&self) -> usize {
        self.pool.used_count()
    }

    pub fn state(&self) -> LayerStates {
        self.state
    }

    pub fn config(&self) -> &TextLayerConfig {
        &self.config
    }

    pub fn changes(&self, handle: DataHandle) -> TextChanges {
        self.data[self.id(handle, "changes") as usize].changes
    }

    pub fn flags(&self, handle: DataHandle) -> TextDataFlags {
        self.data[self.id(handle, "flags") as usize].flags
    }

    pub fn properties(&self, handle: DataHandle) -> &TextProperties {
        &self.data[self.id(handle, "properties") as usize].properties
    }

    /// Direction the item was shaped in.
    pub fn direction(&self, handle: DataHandle) -> ShapeDirection {
        self.data[self.id(handle, "direction") as usize].direction
    }

    pub fn node(&self, handle: DataHandle) -> Option<NodeHandle> {
        self.data[self.id(handle, "node") as usize].node
    }

    pub fn glyphs(&self, handle: DataHandle) -> &[ShapedGlyph] {
        self.glyphs.get(self.id(handle, "glyphs")).unwrap_or_default()
    }

    /// Source bytes of an editable item.
    pub fn text(&self, handle: DataHandle) -> &[u8] {
        self.text.get(self.editable_id(handle, "text")).unwrap_or_default()
    }

    /// Editing state of an editable item.
    pub fn text_state(&self, handle: DataHandle) -> &TextState {
        let id = self.editable_id(handle, "text_state");
        match self.data[id as usize].edit.as_ref() {
            Some(state) => state,
            None => unreachable!("editable data without text state"),
        }
    }

    /// Cursor and selection anchor of an editable item.
    pub fn cursor(&self, handle: DataHandle) -> (u32, u32) {
        let state = self.text_state(handle);
        (state.cursor, state.selection)
    }

    /// Glyphs shaped from the source bytes in `bytes`.
    ///
    /// An empty byte range maps to the empty glyph range at the cursor
    /// position, in visual order. Clusters index the stored bytes, which
    /// [`update_text()`](Self::update_text) keeps valid UTF-8.
    pub fn glyph_range(&self, handle: DataHandle, bytes: Range<u32>) -> Range<usize> {
        let id = self.id(handle, "glyph_range");
        let glyphs = self.glyphs.get(id).unwrap_or_default();

        let mut covered: Option<Range<usize>> = None;
        for (index, glyph) in glyphs.iter().enumerate() {
            if bytes.contains(&glyph.cluster) {
                covered = Some(match covered {
                    Some(range) => range.start.min(index)..range.end.max(index + 1),
                    None => index..index + 1,
                });
            }
        }
        if let Some(range) = covered {
            return range;
        }

        let before = glyphs.iter().filter(|glyph| glyph.cluster < bytes.start).count();
        let position = if self.data[id as usize].direction.is_reversed() {
            glyphs.len() - before
        } else {
            before
        };
        position..position
    }

    /// Glyph storage, for upload.
    pub fn glyph_runs(&self) -> &RunCompactor<ShapedGlyph> {
        &self.glyphs
    }

    /// Source byte storage of editable items.
    pub fn text_runs(&self) -> &RunCompactor<u8> {
        &self.text
    }

    fn id(&self, handle: DataHandle, operation: &str) -> u32 {
        assert!(
            self.pool.is_valid(handle),
            "TextLayer::{operation}(): invalid handle {handle}"
        );
        handle.id()
    }

    fn editable_id(&self, handle: DataHandle, operation: &str) -> u32 {
        let id = self.id(handle, operation);
        assert!(
            self.data[id as usize].flags.contains(TextDataFlags::EDITABLE),
            "TextLayer::{operation}(): {handle} is not editable"
        );
        id
    }

    fn text_len(&self, id: u32) -> u32 {
        self.text.get(id).map_or(0, |text| text.len() as u32)
    }

    /// Whether `offset` isn't inside a UTF-8 sequence. The end counts as a boundary.
    fn is_char_boundary(&self, id: u32, offset: u32) -> bool {
        let text = self.text.get(id).unwrap_or_default();
        // Continuation bytes are 0b10xx_xxxx
        text.get(offset as usize).is_none_or(|&byte| byte & 0xc0 != 0x80)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::shaper::MonospaceShaper;
    use crossterm::event::{KeyCode, KeyEventKind, KeyEventState, KeyModifiers};

    fn layer() -> TextLayer<MonospaceShaper> {
        TextLayer::new(MonospaceShaper::default())
    }

    fn editable(layer: &mut TextLayer<MonospaceShaper>, text: &str) -> DataHandle {
        layer.create(text, None, TextDataFlags::EDITABLE, None).unwrap()
    }

    #[test]
    fn test_create_static() {
        let mut layer = layer();
        let handle = layer.create("hi!", None, TextDataFlags::empty(), None).unwrap();

        assert!(layer.is_valid(handle));
        assert_eq!(layer.glyphs(handle).len(), 3);
        assert_eq!(layer.direction(handle), ShapeDirection::LeftToRight);
        assert_eq!(layer.changes(handle), TextChanges::SHAPE);
        assert!(layer.state().contains(LayerStates::NEEDS_DATA_UPDATE));
        assert!(layer.text_runs().runs().is_empty());
    }

    #[test]
    fn test_create_editable() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");

        assert_eq!(layer.text(handle), b"abcd");
        assert_eq!(layer.cursor(handle), (4, 4));
        assert_eq!(layer.text_state(handle).direction, ShapeDirection::LeftToRight);
    }

    #[test]
    fn test_default_properties_from_config() {
        let config = TextLayerConfig {
            default_properties: TextProperties::with_direction(ShapeDirection::RightToLeft),
            ..TextLayerConfig::default()
        };
        let mut layer = TextLayer::with_config(MonospaceShaper::default(), config);
        let handle = layer.create("abc", None, TextDataFlags::empty(), None).unwrap();
        assert_eq!(layer.direction(handle), ShapeDirection::RightToLeft);

        let handle = layer
            .create("abc", Some(TextProperties::default()), TextDataFlags::empty(), None)
            .unwrap();
        assert_eq!(layer.direction(handle), ShapeDirection::LeftToRight);
    }

    #[test]
    fn test_update_text_insert() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.set_cursor(handle, 0, 0);

        layer.update_text(handle, 0, 0, 2, "X", 3, 3);
        assert_eq!(layer.text(handle), b"abXcd");
        assert_eq!(layer.cursor(handle), (3, 3));
        assert_eq!(layer.glyphs(handle).len(), 5);
    }

    #[test]
    fn test_update_text_remove_and_insert() {
        let mut layer = layer();
        let handle = editable(&mut layer, "hello world");

        // Insert lands before the removed range
        layer.update_text(handle, 6, 5, 0, ">", 1, 1);
        assert_eq!(layer.text(handle), b">hello ");

        // Insert lands after the removed range, offset counted in the remaining text
        layer.update_text(handle, 0, 1, 5, "!", 6, 0);
        assert_eq!(layer.text(handle), b"hello! ");
        assert_eq!(layer.cursor(handle), (6, 0));
        assert_eq!(layer.text_state(handle).selected(), 0..6);
    }

    #[test]
    fn test_update_text_no_op() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.update();
        let runs = layer.text_runs().runs().len();

        layer.update_text(handle, 0, 0, 0, "", 4, 4);
        assert_eq!(layer.changes(handle), TextChanges::empty());
        assert_eq!(layer.state(), LayerStates::empty());
        assert_eq!(layer.text_runs().runs().len(), runs);
    }

    #[test]
    fn test_update_text_cursor_only() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.update();
        let runs = layer.glyph_runs().runs().len();

        layer.update_text(handle, 0, 0, 0, "", 1, 1);
        assert_eq!(layer.cursor(handle), (1, 1));
        assert_eq!(layer.changes(handle), TextChanges::CURSOR);
        assert_eq!(layer.glyph_runs().runs().len(), runs);
    }

    #[test]
    #[should_panic(expected = "remove range")]
    fn test_update_text_overflowing_remove_panics() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.update_text(handle, 2, u32::MAX, 0, "", 0, 0);
    }

    #[test]
    #[should_panic(expected = "splits a character")]
    fn test_update_text_remove_inside_character_panics() {
        let mut layer = layer();
        let handle = editable(&mut layer, "aéb");
        layer.update_text(handle, 1, 1, 1, "", 1, 1);
    }

    #[test]
    #[should_panic(expected = "splits a character")]
    fn test_update_text_insert_inside_character_panics() {
        let mut layer = layer();
        let handle = editable(&mut layer, "aéb");
        // Offset 1 after removing "a" is byte 2 of the original text, inside "é"
        layer.update_text(handle, 0, 1, 1, "x", 0, 0);
    }

    #[test]
    fn test_update_text_multibyte_keeps_clusters() {
        let mut layer = layer();
        let handle = editable(&mut layer, "aé€b");

        // Replace "é" with "ü", then select "€" by bytes
        layer.update_text(handle, 1, 2, 1, "ü", 3, 3);
        assert_eq!(layer.text(handle), "aü€b".as_bytes());
        let clusters: Vec<u32> = layer.glyphs(handle).iter().map(|g| g.cluster).collect();
        assert_eq!(clusters, vec![0, 1, 3, 6]);
        assert_eq!(layer.glyph_range(handle, 3..6), 2..3);
    }

    #[test]
    #[should_panic(expected = "insert offset")]
    fn test_update_text_insert_past_remaining_panics() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.update_text(handle, 0, 2, 3, "x", 0, 0);
    }

    #[test]
    #[should_panic(expected = "out of range for 5 bytes")]
    fn test_update_text_cursor_past_end_panics() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.update_text(handle, 0, 0, 0, "x", 6, 0);
    }

    #[test]
    #[should_panic(expected = "is not editable")]
    fn test_editing_static_panics() {
        let mut layer = layer();
        let handle = layer.create("abc", None, TextDataFlags::empty(), None).unwrap();
        layer.set_cursor(handle, 0, 0);
    }

    #[test]
    fn test_set_cursor() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abcd");
        layer.update();

        layer.set_cursor(handle, 4, 4);
        assert_eq!(layer.changes(handle), TextChanges::empty());
        assert!(!layer.state().contains(LayerStates::NEEDS_DATA_UPDATE));

        layer.set_cursor(handle, 1, 3);
        assert_eq!(layer.cursor(handle), (1, 3));
        assert_eq!(layer.changes(handle), TextChanges::CURSOR);
        assert!(layer.state().contains(LayerStates::NEEDS_DATA_UPDATE));
    }

    #[test]
    fn test_edit_text_typing() {
        let mut layer = layer();
        let handle = editable(&mut layer, "");

        for ch in ["h", "é", "y"] {
            layer.edit_text(handle, TextEdit::InsertBeforeCursor, ch);
        }
        assert_eq!(layer.text(handle), "héy".as_bytes());
        assert_eq!(layer.cursor(handle), (4, 4));

        layer.edit_text(handle, TextEdit::MoveCursorLeft, "");
        layer.edit_text(handle, TextEdit::RemoveBeforeCursor, "");
        assert_eq!(layer.text(handle), b"hy");
        assert_eq!(layer.cursor(handle), (1, 1));

        layer.edit_text(handle, TextEdit::InsertAfterCursor, "e");
        assert_eq!(layer.text(handle), b"hey");
        assert_eq!(layer.cursor(handle), (1, 1));
    }

    #[test]
    fn test_edit_text_remove_at_start_is_no_op() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abc");
        layer.set_cursor(handle, 0, 0);
        layer.update();

        layer.edit_text(handle, TextEdit::RemoveBeforeCursor, "");
        layer.edit_text(handle, TextEdit::RemoveBeforeCursor, "");
        assert_eq!(layer.text(handle), b"abc");
        assert_eq!(layer.cursor(handle), (0, 0));
        assert_eq!(layer.changes(handle), TextChanges::empty());
    }

    #[test]
    fn test_edit_text_replaces_selection() {
        let mut layer = layer();
        let handle = editable(&mut layer, "hello");
        layer.set_cursor(handle, 1, 1);
        layer.edit_text(handle, TextEdit::ExtendSelectionRight, "");
        layer.edit_text(handle, TextEdit::ExtendSelectionRight, "");
        assert_eq!(layer.cursor(handle), (3, 1));

        layer.edit_text(handle, TextEdit::InsertBeforeCursor, "EE");
        assert_eq!(layer.text(handle), b"hEElo");
        assert_eq!(layer.cursor(handle), (3, 3));
    }

    #[test]
    fn test_edit_text_rtl() {
        let mut layer = layer();
        let handle = editable(&mut layer, "שלום");
        assert_eq!(layer.text_state(handle).direction, ShapeDirection::RightToLeft);

        // Cursor starts at the logical end, optical left end of the line
        layer.edit_text(handle, TextEdit::MoveCursorRight, "");
        assert_eq!(layer.cursor(handle), (6, 6));
        layer.edit_text(handle, TextEdit::MoveCursorLeft, "");
        assert_eq!(layer.cursor(handle), (8, 8));
    }

    #[test]
    fn test_handle_key() {
        let mut layer = layer();
        let handle = editable(&mut layer, "ab");
        let key = |code| KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };

        assert!(layer.handle_key(handle, &key(KeyCode::Home)));
        assert!(layer.handle_key(handle, &key(KeyCode::Char('>'))));
        assert!(layer.handle_key(handle, &key(KeyCode::Delete)));
        assert!(!layer.handle_key(handle, &key(KeyCode::Enter)));
        assert_eq!(layer.text(handle), b">b");
        assert_eq!(layer.cursor(handle), (1, 1));
    }

    #[test]
    fn test_remove_and_compact() {
        let mut layer = layer();
        let a = editable(&mut layer, "aaa");
        let b = layer.create("bb", None, TextDataFlags::empty(), None).unwrap();
        let c = editable(&mut layer, "c");

        layer.remove(a);
        assert!(!layer.is_valid(a));
        assert!(layer.state().contains(LayerStates::NEEDS_COMPACT));
        assert_eq!(layer.glyph_runs().payload().len(), 6);

        let states = layer.update();
        assert!(states.contains(LayerStates::NEEDS_COMPACT));
        assert_eq!(layer.state(), LayerStates::empty());
        assert_eq!(layer.glyph_runs().payload().len(), 3);
        assert_eq!(layer.glyphs(b).len(), 2);
        assert_eq!(layer.glyphs(c)[0].id, 'c' as u32);
        assert_eq!(layer.text(c), b"c");
    }

    #[test]
    fn test_compaction_left_to_caller() {
        let config = TextLayerConfig {
            compact_on_update: false,
            ..TextLayerConfig::default()
        };
        let mut layer = TextLayer::with_config(MonospaceShaper::default(), config);
        let handle = editable(&mut layer, "abc");
        layer.edit_text(handle, TextEdit::RemoveBeforeCursor, "");

        layer.update();
        assert!(layer.state().contains(LayerStates::NEEDS_COMPACT));
        let stats = layer.compact();
        assert_eq!(stats.runs_removed, 2);
        assert_eq!(layer.text(handle), b"ab");
        assert_eq!(layer.compact(), CompactStats::default());
    }

    #[test]
    fn test_set_text_revokes_editability() {
        let mut layer = layer();
        let handle = editable(&mut layer, "abc");

        layer.set_text(handle, "xyz", None, TextDataFlags::empty());
        assert_eq!(layer.flags(handle), TextDataFlags::empty());
        assert_eq!(layer.text_runs().run_of(handle.id()), None);
        assert_eq!(layer.glyphs(handle).len(), 3);

        layer.set_text(handle, "hello", None, TextDataFlags::EDITABLE);
        assert_eq!(layer.text(handle), b"hello");
        assert_eq!(layer.cursor(handle), (5, 5));
    }

    #[test]
    fn test_glyph_range() {
        let mut layer = layer();
        let ltr = editable(&mut layer, "aéb");
        assert_eq!(layer.glyph_range(ltr, 1..3), 1..2);
        assert_eq!(layer.glyph_range(ltr, 0..4), 0..3);
        assert_eq!(layer.glyph_range(ltr, 3..3), 2..2);

        let rtl = editable(&mut layer, "שלום");
        // Visual order is reversed, the first two characters are the last two glyphs
        assert_eq!(layer.glyph_range(rtl, 0..4), 2..4);
        assert_eq!(layer.glyph_range(rtl, 0..0), 4..4);
        assert_eq!(layer.glyph_range(rtl, 8..8), 0..0);
    }

    #[test]
    fn test_clean_nodes() {
        let mut layer = layer();
        let node = NodeHandle::new(2, 1);
        let attached = layer.create("a", None, TextDataFlags::empty(), Some(node)).unwrap();
        let other = layer
            .create("b", None, TextDataFlags::empty(), Some(NodeHandle::new(0, 1)))
            .unwrap();
        let free = layer.create("c", None, TextDataFlags::empty(), None).unwrap();

        let removed = layer.clean_nodes(&[false, false, true]);
        assert_eq!(removed, vec![true, false, false]);
        assert!(!layer.is_valid(attached));
        assert!(layer.is_valid(other));
        assert!(layer.is_valid(free));
        assert_eq!(layer.node(other), Some(NodeHandle::new(0, 1)));
    }

    #[test]
    fn test_slot_reuse_keeps_stale_handle_invalid() {
        let mut layer = layer();
        let first = editable(&mut layer, "old");
        layer.remove(first);
        let second = layer.create("new", None, TextDataFlags::empty(), None).unwrap();

        assert_eq!(second.id(), first.id());
        assert!(!layer.is_valid(first));
        assert_eq!(layer.flags(second), TextDataFlags::empty());
        assert_eq!(layer.glyphs(second)[0].id, 'n' as u32);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn edit() -> impl Strategy<Value = (TextEdit, String)> {
            let plain = prop_oneof![
                Just(TextEdit::MoveCursorLeft),
                Just(TextEdit::MoveCursorRight),
                Just(TextEdit::ExtendSelectionLeft),
                Just(TextEdit::ExtendSelectionRight),
                Just(TextEdit::MoveCursorLineBegin),
                Just(TextEdit::MoveCursorLineEnd),
                Just(TextEdit::ExtendSelectionLineBegin),
                Just(TextEdit::ExtendSelectionLineEnd),
                Just(TextEdit::RemoveBeforeCursor),
                Just(TextEdit::RemoveAfterCursor),
            ];
            prop_oneof![
                plain.prop_map(|edit| (edit, String::new())),
                "[a-zé😀ש]{0,3}".prop_map(|text| (TextEdit::InsertBeforeCursor, text)),
                "[a-zé😀ש]{0,3}".prop_map(|text| (TextEdit::InsertAfterCursor, text)),
            ]
        }

        proptest! {
            #[test]
            fn test_edits_keep_cursor_in_bounds(
                initial in "[a-zש ]{0,8}",
                edits in prop::collection::vec(edit(), 0..48),
            ) {
                let mut layer = TextLayer::new(MonospaceShaper::default());
                let handle = layer.create(&initial, None, TextDataFlags::EDITABLE, None).unwrap();

                for (edit, text) in edits {
                    layer.edit_text(handle, edit, &text);
                    let (cursor, selection) = layer.cursor(handle);
                    let bytes = layer.text(handle);
                    prop_assert!(cursor as usize <= bytes.len());
                    prop_assert!(selection as usize <= bytes.len());
                    prop_assert!(std::str::from_utf8(bytes).is_ok());
                    prop_assert_eq!(
                        layer.glyphs(handle).len(),
                        String::from_utf8_lossy(bytes).chars().count()
                    );
                }
            }
        }
    }
}
