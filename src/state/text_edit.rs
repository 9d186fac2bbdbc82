//! Text editing operations.
//!
//! Pure resolution of a [`TextEdit`] against the current bytes, cursor and
//! selection. The result is either a cursor move or a single
//! remove-and-insert primitive, which the text layer then applies through
//! `set_cursor()` / `update_text()`.
//!
//! The cursor and selection are byte offsets. When they differ, the range
//! between them is selected, with `selection` being the anchor that stays in
//! place while the selection is extended.

use crate::types::ShapeDirection;

// =============================================================================
// OPERATIONS
// =============================================================================

/// Editing operation.
///
/// Left and right are optical directions. For right-to-left text they move
/// forward and backward in the byte stream, respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEdit {
    /// Move the cursor one character left and drop the selection.
    MoveCursorLeft,
    /// Move the cursor one character right and drop the selection.
    MoveCursorRight,
    /// Move the cursor one character left, keeping the selection anchor.
    ExtendSelectionLeft,
    /// Move the cursor one character right, keeping the selection anchor.
    ExtendSelectionRight,
    MoveCursorLineBegin,
    MoveCursorLineEnd,
    ExtendSelectionLineBegin,
    ExtendSelectionLineEnd,
    /// Remove the selection, or the character before the cursor.
    RemoveBeforeCursor,
    /// Remove the selection, or the character after the cursor.
    RemoveAfterCursor,
    /// Replace the selection with, or insert at the cursor, text ending up before the cursor.
    InsertBeforeCursor,
    /// Replace the selection with, or insert at the cursor, text ending up after the cursor.
    InsertAfterCursor,
}

impl TextEdit {
    /// Whether the operation consumes insert text.
    pub fn inserts(self) -> bool {
        matches!(self, Self::InsertBeforeCursor | Self::InsertAfterCursor)
    }
}

/// What an edit resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Only the cursor and selection change.
    SetCursor { cursor: u32, selection: u32 },
    /// Arguments for the remove-and-insert primitive. The insert text is the
    /// one passed to [`resolve()`].
    Update {
        remove_offset: u32,
        remove_size: u32,
        insert_offset: u32,
        cursor: u32,
        selection: u32,
    },
}

// =============================================================================
// UTF-8 STEPPING
// =============================================================================

/// Expected length of a UTF-8 sequence from its lead byte, 0 if not a lead byte.
fn sequence_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => 0,
    }
}

fn is_char(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Byte length of the character starting at `pos`.
///
/// One byte if the sequence there is malformed or truncated, 0 at the end.
pub fn next_char_len(bytes: &[u8], pos: usize) -> usize {
    if pos >= bytes.len() {
        return 0;
    }
    let len = sequence_len(bytes[pos]);
    if len > 1 && pos + len <= bytes.len() && is_char(&bytes[pos..pos + len]) {
        len
    } else {
        1
    }
}

/// Byte length of the character ending at `pos`.
///
/// One byte if the sequence there is malformed, 0 at the beginning.
pub fn prev_char_len(bytes: &[u8], pos: usize) -> usize {
    if pos == 0 || pos > bytes.len() {
        return 0;
    }
    // A lead byte sits at most three continuation bytes back
    for len in 2..=pos.min(4) {
        let start = pos - len;
        if bytes[start] & 0xc0 != 0x80 {
            if sequence_len(bytes[start]) == len && is_char(&bytes[start..pos]) {
                return len;
            }
            break;
        }
    }
    1
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve `edit` against the current state.
///
/// # Arguments
///
/// * `bytes` - Current text
/// * `cursor`, `selection` - Current cursor and selection anchor, both at most `bytes.len()`
/// * `direction` - Resolved shape direction of the text
/// * `edit` - The operation
/// * `insert` - Text to insert, has to be empty for operations other than inserts
///
/// # Returns
///
/// `None` if the operation has no effect, such as removing before the cursor
/// at the very beginning.
pub fn resolve(
    bytes: &[u8],
    cursor: u32,
    selection: u32,
    direction: ShapeDirection,
    edit: TextEdit,
    insert: &[u8],
) -> Option<EditAction> {
    assert!(
        edit.inserts() || insert.is_empty(),
        "text_edit::resolve(): {edit:?} expects no insert text"
    );
    let len = bytes.len() as u32;
    assert!(
        cursor <= len && selection <= len,
        "text_edit::resolve(): cursor {cursor} or selection {selection} out of range for {len} bytes"
    );

    let (lo, hi) = (cursor.min(selection), cursor.max(selection));
    let has_selection = lo != hi;

    match edit {
        TextEdit::MoveCursorLeft | TextEdit::MoveCursorRight => {
            let target = step(bytes, cursor, direction, edit == TextEdit::MoveCursorRight);
            Some(EditAction::SetCursor {
                cursor: target,
                selection: target,
            })
        }
        TextEdit::ExtendSelectionLeft | TextEdit::ExtendSelectionRight => {
            let target = step(bytes, cursor, direction, edit == TextEdit::ExtendSelectionRight);
            Some(EditAction::SetCursor {
                cursor: target,
                selection,
            })
        }
        TextEdit::MoveCursorLineBegin => Some(EditAction::SetCursor {
            cursor: 0,
            selection: 0,
        }),
        TextEdit::MoveCursorLineEnd => Some(EditAction::SetCursor {
            cursor: len,
            selection: len,
        }),
        TextEdit::ExtendSelectionLineBegin => Some(EditAction::SetCursor {
            cursor: 0,
            selection,
        }),
        TextEdit::ExtendSelectionLineEnd => Some(EditAction::SetCursor {
            cursor: len,
            selection,
        }),
        TextEdit::RemoveBeforeCursor | TextEdit::RemoveAfterCursor if has_selection => {
            Some(remove(lo, hi - lo))
        }
        TextEdit::RemoveBeforeCursor => {
            let size = prev_char_len(bytes, cursor as usize) as u32;
            (size != 0).then(|| remove(cursor - size, size))
        }
        TextEdit::RemoveAfterCursor => {
            let size = next_char_len(bytes, cursor as usize) as u32;
            (size != 0).then(|| remove(cursor, size))
        }
        TextEdit::InsertBeforeCursor | TextEdit::InsertAfterCursor => {
            let (offset, size) = if has_selection { (lo, hi - lo) } else { (cursor, 0) };
            let inserted = insert.len() as u32;
            let cursor = if edit == TextEdit::InsertBeforeCursor {
                offset + inserted
            } else {
                offset
            };
            Some(EditAction::Update {
                remove_offset: offset,
                remove_size: size,
                insert_offset: offset,
                cursor,
                selection: cursor,
            })
        }
    }
}

/// Cursor one character optically left or right of `cursor`.
fn step(bytes: &[u8], cursor: u32, direction: ShapeDirection, right: bool) -> u32 {
    let forward = right != direction.is_reversed();
    if forward {
        cursor + next_char_len(bytes, cursor as usize) as u32
    } else {
        cursor - prev_char_len(bytes, cursor as usize) as u32
    }
}

fn remove(offset: u32, size: u32) -> EditAction {
    EditAction::Update {
        remove_offset: offset,
        remove_size: size,
        insert_offset: offset,
        cursor: offset,
        selection: offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LTR: ShapeDirection = ShapeDirection::LeftToRight;
    const RTL: ShapeDirection = ShapeDirection::RightToLeft;

    fn cursor_after(
        bytes: &[u8],
        cursor: u32,
        selection: u32,
        direction: ShapeDirection,
        edit: TextEdit,
    ) -> (u32, u32) {
        match resolve(bytes, cursor, selection, direction, edit, b"") {
            Some(EditAction::SetCursor { cursor, selection }) => (cursor, selection),
            other => panic!("expected a cursor move, got {other:?}"),
        }
    }

    #[test]
    fn test_next_char_len() {
        let text = "aé€😀".as_bytes();
        assert_eq!(next_char_len(text, 0), 1);
        assert_eq!(next_char_len(text, 1), 2);
        assert_eq!(next_char_len(text, 3), 3);
        assert_eq!(next_char_len(text, 6), 4);
        assert_eq!(next_char_len(text, 10), 0);
    }

    #[test]
    fn test_prev_char_len() {
        let text = "aé€😀".as_bytes();
        assert_eq!(prev_char_len(text, 10), 4);
        assert_eq!(prev_char_len(text, 6), 3);
        assert_eq!(prev_char_len(text, 3), 2);
        assert_eq!(prev_char_len(text, 1), 1);
        assert_eq!(prev_char_len(text, 0), 0);
    }

    #[test]
    fn test_malformed_steps_one_byte() {
        // Truncated three-byte sequence, stray continuation byte, invalid lead
        let text = [0xe2, 0x82, b'a', 0x80, 0xff];
        assert_eq!(next_char_len(&text, 0), 1);
        assert_eq!(next_char_len(&text, 1), 1);
        assert_eq!(next_char_len(&text, 3), 1);
        assert_eq!(next_char_len(&text, 4), 1);
        assert_eq!(prev_char_len(&text, 2), 1);
        assert_eq!(prev_char_len(&text, 4), 1);
        assert_eq!(prev_char_len(&text, 5), 1);
    }

    #[test]
    fn test_move_cursor() {
        let text = "aéb".as_bytes();
        assert_eq!(cursor_after(text, 1, 1, LTR, TextEdit::MoveCursorRight), (3, 3));
        assert_eq!(cursor_after(text, 3, 3, LTR, TextEdit::MoveCursorLeft), (1, 1));
        assert_eq!(cursor_after(text, 0, 0, LTR, TextEdit::MoveCursorLeft), (0, 0));
        assert_eq!(cursor_after(text, 4, 4, LTR, TextEdit::MoveCursorRight), (4, 4));
        // Moving drops the selection
        assert_eq!(cursor_after(text, 1, 4, LTR, TextEdit::MoveCursorRight), (3, 3));
    }

    #[test]
    fn test_move_cursor_rtl() {
        let text = "שלום".as_bytes();
        // Optical left is logically forward
        assert_eq!(cursor_after(text, 0, 0, RTL, TextEdit::MoveCursorLeft), (2, 2));
        assert_eq!(cursor_after(text, 4, 4, RTL, TextEdit::MoveCursorRight), (2, 2));
        assert_eq!(cursor_after(text, 0, 0, RTL, TextEdit::MoveCursorRight), (0, 0));
    }

    #[test]
    fn test_extend_selection() {
        let text = b"hello";
        assert_eq!(cursor_after(text, 2, 2, LTR, TextEdit::ExtendSelectionRight), (3, 2));
        assert_eq!(cursor_after(text, 3, 2, LTR, TextEdit::ExtendSelectionRight), (4, 2));
        assert_eq!(cursor_after(text, 4, 2, LTR, TextEdit::ExtendSelectionLineBegin), (0, 2));
        assert_eq!(cursor_after(text, 1, 3, LTR, TextEdit::ExtendSelectionLineEnd), (5, 3));
        assert_eq!(cursor_after(text, 2, 2, RTL, TextEdit::ExtendSelectionLeft), (3, 2));
    }

    #[test]
    fn test_line_begin_end() {
        let text = b"hello";
        assert_eq!(cursor_after(text, 2, 4, LTR, TextEdit::MoveCursorLineBegin), (0, 0));
        assert_eq!(cursor_after(text, 2, 4, LTR, TextEdit::MoveCursorLineEnd), (5, 5));
    }

    #[test]
    fn test_remove_before_cursor() {
        let text = "aé".as_bytes();
        assert_eq!(
            resolve(text, 3, 3, LTR, TextEdit::RemoveBeforeCursor, b""),
            Some(remove(1, 2))
        );
        assert_eq!(resolve(text, 0, 0, LTR, TextEdit::RemoveBeforeCursor, b""), None);
    }

    #[test]
    fn test_remove_after_cursor() {
        let text = "aé".as_bytes();
        assert_eq!(
            resolve(text, 1, 1, LTR, TextEdit::RemoveAfterCursor, b""),
            Some(remove(1, 2))
        );
        assert_eq!(resolve(text, 3, 3, LTR, TextEdit::RemoveAfterCursor, b""), None);
    }

    #[test]
    fn test_remove_selection() {
        let text = b"hello";
        // Anchor after the cursor or before it, same range either way
        assert_eq!(
            resolve(text, 4, 1, LTR, TextEdit::RemoveBeforeCursor, b""),
            Some(remove(1, 3))
        );
        assert_eq!(
            resolve(text, 1, 4, LTR, TextEdit::RemoveAfterCursor, b""),
            Some(remove(1, 3))
        );
    }

    #[test]
    fn test_insert() {
        let text = b"hello";
        assert_eq!(
            resolve(text, 2, 2, LTR, TextEdit::InsertBeforeCursor, b"XY"),
            Some(EditAction::Update {
                remove_offset: 2,
                remove_size: 0,
                insert_offset: 2,
                cursor: 4,
                selection: 4,
            })
        );
        assert_eq!(
            resolve(text, 2, 2, LTR, TextEdit::InsertAfterCursor, b"XY"),
            Some(EditAction::Update {
                remove_offset: 2,
                remove_size: 0,
                insert_offset: 2,
                cursor: 2,
                selection: 2,
            })
        );
    }

    #[test]
    fn test_insert_replaces_selection() {
        let text = b"hello";
        assert_eq!(
            resolve(text, 4, 1, LTR, TextEdit::InsertBeforeCursor, b"X"),
            Some(EditAction::Update {
                remove_offset: 1,
                remove_size: 3,
                insert_offset: 1,
                cursor: 2,
                selection: 2,
            })
        );
    }

    #[test]
    #[should_panic(expected = "expects no insert text")]
    fn test_insert_text_on_move_panics() {
        let _ = resolve(b"abc", 0, 0, LTR, TextEdit::MoveCursorRight, b"x");
    }
}
