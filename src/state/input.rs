//! Input Module - Key event to text edit mapping
//!
//! Bridges crossterm's key events with the text editing operations. The
//! mapping is a fixed table; routing the resulting command to the focused
//! data item is up to the event layer.
//!
//! | Key                 | Operation                                  |
//! |---------------------|--------------------------------------------|
//! | Backspace           | `RemoveBeforeCursor`                       |
//! | Delete              | `RemoveAfterCursor`                        |
//! | Left / Right        | `MoveCursorLeft` / `MoveCursorRight`       |
//! | Shift+Left / Right  | `ExtendSelectionLeft` / `Right`            |
//! | Home / End          | `MoveCursorLineBegin` / `LineEnd`          |
//! | Shift+Home / End    | `ExtendSelectionLineBegin` / `LineEnd`     |
//! | printable character | `InsertBeforeCursor` with the character    |
//!
//! # Example
//!
//! ```ignore
//! use spark_layers::state::input::edit_for_key;
//!
//! if let Event::Key(key) = crossterm::event::read()? {
//!     if let Some(command) = edit_for_key(&key) {
//!         layer.edit_text(focused, command.edit, &command.text);
//!     }
//! }
//! ```

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::text_edit::TextEdit;

// =============================================================================
// COMMAND
// =============================================================================

/// A text edit together with the text it inserts, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditCommand {
    pub edit: TextEdit,
    pub text: String,
}

impl TextEditCommand {
    fn new(edit: TextEdit) -> Self {
        Self {
            edit,
            text: String::new(),
        }
    }
}

// =============================================================================
// KEY MAPPING
// =============================================================================

/// Map a crossterm key event to a text edit.
///
/// Returns `None` for release events, keys without an editing meaning and
/// characters typed with Ctrl or Alt held (those are shortcuts).
pub fn edit_for_key(event: &KeyEvent) -> Option<TextEditCommand> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let shift = event.modifiers.contains(KeyModifiers::SHIFT);

    let edit = match event.code {
        KeyCode::Backspace => TextEdit::RemoveBeforeCursor,
        KeyCode::Delete => TextEdit::RemoveAfterCursor,
        KeyCode::Left if shift => TextEdit::ExtendSelectionLeft,
        KeyCode::Left => TextEdit::MoveCursorLeft,
        KeyCode::Right if shift => TextEdit::ExtendSelectionRight,
        KeyCode::Right => TextEdit::MoveCursorRight,
        KeyCode::Home if shift => TextEdit::ExtendSelectionLineBegin,
        KeyCode::Home => TextEdit::MoveCursorLineBegin,
        KeyCode::End if shift => TextEdit::ExtendSelectionLineEnd,
        KeyCode::End => TextEdit::MoveCursorLineEnd,
        KeyCode::Char(ch) => {
            if event
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                return None;
            }
            return Some(TextEditCommand {
                edit: TextEdit::InsertBeforeCursor,
                text: ch.to_string(),
            });
        }
        _ => return None,
    };

    Some(TextEditCommand::new(edit))
}

// =============================================================================
// TESTS
// =============================================================================
