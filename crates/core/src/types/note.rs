//! Internal order notes.
//!
//! Notes are written by admins and stored on the order as a JSONB array,
//! newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::json_column::JsonList;

/// Maximum length of a note message after trimming.
pub const MAX_NOTE_LENGTH: usize = 2000;

/// Errors that can occur when creating a note.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteError {
    #[error("note message is empty")]
    Empty,
    #[error("note message exceeds {MAX_NOTE_LENGTH} characters")]
    TooLong,
}

/// A single note entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNote {
    pub id: Uuid,
    pub author: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl OrderNote {
    /// Create a note with a fresh id, stamped at `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed message is empty or too long.
    pub fn new(author: impl Into<String>, message: &str, at: DateTime<Utc>) -> Result<Self, NoteError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(NoteError::Empty);
        }
        if message.chars().count() > MAX_NOTE_LENGTH {
            return Err(NoteError::TooLong);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            author: author.into(),
            message: message.to_owned(),
            at,
        })
    }
}

/// Pick the author label for a note: email, then user id, then `admin`.
#[must_use]
pub fn note_author(email: Option<&str>, user_id: Option<&str>) -> String {
    email
        .filter(|e| !e.is_empty())
        .or(user_id.filter(|id| !id.is_empty()))
        .unwrap_or("admin")
        .to_owned()
}

/// Notes column of an order.
pub type OrderNotes = JsonList<OrderNote>;
