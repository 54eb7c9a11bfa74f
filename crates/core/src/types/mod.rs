//! Core types for ANNA PARIS.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod json_column;
pub mod note;
pub mod order_number;
pub mod price;
pub mod pricing;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use json_column::{JsonList, JsonObject};
pub use note::{MAX_NOTE_LENGTH, NoteError, OrderNote, OrderNotes, note_author};
pub use order_number::OrderNumber;
pub use price::{CURRENCY, Price};
pub use pricing::{FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, OrderTotals, shipping_for};
pub use status::*;
