//! ANNA PARIS Core - Shared types library.
//!
//! This crate provides common types used across all ANNA PARIS components:
//! - `storefront` - Public API, checkout pipeline and back office
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure pricing rules - no I/O, no
//! database access, no HTTP clients. Database encodings are behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, order numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
