//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `access` - Who may view, list and pay for orders
//! - `auth` - Email and password accounts
//! - `checkout` - Transactional order creation with stock reservation
//! - `email` - Order notification emails
//! - `export` - CSV export of orders
//! - `payments` - Stripe checkout sessions and webhooks

pub mod access;
pub mod auth;
pub mod checkout;
pub mod email;
pub mod export;
pub mod payments;
