//! Wishlist types.

use serde::Serialize;

use anna_paris_core::{Price, ProductId};

/// A wishlist entry, keyed by the product it points at.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    /// Product id.
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    /// First product image, or an empty string.
    pub image: String,
}
