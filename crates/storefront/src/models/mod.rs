//! Domain models for the storefront.
//!
//! These are validated domain types separate from the database row types,
//! serialized with the `camelCase` field names the API exposes.

pub mod admin;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod user;
pub mod wishlist;

pub use admin::{ContentPageSummary, CustomerSummary, StoreMetrics};
pub use order::{CreatedOrder, Order, OrderItem, ShippingAddress};
pub use product::{Category, CategorySummary, Product};
pub use review::{Review, ReviewPage};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
pub use wishlist::WishlistEntry;
