//! Seed an empty database with accounts, categories and sample products.
//!
//! Seeding is skipped entirely when any product exists, so running it twice
//! is harmless.

use anna_paris_core::{Email, Price, UserRole};
use anna_paris_storefront::db::products::NewProduct;
use anna_paris_storefront::db::{CategoryRepository, ProductRepository, UserRepository};
use anna_paris_storefront::services::auth::hash_password;
use tracing::info;

use super::connect;

/// Credentials for the seeded accounts.
pub struct SeedAccounts<'a> {
    pub admin_email: &'a str,
    pub admin_password: &'a str,
    pub customer_email: &'a str,
    pub customer_password: &'a str,
}

/// A sample product: name, slug, category slug, price, stock, featured, image.
type SampleProduct = (&'static str, &'static str, &'static str, i64, i32, bool, &'static str);

const PEARL_IMAGE: &str = "https://images.unsplash.com/photo-1515562141207-7a88fb7ce338?w=800&q=85";
const PENDANT_IMAGE: &str = "https://images.unsplash.com/photo-1599643478518-a784e5dc4c8f?w=800&q=85";
const EARRING_IMAGE: &str = "https://images.unsplash.com/photo-1535632066927-ab7c9ab60908?w=800&q=85";
const STUD_IMAGE: &str = "https://images.unsplash.com/photo-1611591437281-460bfbe1220a?w=800&q=85";
const RING_IMAGE: &str = "https://images.unsplash.com/photo-1605100804763-247f67b3557e?w=800&q=85";

const SAMPLE_PRODUCTS: [SampleProduct; 8] = [
    ("Classic Pearl Strand Necklace", "classic-pearl-strand-necklace", "necklaces", 12_500, 15, true, PEARL_IMAGE),
    ("Diamond Solitaire Pendant", "diamond-solitaire-pendant", "necklaces", 28_900, 8, true, PENDANT_IMAGE),
    ("Pearl Drop Earrings", "pearl-drop-earrings", "earrings", 8_900, 25, true, EARRING_IMAGE),
    ("Diamond Stud Earrings", "diamond-stud-earrings", "earrings", 24_500, 18, true, STUD_IMAGE),
    ("Pearl Tennis Bracelet", "pearl-tennis-bracelet", "bracelets", 16_500, 12, true, STUD_IMAGE),
    ("Engagement Diamond Ring", "engagement-diamond-ring", "rings", 52_000, 5, true, RING_IMAGE),
    ("South Sea Pearl Necklace", "south-sea-pearl-necklace", "sets", 78_000, 3, true, PEARL_IMAGE),
    ("Premium Jewelry Care Kit", "premium-jewelry-care-kit", "others", 1_900, 40, false, STUD_IMAGE),
];

/// Seed the database.
///
/// # Errors
///
/// Returns an error if an email is invalid, the database is unreachable, or
/// a write fails.
pub async fn run(accounts: &SeedAccounts<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let admin_email = Email::normalized(accounts.admin_email)?;
    let customer_email = Email::normalized(accounts.customer_email)?;

    let pool = connect().await?;

    let products = ProductRepository::new(&pool);
    if products.any_exist().await? {
        info!("Products already exist, skipping seed");
        return Ok(());
    }

    let users = UserRepository::new(&pool);
    users
        .upsert_with_role(
            &admin_email,
            Some("Admin User"),
            &hash_password(accounts.admin_password)?,
            UserRole::Admin,
        )
        .await?;
    users
        .upsert_with_role(
            &customer_email,
            Some("Anna Customer"),
            &hash_password(accounts.customer_password)?,
            UserRole::Customer,
        )
        .await?;
    info!("Accounts seeded: {admin_email} (admin), {customer_email} (customer)");

    let categories = CategoryRepository::new(&pool);
    categories.ensure_canonical().await?;

    for (name, slug, category, price, stock, featured, image) in SAMPLE_PRODUCTS {
        let category_id = categories
            .id_by_slug(category)
            .await?
            .ok_or_else(|| format!("Category missing after upsert: {category}"))?;

        products
            .create(&NewProduct {
                name: name.to_owned(),
                slug: slug.to_owned(),
                description: Some("Sample product for system testing".to_owned()),
                price: Price::new(price),
                compare_at_price: None,
                stock,
                category_id,
                published: true,
                featured,
                images: vec![image.to_owned()],
            })
            .await?;
    }

    info!("Seeding complete! {} products created", SAMPLE_PRODUCTS.len());
    Ok(())
}
