//! Product repository.
//!
//! Products are read with their category joined in. The JSONB media columns
//! decode leniently, so a malformed row still lists (with empty images/tags).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use anna_paris_core::{CategoryId, JsonList, JsonObject, Price, ProductId};

use super::{RepositoryError, contains_pattern};
use crate::models::{CategorySummary, Product};

/// Number of related products shown on a product page.
pub const RELATED_PRODUCTS_LIMIT: i64 = 4;

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.slug, p.name, p.description, p.price, p.compare_at_price,
           p.stock, p.published, p.featured, p.category_id,
           c.slug AS category_slug, c.name AS category_name,
           p.images, p.tags, p.variants, p.details,
           p.rating_avg, p.rating_count, p.created_at, p.updated_at
    FROM shop.product p
    LEFT JOIN shop.category c ON c.id = p.category_id
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    description: Option<String>,
    price: Price,
    compare_at_price: Option<Price>,
    stock: i32,
    published: bool,
    featured: bool,
    category_id: CategoryId,
    category_slug: Option<String>,
    category_name: Option<String>,
    images: JsonList<String>,
    tags: JsonList<String>,
    variants: Option<serde_json::Value>,
    details: Option<JsonObject>,
    rating_avg: f64,
    rating_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let category = match (row.category_slug, row.category_name) {
            (Some(slug), Some(name)) => Some(CategorySummary {
                id: row.category_id,
                slug,
                name,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            price: row.price,
            compare_at_price: row.compare_at_price,
            stock: row.stock,
            published: row.published,
            featured: row.featured,
            category_id: row.category_id,
            category,
            images: row.images,
            tags: row.tags,
            variants: row.variants,
            details: row.details.unwrap_or_default(),
            rating_avg: row.rating_avg,
            rating_count: row.rating_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Sort key for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Price,
    Name,
}

impl ProductSort {
    /// Parse a query parameter; unknown values fall back to `createdAt`.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("price") => Self::Price,
            Some("name") => Self::Name,
            _ => Self::CreatedAt,
        }
    }

    const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "p.created_at",
            Self::Price => "p.price",
            Self::Name => "p.name",
        }
    }
}

/// Sort direction; descending unless `asc` is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a query parameter.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters for the public product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub featured_only: bool,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub sort: ProductSort,
    pub order: SortOrder,
}

/// Fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Price,
    pub compare_at_price: Option<Price>,
    pub stock: i32,
    pub category_id: CategoryId,
    pub published: bool,
    pub featured: bool,
    pub images: Vec<String>,
}

/// Partial product update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub compare_at_price: Option<Price>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List published products matching a filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        query.push(" WHERE p.published");

        if let Some(slug) = &filter.category_slug {
            query.push(" AND c.slug = ").push_bind(slug.clone());
        }
        if filter.featured_only {
            query.push(" AND p.featured");
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            query
                .push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY ")
            .push(filter.sort.column())
            .push(" ")
            .push(filter.order.keyword())
            .push(", p.id ")
            .push(filter.order.keyword());

        if let Some(limit) = filter.limit.filter(|l| *l > 0) {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get any product (published or not) by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Get any product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Other published products in the same category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(&self, product: &Product) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"{PRODUCT_SELECT}
            WHERE p.published AND p.category_id = $1 AND p.id <> $2
            ORDER BY p.created_at DESC
            LIMIT $3"
        ))
        .bind(product.category_id)
        .bind(product.id)
        .bind(RELATED_PRODUCTS_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// List every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} ORDER BY p.created_at DESC"))
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Whether any product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn any_exist(&self) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM shop.product)")
            .fetch_one(self.pool)
            .await?;

        Ok(exists)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, product: &NewProduct) -> Result<(ProductId, String), RepositoryError> {
        let (id, slug) = sqlx::query_as::<_, (ProductId, String)>(
            r"
            INSERT INTO shop.product
                (name, slug, description, price, compare_at_price, stock,
                 category_id, published, featured, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, slug
            ",
        )
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.compare_at_price)
        .bind(product.stock)
        .bind(product.category_id)
        .bind(product.published)
        .bind(product.featured)
        .bind(JsonList::new(product.images.clone()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "slug"))?;

        Ok((id, slug))
    }

    /// Apply a partial update to the product with the given slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has that slug.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        slug: &str,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            UPDATE shop.product
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                compare_at_price = COALESCE($6, compare_at_price),
                stock = COALESCE($7, stock),
                category_id = COALESCE($8, category_id),
                published = COALESCE($9, published),
                featured = COALESCE($10, featured),
                updated_at = NOW()
            WHERE slug = $1
            RETURNING id
            ",
        )
        .bind(slug)
        .bind(&update.name)
        .bind(&update.slug)
        .bind(&update.description)
        .bind(update.price)
        .bind(update.compare_at_price)
        .bind(update.stock)
        .bind(update.category_id)
        .bind(update.published)
        .bind(update.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "slug"))?
        .ok_or(RepositoryError::NotFound)?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete the product with the given slug.
    ///
    /// Order items keep their snapshot; their product reference becomes null.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has that slug.
    pub async fn delete(&self, slug: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE slug = $1")
            .bind(slug)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_params_fall_back() {
        assert_eq!(ProductSort::from_param(Some("price")), ProductSort::Price);
        assert_eq!(ProductSort::from_param(Some("name")), ProductSort::Name);
        assert_eq!(ProductSort::from_param(Some("popularity")), ProductSort::CreatedAt);
        assert_eq!(ProductSort::from_param(None), ProductSort::CreatedAt);

        assert_eq!(SortOrder::from_param(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::from_param(Some("ASC")), SortOrder::Desc);
        assert_eq!(SortOrder::from_param(None), SortOrder::Desc);
    }
}
