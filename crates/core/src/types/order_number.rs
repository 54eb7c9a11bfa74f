//! Human-readable order numbers.
//!
//! Format: `ORD-<year>-<5 random digits>`. The space is small (100 000 per
//! year), so the database carries a unique constraint and order creation
//! retries with a fresh number on collision.

use core::fmt;

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exclusive upper bound of the random suffix.
const SUFFIX_SPACE: u32 = 100_000;

/// A customer-facing order number such as `ORD-2025-04821`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a new order number for the year of `now`.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self::generate_with(&mut rand::rng(), now)
    }

    /// Generate a new order number using the given random source.
    #[must_use]
    pub fn generate_with<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let suffix = rng.random_range(0..SUFFIX_SPACE);
        Self(format!("ORD-{}-{suffix:05}", now.year()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `OrderNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<String as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let number = OrderNumber::generate_with(&mut rng, now);
            let s = number.as_str();
            assert_eq!(s.len(), "ORD-2025-00000".len());
            let suffix = s.strip_prefix("ORD-2025-").unwrap();
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_uses_current_year() {
        let now = Utc.with_ymd_and_hms(2031, 12, 31, 23, 59, 59).unwrap();
        assert!(OrderNumber::generate(now).as_str().starts_with("ORD-2031-"));
    }
}
