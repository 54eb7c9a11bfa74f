//! Structured JSON columns with lenient decoding.
//!
//! Product images/tags/details and order notes are stored as JSONB. Decoding
//! never fails: a value of the wrong shape degrades to an empty list (or
//! `None` for objects), so one bad catalog row cannot break a listing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON array column decoded into `Vec<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonList<T>(Vec<T>);

impl<T> JsonList<T> {
    /// Wrap an existing list.
    #[must_use]
    pub const fn new(items: Vec<T>) -> Self {
        Self(items)
    }

    /// The first item, if any.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.0.first()
    }
}

impl<T> Default for JsonList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> From<Vec<T>> for JsonList<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T: DeserializeOwned> JsonList<T> {
    /// Decode from an arbitrary JSON value; anything but a matching array is empty.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(_) => serde_json::from_value(value).map(Self).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// A JSON object column; anything but an object decodes to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonObject(Option<Map<String, Value>>);

impl JsonObject {
    /// Decode from an arbitrary JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(Some(map)),
            _ => Self(None),
        }
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use sqlx::Postgres;
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
    use sqlx::types::Json;

    use super::{JsonList, JsonObject};

    impl<T> sqlx::Type<Postgres> for JsonList<T> {
        fn type_info() -> PgTypeInfo {
            <Value as sqlx::Type<Postgres>>::type_info()
        }

        fn compatible(ty: &PgTypeInfo) -> bool {
            <Value as sqlx::Type<Postgres>>::compatible(ty)
        }
    }

    impl<'r, T: DeserializeOwned> sqlx::Decode<'r, Postgres> for JsonList<T> {
        fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
            let raw = <Value as sqlx::Decode<Postgres>>::decode(value)?;
            Ok(Self::from_value(raw))
        }
    }

    impl<T: Serialize> sqlx::Encode<'_, Postgres> for JsonList<T> {
        fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
            <Json<&Vec<T>> as sqlx::Encode<Postgres>>::encode_by_ref(&Json(&self.0), buf)
        }
    }

    impl sqlx::Type<Postgres> for JsonObject {
        fn type_info() -> PgTypeInfo {
            <Value as sqlx::Type<Postgres>>::type_info()
        }

        fn compatible(ty: &PgTypeInfo) -> bool {
            <Value as sqlx::Type<Postgres>>::compatible(ty)
        }
    }

    impl<'r> sqlx::Decode<'r, Postgres> for JsonObject {
        fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
            let raw = <Value as sqlx::Decode<Postgres>>::decode(value)?;
            Ok(Self::from_value(raw))
        }
    }
}
