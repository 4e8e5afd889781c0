use serde::{Deserialize, Serialize};

pub mod answer;
pub mod document;
pub mod index_chunk;

/// Anything persisted as a SurrealDB record: a stable table name plus a
/// string id chosen by us (not by the database).
pub trait StoredObject: Serialize + for<'de> Deserialize<'de> {
    fn table_name() -> &'static str;
    fn get_id(&self) -> &str;
}

/// Declares a persisted record type: a struct with `id`, `created_at` and
/// `updated_at` plus the given fields, wired up with the serde glue SurrealDB
/// needs (record ids come back as `Thing`s, datetimes as `sql::Datetime`).
///
/// One invocation per module; the generated `record_serde` helper module would
/// otherwise collide.
#[macro_export]
macro_rules! stored_object {
    ($name:ident, $table:expr, {$($(#[$attr:meta])* $field:ident: $ty:ty),* $(,)?}) => {
        mod record_serde {
            use ::serde::de::{self, Visitor};
            use ::serde::{Deserialize, Serialize};
            use std::fmt;

            struct FlexibleIdVisitor;

            impl<'de> Visitor<'de> for FlexibleIdVisitor {
                type Value = String;

                fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                    formatter.write_str("a string or a record Thing")
                }

                fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(value.to_string())
                }

                fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    Ok(value)
                }

                fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
                where
                    A: de::MapAccess<'de>,
                {
                    let thing = ::surrealdb::sql::Thing::deserialize(
                        de::value::MapAccessDeserializer::new(map),
                    )?;
                    Ok(thing.id.to_raw())
                }
            }

            pub(super) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                deserializer.deserialize_any(FlexibleIdVisitor)
            }

            pub(super) fn datetime<S>(
                date: &::chrono::DateTime<::chrono::Utc>,
                serializer: S,
            ) -> Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                ::surrealdb::sql::Datetime::from(*date).serialize(serializer)
            }

            pub(super) fn datetime_from<'de, D>(
                deserializer: D,
            ) -> Result<::chrono::DateTime<::chrono::Utc>, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let dt = ::surrealdb::sql::Datetime::deserialize(deserializer)?;
                Ok(::chrono::DateTime::<::chrono::Utc>::from(dt))
            }
        }

        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize, PartialEq)]
        pub struct $name {
            #[serde(deserialize_with = "record_serde::flexible_id")]
            pub id: String,
            #[serde(
                serialize_with = "record_serde::datetime",
                deserialize_with = "record_serde::datetime_from",
                default
            )]
            pub created_at: ::chrono::DateTime<::chrono::Utc>,
            #[serde(
                serialize_with = "record_serde::datetime",
                deserialize_with = "record_serde::datetime_from",
                default
            )]
            pub updated_at: ::chrono::DateTime<::chrono::Utc>,
            $( $(#[$attr])* pub $field: $ty),*
        }

        impl $crate::storage::types::StoredObject for $name {
            fn table_name() -> &'static str {
                $table
            }

            fn get_id(&self) -> &str {
                &self.id
            }
        }
    };
}
