//! Entity trait shared by every stored document

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Base trait for all documents persisted by the service.
///
/// All documents have:
/// - id: Unique identifier
/// - created_at: Creation timestamp
/// - updated_at: Last modification timestamp, refreshed by [`Entity::touch`]
///
/// Storage backends derive the collection name from
/// [`Entity::resource_name`] and use `updated_at` as the optimistic
/// concurrency token for single-document updates.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The plural resource name used as collection name (e.g., "manifests")
    fn resource_name() -> &'static str;

    /// The singular resource name used in messages (e.g., "manifest")
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier for this document
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;

    /// Refresh the last update timestamp
    fn touch(&mut self);
}

/// Fixed-width RFC 3339 timestamps for stored documents
///
/// Always nine fractional digits and a `Z` suffix, so stored values sort
/// in time order in backends that compare them as plain strings. Any
/// RFC 3339 value is accepted when reading.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}
