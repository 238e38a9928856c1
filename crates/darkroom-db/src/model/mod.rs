use darkroom_core::types::EntityKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::schema::TableSchema;
use crate::db::wire::SqlValue;

pub mod activity;
pub mod booking;
pub mod cloud;
pub mod conflict;
pub mod inventory;
pub mod notification;
pub mod queue;
pub mod reminder;
pub mod task;

pub use cloud::CloudRow;

/// A record persisted in the local store.
pub trait LocalRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const SCHEMA: &'static TableSchema;

    /// Primary key value.
    fn key(&self) -> SqlValue;
}

/// A record mirrored to the cloud under the same table name.
pub trait CloudRecord: LocalRecord {
    const KIND: EntityKind;

    /// Extra cloud field names accepted for a local column, beyond the
    /// snake_case spelling and the local spelling itself.
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[];

    fn record_id(&self) -> &str;

    /// Fix-ups applied to a cloud row after aliasing and before decoding.
    fn normalize_cloud(_object: &mut serde_json::Map<String, serde_json::Value>) {}
}

/// Deserializes `null` as the type's default.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Stores a [`Rank`](darkroom_core::actor::Rank) as its integer level.
pub(crate) mod rank_level {
    use darkroom_core::actor::{Rank, Role};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    #[expect(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(rank: &Rank, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(rank.level())
    }

    /// Accepts a level, a numeric string or a role name. Anything else is the lowest rank.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rank, D::Error> {
        let rank = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(level)) => level.as_i64().map(Rank::from_level),
            Some(Value::String(text)) => text
                .trim()
                .parse::<i64>()
                .ok()
                .map(Rank::from_level)
                .or_else(|| Role::parse(&text).ok().map(Role::rank)),
            _ => None,
        };
        Ok(rank.unwrap_or(Rank::Staff))
    }
}
