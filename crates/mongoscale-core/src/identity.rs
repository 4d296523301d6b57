//! Shard identity
//!
//! A shard identity is a numeric token derived from the wall clock at
//! creation time, at one-second granularity: the digits of
//! `YYYYMMDDHHMMSS` concatenated into a single integer. Two identities
//! generated within the same calendar second collide; the format is kept
//! for compatibility with deployed replica-set names, and callers that
//! need stronger uniqueness can use [`ShardId::random`] instead.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identity for one provisioned shard.
///
/// The identity is generated once per provisioning call and flows into the
/// shard's replica-set name and instance name tag, so both are always
/// derived from the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardId(u64);

impl ShardId {
    /// Generate an identity from the current local wall clock.
    pub fn generate() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Derive an identity from a specific point in time.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let value = dt.year() as u64 * 10_000_000_000
            + u64::from(dt.month()) * 100_000_000
            + u64::from(dt.day()) * 1_000_000
            + u64::from(dt.hour()) * 10_000
            + u64::from(dt.minute()) * 100
            + u64::from(dt.second());
        Self(value)
    }

    /// Generate a random 64-bit identity.
    ///
    /// Collision-resistant alternative to the wall-clock derivation. The
    /// derived replica-set name no longer encodes a timestamp, so only use
    /// this where nothing parses the name back into a date.
    pub fn random() -> Self {
        Self(rand::random::<u64>())
    }

    /// Wrap a raw identity value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The raw identity value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Replica-set name for this shard, e.g. `shard20240115103045set`.
    pub fn replica_set(&self) -> String {
        format!("shard{}set", self.0)
    }

    /// Instance name tag for this shard, e.g. `MongoShardInstance20240115103045`.
    pub fn instance_tag(&self) -> String {
        format!("MongoShardInstance{}", self.0)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_from_datetime_digit_layout() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        assert_eq!(ShardId::from_datetime(&dt).value(), 20240115103045);
    }

    #[test]
    fn test_derived_names() {
        let id = ShardId::from_raw(20240115103045);
        assert_eq!(id.replica_set(), "shard20240115103045set");
        assert_eq!(id.instance_tag(), "MongoShardInstance20240115103045");
    }

    #[test]
    fn test_one_second_apart_is_distinct() {
        let a = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        let b = a + chrono::Duration::seconds(1);
        assert_ne!(ShardId::from_datetime(&a), ShardId::from_datetime(&b));
    }

    #[test]
    fn test_same_second_collides() {
        // Documented weakness: sub-second calls yield the same identity.
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();
        assert_eq!(ShardId::from_datetime(&dt), ShardId::from_datetime(&dt));
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(ShardId::random(), ShardId::random());
    }
}
