use std::collections::BTreeMap;
use std::future::Future;

use anyhow::Result;

/// Milliseconds accumulated per domain within one local calendar day.
pub type DomainMillis = BTreeMap<String, u64>;

/// One week record: date key -> domain -> accumulated milliseconds.
pub type WeekRecord = BTreeMap<String, DomainMillis>;

/// The full store: week key -> week record. Ordered maps keep exports
/// deterministic so a backup round-trips bit-identically.
pub type StoreSnapshot = BTreeMap<String, WeekRecord>;

/// Interface for abstracting storage of week records.
pub trait TimeStore {
    /// Retrieves the records for the given week keys. Missing weeks are simply
    /// absent from the result.
    fn get(&self, keys: &[String]) -> impl Future<Output = Result<StoreSnapshot>> + Send;

    fn get_all(&self) -> impl Future<Output = Result<StoreSnapshot>> + Send;

    /// Writes the given week records wholesale, replacing any existing record
    /// with the same key. Used for restoring backups.
    fn set(&self, records: StoreSnapshot) -> impl Future<Output = Result<()>> + Send;

    fn clear(&self) -> impl Future<Output = Result<()>> + Send;

    /// Additively merges a duration into one bucket. Implementations must make
    /// the read-modify-write atomic per week key, concurrent merges into the
    /// same week must not lose updates.
    fn merge(
        &self,
        week_key: &str,
        date_key: &str,
        domain: &str,
        millis: u64,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Additive merge into an in-memory week record.
pub fn merge_into(record: &mut WeekRecord, date_key: &str, domain: &str, millis: u64) {
    let bucket = record
        .entry(date_key.to_owned())
        .or_default()
        .entry(domain.to_owned())
        .or_insert(0);
    *bucket += millis;
}
