use anyhow::Result;
use chrono::{Duration, NaiveDate, Weekday};

use super::{
    keys::{date_key, week_key},
    store::{DomainMillis, StoreSnapshot, TimeStore},
};

/// Heatmap cell data for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub millis: u64,
    pub level: u8,
}

/// Buckets time into the 0..=5 heatmap intensity levels.
pub fn activity_level(millis: u64) -> u8 {
    const MINUTE: u64 = 60 * 1000;
    match millis {
        0 => 0,
        m if m < 5 * MINUTE => 1,
        m if m < 15 * MINUTE => 2,
        m if m < 30 * MINUTE => 3,
        m if m < 60 * MINUTE => 4,
        _ => 5,
    }
}

/// Read-only views over a [TimeStore], used by the cli the way the popup and
/// dashboard consume the extension's storage.
pub struct StoreReader<S> {
    store: S,
}

impl<S: TimeStore> StoreReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Per-domain milliseconds for one date.
    pub async fn day_breakdown(&self, date: NaiveDate) -> Result<DomainMillis> {
        let key = week_key(date);
        let snapshot = self.store.get(&[key.clone()]).await?;
        Ok(snapshot
            .get(&key)
            .and_then(|record| record.get(&date_key(date)))
            .cloned()
            .unwrap_or_default())
    }

    /// Domains for one date, sorted by time descending.
    pub async fn top_sites(&self, date: NaiveDate, limit: usize) -> Result<Vec<(String, u64)>> {
        let mut sites: Vec<_> = self.day_breakdown(date).await?.into_iter().collect();
        sites.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sites.truncate(limit);
        Ok(sites)
    }

    /// Per-day totals for the Monday-based week containing `day_in_week`.
    pub async fn week_breakdown(&self, day_in_week: NaiveDate) -> Result<Vec<(NaiveDate, u64)>> {
        let monday = day_in_week.week(Weekday::Mon).first_day();
        let key = week_key(monday);
        let snapshot = self.store.get(&[key.clone()]).await?;
        let record = snapshot.get(&key);

        Ok((0..7)
            .map(|offset| {
                let date = monday + Duration::days(offset);
                let total = record
                    .and_then(|r| r.get(&date_key(date)))
                    .map(day_total)
                    .unwrap_or(0);
                (date, total)
            })
            .collect())
    }

    /// Total milliseconds for one date, scanning every week record. This is the
    /// heatmap query, it does not assume the caller knows which week the date
    /// landed in.
    pub async fn time_for_date(&self, date: NaiveDate) -> Result<u64> {
        let snapshot = self.store.get_all().await?;
        Ok(time_in_snapshot(&snapshot, &date_key(date)))
    }

    /// Activity levels for the `days` days ending at `until`, oldest first.
    pub async fn activity(&self, days: u32, until: NaiveDate) -> Result<Vec<DayActivity>> {
        let snapshot = self.store.get_all().await?;
        Ok((0..i64::from(days))
            .rev()
            .map(|offset| {
                let date = until - Duration::days(offset);
                let millis = time_in_snapshot(&snapshot, &date_key(date));
                DayActivity {
                    date,
                    millis,
                    level: activity_level(millis),
                }
            })
            .collect())
    }

    /// Full store dump, one json field per week key. Feeding the document back
    /// through [StoreReader::import] reproduces the mapping bit-identically.
    pub async fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.store.get_all().await?)?)
    }

    pub async fn import(&self, document: &str) -> Result<()> {
        let records: StoreSnapshot = serde_json::from_str(document)?;
        self.store.set(records).await
    }
}

fn day_total(day: &DomainMillis) -> u64 {
    day.values().sum()
}

fn time_in_snapshot(snapshot: &StoreSnapshot, date_key: &str) -> u64 {
    snapshot
        .values()
        .filter_map(|record| record.get(date_key))
        .map(day_total)
        .sum()
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;

    use crate::storage::store::{testing::MemoryStore, TimeStore};

    use super::{activity_level, StoreReader};

    async fn seeded_reader() -> StoreReader<MemoryStore> {
        let store = MemoryStore::new();
        // Friday May 3rd and Saturday the 4th of week 18, Monday the 6th of week 19.
        for (week, date, domain, millis) in [
            ("week_2024_18", "2024-05-03", "example.com", 600_000),
            ("week_2024_18", "2024-05-03", "docs.rs", 60_000),
            ("week_2024_18", "2024-05-04", "example.com", 120_000),
            ("week_2024_19", "2024-05-06", "docs.rs", 30_000),
        ] {
            store.merge(week, date, domain, millis).await.unwrap();
        }
        StoreReader::new(store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn day_breakdown_returns_the_date_bucket() -> Result<()> {
        let reader = seeded_reader().await;
        let day = reader.day_breakdown(date(2024, 5, 3)).await?;
        assert_eq!(day["example.com"], 600_000);
        assert_eq!(day["docs.rs"], 60_000);
        assert!(reader.day_breakdown(date(2024, 5, 5)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn top_sites_sorts_descending_and_truncates() -> Result<()> {
        let reader = seeded_reader().await;
        let sites = reader.top_sites(date(2024, 5, 3), 5).await?;
        assert_eq!(
            sites,
            vec![
                ("example.com".to_owned(), 600_000),
                ("docs.rs".to_owned(), 60_000)
            ]
        );

        let limited = reader.top_sites(date(2024, 5, 3), 1).await?;
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].0, "example.com");
        Ok(())
    }

    #[tokio::test]
    async fn week_breakdown_covers_monday_through_sunday() -> Result<()> {
        let reader = seeded_reader().await;
        // Asking for any day of the week yields the same Monday-based week.
        let week = reader.week_breakdown(date(2024, 5, 4)).await?;

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].0, date(2024, 4, 29));
        assert_eq!(week[6].0, date(2024, 5, 5));
        assert_eq!(week[4], (date(2024, 5, 3), 660_000));
        assert_eq!(week[5], (date(2024, 5, 4), 120_000));
        assert_eq!(week[6].1, 0);
        Ok(())
    }

    #[tokio::test]
    async fn time_for_date_scans_all_weeks() -> Result<()> {
        let reader = seeded_reader().await;
        assert_eq!(reader.time_for_date(date(2024, 5, 3)).await?, 660_000);
        assert_eq!(reader.time_for_date(date(2024, 5, 6)).await?, 30_000);
        assert_eq!(reader.time_for_date(date(2024, 5, 10)).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn activity_is_oldest_first_with_levels() -> Result<()> {
        let reader = seeded_reader().await;
        let activity = reader.activity(4, date(2024, 5, 6)).await?;

        assert_eq!(activity.len(), 4);
        assert_eq!(activity[0].date, date(2024, 5, 3));
        assert_eq!(activity[0].millis, 660_000);
        assert_eq!(activity[0].level, 2);
        assert_eq!(activity[1].level, 1);
        assert_eq!(activity[2].millis, 0);
        assert_eq!(activity[3].date, date(2024, 5, 6));
        Ok(())
    }

    #[tokio::test]
    async fn export_import_round_trips() -> Result<()> {
        let reader = seeded_reader().await;
        let document = reader.export().await?;

        let restored = StoreReader::new(MemoryStore::new());
        restored.import(&document).await?;
        assert_eq!(restored.export().await?, document);
        Ok(())
    }

    #[test]
    fn activity_levels_follow_the_dashboard_thresholds() {
        const MINUTE: u64 = 60 * 1000;
        assert_eq!(activity_level(0), 0);
        assert_eq!(activity_level(MINUTE), 1);
        assert_eq!(activity_level(5 * MINUTE), 2);
        assert_eq!(activity_level(20 * MINUTE), 3);
        assert_eq!(activity_level(45 * MINUTE), 4);
        assert_eq!(activity_level(120 * MINUTE), 5);
    }
}
