use chrono::{Duration, Local, NaiveDate, TimeZone};
use tracing::{debug, error, warn};

use crate::tracker::session::ClosedSession;

use super::{
    keys::{date_key, day_start, week_key},
    store::TimeStore,
};

/// A store merge is retried this many times before the part is declared lost.
const MERGE_ATTEMPTS: u32 = 3;

/// One store bucket a closed session contributes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPart {
    pub week_key: String,
    pub date_key: String,
    pub millis: u64,
}

/// Folds closed sessions into the store, splitting sessions that cross local
/// midnight into one part per calendar date. Persistence failures are logged
/// and dropped, the tracker has already cleared its state by the time a
/// session arrives here, so a failed merge loses that one session and nothing
/// else.
pub struct Persister<S, Tz: TimeZone = Local> {
    store: S,
    tz: Tz,
}

impl<S: TimeStore, Tz: TimeZone> Persister<S, Tz> {
    pub fn new(store: S, tz: Tz) -> Self {
        Self { store, tz }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub async fn persist(&self, session: ClosedSession) {
        for part in split_session(&session, &self.tz) {
            self.merge_part(&session.domain, part).await;
        }
    }

    async fn merge_part(&self, domain: &str, part: SessionPart) {
        for attempt in 1..=MERGE_ATTEMPTS {
            match self
                .store
                .merge(&part.week_key, &part.date_key, domain, part.millis)
                .await
            {
                Ok(()) => {
                    debug!("Saved {}ms for {domain} on {}", part.millis, part.date_key);
                    return;
                }
                Err(e) => warn!(
                    "Merge attempt {attempt} for {domain} on {} failed: {e}",
                    part.date_key
                ),
            }
        }
        error!(
            "Giving up on saving {}ms for {domain} on {}, the session data is lost",
            part.millis, part.date_key
        );
    }
}

/// Splits a closed session into per-date parts in the given timezone. The part
/// durations always sum to the session duration. Only the final midnight
/// crossing is split, a session spanning several days credits the remainder to
/// its start date.
pub fn split_session<Tz: TimeZone>(session: &ClosedSession, tz: &Tz) -> Vec<SessionPart> {
    let start = session.start.with_timezone(tz);
    let end = session.end.with_timezone(tz);

    let total = end.clone() - start.clone();
    if total <= Duration::zero() {
        warn!(
            "Discarding session for {} with non-positive duration of {}ms",
            session.domain,
            total.num_milliseconds()
        );
        return vec![];
    }

    let start_date = start.date_naive();
    let end_date = end.date_naive();
    if start_date == end_date {
        return vec![part(end_date, total)];
    }

    let midnight = day_start(end_date, tz);
    let day1 = midnight.clone() - start;
    let day2 = end - midnight;

    let mut parts = vec![];
    if day1 > Duration::zero() {
        parts.push(part(start_date, day1));
    }
    if day2 > Duration::zero() {
        parts.push(part(end_date, day2));
    }
    parts
}

fn part(date: NaiveDate, duration: Duration) -> SessionPart {
    SessionPart {
        week_key: week_key(date),
        date_key: date_key(date),
        // Positive by construction, the cast cannot wrap.
        millis: duration.num_milliseconds() as u64,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    use crate::{
        storage::store::testing::MemoryStore,
        tracker::session::ClosedSession,
    };

    use super::{split_session, Persister, SessionPart};

    fn session(start: DateTime<Utc>, end: DateTime<Utc>) -> ClosedSession {
        ClosedSession {
            domain: "example.com".into(),
            start,
            end,
        }
    }

    #[test]
    fn same_day_session_is_a_single_part() {
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        let parts = split_session(&session(start, start + Duration::minutes(5)), &Utc);

        assert_eq!(
            parts,
            vec![SessionPart {
                week_key: "week_2024_18".into(),
                date_key: "2024-05-03".into(),
                millis: 5 * 60 * 1000,
            }]
        );
    }

    #[test]
    fn midnight_crossing_splits_exactly() {
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 23, 50, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 4, 0, 10, 0).unwrap();
        let parts = split_session(&session(start, end), &Utc);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].date_key, "2024-05-03");
        assert_eq!(parts[0].millis, 10 * 60 * 1000);
        assert_eq!(parts[1].date_key, "2024-05-04");
        assert_eq!(parts[1].millis, 10 * 60 * 1000);
        assert_eq!(
            parts[0].millis + parts[1].millis,
            (end - start).num_milliseconds() as u64
        );
    }

    #[test]
    fn midnight_split_can_cross_a_week_boundary() {
        // Sunday January 8th 2023 into Monday the 9th, iso weeks 1 and 2.
        let start = Utc.with_ymd_and_hms(2023, 1, 8, 23, 50, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 1, 9, 0, 10, 0).unwrap();
        let parts = split_session(&session(start, end), &Utc);

        assert_eq!(parts[0].week_key, "week_2023_01");
        assert_eq!(parts[1].week_key, "week_2023_02");
    }

    #[test]
    fn split_uses_the_local_calendar() {
        // 21:50 utc is 23:50 at +02:00, so locally this session crosses
        // midnight even though the utc date never changes.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 21, 50, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 3, 22, 10, 0).unwrap();

        let parts = split_session(&session(start, end), &tz);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].date_key, "2024-05-03");
        assert_eq!(parts[1].date_key, "2024-05-04");
        assert_eq!(parts[0].millis, parts[1].millis);
    }

    #[test]
    fn multi_day_remainder_goes_to_the_start_date() {
        // Only the final midnight is split, so the intermediate day gets
        // nothing and everything before that midnight lands on the start date.
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 3, 0, 30, 0).unwrap();
        let parts = split_session(&session(start, end), &Utc);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].date_key, "2024-05-01");
        assert_eq!(parts[0].millis, 38 * 60 * 60 * 1000);
        assert_eq!(parts[1].date_key, "2024-05-03");
        assert_eq!(parts[1].millis, 30 * 60 * 1000);
        assert_eq!(
            parts[0].millis + parts[1].millis,
            (end - start).num_milliseconds() as u64
        );
    }

    #[test]
    fn ending_exactly_at_midnight_credits_only_the_first_day() {
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 23, 50, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 4, 0, 0, 0).unwrap();
        let parts = split_session(&session(start, end), &Utc);

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].date_key, "2024-05-03");
        assert_eq!(parts[0].millis, 10 * 60 * 1000);
    }

    #[test]
    fn non_positive_durations_are_discarded() {
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        assert!(split_session(&session(start, start), &Utc).is_empty());
        assert!(split_session(&session(start, start - Duration::seconds(1)), &Utc).is_empty());
    }

    #[tokio::test]
    async fn persist_merges_into_the_store() {
        let persister = Persister::new(MemoryStore::new(), Utc);
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        persister
            .persist(session(start, start + Duration::minutes(2)))
            .await;

        let snapshot = persister.store.snapshot();
        assert_eq!(
            snapshot["week_2024_18"]["2024-05-03"]["example.com"],
            2 * 60 * 1000
        );
    }

    #[tokio::test]
    async fn merges_commute_to_the_same_totals() {
        let start = Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        let sessions = [
            session(start, start + Duration::minutes(1)),
            session(start + Duration::minutes(5), start + Duration::minutes(7)),
            session(start + Duration::hours(1), start + Duration::hours(2)),
        ];

        let forward = Persister::new(MemoryStore::new(), Utc);
        for s in sessions.clone() {
            forward.persist(s).await;
        }

        let backward = Persister::new(MemoryStore::new(), Utc);
        for s in sessions.into_iter().rev() {
            backward.persist(s).await;
        }

        assert_eq!(forward.store.snapshot(), backward.store.snapshot());
        assert_eq!(
            forward.store.snapshot()["week_2024_18"]["2024-05-03"]["example.com"],
            (1 + 2 + 60) * 60 * 1000
        );
    }

    #[tokio::test]
    async fn a_failed_merge_is_retried() {
        let store = MemoryStore::new();
        store.fail_next_merges(1);
        let persister = Persister::new(store, Utc);

        let start = Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        persister
            .persist(session(start, start + Duration::minutes(1)))
            .await;

        assert_eq!(
            persister.store.snapshot()["week_2024_18"]["2024-05-03"]["example.com"],
            60 * 1000
        );
    }

    #[tokio::test]
    async fn the_session_is_lost_after_the_retry_budget() {
        let store = MemoryStore::new();
        store.fail_next_merges(10);
        let persister = Persister::new(store, Utc);

        let start = Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();
        persister
            .persist(session(start, start + Duration::minutes(1)))
            .await;

        assert!(persister.store.snapshot().is_empty());
    }
}
