use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, TimeZone};
use messaging::MessagePump;
use tokio::{io::AsyncRead, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracking::TrackingModule;

use crate::{
    storage::{persister::Persister, week_store::WeekStore},
    tracker::{
        event::{EventEnvelope, IDLE_THRESHOLD_SECONDS},
        oracle::SnapshotOracle,
        router::EventRouter,
    },
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod messaging;
pub mod shutdown;
pub mod tracking;

/// Represents the starting point for the daemon. Events arrive over stdin, the
/// browser launches the host and owns the pipe.
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    info!(
        "Tracking host starting, idle threshold is {}s",
        IDLE_THRESHOLD_SECONDS
    );

    let (sender, receiver) = mpsc::channel::<EventEnvelope>(10);

    let shutdown_token = CancellationToken::new();

    let pump = create_pump(tokio::io::stdin(), sender, &shutdown_token);

    let tracking = create_tracking(dir.join("records"), receiver, DefaultClock, Local)?;

    let (_, pump_result, tracking_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        pump.run(),
        tracking.run(),
    );

    if let Err(pump_result) = pump_result {
        error!("Message pump got an error {:?}", pump_result);
    }

    if let Err(tracking_result) = tracking_result {
        error!("Tracking module got an error {:?}", tracking_result);
    }

    Ok(())
}

fn create_pump<R: AsyncRead + Unpin>(
    input: R,
    sender: mpsc::Sender<EventEnvelope>,
    shutdown_token: &CancellationToken,
) -> MessagePump<R> {
    MessagePump::new(input, sender, shutdown_token.clone())
}

fn create_tracking<Tz: TimeZone>(
    record_dir: PathBuf,
    receiver: mpsc::Receiver<EventEnvelope>,
    clock: impl Clock,
    tz: Tz,
) -> Result<TrackingModule<WeekStore, Tz>, anyhow::Error> {
    let store = WeekStore::new(record_dir)?;
    let persister = Persister::new(store, tz);
    let router = EventRouter::new(SnapshotOracle::default(), persister, Box::new(clock));
    Ok(TrackingModule::new(receiver, router))
}

#[cfg(test)]
mod daemon_tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{create_pump, create_tracking, messaging::write_message},
        storage::{
            store::TimeStore,
            week_store::WeekStore,
        },
        tracker::event::{
            BrowserEvent, EnvironmentSnapshot, EventEnvelope, IdleState,
        },
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    struct SteppingClock {
        start: DateTime<Utc>,
        calls: AtomicI64,
    }

    impl Clock for SteppingClock {
        fn time(&self) -> DateTime<Utc> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.start + Duration::seconds(30) * (call as i32)
        }
    }

    fn active_envelope(url: &str) -> EventEnvelope {
        EventEnvelope {
            event: BrowserEvent::TabActivated,
            snapshot: EnvironmentSnapshot {
                idle_state: IdleState::Active,
                focused_window: Some(1),
                active_tab_url: Some(url.to_owned()),
            },
        }
    }

    fn idle_envelope() -> EventEnvelope {
        EventEnvelope {
            event: BrowserEvent::IdleStateChanged {
                state: IdleState::Idle,
            },
            snapshot: EnvironmentSnapshot {
                idle_state: IdleState::Idle,
                focused_window: Some(1),
                active_tab_url: None,
            },
        }
    }

    /// End to end smoke test: framed messages go in, week records come out.
    #[tokio::test]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let (mut client, server) = tokio::io::duplex(4096);

        let shutdown_token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(10);

        let pump = create_pump(server, sender, &shutdown_token);
        let clock = SteppingClock {
            start: Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap(),
            calls: AtomicI64::new(0),
        };
        let tracking = create_tracking(dir.path().to_path_buf(), receiver, clock, Utc)?;

        let (writer_result, pump_result, tracking_result) = tokio::join!(
            async {
                write_message(&mut client, &active_envelope("https://example.com/a")).await?;
                write_message(&mut client, &idle_envelope()).await?;
                drop(client);
                anyhow::Ok(())
            },
            pump.run(),
            tracking.run(),
        );

        writer_result?;
        pump_result?;
        tracking_result?;

        let store = WeekStore::new(dir.path().to_path_buf())?;
        let snapshot = store.get_all().await?;
        // One 30 second session, stopped by the idle event.
        assert_eq!(snapshot["week_2024_18"]["2024-05-03"]["example.com"], 30_000);
        Ok(())
    }
}
