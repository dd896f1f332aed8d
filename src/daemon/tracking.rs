use anyhow::Result;
use chrono::{Local, TimeZone};
use tokio::sync::mpsc::Receiver;
use tracing::debug;

use crate::{
    storage::store::TimeStore,
    tracker::{event::EventEnvelope, oracle::SnapshotOracle, router::EventRouter},
};

/// Drives the router from the message channel. Envelopes are handled strictly
/// one at a time, which keeps the stop-then-start sequence of the router from
/// ever interleaving.
pub struct TrackingModule<S, Tz: TimeZone = Local> {
    receiver: Receiver<EventEnvelope>,
    router: EventRouter<S, SnapshotOracle, Tz>,
}

impl<S: TimeStore, Tz: TimeZone> TrackingModule<S, Tz> {
    pub fn new(receiver: Receiver<EventEnvelope>, router: EventRouter<S, SnapshotOracle, Tz>) -> Self {
        Self { receiver, router }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(envelope) = self.receiver.recv().await {
            debug!("Processing event {:?}", envelope.event);
            self.router.oracle_mut().apply(envelope.snapshot);
            self.router.handle(&envelope.event).await;
        }

        // The channel closed, flush whatever session is still open.
        self.router.flush().await;
        self.receiver.close();
        Ok(())
    }
}
