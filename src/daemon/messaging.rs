//! Native-messaging transport. The browser frames each json message with a
//! 4-byte little-endian length prefix and delivers it over the host's stdin.

use std::io::ErrorKind;

use anyhow::{bail, Result};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc,
};
#[cfg(test)]
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tracker::event::EventEnvelope;

/// Sanity cap on a single frame. Event envelopes are tiny, anything near this
/// size means the stream is out of sync.
pub const MAX_MESSAGE_LEN: u32 = 1024 * 1024;

/// Reads framed envelopes off the browser pipe and forwards them to the
/// tracking module. Cancels the shutdown token when the pipe closes, the host
/// has no reason to outlive its browser.
pub struct MessagePump<R> {
    input: R,
    next: mpsc::Sender<EventEnvelope>,
    shutdown: CancellationToken,
}

impl<R: AsyncRead + Unpin> MessagePump<R> {
    pub fn new(input: R, next: mpsc::Sender<EventEnvelope>, shutdown: CancellationToken) -> Self {
        Self {
            input,
            next,
            shutdown,
        }
    }

    /// Executes the pump event loop.
    pub async fn run(mut self) -> Result<()> {
        let result = self.pump().await;
        self.shutdown.cancel();
        result
    }

    async fn pump(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                frame = read_frame(&mut self.input) => {
                    let Some(frame) = frame? else {
                        info!("Event stream closed");
                        return Ok(());
                    };
                    match serde_json::from_slice::<EventEnvelope>(&frame) {
                        Ok(envelope) => {
                            debug!("Received message {:?}", envelope.event);
                            if self.next.send(envelope).await.is_err() {
                                return Ok(());
                            }
                        }
                        // A malformed message is skipped, the next frame
                        // boundary is still known from the length prefix.
                        Err(e) => warn!("Skipping malformed message: {e}"),
                    }
                }
            }
        }
    }
}

/// Reads one length-prefixed frame. `None` means the pipe reached end of
/// stream at a frame boundary.
async fn read_frame<R: AsyncRead + Unpin>(input: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match input.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_MESSAGE_LEN {
        bail!("Frame of {len} bytes exceeds the message limit");
    }
    let mut frame = vec![0u8; len as usize];
    input.read_exact(&mut frame).await?;
    Ok(Some(frame))
}

/// Frames a message the way the browser does. Tracking is one-directional, the
/// host never writes, so this only exists to drive the pump in tests.
#[cfg(test)]
pub async fn write_message<W: AsyncWrite + Unpin>(
    output: &mut W,
    envelope: &EventEnvelope,
) -> Result<()> {
    let body = serde_json::to_vec(envelope)?;
    output.write_all(&(body.len() as u32).to_le_bytes()).await?;
    output.write_all(&body).await?;
    output.flush().await?;
    Ok(())
}
