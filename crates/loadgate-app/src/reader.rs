//! Line-oriented input adapter.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use uuid::Uuid;

use loadgate_bus::MessageBus;
use loadgate_core::action::EventAction;
use loadgate_core::event::Event;
use loadgate_core::message::Message;

use crate::error::ComponentError;

/// Reads newline-delimited load requests and publishes each non-empty
/// line as a `TxnRead` event with a fresh aggregate id.
///
/// The reader publishes directly on the bus; read events are transient
/// and never stored.
pub struct LineReader<R> {
    lines: Lines<BufReader<R>>,
    bus: Arc<dyn MessageBus>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Creates a reader over `source`.
    pub fn new(source: R, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            lines: BufReader::new(source).lines(),
            bus,
        }
    }

    /// Runs until the source is exhausted or the token fires.
    ///
    /// # Errors
    ///
    /// Returns an IO error from the source or a bus error from
    /// publishing.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), ComponentError> {
        info!("started reading");

        loop {
            if token.is_cancelled() {
                debug!("received cancellation signal");
                return Ok(());
            }

            let Some(line) = self.lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let event = Event::from_bytes(
                EventAction::TxnRead,
                Uuid::new_v4().to_string(),
                line.into_bytes(),
            )?;

            trace!(event = %event.id(), "publishing newly read line");
            self.bus.publish(Message::Event(event)).await?;
        }

        debug!("finished reading input");
        Ok(())
    }
}
