//! Buffered line-oriented output adapter.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use loadgate_bus::{MessageBus, Subscription};
use loadgate_core::action::{CmdAction, EventAction};
use loadgate_core::event::Event;
use loadgate_core::message::Message;
use loadgate_core::repository::EventRepository;

use crate::error::ComponentError;

/// Writes the serialized report on `WriteData` and acknowledges with a
/// `DataWritten` event, then exits: one report per run.
pub struct ReportWriter<W> {
    sink: BufWriter<W>,
    bus: Arc<dyn MessageBus>,
    repository: Arc<dyn EventRepository>,
    subscription: Subscription,
}

impl<W: AsyncWrite + Unpin> ReportWriter<W> {
    /// Subscribes to `WriteData`.
    ///
    /// # Errors
    ///
    /// Returns a bus error if the subscription is refused.
    pub async fn subscribe(
        sink: W,
        bus: Arc<dyn MessageBus>,
        repository: Arc<dyn EventRepository>,
    ) -> Result<Self, ComponentError> {
        let subscription = bus.subscribe(CmdAction::WriteData.as_str()).await?;
        Ok(Self {
            sink: BufWriter::new(sink),
            bus,
            repository,
            subscription,
        })
    }

    /// Waits for one `WriteData` command, writes and flushes its payload
    /// followed by a newline, and emits `DataWritten`.
    ///
    /// # Errors
    ///
    /// Returns IO errors from the sink and storage/publish errors from
    /// the acknowledgment event.
    pub async fn run(mut self, token: CancellationToken) -> Result<(), ComponentError> {
        info!("starting command listener");

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!("received cancellation signal");
                    self.bus.unsubscribe(&self.subscription).await?;
                    return Ok(());
                }
                message = self.subscription.recv() => {
                    let Some(message) = message else { return Ok(()) };
                    let Message::Command(command) = message else {
                        warn!("expected a command on the WriteData topic");
                        continue;
                    };

                    // An empty report is still a report: write the line
                    // and acknowledge so the saga can complete.
                    trace!(command = %command.id(), "writing report to output");
                    self.sink.write_all(command.data()).await?;
                    self.sink.write_all(b"\n").await?;
                    self.sink.flush().await?;
                    trace!(command = %command.id(), "wrote report to output");

                    let event = Event::from_bytes(
                        EventAction::DataWritten,
                        Uuid::new_v4().to_string(),
                        command.data().to_vec(),
                    )?
                    .with_correlation_key(command.id());

                    trace!(command = %command.id(), "publishing data-written event");
                    self.repository.insert_and_publish(event).await?;

                    self.bus.unsubscribe(&self.subscription).await?;
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{Duration, timeout};

    use loadgate_bus::MemoryBus;
    use loadgate_core::command::Command;
    use loadgate_test_support::{RecordingEventRepository, SharedLineSink};

    use super::*;

    #[tokio::test]
    async fn test_writer_flushes_payload_and_acknowledges() {
        // Arrange
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
        let repository = Arc::new(RecordingEventRepository::new(Vec::new()));
        let sink = SharedLineSink::new();
        let writer = ReportWriter::subscribe(
            sink.clone(),
            Arc::clone(&bus),
            Arc::clone(&repository) as _,
        )
        .await
        .unwrap();
        let handle = tokio::spawn(writer.run(CancellationToken::new()));

        // Act
        let command = Command::from_bytes(CmdAction::WriteData, b"report body".to_vec());
        let command_id = command.id();
        bus.publish(Message::Command(command)).await.unwrap();

        // Assert: the writer exits after its single command.
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("writer must exit after handling the command")
            .unwrap()
            .unwrap();
        assert_eq!(sink.contents(), "report body\n");

        let published = repository.published_events();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].action(), EventAction::DataWritten);
        assert_eq!(published[0].correlation_key(), Some(command_id));
        assert_eq!(published[0].data(), b"report body");
    }

    #[tokio::test]
    async fn test_writer_stops_cleanly_on_cancellation() {
        let bus: Arc<dyn MessageBus> = Arc::new(MemoryBus::new());
        let repository = Arc::new(RecordingEventRepository::new(Vec::new()));
        let writer = ReportWriter::subscribe(
            SharedLineSink::new(),
            Arc::clone(&bus),
            Arc::clone(&repository) as _,
        )
        .await
        .unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(writer.run(token.clone()));
        token.cancel();

        timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(repository.published_events().is_empty());
    }
}
