//! The bus transport envelope.

use uuid::Uuid;

use crate::command::Command;
use crate::event::Event;

/// A message carried by the bus: either a command or an event.
///
/// The bus only ever transports these two shapes, so anything else is
/// unrepresentable rather than a runtime failure.
#[derive(Debug, Clone)]
pub enum Message {
    /// A command envelope.
    Command(Command),
    /// An event envelope.
    Event(Event),
}

impl Message {
    /// Returns the topic tag this message is routed under.
    #[must_use]
    pub fn action_tag(&self) -> &'static str {
        match self {
            Self::Command(cmd) => cmd.action().as_str(),
            Self::Event(event) => event.action().as_str(),
        }
    }

    /// Returns the message id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Command(cmd) => cmd.id(),
            Self::Event(event) => event.id(),
        }
    }
}

impl From<Command> for Message {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use crate::action::{CmdAction, EventAction};

    use super::*;

    #[test]
    fn test_action_tag_follows_inner_message() {
        let cmd = Command::from_bytes(CmdAction::ProcessTxn, Vec::new());
        let event = Event::from_bytes(EventAction::TxnRead, "agg", Vec::new()).unwrap();

        assert_eq!(Message::from(cmd).action_tag(), "ProcessTxn");
        assert_eq!(Message::from(event).action_tag(), "TxnRead");
    }
}
