use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::commands::{CommandParseError, CommandRouteError, SlashCommandPayload};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    ChannelMessage(ChannelMessageEvent),
    SlashCommand(SlashCommandPayload),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::ChannelMessage(_) => SlackEventType::ChannelMessage,
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    ChannelMessage,
    SlashCommand,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMessageEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub text: String,
    /// Set when the message was posted by a bot. Bot messages are never
    /// reacted to, or the bot would feed on its own output.
    pub bot_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// A text reply to post back to the channel.
    Responded(String),
    /// Reaction names (no colons) to add to the triggering message.
    Reacted(Vec<String>),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::{
        ChannelMessageEvent, EventContext, EventDispatcher, EventHandler, EventHandlerError,
        HandlerResult, SlackEnvelope, SlackEvent, SlackEventType,
    };

    struct EchoMessageHandler;

    #[async_trait]
    impl EventHandler for EchoMessageHandler {
        fn event_type(&self) -> SlackEventType {
            SlackEventType::ChannelMessage
        }

        async fn handle(
            &self,
            envelope: &SlackEnvelope,
            _ctx: &EventContext,
        ) -> Result<HandlerResult, EventHandlerError> {
            let SlackEvent::ChannelMessage(event) = &envelope.event else {
                return Ok(HandlerResult::Ignored);
            };
            Ok(HandlerResult::Responded(event.text.clone()))
        }
    }

    fn message_envelope(text: &str) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::ChannelMessage(ChannelMessageEvent {
                channel_id: "C1".to_owned(),
                message_ts: "1756000000.0001".to_owned(),
                user_id: "U1".to_owned(),
                text: text.to_owned(),
                bot_id: None,
            }),
        }
    }

    #[tokio::test]
    async fn dispatcher_routes_by_event_type() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(EchoMessageHandler);

        let result = dispatcher
            .dispatch(&message_envelope("shipped the release"), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded("shipped the release".to_owned()));
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();

        let result = dispatcher
            .dispatch(&message_envelope("hello"), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn unsupported_events_fall_through_as_ignored() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(EchoMessageHandler);
        assert_eq!(dispatcher.handler_count(), 1);

        let envelope = SlackEnvelope {
            envelope_id: "env-2".to_owned(),
            event: SlackEvent::Unsupported { event_type: "app_mention".to_owned() },
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }
}
