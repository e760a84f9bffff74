//! Message-to-reaction hot path.
//!
//! A channel message is embedded and matched against the catalog; the top
//! candidates become reaction names. Reacting is best effort: any failure in
//! the search stack degrades to no reactions at all, never to a visible
//! error in the channel.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use reacji_core::ranker::{SimilarityRanker, DEFAULT_SEARCH_LIMIT};
use reacji_core::store::SearchFilters;

use crate::events::{
    ChannelMessageEvent, EventContext, EventHandler, EventHandlerError, HandlerResult,
    SlackEnvelope, SlackEvent, SlackEventType,
};

pub struct ReactionHandler {
    ranker: Arc<SimilarityRanker>,
    max_reactions: usize,
}

impl ReactionHandler {
    pub fn new(ranker: Arc<SimilarityRanker>) -> Self {
        Self { ranker, max_reactions: DEFAULT_SEARCH_LIMIT }
    }

    pub fn with_max_reactions(mut self, max_reactions: usize) -> Self {
        self.max_reactions = max_reactions.max(1);
        self
    }

    /// Reaction names (colons stripped) for a channel message. Bot and
    /// blank messages get none; so does any message when the search stack
    /// is failing.
    pub async fn reactions_for_message(&self, event: &ChannelMessageEvent) -> Vec<String> {
        if event.bot_id.is_some() {
            return Vec::new();
        }
        if event.text.trim().is_empty() {
            return Vec::new();
        }

        match self
            .ranker
            .find_similar_by_text(&event.text, self.max_reactions, &SearchFilters::default())
            .await
        {
            Ok(candidates) => {
                let names: Vec<String> = candidates
                    .iter()
                    .map(|candidate| candidate.record.reaction_name().to_owned())
                    .collect();
                debug!(
                    channel_id = %event.channel_id,
                    reactions = names.len(),
                    "selected reactions for message"
                );
                names
            }
            Err(error) => {
                warn!(
                    channel_id = %event.channel_id,
                    message_ts = %event.message_ts,
                    error = %error,
                    "reaction search failed, message left unreacted"
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl EventHandler for ReactionHandler {
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

        let reactions = self.reactions_for_message(event).await;
        Ok(if reactions.is_empty() {
            HandlerResult::Processed
        } else {
            HandlerResult::Reacted(reactions)
        })
    }
}
