//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for reacji:
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Slash Commands** (`commands`) - `/emoji search`, `/emoji add`, etc.
//! - **Events** (`events`) - Channel messages and command payloads
//! - **Reactions** (`reactions`) - similarity-driven emoji reactions
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to `message.channels`
//! 3. Add the `/emoji` slash command
//! 4. Set env vars: `REACJI_SLACK_APP_TOKEN`, `REACJI_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → ReactionHandler → SimilarityRanker
//!                              → SlashCommandHandler → CommandRouter
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - WebSocket event loop with reconnection logic
//! - `EventDispatcher` - Routes events to appropriate handlers
//! - `ReactionHandler` - Picks reaction emojis for channel messages
//! - `EmojiCommandService` - Trait for `/emoji` command handlers

pub mod commands;
pub mod events;
pub mod reactions;
pub mod socket;

pub use commands::{
    CatalogCommandService, CommandRouter, EmojiCommand, EmojiCommandService, SlashCommandHandler,
    SlashCommandPayload,
};
pub use events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent};
pub use reactions::ReactionHandler;
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport};
