//! `/emoji` slash command parsing and routing.
//!
//! Commands are parsed into [`EmojiCommand`] values, gated by the caller's
//! stored permission level, and routed to an [`EmojiCommandService`]. All
//! replies are plain mrkdwn text.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use reacji_core::catalog_cache::EmojiCatalogCache;
use reacji_core::domain::{EmojiRecord, EmotionTone, Permission};
use reacji_core::permissions::PermissionChecker;
use reacji_core::pipeline::{BatchEmbeddingPipeline, VectorizeOptions, VectorizeOutcome};
use reacji_core::ranker::{SimilarityRanker, DEFAULT_SEARCH_LIMIT};
use reacji_core::store::{EmojiStore, SearchFilters};
use reacji_core::StoreError;

use crate::events::{
    EventContext, EventHandler, EventHandlerError, HandlerResult, SlackEnvelope, SlackEvent,
    SlackEventType,
};

pub const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub verb: String,
    pub args: String,
    pub channel_id: String,
    pub user_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EmojiCommand {
    List { limit: usize },
    Search { text: String, limit: usize, filters: SearchFilters },
    Add(NewEmoji),
    Update(EmojiUpdate),
    Delete { code: String },
    Vectorize { dry_run: bool },
    Permission(PermissionCommand),
    Help,
    Unknown { verb: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewEmoji {
    pub code: String,
    pub description: String,
    pub category: Option<String>,
    pub emotion_tone: Option<EmotionTone>,
    pub usage_scene: Option<String>,
    pub priority: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmojiUpdate {
    pub code: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub emotion_tone: Option<EmotionTone>,
    pub usage_scene: Option<String>,
    pub priority: Option<i32>,
}

impl EmojiUpdate {
    fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category.is_none()
            && self.emotion_tone.is_none()
            && self.usage_scene.is_none()
            && self.priority.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PermissionCommand {
    Grant { user_id: String, username: String, level: Permission },
    Revoke { user_id: String },
    List,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_emoji_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != "/emoji" {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let text = payload.text.trim().to_owned();
    let mut parts = text.split_whitespace();
    let verb = parts.next().unwrap_or("help").to_ascii_lowercase();
    let args = parts.collect::<Vec<_>>().join(" ");

    Ok(CommandEnvelope {
        verb,
        args,
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        request_id: payload.request_id,
    })
}

pub fn classify_emoji_command(verb: &str, args: &str) -> Result<EmojiCommand, CommandParseError> {
    match verb {
        "list" => {
            let limit = match args.split_whitespace().next() {
                Some(token) => token.parse::<usize>().map_err(|_| {
                    CommandParseError::InvalidArgument(format!("`{token}` is not a count"))
                })?,
                None => DEFAULT_LIST_LIMIT,
            };
            Ok(EmojiCommand::List { limit: limit.max(1) })
        }
        "search" => parse_search(args),
        "add" => parse_add(args),
        "update" => parse_update(args),
        "delete" => {
            let code = args
                .split_whitespace()
                .next()
                .ok_or(CommandParseError::MissingArgument("emoji code"))?;
            Ok(EmojiCommand::Delete { code: code.to_owned() })
        }
        "vectorize" => {
            let dry_run = args
                .split_whitespace()
                .any(|token| matches!(token, "dry-run" | "--dry-run"));
            Ok(EmojiCommand::Vectorize { dry_run })
        }
        "permission" => parse_permission(args),
        "help" | "" => Ok(EmojiCommand::Help),
        _ => Ok(EmojiCommand::Unknown { verb: verb.to_owned() }),
    }
}

/// `search <text...> [key:value ...]`. Tokens of the form `key:value` are
/// treated as filters; keys nobody recognizes are dropped rather than
/// rejected, so typos narrow nothing instead of breaking the search.
fn parse_search(args: &str) -> Result<EmojiCommand, CommandParseError> {
    let mut text_tokens = Vec::new();
    let mut pairs = Vec::new();
    let mut limit = DEFAULT_SEARCH_LIMIT;

    for token in args.split_whitespace() {
        match split_filter_pair(token) {
            Some(("limit", value)) => {
                limit = value.parse::<usize>().map_err(|_| {
                    CommandParseError::InvalidArgument(format!("`{value}` is not a count"))
                })?;
            }
            Some(pair) => pairs.push(pair),
            None => text_tokens.push(token),
        }
    }

    let text = text_tokens.join(" ");
    if text.is_empty() {
        return Err(CommandParseError::MissingArgument("search text"));
    }

    let filters = SearchFilters::from_key_values(pairs)
        .map_err(|error| CommandParseError::InvalidArgument(error.to_string()))?;

    Ok(EmojiCommand::Search { text, limit: limit.max(1), filters })
}

/// `add :code: <description...> [category=x] [tone=positive] [scene=y]
/// [priority=5]`.
fn parse_add(args: &str) -> Result<EmojiCommand, CommandParseError> {
    let mut tokens = args.split_whitespace();
    let code = tokens.next().ok_or(CommandParseError::MissingArgument("emoji code"))?;

    let mut new = NewEmoji { code: code.to_owned(), ..NewEmoji::default() };
    let mut description_tokens = Vec::new();
    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) => apply_field(key, value, &mut FieldTarget::New(&mut new))?,
            None => description_tokens.push(token),
        }
    }

    new.description = description_tokens.join(" ");
    if new.description.is_empty() {
        return Err(CommandParseError::MissingArgument("description"));
    }
    Ok(EmojiCommand::Add(new))
}

/// `update :code: [new description...] [key=value ...]`.
fn parse_update(args: &str) -> Result<EmojiCommand, CommandParseError> {
    let mut tokens = args.split_whitespace();
    let code = tokens.next().ok_or(CommandParseError::MissingArgument("emoji code"))?;

    let mut update = EmojiUpdate { code: code.to_owned(), ..EmojiUpdate::default() };
    let mut description_tokens = Vec::new();
    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) => apply_field(key, value, &mut FieldTarget::Update(&mut update))?,
            None => description_tokens.push(token),
        }
    }

    if !description_tokens.is_empty() {
        update.description = Some(description_tokens.join(" "));
    }
    if update.is_empty() {
        return Err(CommandParseError::MissingArgument("at least one field to change"));
    }
    Ok(EmojiCommand::Update(update))
}

enum FieldTarget<'a> {
    New(&'a mut NewEmoji),
    Update(&'a mut EmojiUpdate),
}

fn apply_field(key: &str, value: &str, target: &mut FieldTarget<'_>) -> Result<(), CommandParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CommandParseError::InvalidArgument(format!("`{key}=` has no value")));
    }

    let tone = |value: &str| {
        EmotionTone::from_str(value)
            .map_err(|error| CommandParseError::InvalidArgument(error.to_string()))
    };
    let priority = |value: &str| {
        value
            .parse::<i32>()
            .map_err(|_| CommandParseError::InvalidArgument(format!("`{value}` is not a priority")))
    };

    match (key.to_ascii_lowercase().as_str(), target) {
        ("category", FieldTarget::New(new)) => new.category = Some(value.to_owned()),
        ("category", FieldTarget::Update(update)) => update.category = Some(value.to_owned()),
        ("tone" | "emotion_tone", FieldTarget::New(new)) => new.emotion_tone = Some(tone(value)?),
        ("tone" | "emotion_tone", FieldTarget::Update(update)) => {
            update.emotion_tone = Some(tone(value)?)
        }
        ("scene" | "usage_scene", FieldTarget::New(new)) => new.usage_scene = Some(value.to_owned()),
        ("scene" | "usage_scene", FieldTarget::Update(update)) => {
            update.usage_scene = Some(value.to_owned())
        }
        ("priority", FieldTarget::New(new)) => new.priority = Some(priority(value)?),
        ("priority", FieldTarget::Update(update)) => update.priority = Some(priority(value)?),
        (other, _) => {
            return Err(CommandParseError::InvalidArgument(format!("unknown field `{other}`")))
        }
    }
    Ok(())
}

fn parse_permission(args: &str) -> Result<EmojiCommand, CommandParseError> {
    let mut tokens = args.split_whitespace();
    let action = tokens
        .next()
        .ok_or(CommandParseError::MissingArgument("permission action"))?
        .to_ascii_lowercase();

    let command = match action.as_str() {
        "grant" => {
            let user_id = tokens
                .next()
                .ok_or(CommandParseError::MissingArgument("user id"))?
                .to_owned();
            let level = tokens
                .next()
                .ok_or(CommandParseError::MissingArgument("permission level"))?;
            let level = Permission::from_str(level)
                .map_err(|error| CommandParseError::InvalidArgument(error.to_string()))?;
            let username = tokens.next().map(str::to_owned).unwrap_or_else(|| user_id.clone());
            PermissionCommand::Grant { user_id, username, level }
        }
        "revoke" => {
            let user_id = tokens
                .next()
                .ok_or(CommandParseError::MissingArgument("user id"))?
                .to_owned();
            PermissionCommand::Revoke { user_id }
        }
        "list" => PermissionCommand::List,
        other => {
            return Err(CommandParseError::InvalidArgument(format!(
                "unknown permission action `{other}`"
            )))
        }
    };
    Ok(EmojiCommand::Permission(command))
}

/// A `key:value` token is a filter pair when both halves are non-empty;
/// anything else (including `:tada:` style codes) stays search text.
fn split_filter_pair(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once(':')?;
    if key.is_empty() || value.is_empty() || value.contains(':') {
        return None;
    }
    Some((key, value))
}

pub fn required_permission(command: &EmojiCommand) -> Permission {
    match command {
        EmojiCommand::List { .. }
        | EmojiCommand::Search { .. }
        | EmojiCommand::Help
        | EmojiCommand::Unknown { .. } => Permission::Viewer,
        EmojiCommand::Add(_) | EmojiCommand::Update(_) | EmojiCommand::Delete { .. } => {
            Permission::Editor
        }
        EmojiCommand::Vectorize { .. } | EmojiCommand::Permission(_) => Permission::Admin,
    }
}

pub fn help_message() -> String {
    [
        "*`/emoji` commands*",
        "• `list [n]` — show catalog entries",
        "• `search <text> [tone:positive] [category:x] [scene:y]` — similarity search",
        "• `add :code: <description> [category=x] [tone=positive] [scene=y] [priority=5]`",
        "• `update :code: [new description] [key=value ...]`",
        "• `delete :code:`",
        "• `vectorize [dry-run]` — re-embed the catalog descriptions",
        "• `permission grant <user> <level> | revoke <user> | list`",
    ]
    .join("\n")
}

#[async_trait]
pub trait EmojiCommandService: Send + Sync {
    async fn list_emojis(&self, limit: usize) -> Result<String, CommandRouteError>;

    async fn search_emojis(
        &self,
        text: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<String, CommandRouteError>;

    async fn add_emoji(&self, new: NewEmoji) -> Result<String, CommandRouteError>;

    async fn update_emoji(&self, update: EmojiUpdate) -> Result<String, CommandRouteError>;

    async fn delete_emoji(&self, code: &str) -> Result<String, CommandRouteError>;

    async fn vectorize(&self, dry_run: bool) -> Result<String, CommandRouteError>;

    async fn grant_permission(
        &self,
        user_id: &str,
        username: &str,
        level: Permission,
    ) -> Result<String, CommandRouteError>;

    async fn revoke_permission(&self, user_id: &str) -> Result<String, CommandRouteError>;

    async fn list_permissions(&self) -> Result<String, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
    permissions: Arc<PermissionChecker>,
}

impl<S> CommandRouter<S>
where
    S: EmojiCommandService,
{
    pub fn new(service: S, permissions: Arc<PermissionChecker>) -> Self {
        Self { service, permissions }
    }

    pub async fn route(&self, envelope: CommandEnvelope) -> Result<String, CommandRouteError> {
        let command = match classify_emoji_command(&envelope.verb, &envelope.args) {
            Ok(command) => command,
            Err(error) => return Ok(format!("{error}. Try `/emoji help`.")),
        };

        let required = required_permission(&command);
        let allowed = self
            .permissions
            .check_permission(&envelope.user_id, required)
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;
        if !allowed {
            warn!(
                user_id = %envelope.user_id,
                verb = %envelope.verb,
                required = %required,
                "slash command denied"
            );
            return Ok(format!(
                "You need {required} access for `/emoji {}`.",
                envelope.verb
            ));
        }

        match command {
            EmojiCommand::List { limit } => self.service.list_emojis(limit).await,
            EmojiCommand::Search { text, limit, filters } => {
                self.service.search_emojis(&text, limit, &filters).await
            }
            EmojiCommand::Add(new) => self.service.add_emoji(new).await,
            EmojiCommand::Update(update) => self.service.update_emoji(update).await,
            EmojiCommand::Delete { code } => self.service.delete_emoji(&code).await,
            EmojiCommand::Vectorize { dry_run } => self.service.vectorize(dry_run).await,
            EmojiCommand::Permission(PermissionCommand::Grant { user_id, username, level }) => {
                self.service.grant_permission(&user_id, &username, level).await
            }
            EmojiCommand::Permission(PermissionCommand::Revoke { user_id }) => {
                self.service.revoke_permission(&user_id).await
            }
            EmojiCommand::Permission(PermissionCommand::List) => {
                self.service.list_permissions().await
            }
            EmojiCommand::Help => Ok(help_message()),
            EmojiCommand::Unknown { verb } => {
                Ok(format!("Unsupported command `/emoji {verb}`. Try `/emoji help`."))
            }
        }
    }
}

/// Catalog-backed command service. Expected failures (duplicates, missing
/// rows, bad input) become conversational replies; only infrastructure
/// failures surface as routing errors.
pub struct CatalogCommandService {
    store: Arc<dyn EmojiStore>,
    ranker: Arc<SimilarityRanker>,
    permissions: Arc<PermissionChecker>,
    pipeline: Option<Arc<BatchEmbeddingPipeline>>,
    catalog_cache: Option<Arc<EmojiCatalogCache>>,
}

impl CatalogCommandService {
    pub fn new(
        store: Arc<dyn EmojiStore>,
        ranker: Arc<SimilarityRanker>,
        permissions: Arc<PermissionChecker>,
    ) -> Self {
        Self { store, ranker, permissions, pipeline: None, catalog_cache: None }
    }

    pub fn with_pipeline(mut self, pipeline: Arc<BatchEmbeddingPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Code lookups read through this cache, and successful update/delete
    /// invalidate the touched code.
    pub fn with_catalog_cache(mut self, cache: Arc<EmojiCatalogCache>) -> Self {
        self.catalog_cache = Some(cache);
        self
    }

    async fn lookup(&self, code: &str) -> Result<Option<EmojiRecord>, StoreError> {
        match &self.catalog_cache {
            Some(cache) => cache.get_by_code(code).await,
            None => self.store.get_by_code(code).await,
        }
    }

    async fn invalidate(&self, code: &str) {
        if let Some(cache) = &self.catalog_cache {
            cache.invalidate(code).await;
        }
    }
}

#[async_trait]
impl EmojiCommandService for CatalogCommandService {
    async fn list_emojis(&self, limit: usize) -> Result<String, CommandRouteError> {
        let total = self.store.count().await.map_err(service_error)?;
        let records = self.store.get_all(limit, 0).await.map_err(service_error)?;
        if records.is_empty() {
            return Ok("The emoji catalog is empty.".to_owned());
        }

        let mut lines = vec![format!("*{total} emojis in the catalog* (showing {})", records.len())];
        for record in records {
            let vectorized = if record.embedding.is_some() { "" } else { " _(no vector)_" };
            lines.push(format!("• `{}` — {}{}", record.code, record.description, vectorized));
        }
        Ok(lines.join("\n"))
    }

    async fn search_emojis(
        &self,
        text: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<String, CommandRouteError> {
        let candidates = match self.ranker.find_similar_by_text(text, limit, filters).await {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(error = %error, "slash command search failed");
                return Ok("Search is unavailable right now. Please try again shortly.".to_owned());
            }
        };

        if candidates.is_empty() {
            return Ok(format!("No emojis matched `{text}`."));
        }

        let mut lines = vec![format!("*Closest emojis for* `{text}`:")];
        for candidate in candidates {
            lines.push(format!(
                "• `{}` — {} ({:.2})",
                candidate.record.code, candidate.record.description, candidate.similarity_score
            ));
        }
        Ok(lines.join("\n"))
    }

    async fn add_emoji(&self, new: NewEmoji) -> Result<String, CommandRouteError> {
        let mut record = match EmojiRecord::new(&new.code, &new.description) {
            Ok(record) => record,
            Err(error) => return Ok(format!("Cannot add `{}`: {error}", new.code)),
        };
        if let Some(category) = new.category {
            record = record.with_category(category);
        }
        if let Some(tone) = new.emotion_tone {
            record = record.with_emotion_tone(tone);
        }
        if let Some(scene) = new.usage_scene {
            record = record.with_usage_scene(scene);
        }
        if let Some(priority) = new.priority {
            record = match record.with_priority(priority) {
                Ok(record) => record,
                Err(error) => return Ok(format!("Cannot add `{}`: {error}", new.code)),
            };
        }

        match self.store.insert(record).await {
            Ok(inserted) => Ok(format!(
                "Added `{}`. Run `/emoji vectorize` to make it searchable.",
                inserted.code
            )),
            Err(StoreError::DuplicateCode(code)) => Ok(format!("`{code}` already exists.")),
            Err(StoreError::Validation(error)) => Ok(format!("Cannot add emoji: {error}")),
            Err(error) => Err(service_error(error)),
        }
    }

    async fn update_emoji(&self, update: EmojiUpdate) -> Result<String, CommandRouteError> {
        let Some(mut record) = self.lookup(&update.code).await.map_err(service_error)? else {
            return Ok(format!("No emoji `{}` in the catalog.", update.code));
        };

        if let Some(description) = update.description {
            if description != record.description {
                record.description = description;
                // The stored vector described the old text.
                record.embedding = None;
            }
        }
        if let Some(category) = update.category {
            record.category = Some(category);
        }
        if let Some(tone) = update.emotion_tone {
            record.emotion_tone = Some(tone);
        }
        if let Some(scene) = update.usage_scene {
            record.usage_scene = Some(scene);
        }
        if let Some(priority) = update.priority {
            record.priority = priority;
        }

        match self.store.update(&record).await {
            Ok(updated) => {
                self.invalidate(&updated.code).await;
                let hint = if updated.embedding.is_none() {
                    " Run `/emoji vectorize` to refresh its vector."
                } else {
                    ""
                };
                Ok(format!("Updated `{}`.{hint}", updated.code))
            }
            Err(StoreError::Validation(error)) => Ok(format!("Cannot update emoji: {error}")),
            Err(StoreError::NotFound(code)) => Ok(format!("No emoji `{code}` in the catalog.")),
            Err(error) => Err(service_error(error)),
        }
    }

    async fn delete_emoji(&self, code: &str) -> Result<String, CommandRouteError> {
        let Some(record) = self.lookup(code).await.map_err(service_error)? else {
            return Ok(format!("No emoji `{code}` in the catalog."));
        };
        let Some(id) = record.id else {
            return Ok(format!("No emoji `{code}` in the catalog."));
        };

        if self.store.delete(id).await.map_err(service_error)? {
            self.invalidate(code).await;
            Ok(format!("Deleted `{code}`."))
        } else {
            Ok(format!("No emoji `{code}` in the catalog."))
        }
    }

    async fn vectorize(&self, dry_run: bool) -> Result<String, CommandRouteError> {
        let Some(pipeline) = &self.pipeline else {
            return Ok("Vectorization is not configured on this deployment.".to_owned());
        };

        let options = VectorizeOptions { dry_run, ..VectorizeOptions::default() };
        let outcome = pipeline
            .vectorize_all(&options, |_, _, _| {})
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;

        Ok(match outcome {
            VectorizeOutcome::DryRun { would_process, skipped, filtered_out: _, total } => format!(
                "Dry run: {would_process} of {total} records would be embedded ({skipped} skipped)."
            ),
            VectorizeOutcome::Completed(report) => format!(
                "Vectorized {} of {} records ({} skipped).",
                report.processed, report.total, report.skipped
            ),
        })
    }

    async fn grant_permission(
        &self,
        user_id: &str,
        username: &str,
        level: Permission,
    ) -> Result<String, CommandRouteError> {
        match self.permissions.grant(user_id, username, level).await {
            Ok(user) => Ok(format!("Granted {level} to <@{}>.", user.user_id)),
            Err(StoreError::Validation(error)) => Ok(format!("Cannot grant permission: {error}")),
            Err(error) => Err(service_error(error)),
        }
    }

    async fn revoke_permission(&self, user_id: &str) -> Result<String, CommandRouteError> {
        if self.permissions.revoke(user_id).await.map_err(service_error)? {
            Ok(format!("Revoked stored permissions for <@{user_id}>; they are a viewer now."))
        } else {
            Ok(format!("<@{user_id}> had no stored permissions."))
        }
    }

    async fn list_permissions(&self) -> Result<String, CommandRouteError> {
        let users = self.permissions.list().await.map_err(service_error)?;
        if users.is_empty() {
            return Ok("No stored permissions; everyone is a viewer.".to_owned());
        }

        let mut lines = vec!["*Stored permissions*".to_owned()];
        for user in users {
            lines.push(format!("• <@{}> ({}): {}", user.user_id, user.username, user.permission));
        }
        Ok(lines.join("\n"))
    }
}

fn service_error(error: StoreError) -> CommandRouteError {
    CommandRouteError::Service(error.to_string())
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: EmojiCommandService,
{
    pub fn new(service: S, permissions: Arc<PermissionChecker>) -> Self {
        Self { router: CommandRouter::new(service, permissions) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: EmojiCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_emoji_command(payload.clone())?;
        let reply = self.router.route(normalized).await?;
        Ok(HandlerResult::Responded(reply))
    }
}
