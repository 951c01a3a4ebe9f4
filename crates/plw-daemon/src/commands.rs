//! Chat command transport: long-polls Telegram for bot commands and drives
//! the engine with them.

use std::sync::Arc;
use std::time::Duration;

use plw_catalog::MembershipFetcher;
use plw_runtime::{TrackerEngine, TrackerError, TrackingStatus};
use plw_schemas::{PlaylistId, SubscriberKey};
use tracing::{debug, info, warn};

use crate::format;
use crate::telegram::{TelegramClient, TelegramError, Update};

/// Pause after a failed getUpdates before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/setplaylist [reference]`; `None` when the argument is missing.
    SetPlaylist(Option<String>),
    Status,
    ForceCheck,
    Stop,
}

/// Parse a message text into a command. Non-commands and unknown commands
/// yield `None`. A `@botname` suffix on the command word is ignored.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head);

    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "setplaylist" => Some(Command::SetPlaylist(parts.next().map(str::to_string))),
        "status" => Some(Command::Status),
        "forcecheck" => Some(Command::ForceCheck),
        "stop" => Some(Command::Stop),
        _ => None,
    }
}

/// Executes chat commands for one platform.
pub struct CommandHandler {
    engine: Arc<TrackerEngine>,
    catalog: Arc<dyn MembershipFetcher>,
    client: Arc<TelegramClient>,
    platform: String,
    check_interval: Duration,
}

impl CommandHandler {
    pub fn new(
        engine: Arc<TrackerEngine>,
        catalog: Arc<dyn MembershipFetcher>,
        client: Arc<TelegramClient>,
        platform: impl Into<String>,
        check_interval: Duration,
    ) -> Self {
        Self {
            engine,
            catalog,
            client,
            platform: platform.into(),
            check_interval,
        }
    }

    fn subscriber(&self, chat_id: i64) -> SubscriberKey {
        SubscriberKey::new(self.platform.clone(), chat_id)
    }

    pub async fn handle(&self, chat_id: i64, command: Command) -> Result<(), TelegramError> {
        debug!(chat_id, ?command, "chat command");
        match command {
            Command::Start => {
                self.client.send_message(chat_id, &format::welcome()).await?;
            }
            Command::Help => {
                self.client
                    .send_message(chat_id, &format::help(self.check_interval))
                    .await?;
            }
            Command::SetPlaylist(reference) => self.set_playlist(chat_id, reference).await?,
            Command::Status => self.status(chat_id).await?,
            Command::ForceCheck => self.force_check(chat_id).await?,
            Command::Stop => {
                // Stopping with nothing tracked still confirms.
                let reply = match self.engine.stop_tracking(&self.subscriber(chat_id)).await {
                    Ok(_) => format::stopped(),
                    Err(e) => {
                        warn!(chat_id, error = %e, "stop_tracking failed");
                        format::error_line(&e)
                    }
                };
                self.client.send_message(chat_id, &reply).await?;
            }
        }
        Ok(())
    }

    async fn set_playlist(
        &self,
        chat_id: i64,
        reference: Option<String>,
    ) -> Result<(), TelegramError> {
        let Some(reference) = reference else {
            self.client
                .send_message(chat_id, &format::missing_playlist_argument())
                .await?;
            return Ok(());
        };
        if PlaylistId::parse(&reference).is_err() {
            self.client
                .send_message(chat_id, &format::invalid_reference())
                .await?;
            return Ok(());
        }

        let progress = self
            .client
            .send_message(chat_id, &format::setting_up())
            .await?;

        let reply = match self
            .engine
            .set_tracking(&self.subscriber(chat_id), &reference)
            .await
        {
            Ok(started) => {
                info!(chat_id, playlist_id = %started.playlist.playlist_id, "tracking set from chat");
                format::tracking_started(&started, self.check_interval)
            }
            Err(TrackerError::NotFound(_)) => format::playlist_not_found(),
            Err(TrackerError::InvalidReference(_)) => format::invalid_reference(),
            Err(e) => {
                warn!(chat_id, error = %e, "set_tracking failed");
                format::error_line(&e)
            }
        };
        self.client
            .edit_message_text(chat_id, progress, &reply)
            .await
    }

    async fn status(&self, chat_id: i64) -> Result<(), TelegramError> {
        let reply = match self.engine.get_status(&self.subscriber(chat_id)).await {
            Ok(TrackingStatus::NotTracking) => format::no_playlist(),
            Ok(TrackingStatus::Tracking {
                playlist_id,
                track_count,
            }) => {
                let lookup = tokio::time::timeout(
                    self.engine.settings().fetch_timeout,
                    self.catalog.fetch_playlist_info(&playlist_id),
                )
                .await;
                match lookup {
                    Ok(Ok(info)) => format::status(
                        &playlist_id,
                        Some(&info.name),
                        info.external_url.as_deref(),
                        track_count,
                        self.check_interval,
                    ),
                    _ => format::status(&playlist_id, None, None, track_count, self.check_interval),
                }
            }
            Err(e) => format::error_line(&e),
        };
        self.client.send_message(chat_id, &reply).await?;
        Ok(())
    }

    async fn force_check(&self, chat_id: i64) -> Result<(), TelegramError> {
        let progress = self
            .client
            .send_message(chat_id, &format::checking())
            .await?;
        let reply = match self.engine.check_now(&self.subscriber(chat_id)).await {
            Ok(Some(_)) => format::check_complete(),
            Ok(None) => format::no_playlist(),
            Err(e) => format::error_line(&e),
        };
        self.client
            .edit_message_text(chat_id, progress, &reply)
            .await
    }
}

/// First update id not yet seen, after a batch.
pub fn next_offset(current: Option<i64>, updates: &[Update]) -> Option<i64> {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .max(current)
}

/// Spawn the getUpdates loop. Each recognised command runs in its own task so
/// one slow `/setplaylist` does not hold up other chats.
pub fn spawn_command_loop(
    handler: Arc<CommandHandler>,
    client: Arc<TelegramClient>,
    poll_timeout: Duration,
) {
    tokio::spawn(async move {
        let mut offset: Option<i64> = None;
        info!("chat command loop started");
        loop {
            let updates = match client.get_updates(offset, poll_timeout).await {
                Ok(u) => u,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed");
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                    continue;
                }
            };
            offset = next_offset(offset, &updates);

            for update in updates {
                let Some(message) = update.message else {
                    continue;
                };
                let Some(command) = message.text.as_deref().and_then(parse_command) else {
                    continue;
                };
                let chat_id = message.chat.id;
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    if let Err(e) = handler.handle(chat_id, command).await {
                        warn!(chat_id, error = %e, "command reply failed");
                    }
                });
            }
        }
    });
}
