use std::future::Future;
use std::sync::Arc;

use serenity::builder::{CreateMessage, EditChannel};
use serenity::http::{Http, HttpError};
use serenity::model::channel::ChannelType;
use serenity::model::id::ChannelId;

use tempo_utils::embed::status_embed;

use crate::notice::SlowmodeNotice;

/// Discord JSON error codes for "missing access" and "missing permissions".
const MISSING_ACCESS_CODES: [isize; 2] = [50_001, 50_013];
/// Discord JSON error code for "unknown channel".
const UNKNOWN_CHANNEL_CODE: isize = 10_003;

/// The slice of remote channel state the loop cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoteChannel {
    pub slowmode_seconds: u16,
    /// Plain guild text channel. Other kinds are left alone.
    pub is_text: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RemoteError {
    /// The platform refused the read or write.
    #[display("missing permissions")]
    Forbidden,
    /// The channel no longer exists.
    #[display("unknown channel")]
    NotFound,
    /// Network trouble, rate limits, server errors, timeouts.
    #[display("transient failure: {message}")]
    Transient { message: String },
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }
}

/// Map an HTTP status and Discord JSON error code to the permanent error
/// kinds. `None` means the failure is transient.
fn classify(status: u16, code: isize) -> Option<RemoteError> {
    match (status, code) {
        (403, _) => Some(RemoteError::Forbidden),
        (404, _) => Some(RemoteError::NotFound),
        (_, code) if MISSING_ACCESS_CODES.contains(&code) => Some(RemoteError::Forbidden),
        (_, UNKNOWN_CHANNEL_CODE) => Some(RemoteError::NotFound),
        _ => None,
    }
}

impl From<serenity::Error> for RemoteError {
    fn from(source: serenity::Error) -> Self {
        if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &source
            && let Some(kind) = classify(response.status_code.as_u16(), response.error.code)
        {
            return kind;
        }

        Self::transient(source.to_string())
    }
}

fn guild_channel_state(kind: ChannelType, rate_limit_per_user: Option<u16>) -> RemoteChannel {
    RemoteChannel {
        slowmode_seconds: rate_limit_per_user.unwrap_or(0),
        is_text: kind == ChannelType::Text,
    }
}

/// Remote channel operations consumed by the reconciliation loop.
pub trait ChannelRemote: Send + Sync {
    fn fetch_channel(
        &self,
        channel_id: u64,
    ) -> impl Future<Output = Result<RemoteChannel, RemoteError>> + Send;

    fn edit_slowmode(
        &self,
        channel_id: u64,
        seconds: u16,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Best effort; callers log and drop the error.
    fn post_notice(
        &self,
        channel_id: u64,
        notice: &SlowmodeNotice,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// `ChannelRemote` over serenity's HTTP client.
#[derive(Clone)]
pub struct SerenityRemote {
    http: Arc<Http>,
}

impl SerenityRemote {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl ChannelRemote for SerenityRemote {
    async fn fetch_channel(&self, channel_id: u64) -> Result<RemoteChannel, RemoteError> {
        let channel = self.http.get_channel(ChannelId::new(channel_id)).await?;

        Ok(match channel.guild() {
            Some(guild_channel) => {
                guild_channel_state(guild_channel.kind, guild_channel.rate_limit_per_user)
            }
            None => RemoteChannel {
                slowmode_seconds: 0,
                is_text: false,
            },
        })
    }

    async fn edit_slowmode(&self, channel_id: u64, seconds: u16) -> Result<(), RemoteError> {
        ChannelId::new(channel_id)
            .edit(&self.http, EditChannel::new().rate_limit_per_user(seconds))
            .await?;

        Ok(())
    }

    async fn post_notice(&self, channel_id: u64, notice: &SlowmodeNotice) -> Result<(), RemoteError> {
        let embed = status_embed(notice.title, notice.description.clone(), notice.color);

        ChannelId::new(channel_id)
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;

        Ok(())
    }
}
