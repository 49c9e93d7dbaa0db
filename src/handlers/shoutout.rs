pub mod compose;
pub mod phrases;
pub mod vibes;

use std::sync::Arc;

use log::{debug, warn};

use self::compose::{ChannelState, MediaTitles, ProfileSummary, ShoutoutComposer};
use crate::{
    twitch::agent::{StreamerDirectory, TwitchAgentError},
    ShoutoutError,
};

/// What a shoutout request ends up as. Both are normal answers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShoutoutOutcome {
    Found(String),
    NotFound(String),
}

impl ShoutoutOutcome {
    pub fn into_message(self) -> String {
        match self {
            ShoutoutOutcome::Found(message) => message,
            ShoutoutOutcome::NotFound(login) => format!("❌ Couldn't find @{login}"),
        }
    }
}

pub struct ShoutoutHandler {
    directory: Arc<dyn StreamerDirectory>,
    composer: ShoutoutComposer,
}

impl ShoutoutHandler {
    pub fn new(directory: Arc<dyn StreamerDirectory>, composer: ShoutoutComposer) -> Self {
        Self {
            directory,
            composer,
        }
    }

    /// Looks the user up and writes their shoutout.
    ///
    /// The user and channel lookups are required; recent videos, clips and the live stream are
    /// nice to have, so if any of those fail the message is written without them.
    pub async fn shoutout(&self, username: &str) -> Result<ShoutoutOutcome, ShoutoutError> {
        let login = normalize_username(username);
        if !is_valid_login(&login) {
            let echoed: String = login.chars().take(MAX_LOGIN_LEN).collect();
            debug!("{echoed:?} can't be a twitch login, not looking it up");
            return Ok(ShoutoutOutcome::NotFound(echoed));
        }

        let Some(user) = self.directory.find_user(&login).await? else {
            debug!("no twitch user named {login}");
            return Ok(ShoutoutOutcome::NotFound(login));
        };

        let limit = self.composer.config().media_limit;
        let (channel, stream, videos, clips) = tokio::join!(
            self.directory.get_channel_info(&user.id),
            self.directory.get_live_stream(&user.id),
            self.directory.get_recent_video_titles(&user.id, limit),
            self.directory.get_recent_clip_titles(&user.id, limit),
        );
        let channel = channel?;
        let stream = optional("live status", &login, stream);
        let media = MediaTitles {
            videos: optional("recent videos", &login, videos),
            clips: optional("recent clips", &login, clips),
        };

        let state = match stream {
            Some(stream) => ChannelState {
                game: non_blank(stream.game_name)
                    .or_else(|| channel.and_then(|c| non_blank(c.game_name))),
                is_live: true,
                live_title: non_blank(stream.title),
            },
            None => ChannelState {
                game: channel.and_then(|c| non_blank(c.game_name)),
                is_live: false,
                live_title: None,
            },
        };

        let profile = ProfileSummary {
            display_name: user.display_name,
            login: user.login,
            id: user.id,
            about: user.description.trim().to_owned(),
        };

        Ok(ShoutoutOutcome::Found(
            self.composer.compose(&profile, &state, &media),
        ))
    }
}

/// Trims, drops any leading `@`s and lower-cases.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

const MAX_LOGIN_LEN: usize = 25;

/// Twitch logins are 1 to 25 characters of `a-z`, `0-9` and `_`.
pub fn is_valid_login(login: &str) -> bool {
    (1..=MAX_LOGIN_LEN).contains(&login.len())
        && login
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn optional<T: Default>(what: &str, login: &str, result: Result<T, TwitchAgentError>) -> T {
    result.unwrap_or_else(|e| {
        warn!("couldn't get {what} for {login}, going without: {e}");
        T::default()
    })
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
