use std::{
    error::Error,
    fmt::Display,
};

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};

use super::{
    tokens::{ClientCredentialsGrant, TokenCache},
    ClientCredentials,
};
use crate::config::TwitchConfig;

/// Everything the shoutout handler needs to know about a streamer, as answered by the
/// platform.
#[async_trait]
pub trait StreamerDirectory: Send + Sync {
    /// `Ok(None)` when no user has this login.
    async fn find_user(&self, login: &str) -> Result<Option<TwitchUser>, TwitchAgentError>;

    async fn get_channel_info(
        &self,
        broadcaster_id: &str,
    ) -> Result<Option<ChannelInfo>, TwitchAgentError>;

    /// `Ok(None)` when the user is offline.
    async fn get_live_stream(&self, user_id: &str)
        -> Result<Option<LiveStream>, TwitchAgentError>;

    async fn get_recent_video_titles(
        &self,
        user_id: &str,
        limit: u8,
    ) -> Result<Vec<String>, TwitchAgentError>;

    async fn get_recent_clip_titles(
        &self,
        broadcaster_id: &str,
        limit: u8,
    ) -> Result<Vec<String>, TwitchAgentError>;
}

/// Talks to the helix api as the app itself, with a cached app access token.
pub struct TwitchAgent {
    client: reqwest::Client,
    client_id: String,
    api_url: String,
    tokens: TokenCache,
}

impl TwitchAgent {
    pub fn new(credentials: ClientCredentials, config: &TwitchConfig) -> Self {
        let client = reqwest::Client::new();
        let client_id = credentials.client_id.clone();
        let tokens = TokenCache::new(ClientCredentialsGrant::new(
            client.clone(),
            &config.token_url,
            credentials,
        ));
        Self::with_tokens(client, client_id, &config.api_url, tokens)
    }

    pub fn with_tokens(
        client: reqwest::Client,
        client_id: String,
        api_url: &str,
        tokens: TokenCache,
    ) -> Self {
        Self {
            client,
            client_id,
            api_url: api_url.trim_end_matches('/').to_owned(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// GET a helix endpoint and unwrap the `data` envelope.
    async fn helix<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, TwitchAgentError> {
        let token = self.tokens.acquire_token().await?;

        debug!("helix: GET {endpoint} {query:?}");
        let response = self
            .client
            .get(format!("{}/{endpoint}", self.api_url))
            .query(query)
            .header("Client-Id", &self.client_id)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TwitchAgentError::Status {
                endpoint: endpoint.to_owned(),
                status,
            });
        }

        let envelope: HelixResponse<T> = serde_json::from_str(&response.text().await?)
            .map_err(TwitchAgentError::MalformedBody)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl StreamerDirectory for TwitchAgent {
    async fn find_user(&self, login: &str) -> Result<Option<TwitchUser>, TwitchAgentError> {
        Ok(self
            .helix("users", &[("login", login)])
            .await?
            .into_iter()
            .next())
    }

    async fn get_channel_info(
        &self,
        broadcaster_id: &str,
    ) -> Result<Option<ChannelInfo>, TwitchAgentError> {
        Ok(self
            .helix("channels", &[("broadcaster_id", broadcaster_id)])
            .await?
            .into_iter()
            .next())
    }

    async fn get_live_stream(
        &self,
        user_id: &str,
    ) -> Result<Option<LiveStream>, TwitchAgentError> {
        let streams: Vec<LiveStream> = self.helix("streams", &[("user_id", user_id)]).await?;
        // helix reports an empty `type` when a stream errored out
        Ok(streams.into_iter().find(|s| s.kind == "live"))
    }

    async fn get_recent_video_titles(
        &self,
        user_id: &str,
        limit: u8,
    ) -> Result<Vec<String>, TwitchAgentError> {
        let first = limit.to_string();
        let videos: Vec<Titled> = self
            .helix(
                "videos",
                &[("user_id", user_id), ("type", "archive"), ("first", first.as_str())],
            )
            .await?;
        Ok(titles(videos, limit))
    }

    async fn get_recent_clip_titles(
        &self,
        broadcaster_id: &str,
        limit: u8,
    ) -> Result<Vec<String>, TwitchAgentError> {
        let first = limit.to_string();
        let clips: Vec<Titled> = self
            .helix(
                "clips",
                &[("broadcaster_id", broadcaster_id), ("first", first.as_str())],
            )
            .await?;
        Ok(titles(clips, limit))
    }
}

fn titles(items: Vec<Titled>, limit: u8) -> Vec<String> {
    items
        .into_iter()
        .map(|t| t.title)
        .take(limit as usize)
        .collect()
}

#[derive(Debug, Deserialize)]
struct HelixResponse<T> {
    data: Vec<T>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TwitchUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChannelInfo {
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LiveStream {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct Titled {
    title: String,
}

#[derive(Debug)]
pub enum TwitchAgentError {
    ReqwestError(reqwest::Error),
    Status {
        endpoint: String,
        status: StatusCode,
    },
    MalformedBody(serde_json::Error),
}

impl From<reqwest::Error> for TwitchAgentError {
    fn from(e: reqwest::Error) -> Self {
        Self::ReqwestError(e)
    }
}

impl Display for TwitchAgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TwitchAgentError::ReqwestError(e) => write!(f, "twitch agent request error: {e}"),
            TwitchAgentError::Status { endpoint, status } => {
                write!(f, "twitch answered {endpoint} with {status}")
            }
            TwitchAgentError::MalformedBody(e) => {
                write!(f, "couldn't make sense of twitch's answer: {e}")
            }
        }
    }
}

impl Error for TwitchAgentError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_without_description_parses() {
        let body = r#"{"data":[{"id":"1","login":"cozygamer","display_name":"CozyGamer"}]}"#;
        let parsed: HelixResponse<TwitchUser> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].display_name, "CozyGamer");
        assert_eq!(parsed.data[0].description, "");
    }

    #[test]
    fn stream_type_maps_to_kind() {
        let body = r#"{"data":[{"type":"live","game_name":"Celeste","title":"any%"}],"pagination":{}}"#;
        let parsed: HelixResponse<LiveStream> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].kind, "live");
    }

    #[test]
    fn titles_respect_the_limit() {
        let items = (0..5)
            .map(|i| Titled {
                title: format!("video {i}"),
            })
            .collect();
        assert_eq!(titles(items, 3), vec!["video 0", "video 1", "video 2"]);
    }
}
