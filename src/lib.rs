use thiserror::Error;

use crate::twitch::agent::TwitchAgentError;

pub mod config;
pub mod handlers;
pub mod server;
pub mod twitch;

#[derive(Error, Debug)]
pub enum ShoutoutError {
    #[error("parsing failure :< {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("request failed :< {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("twitch answered {endpoint} with status {status} :<")]
    Upstream { endpoint: String, status: u16 },

    #[error("missing credentials :< {0} wasn't provided")]
    MissingCredentials(String),

    #[error("error loading config :< {0}, {1}")]
    LoadConfig(String, anyhow::Error),

    #[error("vibe rule `{0}` is invalid :< {1}")]
    InvalidVibeRule(String, String),

    #[error("something went wrong :< {0}")]
    Other(String),
}

impl From<TwitchAgentError> for ShoutoutError {
    fn from(e: TwitchAgentError) -> Self {
        match e {
            TwitchAgentError::ReqwestError(e) => Self::RequestError(e),
            TwitchAgentError::Status { endpoint, status } => Self::Upstream {
                endpoint,
                status: status.as_u16(),
            },
            TwitchAgentError::MalformedBody(e) => Self::ParseError(e),
        }
    }
}

impl From<anyhow::Error> for ShoutoutError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
