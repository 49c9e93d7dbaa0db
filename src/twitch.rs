use std::env::VarError;

use crate::ShoutoutError;

pub mod agent;
pub mod tokens;

pub const CLIENT_ID_VAR: &str = "TWITCH_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "TWITCH_CLIENT_SECRET";

/// The app's own identity with twitch, used for the client-credentials grant and as the
/// `Client-Id` header on every helix call.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads `TWITCH_CLIENT_ID` and `TWITCH_CLIENT_SECRET`. Both are required and trimmed.
    pub fn from_env() -> Result<Self, ShoutoutError> {
        Ok(Self {
            client_id: read_var(CLIENT_ID_VAR)?,
            client_secret: read_var(CLIENT_SECRET_VAR)?,
        })
    }
}

// never print the secret
impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

fn read_var(name: &str) -> Result<String, ShoutoutError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Ok(_) | Err(VarError::NotPresent) => Err(ShoutoutError::MissingCredentials(name.to_owned())),
        Err(VarError::NotUnicode(_)) => Err(ShoutoutError::MissingCredentials(format!(
            "{name} (not valid unicode)"
        ))),
    }
}
