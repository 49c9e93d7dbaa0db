use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{agent::TwitchAgentError, ClientCredentials};

/// An app access token and the instant it stops being usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// `expires_at` is always `now + expires_in` of the issuing response.
    pub fn issued_at(issued: IssuedToken, now: DateTime<Utc>) -> Self {
        let lifetime = i64::try_from(issued.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            token: issued.access_token,
            expires_at: now
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// The body twitch answers a client-credentials grant with.
#[derive(Clone, Debug, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self) -> Result<IssuedToken, TwitchAgentError>;
}

/// Issues app access tokens with the OAuth client-credentials grant.
pub struct ClientCredentialsGrant {
    client: reqwest::Client,
    token_url: String,
    credentials: ClientCredentials,
}

impl ClientCredentialsGrant {
    pub fn new(client: reqwest::Client, token_url: &str, credentials: ClientCredentials) -> Self {
        Self {
            client,
            token_url: token_url.to_owned(),
            credentials,
        }
    }
}

#[async_trait]
impl TokenIssuer for ClientCredentialsGrant {
    async fn issue_token(&self) -> Result<IssuedToken, TwitchAgentError> {
        #[derive(Serialize)]
        struct OauthPostBody<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            grant_type: &'a str,
        }
        let body = OauthPostBody {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            grant_type: "client_credentials",
        };

        let response = self.client.post(&self.token_url).form(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TwitchAgentError::Status {
                endpoint: "oauth2/token".to_owned(),
                status,
            });
        }

        serde_json::from_str(&response.text().await?).map_err(TwitchAgentError::MalformedBody)
    }
}

/// Single-slot cache for the app access token.
///
/// The slot is only locked to read or replace it, never while a grant is in flight, so two
/// callers that both see an expired token will both refresh and the last one to finish wins.
/// Any valid token works for every request, so that's fine.
pub struct TokenCache {
    issuer: Box<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<Credential>>,
}

impl TokenCache {
    pub fn new(issuer: impl TokenIssuer + 'static) -> Self {
        Self::with_clock(issuer, Arc::new(SystemClock))
    }

    pub fn with_clock(issuer: impl TokenIssuer + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: Box::new(issuer),
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached token while it's still valid, otherwise issues and caches a new one.
    /// A failed grant leaves the slot as it was.
    pub async fn acquire_token(&self) -> Result<String, TwitchAgentError> {
        let now = self.clock.now();
        if let Some(credential) = self.slot.lock().await.as_ref() {
            if credential.is_valid_at(now) {
                debug!("reusing cached app token");
                return Ok(credential.token.clone());
            }
        }

        debug!("app token missing or expired, requesting a new one");
        let issued = self.issuer.issue_token().await?;
        let credential = Credential::issued_at(issued, self.clock.now());
        let token = credential.token.clone();
        *self.slot.lock().await = Some(credential);

        Ok(token)
    }

    /// What's in the slot right now, expired or not.
    pub async fn cached(&self) -> Option<Credential> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Mutex as StdMutex,
        },
    };

    use chrono::TimeZone;
    use tokio::sync::Semaphore;

    use super::*;

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn starting_at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(t)))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Hands out `token-1`, `token-2`, ... and counts the grants. A gated grant waits for a
    /// permit before answering.
    #[derive(Clone)]
    struct CountingIssuer {
        calls: Arc<AtomicUsize>,
        expires_in: u64,
        fail: Arc<AtomicBool>,
        gates: Arc<StdMutex<HashMap<usize, Arc<Semaphore>>>>,
    }

    impl CountingIssuer {
        fn new(expires_in: u64) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                expires_in,
                fail: Arc::new(AtomicBool::new(false)),
                gates: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Holds grant number `n` until the returned semaphore gets a permit.
        fn gate(&self, n: usize) -> Arc<Semaphore> {
            let gate = Arc::new(Semaphore::new(0));
            self.gates.lock().unwrap().insert(n, gate.clone());
            gate
        }
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue_token(&self) -> Result<IssuedToken, TwitchAgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let gate = self.gates.lock().unwrap().get(&n).cloned();
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(TwitchAgentError::Status {
                    endpoint: "oauth2/token".to_owned(),
                    status: reqwest::StatusCode::BAD_REQUEST,
                });
            }
            Ok(IssuedToken {
                access_token: format!("token-{n}"),
                expires_in: self.expires_in,
            })
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn reuses_token_before_expiry() {
        let issuer = CountingIssuer::new(3600);
        let clock = ManualClock::starting_at(start());
        let cache = TokenCache::with_clock(issuer.clone(), clock.clone());

        assert_eq!(cache.acquire_token().await.unwrap(), "token-1");
        clock.advance(Duration::seconds(3599));
        assert_eq!(cache.acquire_token().await.unwrap(), "token-1");
        assert_eq!(issuer.calls(), 1);
    }

    #[tokio::test]
    async fn refreshes_exactly_once_after_expiry() {
        let issuer = CountingIssuer::new(60);
        let clock = ManualClock::starting_at(start());
        let cache = TokenCache::with_clock(issuer.clone(), clock.clone());

        cache.acquire_token().await.unwrap();
        clock.advance(Duration::seconds(60));
        assert_eq!(cache.acquire_token().await.unwrap(), "token-2");
        assert_eq!(cache.acquire_token().await.unwrap(), "token-2");
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn expiry_is_issue_time_plus_lifetime() {
        let issuer = CountingIssuer::new(5000);
        let clock = ManualClock::starting_at(start());
        let cache = TokenCache::with_clock(issuer, clock);

        cache.acquire_token().await.unwrap();
        let cached = cache.cached().await.unwrap();
        assert_eq!(cached.expires_at, start() + Duration::seconds(5000));
    }

    #[tokio::test]
    async fn failed_grant_propagates_and_keeps_slot() {
        let issuer = CountingIssuer::new(10);
        let clock = ManualClock::starting_at(start());
        let cache = TokenCache::with_clock(issuer.clone(), clock.clone());
        cache.acquire_token().await.unwrap();

        clock.advance(Duration::seconds(10));
        issuer.fail.store(true, Ordering::SeqCst);
        assert!(cache.acquire_token().await.is_err());
        assert_eq!(cache.cached().await.unwrap().token, "token-1");
        assert_eq!(issuer.calls(), 2);
    }

    #[tokio::test]
    async fn first_grant_failure_leaves_slot_empty() {
        let issuer = CountingIssuer::new(10);
        issuer.fail.store(true, Ordering::SeqCst);
        let cache = TokenCache::with_clock(issuer, ManualClock::starting_at(start()));

        assert!(cache.acquire_token().await.is_err());
        assert!(cache.cached().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_refreshes_both_grant_and_last_write_wins() {
        let issuer = CountingIssuer::new(60);
        let clock = ManualClock::starting_at(start());
        let cache = Arc::new(TokenCache::with_clock(issuer.clone(), clock.clone()));
        cache.acquire_token().await.unwrap();
        clock.advance(Duration::seconds(60));

        let second = issuer.gate(2);
        let third = issuer.gate(3);
        let refresh = |cache: Arc<TokenCache>| {
            tokio::spawn(async move { cache.acquire_token().await })
        };
        let a = refresh(cache.clone());
        let b = refresh(cache.clone());

        // both callers saw the expired slot and are waiting on their grants
        while issuer.calls() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.cached().await.unwrap().token, "token-1");

        third.add_permits(1);
        while cache.cached().await.unwrap().token != "token-3" {
            tokio::task::yield_now().await;
        }
        second.add_permits(1);

        let mut tokens = vec![a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        tokens.sort();
        assert_eq!(tokens, vec!["token-2", "token-3"]);
        assert_eq!(issuer.calls(), 3);
        assert_eq!(cache.cached().await.unwrap().token, "token-2");
    }

    #[test]
    fn token_body_with_extra_fields_parses() {
        let body = r#"{"access_token":"abc","expires_in":3600,"token_type":"bearer","scope":[]}"#;
        let issued: IssuedToken = serde_json::from_str(body).unwrap();
        assert_eq!(issued.access_token, "abc");
        assert_eq!(issued.expires_in, 3600);
    }

    #[test]
    fn huge_lifetimes_saturate() {
        let credential = Credential::issued_at(
            IssuedToken {
                access_token: "t".to_owned(),
                expires_in: u64::MAX,
            },
            start(),
        );
        assert!(credential.is_valid_at(start() + Duration::days(365 * 100)));
    }
}
