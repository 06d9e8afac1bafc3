//! The session issuer: login and renewal.
//!
//! Both operations end the same way: resolve the user's permissions, encode
//! them against the latest bitmap version, sign a token, persist the session
//! row, then notify the observer. The row is written before anything is
//! returned; if the write fails the token is dropped.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{encode, Algorithm, Header};
use warrant_core::{PasswordHash, Session, SessionId, User};
use warrant_keys::KeyMaterial;
use warrant_store::Store;

use crate::claims::{BitmapClaim, SessionClaims, SessionPayload, UserClaim};
use crate::config::IssuerConfig;
use crate::error::{ErrorCode, IssuerError, Result};
use crate::events::{IssueKind, NoopObserver, SessionIssued, SessionObserver};
use crate::now_millis;
use crate::resolver::PermissionResolver;
use crate::verify::TokenVerifier;
use crate::versions::BitmapVersions;

/// Per-call options for login and renewal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginOptions {
    /// Session lifetime. `None` uses the configured default.
    pub valid_for: Option<Duration>,
}

impl LoginOptions {
    pub fn valid_for(duration: Duration) -> Self {
        Self {
            valid_for: Some(duration),
        }
    }
}

/// Issues and renews sessions.
///
/// Holds the store, key material and observer it was given; nothing is
/// global.
pub struct SessionIssuer<S: Store> {
    store: Arc<S>,
    keys: Arc<KeyMaterial>,
    resolver: PermissionResolver<S>,
    versions: BitmapVersions<S>,
    observer: Arc<dyn SessionObserver>,
    config: IssuerConfig,
}

impl<S: Store> SessionIssuer<S> {
    /// Create an issuer. Fails if `keys` has no private key to sign with.
    pub fn new(store: Arc<S>, keys: Arc<KeyMaterial>, config: IssuerConfig) -> Result<Self> {
        keys.encoding_key()?;

        Ok(Self {
            resolver: PermissionResolver::new(store.clone()),
            versions: BitmapVersions::new(store.clone(), config.max_version_attempts),
            store,
            keys,
            observer: Arc::new(NoopObserver),
            config,
        })
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PermissionResolver<S> {
        &self.resolver
    }

    pub fn versions(&self) -> &BitmapVersions<S> {
        &self.versions
    }

    /// A verifier sharing this issuer's keys and store.
    pub fn verifier(&self) -> TokenVerifier<S> {
        TokenVerifier::new(self.keys.clone(), self.versions.clone(), self.config.leeway_secs)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Authenticate and open a new session.
    pub async fn login(&self, username: &str, password: &str, options: LoginOptions) -> Result<SessionPayload> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ErrorCode::MissingUsername.into());
        }
        let password = password.trim();
        if password.is_empty() {
            return Err(ErrorCode::MissingPassword.into());
        }
        let valid_for = self.valid_for(options)?;

        let user = self.active_user(username).await?;

        let stored = PasswordHash::parse(&user.password).map_err(|e| {
            IssuerError::Integrity(format!("stored password of {:?}: {}", user.username, e))
        })?;
        if !stored.verify(password) {
            tracing::warn!(username = %user.username, "login failed");
            return Err(ErrorCode::LoginFailed.into());
        }

        self.issue(&user, valid_for, IssueKind::Login).await
    }

    /// Open a new session from an existing, unexpired one.
    ///
    /// The old session row is left untouched.
    pub async fn renew_session(&self, session_id: &str, options: LoginOptions) -> Result<SessionPayload> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ErrorCode::MissingSessionId.into());
        }
        let valid_for = self.valid_for(options)?;

        let previous = self
            .store
            .get_session(&SessionId::from(session_id))
            .await?
            .ok_or_else(|| {
                tracing::warn!(session_id, "renewal of unknown session");
                IssuerError::rejected(ErrorCode::UnknownSession)
            })?;

        if previous.is_expired(now_millis()) {
            tracing::warn!(session_id, username = %previous.username, "renewal of expired session");
            return Err(ErrorCode::SessionExpired.into());
        }

        let user = self.active_user(&previous.username).await?;
        self.issue(
            &user,
            valid_for,
            IssueKind::Renewal {
                previous: previous.id.0,
            },
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn valid_for(&self, options: LoginOptions) -> Result<Duration> {
        let valid_for = options.valid_for.unwrap_or(self.config.default_valid_for);
        if valid_for.as_secs() == 0 {
            return Err(ErrorCode::InvalidValidFor.into());
        }
        Ok(valid_for)
    }

    async fn active_user(&self, username: &str) -> Result<User> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username, "unknown user");
                IssuerError::rejected(ErrorCode::UnknownUser)
            })?;

        if !user.active {
            tracing::warn!(username, "login suspended");
            return Err(ErrorCode::LoginSuspended.into());
        }
        Ok(user)
    }

    async fn issue(&self, user: &User, valid_for: Duration, kind: IssueKind) -> Result<SessionPayload> {
        let permissions = self.resolver.resolve(user.id).await?;
        let bitmap = self.versions.ensure_latest().await?;
        let bits = bitmap.encode(&permissions);

        let valid_ms = i64::try_from(valid_for.as_millis())
            .map_err(|_| IssuerError::rejected(ErrorCode::InvalidValidFor))?;
        let session = Session::issue(user.username.clone(), now_millis(), valid_ms);

        let claims = SessionClaims {
            sess: session.id.to_string(),
            iat: session.issued_at / 1000,
            exp: session.expires_at / 1000,
            usr: UserClaim {
                id: user.id,
                name: user.username.clone(),
            },
            pbm: BitmapClaim {
                vers: bitmap.version.clone(),
                bits,
            },
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, self.keys.encoding_key()?)
            .map_err(IssuerError::Signing)?;

        self.store.insert_session(&session).await?;

        let payload = SessionPayload {
            id: session.id.to_string(),
            token,
            secret: session.secret,
            expires_in: valid_for.as_secs(),
            issued_at: session.issued_at,
            username: user.username.clone(),
            permissions,
        };

        tracing::info!(
            kind = kind.as_str(),
            session_id = %payload.id,
            username = %payload.username,
            version = %bitmap.version,
            "session issued"
        );

        self.observer
            .on_session_issued(&SessionIssued {
                kind,
                payload: payload.clone(),
            })
            .await;

        Ok(payload)
    }
}
