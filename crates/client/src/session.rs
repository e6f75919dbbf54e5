//! Signed-in identity management.
//!
//! The session keeps the bearer token and the active nickname in the
//! durable store so a later process can pick them up again. Credentials
//! are validated locally before anything is sent.

use tidemark_core::validation;

use crate::api::{AuthGrant, ChecklistApi, User};
use crate::error::ClientError;
use crate::store::KeyValueStore;
use crate::sync::Identity;

/// Store key of the bearer token.
pub const AUTH_TOKEN_KEY: &str = "tidemark_auth_token";
/// Store key of the active nickname (signed-in or legacy).
pub const NICKNAME_KEY: &str = "checklist_nickname";

pub struct AuthSession<S> {
    api: ChecklistApi,
    store: S,
    nickname: Option<String>,
    token: Option<String>,
    user: Option<User>,
}

impl<S: KeyValueStore> AuthSession<S> {
    /// Load the stored nickname and token. The token is not checked against
    /// the backend until [`resume`](Self::resume) is called.
    pub fn load(api: ChecklistApi, store: S) -> Result<Self, ClientError> {
        let nickname = store.get(NICKNAME_KEY)?.filter(|n| !n.trim().is_empty());
        let token = store.get(AUTH_TOKEN_KEY)?.filter(|t| !t.is_empty());
        Ok(Self {
            api,
            store,
            nickname,
            token,
            user: None,
        })
    }

    pub fn api(&self) -> &ChecklistApi {
        &self.api
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// The account confirmed by the last login/register/resume.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Identity progress is recorded under, if any nickname is active.
    pub fn identity(&self) -> Option<Identity> {
        self.nickname.as_ref().map(|nickname| Identity {
            nickname: nickname.clone(),
            token: self.token.clone(),
        })
    }

    pub async fn login(&mut self, nickname: &str, password: &str) -> Result<User, ClientError> {
        let nickname = validation::validate_login(nickname, password)?;
        let grant = self.api.login(&nickname, password).await?;
        self.accept(grant)
    }

    pub async fn register(
        &mut self,
        nickname: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, ClientError> {
        let nickname = validation::validate_new_credentials(nickname, password, confirmation)?;
        let grant = self.api.register(&nickname, password).await?;
        self.accept(grant)
    }

    /// Attach a password to a legacy nickname-only account.
    pub async fn set_password(
        &mut self,
        nickname: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, ClientError> {
        let nickname = validation::validate_new_credentials(nickname, password, confirmation)?;
        let grant = self.api.set_password(&nickname, password).await?;
        self.accept(grant)
    }

    /// Re-validate a stored token.
    ///
    /// Returns `Ok(None)` when there is no token, or when the backend no
    /// longer accepts it (the token is then discarded). Transport errors
    /// keep the token and are returned.
    pub async fn resume(&mut self) -> Result<Option<User>, ClientError> {
        let Some(token) = self.token.clone() else {
            return Ok(None);
        };
        match self.api.me(&token).await {
            Ok(user) => {
                self.set_nickname(&user.nickname)?;
                self.user = Some(user.clone());
                Ok(Some(user))
            }
            Err(ClientError::Unauthorized(_) | ClientError::Rejected { .. }) => {
                tracing::info!("Stored token rejected, discarding");
                self.token = None;
                self.user = None;
                self.store.remove(AUTH_TOKEN_KEY)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Switch to the legacy nickname-only identity. Any token is dropped.
    pub fn use_nickname(&mut self, nickname: &str) -> Result<Identity, ClientError> {
        let nickname = validation::validate_legacy_nickname(nickname)?;
        self.token = None;
        self.user = None;
        self.store.remove(AUTH_TOKEN_KEY)?;
        self.set_nickname(&nickname)?;
        Ok(Identity::legacy(nickname))
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.token = None;
        self.user = None;
        self.nickname = None;
        self.store.remove(AUTH_TOKEN_KEY)?;
        self.store.remove(NICKNAME_KEY)?;
        tracing::info!("Signed out");
        Ok(())
    }

    fn accept(&mut self, grant: AuthGrant) -> Result<User, ClientError> {
        self.store.set(AUTH_TOKEN_KEY, &grant.token)?;
        self.token = Some(grant.token);
        self.set_nickname(&grant.user.nickname)?;
        tracing::info!(user_id = grant.user.id, nickname = %grant.user.nickname, "Signed in");
        self.user = Some(grant.user.clone());
        Ok(grant.user)
    }

    fn set_nickname(&mut self, nickname: &str) -> Result<(), ClientError> {
        self.store.set(NICKNAME_KEY, nickname)?;
        self.nickname = Some(nickname.to_string());
        Ok(())
    }
}
