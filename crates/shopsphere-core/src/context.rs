//! Wiring for the session and notification subsystem.
//!
//! A `ClientContext` is created once at startup and handed to every page.
//! It owns the single `SessionStore` and shares it with the components that
//! need it; nothing is reachable through globals.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiGateway};
use crate::auth::AuthenticationService;
use crate::config::Config;
use crate::notify::{NotificationCenter, Severity};
use crate::session::{FileStorage, PersistenceLayer, Profile, SessionStore, Storage, Transition};

/// Message shown when the server no longer accepts the session token
const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

pub struct ClientContext {
    config: Config,
    store: Arc<SessionStore>,
    notifications: NotificationCenter,
    auth: AuthenticationService,
    gateway: ApiGateway,
}

impl ClientContext {
    /// Build the context over an explicit storage backend.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Result<Self> {
        let store = Arc::new(SessionStore::open(PersistenceLayer::new(storage)));
        let notifications = NotificationCenter::with_ttl(config.alert_ttl());
        let gateway = ApiGateway::new(config.api_base_url.clone(), "")?;
        let auth = AuthenticationService::new(
            Arc::clone(&store),
            notifications.clone(),
            Arc::new(gateway.clone()),
        )
        .with_login_timeout(config.login_timeout());

        debug!(api = %config.api_base_url, "Client context ready");
        Ok(Self {
            config,
            store,
            notifications,
            auth,
            gateway,
        })
    }

    /// Build the context with the session persisted under the config's data directory.
    pub fn open(config: Config) -> Result<Self> {
        let storage = FileStorage::new(config.data_dir()?);
        Self::new(config, Arc::new(storage))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn auth(&self) -> &AuthenticationService {
        &self.auth
    }

    /// A gateway bound to the current token. Build a new one after the token changes.
    pub fn gateway(&self) -> ApiGateway {
        self.gateway.with_token(self.store.state().token)
    }

    /// Apply the caller convention for a failed call made through `gateway`:
    /// a 401 ends the session. Returns true when the session was invalidated.
    pub fn handle_api_error(&self, gateway: &ApiGateway, err: &ApiError) -> bool {
        if !err.is_unauthorized() {
            self.notifications.notify(err.user_message(), Severity::Error);
            return false;
        }
        // A 401 for a token that has since been replaced says nothing about the new one.
        if self.store.state().token != gateway.token() {
            debug!("Ignoring 401 for a superseded token");
            return false;
        }
        info!("Server rejected session token, invalidating");
        self.store.dispatch(Transition::Invalidate);
        self.notifications.notify(SESSION_EXPIRED_MESSAGE, Severity::Error);
        true
    }

    /// Fetch `GET /profile` and cache it in the session.
    pub async fn load_profile(&self) -> Result<Profile, ApiError> {
        let gateway = self.gateway();
        match gateway.fetch_profile().await {
            Ok(profile) => {
                if self.store.state().token == gateway.token() {
                    self.store.dispatch(Transition::ProfileLoaded(profile.clone()));
                } else {
                    debug!("Token changed during profile fetch, not caching");
                }
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                self.handle_api_error(&gateway, &e);
                Err(e)
            }
        }
    }

    /// End the session. Server-side revocation is attempted but never required.
    pub async fn logout(&self) {
        let gateway = self.gateway();
        if !gateway.token().is_empty() {
            if let Err(e) = gateway.revoke_token().await {
                warn!(error = %e, "Failed to revoke token on server");
            }
        }
        self.store.dispatch(Transition::Invalidate);
        self.notifications.notify("Logged out", Severity::Info);
        info!("Logged out");
    }
}
