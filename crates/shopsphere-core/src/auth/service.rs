//! Login state machine over `SessionState::status`.
//!
//! `Idle | Failed | Success --login--> Pending --ok--> Success`
//! `Pending --error | timeout--> Failed`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::credentials::{Credentials, RegistrationForm};
use super::error::LoginError;
use crate::api::{ApiError, ApiGateway};
use crate::notify::{NotificationCenter, Severity};
use crate::session::{AuthStatus, SessionState, SessionStore, Transition};

/// Default bound on a single login request.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Message shown after a successful login
const LOGIN_SUCCESS_MESSAGE: &str = "Login successful";

/// The backend calls the authentication service depends on.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for an access token.
    async fn authenticate(&self, credentials: &Credentials) -> Result<String, ApiError>;

    /// Create an account, returning the server's confirmation message.
    async fn register(&self, form: &RegistrationForm) -> Result<String, ApiError>;
}

#[async_trait]
impl Authenticator for ApiGateway {
    async fn authenticate(&self, credentials: &Credentials) -> Result<String, ApiError> {
        ApiGateway::authenticate(self, credentials).await
    }

    async fn register(&self, form: &RegistrationForm) -> Result<String, ApiError> {
        ApiGateway::register(self, form).await
    }
}

/// Drives login attempts and records their outcome in the [`SessionStore`].
///
/// At most one attempt is in flight at a time. Outcomes are returned to the
/// caller as typed results; alerts are raised as a side channel only.
pub struct AuthenticationService {
    store: Arc<SessionStore>,
    notifications: NotificationCenter,
    authenticator: Arc<dyn Authenticator>,
    login_timeout: Duration,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the attempt ends. If the login future is
/// dropped before it resolves, the attempt is recorded as failed so the
/// session does not stay `Pending`.
struct AttemptGuard<'a> {
    service: &'a AuthenticationService,
    resolved: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            warn!("Login attempt abandoned before completion");
            self.service.store.dispatch(Transition::AuthFailed {
                reason: "login attempt abandoned".to_string(),
            });
        }
        self.service.in_flight.store(false, Ordering::Release);
    }
}

impl AuthenticationService {
    pub fn new(
        store: Arc<SessionStore>,
        notifications: NotificationCenter,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            store,
            notifications,
            authenticator,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Attempt to log in.
    ///
    /// Fails with [`LoginError::InProgress`] before touching the network or
    /// the store when an attempt is already pending. No retries are made.
    pub async fn login(&self, credentials: Credentials) -> Result<SessionState, LoginError> {
        if self.store.state().status == AuthStatus::Pending
            || self
                .in_flight
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            debug!("Rejecting login while another attempt is pending");
            return Err(LoginError::InProgress);
        }
        let mut guard = AttemptGuard {
            service: self,
            resolved: false,
        };

        self.store.dispatch(Transition::AuthPending);
        info!(email = %credentials.email, "Authenticating");

        let outcome = match tokio::time::timeout(
            self.login_timeout,
            self.authenticator.authenticate(&credentials),
        )
        .await
        {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(e)) => Err(LoginError::Api(e)),
            Err(_) => Err(LoginError::TimedOut(self.login_timeout)),
        };
        drop(credentials);

        let result = match outcome {
            Ok(token) => {
                let state = self.store.dispatch(Transition::AuthSucceeded {
                    token,
                    profile: None,
                });
                if state.status == AuthStatus::Success {
                    info!("Login successful");
                    self.notifications.notify(LOGIN_SUCCESS_MESSAGE, Severity::Success);
                } else {
                    // The session was invalidated while the request was in flight.
                    debug!(status = %state.status, "Discarding superseded login result");
                }
                Ok(state)
            }
            Err(e) => {
                let reason = e.user_message();
                warn!(error = %e, "Login failed");
                self.store.dispatch(Transition::AuthFailed {
                    reason: reason.clone(),
                });
                self.notifications.notify(reason, Severity::Error);
                Err(e)
            }
        };

        guard.resolved = true;
        result
    }

    /// Create an account. Leaves the session untouched.
    pub async fn register(&self, form: RegistrationForm) -> Result<String, ApiError> {
        match self.authenticator.register(&form).await {
            Ok(message) => {
                info!(email = %form.email, "Account created");
                self.notifications.notify(message.clone(), Severity::Success);
                Ok(message)
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.notifications.notify(e.user_message(), Severity::Error);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Alert;
    use crate::session::Profile;
    use crate::test_support::{unreachable_base_url, StubResponse, StubServer};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Clone)]
    enum Outcome {
        Token(&'static str),
        Rejected(u16, &'static str),
        Hang,
    }

    struct FakeAuthenticator {
        calls: AtomicUsize,
        outcome: Mutex<Outcome>,
        gate: Option<Notify>,
    }

    impl FakeAuthenticator {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Mutex::new(outcome),
                gate: None,
            })
        }

        fn gated(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Mutex::new(outcome),
                gate: Some(Notify::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuthenticator {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let outcome = self.outcome.lock().unwrap().clone();
            match outcome {
                Outcome::Token(token) => Ok(token.to_string()),
                Outcome::Rejected(status, message) => Err(ApiError::from_status(
                    StatusCode::from_u16(status).unwrap(),
                    &json!({ "message": message }).to_string(),
                )),
                Outcome::Hang => std::future::pending().await,
            }
        }

        async fn register(&self, form: &RegistrationForm) -> Result<String, ApiError> {
            if form.email.contains('@') {
                Ok("user created successfully".to_string())
            } else {
                Err(ApiError::from_status(
                    StatusCode::BAD_REQUEST,
                    r#"{"message":"email not valid"}"#,
                ))
            }
        }
    }

    fn setup(authenticator: Arc<dyn Authenticator>) -> (Arc<AuthenticationService>, Arc<SessionStore>, NotificationCenter) {
        let store = Arc::new(SessionStore::in_memory());
        let notifications = NotificationCenter::new();
        let service = Arc::new(AuthenticationService::new(
            Arc::clone(&store),
            notifications.clone(),
            authenticator,
        ));
        (service, store, notifications)
    }

    fn credentials() -> Credentials {
        Credentials::new("a@b.com", "x")
    }

    fn only_alert(notifications: &NotificationCenter) -> Alert {
        let alerts = notifications.list();
        assert_eq!(alerts.len(), 1, "expected exactly one alert: {alerts:?}");
        alerts.into_iter().next().unwrap()
    }

    async fn wait_for_pending(store: &SessionStore) {
        while store.state().status != AuthStatus::Pending {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_login_success() {
        let fake = FakeAuthenticator::new(Outcome::Token("T1"));
        let (service, store, notifications) = setup(fake.clone());

        let state = service.login(credentials()).await.unwrap();
        assert_eq!(state.token, "T1");
        assert_eq!(state.status, AuthStatus::Success);
        assert_eq!(store.state(), state);
        assert_eq!(only_alert(&notifications).severity, Severity::Success);
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_login_rejected_keeps_token_empty() {
        let fake = FakeAuthenticator::new(Outcome::Rejected(401, "bad credentials"));
        let (service, store, notifications) = setup(fake);

        let err = service.login(credentials()).await.unwrap_err();
        assert!(err.is_rejected());

        let state = store.state();
        assert_eq!(state.token, "");
        assert_eq!(state.status, AuthStatus::Failed);

        let alert = only_alert(&notifications);
        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(alert.message, "bad credentials");
    }

    #[tokio::test]
    async fn test_failed_reauth_keeps_previous_session() {
        let fake = FakeAuthenticator::new(Outcome::Token("T1"));
        let (service, store, _notifications) = setup(fake.clone());
        service.login(credentials()).await.unwrap();
        store.dispatch(Transition::ProfileLoaded(Profile {
            email: "a@b.com".to_string(),
            ..Profile::default()
        }));

        *fake.outcome.lock().unwrap() = Outcome::Rejected(401, "bad credentials");
        service.login(credentials()).await.unwrap_err();

        let state = store.state();
        assert_eq!(state.status, AuthStatus::Failed);
        assert_eq!(state.token, "T1");
        assert!(state.profile.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_logins_are_single_flight() {
        let fake = FakeAuthenticator::gated(Outcome::Token("T1"));
        let (service, store, _notifications) = setup(fake.clone());

        let transitions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&transitions);
        let _sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let first = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.login(credentials()).await }
        });
        wait_for_pending(&store).await;

        for _ in 0..3 {
            let err = service.login(credentials()).await.unwrap_err();
            assert!(matches!(err, LoginError::InProgress));
        }
        assert_eq!(fake.calls(), 1);
        assert_eq!(transitions.load(Ordering::SeqCst), 1);

        fake.release();
        let state = first.await.unwrap().unwrap();
        assert_eq!(state.token, "T1");
        assert_eq!(fake.calls(), 1);
        assert_eq!(transitions.load(Ordering::SeqCst), 2);

        // Once resolved, a new attempt may start.
        fake.release();
        service.login(credentials()).await.unwrap();
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_during_login_drops_outcome() {
        let fake = FakeAuthenticator::gated(Outcome::Token("T1"));
        let (service, store, _notifications) = setup(fake.clone());

        let first = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.login(credentials()).await }
        });
        wait_for_pending(&store).await;

        store.dispatch(Transition::Invalidate);
        assert!(matches!(
            service.login(credentials()).await,
            Err(LoginError::InProgress)
        ));

        fake.release();
        first.await.unwrap().unwrap();
        assert_eq!(store.state(), SessionState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_timeout_releases_pending() {
        let fake = FakeAuthenticator::new(Outcome::Hang);
        let (service, store, notifications) = setup(fake.clone());

        let err = service.login(credentials()).await.unwrap_err();
        assert!(matches!(err, LoginError::TimedOut(d) if d == DEFAULT_LOGIN_TIMEOUT));
        assert_eq!(store.state().status, AuthStatus::Failed);
        assert_eq!(only_alert(&notifications).severity, Severity::Error);

        *fake.outcome.lock().unwrap() = Outcome::Token("T2");
        let state = service.login(credentials()).await.unwrap();
        assert_eq!(state.token, "T2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_login_is_recorded_as_failed() {
        let fake = FakeAuthenticator::new(Outcome::Hang);
        let (service, store, _notifications) = setup(fake);

        let attempt = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.login(credentials()).await }
        });
        wait_for_pending(&store).await;
        attempt.abort();
        let _ = attempt.await;

        assert_eq!(store.state().status, AuthStatus::Failed);
        assert!(!service.in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_register_raises_alerts() {
        let fake = FakeAuthenticator::new(Outcome::Token("T1"));
        let (service, store, notifications) = setup(fake);

        let message = service
            .register(RegistrationForm::new("a@b.com", "Ada", "Lovelace", "pw"))
            .await
            .unwrap();
        assert_eq!(message, "user created successfully");

        let err = service
            .register(RegistrationForm::new("nope", "Ada", "Lovelace", "pw"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "email not valid");

        let severities: Vec<Severity> = notifications.list().iter().map(|a| a.severity).collect();
        assert_eq!(severities, vec![Severity::Success, Severity::Error]);
        assert_eq!(store.state(), SessionState::default());
    }

    #[tokio::test]
    async fn test_login_over_http() {
        let server = StubServer::start(|req| {
            let body: serde_json::Value = serde_json::from_str(&req.body).unwrap_or_default();
            if body["password"] == "x" {
                StubResponse::json(200, json!({"data": {"access_token": "T1"}}))
            } else {
                StubResponse::json(401, json!({"message": "bad credentials"}))
            }
        })
        .await;
        let gateway = ApiGateway::new(server.base_url(), "").unwrap();
        let (service, store, notifications) = setup(Arc::new(gateway));

        let err = service
            .login(Credentials::new("a@b.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "bad credentials");
        assert_eq!(store.state().status, AuthStatus::Failed);

        service.login(credentials()).await.unwrap();
        assert_eq!(store.state().token, "T1");
        assert_eq!(notifications.list().len(), 2);
    }

    #[tokio::test]
    async fn test_login_transport_failure() {
        let gateway = ApiGateway::new(unreachable_base_url().await, "").unwrap();
        let (service, store, notifications) = setup(Arc::new(gateway));

        let err = service.login(credentials()).await.unwrap_err();
        assert!(matches!(err, LoginError::Api(ref e) if e.is_transport()));
        assert_eq!(store.state().status, AuthStatus::Failed);
        assert_eq!(
            only_alert(&notifications).message,
            "Unable to connect to server. Check your internet connection."
        );
    }
}
