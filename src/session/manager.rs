// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use futures_util::lock::Mutex;
use log::{debug, info, warn};
use reqwest::{Method, Request};
use secrecy::{ExposeSecret as _, SecretString};

use crate::{
    api::{self, auth},
    error::{self, Error, Result},
    storage::Storage,
    transport::{self, Transport},
};

use super::{
    credentials::{self, CredentialStore},
    state::{Reader, Session, Writer},
    Destination, Navigator, Role,
};

const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

fn unexpected<E: std::fmt::Display>(e: E) -> Error {
    warn!("Authentication exchange failed: {}", e);
    Error::Authentication(UNEXPECTED_ERROR.to_owned())
}

/// Establishes, renews and ends the session.
///
/// This is the only writer of the credential store and of the session state.
/// Both are updated under the credential lock so that no reader ever sees a
/// user without tokens or tokens without a user.
pub(crate) struct Manager {
    endpoints: api::Endpoints,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    credentials: Mutex<CredentialStore>,
    state: Writer,
}

impl Manager {
    /// Restores whatever session the storage holds. The tokens are not checked
    /// against the server; an expired one is discovered by the first request
    /// that uses it.
    pub(crate) async fn new(
        endpoints: api::Endpoints,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
        storage: Box<dyn Storage>,
    ) -> Self {
        let mut store = CredentialStore::new(storage);
        let restored = store.load().await.map(|stored| {
            debug!(
                "Restored session for {} (token subject {:?})",
                stored.profile.email(),
                credentials::user_id_from_token(stored.credentials.access_token())
            );
            stored.profile
        });

        Self {
            endpoints,
            transport,
            navigator,
            credentials: Mutex::new(store),
            state: Writer::new(restored),
        }
    }

    pub(crate) fn session(&self) -> Reader {
        self.state.subscribe()
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.state.snapshot().is_admin()
    }

    pub(crate) async fn is_persistent(&self) -> bool {
        self.credentials.lock().await.is_persistent()
    }

    pub(crate) const fn endpoints(&self) -> &api::Endpoints {
        &self.endpoints
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub(crate) async fn access_token(&self) -> Option<SecretString> {
        self.credentials.lock().await.access_token().await
    }

    /// The signed-in user's identifier as the server sees it: the claim
    /// embedded in the access token, or the cached profile's id when the token
    /// carries none.
    pub(crate) async fn user_id(&self) -> Option<String> {
        let claimed = self
            .access_token()
            .await
            .as_ref()
            .and_then(credentials::user_id_from_token);

        claimed.or_else(|| {
            self.state
                .snapshot()
                .current_user()
                .map(|user| user.id().to_owned())
        })
    }

    pub(crate) async fn login(&self, email: &str, password: &SecretString) -> Result<Session> {
        let request = transport::json_request(
            Method::POST,
            self.endpoints.login().clone(),
            &auth::LoginRequest { email, password },
        )?;
        self.establish(request).await
    }

    /// Registers a new account. The role requested is always the privileged
    /// one; the server decides whether to grant it.
    pub(crate) async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<Session> {
        let request = transport::json_request(
            Method::POST,
            self.endpoints.register().clone(),
            &auth::RegisterRequest {
                name,
                email,
                password,
                role: Role::PRIVILEGED,
            },
        )?;
        self.establish(request).await
    }

    async fn establish(&self, request: Request) -> Result<Session> {
        {
            let _loading = self.state.begin_loading();
            let (credentials, profile) = self.authenticate(request).await?.into_parts();

            let mut store = self.credentials.lock().await;
            store.save(&credentials, &profile).await?;
            info!("Signed in as {}", profile.email());
            self.state.authenticate(profile);
        }

        self.navigator.navigate(Destination::Dashboard);
        Ok(self.state.snapshot())
    }

    async fn authenticate(&self, request: Request) -> Result<auth::AuthResponse> {
        let response = self.transport.execute(request).await.map_err(unexpected)?;

        let status = response.status();
        if !status.is_success() {
            let message = api::error_message(response).await;
            debug!("Authentication rejected with {}: {:?}", status, message);
            return Err(Error::Authentication(
                message.unwrap_or_else(|| UNEXPECTED_ERROR.to_owned()),
            ));
        }

        response.json().await.map_err(unexpected)
    }

    /// Exchanges the refresh token for a new access token, which replaces the
    /// stored one. Any failure ends the session before it is returned, unless
    /// the session it was renewing has already been replaced.
    pub(crate) async fn refresh(&self) -> Result<SecretString> {
        let _loading = self.state.begin_loading();
        let stored = self.credentials.lock().await.refresh_token().await;
        let Some(refresh_token) = stored else {
            warn!("Could not renew the session because no refresh token is stored");
            self.logout().await;
            return Err(error::Refresh::MissingToken.into());
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(access_token) => Ok(access_token),
            Err(e @ Error::Refresh(error::Refresh::Superseded)) => Err(e),
            Err(e) => {
                if self.logout_if_current(&refresh_token).await {
                    warn!("Could not renew the session, so you have been signed out: {}", e);
                    Err(e)
                } else {
                    debug!("Ignoring a failed refresh of a session that has since been replaced: {}", e);
                    Err(error::Refresh::Superseded.into())
                }
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: &SecretString) -> Result<SecretString> {
        let request = transport::json_request(
            Method::POST,
            self.endpoints.refresh().clone(),
            &auth::RefreshRequest { refresh_token },
        )?;
        let response = self.transport.execute(request).await?;
        if !response.status().is_success() {
            return Err(error::Refresh::Rejected(response.status()).into());
        }
        let auth::RefreshResponse { access_token } = response.json().await?;

        let mut store = self.credentials.lock().await;
        if !Self::holds(&mut store, refresh_token).await {
            return Err(error::Refresh::Superseded.into());
        }
        store.replace_access_token(&access_token).await?;
        debug!("Replaced the access token");
        Ok(access_token)
    }

    /// Whether the store still holds the session `refresh_token` belongs to.
    async fn holds(store: &mut CredentialStore, refresh_token: &SecretString) -> bool {
        store
            .refresh_token()
            .await
            .map_or(false, |current| {
                current.expose_secret() == refresh_token.expose_secret()
            })
    }

    /// Forgets the session. Safe to call when nobody is signed in.
    pub(crate) async fn logout(&self) {
        {
            let mut store = self.credentials.lock().await;
            self.sign_out(&mut store).await;
        }

        self.navigator.navigate(Destination::Landing);
    }

    /// Forgets the session only if it is still the one `refresh_token`
    /// belongs to. Returns whether it did.
    async fn logout_if_current(&self, refresh_token: &SecretString) -> bool {
        {
            let mut store = self.credentials.lock().await;
            if !Self::holds(&mut store, refresh_token).await {
                return false;
            }
            self.sign_out(&mut store).await;
        }

        self.navigator.navigate(Destination::Landing);
        true
    }

    async fn sign_out(&self, store: &mut CredentialStore) {
        store.clear().await;
        if self.state.reset() {
            info!("Signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        session::UserProfile,
        storage,
        testing::{self, Backend, RecordingNavigator},
    };

    fn ana() -> UserProfile {
        UserProfile::new(
            "u1".to_owned(),
            "Ana".to_owned(),
            "a@b.com".to_owned(),
            Role::User,
        )
    }

    async fn manager(
        backend: &Arc<Backend>,
        storage: &storage::Memory,
    ) -> (Manager, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        let manager = Manager::new(
            testing::endpoints(),
            Arc::clone(backend) as Arc<dyn Transport>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Box::new(storage.clone()),
        )
        .await;
        (manager, navigator)
    }

    fn password() -> SecretString {
        SecretString::new("secret1".to_owned())
    }

    #[tokio::test]
    async fn login_establishes_session() {
        let backend = Arc::new(Backend::new(|req| match req.path() {
            "/api/auth/login" => Ok(testing::reply(200, &testing::auth_body("t1", "r1"))),
            _ => Ok(testing::reply(404, &json!({}))),
        }));
        let storage = storage::Memory::new();
        let (manager, navigator) = manager(&backend, &storage).await;
        let reader = manager.session();

        let session = manager.login("a@b.com", &password()).await.unwrap();

        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.current_user(), Some(&ana()));
        assert_eq!(reader.current_user(), Some(ana()));
        assert_eq!(
            manager.access_token().await.unwrap().expose_secret(),
            "t1"
        );
        assert_eq!(navigator.visited(), vec![Destination::Dashboard]);
        assert_eq!(
            backend.requests()[0].body,
            Some(json!({"email": "a@b.com", "password": "secret1"}))
        );

        let (reloaded, _) = self::manager(&backend, &storage).await;
        assert_eq!(reloaded.session().current_user(), Some(ana()));
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_message() {
        let backend = Arc::new(Backend::new(|_| {
            Ok(testing::reply(401, &json!({"message": "Invalid credentials"})))
        }));
        let storage = storage::Memory::new();
        let (manager, navigator) = manager(&backend, &storage).await;

        let err = manager.login("a@b.com", &password()).await.unwrap_err();

        assert!(matches!(err, Error::Authentication(ref m) if m == "Invalid credentials"));
        assert!(!manager.session().is_authenticated());
        assert!(!manager.session().snapshot().is_loading());
        assert!(manager.access_token().await.is_none());
        assert!(navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_without_message_is_generic() {
        let backend = Arc::new(Backend::new(|_| Ok(testing::reply(500, &json!("oops")))));
        let (manager, _) = manager(&backend, &storage::Memory::new()).await;

        let err = manager.login("a@b.com", &password()).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(ref m) if m == UNEXPECTED_ERROR));
    }

    #[tokio::test]
    async fn unreachable_server_is_generic() {
        let backend = Arc::new(Backend::new(|_| Err(testing::connection_refused())));
        let (manager, _) = manager(&backend, &storage::Memory::new()).await;

        let err = manager.login("a@b.com", &password()).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(ref m) if m == UNEXPECTED_ERROR));
        assert!(!manager.session().is_authenticated());
    }

    #[tokio::test]
    async fn register_requests_privileged_role() {
        let backend = Arc::new(Backend::new(|req| match req.path() {
            "/api/auth/register" => Ok(testing::reply(201, &testing::auth_body("t1", "r1"))),
            _ => Ok(testing::reply(404, &json!({}))),
        }));
        let (manager, navigator) = manager(&backend, &storage::Memory::new()).await;

        let session = manager
            .register("Ana", "a@b.com", &password())
            .await
            .unwrap();

        assert!(session.is_authenticated());
        assert_eq!(navigator.visited(), vec![Destination::Dashboard]);
        assert_eq!(
            backend.requests()[0].body,
            Some(json!({"name": "Ana", "email": "a@b.com", "password": "secret1", "role": "admin"}))
        );
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let backend = Arc::new(Backend::new(|_| {
            Ok(testing::reply(200, &testing::auth_body("t1", "r1")))
        }));
        let storage = storage::Memory::new();
        let (manager, navigator) = manager(&backend, &storage).await;
        let _session = manager.login("a@b.com", &password()).await.unwrap();

        manager.logout().await;
        let once = manager.session().snapshot();
        manager.logout().await;

        assert_eq!(manager.session().snapshot(), once);
        assert!(!once.is_authenticated());
        assert!(manager.access_token().await.is_none());
        assert!(testing::is_empty(&storage).await);
        assert_eq!(
            navigator.visited(),
            vec![
                Destination::Dashboard,
                Destination::Landing,
                Destination::Landing
            ]
        );
    }

    #[tokio::test]
    async fn refresh_replaces_only_the_access_token() {
        let backend = Arc::new(Backend::new(|req| match req.path() {
            "/api/auth/login" => Ok(testing::reply(200, &testing::auth_body("t1", "r1"))),
            "/api/auth/refresh" if req.body == Some(json!({"refresh_token": "r1"})) => {
                Ok(testing::reply(200, &json!({"access_token": "t2"})))
            }
            _ => Ok(testing::reply(400, &json!({}))),
        }));
        let storage = storage::Memory::new();
        let (manager, _) = manager(&backend, &storage).await;
        let _session = manager.login("a@b.com", &password()).await.unwrap();

        let token = manager.refresh().await.unwrap();

        assert_eq!(token.expose_secret(), "t2");
        assert_eq!(
            manager.access_token().await.unwrap().expose_secret(),
            "t2"
        );
        let mut store = CredentialStore::new(Box::new(storage));
        let stored = store.load().await.unwrap();
        assert_eq!(stored.credentials.refresh_token().expose_secret(), "r1");
        assert_eq!(stored.profile, ana());
        assert!(manager.session().is_authenticated());
    }

    #[tokio::test]
    async fn failed_refresh_forces_logout() {
        let backend = Arc::new(Backend::new(|req| match req.path() {
            "/api/auth/login" => Ok(testing::reply(200, &testing::auth_body("t1", "r1"))),
            _ => Ok(testing::reply(401, &json!({"message": "expired"}))),
        }));
        let storage = storage::Memory::new();
        let (manager, navigator) = manager(&backend, &storage).await;
        let _session = manager.login("a@b.com", &password()).await.unwrap();

        let err = manager.refresh().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Refresh(error::Refresh::Rejected(status)) if status.as_u16() == 401
        ));
        assert!(!manager.session().is_authenticated());
        assert_eq!(manager.session().current_user(), None);
        assert!(testing::is_empty(&storage).await);
        assert_eq!(navigator.visited().last(), Some(&Destination::Landing));
    }

    #[tokio::test]
    async fn failed_refresh_spares_a_newer_session() {
        let backend = Arc::new(
            Backend::new(|req| match req.path() {
                "/api/auth/login" if req.body == Some(json!({"email": "b@c.com", "password": "secret1"})) => {
                    Ok(testing::reply(200, &testing::auth_body("t3", "r3")))
                }
                "/api/auth/login" => Ok(testing::reply(200, &testing::auth_body("t1", "r1"))),
                _ => Ok(testing::reply(401, &json!({"message": "expired"}))),
            })
            .with_gate(2, |req| req.path() == "/api/auth/refresh"),
        );
        let storage = storage::Memory::new();
        let (manager, navigator) = manager(&backend, &storage).await;
        let _session = manager.login("a@b.com", &password()).await.unwrap();
        let gate = backend.gate().unwrap();

        let relogin = async {
            let _session = manager.login("b@c.com", &password()).await.unwrap();
            let _leader = gate.wait().await;
        };
        let (result, ()) = tokio::join!(manager.refresh(), relogin);

        assert!(matches!(
            result,
            Err(Error::Refresh(error::Refresh::Superseded))
        ));
        assert!(manager.session().is_authenticated());
        assert_eq!(
            manager.access_token().await.unwrap().expose_secret(),
            "t3"
        );
        assert!(!testing::is_empty(&storage).await);
        assert_eq!(
            navigator.visited(),
            vec![Destination::Dashboard, Destination::Dashboard]
        );
    }

    #[tokio::test]
    async fn refresh_without_session_fails_cleanly() {
        let backend = Arc::new(Backend::new(|_| Ok(testing::reply(200, &json!({})))));
        let (manager, _) = manager(&backend, &storage::Memory::new()).await;

        let err = manager.refresh().await.unwrap_err();

        assert!(matches!(err, Error::Refresh(error::Refresh::MissingToken)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn corrupt_cache_starts_signed_out() {
        let mut storage = storage::Memory::new();
        storage.set("access_token", "t1").await.unwrap();
        storage.set("user", "undefined").await.unwrap();
        let backend = Arc::new(Backend::new(|_| Ok(testing::reply(200, &json!({})))));

        let (manager, _) = manager(&backend, &storage).await;

        assert!(!manager.session().is_authenticated());
        assert!(testing::is_empty(&storage).await);
    }

    #[tokio::test]
    async fn user_id_prefers_token_claim() {
        let token = credentials::encode_test_token(&json!({"id": "u9"}));
        let body = testing::auth_body(token.expose_secret(), "r1");
        let backend = Arc::new(Backend::new(move |_| Ok(testing::reply(200, &body))));
        let (manager, _) = manager(&backend, &storage::Memory::new()).await;
        assert_eq!(manager.user_id().await, None);

        let _session = manager.login("a@b.com", &password()).await.unwrap();
        assert_eq!(manager.user_id().await.as_deref(), Some("u9"));
    }

    #[tokio::test]
    async fn user_id_falls_back_to_profile() {
        let backend = Arc::new(Backend::new(|_| {
            Ok(testing::reply(200, &testing::auth_body("t1", "r1")))
        }));
        let (manager, _) = manager(&backend, &storage::Memory::new()).await;

        let _session = manager.login("a@b.com", &password()).await.unwrap();
        assert_eq!(manager.user_id().await.as_deref(), Some("u1"));
        assert!(!manager.is_admin());
    }
}
