// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use futures_util::{
    future::{BoxFuture, FutureExt as _, Shared},
    lock::Mutex,
};
use log::{debug, warn};
use reqwest::{
    header::{self, HeaderValue},
    Request, Response, StatusCode,
};
use secrecy::{ExposeSecret as _, SecretString};

use crate::{
    error::{Error, Result},
    session::Manager,
    transport::Transport,
};

type RefreshOutcome = std::result::Result<SecretString, Arc<Error>>;

/// The most recent refresh exchange and the access token it replaces.
///
/// The outcome is kept after it resolves, so a request that was refused with
/// the same token later still gets the same answer instead of starting a
/// second exchange.
struct PendingRefresh {
    replacing: Option<SecretString>,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

fn same_token(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        (None, None) => true,
        (Some(_), None) | (None, Some(_)) => false,
    }
}

fn authorize(mut request: Request, access_token: Option<&SecretString>) -> Result<Request> {
    if let Some(access_token) = access_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", access_token.expose_secret()))?;
        value.set_sensitive(true);
        let _previous = request.headers_mut().insert(header::AUTHORIZATION, value);
    }
    Ok(request)
}

/// Sends requests on behalf of the signed-in user.
///
/// Every request carries the current access token. A request refused with
/// `401 Unauthorized` renews the session once and is replayed once with the
/// new token; whatever the replay gets back is final. Requests refused at the
/// same time share a single refresh exchange.
pub(crate) struct Authorizer {
    manager: Arc<Manager>,
    transport: Arc<dyn Transport>,
    pending: Mutex<Option<PendingRefresh>>,
}

impl Authorizer {
    pub(crate) fn new(manager: Arc<Manager>) -> Self {
        Self {
            transport: manager.transport(),
            manager,
            pending: Mutex::new(None),
        }
    }

    pub(crate) async fn execute(&self, request: Request) -> Result<Response> {
        // The refresh exchange carries its own credential and must never
        // recurse into another refresh.
        if self.manager.endpoints().is_refresh(request.url()) {
            return self.transport.execute(request).await;
        }

        let replay = request.try_clone();
        let access_token = self.manager.access_token().await;
        let response = self
            .transport
            .execute(authorize(request, access_token.as_ref())?)
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(replay) = replay else {
            warn!(
                "Request to {} was refused but cannot be replayed because its body is streamed",
                response.url()
            );
            return Ok(response);
        };

        debug!(
            "{} {} was refused, so we need to renew the session",
            replay.method(),
            replay.url()
        );
        let access_token = self.renew(access_token).await?;
        self.transport
            .execute(authorize(replay, Some(&access_token))?)
            .await
    }

    /// Produces an access token to replace `stale`, running at most one
    /// refresh exchange for it.
    async fn renew(&self, stale: Option<SecretString>) -> Result<SecretString> {
        let outcome = {
            let mut pending = self.pending.lock().await;
            match *pending {
                Some(ref refresh) if same_token(refresh.replacing.as_ref(), stale.as_ref()) => {
                    debug!("Joining the refresh already started for this token");
                    refresh.outcome.clone()
                }
                _ => {
                    if let Some(current) = self.manager.access_token().await {
                        if !same_token(Some(&current), stale.as_ref()) {
                            debug!("The access token changed since the request was sent");
                            return Ok(current);
                        }
                    }

                    let manager = Arc::clone(&self.manager);
                    let outcome = async move { manager.refresh().await.map_err(Arc::new) }
                        .boxed()
                        .shared();
                    *pending = Some(PendingRefresh {
                        replacing: stale,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        outcome.await.map_err(Error::SessionExpired)
    }
}
