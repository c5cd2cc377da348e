// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Scripted stand-ins for the backend and the router.

use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use reqwest::{Method, Request, Response};
use serde_json::{json, Value};
use tokio::sync::Barrier;
use url::Url;

use crate::{
    api,
    error::{Error, Result},
    session::{Destination, Navigator},
    storage::{self, Storage as _},
    transport::Transport,
};

pub(crate) fn endpoints() -> api::Endpoints {
    api::Endpoints::new(&Url::parse("http://library.test").unwrap()).unwrap()
}

pub(crate) fn reply(status: u16, body: &Value) -> http::Response<String> {
    http::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(body.to_string())
        .unwrap()
}

pub(crate) fn auth_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "data": {"userId": "u1", "name": "Ana", "email": "a@b.com", "role": "user"},
        "tokens": {
            "accessToken": access_token,
            "refreshToken": refresh_token,
            "accessTokenExpiresIn": "15m",
            "refreshTokenExpiresIn": "7d"
        }
    })
}

pub(crate) fn connection_refused() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
}

pub(crate) async fn is_empty(storage: &storage::Memory) -> bool {
    let mut storage = storage.clone();
    for key in ["access_token", "refresh_token", "user"] {
        if storage.get(key).await.unwrap().is_some() {
            return false;
        }
    }
    true
}

/// What the backend saw of one request.
#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) authorization: Option<String>,
    pub(crate) body: Option<Value>,
}

impl Recorded {
    fn new(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            authorization: request
                .headers()
                .get(reqwest::header::AUTHORIZATION)
                .map(|value| value.to_str().unwrap().to_owned()),
            body: request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .map(|bytes| serde_json::from_slice(bytes).unwrap()),
        }
    }

    pub(crate) fn path(&self) -> &str {
        self.url.path()
    }

    pub(crate) fn bearer(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

type Handler = Box<dyn Fn(&Recorded) -> Result<http::Response<String>> + Send + Sync>;
type Gate = Box<dyn Fn(&Recorded) -> bool + Send + Sync>;

/// A backend answering from a closure, optionally holding back matching
/// requests until a given number of them have arrived.
pub(crate) struct Backend {
    handler: Handler,
    gate: Option<(Gate, Arc<Barrier>)>,
    requests: Mutex<Vec<Recorded>>,
    refreshes: AtomicUsize,
}

impl Backend {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> Result<http::Response<String>> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            gate: None,
            requests: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_gate<G>(mut self, parties: usize, gate: G) -> Self
    where
        G: Fn(&Recorded) -> bool + Send + Sync + 'static,
    {
        self.gate = Some((Box::new(gate), Arc::new(Barrier::new(parties))));
        self
    }

    /// The barrier held requests wait on, for tests that take part in it.
    pub(crate) fn gate(&self) -> Option<Arc<Barrier>> {
        self.gate.as_ref().map(|(_, barrier)| Arc::clone(barrier))
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for Backend {
    async fn execute(&self, request: Request) -> Result<Response> {
        let recorded = Recorded::new(&request);
        self.requests.lock().unwrap().push(recorded.clone());

        if recorded.path() == "/api/auth/refresh" {
            let _previous = self.refreshes.fetch_add(1, Ordering::SeqCst);
            // Let every other waiting task run before the exchange completes.
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
        }

        if let Some((ref gate, ref barrier)) = self.gate {
            if gate(&recorded) {
                let _leader = barrier.wait().await;
            }
        }

        (self.handler)(&recorded).map(Response::from)
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    visited: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub(crate) fn visited(&self) -> Vec<Destination> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: Destination) {
        self.visited.lock().unwrap().push(destination);
    }
}
