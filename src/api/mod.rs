// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod auth;
pub(crate) mod catalog;

use log::debug;
use reqwest::Response;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

pub(crate) use catalog::Catalog;

/// Backend locations, all under `<base>/api/`.
#[derive(Clone, Debug)]
pub(crate) struct Endpoints {
    api: Url,
    login: Url,
    register: Url,
    refresh: Url,
}

impl Endpoints {
    pub(crate) fn new(base: &Url) -> Result<Self> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api = base.join("api/")?;

        Ok(Self {
            login: api.join("auth/login")?,
            register: api.join("auth/register")?,
            refresh: api.join("auth/refresh")?,
            api,
        })
    }

    pub(crate) const fn login(&self) -> &Url {
        &self.login
    }

    pub(crate) const fn register(&self) -> &Url {
        &self.register
    }

    pub(crate) const fn refresh(&self) -> &Url {
        &self.refresh
    }

    pub(crate) fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.api.join(path)?)
    }

    /// Whether the URL addresses the token refresh endpoint.
    pub(crate) fn is_refresh(&self, url: &Url) -> bool {
        url.path() == self.refresh.path()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extracts the `message` a server puts in its error payloads, if any.
pub(crate) async fn error_message(response: Response) -> Option<String> {
    let body = response
        .bytes()
        .await
        .map_err(|e| debug!("Failed to read error response: {}", e))
        .ok()?;
    serde_json::from_slice::<ErrorBody>(&body).ok()?.message
}

/// Passes successful responses through and turns anything else into
/// [`Error::Status`].
pub(crate) async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(Error::Status {
        status,
        message: error_message(response).await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_live_under_api() {
        let endpoints = Endpoints::new(&Url::parse("http://localhost:3000").unwrap()).unwrap();
        assert_eq!(
            endpoints.login().as_str(),
            "http://localhost:3000/api/auth/login"
        );
        assert_eq!(
            endpoints.resolve("books/").unwrap().as_str(),
            "http://localhost:3000/api/books/"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let endpoints =
            Endpoints::new(&Url::parse("https://example.org/library").unwrap()).unwrap();
        assert_eq!(
            endpoints.refresh().as_str(),
            "https://example.org/library/api/auth/refresh"
        );
        assert_eq!(
            endpoints.register().as_str(),
            "https://example.org/library/api/auth/register"
        );
    }

    #[test]
    fn refresh_is_recognized_by_path() {
        let endpoints = Endpoints::new(&Url::parse("http://localhost:3000/").unwrap()).unwrap();
        assert!(endpoints.is_refresh(&Url::parse("http://localhost:3000/api/auth/refresh").unwrap()));
        assert!(!endpoints.is_refresh(&Url::parse("http://localhost:3000/api/auth/login").unwrap()));
        assert!(!endpoints.is_refresh(&Url::parse("http://localhost:3000/api/books/").unwrap()));
    }
}
