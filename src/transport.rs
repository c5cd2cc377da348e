// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use reqwest::{
    header::{self, HeaderValue},
    Method, Request, Response,
};
use serde::Serialize;
use url::Url;

use crate::error::Result;

/// Sends one HTTP request to the backend and hands back whatever it answered,
/// including non-success statuses.
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: Request) -> Result<Response> {
        Ok(reqwest::Client::execute(self, request).await?)
    }
}

/// Builds a request with a buffered JSON body, so that it can be cloned for a
/// replay.
pub(crate) fn json_request<T: Serialize + ?Sized>(
    method: Method,
    url: Url,
    body: &T,
) -> Result<Request> {
    let mut request = Request::new(method, url);
    let _previous = request.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    *request.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(request)
}
