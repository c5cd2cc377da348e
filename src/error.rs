// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result, sync::Arc};

use reqwest::{header::InvalidHeaderValue, StatusCode};
use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not build authorization header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Authentication(String),
    #[error("token refresh failed: {0}")]
    Refresh(#[from] Refresh),
    #[error("session could not be renewed: {0}")]
    SessionExpired(Arc<Error>),
    #[error("server responded with {status}{}", .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("you are not signed in")]
    NotAuthenticated,
    #[error("this operation requires an administrator account")]
    Forbidden,
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Refresh {
    #[error("no refresh token is stored")]
    MissingToken,
    #[error("refresh endpoint rejected the exchange with {0}")]
    Rejected(StatusCode),
    #[error("session changed while the exchange was in flight")]
    Superseded,
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no data directory is available on this platform")]
    NoProjectDirs,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("the passwords entered do not match")]
    Mismatch,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}
