// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use log::{debug, warn};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;

use crate::{
    error::Result,
    storage::{IsPersistent as _, Storage},
};

use super::UserProfile;

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const USER_KEY: &str = "user";

#[derive(Clone)]
pub(crate) struct Credentials {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl Credentials {
    pub(crate) fn new(access_token: SecretString, refresh_token: SecretString) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    pub(crate) const fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub(crate) const fn refresh_token(&self) -> &SecretString {
        &self.refresh_token
    }
}

pub(crate) struct Stored {
    pub(crate) credentials: Credentials,
    pub(crate) profile: UserProfile,
}

/// Tokens and the cached profile, kept as three string entries of a storage
/// backend.
///
/// The entries are either all present and readable or all absent. Anything in
/// between is discarded when it is found.
pub(crate) struct CredentialStore {
    storage: Box<dyn Storage>,
}

impl CredentialStore {
    pub(super) fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    pub(super) fn is_persistent(&self) -> bool {
        self.storage.is_persistent()
    }

    pub(super) async fn save(&mut self, credentials: &Credentials, profile: &UserProfile) -> Result<()> {
        let profile = serde_json::to_string(profile)?;
        let result = self.write_all(credentials, &profile).await;
        if result.is_err() {
            self.clear().await;
        }
        result
    }

    async fn write_all(&mut self, credentials: &Credentials, profile: &str) -> Result<()> {
        self.storage
            .set(ACCESS_TOKEN_KEY, credentials.access_token().expose_secret())
            .await?;
        self.storage
            .set(REFRESH_TOKEN_KEY, credentials.refresh_token().expose_secret())
            .await?;
        self.storage.set(USER_KEY, profile).await
    }

    pub(super) async fn load(&mut self) -> Option<Stored> {
        let access_token = self.entry(ACCESS_TOKEN_KEY).await;
        let refresh_token = self.entry(REFRESH_TOKEN_KEY).await;
        let profile = self.entry(USER_KEY).await;

        match (access_token, refresh_token, profile) {
            (Ok(None), Ok(None), Ok(None)) => None,
            (Ok(Some(access_token)), Ok(Some(refresh_token)), Ok(Some(profile))) => {
                match serde_json::from_str::<UserProfile>(&profile) {
                    Ok(profile) => Some(Stored {
                        credentials: Credentials::new(
                            SecretString::new(access_token),
                            SecretString::new(refresh_token),
                        ),
                        profile,
                    }),
                    Err(e) => {
                        warn!("Discarding stored session because the cached profile is unreadable: {}", e);
                        self.clear().await;
                        None
                    }
                }
            }
            _ => {
                warn!("Discarding stored session because it is incomplete or unreadable");
                self.clear().await;
                None
            }
        }
    }

    /// Removes every entry, continuing past individual failures.
    pub(super) async fn clear(&mut self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                warn!("Failed to remove stored {}: {}", key, e);
            }
        }
    }

    pub(super) async fn access_token(&mut self) -> Option<SecretString> {
        self.token(ACCESS_TOKEN_KEY).await
    }

    pub(super) async fn refresh_token(&mut self) -> Option<SecretString> {
        self.token(REFRESH_TOKEN_KEY).await
    }

    pub(super) async fn replace_access_token(&mut self, access_token: &SecretString) -> Result<()> {
        self.storage
            .set(ACCESS_TOKEN_KEY, access_token.expose_secret())
            .await
    }

    async fn token(&mut self, key: &str) -> Option<SecretString> {
        match self.entry(key).await {
            Ok(token) => token.map(SecretString::new),
            Err(e) => {
                warn!("Failed to read stored {}: {}", key, e);
                None
            }
        }
    }

    /// Empty entries count as absent.
    async fn entry(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self
            .storage
            .get(key)
            .await?
            .filter(|value| !value.is_empty()))
    }
}

#[derive(Deserialize)]
struct Claims {
    id: Option<serde_json::Value>,
    sub: Option<serde_json::Value>,
}

/// Reads the user identifier out of a JWT payload without checking the
/// signature. The server remains the judge of whether the token is valid.
pub(crate) fn user_id_from_token(token: &SecretString) -> Option<String> {
    let payload = token.expose_secret().split('.').nth(1)?;
    let decoded = base64::decode_config(payload.trim_end_matches('='), base64::URL_SAFE_NO_PAD)
        .map_err(|e| debug!("Access token payload is not base64: {}", e))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&decoded)
        .map_err(|e| debug!("Access token payload is not a claim set: {}", e))
        .ok()?;

    match claims.id.or(claims.sub)? {
        serde_json::Value::String(id) => Some(id),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> SecretString {
    SecretString::new(format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
        base64::encode_config(claims.to_string(), base64::URL_SAFE_NO_PAD)
    ))
}
