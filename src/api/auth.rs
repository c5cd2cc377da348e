// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::session::{credentials::Credentials, Role, UserProfile};

// LINT: serde hands `serialize_with` a reference to the borrowed field.
#[allow(clippy::trivially_copy_pass_by_ref)]
fn expose<S: Serializer>(secret: &&SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub(crate) email: &'a str,
    #[serde(serialize_with = "expose")]
    pub(crate) password: &'a SecretString,
}

#[derive(Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) email: &'a str,
    #[serde(serialize_with = "expose")]
    pub(crate) password: &'a SecretString,
    pub(crate) role: Role,
}

#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    #[serde(serialize_with = "expose")]
    pub(crate) refresh_token: &'a SecretString,
}

#[derive(Deserialize)]
pub(crate) struct RefreshResponse {
    pub(crate) access_token: SecretString,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    user_id: String,
    name: String,
    email: String,
    role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tokens {
    access_token: SecretString,
    refresh_token: SecretString,
}

/// Body of a successful login or registration.
#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    data: Account,
    tokens: Tokens,
}

impl AuthResponse {
    pub(crate) fn into_parts(self) -> (Credentials, UserProfile) {
        (
            Credentials::new(self.tokens.access_token, self.tokens.refresh_token),
            UserProfile::new(
                self.data.user_id,
                self.data.name,
                self.data.email,
                self.data.role,
            ),
        )
    }
}
