// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{ffi::OsString, path::Path};

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};
use tokio::task;

use crate::{
    error::{self, Result},
    metadata,
};

#[derive(Debug, Default, Clone)]
pub(crate) struct Request {
    description: Option<String>,
    error: Option<String>,
    confirm: bool,
}

pub(crate) struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub(crate) fn new(description: &str) -> Self {
        Self {
            request: Request {
                description: Some(description.to_owned()),
                ..Request::default()
            },
        }
    }

    pub(crate) fn with_error(mut self, error: &str) -> Self {
        self.request.error = Some(error.to_owned());
        self
    }

    /// Ask for the password twice, as for a new account.
    pub(crate) fn with_confirmation(mut self) -> Self {
        self.request.confirm = true;
        self
    }

    pub(crate) fn into_request(self) -> Request {
        self.request
    }
}

#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.prompt(req.clone()).await {
                return r;
            }
        }

        Ok(None)
    }
}

pub(crate) struct PinentryPrompt {
    executable: Option<OsString>,
}

impl PinentryPrompt {
    pub(crate) const fn new() -> Self {
        Self { executable: None }
    }

    pub(crate) fn new_with_executable<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: Some(executable.as_ref().as_os_str().into()),
        }
    }
}

#[async_trait]
impl Prompt for PinentryPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        fn interact<'input>(
            mut input: pinentry::PassphraseInput<'input>,
            title: &'input str,
            req: &'input Request,
        ) -> Result<SecretString> {
            _ = input.required("A password is required to continue.");
            _ = input.with_title(title);
            _ = input.with_prompt("Password");
            if let Some(ref description) = req.description {
                _ = input.with_description(description);
            }
            if req.confirm {
                _ = input.with_confirmation("Confirm password", "The passwords do not match.");
            }
            if let Some(ref e) = req.error {
                _ = input.with_error(e);
            }

            Ok(input.interact()?)
        }

        let title = format!("Password - {}", *metadata::CLIENT_DISPLAY_NAME);

        let input = self
            .executable
            .as_ref()
            .and_then(pinentry::PassphraseInput::with_binary)
            .or_else(pinentry::PassphraseInput::with_default_binary)
            .map(|input| task::spawn_blocking(move || interact(input, &title, &req)));

        Ok(match input {
            Some(fut) => Some(fut.await??),
            None => None,
        })
    }
}

pub(crate) struct RpasswordPrompt;

#[async_trait]
impl Prompt for RpasswordPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(ref description) = req.description {
            eprintln!("{description}");
        }
        if let Some(ref error) = req.error {
            eprintln!("Error: {error}");
        }

        let confirm = req.confirm;
        Ok(Some(
            task::spawn_blocking(move || -> Result<SecretString> {
                let password = SecretString::new(rpassword::prompt_password("Password: ")?);
                if confirm {
                    let again = rpassword::prompt_password("Confirm password: ")?;
                    if again != *password.expose_secret() {
                        return Err(error::Password::Mismatch.into());
                    }
                }
                Ok(password)
            })
            .await??,
        ))
    }
}
