// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    error::{Error, Result},
    password,
};

const MAX_ATTEMPTS: usize = 3;

/// Sign in with an email address and password.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The email address of the account.
    #[clap()]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        let description = format!("Enter the password for {}.", self.email);
        let mut last_error: Option<String> = None;

        for _ in 0..MAX_ATTEMPTS {
            let mut request = password::RequestBuilder::new(&description);
            if let Some(ref e) = last_error {
                request = request.with_error(e);
            }
            let password = context.password(request).await?;

            match context.manager.login(&self.email, &password).await {
                Ok(session) => {
                    if let Some(user) = session.current_user() {
                        println!("Signed in as {} ({})", user.name(), user.role());
                    }
                    if !context.manager.is_persistent().await {
                        eprintln!("Your session will not be remembered after this command exits.");
                    }
                    return Ok(());
                }
                Err(Error::Authentication(message)) => last_error = Some(message),
                Err(e) => return Err(e),
            }
        }

        let message = last_error.unwrap_or_default();
        error!("Giving up after {} attempts: {}", MAX_ATTEMPTS, message);
        Err(Error::Authentication(message))
    }
}
