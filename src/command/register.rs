// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::{error::Result, password};

/// Create an account and sign in to it.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The name to show for the account.
    #[clap()]
    name: String,

    /// The email address to sign in with.
    #[clap()]
    email: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        let password = context
            .password(
                password::RequestBuilder::new(&format!("Choose a password for {}.", self.email))
                    .with_confirmation(),
            )
            .await?;

        let session = context
            .manager
            .register(&self.name, &self.email, &password)
            .await?;
        if let Some(user) = session.current_user() {
            println!("Registered and signed in as {} ({})", user.name(), user.role());
        }
        Ok(())
    }
}
