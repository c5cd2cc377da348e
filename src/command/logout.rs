// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

/// Forget the stored session.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        if !context.manager.session().is_authenticated() {
            eprintln!("You were not signed in.");
        }
        context.manager.logout().await;
        Ok(())
    }
}
