// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::info;

use crate::error::Result;

/// Exchange the refresh token for a new access token now.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        let user = context.require_session()?;
        let _access_token = context.manager.refresh().await?;
        info!("Renewed the session for {}", user.email());
        Ok(())
    }
}
