// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use secrecy::SecretString;
use tabled::{settings::Style, Table, Tabled};

use crate::{
    api::Catalog,
    error::{self, Result},
    password::{self, Prompt as _},
    session::{Manager, UserProfile},
};

pub(crate) mod authors;
pub(crate) mod books;
pub(crate) mod loans;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod refresh;
pub(crate) mod register;
pub(crate) mod whoami;

/// Everything a command may need to talk to the service.
pub(crate) struct Context {
    pub(crate) manager: Arc<Manager>,
    pub(crate) catalog: Catalog,
    pub(crate) prompt: Box<dyn password::Prompt>,
}

impl Context {
    fn require_session(&self) -> Result<UserProfile> {
        let session = self.manager.session().snapshot();
        debug!(
            "Session: authenticated {}, exchange outstanding {}",
            session.is_authenticated(),
            session.is_loading()
        );
        session.current_user().cloned().ok_or_else(|| {
            error!("You need to sign in first");
            error::Error::NotAuthenticated
        })
    }

    fn require_admin(&self) -> Result<()> {
        let _user = self.require_session()?;
        if self.manager.is_admin() {
            Ok(())
        } else {
            Err(error::Error::Forbidden)
        }
    }

    async fn password(&self, request: password::RequestBuilder) -> Result<SecretString> {
        self.prompt
            .prompt(request.into_request())
            .await?
            .ok_or_else(|| error::Password::NoPrompt.into())
    }
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, context: &Context) -> Result<()>;
}

fn print_table<T: Tabled>(rows: impl IntoIterator<Item = T>) {
    println!("{}", Table::new(rows).with(Style::rounded()));
}
