// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod authorizer;
mod command;
mod error;
mod metadata;
mod password;
mod session;
mod storage;
#[cfg(test)]
mod testing;
mod transport;

use std::{path::PathBuf, process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{debug, error, warn};
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Register(command::register::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
    Refresh(command::refresh::Command),
    #[command(subcommand)]
    Books(command::books::Command),
    #[command(subcommand)]
    Authors(command::authors::Command),
    #[command(subcommand)]
    Loans(command::loans::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, context: &command::Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(context).await,
            Self::Register(cmd) => cmd.execute(context).await,
            Self::Logout(cmd) => cmd.execute(context).await,
            Self::Whoami(cmd) => cmd.execute(context).await,
            Self::Refresh(cmd) => cmd.execute(context).await,
            Self::Books(cmd) => cmd.execute(context).await,
            Self::Authors(cmd) => cmd.execute(context).await,
            Self::Loans(cmd) => cmd.execute(context).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the library service. Its API is expected under
    /// `/api/`.
    #[arg(long, env = "LIBRIS_URL", default_value = "http://127.0.0.1:3000", value_parser = Url::parse)]
    url: Url,

    /// Keep the session in memory only, so it ends when this command exits.
    #[arg(long)]
    no_persist_session: bool,

    /// The path to the Pinentry program to use when asking for a password.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage> {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        if let Some(file_storage) = storage::File::new("session.json") {
            return Box::new(file_storage);
        }
        warn!("No data directory is available, so the session will not be remembered");
    }

    Box::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let endpoints = api::Endpoints::new(&args.url)?;
    debug!("Using the API at {}", endpoints.resolve("")?);

    let transport = reqwest::Client::builder()
        .user_agent(format!(
            "{}/{}",
            *metadata::CLIENT_TYPE_ID,
            env!("CARGO_PKG_VERSION")
        ))
        .build()?;
    let manager = Arc::new(
        session::Manager::new(
            endpoints.clone(),
            Arc::new(transport),
            Arc::new(session::Unrouted),
            get_session_storage(&args).await,
        )
        .await,
    );
    let authorizer = Arc::new(authorizer::Authorizer::new(Arc::clone(&manager)));

    let context = command::Context {
        manager,
        catalog: api::Catalog::new(authorizer, endpoints),
        prompt: Box::new(prompt),
    };
    command::Command::execute(args.command, &context).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("LIBRIS_LOG", "warn")
        .write_style("LIBRIS_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
