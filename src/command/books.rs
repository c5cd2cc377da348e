// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use clap::Subcommand;
use futures_util::future::join_all;
use log::debug;

use crate::{
    api::catalog::{Book, BookRequest},
    error::Result,
};

/// Browse and manage the book catalog.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List every book.
    List,

    /// Show a single book.
    Show {
        #[clap()]
        id: String,
    },

    /// Add a book. Requires an administrator account.
    Add {
        #[clap()]
        title: String,

        /// The ID of the book's author.
        #[arg(long)]
        author: String,

        #[arg(long)]
        year: i32,

        #[arg(long, default_value_t = 1)]
        copies: u32,

        #[arg(long, value_hint = clap::ValueHint::Url)]
        cover_url: Option<String>,
    },

    /// Change a book. Fields left out keep their current value. Requires an
    /// administrator account.
    Edit {
        #[clap()]
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        copies: Option<u32>,

        #[arg(long, value_hint = clap::ValueHint::Url)]
        cover_url: Option<String>,
    },

    /// Remove a book. Requires an administrator account.
    Remove {
        #[clap()]
        id: String,
    },
}

/// Fills in authors the listing did not embed. Lookups that fail leave the
/// author ID in place.
async fn resolve_authors(context: &super::Context, books: &mut [Book]) {
    let missing: BTreeSet<String> = books
        .iter()
        .filter(|book| book.author.is_none())
        .map(|book| book.author_id.clone())
        .collect();
    if missing.is_empty() {
        return;
    }

    let authors: HashMap<_, _> = join_all(missing.iter().map(|id| context.catalog.author(id)))
        .await
        .into_iter()
        .zip(missing.iter())
        .filter_map(|(result, id)| match result {
            Ok(author) => Some((id.clone(), author)),
            Err(e) => {
                debug!("Could not look up author {}: {}", id, e);
                None
            }
        })
        .collect();

    for book in books.iter_mut().filter(|book| book.author.is_none()) {
        book.author = authors.get(&book.author_id).cloned();
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        match self {
            Self::List => {
                let _user = context.require_session()?;
                let mut books = context.catalog.books().await?;
                resolve_authors(context, &mut books).await;
                super::print_table(books);
            }
            Self::Show { id } => {
                let _user = context.require_session()?;
                let mut book = context.catalog.book(&id).await?;
                resolve_authors(context, std::slice::from_mut(&mut book)).await;
                super::print_table([book]);
            }
            Self::Add {
                title,
                author,
                year,
                copies,
                cover_url,
            } => {
                context.require_admin()?;
                let book = context
                    .catalog
                    .create_book(&BookRequest {
                        title: &title,
                        author_id: &author,
                        publish_year: year,
                        copies,
                        cover_url: cover_url.as_deref(),
                    })
                    .await?;
                println!("Added {} ({})", book.title, book.id);
            }
            Self::Edit {
                id,
                title,
                author,
                year,
                copies,
                cover_url,
            } => {
                context.require_admin()?;
                let current = context.catalog.book(&id).await?;
                let book = context
                    .catalog
                    .update_book(
                        &id,
                        &BookRequest {
                            title: title.as_deref().unwrap_or(&current.title),
                            author_id: author.as_deref().unwrap_or(&current.author_id),
                            publish_year: year.unwrap_or(current.publish_year),
                            copies: copies.unwrap_or(current.copies),
                            cover_url: cover_url.as_deref().or(current.cover_url.as_deref()),
                        },
                    )
                    .await?;
                println!("Updated {} ({})", book.title, book.id);
            }
            Self::Remove { id } => {
                context.require_admin()?;
                context.catalog.delete_book(&id).await?;
                println!("Removed book {id}");
            }
        }
        Ok(())
    }
}
