// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Subcommand;

use crate::{api::catalog::AuthorRequest, error::Result};

/// Browse and manage authors.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List every author.
    List,

    /// Show a single author.
    Show {
        #[clap()]
        id: String,
    },

    /// Add an author. Requires an administrator account.
    Add {
        #[clap()]
        name: String,

        #[arg(long, default_value = "")]
        bio: String,
    },

    /// Change an author. Requires an administrator account.
    Edit {
        #[clap()]
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        bio: Option<String>,
    },

    /// Remove an author. Requires an administrator account.
    Remove {
        #[clap()]
        id: String,
    },
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        match self {
            Self::List => {
                let _user = context.require_session()?;
                super::print_table(context.catalog.authors().await?);
            }
            Self::Show { id } => {
                let _user = context.require_session()?;
                super::print_table([context.catalog.author(&id).await?]);
            }
            Self::Add { name, bio } => {
                context.require_admin()?;
                let author = context
                    .catalog
                    .create_author(&AuthorRequest {
                        name: &name,
                        bio: &bio,
                    })
                    .await?;
                println!("Added {} ({})", author.name, author.id);
            }
            Self::Edit { id, name, bio } => {
                context.require_admin()?;
                let current = context.catalog.author(&id).await?;
                let author = context
                    .catalog
                    .update_author(
                        &id,
                        &AuthorRequest {
                            name: name.as_deref().unwrap_or(&current.name),
                            bio: bio
                                .as_deref()
                                .or(current.bio.as_deref())
                                .unwrap_or_default(),
                        },
                    )
                    .await?;
                println!("Updated {} ({})", author.name, author.id);
            }
            Self::Remove { id } => {
                context.require_admin()?;
                context.catalog.delete_author(&id).await?;
                println!("Removed author {id}");
            }
        }
        Ok(())
    }
}
