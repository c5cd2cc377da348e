// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::Local;
use clap::Subcommand;
use log::error;

use crate::error::{Error, Result};

/// Borrow and return books.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List your loans.
    List,

    /// Borrow a book for a week.
    Borrow {
        /// The ID of the book to borrow.
        #[clap()]
        book: String,
    },

    /// Return a borrowed book.
    Return {
        /// The ID of the loan.
        #[clap()]
        id: String,
    },
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: &super::Context) -> Result<()> {
        let _user = context.require_session()?;
        let today = Local::now().date_naive();

        match self {
            Self::List => super::print_table(context.catalog.my_loans().await?),
            Self::Borrow { book } => {
                let book = context.catalog.book(&book).await?;
                if !book.is_available() {
                    error!("No copies of {} are available right now", book.title);
                    return Err(Error::Command);
                }

                let user_id = context.manager.user_id().await.ok_or(Error::NotAuthenticated)?;
                let loan = context.catalog.borrow(&user_id, &book.id, today).await?;
                println!("Borrowed {}; it is due {}", book.title, loan.due_date);
            }
            Self::Return { id } => {
                let _loan = context.catalog.return_loan(&id, today).await?;
                println!("Returned loan {id}");
            }
        }
        Ok(())
    }
}
