// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Books, authors and loans. Every call goes through the [`Authorizer`], so
//! they all carry the session's credentials and survive an expired access
//! token.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use log::debug;
use reqwest::{Method, Request};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use tabled::Tabled;

use crate::{
    authorizer::Authorizer,
    error::{Error, Result},
    transport,
};

use super::{expect_success, Endpoints};

/// How long a book may be kept.
pub(crate) const LOAN_PERIOD: Days = Days::new(7);

#[derive(Deserialize)]
struct List<T> {
    data: Option<Vec<T>>,
}

/// Single records arrive either wrapped in `data` or bare, depending on the
/// endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum Item<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Item<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Tabled)]
pub(crate) struct Author {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[serde(default)]
    #[tabled(rename = "Biography", display_with("Self::biography", self))]
    pub(crate) bio: Option<String>,
}

impl Author {
    fn biography(&self) -> String {
        self.bio.clone().unwrap_or_default()
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Tabled)]
pub(crate) struct Book {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Title")]
    pub(crate) title: String,
    #[tabled(skip)]
    pub(crate) author_id: String,
    #[serde(default)]
    #[tabled(rename = "Author", display_with("Self::author_name", self))]
    pub(crate) author: Option<Author>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[tabled(rename = "Year")]
    pub(crate) publish_year: i32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[tabled(rename = "Copies")]
    pub(crate) copies: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    #[tabled(rename = "Available")]
    pub(crate) available_copies: u32,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) cover_url: Option<String>,
}

impl Book {
    fn author_name(&self) -> String {
        self.author
            .as_ref()
            .map_or_else(|| self.author_id.clone(), |author| author.name.clone())
    }

    pub(crate) const fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct LoanedBook {
    pub(crate) title: String,
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LoanStatus {
    Active,
    Returned,
    Overdue,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Tabled)]
pub(crate) struct Loan {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(skip)]
    pub(crate) book_id: String,
    #[serde(default)]
    #[tabled(rename = "Book", display_with("Self::book_title", self))]
    pub(crate) book: Option<LoanedBook>,
    #[tabled(rename = "Borrowed")]
    pub(crate) loan_date: String,
    #[tabled(rename = "Due")]
    pub(crate) due_date: String,
    #[serde(rename = "devuelto", default)]
    #[tabled(rename = "Status", display_with("Self::describe_status", self))]
    pub(crate) returned: bool,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) return_date: Option<String>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) status: Option<LoanStatus>,
}

impl Loan {
    fn book_title(&self) -> String {
        self.book
            .as_ref()
            .map_or_else(|| self.book_id.clone(), |book| book.title.clone())
    }

    /// The returned flag wins over whatever status the server computed.
    pub(crate) fn current_status(&self) -> LoanStatus {
        if self.returned {
            LoanStatus::Returned
        } else {
            self.status.unwrap_or(LoanStatus::Active)
        }
    }

    fn describe_status(&self) -> String {
        match self.current_status() {
            LoanStatus::Active => "Active".to_owned(),
            LoanStatus::Overdue => "Overdue".to_owned(),
            LoanStatus::Returned => self
                .return_date
                .as_ref()
                .map_or_else(|| "Returned".to_owned(), |date| format!("Returned {date}")),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BookRequest<'a> {
    pub(crate) title: &'a str,
    pub(crate) author_id: &'a str,
    pub(crate) publish_year: i32,
    pub(crate) copies: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cover_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthorRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) bio: &'a str,
}

#[derive(Debug, Serialize)]
struct NewLoan<'a> {
    user_id: &'a str,
    book_id: &'a str,
    due_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct ReturnLoan {
    return_date: NaiveDate,
}

pub(crate) struct Catalog {
    authorizer: Arc<Authorizer>,
    endpoints: Endpoints,
}

impl Catalog {
    pub(crate) fn new(authorizer: Arc<Authorizer>, endpoints: Endpoints) -> Self {
        Self {
            authorizer,
            endpoints,
        }
    }

    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        debug!("{} {}", request.method(), request.url());
        expect_success(self.authorizer.execute(request).await?).await
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = Request::new(Method::GET, self.endpoints.resolve(path)?);
        Ok(self.send(request).await?.json().await?)
    }

    async fn submit<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = transport::json_request(method, self.endpoints.resolve(path)?, body)?;
        let item: Item<T> = self.send(request).await?.json().await?;
        Ok(item.into_inner())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = Request::new(Method::DELETE, self.endpoints.resolve(path)?);
        let _response = self.send(request).await?;
        Ok(())
    }

    pub(crate) async fn books(&self) -> Result<Vec<Book>> {
        let list: List<Book> = self.fetch("books/").await?;
        Ok(list.data.unwrap_or_default())
    }

    pub(crate) async fn book(&self, id: &str) -> Result<Book> {
        let item: Item<Book> = self.fetch(&format!("books/{id}")).await?;
        Ok(item.into_inner())
    }

    pub(crate) async fn create_book(&self, book: &BookRequest<'_>) -> Result<Book> {
        self.submit(Method::POST, "books", book).await
    }

    pub(crate) async fn update_book(&self, id: &str, book: &BookRequest<'_>) -> Result<Book> {
        self.submit(Method::PUT, &format!("books/{id}"), book).await
    }

    pub(crate) async fn delete_book(&self, id: &str) -> Result<()> {
        self.delete(&format!("books/{id}")).await
    }

    pub(crate) async fn authors(&self) -> Result<Vec<Author>> {
        let list: List<Author> = self.fetch("author").await?;
        Ok(list.data.unwrap_or_default())
    }

    pub(crate) async fn author(&self, id: &str) -> Result<Author> {
        let item: Item<Author> = self.fetch(&format!("author/{id}")).await?;
        Ok(item.into_inner())
    }

    pub(crate) async fn create_author(&self, author: &AuthorRequest<'_>) -> Result<Author> {
        self.submit(Method::POST, "author", author).await
    }

    pub(crate) async fn update_author(
        &self,
        id: &str,
        author: &AuthorRequest<'_>,
    ) -> Result<Author> {
        self.submit(Method::PUT, &format!("author/{id}"), author)
            .await
    }

    pub(crate) async fn delete_author(&self, id: &str) -> Result<()> {
        self.delete(&format!("author/{id}")).await
    }

    pub(crate) async fn my_loans(&self) -> Result<Vec<Loan>> {
        let list: List<Loan> = self.fetch("loans/my").await?;
        Ok(list.data.unwrap_or_default())
    }

    /// Borrows a book for [`LOAN_PERIOD`] starting `today`.
    pub(crate) async fn borrow(&self, user_id: &str, book_id: &str, today: NaiveDate) -> Result<Loan> {
        let due_date = today.checked_add_days(LOAN_PERIOD).ok_or(Error::Command)?;
        self.submit(
            Method::POST,
            "loans",
            &NewLoan {
                user_id,
                book_id,
                due_date,
            },
        )
        .await
    }

    pub(crate) async fn return_loan(&self, id: &str, today: NaiveDate) -> Result<Loan> {
        self.submit(
            Method::PUT,
            &format!("loans/{id}/return"),
            &ReturnLoan { return_date: today },
        )
        .await
    }
}
