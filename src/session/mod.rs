// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! The authenticated session: who is signed in, the credentials that prove it
//! and the only component allowed to change either.
//!
//! [`Manager`] owns both the [`credentials::CredentialStore`] and the write
//! side of the session state. Everything else observes the session through a
//! [`Reader`].

pub(crate) mod credentials;
mod manager;
mod state;

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

pub(crate) use manager::Manager;
pub(crate) use state::{Reader, Session};

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Admin,
    User,
}

impl Role {
    /// The role that grants catalog administration.
    pub(crate) const PRIVILEGED: Self = Self::Admin;
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "Administrator"),
            Self::User => write!(f, "User"),
        }
    }
}

/// The signed-in user as reported by the server at login.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Tabled)]
pub(crate) struct UserProfile {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: Role,
}

impl UserProfile {
    pub(crate) fn new(id: String, name: String, email: String, role: Role) -> Self {
        Self {
            id,
            name,
            email,
            role,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn email(&self) -> &str {
        &self.email
    }

    pub(crate) const fn role(&self) -> Role {
        self.role
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Destination {
    /// The unauthenticated entry point.
    Landing,
    /// The authenticated area.
    Dashboard,
}

/// Receives the session's requests to move the user elsewhere.
pub(crate) trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// A navigator for surfaces without routes of their own.
pub(crate) struct Unrouted;

impl Navigator for Unrouted {
    fn navigate(&self, destination: Destination) {
        debug!("Ignoring navigation to {:?}", destination);
    }
}
