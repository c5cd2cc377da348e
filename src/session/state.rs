// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use tokio::sync::watch;

use super::{Role, UserProfile};

/// A consistent view of the session at one point in time.
///
/// A user is only ever recorded together with stored credentials, so
/// `current_user().is_some()` and `is_authenticated()` cannot disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Session {
    user: Option<UserProfile>,
    in_flight: usize,
}

impl Session {
    pub(crate) const fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub(crate) const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether a login, registration or refresh exchange is outstanding.
    pub(crate) const fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.user
            .as_ref()
            .map_or(false, |user| user.role() == Role::PRIVILEGED)
    }
}

/// Read access to the session, available to any consumer.
#[derive(Clone)]
pub(crate) struct Reader {
    rx: watch::Receiver<Session>,
}

impl Reader {
    pub(crate) fn snapshot(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub(crate) fn current_user(&self) -> Option<UserProfile> {
        self.rx.borrow().current_user().cloned()
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }
}

/// Write access to the session. Only the session manager holds one.
pub(super) struct Writer {
    tx: watch::Sender<Session>,
}

impl Writer {
    pub(super) fn new(user: Option<UserProfile>) -> Self {
        let (tx, _) = watch::channel(Session { user, in_flight: 0 });
        Self { tx }
    }

    pub(super) fn subscribe(&self) -> Reader {
        Reader {
            rx: self.tx.subscribe(),
        }
    }

    pub(super) fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub(super) fn authenticate(&self, user: UserProfile) {
        self.tx.send_modify(|session| session.user = Some(user));
    }

    /// Returns whether a user was signed in.
    pub(super) fn reset(&self) -> bool {
        let mut was_authenticated = false;
        self.tx.send_modify(|session| {
            was_authenticated = session.user.take().is_some();
        });
        was_authenticated
    }

    pub(super) fn begin_loading(&self) -> Loading<'_> {
        self.tx.send_modify(|session| session.in_flight += 1);
        Loading { writer: self }
    }
}

/// Marks an exchange as outstanding until dropped.
pub(super) struct Loading<'writer> {
    writer: &'writer Writer,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.writer
            .tx
            .send_modify(|session| session.in_flight = session.in_flight.saturating_sub(1));
    }
}
