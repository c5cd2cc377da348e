// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Durable string entries addressed by key.

mod file;
#[cfg(feature = "keychain")]
mod keychain;
mod memory;
#[cfg(feature = "secret-service")]
mod secret_service;

use async_trait::async_trait;

use crate::error::Result;

pub(crate) use file::File;
#[cfg(feature = "keychain")]
pub(crate) use keychain::Keychain;
pub(crate) use memory::Memory;
#[cfg(feature = "secret-service")]
pub(crate) use secret_service::SecretService;

pub(crate) trait IsPersistent {
    fn is_persistent(&self) -> bool;
}

impl<T: IsPersistent + ?Sized> IsPersistent for Box<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

#[async_trait]
pub(crate) trait Storage: Send + Sync + IsPersistent {
    async fn get(&mut self, key: &str) -> Result<Option<String>>;
    async fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing a key that is not present succeeds.
    async fn remove(&mut self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Box<T> {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}
