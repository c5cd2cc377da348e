// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, io};

use async_trait::async_trait;

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

const KEY_ATTRIBUTE: &str = "libris.key";

pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    attributes: HashMap<String, String>,
}

impl SecretService {
    fn attributes_for<'a>(&'a self, key: &'a str) -> HashMap<&'a str, &'a str> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain([(KEY_ATTRIBUTE, key)])
            .collect()
    }

    async fn item(&self, key: &str) -> Result<Option<oo7::Item>> {
        Ok(self
            .keyring
            .search_items(self.attributes_for(key))
            .await
            .map_err(error::Storage::from)?
            .into_iter()
            .next())
    }

    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await.map_err(error::Storage::from)?,
            attributes: HashMap::from([
                ("libris.kind".to_owned(), "session".to_owned()),
                ("libris.url".to_owned(), url.as_str().to_owned()),
            ]),
        })
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for SecretService {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        match self.item(key).await? {
            Some(item) => {
                let secret = item.secret().await.map_err(error::Storage::from)?;
                let value = String::from_utf8(secret.to_vec())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.keyring
            .create_item(
                &metadata::CLIENT_DISPLAY_NAME,
                self.attributes_for(key),
                value.as_bytes(),
                true,
            )
            .await
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        if let Some(item) = self.item(key).await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
