// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::io;

use async_trait::async_trait;
use security_framework::os::macos::keychain::{SecKeychain, SecPreferencesDomain};

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300_i32;

pub(crate) struct Keychain {
    delegate: SecKeychain,
    service: String,
    url: String,
}

impl Keychain {
    pub(crate) fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            delegate: SecKeychain::default_for_domain(SecPreferencesDomain::User)
                .map_err(Into::<error::Storage>::into)?,
            service: metadata::PROJECT_DIRS
                .as_ref()
                .map(|dirs| dirs.project_path().as_os_str())
                .ok_or(error::Storage::NoProjectDirs)?
                .to_string_lossy()
                .to_string(),
            url: url.to_string(),
        })
    }

    fn account(&self, key: &str) -> String {
        format!("{}#{}", self.url, key)
    }
}

impl IsPersistent for Keychain {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for Keychain {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let result = self
            .delegate
            .find_generic_password(&self.service, &self.account(key));
        match result {
            Ok((password, _)) => Ok(Some(
                String::from_utf8(password.to_vec())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            )),
            Err(err) if err.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
            Err(err) => Err(Into::<error::Storage>::into(err).into()),
        }
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.delegate
            .set_generic_password(&self.service, &self.account(key), value.as_bytes())
            .map_err(Into::<error::Storage>::into)?;
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        let result = self
            .delegate
            .find_generic_password(&self.service, &self.account(key));
        match result {
            Ok((_, item)) => item.delete(),
            Err(err) if err.code() == ERR_SEC_ITEM_NOT_FOUND => {}
            Err(err) => return Err(Into::<error::Storage>::into(err).into()),
        };
        Ok(())
    }
}
