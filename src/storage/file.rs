// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use crate::{error::Result, metadata};

use super::{IsPersistent, Storage};

type Entries = BTreeMap<String, String>;

/// All entries live in one JSON object so that a write replaces the file as a
/// whole.
pub(crate) struct File {
    path: PathBuf,
}

impl File {
    pub(crate) fn new<P: AsRef<Path>>(file: P) -> Option<Self> {
        metadata::PROJECT_DIRS
            .as_ref()
            .map(|dirs| Self::at(dirs.data_dir().join(file)))
    }

    pub(crate) fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<Entries> {
        match fs::File::open(&self.path) {
            Ok(fp) => Ok(serde_json::from_reader(io::BufReader::new(fp))?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &Entries) -> Result<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(&self.path)?;
        serde_json::to_writer(file, entries)?;
        Ok(())
    }
}

impl IsPersistent for File {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for File {
    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read()?;
        let _previous = entries.insert(key.to_owned(), value.to_owned());
        self.write(&entries)
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        // An unreadable file cannot hold anything worth keeping.
        let mut entries = self.read().unwrap_or_default();
        let _previous = entries.remove(key);
        self.write(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_survive_a_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut first = File::at(&path);
        first.set("access_token", "t1").await.unwrap();
        first.set("refresh_token", "r1").await.unwrap();

        let mut second = File::at(&path);
        assert_eq!(
            second.get("access_token").await.unwrap().as_deref(),
            Some("t1")
        );
        assert_eq!(
            second.get("refresh_token").await.unwrap().as_deref(),
            Some("r1")
        );
        assert_eq!(second.get("user").await.unwrap(), None);
    }

    #[tokio::test]
    async fn removing_the_last_entry_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut storage = File::at(&path);
        storage.set("user", "{}").await.unwrap();
        assert!(path.exists());

        storage.remove("user").await.unwrap();
        assert!(!path.exists());
        storage.remove("user").await.unwrap();
    }

    #[tokio::test]
    async fn garbage_file_is_an_error_on_read_and_cleared_on_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"not json").unwrap();

        let mut storage = File::at(&path);
        assert!(storage.get("user").await.is_err());

        storage.remove("user").await.unwrap();
        assert!(!path.exists());
    }
}
