//! Keyed table persistence.
//!
//! Each logical table is one pretty-printed JSON object on disk, mapping string
//! keys to arbitrary values. A missing file is created empty on first load.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{errors::Error, Result};

/// Logical tables persisted by the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    ConversationHistory,
    Temperature,
    Credentials,
}

impl Table {
    pub fn file_stem(self) -> &'static str {
        match self {
            Table::ConversationHistory => "conversation_history",
            Table::Temperature => "temperature",
            Table::Credentials => "credentials",
        }
    }
}

/// File-per-table store rooted at a data directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.json", table.file_stem()))
    }

    pub fn exists(&self, table: Table) -> bool {
        self.path(table).is_file()
    }

    /// Load a table. A missing file is created empty; an empty file reads as `{}`.
    pub fn load<T: DeserializeOwned>(&self, table: Table) -> Result<BTreeMap<String, T>> {
        let path = self.path(table);
        if !path.exists() {
            self.save::<serde_json::Value>(table, &BTreeMap::new())?;
            return Ok(BTreeMap::new());
        }

        let txt = fs::read_to_string(&path)?;
        if txt.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let data: Option<BTreeMap<String, T>> =
            serde_json::from_str(&txt).map_err(|e| Error::CorruptTable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(data.unwrap_or_default())
    }

    /// Overwrite a table with `data`.
    ///
    /// Writes to a sibling temp file and renames it into place so a crash never
    /// leaves a truncated table behind.
    pub fn save<T: Serialize>(&self, table: Table, data: &BTreeMap<String, T>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(table);
        let tmp = path.with_extension("json.tmp");

        let mut txt = serde_json::to_string_pretty(data)?;
        txt.push('\n');
        fs::write(&tmp, txt)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
