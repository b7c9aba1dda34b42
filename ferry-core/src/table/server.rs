//! Handles to a set of named tables.
use super::{ReplayTable, TableInfo};
use crate::FerryError;
use log::info;
use std::{collections::BTreeMap, sync::Arc};

/// Owns the replay tables of a pipeline.
///
/// The server is created once, after the tables, and hands out
/// [`ReplayClient`]s. Components never look tables up on their own: the
/// builder resolves each table through a client and passes the handle on.
pub struct ReplayServer<T> {
    tables: Arc<BTreeMap<String, Arc<ReplayTable<T>>>>,
}

impl<T: Clone> ReplayServer<T> {
    /// Creates a server owning the given tables.
    pub fn new(tables: Vec<ReplayTable<T>>) -> Result<Self, FerryError> {
        let mut map = BTreeMap::new();
        for table in tables {
            let name = table.name().to_string();
            if map.insert(name.clone(), Arc::new(table)).is_some() {
                return Err(FerryError::InvalidConfig(format!(
                    "duplicate table name `{}`",
                    name
                )));
            }
        }
        info!("Start replay server with tables {:?}", map.keys().collect::<Vec<_>>());
        Ok(Self {
            tables: Arc::new(map),
        })
    }

    /// Returns a client connected to this server.
    pub fn client(&self) -> ReplayClient<T> {
        ReplayClient {
            tables: self.tables.clone(),
        }
    }

    /// Closes every table.
    pub fn close(&self) {
        self.client().close()
    }
}

/// Cheap, cloneable handle to the tables of a [`ReplayServer`].
pub struct ReplayClient<T> {
    tables: Arc<BTreeMap<String, Arc<ReplayTable<T>>>>,
}

impl<T> Clone for ReplayClient<T> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
        }
    }
}

impl<T: Clone> ReplayClient<T> {
    /// Resolves a table by name.
    pub fn table(&self, name: &str) -> Result<Arc<ReplayTable<T>>, FerryError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| FerryError::TableNotFound(name.to_string()))
    }

    /// Names of the tables.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Counters of every table.
    pub fn info(&self) -> Vec<TableInfo> {
        self.tables.values().map(|t| t.info()).collect()
    }

    /// Closes every table, releasing all blocked callers.
    pub fn close(&self) {
        for table in self.tables.values() {
            table.close();
        }
    }
}
