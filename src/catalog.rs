use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::symbol_table::SharedSymbolTable;

/// A collection of shared symbol tables addressable by name and version.
///
/// Readers consult the catalog when a local symbol table's `imports` field names a shared
/// table. Implementations might be backed by an in-memory map, the file system, or a
/// network service; the reader only requires these two lookups.
pub trait Catalog {
    /// Returns the shared table with this exact name and version, if present.
    fn find_exact(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>>;

    /// Returns the highest version of the shared table with this name, if any version is
    /// present.
    fn find_latest(&self, name: &str) -> Option<Arc<SharedSymbolTable>>;
}

/// A simple in-memory [Catalog].
pub struct MapCatalog {
    tables_by_name: HashMap<String, BTreeMap<u32, Arc<SharedSymbolTable>>>,
}

impl MapCatalog {
    pub fn new() -> MapCatalog {
        MapCatalog {
            tables_by_name: HashMap::new(),
        }
    }

    /// Adds the provided table to the catalog, replacing any existing table with the same
    /// name and version.
    pub fn insert_table(&mut self, table: SharedSymbolTable) {
        let versions = self
            .tables_by_name
            .entry(table.name().to_string())
            .or_insert_with(BTreeMap::new);
        versions.insert(table.version(), Arc::new(table));
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        MapCatalog::new()
    }
}

impl Catalog for MapCatalog {
    fn find_exact(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        self.tables_by_name
            .get(name)
            .and_then(|versions| versions.get(&version))
            .map(Arc::clone)
    }

    fn find_latest(&self, name: &str) -> Option<Arc<SharedSymbolTable>> {
        self.tables_by_name
            .get(name)
            .and_then(|versions| versions.values().next_back())
            .map(Arc::clone)
    }
}

impl<C: Catalog + ?Sized> Catalog for Box<C> {
    fn find_exact(&self, name: &str, version: u32) -> Option<Arc<SharedSymbolTable>> {
        (**self).find_exact(name, version)
    }

    fn find_latest(&self, name: &str) -> Option<Arc<SharedSymbolTable>> {
        (**self).find_latest(name)
    }
}

#[cfg(test)]
mod catalog_tests {
    use super::*;
    use crate::result::IonResult;

    fn table(name: &str, version: u32) -> SharedSymbolTable {
        SharedSymbolTable::new(name, version, vec![Some("a".to_string())]).unwrap()
    }

    #[test]
    fn find_exact_requires_both_coordinates() -> IonResult<()> {
        let mut catalog = MapCatalog::new();
        catalog.insert_table(table("t", 1));
        catalog.insert_table(table("t", 3));
        assert!(catalog.find_exact("t", 1).is_some());
        assert!(catalog.find_exact("t", 2).is_none());
        assert!(catalog.find_exact("u", 1).is_none());
        Ok(())
    }

    #[test]
    fn find_latest_picks_the_highest_version() {
        let mut catalog = MapCatalog::new();
        catalog.insert_table(table("t", 2));
        catalog.insert_table(table("t", 7));
        catalog.insert_table(table("t", 4));
        assert_eq!(catalog.find_latest("t").unwrap().version(), 7);
        assert!(catalog.find_latest("missing").is_none());
    }
}
