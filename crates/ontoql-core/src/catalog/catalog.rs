//! Versioned ontology store backed by sled.

use super::{EntitySchema, OntologyAccessor, SchemaBundle};
use crate::error::Error;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Tree name for schema bundles.
const SCHEMA_TREE: &str = "ontology:bundles";

/// Tree name for catalog metadata.
const META_TREE: &str = "ontology:meta";

/// Key for current schema version in meta tree.
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// Persistent store of ontology versions.
///
/// Every applied bundle is kept under its version number; the latest one is
/// cached in memory and served through [`OntologyAccessor`].
pub struct Catalog {
    schema_tree: Tree,
    meta_tree: Tree,
    current_version: AtomicU64,
    current_schema: RwLock<Option<SchemaBundle>>,
}

impl Catalog {
    /// Open or create a catalog inside an existing sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let schema_tree = db.open_tree(SCHEMA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        let current_version = match meta_tree.get(CURRENT_VERSION_KEY)? {
            Some(bytes) => decode_version(&bytes)?,
            None => 0,
        };

        let catalog = Self {
            schema_tree,
            meta_tree,
            current_version: AtomicU64::new(current_version),
            current_schema: RwLock::new(None),
        };

        if current_version > 0 {
            if let Some(schema) = catalog.schema_at_version(current_version)? {
                *catalog.current_schema.write() = Some(schema);
            }
        }

        debug!(version = current_version, "Opened ontology catalog");
        Ok(catalog)
    }

    /// Open or create a catalog stored in its own directory.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let db = sled::open(path)?;
        Self::open(&db)
    }

    /// Get the current schema version (0 when nothing was applied).
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get the current schema bundle.
    pub fn current_schema(&self) -> Option<SchemaBundle> {
        self.current_schema.read().clone()
    }

    /// Get the schema bundle stored at a specific version.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        match self.schema_tree.get(version.to_be_bytes())? {
            Some(bytes) => Ok(Some(SchemaBundle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Validate and store a bundle as the next version.
    ///
    /// The bundle's own version is overwritten. Returns the new version.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        bundle.validate()?;

        let mut current = self.current_schema.write();
        let new_version = self.current_version() + 1;
        bundle.version = new_version;

        self.schema_tree
            .insert(new_version.to_be_bytes(), bundle.to_bytes()?)?;
        self.meta_tree
            .insert(CURRENT_VERSION_KEY, &new_version.to_be_bytes())?;

        self.current_version.store(new_version, Ordering::SeqCst);
        info!(
            version = new_version,
            entities = bundle.entities.len(),
            "Applied ontology"
        );
        *current = Some(bundle);

        Ok(new_version)
    }

    /// Get an entity schema by name from the current version.
    pub fn get_entity(&self, name: &str) -> Option<EntitySchema> {
        self.current_schema
            .read()
            .as_ref()
            .and_then(|s| s.get_entity(name).cloned())
    }

    /// List entity names of the current version, sorted.
    pub fn list_entities(&self) -> Vec<String> {
        self.current_schema
            .read()
            .as_ref()
            .map(|s| s.entity_names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// List all stored versions in ascending order.
    pub fn list_versions(&self) -> Result<Vec<u64>, Error> {
        let mut versions = Vec::new();
        for entry in self.schema_tree.iter() {
            let (key, _) = entry?;
            versions.push(decode_version(&key)?);
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.schema_tree.flush()?;
        self.meta_tree.flush()?;
        Ok(())
    }
}

impl OntologyAccessor for Catalog {
    fn entity_schema(&self, name: &str) -> Result<EntitySchema, Error> {
        self.get_entity(name)
            .ok_or_else(|| Error::EntityNotFound(name.to_string()))
    }
}

fn decode_version(bytes: &[u8]) -> Result<u64, Error> {
    let buf: [u8; 8] = bytes.try_into().map_err(|_| {
        Error::Deserialization(format!("invalid version key of {} bytes", bytes.len()))
    })?;
    Ok(u64::from_be_bytes(buf))
}
