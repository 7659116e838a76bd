//! Compile-time reference descriptors.
//!
//! A [`ReferenceDescriptor`] makes a module's public surface available to a
//! compilation. A [`ReferenceSet`] is the immutable snapshot of descriptors a
//! single compile runs against.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use modlink_core::{ImageError, ModuleMetadata, image};

use crate::ReferenceError;

/// Where a descriptor's metadata was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceOrigin {
    File(PathBuf),
    /// A just-emitted image that never touched disk.
    InMemory,
}

impl fmt::Display for ReferenceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceOrigin::File(path) => write!(f, "{}", path.display()),
            ReferenceOrigin::InMemory => f.write_str("in-memory"),
        }
    }
}

/// A module usable as a compile-time symbol source.
#[derive(Debug, Clone)]
pub struct ReferenceDescriptor {
    name: String,
    metadata: Arc<ModuleMetadata>,
    origin: ReferenceOrigin,
}

impl ReferenceDescriptor {
    /// Read and decode the module image stored at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = image::decode(&bytes).map_err(|source| ReferenceError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(metadata, ReferenceOrigin::File(path.to_path_buf())))
    }

    /// Decode an in-memory image.
    pub fn from_image(bytes: &[u8]) -> Result<Self, ImageError> {
        let metadata = image::decode(bytes)?;
        Ok(Self::new(metadata, ReferenceOrigin::InMemory))
    }

    fn new(metadata: ModuleMetadata, origin: ReferenceOrigin) -> Self {
        Self {
            name: metadata.name.clone(),
            metadata: Arc::new(metadata),
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn origin(&self) -> &ReferenceOrigin {
        &self.origin
    }

    pub fn is_in_memory(&self) -> bool {
        self.origin == ReferenceOrigin::InMemory
    }
}

/// Immutable snapshot of reference descriptors, sorted by module name.
///
/// Cloning is cheap; the snapshot never changes after creation, so a compile
/// sees the same references from start to finish.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    descriptors: Arc<[ReferenceDescriptor]>,
}

impl ReferenceSet {
    /// Build a snapshot. On duplicate names the first descriptor is kept.
    pub fn new(descriptors: impl IntoIterator<Item = ReferenceDescriptor>) -> Self {
        let mut descriptors: Vec<_> = descriptors.into_iter().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors.dedup_by(|later, earlier| later.name == earlier.name);
        Self {
            descriptors: descriptors.into(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceDescriptor> {
        self.descriptors
            .binary_search_by(|d| d.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.descriptors[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDescriptor> {
        self.descriptors.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::ModuleBuilder;
    use tempdir::TempDir;

    fn in_memory(name: &str) -> ReferenceDescriptor {
        let meta = ModuleBuilder::new(name).simple_type("T").build();
        ReferenceDescriptor::from_image(&image::encode(&meta)).unwrap()
    }

    #[test]
    fn from_file_decodes_image() {
        let dir = TempDir::new("modlink-ref").unwrap();
        let path = dir.path().join("core.mlnk");
        let meta = ModuleBuilder::new("Core").simple_type("A").build();
        std::fs::write(&path, image::encode(&meta)).unwrap();

        let desc = ReferenceDescriptor::from_file(&path).unwrap();
        assert_eq!(desc.name(), "Core");
        assert!(desc.metadata().find_type("A").is_some());
        assert_eq!(desc.origin(), &ReferenceOrigin::File(path));
        assert!(!desc.is_in_memory());
    }

    #[test]
    fn from_file_reports_io_and_decode_errors() {
        let dir = TempDir::new("modlink-ref").unwrap();
        let missing = dir.path().join("missing.mlnk");
        assert!(matches!(
            ReferenceDescriptor::from_file(&missing),
            Err(ReferenceError::Io { .. })
        ));

        let garbage = dir.path().join("garbage.mlnk");
        std::fs::write(&garbage, b"not an image").unwrap();
        assert!(matches!(
            ReferenceDescriptor::from_file(&garbage),
            Err(ReferenceError::Image { .. })
        ));
    }

    #[test]
    fn in_memory_origin() {
        let desc = in_memory("Mod1");
        assert!(desc.is_in_memory());
        assert_eq!(desc.origin().to_string(), "in-memory");
    }

    #[test]
    fn set_is_sorted_and_searchable() {
        let set = ReferenceSet::new([in_memory("Util"), in_memory("Core"), in_memory("Mod1")]);
        assert_eq!(set.names().collect::<Vec<_>>(), ["Core", "Mod1", "Util"]);
        assert!(set.contains("Mod1"));
        assert!(set.get("Unknown").is_none());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn set_keeps_first_duplicate() {
        let first = in_memory("Core");
        let mut meta = ModuleBuilder::new("Core").build();
        meta.types.clear();
        let second = ReferenceDescriptor::from_image(&image::encode(&meta)).unwrap();

        let set = ReferenceSet::new([first, second]);
        assert_eq!(set.len(), 1);
        assert!(set.get("Core").unwrap().metadata().find_type("T").is_some());
    }
}
