//! Structure sources: indexable, lazily-decoded sequences of structures.
//!
//! The on-disk format of a dataset is opaque to the pipeline. A
//! [`DirectorySource`] enumerates a directory once at construction and
//! delegates per-file decoding to a caller-supplied [`StructureDecoder`];
//! a [`MemorySource`] holds pre-built structures for tests and small runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::Error;
use crate::model::{Origin, Structure};

/// Indexable, lazy access to one dataset's structures.
///
/// `get` may decode from disk on every call; callers that need a structure
/// more than once should keep the returned value. Implementations must be
/// deterministic: the same index always yields the same structure.
pub trait StructureSource: Send + Sync {
    /// Number of structures in this source.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes the structure at `index`.
    fn get(&self, index: usize) -> Result<Structure, Error>;

    /// Dataset origin tag stamped onto every yielded structure.
    fn origin(&self) -> &Origin;
}

/// Decodes one dataset file into a structure.
///
/// The decoder receives the file path and the origin to stamp; tier
/// assignment falls back to [`Tier::from_atom_count`](crate::model::Tier::from_atom_count)
/// if the decoder does not set one explicitly.
pub type StructureDecoder =
    Arc<dyn Fn(&Path, &Origin) -> Result<Structure, String> + Send + Sync>;

/// In-memory source over owned structures.
pub struct MemorySource {
    origin: Origin,
    structures: Vec<Structure>,
}

impl MemorySource {
    /// Creates a source from structures that already carry the right origin.
    pub fn new(origin: Origin, structures: Vec<Structure>) -> Self {
        Self { origin, structures }
    }
}

impl StructureSource for MemorySource {
    fn len(&self) -> usize {
        self.structures.len()
    }

    fn get(&self, index: usize) -> Result<Structure, Error> {
        self.structures
            .get(index)
            .cloned()
            .ok_or_else(|| Error::decode(self.origin.name(), index, "index out of range"))
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// Directory-backed source: one file per structure, decoded on demand.
pub struct DirectorySource {
    origin: Origin,
    files: Vec<PathBuf>,
    decoder: StructureDecoder,
}

impl DirectorySource {
    /// Enumerates `path` and prepares lazy access to its files.
    ///
    /// Fails with [`Error::UnresolvedDataset`] if the path is not a readable
    /// directory and with [`Error::EmptyDataset`] if it holds no regular
    /// files. Files are ordered by name so indices are stable across runs.
    pub fn open(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        decoder: StructureDecoder,
    ) -> Result<Self, Error> {
        let name = name.into();
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::unresolved_dataset(
                &name,
                path,
                "not a directory or not accessible",
            ));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::EmptyDataset { name });
        }

        Ok(Self {
            origin: Origin::new(name),
            files,
            decoder,
        })
    }
}

impl StructureSource for DirectorySource {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Result<Structure, Error> {
        let file = self
            .files
            .get(index)
            .ok_or_else(|| Error::decode(self.origin.name(), index, "index out of range"))?;
        (self.decoder)(file, &self.origin)
            .map_err(|detail| Error::decode(self.origin.name(), index, detail))
    }

    fn origin(&self) -> &Origin {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Atom, Element, Tier};
    use std::io::Write;

    fn make_structure(origin: &Origin, n_atoms: usize) -> Structure {
        let atoms = (0..n_atoms)
            .map(|i| Atom::new(Element::C, [i as f64, 0.0, 0.0]))
            .collect();
        Structure::new(atoms, origin.clone(), Tier(0))
    }

    #[test]
    fn memory_source_yields_by_index() {
        let origin = Origin::new("mem");
        let source = MemorySource::new(
            origin.clone(),
            vec![make_structure(&origin, 2), make_structure(&origin, 5)],
        );

        assert_eq!(source.len(), 2);
        assert_eq!(source.get(1).unwrap().atom_count(), 5);
        assert!(source.get(2).is_err());
    }

    #[test]
    fn directory_source_rejects_missing_path() {
        let decoder: StructureDecoder = Arc::new(|_, _| Err("unused".into()));
        let result = DirectorySource::open("gone", "/definitely/not/here", decoder);
        assert!(matches!(result, Err(Error::UnresolvedDataset { .. })));
    }

    #[test]
    fn directory_source_rejects_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let decoder: StructureDecoder = Arc::new(|_, _| Err("unused".into()));
        let result = DirectorySource::open("empty", dir.path(), decoder);
        assert!(matches!(result, Err(Error::EmptyDataset { .. })));
    }

    #[test]
    fn directory_source_enumerates_sorted_and_decodes() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xyz", "a.xyz"] {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            writeln!(f, "stub").unwrap();
        }

        let decoder: StructureDecoder = Arc::new(|path, origin| {
            let n = if path.file_name().unwrap() == "a.xyz" { 1 } else { 4 };
            let atoms = (0..n)
                .map(|i| Atom::new(Element::N, [i as f64, 0.0, 0.0]))
                .collect();
            Ok(Structure::new(atoms, origin.clone(), Tier(0)))
        });

        let source = DirectorySource::open("dir", dir.path(), decoder).unwrap();
        assert_eq!(source.len(), 2);
        // "a.xyz" sorts first
        assert_eq!(source.get(0).unwrap().atom_count(), 1);
        assert_eq!(source.get(1).unwrap().atom_count(), 4);
        assert_eq!(source.origin().name(), "dir");
    }

    #[test]
    fn directory_source_surfaces_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("bad.xyz")).unwrap();

        let decoder: StructureDecoder = Arc::new(|_, _| Err("corrupt header".into()));
        let source = DirectorySource::open("dir", dir.path(), decoder).unwrap();
        assert!(matches!(source.get(0), Err(Error::Decode { .. })));
    }
}
