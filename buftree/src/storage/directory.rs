//! Directory-backed node store.
//!
//! Every node lives in its own file, named by the decimal node id, inside a
//! single directory.
//!
//! # File Format
//!
//! ```text
//! +------------------+---------------------+
//! | crc32 (4 bytes)  | node record bytes   |
//! +------------------+---------------------+
//! ```
//!
//! The checksum is little-endian and covers the record bytes only.
//!
//! # Invariants
//!
//! - `max_id` is at least the largest numeric file name present when the
//!   store was opened, so reopened stores never hand out a used id
//! - A record file is replaced atomically: it is written to `<id>.tmp` and
//!   renamed into place

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::io::{NodeId, NodeStore, StorageError};

/// Size of the checksum prefix on each record file.
const CHECKSUM_SIZE: usize = 4;

/// Node store that keeps one file per node in a directory.
#[derive(Debug)]
pub struct DirectoryStore {
    /// Directory holding the record files.
    root: PathBuf,
    /// Largest id handed out or found on disk.
    max_id: NodeId,
}

impl DirectoryStore {
    /// Open the store at `root`, creating the directory if needed.
    ///
    /// The directory is scanned to recover the largest allocated id.
    /// Files whose names are not decimal ids are ignored.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut max_id = 0;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let name = entry.file_name();
            match name.to_str().and_then(|n| n.parse::<NodeId>().ok()) {
                Some(id) => max_id = max_id.max(id),
                None => tracing::trace!("skipping non-node file {}", name.to_string_lossy()),
            }
        }

        tracing::debug!(
            "opened directory store at {} (max id {max_id})",
            root.display()
        );
        Ok(Self { root, max_id })
    }

    /// Directory holding the record files.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Copy every record file into `dest` and open a store there.
    ///
    /// The copy is a full duplicate: later writes to either store are not
    /// visible to the other. `dest` must not already contain node files.
    pub fn fork_to(&self, dest: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_str().and_then(|n| n.parse::<NodeId>().ok()).is_some() {
                fs::copy(entry.path(), dest.join(&name))?;
            }
        }

        let mut fork = Self::open(dest)?;
        // Ids of nodes deleted before the fork must stay retired in both copies.
        fork.max_id = fork.max_id.max(self.max_id);
        Ok(fork)
    }

    fn record_path(&self, id: NodeId) -> PathBuf {
        self.root.join(id.to_string())
    }
}

impl NodeStore for DirectoryStore {
    fn allocate_id(&mut self) -> Result<NodeId, StorageError> {
        self.max_id += 1;
        Ok(self.max_id)
    }

    fn load(&mut self, id: NodeId) -> Result<Vec<u8>, StorageError> {
        let mut bytes = match fs::read(self.record_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < CHECKSUM_SIZE {
            return Err(StorageError::Corruption(format!(
                "node {id}: record truncated to {} bytes",
                bytes.len()
            )));
        }
        let payload = bytes.split_off(CHECKSUM_SIZE);
        let stored = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let computed = crc32fast::hash(&payload);
        if stored != computed {
            return Err(StorageError::Corruption(format!(
                "node {id}: checksum mismatch (stored {stored:#010x}, computed {computed:#010x})"
            )));
        }
        Ok(payload)
    }

    fn store(&mut self, id: NodeId, bytes: &[u8]) -> Result<(), StorageError> {
        let mut framed = Vec::with_capacity(CHECKSUM_SIZE + bytes.len());
        framed.extend_from_slice(&crc32fast::hash(bytes).to_le_bytes());
        framed.extend_from_slice(bytes);

        let tmp = self.root.join(format!("{id}.tmp"));
        fs::write(&tmp, &framed)?;
        fs::rename(&tmp, self.record_path(id))?;
        Ok(())
    }

    fn remove(&mut self, id: NodeId) -> Result<(), StorageError> {
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
