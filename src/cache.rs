//! At-most-once parsing of configuration files.
//!
//! A [`ConfCache`] maps each file path to the one [`ConfFile`] parsed for it.
//! Entries are never refreshed: editing the file on disk after the first load
//! has no effect for the life of the cache. Asking for the same path with a
//! different dialect is a logic error rather than a silent re-parse.
//!
//! Construct one cache per process and share it (`Arc<ConfCache>`) with every
//! [`OptfigBuilder`](crate::OptfigBuilder) that resolves options.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::conf_file::ConfFile;
use crate::dialect::DialectDescriptor;
use crate::error::OptfigError;
use crate::logger::Logger;

struct CachedFile {
    key: String,
    file: Arc<ConfFile>,
}

/// Thread-safe cache of parsed configuration files, keyed by absolute path.
#[derive(Default)]
pub struct ConfCache {
    files: Mutex<HashMap<PathBuf, CachedFile>>,
}

impl ConfCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the parsed file for `descriptor`, parsing it on first request.
    ///
    /// The lock is held while parsing, so concurrent callers asking for the
    /// same file observe a single parse. The logger must not call back into
    /// this cache.
    pub fn load(
        &self,
        descriptor: &DialectDescriptor,
        logger: &dyn Logger,
    ) -> Result<Arc<ConfFile>, OptfigError> {
        let key = descriptor.canonical_key()?;
        let path = descriptor.absolute_path();

        let mut files = self.files.lock();
        if let Some(cached) = files.get(&path) {
            if cached.key != key {
                return Err(OptfigError::logic(format!(
                    "configuration file {} was already loaded as \"{}\" and cannot be loaded again as \"{key}\"",
                    path.display(),
                    cached.key
                )));
            }
            log::trace!("configuration cache hit for {key}");
            return Ok(Arc::clone(&cached.file));
        }

        let file = Arc::new(ConfFile::load(descriptor, logger)?);
        files.insert(
            path,
            CachedFile {
                key,
                file: Arc::clone(&file),
            },
        );
        Ok(file)
    }

    /// Whether `descriptor` (path and dialect) has already been parsed.
    pub fn is_cached(&self, descriptor: &DialectDescriptor) -> bool {
        let Ok(key) = descriptor.canonical_key() else {
            return false;
        };
        self.files
            .lock()
            .get(&descriptor.absolute_path())
            .is_some_and(|cached| cached.key == key)
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

impl std::fmt::Debug for ConfCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfCache")
            .field("files", &self.len())
            .finish()
    }
}
