use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Load-once cache keyed by file path
// ---------------------------------------------------------------------------

/// Memoizes an immutable value per path for the lifetime of its owner.
///
/// Failed loads are not cached, so a later call retries the file.
#[derive(Debug)]
pub struct PathCache<T> {
    entries: HashMap<PathBuf, Arc<T>>,
}

impl<T> Default for PathCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> PathCache<T> {
    /// Return the cached value for `path`, or run `load` and cache its result.
    pub fn get_or_try_load<E>(
        &mut self,
        path: &Path,
        load: impl FnOnce(&Path) -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(hit) = self.entries.get(path) {
            log::debug!("cache hit for {}", path.display());
            return Ok(Arc::clone(hit));
        }
        let value = Arc::new(load(path)?);
        self.entries.insert(path.to_path_buf(), Arc::clone(&value));
        Ok(value)
    }

    #[cfg(test)]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
