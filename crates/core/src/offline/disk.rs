use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use super::{storage::CacheStorage, CacheError, Response};

const INDEX_FILE: &str = "index.json";

/// Index of one cache generation, stored next to the body files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GenerationIndex {
    #[serde(default)]
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    file: String,
    status: u16,
    content_type: Option<String>,
    stored_at: DateTime<Utc>,
}

impl GenerationIndex {
    fn load(path: &Path) -> Result<Self, CacheError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| CacheError::Index {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load for rewriting. A corrupt index is dropped so the generation can heal.
    fn load_or_reset(path: &Path) -> Result<Self, CacheError> {
        match Self::load(path) {
            Err(err @ CacheError::Index { .. }) => {
                warn!(error = %err, "discarding unreadable cache index");
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn persist(&self, path: &Path) -> Result<(), CacheError> {
        let serialized = serde_json::to_vec_pretty(self).map_err(|source| CacheError::Index {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = parent_of(path);
        let mut staged = NamedTempFile::new_in(dir).map_err(|source| io_error(dir, source))?;
        staged
            .write_all(&serialized)
            .map_err(|source| io_error(staged.path(), source))?;
        staged
            .persist(path)
            .map_err(|err| io_error(path, err.error))?;
        Ok(())
    }
}

/// Cache generations stored under a root directory, one sub-directory per generation.
///
/// Bodies are written once under unique names and the index is swapped atomically, so a
/// reader sees either the old entry or the new one.
#[derive(Debug)]
pub struct DiskCacheStorage {
    root: PathBuf,
    lock: RwLock<()>,
}

impl DiskCacheStorage {
    /// Storage rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, cache: &str) -> PathBuf {
        self.root.join(sanitize_component(cache))
    }
}

impl CacheStorage for DiskCacheStorage {
    fn lookup(&self, cache: &str, key: &str) -> Result<Option<Response>, CacheError> {
        let _guard = self.lock.read();
        let dir = self.generation_dir(cache);
        let index = GenerationIndex::load(&dir.join(INDEX_FILE))?;
        let Some(entry) = index.entries.get(key) else {
            return Ok(None);
        };

        let body_path = dir.join(&entry.file);
        let body = match fs::read(&body_path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(key, path = %body_path.display(), "cache body missing; treating as miss");
                return Ok(None);
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: body_path,
                    source,
                })
            }
        };

        Ok(Some(Response {
            status: entry.status,
            content_type: entry.content_type.clone(),
            body,
        }))
    }

    fn store(&self, cache: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        let _guard = self.lock.write();
        let dir = self.generation_dir(cache);
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        let index_path = dir.join(INDEX_FILE);
        let mut index = GenerationIndex::load_or_reset(&index_path)?;

        let file = write_body(&dir, key, &response.body)?;
        let previous = index.entries.insert(
            key.to_string(),
            IndexEntry {
                file: file.clone(),
                status: response.status,
                content_type: response.content_type.clone(),
                stored_at: Utc::now(),
            },
        );
        if let Err(err) = index.persist(&index_path) {
            remove_body(&dir.join(&file));
            return Err(err);
        }
        if let Some(previous) = previous.filter(|previous| previous.file != file) {
            remove_body(&dir.join(previous.file));
        }
        Ok(())
    }

    fn cache_names(&self) -> Result<Vec<String>, CacheError> {
        let _guard = self.lock.read();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    fn delete_cache(&self, cache: &str) -> Result<bool, CacheError> {
        let _guard = self.lock.write();
        let dir = self.generation_dir(cache);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path: dir, source }),
        }
    }
}

/// Write `body` to a fresh file in `dir` and return its file name.
fn write_body(dir: &Path, key: &str, body: &[u8]) -> Result<String, CacheError> {
    let mut staged = Builder::new()
        .prefix(&body_file_prefix(key))
        .suffix(".body")
        .tempfile_in(dir)
        .map_err(|source| io_error(dir, source))?;
    staged
        .write_all(body)
        .map_err(|source| io_error(staged.path(), source))?;
    let (_, path) = staged.keep().map_err(|err| io_error(dir, err.error))?;
    Ok(path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default())
}

fn remove_body(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != ErrorKind::NotFound {
            debug!(path = %path.display(), error = %err, "failed to remove cache body");
        }
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Body files start with the hex-encoded cache key, so distinct keys never collide.
fn body_file_prefix(key: &str) -> String {
    let hex: String = key.bytes().map(|byte| format!("{byte:02x}")).collect();
    format!("{hex}.")
}

fn sanitize_component(input: &str) -> String {
    let result: String = input
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        .collect();
    if result.is_empty() || result.chars().all(|ch| ch == '.') {
        "cache".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stores_and_reads_back_responses() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = DiskCacheStorage::new(dir.path().join("shell"));
        assert!(storage.cache_names()?.is_empty());
        assert_eq!(storage.lookup("guandan-web-v2", "/")?, None);

        let page = Response::ok("text/html", "<html>board</html>");
        storage.store("guandan-web-v2", "/", &page)?;
        storage.store("guandan-web-v2", "/icon-192.png", &Response::ok("image/png", vec![1, 2]))?;
        assert_eq!(storage.lookup("guandan-web-v2", "/")?, Some(page));

        let fresh = Response::ok("text/html", "<html>fresh</html>");
        storage.store("guandan-web-v2", "/", &fresh)?;
        assert_eq!(storage.lookup("guandan-web-v2", "/")?, Some(fresh));
        assert_eq!(
            storage.lookup("guandan-web-v2", "/icon-192.png")?.map(|r| r.body),
            Some(vec![1, 2])
        );
        Ok(())
    }

    #[test]
    fn generations_can_be_listed_and_deleted() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = DiskCacheStorage::new(dir.path());
        storage.store("guandan-web-v1", "/", &Response::ok("text/html", "v1"))?;
        storage.store("guandan-web-v2", "/", &Response::ok("text/html", "v2"))?;
        assert_eq!(storage.cache_names()?, vec!["guandan-web-v1", "guandan-web-v2"]);

        assert!(storage.delete_cache("guandan-web-v1")?);
        assert!(!storage.delete_cache("guandan-web-v1")?);
        assert_eq!(storage.cache_names()?, vec!["guandan-web-v2"]);
        Ok(())
    }

    #[test]
    fn corrupt_index_is_reported() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = DiskCacheStorage::new(dir.path());
        let generation = dir.path().join("guandan-web-v2");
        fs::create_dir_all(&generation)?;
        fs::write(generation.join(INDEX_FILE), "not json")?;
        let err = storage.lookup("guandan-web-v2", "/").unwrap_err();
        assert!(matches!(err, CacheError::Index { .. }));
        Ok(())
    }

    #[test]
    fn corrupt_index_is_rebuilt_by_the_next_store() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = DiskCacheStorage::new(dir.path());
        storage.store("guandan-web-v2", "/", &Response::ok("text/html", "old"))?;
        let index = dir.path().join("guandan-web-v2").join(INDEX_FILE);
        let contents = fs::read_to_string(&index)?;
        fs::write(&index, &contents[..contents.len() / 2])?;
        assert!(storage.lookup("guandan-web-v2", "/").is_err());

        let page = Response::ok("text/html", "healed");
        storage.store("guandan-web-v2", "/", &page)?;
        assert_eq!(storage.lookup("guandan-web-v2", "/")?, Some(page));
        Ok(())
    }

    #[test]
    fn overwriting_replaces_the_body_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = DiskCacheStorage::new(dir.path());
        storage.store("guandan-web-v2", "/", &Response::ok("text/html", "one"))?;
        storage.store("guandan-web-v2", "/", &Response::ok("text/html", "two"))?;

        let bodies = fs::read_dir(dir.path().join("guandan-web-v2"))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".body"))
            .count();
        assert_eq!(bodies, 1);
        Ok(())
    }

    #[test]
    fn readers_never_see_a_partial_overwrite() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = DiskCacheStorage::new(dir.path());
        let first = Response::ok("text/html", vec![b'a'; 256 * 1024]);
        let second = Response::ok("text/html", vec![b'b'; 256 * 1024]);
        storage.store("guandan-web-v2", "/", &first)?;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..100 {
                    let page = if round % 2 == 0 { &second } else { &first };
                    storage.store("guandan-web-v2", "/", page).unwrap();
                }
            });
            for _ in 0..300 {
                let found = storage.lookup("guandan-web-v2", "/").unwrap();
                let found = found.expect("entry disappeared during overwrite");
                assert!(found == first || found == second, "torn body");
            }
        });
        Ok(())
    }

    #[test]
    fn file_names_are_safe() {
        assert_eq!(body_file_prefix("/"), "2f.");
        assert_eq!(body_file_prefix("/a?b"), "2f613f62.");
        assert_eq!(sanitize_component("../../etc"), "....etc");
        assert_eq!(sanitize_component(".."), "cache");
        assert_eq!(sanitize_component("guandan-web-v2"), "guandan-web-v2");
    }
}
