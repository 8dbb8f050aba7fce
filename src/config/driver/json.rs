//! JSON file driver
//!
//! One pretty-printed JSON document per namespace, stored at
//! `<data_dir>/<owner>/<salt>.json`. The document is loaded lazily, cached in
//! memory, and written through on every mutation by staging a temporary file
//! next to the target and renaming it into place.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Sync the directory after a rename; scope mappings are never replaced by leaves
//! - 1.1.0: Run mutations on a spawned task so a dropped caller cannot abandon a write
//! - 1.0.0: Initial write-through file driver

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use super::document::{assign, lookup, remove};
use super::{Driver, UpdateFn};
use crate::config::error::{kind_of, ConfigError, Result};
use crate::config::identifier::{Namespace, PathKey};
use crate::config::scope::ScopeKind;

type Document = Map<String, Value>;

/// File-backed driver for one namespace
pub struct FileDriver {
    namespace: Namespace,
    path: PathBuf,
    /// `None` until the document has been loaded successfully
    state: Arc<Mutex<Option<Document>>>,
}

impl FileDriver {
    pub fn new(data_dir: impl AsRef<Path>, namespace: Namespace) -> Self {
        let path = data_dir
            .as_ref()
            .join(namespace.owner())
            .join(format!("{}.json", namespace.salt()));

        Self {
            namespace,
            path,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_key(&self, key: &PathKey) -> Result<()> {
        if key.namespace() == &self.namespace {
            return Ok(());
        }
        Err(ConfigError::ForeignKey {
            owner: self.namespace.owner().to_string(),
            salt: self.namespace.salt().to_string(),
            key_owner: key.namespace().owner().to_string(),
            key_salt: key.namespace().salt().to_string(),
        })
    }

    /// Run a mutation against a working copy of the document and commit it.
    ///
    /// The closure returns its output and whether the document changed. The
    /// whole critical section runs on its own task holding the lock, so it
    /// finishes even if the caller stops waiting.
    async fn mutate<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Document) -> Result<(R, bool)> + Send + 'static,
        R: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let path = self.path.clone();

        let task = tokio::spawn(async move {
            let mut guard = state.lock_owned().await;
            let cached = loaded(&mut guard, &path).await?;

            let mut working = cached.clone();
            let (output, changed) = f(&mut working)?;
            if changed {
                persist(&path, &working).await?;
                *cached = working;
            }
            Ok::<R, ConfigError>(output)
        });

        task.await
            .map_err(|e| ConfigError::TaskFailed(e.to_string()))?
    }
}

#[async_trait]
impl Driver for FileDriver {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    async fn get(&self, key: &PathKey) -> Result<Value> {
        self.check_key(key)?;
        let path = key.document_path();

        let mut guard = self.state.lock().await;
        let doc = loaded(&mut guard, &self.path).await?;
        Ok(lookup(doc, &path)?
            .cloned()
            .unwrap_or_else(|| key.default_value().clone()))
    }

    async fn set(&self, key: &PathKey, value: Value) -> Result<()> {
        self.check_key(key)?;
        let path = key.document_path();

        self.mutate(move |doc| {
            assign(doc, &path, value)?;
            Ok(((), true))
        })
        .await
    }

    async fn clear(&self, key: &PathKey) -> Result<()> {
        self.check_key(key)?;
        let path = key.document_path();

        self.mutate(move |doc| {
            let removed = remove(doc, &path)?;
            Ok(((), removed))
        })
        .await
    }

    async fn update(&self, key: &PathKey, f: UpdateFn) -> Result<Value> {
        self.check_key(key)?;
        let path = key.document_path();
        let default = key.default_value().clone();

        self.mutate(move |doc| {
            let mut current = lookup(doc, &path)?.cloned().unwrap_or(default);
            f(&mut current);
            assign(doc, &path, current.clone())?;
            Ok((current, true))
        })
        .await
    }

    async fn get_all(&self, scope: ScopeKind) -> Result<Map<String, Value>> {
        let mut guard = self.state.lock().await;
        let doc = loaded(&mut guard, &self.path).await?;

        match doc.get(scope.name()) {
            None => Ok(Map::new()),
            Some(Value::Object(entries)) => Ok(entries.clone()),
            Some(other) => Err(ConfigError::Structural {
                path: vec![scope.name().to_string()],
                found: kind_of(other),
            }),
        }
    }

    async fn clear_all(&self, scope: ScopeKind) -> Result<()> {
        self.mutate(move |doc| {
            let removed = doc.remove(scope.name()).is_some();
            Ok(((), removed))
        })
        .await
    }
}

/// Cached document, loading it from disk on first use.
async fn loaded<'a>(slot: &'a mut Option<Document>, path: &Path) -> Result<&'a mut Document> {
    let doc = match slot.take() {
        Some(doc) => doc,
        None => load_document(path).await?,
    };
    Ok(slot.insert(doc))
}

async fn load_document(path: &Path) -> Result<Document> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No settings file at {}, starting empty", path.display());
            return Ok(Document::new());
        }
        Err(e) => return Err(ConfigError::io(path, e)),
    };

    let parsed: Value = serde_json::from_slice(&bytes).map_err(|e| {
        error!("Settings file {} is corrupt: {e}", path.display());
        ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    match parsed {
        Value::Object(doc) => {
            debug!("Loaded settings from {} ({} scopes)", path.display(), doc.len());
            Ok(doc)
        }
        other => {
            error!("Settings file {} does not hold a mapping", path.display());
            Err(ConfigError::Load {
                path: path.to_path_buf(),
                reason: format!("root is a {}, expected a mapping", kind_of(&other)),
            })
        }
    }
}

async fn persist(path: &Path, doc: &Document) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(doc)?;
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
        .await
        .map_err(|e| ConfigError::TaskFailed(e.to_string()))??;

    debug!("Persisted settings to {}", path.display());
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let staged = stage(path, bytes)?;
    commit(staged, path)
}

/// Write `bytes` to a temporary file beside `path`, flushed to disk.
///
/// Dropping the returned file without committing deletes it and leaves
/// `path` untouched.
fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!(".{name}.");

    let mut staged = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| ConfigError::io(dir, e))?;

    staged
        .write_all(bytes)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| ConfigError::io(staged.path(), e))?;

    Ok(staged)
}

/// Atomically replace `path` with a staged file and make the rename durable.
fn commit(staged: NamedTempFile, path: &Path) -> Result<()> {
    staged
        .persist(path)
        .map_err(|e| ConfigError::io(path, e.error))?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    sync_dir(dir).map_err(|e| ConfigError::io(dir, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

// Directory handles cannot be synced on this platform
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ns(owner: &str, salt: &str) -> Namespace {
        Namespace::new(owner, salt).unwrap()
    }

    fn key(namespace: &Namespace, scope: ScopeKind, ids: &[u64], fields: &[&str], default: Value) -> PathKey {
        PathKey::new(
            namespace.clone(),
            scope,
            ids.iter().map(|&id| id.into()).collect(),
            fields.iter().map(|s| s.to_string()).collect(),
            default,
        )
        .unwrap()
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        let prefixes = key(&core, ScopeKind::Global, &[], &["prefixes"], json!([]));
        driver.set(&prefixes, json!(["k", "!"])).await.unwrap();
        assert_eq!(driver.get(&prefixes).await.unwrap(), json!(["k", "!"]));

        let deep = key(&core, ScopeKind::Guild, &[9], &["a", "b", "c", "d"], json!(null));
        let value = json!({"list": [1, {"x": true}], "n": 1.5});
        driver.set(&deep, value.clone()).await.unwrap();
        assert_eq!(driver.get(&deep).await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_unset_key_returns_default_copy() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        let prefixes = key(&core, ScopeKind::Guild, &[12345], &["prefixes"], json!(["k", "!"]));
        let mut first = driver.get(&prefixes).await.unwrap();
        assert_eq!(first, json!(["k", "!"]));

        first.as_array_mut().unwrap().push(json!("?"));
        assert_eq!(driver.get(&prefixes).await.unwrap(), json!(["k", "!"]));
        assert!(!driver.path().exists());
    }

    #[tokio::test]
    async fn test_returned_value_is_detached_from_cache() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        let k = key(&core, ScopeKind::Global, &[], &["list"], json!([]));
        driver.set(&k, json!([1, 2])).await.unwrap();

        let mut got = driver.get(&k).await.unwrap();
        got.as_array_mut().unwrap().clear();
        assert_eq!(driver.get(&k).await.unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent_and_restores_default() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        let prefixes = key(&core, ScopeKind::Global, &[], &["prefixes"], json!(["k", "!"]));
        driver.clear(&prefixes).await.unwrap();

        driver.set(&prefixes, json!(["?"])).await.unwrap();
        driver.clear(&prefixes).await.unwrap();
        driver.clear(&prefixes).await.unwrap();
        assert_eq!(driver.get(&prefixes).await.unwrap(), json!(["k", "!"]));
    }

    #[tokio::test]
    async fn test_member_scope_key_isolation() {
        let dir = TempDir::new().unwrap();
        let stats = ns("stats", "0");
        let driver = FileDriver::new(dir.path(), stats.clone());

        driver
            .set(&key(&stats, ScopeKind::Member, &[1, 2], &["wins"], json!(0)), json!(5))
            .await
            .unwrap();

        assert_eq!(
            driver.get(&key(&stats, ScopeKind::Member, &[1, 2], &["wins"], json!(0))).await.unwrap(),
            json!(5)
        );
        assert_eq!(
            driver.get(&key(&stats, ScopeKind::Member, &[1, 3], &["wins"], json!(0))).await.unwrap(),
            json!(0)
        );
    }

    #[tokio::test]
    async fn test_owner_isolation_in_shared_directory() {
        let dir = TempDir::new().unwrap();
        let a = ns("alpha", "0");
        let b = ns("beta", "0");
        let driver_a = FileDriver::new(dir.path(), a.clone());
        let driver_b = FileDriver::new(dir.path(), b.clone());

        driver_a
            .set(&key(&a, ScopeKind::Global, &[], &["prefixes"], json!([])), json!(["a"]))
            .await
            .unwrap();

        assert_eq!(
            driver_b.get(&key(&b, ScopeKind::Global, &[], &["prefixes"], json!([]))).await.unwrap(),
            json!([])
        );
        assert_ne!(driver_a.path(), driver_b.path());
    }

    #[tokio::test]
    async fn test_foreign_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let driver = FileDriver::new(dir.path(), ns("alpha", "0"));
        let foreign = key(&ns("alpha", "1"), ScopeKind::Global, &[], &["x"], json!(null));

        assert!(matches!(
            driver.get(&foreign).await,
            Err(ConfigError::ForeignKey { .. })
        ));
        assert!(driver.set(&foreign, json!(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_document_survives_reload() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let k = key(&core, ScopeKind::Channel, &[42], &["enabled"], json!(false));

        FileDriver::new(dir.path(), core.clone()).set(&k, json!(true)).await.unwrap();

        let reopened = FileDriver::new(dir.path(), core.clone());
        assert_eq!(reopened.get(&k).await.unwrap(), json!(true));

        let on_disk: Value =
            serde_json::from_slice(&std::fs::read(reopened.path()).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"CHANNEL": {"42": {"enabled": true}}}));
    }

    #[tokio::test]
    async fn test_set_twice_writes_identical_bytes() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());
        let k = key(&core, ScopeKind::Global, &[], &["b"], json!(null));

        driver.set(&key(&core, ScopeKind::Global, &[], &["a"], json!(null)), json!(1)).await.unwrap();
        driver.set(&k, json!({"z": 1, "y": 2})).await.unwrap();
        let first = std::fs::read(driver.path()).unwrap();

        driver.set(&k, json!({"z": 1, "y": 2})).await.unwrap();
        let second = std::fs::read(driver.path()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());
        std::fs::create_dir_all(driver.path().parent().unwrap()).unwrap();
        std::fs::write(driver.path(), b"{\"GLOBAL\": {").unwrap();

        let k = key(&core, ScopeKind::Global, &[], &["x"], json!(1));
        assert!(matches!(driver.get(&k).await, Err(ConfigError::Load { .. })));
        assert!(matches!(driver.set(&k, json!(2)).await, Err(ConfigError::Load { .. })));
        // Still failing on the next call, and the file is left alone
        assert!(matches!(driver.get(&k).await, Err(ConfigError::Load { .. })));
        assert_eq!(std::fs::read(driver.path()).unwrap(), b"{\"GLOBAL\": {");
    }

    #[tokio::test]
    async fn test_non_mapping_root_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());
        std::fs::create_dir_all(driver.path().parent().unwrap()).unwrap();
        std::fs::write(driver.path(), b"[1, 2, 3]").unwrap();

        let k = key(&core, ScopeKind::Global, &[], &["x"], json!(1));
        assert!(matches!(driver.get(&k).await, Err(ConfigError::Load { .. })));
    }

    #[tokio::test]
    async fn test_structural_error_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        let leaf = key(&core, ScopeKind::Global, &[], &["name"], json!(null));
        driver.set(&leaf, json!("bot")).await.unwrap();
        let before = std::fs::read(driver.path()).unwrap();

        let through_leaf = key(&core, ScopeKind::Global, &[], &["name", "first"], json!(null));
        assert!(matches!(
            driver.set(&through_leaf, json!("x")).await,
            Err(ConfigError::Structural { .. })
        ));
        assert!(matches!(
            driver.get(&through_leaf).await,
            Err(ConfigError::Structural { .. })
        ));
        assert!(matches!(
            driver.clear(&through_leaf).await,
            Err(ConfigError::Structural { .. })
        ));

        assert_eq!(driver.get(&leaf).await.unwrap(), json!("bot"));
        assert_eq!(std::fs::read(driver.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_interrupted_write_keeps_committed_file() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());
        let k = key(&core, ScopeKind::Global, &[], &["prefixes"], json!([]));
        driver.set(&k, json!(["k"])).await.unwrap();
        let committed = std::fs::read(driver.path()).unwrap();

        // Stage a new version but never reach the replace step
        let staged = stage(driver.path(), b"{\"GLOBAL\": {\"prefixes\": [\"!\"]}}").unwrap();
        assert!(staged.path().exists());
        assert_eq!(std::fs::read(driver.path()).unwrap(), committed);

        drop(staged);
        let owner_dir = driver.path().parent().unwrap();
        assert!(temp_files(owner_dir).is_empty());
        assert_eq!(std::fs::read(driver.path()).unwrap(), committed);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_file_and_cache() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());
        let prefixes = key(&core, ScopeKind::Global, &[], &["prefixes"], json!([]));

        driver.set(&prefixes, json!(["!"])).await.unwrap();
        let committed = std::fs::read(driver.path()).unwrap();

        // Swap the owner directory for a plain file so staging cannot succeed
        let owner_dir = dir.path().join("core");
        let moved = dir.path().join("core.moved");
        std::fs::rename(&owner_dir, &moved).unwrap();
        std::fs::write(&owner_dir, b"not a directory").unwrap();

        let err = driver.set(&prefixes, json!(["?"])).await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(driver.get(&prefixes).await.unwrap(), json!(["!"]));

        std::fs::remove_file(&owner_dir).unwrap();
        std::fs::rename(&moved, &owner_dir).unwrap();
        assert_eq!(std::fs::read(driver.path()).unwrap(), committed);
        assert!(temp_files(&owner_dir).is_empty());

        driver.set(&prefixes, json!(["?"])).await.unwrap();
        let reloaded = FileDriver::new(dir.path(), core.clone());
        assert_eq!(reloaded.get(&prefixes).await.unwrap(), json!(["?"]));
    }

    #[tokio::test]
    async fn test_no_temp_files_after_writes() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        for i in 0..5u64 {
            let k = key(&core, ScopeKind::Guild, &[i], &["n"], json!(0));
            driver.set(&k, json!(i)).await.unwrap();
            driver.clear(&k).await.unwrap();
        }

        assert!(temp_files(driver.path().parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_sets_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = Arc::new(FileDriver::new(dir.path(), core.clone()));

        let mut tasks = Vec::new();
        for i in 0..32u64 {
            let driver = Arc::clone(&driver);
            let k = key(&core, ScopeKind::Global, &[], &[&format!("field_{i}")], json!(null));
            tasks.push(tokio::spawn(async move { driver.set(&k, json!(i)).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reopened = FileDriver::new(dir.path(), core.clone());
        for i in 0..32u64 {
            let k = key(&core, ScopeKind::Global, &[], &[&format!("field_{i}")], json!(null));
            assert_eq!(driver.get(&k).await.unwrap(), json!(i));
            assert_eq!(reopened.get(&k).await.unwrap(), json!(i));
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_increments() {
        let dir = TempDir::new().unwrap();
        let stats = ns("stats", "0");
        let driver = Arc::new(FileDriver::new(dir.path(), stats.clone()));
        let k = key(&stats, ScopeKind::Member, &[1, 2], &["messages"], json!(0));

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let driver = Arc::clone(&driver);
            let k = k.clone();
            tasks.push(tokio::spawn(async move {
                driver
                    .update(
                        &k,
                        Box::new(|v: &mut Value| *v = json!(v.as_u64().unwrap_or(0) + 1)),
                    )
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(driver.get(&k).await.unwrap(), json!(20));
    }

    #[tokio::test]
    async fn test_get_all_and_clear_all() {
        let dir = TempDir::new().unwrap();
        let core = ns("core", "0");
        let driver = FileDriver::new(dir.path(), core.clone());

        driver.set(&key(&core, ScopeKind::Guild, &[1], &["p"], json!(null)), json!("a")).await.unwrap();
        driver.set(&key(&core, ScopeKind::Guild, &[2], &["p"], json!(null)), json!("b")).await.unwrap();
        driver.set(&key(&core, ScopeKind::Global, &[], &["p"], json!(null)), json!("g")).await.unwrap();

        let guilds = driver.get_all(ScopeKind::Guild).await.unwrap();
        assert_eq!(Value::Object(guilds), json!({"1": {"p": "a"}, "2": {"p": "b"}}));

        driver.clear_all(ScopeKind::Guild).await.unwrap();
        assert!(driver.get_all(ScopeKind::Guild).await.unwrap().is_empty());
        assert_eq!(
            driver.get(&key(&core, ScopeKind::Global, &[], &["p"], json!(null))).await.unwrap(),
            json!("g")
        );
    }

    #[tokio::test]
    async fn test_clear_prunes_empty_scope_entries_on_disk() {
        let dir = TempDir::new().unwrap();
        let stats = ns("stats", "0");
        let driver = FileDriver::new(dir.path(), stats.clone());
        let k = key(&stats, ScopeKind::Member, &[1, 2], &["wins"], json!(0));

        driver.set(&k, json!(3)).await.unwrap();
        driver.clear(&k).await.unwrap();

        let on_disk: Value = serde_json::from_slice(&std::fs::read(driver.path()).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"MEMBER": {}}));
    }
}
