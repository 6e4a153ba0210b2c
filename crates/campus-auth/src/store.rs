//! Credential persistence.
//!
//! One logical store over two physical sinks: a persistent key-value store
//! and a cookie store. The access credential is written to both so the
//! route guard, which can only see cookies, stays in sync with the request
//! gateway. The renewal credential is written to the key-value sink only,
//! keeping it out of the cookie surface entirely.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::claims::Role;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

/// Credential pair as read back from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access: Option<String>,
    pub renewal: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink traits
// ─────────────────────────────────────────────────────────────────────────────

/// Persistent key-value sink.
///
/// Implement this to connect the store to a storage backend. All methods
/// are synchronous; writers complete before control returns so no partial
/// state is observable across a suspension point.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Cookie attributes for the access-credential mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Duration,
}

/// Cookie sink.
///
/// The in-process jar stands in for the browser cookie store; the route
/// guard reads the same cookie name from incoming request headers.
pub trait CookieSink: Send + Sync + std::fmt::Debug {
    fn set(&self, cookie: Cookie);
    fn get(&self, name: &str) -> Option<String>;
    fn remove(&self, name: &str);
}

// ─────────────────────────────────────────────────────────────────────────────
// FileKeyValueStore
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk document backing [`FileKeyValueStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    entries: HashMap<String, String>,
    #[serde(default)]
    saved_at: Option<String>,
}

/// File-backed key-value sink for production use.
///
/// Persists a single JSON document and keeps an in-process cache so reads
/// after the first do not touch the filesystem.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    cached: Mutex<Option<StoreDocument>>,
}

impl FileKeyValueStore {
    /// Default store file name within the campus data directory.
    pub const STORE_FILE: &'static str = "session-store.json";

    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(Self::STORE_FILE),
            cached: Mutex::new(None),
        }
    }

    /// Create with a custom document path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    fn load(&self) -> Result<StoreDocument> {
        let mut cache = self.cached.lock();
        if let Some(doc) = cache.as_ref() {
            return Ok(doc.clone());
        }

        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AuthError::Storage(format!("failed to read store file: {}", e)))?;
        let doc: StoreDocument = serde_json::from_str(&content)
            .map_err(|e| AuthError::Storage(format!("failed to parse store file: {}", e)))?;

        *cache = Some(doc.clone());
        Ok(doc)
    }

    fn persist(&self, mut doc: StoreDocument) -> Result<()> {
        doc.saved_at = Some(chrono::Utc::now().to_rfc3339());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Storage(format!("failed to create store directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| AuthError::Storage(format!("failed to serialize store: {}", e)))?;
        std::fs::write(&self.path, json)
            .map_err(|e| AuthError::Storage(format!("failed to write store file: {}", e)))?;

        *self.cached.lock() = Some(doc);
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut doc = self.load()?;
        doc.entries.insert(key.to_string(), value.to_string());
        self.persist(doc)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut doc = self.load()?;
        if doc.entries.remove(key).is_some() {
            self.persist(doc)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory sinks (tests and embedded use)
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory key-value sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: std::sync::Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// In-memory cookie jar.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    cookies: std::sync::Arc<RwLock<HashMap<String, Cookie>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full cookie record, including attributes.
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies.read().get(name).cloned()
    }
}

impl CookieSink for MemoryCookieJar {
    fn set(&self, cookie: Cookie) {
        self.cookies.write().insert(cookie.name.clone(), cookie);
    }

    fn get(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).map(|c| c.value.clone())
    }

    fn remove(&self, name: &str) {
        self.cookies.write().remove(name);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CredentialStore
// ─────────────────────────────────────────────────────────────────────────────

/// The logical credential store.
///
/// All writers fully overwrite or fully clear; no partial-field mutation.
#[derive(Debug)]
pub struct CredentialStore {
    config: AuthConfig,
    kv: Box<dyn KeyValueStore>,
    cookies: Box<dyn CookieSink>,
}

impl CredentialStore {
    pub fn new(config: AuthConfig, kv: Box<dyn KeyValueStore>, cookies: Box<dyn CookieSink>) -> Self {
        Self { config, kv, cookies }
    }

    /// Persist a credential pair.
    ///
    /// The access credential goes to both sinks; the renewal credential
    /// never reaches the cookie sink.
    pub fn save(&self, access: &str, renewal: &str) -> Result<()> {
        self.kv.set(&self.config.access_key, access)?;
        self.kv.set(&self.config.renewal_key, renewal)?;
        self.cookies.set(Cookie {
            name: self.config.cookie_name.clone(),
            value: access.to_string(),
            path: self.config.cookie_path.clone(),
            max_age: self.config.cookie_max_age,
        });
        tracing::debug!("credentials saved");
        Ok(())
    }

    /// Read the stored credential pair.
    pub fn read(&self) -> Result<StoredCredentials> {
        Ok(StoredCredentials {
            access: self.kv.get(&self.config.access_key)?,
            renewal: self.kv.get(&self.config.renewal_key)?,
        })
    }

    /// Remove every stored entry: both credentials, the role hint, and the
    /// session cookie. Idempotent.
    pub fn clear(&self) -> Result<()> {
        self.kv.remove(&self.config.access_key)?;
        self.kv.remove(&self.config.renewal_key)?;
        self.kv.remove(&self.config.role_key)?;
        self.cookies.remove(&self.config.cookie_name);
        tracing::debug!("credentials cleared");
        Ok(())
    }

    /// Record the last-known role for route-guard-adjacent UI.
    pub fn set_role_hint(&self, role: Role) -> Result<()> {
        self.kv.set(&self.config.role_key, role.as_str())
    }

    /// Last-known role, if one was recorded and still parses.
    pub fn role_hint(&self) -> Result<Option<Role>> {
        Ok(self
            .kv
            .get(&self.config.role_key)?
            .as_deref()
            .and_then(Role::parse))
    }

    /// Current value of the session cookie, as the route guard would see it.
    pub fn cookie_value(&self) -> Option<String> {
        self.cookies.get(&self.config.cookie_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn memory_store() -> (CredentialStore, MemoryKeyValueStore, MemoryCookieJar) {
        let kv = MemoryKeyValueStore::new();
        let jar = MemoryCookieJar::new();
        let store = CredentialStore::new(
            AuthConfig::default(),
            Box::new(kv.clone()),
            Box::new(jar.clone()),
        );
        (store, kv, jar)
    }

    #[test]
    fn test_save_writes_both_sinks() {
        let (store, kv, jar) = memory_store();
        store.save("access-token", "renewal-token").unwrap();

        assert_eq!(
            kv.get("campus.access").unwrap().as_deref(),
            Some("access-token")
        );
        assert_eq!(
            kv.get("campus.renewal").unwrap().as_deref(),
            Some("renewal-token")
        );
        assert_eq!(jar.get("campus_session").as_deref(), Some("access-token"));
    }

    #[test]
    fn test_renewal_credential_never_reaches_cookie_sink() {
        let (store, _kv, jar) = memory_store();
        store.save("access-token", "renewal-token").unwrap();

        let cookie = jar.cookie("campus_session").unwrap();
        assert_eq!(cookie.value, "access-token");
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.max_age, Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn test_read_round_trip() {
        let (store, _, _) = memory_store();
        assert_eq!(store.read().unwrap(), StoredCredentials::default());

        store.save("a", "r").unwrap();
        let stored = store.read().unwrap();
        assert_eq!(stored.access.as_deref(), Some("a"));
        assert_eq!(stored.renewal.as_deref(), Some("r"));
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, kv, jar) = memory_store();
        store.save("a", "r").unwrap();
        store.set_role_hint(Role::Instructor).unwrap();

        store.clear().unwrap();

        assert_eq!(store.read().unwrap(), StoredCredentials::default());
        assert!(kv.get("campus.role").unwrap().is_none());
        assert!(jar.get("campus_session").is_none());

        // Idempotent.
        store.clear().unwrap();
    }

    #[test]
    fn test_role_hint_round_trip() {
        let (store, _, _) = memory_store();
        assert!(store.role_hint().unwrap().is_none());

        store.set_role_hint(Role::Student).unwrap();
        assert_eq!(store.role_hint().unwrap(), Some(Role::Student));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        store.set("campus.access", "tok").unwrap();

        let reopened = FileKeyValueStore::new(dir.path());
        assert_eq!(reopened.get("campus.access").unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn test_file_store_remove_missing_is_noop() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());
        store.remove("absent").unwrap();
        assert!(store.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(FileKeyValueStore::STORE_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let store = FileKeyValueStore::with_path(path);
        assert!(store.get("campus.access").is_err());
    }
}
