//! Session guard: owns the bearer credential and decides whether a request
//! may go out.
//!
//! Two paths clear the credential:
//!
//! - pre-flight, when [`Session::authorize`] finds nothing usable;
//! - response-driven, when any call comes back 401/403 ([`Session::reject`]).
//!
//! Both end in the same state: credential removed from the store and a
//! single [`Route::Login`] emitted. Further failures before the next
//! [`Session::sign_in`] clear again but stay silent.
use std::{
    collections::BTreeMap,
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use thiserror::Error;

use crate::{
    error::{LedgerError, ResultLedger},
    navigation::{Navigator, Route},
};

/// Key the credential is persisted under.
pub const CREDENTIAL_KEY: &str = "token";

/// Serializations that mean "no token" when found in storage.
const ABSENT_MARKERS: [&str; 2] = ["undefined", "null"];

/// A usable bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for empty values and the literal absence markers.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || ABSENT_MARKERS.contains(&trimmed) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn bearer(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted client state holding the credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, value: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON file with one entry per well-known key.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<String> {
        match self.read() {
            Ok(mut entries) => entries.remove(CREDENTIAL_KEY),
            Err(err) => {
                tracing::warn!("unreadable session file {}: {err}", self.path.display());
                None
            }
        }
    }

    fn save(&self, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read().unwrap_or_default();
        entries.insert(CREDENTIAL_KEY.to_string(), value.to_string());
        self.write(&entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = match self.read() {
            Ok(entries) => entries,
            // A corrupt file holds no usable credential; overwrite it.
            Err(StoreError::Json(_)) => BTreeMap::new(),
            Err(err) => return Err(err),
        };
        if entries.remove(CREDENTIAL_KEY).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write(&entries)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    /// Store pre-filled with a raw value, which may be garbage on purpose.
    pub fn with_value(raw: &str) -> Self {
        Self {
            value: Mutex::new(Some(raw.to_string())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.value.lock().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, value: &str) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.value.lock() {
            *guard = Some(value.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.value.lock() {
            *guard = None;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("not authenticated")]
pub struct Denied;

impl From<Denied> for LedgerError {
    fn from(_: Denied) -> Self {
        LedgerError::Unauthorized
    }
}

/// Shared session context, threaded explicitly into every store.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Box<dyn CredentialStore>,
    navigator: Navigator,
    redirected: AtomicBool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("redirected", &self.inner.redirected.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: impl CredentialStore + 'static, navigator: Navigator) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                navigator,
                redirected: AtomicBool::new(false),
            }),
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }

    /// Pre-flight check run before every authenticated request.
    pub fn authorize(&self) -> Result<Credential, Denied> {
        match self.current() {
            Some(credential) => Ok(credential),
            None => {
                self.invalidate("no usable credential");
                Err(Denied)
            }
        }
    }

    /// Side-effect free variant of [`authorize`](Self::authorize).
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Response-driven invalidation for a 401/403 answer to a request sent
    /// with `rejected`. Ignored once that credential has been replaced.
    pub fn reject(&self, rejected: &Credential, status: u16) {
        if let Some(current) = self.current()
            && current != *rejected
        {
            tracing::debug!("ignoring {status} for a credential that was replaced");
            return;
        }
        self.invalidate(&format!("server answered {status}"));
    }

    /// Stores a freshly issued token and re-arms the login redirect.
    pub fn sign_in(&self, token: &str) -> ResultLedger<()> {
        let credential = Credential::parse(token).ok_or_else(|| {
            LedgerError::server(None, "login response did not carry a usable token")
        })?;
        self.inner
            .store
            .save(credential.bearer())
            .map_err(|err| LedgerError::server(None, format!("cannot persist session: {err}")))?;
        self.inner.redirected.store(false, Ordering::SeqCst);
        tracing::info!("session started");
        Ok(())
    }

    /// Explicit logout.
    pub fn sign_out(&self) {
        if let Err(err) = self.inner.store.clear() {
            tracing::error!("failed to clear session: {err}");
        }
        self.inner.redirected.store(true, Ordering::SeqCst);
        tracing::info!("session closed");
        self.inner.navigator.navigate(Route::Login);
    }

    fn current(&self) -> Option<Credential> {
        self.inner
            .store
            .load()
            .as_deref()
            .and_then(Credential::parse)
    }

    fn invalidate(&self, reason: &str) {
        if let Err(err) = self.inner.store.clear() {
            tracing::error!("failed to clear session: {err}");
        }
        if self.inner.redirected.swap(true, Ordering::SeqCst) {
            tracing::debug!("session already invalidated ({reason})");
            return;
        }
        tracing::warn!("session invalidated: {reason}");
        self.inner.navigator.navigate(Route::Login);
    }
}
