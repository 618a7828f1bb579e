//! Identity handling: validation, persistence, and the in-memory gate
//!
//! The service attributes every mutation to a caller-chosen identity.
//! The gate holds the active identity in memory, backed by a pluggable
//! store so the console survives restarts without re-prompting.

use crate::errors::{ApiError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Where the identity survives between runs.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, identity: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Identity persisted as a single plain-text file.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed.to_string()))
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ApiError::Storage(err.to_string())),
        }
    }

    async fn save(&self, identity: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, identity).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ApiError::Storage(err.to_string())),
        }
    }
}

/// In-memory store used by tests across the crate.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryIdentityStore {
    value: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryIdentityStore {
    pub fn with_identity(identity: &str) -> Self {
        Self {
            value: std::sync::Mutex::new(Some(identity.to_string())),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.value.lock().unwrap().clone())
    }

    async fn save(&self, identity: &str) -> Result<()> {
        *self.value.lock().unwrap() = Some(identity.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.value.lock().unwrap() = None;
        Ok(())
    }
}

/// Check an identity against the service's naming rules, returning the
/// trimmed value on success.
pub fn validate_identity(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ApiError::Validation("identity is required".to_string()));
    }

    if trimmed.chars().count() < 3 {
        return Err(ApiError::Validation(
            "identity must be at least 3 characters".to_string(),
        ));
    }

    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !allowed {
        return Err(ApiError::Validation(
            "identity may only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

/// Holds the active identity and keeps the backing store in sync.
///
/// The store write happens before the in-memory update, so a failed
/// persist never leaves the gate claiming an identity that will be
/// gone on the next run.
pub struct IdentityGate {
    store: Box<dyn IdentityStore>,
    current: RwLock<Option<String>>,
}

impl IdentityGate {
    /// Build a gate, restoring any identity the store already holds.
    pub async fn load(store: Box<dyn IdentityStore>) -> Result<Self> {
        let current = store.load().await?;
        if current.is_some() {
            debug!("restored persisted identity");
        }
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    /// Validate, persist, and activate a new identity.
    pub async fn set(&self, raw: &str) -> Result<String> {
        let identity = validate_identity(raw)?;
        self.store.save(&identity).await?;
        let mut current = self.current.write().await;
        *current = Some(identity.clone());
        info!("identity set to {}", identity);
        Ok(identity)
    }

    /// Drop the active identity from memory and from the store.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        let mut current = self.current.write().await;
        *current = None;
        info!("identity cleared");
        Ok(())
    }

    pub async fn get(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn has(&self) -> bool {
        self.current.read().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FailingStore;

    #[async_trait]
    impl IdentityStore for FailingStore {
        async fn load(&self) -> Result<Option<String>> {
            Ok(None)
        }

        async fn save(&self, _identity: &str) -> Result<()> {
            Err(ApiError::Storage("disk full".to_string()))
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn validation_requires_a_value() {
        assert!(matches!(
            validate_identity(""),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_identity("   "),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn validation_requires_three_characters() {
        assert!(validate_identity("ab").is_err());
        assert!(validate_identity("abc").is_ok());
    }

    #[test]
    fn validation_restricts_the_character_set() {
        assert!(validate_identity("bad name").is_err());
        assert!(validate_identity("bad!name").is_err());
        assert_eq!(
            validate_identity("  alice_dev-1  ").unwrap(),
            "alice_dev-1"
        );
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("identity");
        let store = FileIdentityStore::new(&path);

        assert_eq!(store.load().await.unwrap(), None);

        store.save("alice").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("alice".to_string()));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Clearing twice stays quiet
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn gate_restores_persisted_identity() {
        let gate = IdentityGate::load(Box::new(MemoryIdentityStore::with_identity("bob")))
            .await
            .unwrap();
        assert!(gate.has().await);
        assert_eq!(gate.get().await, Some("bob".to_string()));
    }

    #[tokio::test]
    async fn gate_set_validates_persists_and_activates() {
        let gate = IdentityGate::load(Box::new(MemoryIdentityStore::default()))
            .await
            .unwrap();
        assert!(!gate.has().await);

        assert!(gate.set("x").await.is_err());
        assert!(!gate.has().await);

        let stored = gate.set(" carol-7 ").await.unwrap();
        assert_eq!(stored, "carol-7");
        assert_eq!(gate.get().await, Some("carol-7".to_string()));

        gate.clear().await.unwrap();
        assert!(!gate.has().await);
    }

    #[tokio::test]
    async fn gate_stays_empty_when_persist_fails() {
        let gate = IdentityGate::load(Box::new(FailingStore)).await.unwrap();
        let err = gate.set("dave").await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
        assert!(!gate.has().await);
    }
}
