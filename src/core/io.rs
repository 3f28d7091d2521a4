use async_trait::async_trait;
use anyhow::Result;

/// Fixed key the API credential is stored under.
pub const CREDENTIAL_KEY: &str = "skitgen_api_key";

#[cfg(target_arch = "wasm32")]
pub trait StorageBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> StorageBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait StorageBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> StorageBounds for T {}

/// Where the user's API credential lives between sessions. An absent
/// credential is reported as `Ok(None)`, never as an error.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CredentialStore: StorageBounds {
    async fn load(&self) -> Result<Option<String>>;
    async fn save(&self, credential: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

// --- Native Implementation ---

#[cfg(not(target_arch = "wasm32"))]
pub struct FileCredentialStore {
    path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileCredentialStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIAL_KEY),
        }
    }

    /// `$SKITGEN_HOME`, or `.skitgen` in the working directory.
    pub fn default_location() -> Self {
        let dir = std::env::var("SKITGEN_HOME").unwrap_or_else(|_| ".skitgen".to_string());
        Self::new(dir)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let credential = content.trim();
        Ok((!credential.is_empty()).then(|| credential.to_string()))
    }

    async fn save(&self, credential: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, credential.trim()).await?;
        log::info!("Saved credential to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.path).await? {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

// --- Web Implementation ---

#[cfg(target_arch = "wasm32")]
use anyhow::anyhow;

#[cfg(target_arch = "wasm32")]
pub struct LocalCredentialStore {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalCredentialStore {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("No window available"))?;
        let storage = window
            .local_storage()
            .map_err(|e| anyhow!("localStorage error: {:?}", e))?
            .ok_or_else(|| anyhow!("localStorage unavailable"))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl CredentialStore for LocalCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        let value = self
            .storage
            .get_item(CREDENTIAL_KEY)
            .map_err(|e| anyhow!("Get error: {:?}", e))?;
        Ok(value.filter(|v| !v.trim().is_empty()))
    }

    async fn save(&self, credential: &str) -> Result<()> {
        self.storage
            .set_item(CREDENTIAL_KEY, credential.trim())
            .map_err(|e| anyhow!("Set error: {:?}", e))
    }

    async fn clear(&self) -> Result<()> {
        self.storage
            .remove_item(CREDENTIAL_KEY)
            .map_err(|e| anyhow!("Remove error: {:?}", e))
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileCredentialStore::new(dir.path().join("nested"));

        assert_eq!(store.load().await?, None);

        store.save("  sk-ant-123\n").await?;
        assert_eq!(store.load().await?.as_deref(), Some("sk-ant-123"));

        store.clear().await?;
        assert_eq!(store.load().await?, None);
        store.clear().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_file_is_not_configured() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(CREDENTIAL_KEY), "   \n")?;

        let store = FileCredentialStore::new(dir.path());
        assert_eq!(store.load().await?, None);
        Ok(())
    }
}
