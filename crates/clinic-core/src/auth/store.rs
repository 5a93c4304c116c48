use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Fixed key under which the raw access token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Durable key-value slot holding the raw bearer token.
///
/// Absence of a value means "logged out". Implementations must make
/// `clear` idempotent: clearing an empty store is not an error.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores the token as a plain file named `token` inside a directory.
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_KEY)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let token = contents.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(token.to_string()))
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create token directory")?;
        let mut file = open_private(&self.token_path()).context("Failed to open token file")?;
        file.write_all(token.as_bytes())
            .context("Failed to write token file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// Open for writing, truncated, readable by the owner only.
#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Process-local store. Nothing survives a restart; used for tests and
/// the `memory` token backend.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.lock()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}
