use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::app::{Result, StoryError};

/// Credentials returned by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub token: String,
}

/// Read access to the signed-in identity.
pub trait SessionProvider {
    fn token(&self) -> Option<String>;

    fn user_name(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// Session persisted as a JSON file so it survives restarts.
pub struct FileSession {
    path: PathBuf,
    current: Mutex<Option<Session>>,
}

impl FileSession {
    /// Load the session stored at `path`. A missing or unreadable file means
    /// nobody is signed in.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let current = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Session>(&content) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoryError::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("storyline").join("session.json"))
    }

    pub fn store(&self, session: Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_private(&self.path, serde_json::to_string_pretty(&session)?.as_bytes())?;

        *self.lock()? = Some(session);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        *self.lock()? = None;
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|s| s.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>> {
        self.current
            .lock()
            .map_err(|e| StoryError::Config(format!("session lock poisoned: {}", e)))
    }
}

/// Write `contents` to `path`, readable by the owner only. The token in the
/// session is a bearer credential.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // `mode` only applies on creation; tighten files left by older runs.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

impl SessionProvider for FileSession {
    fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    fn user_name(&self) -> Option<String> {
        self.current().map(|s| s.name)
    }
}
