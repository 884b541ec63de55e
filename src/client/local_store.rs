use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::error;
use crate::errors::ClientResult;
use crate::models::{CurrentUser, OvertimeData};

const USER_FILE: &str = "overtime_user.json";
const TOKEN_FILE: &str = "overtime_token";
const DATA_FILE: &str = "overtime_data.json";

/// A logged-in identity and its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: CurrentUser,
    pub token: String,
}

/// The three cache entries of one installation, one file each.
///
/// Clones share one write lock, so writes and clears land in call order.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    writes: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Restored only when both the user and the token are present.
    pub async fn load_session(&self) -> ClientResult<Option<Session>> {
        let Some(user) = read_optional(&self.dir.join(USER_FILE)).await? else {
            return Ok(None);
        };
        let Some(token) = read_optional(&self.dir.join(TOKEN_FILE)).await? else {
            return Ok(None);
        };

        let token = token.trim().to_string();
        if token.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<CurrentUser>(&user) {
            Ok(user) => Ok(Some(Session { user, token })),
            Err(err) => {
                error!("failed to parse cached user: {err}");
                Ok(None)
            }
        }
    }

    pub async fn save_session(&self, session: &Session) -> ClientResult<()> {
        let user = serde_json::to_vec(&session.user)?;
        self.write(USER_FILE, &user).await?;
        self.write(TOKEN_FILE, session.token.as_bytes()).await
    }

    /// A missing or unreadable cache starts empty rather than failing.
    pub async fn load_data(&self) -> OvertimeData {
        let path = self.dir.join(DATA_FILE);
        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(data) => data,
                Err(err) => {
                    error!("failed to parse data file {}: {err}", path.display());
                    OvertimeData::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => OvertimeData::default(),
            Err(err) => {
                error!("failed to read data file {}: {err}", path.display());
                OvertimeData::default()
            }
        }
    }

    pub async fn save_data(&self, data: &OvertimeData) -> ClientResult<()> {
        let payload = serde_json::to_vec(data)?;
        self.write(DATA_FILE, &payload).await
    }

    /// Removes all three entries.
    pub async fn clear(&self) -> ClientResult<()> {
        let _writing = self.writes.lock().await;
        for name in [USER_FILE, TOKEN_FILE, DATA_FILE] {
            match fs::remove_file(self.dir.join(name)).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    // Write-then-rename so a crash never leaves a half-written entry.
    async fn write(&self, name: &str, bytes: &[u8]) -> ClientResult<()> {
        let _writing = self.writes.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(name);
        let staging = self.dir.join(format!(".{name}.tmp"));
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &target).await?;
        Ok(())
    }
}

async fn read_optional(path: &Path) -> ClientResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
