use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use chrono::{DateTime, Local, NaiveDate};
use tokio::fs;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tracing::{debug, info, warn};
use crate::client::{ApiClient, LocalStore, Session};
use crate::config::ClientConfig;
use crate::errors::{ClientError, ClientResult};
use crate::models::{Credentials, CurrentUser, DayStatus, MonthKey, MonthStats, OvertimeData};

const MIN_PASSWORD_LEN: usize = 6;

/// Human-readable state of the last full sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Synced,
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncStatus::Idle => "Not synced yet",
            SyncStatus::Syncing => "Syncing data...",
            SyncStatus::Synced => "Data synced",
            SyncStatus::Failed => "Sync failed, using local data",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotLoggedIn,
    AlreadySyncing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { at: DateTime<Local> },
    Skipped(SkipReason),
}

struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One user's session: the cached dataset, the bearer token and sync bookkeeping.
///
/// At most one full sync runs at a time. Per-day uploads are spawned in the
/// background, capped at `max_pending_uploads` in flight, and may overlap a sync.
pub struct OvertimeTracker {
    api: ApiClient,
    local: LocalStore,
    session: RwLock<Option<Session>>,
    data: Mutex<OvertimeData>,
    last_sync: RwLock<Option<DateTime<Local>>>,
    status: RwLock<SyncStatus>,
    is_syncing: AtomicBool,
    uploads: Arc<Semaphore>,
    max_pending_uploads: u32,
}

impl OvertimeTracker {
    pub async fn open(config: &ClientConfig) -> ClientResult<Self> {
        let api = ApiClient::new(&config.api_base_url);
        let local = LocalStore::new(config.resolve_data_dir());
        Self::load(api, local, config.max_pending_uploads).await
    }

    /// Restores whatever the local cache holds; no network traffic.
    pub async fn load(api: ApiClient, local: LocalStore, max_pending_uploads: usize) -> ClientResult<Self> {
        let session = local.load_session().await?;
        let data = local.load_data().await;
        let permits = max_pending_uploads.clamp(1, 1024);

        if let Some(session) = &session {
            debug!("restored session for {}", session.user.username);
        }

        Ok(Self {
            api,
            local,
            session: RwLock::new(session),
            data: Mutex::new(data),
            last_sync: RwLock::new(None),
            status: RwLock::new(SyncStatus::Idle),
            is_syncing: AtomicBool::new(false),
            uploads: Arc::new(Semaphore::new(permits)),
            max_pending_uploads: permits as u32,
        })
    }

    pub async fn current_user(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user.username.clone())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn data(&self) -> OvertimeData {
        self.data.lock().await.clone()
    }

    pub async fn day_status(&self, date: NaiveDate) -> DayStatus {
        self.data.lock().await.day_status(date)
    }

    pub async fn month_stats(&self, month: &MonthKey) -> MonthStats {
        self.data.lock().await.month_stats(month)
    }

    pub async fn last_sync(&self) -> Option<DateTime<Local>> {
        *self.last_sync.read().await
    }

    pub async fn status(&self) -> SyncStatus {
        *self.status.read().await
    }

    async fn token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub async fn register(&self, username: &str, password: &str, confirm: &str) -> ClientResult<String> {
        let (username, password) = (username.trim(), password.trim());

        if username.is_empty() || password.is_empty() {
            return Err(ClientError::Validation("Enter a username and password".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ClientError::Validation("Password must be at least 6 characters".into()));
        }
        if password != confirm.trim() {
            return Err(ClientError::Validation("Passwords do not match".into()));
        }

        self.api.register(&Credentials::new(username, password)).await
    }

    /// Stores the new session locally. Does not sync; call [`Self::sync`] next.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let (username, password) = (username.trim(), password.trim());
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::Validation("Enter a username and password".into()));
        }

        let response = self.api.login(&Credentials::new(username, password)).await?;
        let session = Session {
            user: CurrentUser { username: username.to_string() },
            token: response.token,
        };

        self.local.save_session(&session).await?;
        *self.session.write().await = Some(session);
        info!("logged in as {}", username);
        Ok(())
    }

    /// Forgets the session and the cached dataset.
    pub async fn logout(&self) -> ClientResult<()> {
        let mut data = self.data.lock().await;
        self.local.clear().await?;
        *data = OvertimeData::new();
        drop(data);
        *self.session.write().await = None;
        *self.last_sync.write().await = None;
        *self.status.write().await = SyncStatus::Idle;
        Ok(())
    }

    /// Pull, merge, persist, push. Skipped when logged out or when another sync is running.
    ///
    /// On failure the local dataset is left as it was.
    pub async fn sync(&self) -> ClientResult<SyncOutcome> {
        let Some(token) = self.token().await else {
            return Ok(SyncOutcome::Skipped(SkipReason::NotLoggedIn));
        };
        if self
            .is_syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadySyncing));
        }
        let _guard = SyncGuard(&self.is_syncing);

        *self.status.write().await = SyncStatus::Syncing;
        match self.run_sync(&token).await {
            Ok(at) => {
                *self.status.write().await = SyncStatus::Synced;
                Ok(SyncOutcome::Synced { at })
            }
            Err(err) => {
                warn!("sync failed: {err}");
                *self.status.write().await = SyncStatus::Failed;
                Err(err)
            }
        }
    }

    async fn run_sync(&self, token: &str) -> ClientResult<DateTime<Local>> {
        let remote = self.api.fetch_data(token).await?;

        let merged = {
            let mut data = self.data.lock().await;
            let merged = OvertimeData::merge(&data, remote);
            self.local.save_data(&merged).await?;
            *data = merged.clone();
            merged
        };

        if let Err(err) = self.api.save_data(token, &merged).await {
            warn!("failed to push merged data: {err}");
        }

        let now = Local::now();
        *self.last_sync.write().await = Some(now);
        info!("synced {} month(s)", merged.len());
        Ok(now)
    }

    /// Advances one day through normal -> half -> full and returns the new status.
    pub async fn cycle_day(&self, date: NaiveDate) -> ClientResult<DayStatus> {
        self.write_local(|data| data.cycle_day(date)).await
    }

    pub async fn set_day(&self, date: NaiveDate, status: DayStatus) -> ClientResult<()> {
        self.write_local(|data| data.set_day(date, status)).await
    }

    /// Drops a whole month and waits for the server copy to be replaced.
    pub async fn reset_month(&self, month: &MonthKey) -> ClientResult<bool> {
        let (removed, snapshot) = {
            let mut data = self.data.lock().await;
            let mut next = data.clone();
            let removed = next.remove_month(month);
            self.local.save_data(&next).await?;
            *data = next.clone();
            (removed, next)
        };

        if let Some(token) = self.token().await {
            if let Err(err) = self.api.save_data(&token, &snapshot).await {
                warn!("failed to upload after reset of {month}: {err}");
            }
        }
        Ok(removed)
    }

    /// Writes the dataset as pretty JSON into `dir` and returns the file path.
    pub async fn export_to(&self, dir: &Path) -> ClientResult<PathBuf> {
        let owner = self
            .current_user()
            .await
            .unwrap_or_else(|| "anonymous".to_string());
        let path = dir.join(format!(
            "overtime_{}_{}.json",
            owner,
            Local::now().format("%Y-%m-%d")
        ));

        let payload = serde_json::to_vec_pretty(&self.data().await)?;
        fs::create_dir_all(dir).await?;
        fs::write(&path, payload).await?;
        Ok(path)
    }

    /// Merges an exported file into the local dataset, the file winning on shared months.
    /// A file that does not parse leaves everything untouched.
    pub async fn import_from(&self, path: &Path) -> ClientResult<usize> {
        let bytes = fs::read(path).await?;
        let imported: OvertimeData = serde_json::from_slice(&bytes)
            .map_err(|err| ClientError::InvalidImport(err.to_string()))?;
        let months = imported.len();

        self.write_local(move |data| {
            *data = OvertimeData::merge(data, imported);
        })
        .await?;
        Ok(months)
    }

    /// Waits until every background upload has finished.
    pub async fn flush_uploads(&self) {
        if let Ok(permits) = self.uploads.acquire_many(self.max_pending_uploads).await {
            drop(permits);
        }
    }

    // The cache is written before memory changes, under the data lock, so
    // disk and memory agree after every call, failed ones included.
    async fn write_local<T>(&self, mutate: impl FnOnce(&mut OvertimeData) -> T) -> ClientResult<T> {
        let (result, snapshot) = {
            let mut data = self.data.lock().await;
            let mut next = data.clone();
            let result = mutate(&mut next);
            self.local.save_data(&next).await?;
            *data = next.clone();
            (result, next)
        };
        self.push_in_background(snapshot).await;
        Ok(result)
    }

    // Best effort: failures are logged and never reach the caller.
    async fn push_in_background(&self, snapshot: OvertimeData) {
        let Some(token) = self.token().await else {
            return;
        };
        let Ok(permit) = self.uploads.clone().acquire_owned().await else {
            return;
        };

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(err) = api.save_data(&token, &snapshot).await {
                warn!("background upload failed: {err}");
            }
            drop(permit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Nothing listens on port 1, so every request fails fast.
    const DEAD_SERVER: &str = "http://127.0.0.1:1";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn tracker(dir: &TempDir) -> OvertimeTracker {
        OvertimeTracker::load(ApiClient::new(DEAD_SERVER), LocalStore::new(dir.path()), 2)
            .await
            .unwrap()
    }

    async fn logged_in_tracker(dir: &TempDir) -> OvertimeTracker {
        LocalStore::new(dir.path())
            .save_session(&Session {
                user: CurrentUser { username: "alice".into() },
                token: "stale-token".into(),
            })
            .await
            .unwrap();
        tracker(dir).await
    }

    #[tokio::test]
    async fn sync_without_token_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir).await;
        assert_eq!(
            tracker.sync().await.unwrap(),
            SyncOutcome::Skipped(SkipReason::NotLoggedIn)
        );
        assert_eq!(tracker.status().await, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn concurrent_sync_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = logged_in_tracker(&dir).await;
        tracker.is_syncing.store(true, Ordering::SeqCst);

        assert_eq!(
            tracker.sync().await.unwrap(),
            SyncOutcome::Skipped(SkipReason::AlreadySyncing)
        );
    }

    #[tokio::test]
    async fn failed_sync_keeps_local_data() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = logged_in_tracker(&dir).await;
        tracker.set_day(date(2024, 3, 5), DayStatus::Full).await.unwrap();
        tracker.flush_uploads().await;

        assert!(matches!(tracker.sync().await, Err(ClientError::Http(_))));
        assert_eq!(tracker.status().await, SyncStatus::Failed);
        assert_eq!(tracker.day_status(date(2024, 3, 5)).await, DayStatus::Full);
        assert!(tracker.last_sync().await.is_none());
        assert!(!tracker.is_syncing.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn local_writes_persist_while_offline() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir).await;
        let day = date(2024, 3, 5);

        assert_eq!(tracker.cycle_day(day).await.unwrap(), DayStatus::Half);
        assert_eq!(tracker.cycle_day(day).await.unwrap(), DayStatus::Full);

        let reopened = self::tracker(&dir).await;
        assert_eq!(reopened.day_status(day).await, DayStatus::Full);

        assert_eq!(tracker.cycle_day(day).await.unwrap(), DayStatus::Normal);
        assert!(tracker.data().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_day_writes_all_reach_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(tracker(&dir).await);

        let handles: Vec<_> = (1..=28)
            .map(|day| {
                let tracker = Arc::clone(&tracker);
                tokio::spawn(async move { tracker.set_day(date(2024, 3, day), DayStatus::Full).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let in_memory = tracker.data().await;
        assert_eq!(in_memory.month("2024-3").unwrap().len(), 28);
        assert_eq!(LocalStore::new(dir.path()).load_data().await, in_memory);
    }

    #[tokio::test]
    async fn failed_cache_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // a directory in place of the data file makes every rename onto it fail
        std::fs::create_dir(dir.path().join("overtime_data.json")).unwrap();
        let tracker = tracker(&dir).await;

        assert!(matches!(
            tracker.set_day(date(2024, 3, 5), DayStatus::Full).await,
            Err(ClientError::Io(_))
        ));
        assert!(tracker.cycle_day(date(2024, 3, 6)).await.is_err());
        assert!(tracker.data().await.is_empty());
        assert_eq!(tracker.day_status(date(2024, 3, 5)).await, DayStatus::Normal);
        assert!(LocalStore::new(dir.path()).load_data().await.is_empty());
    }

    #[tokio::test]
    async fn register_checks_inputs_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir).await;

        for (user, pass, confirm) in [
            ("", "secret1", "secret1"),
            ("alice", "short", "short"),
            ("alice", "secret1", "secret2"),
        ] {
            assert!(matches!(
                tracker.register(user, pass, confirm).await,
                Err(ClientError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn reset_month_removes_only_that_month() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir).await;
        tracker.set_day(date(2024, 3, 5), DayStatus::Full).await.unwrap();
        tracker.set_day(date(2024, 4, 1), DayStatus::Half).await.unwrap();

        assert!(tracker.reset_month(&"2024-3".parse().unwrap()).await.unwrap());
        assert!(!tracker.reset_month(&"2024-3".parse().unwrap()).await.unwrap());

        let data = tracker.data().await;
        assert!(!data.contains_month("2024-3"));
        assert!(data.contains_month("2024-4"));
    }

    #[tokio::test]
    async fn export_then_import_merges_file_over_local() {
        let dir = tempfile::tempdir().unwrap();
        let exports = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir).await;
        tracker.set_day(date(2024, 1, 2), DayStatus::Full).await.unwrap();

        let path = tracker.export_to(exports.path()).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("overtime_anonymous_"));
        assert!(name.ends_with(".json"));

        tracker.set_day(date(2024, 1, 2), DayStatus::Half).await.unwrap();
        tracker.set_day(date(2024, 2, 9), DayStatus::Full).await.unwrap();

        assert_eq!(tracker.import_from(&path).await.unwrap(), 1);
        assert_eq!(tracker.day_status(date(2024, 1, 2)).await, DayStatus::Full);
        assert_eq!(tracker.day_status(date(2024, 2, 9)).await, DayStatus::Full);
    }

    #[tokio::test]
    async fn malformed_import_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(&dir).await;
        tracker.set_day(date(2024, 1, 2), DayStatus::Full).await.unwrap();
        let before = tracker.data().await;

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, br#"{"2024-1": {"2": "double"}}"#).unwrap();

        assert!(matches!(
            tracker.import_from(&bad).await,
            Err(ClientError::InvalidImport(_))
        ));
        assert_eq!(tracker.data().await, before);
    }

    #[tokio::test]
    async fn logout_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = logged_in_tracker(&dir).await;
        assert_eq!(tracker.current_user().await.as_deref(), Some("alice"));
        tracker.set_day(date(2024, 1, 2), DayStatus::Full).await.unwrap();
        tracker.flush_uploads().await;

        tracker.logout().await.unwrap();
        assert!(!tracker.is_logged_in().await);
        assert!(tracker.data().await.is_empty());

        let reopened = self::tracker(&dir).await;
        assert!(!reopened.is_logged_in().await);
        assert!(reopened.data().await.is_empty());
    }
}
