//! Filesystem-backed JSON persistence for obligations, accounts and counterparties.
//!
//! The whole dataset lives in one snapshot file. Every write is a
//! read-modify-write under a process-wide lock followed by an atomic rename, so
//! the version check in `apply_payment` and the write that follows cannot
//! interleave with another writer in the same process.

use std::{
    cmp::Reverse,
    fs::{self, File},
    io::{self, Write},
    path::{Component, Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cassa_core::storage::{
    apply_payment_to, apply_status_to, Deadline, ObligationStore, PaymentRecord, StoreError,
    StoreResult,
};
use cassa_domain::{BankAccount, Counterparty, Decimal, Obligation, ObligationStatus};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
const DATA_FILE_NAME: &str = "cassa.json";
const BACKUP_PREFIX: &str = "cassa";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data_file: PathBuf,
    pub backups_dir: PathBuf,
}

impl StorePaths {
    /// `<root>/cassa.json` plus `<root>/backups/`.
    pub fn under(root: &Path) -> Self {
        Self {
            data_file: root.join(DATA_FILE_NAME),
            backups_dir: root.join("backups"),
        }
    }
}

/// Everything persisted by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "Snapshot::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub accounts: Vec<BankAccount>,
    #[serde(default)]
    pub counterparties: Vec<Counterparty>,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
}

impl Snapshot {
    fn schema_version() -> u32 {
        SNAPSHOT_SCHEMA_VERSION
    }

    fn obligation_mut(&mut self, id: Uuid) -> StoreResult<&mut Obligation> {
        self.obligations
            .iter_mut()
            .find(|obligation| obligation.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct JsonObligationStore {
    paths: StorePaths,
    retention: usize,
    write_lock: Mutex<()>,
}

impl JsonObligationStore {
    pub fn new(paths: StorePaths) -> StoreResult<Self> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StorePaths, retention: usize) -> StoreResult<Self> {
        if let Some(parent) = paths.data_file.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }
        fs::create_dir_all(&paths.backups_dir).map_err(unavailable)?;
        Ok(Self {
            paths,
            retention: retention.max(1),
            write_lock: Mutex::new(()),
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Current contents, or an empty snapshot when nothing was written yet.
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        load_snapshot(&self.paths.data_file)
    }

    pub fn add_account(&self, account: BankAccount) -> StoreResult<()> {
        self.mutate(|snapshot| {
            snapshot.accounts.push(account);
            Ok(())
        })
    }

    /// Sets the balance of the account named `bank_name`, creating it if needed.
    pub fn set_account_balance(&self, bank_name: &str, balance: Decimal) -> StoreResult<BankAccount> {
        let bank_name = bank_name.trim();
        if bank_name.is_empty() {
            return Err(StoreError::Write("account name cannot be empty".into()));
        }
        self.mutate(|snapshot| {
            let position = snapshot
                .accounts
                .iter()
                .position(|account| account.bank_name.eq_ignore_ascii_case(bank_name));
            let account = match position {
                Some(index) => {
                    let account = &mut snapshot.accounts[index];
                    account.current_balance = balance;
                    account.clone()
                }
                None => {
                    let account = BankAccount::new(bank_name, balance);
                    snapshot.accounts.push(account.clone());
                    account
                }
            };
            Ok(account)
        })
    }

    /// Finds a counterparty by case-insensitive name or registers a new one.
    pub fn upsert_counterparty(&self, name: &str) -> StoreResult<Counterparty> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Write("counterparty name cannot be empty".into()));
        }
        self.mutate(|snapshot| {
            if let Some(existing) = snapshot
                .counterparties
                .iter()
                .find(|counterparty| counterparty.name.eq_ignore_ascii_case(name))
            {
                return Ok(existing.clone());
            }
            let counterparty = Counterparty::new(name);
            snapshot.counterparties.push(counterparty.clone());
            Ok(counterparty)
        })
    }

    /// Copies the current data file into the backups directory.
    pub fn backup(&self, note: Option<&str>) -> StoreResult<BackupInfo> {
        let _guard = self.lock()?;
        let snapshot = load_snapshot(&self.paths.data_file)?;
        let mut stem = format!(
            "{BACKUP_PREFIX}_{}",
            Utc::now().format(BACKUP_TIMESTAMP_FORMAT)
        );
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        let name = format!("{stem}.{BACKUP_EXTENSION}");
        let path = self.paths.backups_dir.join(&name);
        let json = serialize(&snapshot)?;
        write_file(&path, &json).map_err(write_failed)?;
        self.prune_backups()?;
        info!(backup = %name, "store backup written");
        Ok(BackupInfo {
            created_at: parse_backup_timestamp(&name),
            size_bytes: json.len() as u64,
            name,
            path,
        })
    }

    /// Backups, newest first.
    pub fn list_backups(&self) -> StoreResult<Vec<BackupInfo>> {
        let dir = &self.paths.backups_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(unavailable)? {
            let path = entry.map_err(unavailable)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            entries.push(BackupInfo {
                name: name.to_string(),
                created_at: parse_backup_timestamp(name),
                size_bytes: fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0),
                path: path.clone(),
            });
        }
        entries.sort_by(|a, b| {
            Reverse(a.created_at)
                .cmp(&Reverse(b.created_at))
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    /// Replaces the data file with the named backup. `name` must be a bare
    /// file name inside the backups directory.
    pub fn restore_backup(&self, name: &str) -> StoreResult<Snapshot> {
        let _guard = self.lock()?;
        let not_found = || StoreError::Unavailable(format!("backup `{name}` not found"));
        if !is_plain_file_name(name) {
            return Err(not_found());
        }
        let path = self.paths.backups_dir.join(name);
        if !path.is_file() {
            return Err(not_found());
        }
        let snapshot = load_snapshot(&path)?;
        save_snapshot(&self.paths.data_file, &snapshot)?;
        info!(backup = %name, "store restored from backup");
        Ok(snapshot)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn mutate<T>(&self, update: impl FnOnce(&mut Snapshot) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.lock()?;
        let mut snapshot = load_snapshot(&self.paths.data_file)?;
        let value = update(&mut snapshot)?;
        save_snapshot(&self.paths.data_file, &snapshot)?;
        Ok(value)
    }

    fn read_with_deadline<T>(
        &self,
        deadline: Deadline,
        select: impl FnOnce(Snapshot) -> T,
    ) -> StoreResult<T> {
        deadline.check()?;
        let snapshot = load_snapshot(&self.paths.data_file)?;
        deadline.check()?;
        Ok(select(snapshot))
    }

    fn prune_backups(&self) -> StoreResult<()> {
        for stale in self.list_backups()?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&stale.path) {
                warn!(backup = %stale.name, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl ObligationStore for JsonObligationStore {
    fn list_active_accounts(&self, deadline: Deadline) -> StoreResult<Vec<BankAccount>> {
        self.read_with_deadline(deadline, |snapshot| {
            snapshot
                .accounts
                .into_iter()
                .filter(|account| account.is_active)
                .collect()
        })
    }

    fn list_open_obligations(&self, deadline: Deadline) -> StoreResult<Vec<Obligation>> {
        self.read_with_deadline(deadline, |snapshot| {
            snapshot
                .obligations
                .into_iter()
                .filter(|obligation| !obligation.is_settled())
                .collect()
        })
    }

    fn list_counterparties(&self, deadline: Deadline) -> StoreResult<Vec<Counterparty>> {
        self.read_with_deadline(deadline, |snapshot| snapshot.counterparties)
    }

    fn get_obligation(&self, id: Uuid) -> StoreResult<Obligation> {
        self.snapshot()?
            .obligations
            .into_iter()
            .find(|obligation| obligation.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    fn insert_obligation(&self, obligation: &Obligation) -> StoreResult<()> {
        self.mutate(|snapshot| {
            if snapshot
                .obligations
                .iter()
                .any(|existing| existing.id == obligation.id)
            {
                return Err(StoreError::Write(format!(
                    "obligation {} already exists",
                    obligation.id
                )));
            }
            snapshot.obligations.push(obligation.clone());
            Ok(())
        })
    }

    fn update_obligation_planned_date(
        &self,
        id: Uuid,
        date: Option<NaiveDate>,
    ) -> StoreResult<()> {
        self.mutate(|snapshot| {
            snapshot.obligation_mut(id)?.planned_settlement_date = date;
            Ok(())
        })
    }

    fn update_obligation_site(&self, id: Uuid, site_id: Option<Uuid>) -> StoreResult<()> {
        self.mutate(|snapshot| {
            snapshot.obligation_mut(id)?.site_id = site_id;
            Ok(())
        })
    }

    fn update_obligation_status(
        &self,
        id: Uuid,
        expected_version: u64,
        status: ObligationStatus,
    ) -> StoreResult<()> {
        self.mutate(|snapshot| apply_status_to(snapshot.obligation_mut(id)?, expected_version, status))
    }

    fn apply_payment(&self, payment: &PaymentRecord) -> StoreResult<Obligation> {
        self.mutate(|snapshot| {
            let obligation = snapshot.obligation_mut(payment.obligation_id)?;
            apply_payment_to(obligation, payment)?;
            Ok(obligation.clone())
        })
    }
}

/// Loads a snapshot; a missing file is an empty store.
pub fn load_snapshot(path: &Path) -> StoreResult<Snapshot> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no data file yet, starting empty");
            return Ok(Snapshot {
                schema_version: SNAPSHOT_SCHEMA_VERSION,
                ..Snapshot::default()
            });
        }
        Err(err) => return Err(unavailable(err)),
    };
    let snapshot: Snapshot = serde_json::from_str(&data)
        .map_err(|err| StoreError::Unavailable(format!("corrupt data file: {err}")))?;
    if snapshot.schema_version > SNAPSHOT_SCHEMA_VERSION {
        return Err(StoreError::Unavailable(format!(
            "data file schema {} is newer than supported {}",
            snapshot.schema_version, SNAPSHOT_SCHEMA_VERSION
        )));
    }
    Ok(snapshot)
}

/// Writes to a sibling temp file and renames it over `path`.
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> StoreResult<()> {
    let json = serialize(snapshot)?;
    let tmp = tmp_path(path);
    write_file(&tmp, &json).map_err(write_failed)?;
    fs::rename(&tmp, path).map_err(write_failed)?;
    Ok(())
}

fn serialize(snapshot: &Snapshot) -> StoreResult<String> {
    serde_json::to_string_pretty(snapshot).map_err(|err| StoreError::Write(err.to_string()))
}

fn unavailable(err: io::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn write_failed(err: io::Error) -> StoreError {
    StoreError::Write(err.to_string())
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !sanitized.is_empty() && !last_dash {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// True for a single normal path component, so `..`, `/x` and `a/b` are refused.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let rest = name.strip_prefix(BACKUP_PREFIX)?.strip_prefix('_')?;
    let stamp = rest.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()
}
