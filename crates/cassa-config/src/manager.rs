use std::{
    fs,
    io::Write,
    path::{Component, Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{Config, ConfigError};

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// File name of a configuration snapshot: `config_<stamp>[_<slug>].json`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BackupName {
    taken_at: Option<DateTime<Utc>>,
    file_name: String,
}

impl BackupName {
    const PREFIX: &'static str = "config_";
    const SUFFIX: &'static str = ".json";

    fn create(taken_at: DateTime<Utc>, note: Option<&str>) -> Self {
        let stamp = taken_at.format(STAMP_FORMAT);
        let file_name = match note.and_then(slug) {
            Some(slug) => format!("{}{stamp}_{slug}{}", Self::PREFIX, Self::SUFFIX),
            None => format!("{}{stamp}{}", Self::PREFIX, Self::SUFFIX),
        };
        Self {
            taken_at: Some(taken_at),
            file_name,
        }
    }

    /// Any `.json` file is listed; the stamp is optional so hand-copied files still show up.
    fn parse(file_name: &str) -> Option<Self> {
        file_name.strip_suffix(Self::SUFFIX)?;
        let taken_at = file_name
            .strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.get(..15))
            .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok())
            .map(|naive| naive.and_utc());
        Some(Self {
            taken_at,
            file_name: file_name.to_string(),
        })
    }
}

/// Loads, saves and snapshots [`Config`] on disk.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            config_path,
            backups_dir,
        }
    }

    /// Lays out `<base>/config/config.json` and `<base>/config/backups/`.
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        let root = base.join("config");
        let manager = Self::new(root.join("config.json"), root.join("backups"));
        fs::create_dir_all(&manager.backups_dir)?;
        Ok(manager)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Missing file yields defaults; an unreadable or invalid one is an error.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.is_file() {
            return Ok(Config::default());
        }
        let config = decode(&fs::read_to_string(&self.config_path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates, then replaces the file through a sibling `.tmp`.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;
        let staging = self.config_path.with_extension("json.tmp");
        persist(&staging, &encode(config)?)?;
        fs::rename(&staging, &self.config_path)?;
        Ok(())
    }

    /// Writes a timestamped copy and returns its file name.
    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, ConfigError> {
        let name = BackupName::create(Utc::now(), note);
        persist(&self.backups_dir.join(&name.file_name), &encode(config)?)?;
        Ok(name.file_name)
    }

    /// Makes the named snapshot the current configuration.
    pub fn restore(&self, backup_name: &str) -> Result<Config, ConfigError> {
        let not_found = || ConfigError::BackupNotFound(backup_name.to_string());
        let mut components = Path::new(backup_name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(not_found());
        }
        let path = self.backups_dir.join(backup_name);
        if !path.is_file() {
            return Err(not_found());
        }
        let config = decode(&fs::read_to_string(&path)?)?;
        self.save(&config)?;
        Ok(config)
    }

    /// Backup file names, newest first; unstamped files sort last.
    pub fn list_backups(&self) -> Result<Vec<String>, ConfigError> {
        let entries = match fs::read_dir(&self.backups_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let file_name = entry?.file_name();
            if let Some(name) = file_name.to_str().and_then(BackupName::parse) {
                backups.push(name);
            }
        }
        backups.sort_by(|a, b| {
            b.taken_at
                .cmp(&a.taken_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(backups.into_iter().map(|name| name.file_name).collect())
    }
}

fn decode(data: &str) -> Result<Config, ConfigError> {
    serde_json::from_str(data).map_err(|err| ConfigError::Serde(err.to_string()))
}

fn encode(config: &Config) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(config).map_err(|err| ConfigError::Serde(err.to_string()))
}

/// Lowercase ASCII words joined by single dashes; `None` when nothing survives.
fn slug(note: &str) -> Option<String> {
    let words: Vec<String> = note
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    (!words.is_empty()).then(|| words.join("-"))
}

fn persist(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_become_slugs() {
        assert_eq!(slug(" Prima della chiusura Q3! "), Some("prima-della-chiusura-q3".into()));
        assert_eq!(slug("***"), None);
    }

    #[test]
    fn backup_names_carry_their_stamp() {
        let taken_at = NaiveDateTime::parse_from_str("20250314_093000", STAMP_FORMAT)
            .expect("stamp")
            .and_utc();
        let created = BackupName::create(taken_at, Some("fine mese"));
        assert_eq!(created.file_name, "config_20250314_093000_fine-mese.json");
        assert_eq!(BackupName::parse(&created.file_name), Some(created));

        let loose = BackupName::parse("notes.json").expect("json file");
        assert!(loose.taken_at.is_none());
        assert!(BackupName::parse("config_20250314_093000.txt").is_none());
    }
}
