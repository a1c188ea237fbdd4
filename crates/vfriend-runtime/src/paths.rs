//! On-disk layout for per-title save data.
//!
//! ```text
//! <save_dir>/Saves/<title>.sav
//! <save_dir>/Savestates/<title>/<yyyy-MM-dd HH-mm-ss>.savestate
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Local};

use crate::error::RuntimeError;

const SAVES_DIR: &str = "Saves";
const SAVESTATES_DIR: &str = "Savestates";
const RAM_EXTENSION: &str = "sav";
const SAVESTATE_EXTENSION: &str = "savestate";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Title used to key save files: the file name up to its first `.`.
///
/// `Wario Land.vb` and `Wario Land.backup.vb` both map to `Wario Land`.
pub fn title_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name.into_owned(),
    }
}

/// Formats `time` as `yyyy-MM-dd HH-mm-ss` in the local time zone.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Save locations for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePaths {
    root: PathBuf,
    title: String,
}

impl SavePaths {
    pub fn new(root: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ram_file(&self) -> PathBuf {
        self.root
            .join(SAVES_DIR)
            .join(format!("{}.{RAM_EXTENSION}", self.title))
    }

    pub fn savestate_dir(&self) -> PathBuf {
        self.root.join(SAVESTATES_DIR).join(&self.title)
    }

    pub fn savestate_file(&self, time: SystemTime) -> PathBuf {
        self.savestate_dir()
            .join(format!("{}.{SAVESTATE_EXTENSION}", format_timestamp(time)))
    }

    /// Reads saved RAM. A missing file yields `Ok(None)`.
    pub fn read_ram(&self) -> Result<Option<Vec<u8>>, RuntimeError> {
        let path = self.ram_file();
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(RuntimeError::io(path, err)),
        }
    }

    pub fn write_ram(&self, ram: &[u8]) -> Result<PathBuf, RuntimeError> {
        let path = self.ram_file();
        write_creating_dirs(&path, ram)?;
        Ok(path)
    }

    pub fn write_savestate(&self, time: SystemTime, bytes: &[u8]) -> Result<PathBuf, RuntimeError> {
        let path = self.savestate_file(time);
        write_creating_dirs(&path, bytes)?;
        Ok(path)
    }

    /// Save states for this title, newest first.
    pub fn list_savestates(&self) -> Result<Vec<PathBuf>, RuntimeError> {
        let dir = self.savestate_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RuntimeError::io(dir, err)),
        };

        let mut states = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| RuntimeError::io(&dir, err))?.path();
            if path.extension().is_some_and(|ext| ext == SAVESTATE_EXTENSION) {
                states.push(path);
            }
        }
        // Timestamps sort lexicographically.
        states.sort_by(|a, b| b.cmp(a));
        Ok(states)
    }
}

fn write_creating_dirs(path: &Path, bytes: &[u8]) -> Result<(), RuntimeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| RuntimeError::io(parent, err))?;
    }
    fs::write(path, bytes).map_err(|err| RuntimeError::io(path, err))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use chrono::{NaiveDateTime, Utc};

    use super::*;

    #[test]
    fn title_stops_at_first_dot() {
        assert_eq!(title_from_path(Path::new("/roms/Red Alarm.vb")), "Red Alarm");
        assert_eq!(title_from_path(Path::new("Tele.Ro.Boxer.vb")), "Tele");
        assert_eq!(title_from_path(Path::new("noext")), "noext");
    }

    #[test]
    fn timestamp_is_local_wall_clock_time() {
        // 2024-02-29 13:05:09 UTC
        let leap = UNIX_EPOCH + Duration::from_secs(1_709_211_909);
        for time in [UNIX_EPOCH, leap] {
            let formatted = format_timestamp(time);
            let expected = DateTime::<Utc>::from(time).with_timezone(&Local);
            assert_eq!(formatted, expected.format("%Y-%m-%d %H-%M-%S").to_string());

            let parsed = NaiveDateTime::parse_from_str(&formatted, TIMESTAMP_FORMAT).unwrap();
            assert_eq!(parsed, expected.naive_local());
            assert_eq!(formatted.len(), "yyyy-MM-dd HH-mm-ss".len());
        }
    }

    #[test]
    fn layout_under_save_dir() {
        let paths = SavePaths::new("/data", "Galactic Pinball");
        assert_eq!(
            paths.ram_file(),
            Path::new("/data/Saves/Galactic Pinball.sav")
        );
        let stamp = format_timestamp(UNIX_EPOCH);
        assert_eq!(
            paths.savestate_file(UNIX_EPOCH),
            Path::new("/data/Savestates/Galactic Pinball").join(format!("{stamp}.savestate"))
        );
    }

    #[test]
    fn ram_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavePaths::new(dir.path(), "Jack Bros");
        assert_eq!(paths.read_ram().unwrap(), None);

        paths.write_ram(&[1, 2, 3]).unwrap();
        assert_eq!(paths.read_ram().unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn savestates_listed_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavePaths::new(dir.path(), "Vertical Force");
        assert!(paths.list_savestates().unwrap().is_empty());

        let older = paths.write_savestate(UNIX_EPOCH, b"old").unwrap();
        let newer = paths
            .write_savestate(UNIX_EPOCH + Duration::from_secs(90), b"new")
            .unwrap();
        fs::write(paths.savestate_dir().join("notes.txt"), b"ignored").unwrap();

        assert_eq!(paths.list_savestates().unwrap(), vec![newer, older]);
    }
}
