//! Persist the best score (one integer) under the platform data dir, or keep it in memory.

use directories::ProjectDirs;
use log::warn;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "best_score";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no data directory for this user")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid best score: {0:?}")]
    Parse(String),
}

/// Read-best / write-best port injected into the session.
pub trait ScoreStore {
    fn load(&self) -> Result<u32, StoreError>;
    fn save(&mut self, best: u32) -> Result<(), StoreError>;
}

/// Per-user data directory (e.g. ~/.local/share/blocktui). Also holds the default log file.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    ProjectDirs::from("", "", "blocktui")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StoreError::NoDataDir)
}

/// Best score as a single decimal line in a file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_data_dir() -> Result<Self, StoreError> {
        Ok(Self::new(data_dir()?.join(FILENAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for FileStore {
    /// Missing file reads as 0.
    fn load(&self) -> Result<u32, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let line = content.lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Ok(0);
        }
        line.parse::<u32>()
            .map_err(|_| StoreError::Parse(line.to_string()))
    }

    /// Creates the parent directory if needed.
    fn save(&mut self, best: u32) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{best}\n"))?;
        Ok(())
    }
}

/// Session-only store (`--no-persist`, tests).
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    best: u32,
}

impl ScoreStore for MemoryStore {
    fn load(&self) -> Result<u32, StoreError> {
        Ok(self.best)
    }

    fn save(&mut self, best: u32) -> Result<(), StoreError> {
        self.best = best;
        Ok(())
    }
}

/// Cross-session best score. Drops to memory-only after the first store failure.
pub struct BestScore {
    value: u32,
    store: Option<Box<dyn ScoreStore>>,
}

impl std::fmt::Debug for BestScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestScore")
            .field("value", &self.value)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl BestScore {
    /// Load from `store`. A corrupt value reads as 0 (and is overwritten later);
    /// an unreadable store is abandoned for the session.
    pub fn open(store: Box<dyn ScoreStore>) -> Self {
        match store.load() {
            Ok(value) => Self {
                value,
                store: Some(store),
            },
            Err(StoreError::Parse(raw)) => {
                warn!("ignoring unreadable best score {raw:?}");
                Self {
                    value: 0,
                    store: Some(store),
                }
            }
            Err(e) => {
                warn!("best score storage unavailable ({e}); keeping it in memory");
                Self {
                    value: 0,
                    store: None,
                }
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            value: 0,
            store: None,
        }
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.value
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Raise the best to `score` if it is higher, writing through. Returns true if raised.
    pub fn offer(&mut self, score: u32) -> bool {
        if score <= self.value {
            return false;
        }
        self.value = score;
        let failed = match self.store.as_mut() {
            Some(store) => store.save(score).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("could not save best score ({e}); keeping it in memory");
            self.store = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("blocktui-test-{}", std::process::id()))
            .join(name)
    }

    struct Broken;

    impl ScoreStore for Broken {
        fn load(&self) -> Result<u32, StoreError> {
            Ok(10)
        }

        fn save(&mut self, _best: u32) -> Result<(), StoreError> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    struct Unreadable;

    impl ScoreStore for Unreadable {
        fn load(&self) -> Result<u32, StoreError> {
            Err(StoreError::NoDataDir)
        }

        fn save(&mut self, _best: u32) -> Result<(), StoreError> {
            panic!("store was abandoned, save must not be called");
        }
    }

    #[test]
    fn file_store_round_trip() {
        let path = temp_path("round_trip/best_score");
        let _ = fs::remove_file(&path);
        let mut store = FileStore::new(&path);
        assert_eq!(store.load().unwrap(), 0);
        store.save(123).unwrap();
        assert_eq!(store.load().unwrap(), 123);
        assert_eq!(fs::read_to_string(&path).unwrap(), "123\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_file_reads_as_zero_and_is_overwritten() {
        let path = temp_path("corrupt/best_score");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not a number").unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(StoreError::Parse(_))));

        let mut best = BestScore::open(Box::new(FileStore::new(&path)));
        assert_eq!(best.get(), 0);
        assert!(best.is_persistent());
        assert!(best.offer(5));
        assert_eq!(FileStore::new(&path).load().unwrap(), 5);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn offer_only_raises() {
        let mut store = MemoryStore::default();
        store.save(50).unwrap();
        let mut best = BestScore::open(Box::new(store));
        assert_eq!(best.get(), 50);
        assert!(!best.offer(50));
        assert!(!best.offer(10));
        assert!(best.offer(51));
        assert_eq!(best.get(), 51);
    }

    #[test]
    fn failed_save_degrades_to_memory() {
        let mut best = BestScore::open(Box::new(Broken));
        assert_eq!(best.get(), 10);
        assert!(best.offer(20));
        assert!(!best.is_persistent());
        assert!(best.offer(30));
        assert_eq!(best.get(), 30);
    }

    #[test]
    fn unreadable_store_starts_in_memory() {
        let mut best = BestScore::open(Box::new(Unreadable));
        assert_eq!(best.get(), 0);
        assert!(!best.is_persistent());
        assert!(best.offer(1));
    }
}
