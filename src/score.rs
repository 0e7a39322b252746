use std::{fs, io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

/// The high score file: a single decimal integer.
#[derive(Clone, Debug)]
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ScoreStore { path: path.into() }
    }

    /// A missing or unreadable-as-a-number file counts as no high score yet.
    pub fn load(&self) -> Result<u32> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e).with_context(|| format!("reading high score from {}", self.path.display())),
        };

        match contents.trim().parse() {
            Ok(score) => Ok(score),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed high score file");
                Ok(0)
            }
        }
    }

    pub fn save(&self, score: u32) -> Result<()> {
        fs::write(&self.path, score.to_string())
            .with_context(|| format!("writing high score to {}", self.path.display()))
    }
}

pub struct ScoreKeeper {
    current: u32,
    high: u32,
}

impl ScoreKeeper {
    pub fn new(high: u32) -> Self {
        ScoreKeeper { current: 0, high }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn high(&self) -> u32 {
        self.high
    }

    pub fn record(&mut self, points: u32) {
        self.current += points;
        self.high = self.high.max(self.current);
    }

    /// Called once when the round ends. Writes the high score only if this
    /// round set it, and reports whether it did.
    pub fn finalize(&self, store: &ScoreStore) -> Result<bool> {
        if self.current != self.high {
            return Ok(false);
        }

        store.save(self.high)?;
        info!(score = self.high, "high score saved");
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// A fresh path under the system temp dir, unique per test.
    pub(crate) fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("banded-snake-{}-{}.hi", std::process::id(), name));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_means_zero() {
        let store = ScoreStore::new(scratch_file("missing"));
        assert_eq!(store.load().unwrap(), 0);
    }

    #[test]
    fn malformed_file_means_zero() {
        let path = scratch_file("malformed");
        fs::write(&path, "not a number").unwrap();
        assert_eq!(ScoreStore::new(&path).load().unwrap(), 0);
    }

    #[test]
    fn record_raises_high_score_immediately() {
        let mut scores = ScoreKeeper::new(5);
        scores.record(3);
        assert_eq!((scores.current(), scores.high()), (3, 5));
        scores.record(4);
        assert_eq!((scores.current(), scores.high()), (7, 7));
    }

    #[test]
    fn new_high_score_is_persisted() {
        let path = scratch_file("beaten");
        let store = ScoreStore::new(&path);
        store.save(10).unwrap();

        let mut scores = ScoreKeeper::new(store.load().unwrap());
        scores.record(12);
        assert!(scores.finalize(&store).unwrap());
        assert_eq!(store.load().unwrap(), 12);
        assert_eq!(fs::read_to_string(&path).unwrap(), "12");
    }

    #[test]
    fn lower_score_leaves_store_alone() {
        let store = ScoreStore::new(scratch_file("kept"));
        store.save(10).unwrap();

        let mut scores = ScoreKeeper::new(store.load().unwrap());
        scores.record(4);
        assert!(!scores.finalize(&store).unwrap());
        assert_eq!(store.load().unwrap(), 10);
    }
}
