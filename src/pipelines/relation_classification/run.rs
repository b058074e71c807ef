use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::utils::format::general;

/// Filesystem layout of one training run under `<runs_dir>/<unix timestamp>/`
#[derive(Clone, Debug, PartialEq)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Wrap an existing run directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a fresh run directory named after the current unix time, with its `summaries`
    /// and `checkpoints` subdirectories
    pub fn create(runs_dir: &Path) -> io::Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        let run = Self::new(runs_dir.join(timestamp.to_string()));
        run.ensure_dirs()?;

        Ok(run)
    }

    /// Create the subdirectories if they are missing
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.summaries_dir())?;
        fs::create_dir_all(self.checkpoints_dir())?;

        Ok(())
    }

    /// The run directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Saved vocabularies
    pub fn vocab_path(&self) -> PathBuf {
        self.root.join("vocab.json")
    }

    /// Saved training config
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Gold labels of the held-out split, in the configured prediction format
    pub fn answer_keys_path(&self) -> PathBuf {
        self.root.join("answer_keys.txt")
    }

    /// Per-step CSV summaries
    pub fn summaries_dir(&self) -> PathBuf {
        self.root.join("summaries")
    }

    /// Model checkpoints
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    /// Model path (without the recorder's extension) for a save at `step` scoring `f1`
    pub fn model_path(&self, f1: f64, step: usize) -> PathBuf {
        self.checkpoints_dir()
            .join(format!("model-{}-{}", general(f1, 3), step))
    }

    /// Prediction file written next to a checkpoint
    pub fn predictions_path(&self, f1: f64, step: usize) -> PathBuf {
        self.root
            .join(format!("predictions-{}-{}.txt", general(f1, 3), step))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn creates_the_run_layout() {
        let dir = tempfile::tempdir().unwrap();

        let run = RunDirectory::create(dir.path()).unwrap();

        assert_eq!(run.root().parent(), Some(dir.path()));
        assert!(run.summaries_dir().is_dir());
        assert!(run.checkpoints_dir().is_dir());
    }

    #[test]
    fn names_files_after_score_and_step() {
        let run = RunDirectory::new("runs/1700000000");

        assert_eq!(
            run.model_path(0.81234, 1200),
            PathBuf::from("runs/1700000000/checkpoints/model-0.812-1200")
        );
        assert_eq!(
            run.predictions_path(0.5, 300),
            PathBuf::from("runs/1700000000/predictions-0.5-300.txt")
        );
    }
}
