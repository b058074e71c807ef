use std::{collections::VecDeque, fs, io, path::PathBuf};

/// A new score within this fraction of the best still earns a checkpoint
pub const TOLERANCE: f64 = 0.98;

/// Decides which evaluations are worth persisting
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CheckpointPolicy {
    /// Nothing saved yet, the best score counts as 0.0
    #[default]
    NoCheckpointYet,

    /// The best macro-F1 seen at a save
    HasBest(f64),
}

impl CheckpointPolicy {
    /// The best score so far
    pub fn best(&self) -> f64 {
        match self {
            Self::NoCheckpointYet => 0.0,
            Self::HasBest(best) => *best,
        }
    }

    /// Whether `f1` falls inside the tolerance band of the best score
    pub fn should_save(&self, f1: f64) -> bool {
        self.best() * TOLERANCE < f1
    }

    /// Record an evaluation, returning whether a checkpoint should be written. The best score
    /// only ever rises.
    pub fn observe(&mut self, f1: f64) -> bool {
        if !self.should_save(f1) {
            return false;
        }

        *self = Self::HasBest(self.best().max(f1));

        true
    }
}

/// Keeps at most `retention` model files on disk, oldest removed first
#[derive(Debug)]
pub struct CheckpointStore {
    retention: usize,
    saved: VecDeque<PathBuf>,
}

impl CheckpointStore {
    /// Create a store that keeps `retention` files
    pub fn new(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            saved: VecDeque::new(),
        }
    }

    /// Model files currently kept, oldest first
    pub fn saved(&self) -> impl Iterator<Item = &PathBuf> {
        self.saved.iter()
    }

    /// Track a newly written model file and delete the ones that no longer fit
    pub fn push(&mut self, path: PathBuf) -> io::Result<Vec<PathBuf>> {
        self.saved.push_back(path);

        let mut removed = Vec::new();
        while self.saved.len() > self.retention {
            let Some(oldest) = self.saved.pop_front() else {
                break;
            };

            match fs::remove_file(&oldest) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }

            log::debug!("Removed checkpoint {}", oldest.display());
            removed.push(oldest);
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn saves_within_the_tolerance_band() {
        let mut policy = CheckpointPolicy::default();

        let saves: Vec<bool> = [0.40, 0.39, 0.41, 0.38]
            .into_iter()
            .map(|f1| policy.observe(f1))
            .collect();

        assert_eq!(saves, vec![true, false, true, false]);
        assert_eq!(policy, CheckpointPolicy::HasBest(0.41));
    }

    #[test]
    fn a_save_below_the_best_keeps_the_best() {
        let mut policy = CheckpointPolicy::default();

        assert!(policy.observe(0.5));
        assert!(policy.observe(0.495));
        assert_eq!(policy.best(), 0.5);
    }

    #[test]
    fn a_zero_score_never_saves() {
        let mut policy = CheckpointPolicy::default();

        assert!(!policy.observe(0.0));
        assert_eq!(policy, CheckpointPolicy::NoCheckpointYet);
    }

    #[test]
    fn prunes_the_oldest_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CheckpointStore::new(2);
        let paths: Vec<PathBuf> = (1..=3)
            .map(|step| dir.path().join(format!("model-{step}.mpk")))
            .collect();

        for path in &paths {
            fs::write(path, b"weights").unwrap();
        }

        assert!(store.push(paths[0].clone()).unwrap().is_empty());
        assert!(store.push(paths[1].clone()).unwrap().is_empty());
        assert_eq!(store.push(paths[2].clone()).unwrap(), vec![paths[0].clone()]);

        assert!(!paths[0].exists());
        assert!(paths[1].exists() && paths[2].exists());
        assert_eq!(store.saved().count(), 2);
    }
}
