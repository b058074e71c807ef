use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::{process::Command, time::timeout};

/// Runs an external scoring program over a prediction file and a gold file
#[derive(Clone, Debug)]
pub struct ExternalScorer {
    command: Vec<String>,
    gold: PathBuf,
    timeout: Duration,
}

impl ExternalScorer {
    /// `command` is the program followed by its leading arguments. The prediction and gold
    /// paths are appended on each call.
    pub fn new(command: Vec<String>, gold: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command,
            gold: gold.into(),
            timeout,
        }
    }

    /// Score `predictions`, returning the summary line of the program's output: the line
    /// before the final newline.
    pub async fn score(&self, predictions: &Path) -> Result<String, ScorerError> {
        let (program, args) = self.command.split_first().ok_or(ScorerError::NoCommand)?;

        let child = Command::new(program)
            .args(args)
            .arg(predictions)
            .arg(&self.gold)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScorerError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Dropping the child on timeout kills it
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScorerError::Timeout(self.timeout))?
            .map_err(ScorerError::Io)?;

        if !output.status.success() {
            return Err(ScorerError::Exit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);

        stdout
            .split('\n')
            .rev()
            .nth(1)
            .map(|line| line.trim_end_matches('\r').to_string())
            .ok_or(ScorerError::Malformed)
    }

    /// Score `predictions` and log the outcome. Failures are logged as warnings and never
    /// propagate.
    pub async fn report(&self, predictions: &Path) -> Option<String> {
        match self.score(predictions).await {
            Ok(summary) => {
                log::info!("{}", summary);

                Some(summary)
            }
            Err(err) => {
                log::warn!("Scorer failed for {}: {}", predictions.display(), err);

                None
            }
        }
    }
}

/// Scorer Error
#[derive(thiserror::Error, Debug)]
pub enum ScorerError {
    /// The configured command is empty
    #[error("no scorer command configured")]
    NoCommand,

    /// The program could not be started
    #[error("unable to start {program:?}: {source}")]
    Spawn {
        /// The program name
        program: String,

        /// The underlying error
        source: std::io::Error,
    },

    /// The program did not finish in time
    #[error("scorer timed out after {0:?}")]
    Timeout(Duration),

    /// The program exited unsuccessfully
    #[error("scorer exited with {status}: {stderr}")]
    Exit {
        /// The exit status
        status: ExitStatus,

        /// Whatever the program wrote to stderr
        stderr: String,
    },

    /// The output had no summary line
    #[error("scorer output has no summary line")]
    Malformed,

    /// Reading the program's output failed
    #[error(transparent)]
    Io(std::io::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn shell(script: &str, timeout: Duration) -> ExternalScorer {
        // `sh -c script name predictions gold`
        ExternalScorer::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "scorer".to_string(),
            ],
            "gold.txt",
            timeout,
        )
    }

    #[tokio::test]
    async fn returns_the_summary_line() {
        let scorer = shell(
            "printf 'detail\\nmacro-averaged F1 = 82.70%%\\n'",
            Duration::from_secs(5),
        );

        let summary = scorer.score(Path::new("predictions.txt")).await.unwrap();

        assert_eq!(summary, "macro-averaged F1 = 82.70%");
    }

    #[tokio::test]
    async fn passes_predictions_then_gold() {
        let scorer = shell("echo \"$1 $2\"", Duration::from_secs(5));

        let summary = scorer.score(Path::new("predictions.txt")).await.unwrap();

        assert_eq!(summary, "predictions.txt gold.txt");
    }

    #[tokio::test]
    async fn output_without_a_newline_is_malformed() {
        let scorer = shell("printf 'no newline'", Duration::from_secs(5));

        let err = scorer.score(Path::new("p.txt")).await.unwrap_err();

        assert!(matches!(err, ScorerError::Malformed));
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let scorer = shell("echo broken >&2; exit 3", Duration::from_secs(5));

        let err = scorer.score(Path::new("p.txt")).await.unwrap_err();

        match err {
            ScorerError::Exit { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn a_slow_scorer_times_out() {
        let scorer = shell("sleep 5", Duration::from_millis(100));

        let err = scorer.score(Path::new("p.txt")).await.unwrap_err();

        assert!(matches!(err, ScorerError::Timeout(_)));
    }

    #[tokio::test]
    async fn a_missing_program_is_reported_not_raised() {
        let scorer = ExternalScorer::new(
            vec!["relation-trainer-no-such-scorer".to_string()],
            "gold.txt",
            Duration::from_secs(1),
        );

        assert!(matches!(
            scorer.score(Path::new("p.txt")).await,
            Err(ScorerError::Spawn { .. })
        ));
        assert_eq!(scorer.report(Path::new("p.txt")).await, None);
    }

    #[tokio::test]
    async fn an_empty_command_is_an_error() {
        let scorer = ExternalScorer::new(Vec::new(), "gold.txt", Duration::from_secs(1));

        assert!(matches!(
            scorer.score(Path::new("p.txt")).await,
            Err(ScorerError::NoCommand)
        ));
    }
}
