use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use wizard_spec::{Submission, SubmissionSink};

/// Where completed submissions go: pretty JSON on stdout, or one JSON line per
/// submission appended to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliSink {
    Stdout,
    File(PathBuf),
}

impl CliSink {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => CliSink::File(path),
            None => CliSink::Stdout,
        }
    }
}

impl SubmissionSink for CliSink {
    type Error = io::Error;

    fn submit(&mut self, submission: &Submission) -> Result<(), Self::Error> {
        match self {
            CliSink::Stdout => {
                let pretty = submission.to_json_pretty().map_err(io::Error::other)?;
                println!("{}", pretty);
            }
            CliSink::File(path) => {
                let line = serde_json::to_string(submission).map_err(io::Error::other)?;
                let mut file = OpenOptions::new().create(true).append(true).open(&*path)?;
                writeln!(file, "{}", line)?;
                tracing::debug!(path = %path.display(), "submission written");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use tempfile::TempDir;

    fn submission(budget: i64) -> Submission {
        let mut answers = Map::new();
        answers.insert("budget".into(), json!(budget));
        Submission {
            form_id: "saas-onboarding".into(),
            form_version: "1.0.0".into(),
            answers,
        }
    }

    #[test]
    fn file_sink_appends_one_line_per_submission() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("submissions.jsonl");
        let mut sink = CliSink::from_path(Some(path.clone()));

        sink.submit(&submission(900)).expect("first");
        sink.submit(&submission(1500)).expect("second");

        let contents = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<Submission> = contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines, vec![submission(900), submission(1500)]);
    }

    #[test]
    fn missing_path_means_stdout() {
        assert_eq!(CliSink::from_path(None), CliSink::Stdout);
    }
}
