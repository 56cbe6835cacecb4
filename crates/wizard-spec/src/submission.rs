use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Final accumulated record handed to a [`SubmissionSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub form_id: String,
    pub form_version: String,
    pub answers: Record,
}

impl Submission {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

/// Receives the final record once the terminal step is reached. Transport,
/// retries and persistence belong to the sink.
pub trait SubmissionSink {
    type Error;

    fn submit(&mut self, submission: &Submission) -> Result<(), Self::Error>;
}

/// Collects submissions in memory.
impl SubmissionSink for Vec<Submission> {
    type Error = Infallible;

    fn submit(&mut self, submission: &Submission) -> Result<(), Self::Error> {
        self.push(submission.clone());
        Ok(())
    }
}
