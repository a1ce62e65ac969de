//! NATS publisher for submission outcomes

use crate::types::SubmissionOutcome;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes outcomes to the request's reply subject, or to the result
/// subject when the submission carried none
#[derive(Clone)]
pub struct OutcomeProducer {
    client: Client,
    subject: String,
}

impl OutcomeProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish one outcome
    pub async fn publish(&self, reply: Option<Subject>, outcome: &SubmissionOutcome) -> Result<()> {
        let payload = serde_json::to_vec(outcome)?;

        let target = match reply {
            Some(reply) => reply,
            None => Subject::from(self.subject.as_str()),
        };
        self.client.publish(target.clone(), payload.into()).await?;

        debug!(
            submission_id = %outcome.submission_id,
            subject = %target,
            ok = outcome.is_ok(),
            "Published submission outcome"
        );

        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
