//! Retrying request layer.
//!
//! [`Transport::send`] never fails: a completion that cannot be obtained
//! within the retry budget comes back as an error string, and every attempt
//! is reported to the [`StatusObserver`].

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::provider::{LlmError, LlmProvider, Message};
use crate::retry::RetryPolicy;
use crate::status::StatusObserver;

/// How a [`Transport::send_detailed`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOutcome {
    Completed { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl TransportOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Completed { attempts } | Self::Exhausted { attempts } => attempts,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Response text (or terminal error string) plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub text: String,
    pub outcome: TransportOutcome,
}

pub struct Transport {
    provider: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
    observer: Arc<dyn StatusObserver>,
}

impl Transport {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        policy: RetryPolicy,
        observer: Arc<dyn StatusObserver>,
    ) -> Self {
        Self {
            provider,
            policy,
            observer,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Completion text, or a terminal error string once retries are exhausted.
    pub async fn send(&self, messages: &[Message]) -> String {
        self.send_detailed(messages).await.text
    }

    pub async fn send_detailed(&self, messages: &[Message]) -> Delivery {
        let max_attempts = self.policy.max_attempts();
        self.status(
            &format!("Preparing request with {} messages...", messages.len()),
            false,
        );

        let mut retry: u32 = 0;
        loop {
            let attempt = retry + 1;
            self.status(
                &format!(
                    "Sending request to {} (attempt {}/{})...",
                    self.provider.host(),
                    attempt,
                    max_attempts
                ),
                false,
            );
            self.status("Waiting for response...", false);

            let cause = match self.provider.complete(messages).await {
                Ok(text) => {
                    self.status("Response received, processing data...", false);
                    self.status("Processing completed successfully.", false);
                    debug!(attempt, chars = text.len(), "Completion received");
                    return Delivery {
                        text,
                        outcome: TransportOutcome::Completed { attempts: attempt },
                    };
                }
                Err(e) => describe(&e),
            };
            self.status(&cause, true);

            if retry >= self.policy.max_retries() {
                error!(attempts = attempt, cause = %cause, "Giving up on request");
                return Delivery {
                    text: format!("Error occurred after {attempt} attempts: {cause}"),
                    outcome: TransportOutcome::Exhausted { attempts: attempt },
                };
            }

            let delay = self.policy.delay_for(retry);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Request failed, backing off");
            self.status(
                &format!(
                    "Retrying in {:.1}s (retry {}/{})...",
                    delay.as_secs_f64(),
                    retry + 1,
                    self.policy.max_retries()
                ),
                false,
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    fn status(&self, message: &str, is_error: bool) {
        self.observer.notify(message, is_error);
    }
}

fn describe(error: &LlmError) -> String {
    match error {
        LlmError::ApiError { .. } => error.to_string(),
        other => format!("Error: {other}"),
    }
}
