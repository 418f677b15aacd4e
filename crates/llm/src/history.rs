//! Append-only conversation history with token-budgeted views.

use std::sync::Arc;

use crate::provider::Message;
use crate::tokens::TokenEstimator;

/// Which history a budgeted view reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Assistant,
    User,
    /// User and assistant entries interleaved round by round.
    Combined,
}

/// A contiguous, chronologically ordered suffix of a history timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub messages: Vec<Message>,
    pub tokens: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    message: Message,
    tokens: usize,
}

/// Prior inputs and responses of one pipeline run.
///
/// Token costs are computed once on append with the store's estimator.
pub struct HistoryStore {
    estimator: Arc<dyn TokenEstimator>,
    user: Vec<Entry>,
    assistant: Vec<Entry>,
}

impl HistoryStore {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            estimator,
            user: Vec::new(),
            assistant: Vec::new(),
        }
    }

    pub fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    pub fn append_response(&mut self, text: impl Into<String>) {
        let message = Message::assistant(text);
        let tokens = self.estimator.estimate(&message.content);
        self.assistant.push(Entry { message, tokens });
    }

    pub fn append_input_echo(&mut self, text: impl Into<String>) {
        let message = Message::user(text);
        let tokens = self.estimator.estimate(&message.content);
        self.user.push(Entry { message, tokens });
    }

    pub fn user_len(&self) -> usize {
        self.user.len()
    }

    pub fn assistant_len(&self) -> usize {
        self.assistant.len()
    }

    pub fn limited_user(&self, max_tokens: i64) -> Selection {
        self.limited(HistorySource::User, max_tokens)
    }

    pub fn limited_assistant(&self, max_tokens: i64) -> Selection {
        self.limited(HistorySource::Assistant, max_tokens)
    }

    pub fn limited_combined(&self, max_tokens: i64) -> Selection {
        self.limited(HistorySource::Combined, max_tokens)
    }

    /// Most recent entries of `source` that fit in `max_tokens`.
    ///
    /// Walks newest to oldest and stops at the first entry that would
    /// overflow the budget; older entries are never considered after that.
    pub fn limited(&self, source: HistorySource, max_tokens: i64) -> Selection {
        if max_tokens <= 0 {
            return Selection::default();
        }
        let budget = max_tokens as u64;

        let timeline = self.timeline(source);
        let mut picked: Vec<&Entry> = Vec::new();
        let mut total: u64 = 0;
        for entry in timeline.iter().rev() {
            let cost = entry.tokens as u64;
            if total + cost > budget {
                break;
            }
            total += cost;
            picked.push(entry);
        }
        picked.reverse();

        Selection {
            messages: picked.into_iter().map(|e| e.message.clone()).collect(),
            tokens: total as usize,
        }
    }

    /// Latest user entry then latest assistant entry, each if present.
    pub fn latest_pair(&self) -> Vec<Message> {
        self.user
            .last()
            .into_iter()
            .chain(self.assistant.last())
            .map(|e| e.message.clone())
            .collect()
    }

    fn timeline(&self, source: HistorySource) -> Vec<&Entry> {
        match source {
            HistorySource::User => self.user.iter().collect(),
            HistorySource::Assistant => self.assistant.iter().collect(),
            HistorySource::Combined => {
                let rounds = self.user.len().max(self.assistant.len());
                let mut timeline = Vec::with_capacity(self.user.len() + self.assistant.len());
                for i in 0..rounds {
                    timeline.extend(self.user.get(i));
                    timeline.extend(self.assistant.get(i));
                }
                timeline
            }
        }
    }
}
