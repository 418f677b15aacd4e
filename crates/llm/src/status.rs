//! Progress notifications.

use tracing::{error, info};

/// Receives status updates from the request layer. Observers must not
/// influence control flow; they only report.
pub trait StatusObserver: Send + Sync {
    fn notify(&self, message: &str, is_error: bool);
}

/// Forwards notifications to `tracing` at info / error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StatusObserver for LogObserver {
    fn notify(&self, message: &str, is_error: bool) {
        if is_error {
            error!("{message}");
        } else {
            info!("{message}");
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryObserver, StatusEvent};

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use std::sync::Mutex;

    use super::StatusObserver;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StatusEvent {
        pub message: String,
        pub is_error: bool,
    }

    /// Records every notification for later inspection.
    #[derive(Debug, Default)]
    pub struct MemoryObserver {
        events: Mutex<Vec<StatusEvent>>,
    }

    impl MemoryObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<StatusEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Messages beginning with `prefix`, in arrival order.
        pub fn starting_with(&self, prefix: &str) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.message.starts_with(prefix))
                .map(|e| e.message.clone())
                .collect()
        }

        pub fn error_count(&self) -> usize {
            self.events.lock().unwrap().iter().filter(|e| e.is_error).count()
        }
    }

    impl StatusObserver for MemoryObserver {
        fn notify(&self, message: &str, is_error: bool) {
            self.events.lock().unwrap().push(StatusEvent {
                message: message.to_string(),
                is_error,
            });
        }
    }
}
