pub mod context;
pub mod history;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod status;
pub mod tokens;
pub mod transport;

pub use context::{ContextPolicy, RequestBuilder};
pub use history::{HistorySource, HistoryStore, Selection};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use retry::RetryPolicy;
pub use status::{LogObserver, StatusObserver};
pub use tokens::{default_estimator, HeuristicEstimator, TiktokenEstimator, TokenEstimator};
pub use transport::{Delivery, Transport, TransportOutcome};
