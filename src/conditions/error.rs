//! error types for condition evaluation

use thiserror::Error;

/// error raised while evaluating conditions or delivering state changes
///
/// evaluators are total over absent snapshot fields, so the only failures are
/// configuration values that cannot be interpreted at evaluation time and
/// snapshot patches that do not describe a valid state.
#[derive(Debug, Error)]
pub enum ConditionsError {
    /// a `user_agent_re` filter is not a valid regular expression
    #[error("invalid user agent pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// a state patch could not be applied to the current snapshot
    #[error("invalid state: {0}")]
    InvalidState(#[from] serde_json::Error),
}
