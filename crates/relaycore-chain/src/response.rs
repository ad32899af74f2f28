//! The response envelope produced by a [`crate::Chain`] execution.

use crate::metadata::Metadata;
use std::collections::HashMap;
use std::time::Duration;

/// Token-usage accounting, carried through for the agent-execution
/// framework that shares this chain; opaque to the chain itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens consumed by the request side of the exchange.
    pub prompt_tokens: u64,
    /// Tokens produced by the response side of the exchange.
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Sum of prompt and completion tokens.
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A response produced by the terminal handler, a short-circuiting cache
/// hit, or a middleware's `onError` suppression.
pub struct Response<Out, St> {
    /// The typed output payload.
    pub output: Option<Out>,
    /// Request-scoped state as left by the handler and `after` hooks.
    pub state: St,
    /// Observability and internal-signalling metadata.
    pub metadata: Metadata,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Wall-clock time spent executing the request, excluding short-circuit
    /// cache hits (which are zero per the chain's execution protocol).
    pub duration: Duration,
    /// Token accounting, if the handler reported any.
    pub token_usage: Option<TokenUsage>,
    /// A terminal error that survived every middleware's `onError`, if any.
    pub error: Option<String>,
}

impl<Out, St: Default> Response<Out, St> {
    /// Builds a response around `output` with zero duration and no error.
    pub fn new(output: Out) -> Self {
        Self {
            output: Some(output),
            state: St::default(),
            metadata: Metadata::new(),
            headers: HashMap::new(),
            duration: Duration::ZERO,
            token_usage: None,
            error: None,
        }
    }
}

impl<Out, St: Default> Default for Response<Out, St> {
    fn default() -> Self {
        Self {
            output: None,
            state: St::default(),
            metadata: Metadata::new(),
            headers: HashMap::new(),
            duration: Duration::ZERO,
            token_usage: None,
            error: None,
        }
    }
}

impl<Out, St> Response<Out, St> {
    /// Resets every field to a clean slate for return to an object pool.
    pub fn clear(&mut self, state: St) {
        self.output = None;
        self.state = state;
        self.metadata.clear();
        self.headers.clear();
        self.duration = Duration::ZERO;
        self.token_usage = None;
        self.error = None;
    }

    /// `true` if this response carries a terminal error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_totals() {
        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        assert_eq!(usage.total(), 15);
    }

    #[test]
    fn new_response_has_zero_duration_and_no_error() {
        let resp: Response<&str, ()> = Response::new("ok");
        assert_eq!(resp.duration, Duration::ZERO);
        assert!(!resp.is_error());
    }
}
