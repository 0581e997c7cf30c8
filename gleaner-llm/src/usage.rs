//! Token accounting for extraction runs.
//!
//! Every LLM call made by the extraction strategy is recorded here so a run
//! can report its spend once, at the end.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One recorded LLM request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageEntry {
    pub url: String,
    pub chunk: usize,
    pub usage: TokenUsage,
}

#[derive(Debug, Default)]
pub struct UsageTracker {
    history: Vec<UsageEntry>,
    total: TokenUsage,
}

impl UsageTracker {
    pub fn record(&mut self, url: &str, chunk: usize, usage: TokenUsage) {
        self.total.add(&usage);
        self.history.push(UsageEntry {
            url: url.to_string(),
            chunk,
            usage,
        });
    }

    pub fn summary(&self) -> UsageSummary {
        UsageSummary {
            requests: self.history.len(),
            total: self.total,
            history: self.history.clone(),
        }
    }
}

/// Snapshot of the usage recorded so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub requests: usize,
    pub total: TokenUsage,
    pub history: Vec<UsageEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_accumulate_across_requests() {
        let mut tracker = UsageTracker::default();
        tracker.record("https://x/1", 0, TokenUsage::new(100, 20));
        tracker.record("https://x/1", 1, TokenUsage::new(50, 5));

        let summary = tracker.summary();
        assert_eq!(summary.requests, 2);
        assert_eq!(summary.total, TokenUsage::new(150, 25));
        assert_eq!(summary.total.total_tokens, 175);
        assert_eq!(summary.history[1].chunk, 1);
    }
}
