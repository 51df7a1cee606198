//! What the dynamic pool does when a worker reports a page error.

use serde::{Deserialize, Serialize};

/// Per-conversion rule for a single page's render failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Fail the whole conversion on the first page error.
    #[default]
    Abort,
    /// Resend the page to the same worker once; a second failure aborts.
    Retry,
    /// Drop the page and carry on with the next one.
    #[serde(alias = "nextPage")]
    NextPage,
}

/// Coordinator's response to one reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    Abort,
    Retry,
    Skip,
}

impl FailurePolicy {
    /// Decide what to do with a failed page. `already_retried` is true when
    /// the worker has already been handed this page a second time.
    pub fn on_page_error(self, already_retried: bool) -> FailureAction {
        match self {
            FailurePolicy::Abort => FailureAction::Abort,
            FailurePolicy::Retry if already_retried => FailureAction::Abort,
            FailurePolicy::Retry => FailureAction::Retry,
            FailurePolicy::NextPage => FailureAction::Skip,
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Retry => "retry",
            FailurePolicy::NextPage => "next-page",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_always_aborts() {
        assert_eq!(FailurePolicy::Abort.on_page_error(false), FailureAction::Abort);
        assert_eq!(FailurePolicy::Abort.on_page_error(true), FailureAction::Abort);
    }

    #[test]
    fn retry_escalates_on_second_failure() {
        assert_eq!(FailurePolicy::Retry.on_page_error(false), FailureAction::Retry);
        assert_eq!(FailurePolicy::Retry.on_page_error(true), FailureAction::Abort);
    }

    #[test]
    fn next_page_skips() {
        assert_eq!(FailurePolicy::NextPage.on_page_error(false), FailureAction::Skip);
    }

    #[test]
    fn serde_accepts_both_spellings() {
        assert_eq!(
            serde_json::to_string(&FailurePolicy::NextPage).unwrap(),
            "\"next-page\""
        );
        let camel: FailurePolicy = serde_json::from_str("\"nextPage\"").unwrap();
        assert_eq!(camel, FailurePolicy::NextPage);
    }
}
