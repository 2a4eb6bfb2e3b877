//! Rate-limit aware wrapper around a tracker

use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

use super::{Issue, IssueError, IssueResult, IssueTracker};

/// Retries calls that hit the rate limit, sleeping until the advertised
/// reset time but never longer than `max_wait`.
pub struct RetryingTracker<T> {
    inner: T,
    max_retries: u32,
    max_wait: Duration,
}

impl<T: IssueTracker> RetryingTracker<T> {
    pub fn new(inner: T, max_retries: u32, max_wait: Duration) -> Self {
        Self {
            inner,
            max_retries,
            max_wait,
        }
    }

    fn with_retry<R>(&self, mut call: impl FnMut(&T) -> IssueResult<R>) -> IssueResult<R> {
        let mut attempt = 0;
        loop {
            match call(&self.inner) {
                Err(IssueError::RateLimited { reset_at }) if attempt < self.max_retries => {
                    attempt += 1;
                    let wait = reset_at
                        .and_then(|at| (at - Utc::now()).to_std().ok())
                        .unwrap_or(self.max_wait)
                        .min(self.max_wait);
                    warn!(
                        "Rate limited, retry {}/{} in {}s",
                        attempt,
                        self.max_retries,
                        wait.as_secs()
                    );
                    std::thread::sleep(wait);
                }
                other => return other,
            }
        }
    }
}

impl<T: IssueTracker> IssueTracker for RetryingTracker<T> {
    fn labels(&self) -> IssueResult<HashSet<String>> {
        self.with_retry(|t| t.labels())
    }

    fn closed_issues(&self, label: &str) -> IssueResult<Vec<Issue>> {
        self.with_retry(|t| t.closed_issues(label))
    }

    fn commit_closing_issue(&self, issue: &Issue) -> IssueResult<Option<String>> {
        self.with_retry(|t| t.commit_closing_issue(issue))
    }
}

impl IssueTracker for Box<dyn IssueTracker> {
    fn labels(&self) -> IssueResult<HashSet<String>> {
        (**self).labels()
    }

    fn closed_issues(&self, label: &str) -> IssueResult<Vec<Issue>> {
        (**self).closed_issues(label)
    }

    fn commit_closing_issue(&self, issue: &Issue) -> IssueResult<Option<String>> {
        (**self).commit_closing_issue(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Flaky {
        failures: Cell<u32>,
        calls: Cell<u32>,
    }

    impl IssueTracker for Flaky {
        fn labels(&self) -> IssueResult<HashSet<String>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(IssueError::RateLimited { reset_at: None });
            }
            Ok(HashSet::from(["bug".to_string()]))
        }

        fn closed_issues(&self, _label: &str) -> IssueResult<Vec<Issue>> {
            Err(IssueError::NotFound("issues".into()))
        }

        fn commit_closing_issue(&self, _issue: &Issue) -> IssueResult<Option<String>> {
            Ok(None)
        }
    }

    fn flaky(failures: u32) -> Flaky {
        Flaky {
            failures: Cell::new(failures),
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_recovers_after_rate_limit() {
        let tracker = RetryingTracker::new(flaky(2), 3, Duration::ZERO);
        assert!(tracker.labels().unwrap().contains("bug"));
        assert_eq!(tracker.inner.calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_retries() {
        let tracker = RetryingTracker::new(flaky(5), 1, Duration::ZERO);
        let err = tracker.labels().unwrap_err();
        assert!(matches!(err, IssueError::RateLimited { .. }));
        assert_eq!(tracker.inner.calls.get(), 2);
    }

    #[test]
    fn test_other_errors_not_retried() {
        let tracker = RetryingTracker::new(flaky(0), 3, Duration::ZERO);
        assert!(matches!(
            tracker.closed_issues("bug").unwrap_err(),
            IssueError::NotFound(_)
        ));
    }
}
