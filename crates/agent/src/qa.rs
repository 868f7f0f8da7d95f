//! QA retry controller.
//!
//! An article is written once, then reviewed up to `max_attempts` times.
//! A failed review's output (the reviewer's rewrite plus its report) is the
//! draft for the next review. The controller knows nothing about what the
//! write and review steps do or persist.
//!
//! ```text
//! Writing -> Reviewing(1) -> Passed(1)
//!                         -> Revising(1) -> Reviewing(2) -> ... -> Flagged
//! ```

use std::future::Future;

use contentcrew_config::PassMarker;
use contentcrew_core::error::QaError;
use serde::Serialize;
use tracing::{debug, info, warn};

/// How a review's text is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassPolicy {
    /// The last `QA Status:` line must read `PASSED`.
    #[default]
    StatusLine,
    /// `PASSED` appears anywhere, in any case.
    Anywhere,
}

impl PassPolicy {
    pub fn is_passed(self, review: &str) -> bool {
        match self {
            Self::StatusLine => status_line_passed(review),
            Self::Anywhere => review.to_uppercase().contains("PASSED"),
        }
    }
}

impl From<PassMarker> for PassPolicy {
    fn from(marker: PassMarker) -> Self {
        match marker {
            PassMarker::StatusLine => Self::StatusLine,
            PassMarker::Anywhere => Self::Anywhere,
        }
    }
}

const STATUS_LABEL: &str = "qa status:";

fn status_line_passed(review: &str) -> bool {
    let Some(line) = review
        .lines()
        .rev()
        .find(|l| l.to_ascii_lowercase().contains(STATUS_LABEL))
    else {
        return false;
    };

    let lower = line.to_ascii_lowercase();
    let Some(pos) = lower.find(STATUS_LABEL) else {
        return false;
    };
    let value = line[pos + STATUS_LABEL.len()..]
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '`' | '_'));
    let token: String = value.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    token.eq_ignore_ascii_case("passed")
}

/// Where a controller run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum QaState {
    Writing,
    Reviewing(u32),
    Revising(u32),
    Passed(u32),
    Flagged(u32),
}

/// Input to one review.
#[derive(Debug, Clone)]
pub struct ReviewRound {
    /// 1-based
    pub attempt: u32,
    pub max_attempts: u32,
    pub draft: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QaOutcome {
    /// The last review's text.
    pub text: String,
    pub passed: bool,
    pub attempts: u32,
    pub transitions: Vec<QaState>,
}

#[derive(Debug, Clone, Copy)]
pub struct QaController {
    max_attempts: u32,
    policy: PassPolicy,
}

impl QaController {
    pub fn new(max_attempts: u32) -> Result<Self, QaError> {
        if max_attempts == 0 {
            return Err(QaError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            policy: PassPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: PassPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn policy(&self) -> PassPolicy {
        self.policy
    }

    /// Write once, then review until a pass or the attempt budget runs out.
    ///
    /// Errors from either step abort the run and propagate unchanged.
    pub async fn run<E, W, WF, R, RF>(&self, write: W, mut review: R) -> Result<QaOutcome, E>
    where
        W: FnOnce() -> WF,
        WF: Future<Output = Result<String, E>>,
        R: FnMut(ReviewRound) -> RF,
        RF: Future<Output = Result<String, E>>,
    {
        let mut transitions = vec![QaState::Writing];
        let mut draft = write().await?;
        let mut attempt = 1;

        loop {
            transitions.push(QaState::Reviewing(attempt));
            debug!(attempt, max_attempts = self.max_attempts, "QA review");

            let text = review(ReviewRound {
                attempt,
                max_attempts: self.max_attempts,
                draft,
            })
            .await?;

            let passed = self.policy.is_passed(&text);
            if passed || attempt >= self.max_attempts {
                if passed {
                    transitions.push(QaState::Passed(attempt));
                    info!(attempt, "QA passed");
                } else {
                    transitions.push(QaState::Flagged(attempt));
                    warn!(attempts = attempt, "QA flagged after final attempt");
                }
                return Ok(QaOutcome {
                    text,
                    passed,
                    attempts: attempt,
                    transitions,
                });
            }

            transitions.push(QaState::Revising(attempt));
            draft = text;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Never = std::convert::Infallible;

    #[test]
    fn zero_attempts_is_invalid() {
        assert_eq!(QaController::new(0).unwrap_err(), QaError::ZeroAttempts);
    }

    #[test]
    fn status_line_policy() {
        let p = PassPolicy::StatusLine;
        assert!(p.is_passed("report\nQA Status: PASSED | Attempts: 1/3 | Date: 2026-01-01"));
        assert!(p.is_passed("`QA Status: passed | Attempts: 2/3`"));
        assert!(p.is_passed("**QA Status:** PASSED"));
        assert!(!p.is_passed("QA Status: FLAGGED | Attempts: 3/3"));
        assert!(!p.is_passed("No QA status line at all, PASSED"));
        // Only the last status line counts
        assert!(!p.is_passed("QA Status: PASSED\nrewrite...\nQA Status: FLAGGED"));
    }

    #[test]
    fn anywhere_policy_accepts_checker_output() {
        // The banned phrase checker's clean report is enough for the loose check
        let review = "PASSED: No banned phrases found in the content.\nQA Status: FLAGGED";
        assert!(PassPolicy::Anywhere.is_passed(review));
        assert!(!PassPolicy::StatusLine.is_passed(review));
        assert!(PassPolicy::Anywhere.is_passed("qa status: passed"));
    }

    #[test]
    fn policy_from_config_marker() {
        assert_eq!(PassPolicy::from(PassMarker::StatusLine), PassPolicy::StatusLine);
        assert_eq!(PassPolicy::from(PassMarker::Anywhere), PassPolicy::Anywhere);
    }

    #[tokio::test]
    async fn converges_at_attempt_k() {
        let controller = QaController::new(3).unwrap();
        let reviews = Mutex::new(Vec::new());

        let outcome = controller
            .run(
                || async { Ok::<_, Never>("draft 0".to_string()) },
                |round: ReviewRound| {
                    reviews.lock().unwrap().push(round.draft.clone());
                    async move {
                        Ok(if round.attempt == 2 {
                            "final\nQA Status: PASSED | Attempts: 2/3".to_string()
                        } else {
                            format!("rewrite {}\nQA Status: FLAGGED", round.attempt)
                        })
                    }
                },
            )
            .await
            .unwrap();

        assert!(outcome.passed);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.text.starts_with("final"));
        // The failed review's output is the next review's input
        assert_eq!(
            *reviews.lock().unwrap(),
            vec![
                "draft 0".to_string(),
                "rewrite 1\nQA Status: FLAGGED".to_string()
            ]
        );
        assert_eq!(
            outcome.transitions,
            vec![
                QaState::Writing,
                QaState::Reviewing(1),
                QaState::Revising(1),
                QaState::Reviewing(2),
                QaState::Passed(2),
            ]
        );
    }

    #[tokio::test]
    async fn exhaustion_flags_with_last_review() {
        let controller = QaController::new(3).unwrap();
        let count = Mutex::new(0u32);

        let outcome = controller
            .run(
                || async { Ok::<_, Never>("draft".to_string()) },
                |round: ReviewRound| {
                    *count.lock().unwrap() += 1;
                    async move { Ok(format!("review {}\nQA Status: FLAGGED", round.attempt)) }
                },
            )
            .await
            .unwrap();

        assert!(!outcome.passed);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(*count.lock().unwrap(), 3);
        assert_eq!(outcome.text, "review 3\nQA Status: FLAGGED");
        assert_eq!(outcome.transitions.last(), Some(&QaState::Flagged(3)));
    }

    #[tokio::test]
    async fn single_attempt_pass() {
        let outcome = QaController::new(1)
            .unwrap()
            .run(
                || async { Ok::<_, Never>("draft".to_string()) },
                |_round: ReviewRound| async { Ok("QA Status: PASSED".to_string()) },
            )
            .await
            .unwrap();
        assert_eq!((outcome.passed, outcome.attempts), (true, 1));
    }

    #[tokio::test]
    async fn step_errors_propagate() {
        let err = QaController::new(2)
            .unwrap()
            .run(
                || async { Ok("draft".to_string()) },
                |_round: ReviewRound| async { Err("provider down") },
            )
            .await
            .unwrap_err();
        assert_eq!(err, "provider down");

        let err = QaController::new(2)
            .unwrap()
            .run(
                || async { Err::<String, _>("writer down") },
                |_round: ReviewRound| async { Ok("unused".to_string()) },
            )
            .await
            .unwrap_err();
        assert_eq!(err, "writer down");
    }
}
