//! Comment submission - form validation, the submission state machine and
//! duplicate suppression.
//!
//! A form moves `Idle -> Submitting -> Submitted` on success. Validation
//! failures never leave `Idle`, and a failed delivery falls back to `Idle`
//! so the visitor can try again by hand. Nothing is retried automatically.

mod sink;

pub use sink::CommentSink;

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Result;

pub const NAME_REQUIRED: &str = "The Name Field is required";
pub const EMAIL_REQUIRED: &str = "The Email Field is required";
pub const COMMENT_REQUIRED: &str = "The Comment Field is required";

/// What a visitor typed into the comment form
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentInput {
    /// Id of the post being commented on
    #[serde(rename = "_id", default)]
    pub post_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
}

/// Which required fields were missing on the last attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub name: bool,
    pub email: bool,
    pub comment: bool,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        !(self.name || self.email || self.comment)
    }

    /// One message per missing field, in form order
    pub fn messages(&self) -> Vec<&'static str> {
        let mut messages = Vec::new();
        if self.name {
            messages.push(NAME_REQUIRED);
        }
        if self.email {
            messages.push(EMAIL_REQUIRED);
        }
        if self.comment {
            messages.push(COMMENT_REQUIRED);
        }
        messages
    }
}

/// Check the required fields. Whitespace-only counts as missing.
pub fn validate(input: &CommentInput) -> FieldErrors {
    FieldErrors {
        name: input.name.trim().is_empty(),
        email: input.email.trim().is_empty(),
        comment: input.comment.trim().is_empty(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Idle,
    Submitting,
    Submitted,
}

/// Result of one press of the submit button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Required fields missing; nothing was sent
    Invalid(FieldErrors),
    /// The endpoint accepted the comment
    Submitted,
    /// Delivery failed; the form is back to idle
    Failed,
    /// A submission is already pending or done; nothing was sent
    Ignored,
    /// An identical submission is still being delivered; nothing was sent
    /// and the form is back to idle
    Busy,
}

/// State of one comment form
#[derive(Debug, Clone)]
pub struct CommentForm {
    state: FormState,
    errors: FieldErrors,
}

impl Default for CommentForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentForm {
    pub fn new() -> Self {
        Self {
            state: FormState::Idle,
            errors: FieldErrors::default(),
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn errors(&self) -> FieldErrors {
        self.errors
    }

    pub fn is_submitted(&self) -> bool {
        self.state == FormState::Submitted
    }

    /// Validate and move to `Submitting`. Returns the outcome to report
    /// instead when the form must not be sent.
    pub fn begin(&mut self, input: &CommentInput) -> std::result::Result<(), SubmitOutcome> {
        if self.state != FormState::Idle {
            tracing::debug!("Ignoring submit while {:?}", self.state);
            return Err(SubmitOutcome::Ignored);
        }

        self.errors = validate(input);
        if !self.errors.is_empty() {
            return Err(SubmitOutcome::Invalid(self.errors));
        }

        self.state = FormState::Submitting;
        Ok(())
    }

    /// Record the delivery result of a pending submission
    pub fn finish(&mut self, input: &CommentInput, result: Result<()>) -> SubmitOutcome {
        match result {
            Ok(()) => {
                tracing::info!("Comment submitted for post {}", input.post_id);
                self.state = FormState::Submitted;
                SubmitOutcome::Submitted
            }
            Err(e) => {
                tracing::warn!("Comment submission for post {} failed: {}", input.post_id, e);
                self.state = FormState::Idle;
                SubmitOutcome::Failed
            }
        }
    }

    /// Drop a pending submission without sending it
    pub fn cancel(&mut self) {
        if self.state == FormState::Submitting {
            self.state = FormState::Idle;
        }
    }

    /// Validate, deliver through `sink`, and settle the state
    pub async fn submit(&mut self, sink: &dyn CommentSink, input: &CommentInput) -> SubmitOutcome {
        if let Err(outcome) = self.begin(input) {
            return outcome;
        }
        let result = sink.create_comment(input).await;
        self.finish(input, result)
    }
}

/// What [`DuplicateGuard::try_claim`] found for an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Not seen before; the caller delivers it
    Granted,
    /// An identical submission is still being delivered
    Pending,
    /// An identical submission was accepted within the window
    Accepted,
}

#[derive(Debug, Clone, Copy)]
enum Seen {
    Pending(Instant),
    Accepted(Instant),
}

/// Suppresses identical submissions, e.g. a submit button pressed twice.
///
/// A claim stays pending until the delivery settles, or until `window`
/// passes if the request was abandoned. Accepted inputs are remembered for
/// `window`; failed ones are released so the visitor can resubmit.
pub struct DuplicateGuard {
    window: Duration,
    seen: Mutex<HashMap<u64, Seen>>,
}

impl DuplicateGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Claim this input for delivery
    pub fn try_claim(&self, input: &CommentInput) -> Claim {
        let key = fingerprint(input);
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        seen.retain(|_, state| match state {
            Seen::Pending(at) | Seen::Accepted(at) => now.duration_since(*at) < self.window,
        });
        match seen.get(&key) {
            Some(Seen::Pending(_)) => Claim::Pending,
            Some(Seen::Accepted(_)) => Claim::Accepted,
            None => {
                seen.insert(key, Seen::Pending(now));
                Claim::Granted
            }
        }
    }

    /// The claimed input was delivered
    pub fn accept(&self, input: &CommentInput) {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(fingerprint(input), Seen::Accepted(Instant::now()));
    }

    /// The claimed input was not delivered
    pub fn release(&self, input: &CommentInput) {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.remove(&fingerprint(input));
    }
}

fn fingerprint(input: &CommentInput) -> u64 {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl CommentSink for RecordingSink {
        async fn create_comment(&self, _input: &CommentInput) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Io(io::Error::new(io::ErrorKind::Other, "boom")));
            }
            Ok(())
        }
    }

    fn jane() -> CommentInput {
        CommentInput {
            post_id: "post-1".to_string(),
            name: "Jane".to_string(),
            email: "jane@x.com".to_string(),
            comment: "Great post!".to_string(),
        }
    }

    #[test]
    fn test_each_missing_field_has_its_own_message() {
        let mut input = jane();
        input.name.clear();
        assert_eq!(validate(&input).messages(), vec!["The Name Field is required"]);

        let mut input = jane();
        input.email = "   ".to_string();
        assert_eq!(validate(&input).messages(), vec!["The Email Field is required"]);

        let mut input = jane();
        input.comment.clear();
        assert_eq!(validate(&input).messages(), vec!["The Comment Field is required"]);

        assert_eq!(validate(&CommentInput::default()).messages().len(), 3);
        assert!(validate(&jane()).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_call() {
        let sink = RecordingSink::default();
        let mut form = CommentForm::new();
        let mut input = jane();
        input.name.clear();

        let outcome = form.submit(&sink, &input).await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(e) if e.name && !e.email && !e.comment));
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);

        // Errors are recomputed on the next attempt
        assert_eq!(form.submit(&sink, &jane()).await, SubmitOutcome::Submitted);
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn test_successful_submission() {
        let sink = RecordingSink::default();
        let mut form = CommentForm::new();

        assert_eq!(form.submit(&sink, &jane()).await, SubmitOutcome::Submitted);
        assert!(form.is_submitted());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_reverts_to_idle() {
        let sink = RecordingSink::default();
        sink.fail.store(true, Ordering::SeqCst);
        let mut form = CommentForm::new();

        assert_eq!(form.submit(&sink, &jane()).await, SubmitOutcome::Failed);
        assert_eq!(form.state(), FormState::Idle);

        sink.fail.store(false, Ordering::SeqCst);
        assert_eq!(form.submit(&sink, &jane()).await, SubmitOutcome::Submitted);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_double_submit_is_ignored() {
        let sink = RecordingSink::default();
        let mut form = CommentForm::new();

        form.begin(&jane()).unwrap();
        assert_eq!(form.state(), FormState::Submitting);
        assert_eq!(form.submit(&sink, &jane()).await, SubmitOutcome::Ignored);
        assert_eq!(form.finish(&jane(), Ok(())), SubmitOutcome::Submitted);
        assert_eq!(form.submit(&sink, &jane()).await, SubmitOutcome::Ignored);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_guard() {
        let guard = DuplicateGuard::new(Duration::from_secs(30));
        assert_eq!(guard.try_claim(&jane()), Claim::Granted);
        assert_eq!(guard.try_claim(&jane()), Claim::Pending);

        let mut other = jane();
        other.comment = "Another thought".to_string();
        assert_eq!(guard.try_claim(&other), Claim::Granted);

        guard.accept(&jane());
        assert_eq!(guard.try_claim(&jane()), Claim::Accepted);
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut form = CommentForm::new();
        form.begin(&jane()).unwrap();
        form.cancel();
        assert_eq!(form.state(), FormState::Idle);
        assert!(form.begin(&jane()).is_ok());
    }

    #[test]
    fn test_failed_delivery_releases_claim() {
        let guard = DuplicateGuard::new(Duration::from_secs(30));
        assert_eq!(guard.try_claim(&jane()), Claim::Granted);
        guard.release(&jane());
        assert_eq!(guard.try_claim(&jane()), Claim::Granted);
    }

    #[test]
    fn test_duplicate_guard_window_expires() {
        let guard = DuplicateGuard::new(Duration::ZERO);
        assert_eq!(guard.try_claim(&jane()), Claim::Granted);
        assert_eq!(guard.try_claim(&jane()), Claim::Granted);
        guard.accept(&jane());
        assert_eq!(guard.try_claim(&jane()), Claim::Granted);
    }

    #[test]
    fn test_input_from_json() {
        let input: CommentInput = serde_json::from_str(
            r#"{"_id":"post-1","name":"Jane","email":"jane@x.com","comment":"Great post!"}"#,
        )
        .unwrap();
        assert_eq!(input, jane());
    }
}
