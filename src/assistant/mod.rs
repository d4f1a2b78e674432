//! Simulated QA assistant and its transcript.
//!
//! The assistant never calls a model. Sending a message schedules one reply
//! after a short random "typing" delay; the reply text comes from the rule
//! table in [`replies`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use web_tester::assistant::{MockAssistant, ReplyDelay};
//! use web_tester::scheduler::ManualScheduler;
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let mut assistant = MockAssistant::new(
//!     scheduler.clone(),
//!     ReplyDelay::default(),
//!     StdRng::seed_from_u64(1),
//! );
//! assistant.send("Check accessibility", "example.com");
//! assert!(assistant.is_typing());
//!
//! for fired in scheduler.advance(Duration::from_secs(2)) {
//!     assistant.handle_timer(fired.handle);
//! }
//! assert_eq!(assistant.messages().len(), 3);
//! ```

mod message;
pub mod replies;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;

use crate::scheduler::{Scheduler, TimerHandle, TimerKind};

pub use message::{ChatMessage, Role};

/// Label used in the cleared greeting when no preview is loaded.
pub const NO_PREVIEW_LABEL: &str = "the current preview";

/// Bounds of the simulated typing delay, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDelay {
    min: Duration,
    max: Duration,
}

impl ReplyDelay {
    /// Delay drawn uniformly from `a..=b`, in whichever order they come.
    #[must_use]
    pub fn new(a: Duration, b: Duration) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Shortest delay.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Longest delay.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for ReplyDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(700), Duration::from_millis(1500))
    }
}

#[derive(Debug)]
struct PendingReply {
    handle: TimerHandle,
    prompt: String,
    site: String,
}

/// Transcript owner and reply scheduler.
#[derive(Debug)]
pub struct MockAssistant {
    messages: Vec<ChatMessage>,
    pending: Option<PendingReply>,
    delay: ReplyDelay,
    rng: StdRng,
    scheduler: Arc<dyn Scheduler>,
}

impl MockAssistant {
    /// Create an assistant whose transcript holds the sample greeting.
    pub fn new(scheduler: Arc<dyn Scheduler>, delay: ReplyDelay, rng: StdRng) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(replies::SAMPLE_MARKDOWN)],
            pending: None,
            delay,
            rng,
            scheduler,
        }
    }

    /// Transcript in order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether a reply is pending.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.pending.is_some()
    }

    /// Append a user message and schedule the reply.
    ///
    /// Blank input is ignored and returns `None`. A reply still pending from
    /// an earlier send is cancelled, so only the newest prompt is answered.
    pub fn send(&mut self, text: &str, site: &str) -> Option<&ChatMessage> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.cancel_pending();

        let delay = self.delay.sample(&mut self.rng);
        let handle = self.scheduler.schedule(delay, TimerKind::AssistantReply);
        self.pending = Some(PendingReply {
            handle,
            prompt: trimmed.to_string(),
            site: site.to_string(),
        });

        tracing::debug!(
            %handle,
            delay_ms = delay.as_millis(),
            prompt_length = trimmed.len(),
            "User message queued for reply"
        );
        self.push(ChatMessage::user(trimmed))
    }

    /// A timer fired. If it is the pending reply, append the reply and return
    /// it; otherwise ignore it.
    pub fn handle_timer(&mut self, handle: TimerHandle) -> Option<&ChatMessage> {
        if self.pending.as_ref().map(|p| p.handle) != Some(handle) {
            return None;
        }
        let pending = self.pending.take()?;
        let content = replies::generate_reply(&pending.prompt, &pending.site, &mut self.rng);
        tracing::debug!(%handle, reply_length = content.len(), "Assistant replied");
        self.push(ChatMessage::assistant(content))
    }

    /// Cancel any pending reply and reset the transcript to one greeting.
    ///
    /// `site` is the display hostname of the preview, empty when none.
    pub fn clear(&mut self, site: &str) -> &[ChatMessage] {
        self.cancel_pending();
        let label = if site.is_empty() { NO_PREVIEW_LABEL } else { site };
        self.messages = vec![ChatMessage::assistant(replies::cleared_greeting(label))];
        tracing::debug!("Transcript cleared");
        &self.messages
    }

    fn push(&mut self, message: ChatMessage) -> Option<&ChatMessage> {
        self.messages.push(message);
        self.messages.last()
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.scheduler.cancel(pending.handle);
            tracing::debug!(handle = %pending.handle, "Pending reply superseded");
        }
    }
}

impl Drop for MockAssistant {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use rand::SeedableRng;

    fn assistant() -> (MockAssistant, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let assistant = MockAssistant::new(
            scheduler.clone(),
            ReplyDelay::default(),
            StdRng::seed_from_u64(3),
        );
        (assistant, scheduler)
    }

    fn deliver(assistant: &mut MockAssistant, scheduler: &ManualScheduler, by: Duration) -> usize {
        scheduler
            .advance(by)
            .into_iter()
            .filter(|fired| assistant.handle_timer(fired.handle).is_some())
            .count()
    }

    #[test]
    fn test_starts_with_greeting() {
        let (assistant, _) = assistant();
        assert_eq!(assistant.messages().len(), 1);
        assert_eq!(assistant.messages()[0].role, Role::Assistant);
        assert_eq!(assistant.messages()[0].content, replies::SAMPLE_MARKDOWN);
    }

    #[test]
    fn test_blank_send_is_noop() {
        let (mut assistant, scheduler) = assistant();
        assert!(assistant.send("   \n\t", "example.com").is_none());
        assert_eq!(assistant.messages().len(), 1);
        assert!(!assistant.is_typing());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_reply_delay_within_bounds() {
        let (mut assistant, scheduler) = assistant();
        for i in 0..20 {
            assistant.send(&format!("question {i}"), "example.com");
            let remaining = scheduler.remaining(TimerKind::AssistantReply);
            assert_eq!(remaining.len(), 1);
            assert!(remaining[0] >= Duration::from_millis(700));
            assert!(remaining[0] <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_send_trims_and_replies_once() {
        let (mut assistant, scheduler) = assistant();
        let sent = assistant.send("  how is performance?  ", "example.com").unwrap();
        assert_eq!(sent.content, "how is performance?");
        assert!(assistant.is_typing());

        assert_eq!(deliver(&mut assistant, &scheduler, Duration::from_millis(699)), 0);
        assert_eq!(deliver(&mut assistant, &scheduler, Duration::from_millis(801)), 1);
        assert!(!assistant.is_typing());

        let reply = assistant.messages().last().unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.starts_with("Here’s the performance summary for example.com"));
    }

    #[test]
    fn test_second_send_supersedes_first() {
        let (mut assistant, scheduler) = assistant();
        assistant.send("check performance", "example.com");
        assistant.send("check accessibility", "example.com");
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(deliver(&mut assistant, &scheduler, Duration::from_secs(5)), 1);
        let messages = assistant.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "check performance");
        assert_eq!(messages[2].content, "check accessibility");
        assert!(messages[3].content.starts_with("Accessibility check for example.com"));
    }

    #[test]
    fn test_stale_handle_is_ignored() {
        let (mut assistant, scheduler) = assistant();
        assistant.send("first", "example.com");
        let stale = scheduler.advance(Duration::from_secs(5));
        assistant.send("second", "example.com");

        for fired in stale {
            assert!(assistant.handle_timer(fired.handle).is_none());
        }
        assert!(assistant.is_typing());
        assert_eq!(deliver(&mut assistant, &scheduler, Duration::from_secs(5)), 1);
    }

    #[test]
    fn test_clear_resets_and_cancels() {
        let (mut assistant, scheduler) = assistant();
        assistant.send("one", "example.com");
        assistant.send("two", "example.com");

        let messages = assistant.clear("example.com");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("Preview example.com or load another URL"));
        assert!(!assistant.is_typing());

        assert_eq!(deliver(&mut assistant, &scheduler, Duration::from_secs(5)), 0);
        assert_eq!(assistant.messages().len(), 1);
    }

    #[test]
    fn test_clear_without_preview_uses_placeholder_label() {
        let (mut assistant, _) = assistant();
        let messages = assistant.clear("");
        assert!(messages[0].content.contains("Preview the current preview or load"));
    }
}
