//! Behavioural checks of the composed workspace on a virtual clock.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use url::Url;
use web_tester::assistant::Role;
use web_tester::assistant::replies::{RULES, fallback_templates, generate_reply};
use web_tester::layout::{CHAT_WIDTH_MAX, CHAT_WIDTH_MIN, PointerSample};
use web_tester::prefs::{CHAT_WIDTH_KEY, MemoryPrefs, PreferenceStore};
use web_tester::preview::LoadPhase;
use web_tester::scheduler::{ManualScheduler, TimerKind};
use web_tester::workspace::{Workspace, WorkspaceSettings};

struct Harness {
    workspace: Workspace,
    scheduler: Arc<ManualScheduler>,
    prefs: Arc<MemoryPrefs>,
}

impl Harness {
    fn new() -> Self {
        let scheduler = Arc::new(ManualScheduler::new());
        let prefs = Arc::new(MemoryPrefs::new());
        let settings = WorkspaceSettings::new(Url::parse("http://127.0.0.1:3000").unwrap());
        let workspace = Workspace::new(
            settings,
            prefs.clone(),
            scheduler.clone(),
            StdRng::seed_from_u64(7),
        );
        Self {
            workspace,
            scheduler,
            prefs,
        }
    }

    /// Advance the virtual clock and deliver every timer that fired.
    fn advance(&mut self, by: Duration) -> usize {
        let fired = self.scheduler.advance(by);
        let count = fired.len();
        for timer in fired {
            self.workspace.on_timer(timer);
        }
        count
    }

    fn fraction(&self) -> f64 {
        self.workspace.snapshot().layout.fraction
    }
}

fn at(client_x: f64, container_width: f64) -> PointerSample {
    PointerSample {
        client_x,
        container_left: 100.0,
        container_width,
    }
}

#[test]
fn test_dragged_fraction_is_always_clamped() {
    let mut h = Harness::new();
    h.workspace.begin_drag(1, at(100.0, 800.0));

    for x in [-500.0, 100.0, 150.0, 300.0, 500.0, 700.0, 900.0, 2_000.0] {
        h.workspace.drag_move(1, at(x, 800.0), 1);
        let fraction = h.fraction();
        assert!(
            (CHAT_WIDTH_MIN..=CHAT_WIDTH_MAX).contains(&fraction),
            "x={x} gave {fraction}"
        );
        let stored: f64 = h.prefs.get(CHAT_WIDTH_KEY).unwrap().unwrap().parse().unwrap();
        assert!((CHAT_WIDTH_MIN..=CHAT_WIDTH_MAX).contains(&stored));
    }
}

#[test]
fn test_zero_width_container_is_ignored() {
    let mut h = Harness::new();
    let before = h.fraction();
    h.workspace.begin_drag(1, at(400.0, 0.0));
    h.workspace.drag_move(1, at(200.0, 0.0), 1);
    assert!((h.fraction() - before).abs() < f64::EPSILON);
    assert!(h.prefs.get(CHAT_WIDTH_KEY).unwrap().is_none());
}

#[test]
fn test_home_and_end_hit_exact_bounds() {
    let mut h = Harness::new();
    h.workspace.resize_key("Home");
    assert_eq!(h.fraction(), CHAT_WIDTH_MIN);
    h.workspace.resize_key("ArrowLeft");
    assert_eq!(h.fraction(), CHAT_WIDTH_MIN);

    h.workspace.resize_key("End");
    assert_eq!(h.fraction(), CHAT_WIDTH_MAX);
    for _ in 0..5 {
        h.workspace.resize_key("ArrowRight");
    }
    assert_eq!(h.fraction(), CHAT_WIDTH_MAX);

    h.workspace.resize_key("ArrowLeft");
    assert!((h.fraction() - 0.56).abs() < 1e-9);
}

#[test]
fn test_url_normalisation_through_submit() {
    let mut h = Harness::new();

    let view = h.workspace.submit_url("example.com").unwrap();
    assert_eq!(view.current_url, "https://example.com/");

    let view = h.workspace.submit_url("/demo").unwrap();
    assert_eq!(view.current_url, "http://127.0.0.1:3000/demo");
    let token = view.load_token;

    assert!(h.workspace.submit_url("ftp://x").is_err());
    let preview = h.workspace.snapshot().preview;
    assert_eq!(preview.current_url, "http://127.0.0.1:3000/demo");
    assert_eq!(preview.load_token, token);
    assert!(preview.url_error.is_some());
}

#[test]
fn test_blank_send_is_a_no_op() {
    let mut h = Harness::new();
    let before = h.workspace.snapshot().messages.len();

    assert!(h.workspace.send_message("").is_none());
    assert!(h.workspace.send_message(" \n\t ").is_none());

    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.messages.len(), before);
    assert!(!snapshot.typing);
    assert_eq!(h.scheduler.pending(), 0);
}

#[test]
fn test_second_send_supersedes_first_reply() {
    let mut h = Harness::new();
    h.workspace.send_message("how fast does it load?").unwrap();
    h.workspace.send_message("check contrast please").unwrap();
    assert_eq!(h.scheduler.remaining(TimerKind::AssistantReply).len(), 1);

    assert_eq!(h.advance(Duration::from_secs(5)), 1);

    let messages = h.workspace.snapshot().messages;
    assert_eq!(messages.len(), 4);
    let replies: Vec<_> = messages
        .iter()
        .skip(1)
        .filter(|m| m.role == Role::Assistant)
        .collect();
    assert_eq!(replies.len(), 1);
    let accessibility = RULES.iter().find(|r| r.topic == "accessibility").unwrap();
    assert_eq!(replies[0].content, accessibility.respond(""));
}

#[test]
fn test_reply_delay_within_bounds() {
    let mut h = Harness::new();
    for prompt in ["one", "two", "three", "four"] {
        h.workspace.send_message(prompt).unwrap();
        let remaining = h.scheduler.remaining(TimerKind::AssistantReply);
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0] >= Duration::from_millis(700));
        assert!(remaining[0] <= Duration::from_millis(1_500));
    }
}

#[test]
fn test_clear_leaves_one_message_and_no_late_reply() {
    let mut h = Harness::new();
    h.workspace.submit_url("www.example.org").unwrap();
    for prompt in ["a", "b", "c"] {
        h.workspace.send_message(prompt).unwrap();
        h.advance(Duration::from_secs(2));
    }
    h.workspace.send_message("pending").unwrap();

    let cleared = h.workspace.clear_history();
    assert_eq!(cleared.len(), 1);
    assert!(cleared[0].content.contains("example.org"));

    h.advance(Duration::from_secs(60));
    let snapshot = h.workspace.snapshot();
    assert_eq!(snapshot.messages.len(), 1);
    assert!(!snapshot.typing);
}

#[test]
fn test_rule_and_fallback_replies() {
    let mut rng = StdRng::seed_from_u64(3);
    let accessibility = RULES.iter().find(|r| r.topic == "accessibility").unwrap();
    for _ in 0..10 {
        assert_eq!(
            generate_reply("Accessibility review?", "site.test", &mut rng),
            accessibility.respond("site.test")
        );
    }

    let templates = fallback_templates("site.test");
    for _ in 0..50 {
        let reply = generate_reply("hello there", "site.test", &mut rng);
        assert!(templates.contains(&reply));
    }
}

#[test]
fn test_timeout_errors_exactly_once() {
    let mut h = Harness::new();
    let mut rx = h.workspace.subscribe();
    h.workspace.submit_url("example.com").unwrap();

    assert_eq!(h.advance(Duration::from_millis(9_999)), 0);
    assert_eq!(h.advance(Duration::from_millis(1)), 1);
    assert_eq!(h.workspace.snapshot().preview.phase, LoadPhase::Errored);

    assert_eq!(h.advance(Duration::from_secs(30)), 0);

    let previews = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|e| e.event_name() == "preview")
        .count();
    assert_eq!(previews, 2);
}

#[test]
fn test_resubmit_after_failure_retries() {
    let mut h = Harness::new();
    let first = h.workspace.submit_url("example.com").unwrap();
    assert!(h.workspace.preview_failed(first.load_token));
    assert!(h.workspace.snapshot().preview.load_error.is_some());

    let second = h.workspace.submit_url("example.com").unwrap();
    assert!(second.load_token > first.load_token);
    assert!(second.is_loading);
    assert!(second.load_error.is_none());

    // Signals for the superseded attempt are ignored
    assert!(!h.workspace.preview_loaded(first.load_token));
    assert!(h.workspace.preview_loaded(second.load_token));
    assert_eq!(h.scheduler.pending(), 0);
}
