//! Canned assistant replies.
//!
//! Replies are picked by an ordered rule table evaluated against the
//! lower-cased prompt; the first rule with a matching keyword wins. Prompts
//! that match nothing get one of [`FALLBACK_COUNT`] generic templates chosen
//! uniformly at random.

use rand::Rng;

/// Greeting shown in a fresh transcript.
pub const SAMPLE_MARKDOWN: &str = "\
👋 Welcome! Paste your URL on the left and use this markdown sample to verify rich rendering:

### Performance snapshot

- **LCP**: `2.3s` on 4G
- **CLS**: 0.04

```python
def audit_core_web_vitals(lcp: float, cls: float) -> str:
    if lcp < 2.5 and cls < 0.1:
        return \"Vitals look great! 🚀\"
    return \"Revisit hero media delivery and layout shifts.\"

print(audit_core_web_vitals(2.3, 0.04))
```

> Reminder: rerun Lighthouse after each optimization pass.";

/// Number of generic templates used when no rule matches.
pub const FALLBACK_COUNT: usize = 5;

/// Greeting used after the history is cleared. `label` names the preview.
pub fn cleared_greeting(label: &str) -> String {
    format!(
        "{SAMPLE_MARKDOWN}\n\n_History cleared. Preview {label} or load another URL, then ask for targeted QA insights._"
    )
}

/// One entry in the reply table.
#[derive(Debug, Clone, Copy)]
pub struct ReplyRule {
    /// Short topic name, used in logs.
    pub topic: &'static str,
    keywords: &'static [&'static str],
    respond: fn(&str) -> String,
}

impl ReplyRule {
    /// Whether any keyword occurs in the already lower-cased prompt.
    #[must_use]
    pub fn matches(&self, prompt: &str) -> bool {
        self.keywords.iter().any(|k| prompt.contains(k))
    }

    /// Reply text for `site`.
    #[must_use]
    pub fn respond(&self, site: &str) -> String {
        (self.respond)(site)
    }
}

/// Rules in evaluation order.
pub static RULES: [ReplyRule; 5] = [
    ReplyRule {
        topic: "markdown-sample",
        keywords: &["sample", "markdown", "code block", "readme"],
        respond: markdown_sample,
    },
    ReplyRule {
        topic: "performance",
        keywords: &["performance", "speed", "load"],
        respond: performance,
    },
    ReplyRule {
        topic: "accessibility",
        keywords: &["accessibility", "a11y", "contrast", "screen reader"],
        respond: accessibility,
    },
    ReplyRule {
        topic: "conversion",
        keywords: &["conversion", "cta", "copy", "messaging"],
        respond: conversion,
    },
    ReplyRule {
        topic: "responsive",
        keywords: &["responsive", "mobile", "tablet"],
        respond: responsive,
    },
];

/// First rule matching `prompt`, if any.
pub fn matching_rule(prompt: &str) -> Option<&'static ReplyRule> {
    let prompt = prompt.to_lowercase();
    RULES.iter().find(|rule| rule.matches(&prompt))
}

/// Reply to `prompt` about `site`.
pub fn generate_reply<R: Rng>(prompt: &str, site: &str, rng: &mut R) -> String {
    if let Some(rule) = matching_rule(prompt) {
        tracing::debug!(topic = rule.topic, "Reply rule matched");
        return rule.respond(site);
    }
    let index = rng.gen_range(0..FALLBACK_COUNT);
    tracing::debug!(index, "No reply rule matched, using fallback");
    fallback_templates(site).swap_remove(index)
}

/// The generic templates, interpolated with `site`.
pub fn fallback_templates(site: &str) -> Vec<String> {
    vec![
        format!(
            "Here’s a quick QA loop for {site}: run Lighthouse, validate semantics with axe DevTools, and capture a Percy diff for visual regressions."
        ),
        format!(
            "Start by checking Core Web Vitals via PageSpeed Insights, then combine the report with manual UX heuristics tailored to {site}."
        ),
        format!(
            "Focus on above-the-fold clarity: align the value proposition, declutter secondary CTAs, and verify loading order prioritizes hero assets on {site}."
        ),
        format!(
            "Run an accessibility sweep: color contrast, headings outline, form labels, and live-region announcements for async UI on {site}."
        ),
        format!(
            "Pair synthetic monitoring (e.g., WebPageTest) with real-user metrics (CrUX) to capture how {site} performs across geographies."
        ),
    ]
}

fn markdown_sample(site: &str) -> String {
    format!(
        "\
Here’s a Markdown-formatted audit you can paste into a README:

## QA Snapshot for **{site}**

**Highlights**
- ✅ Hero loads under 2.4s on LTE.
- ⚠️ Checkout form is missing Accessible Name annotations.

**Next Steps**
1. Add srcset variants for marketing imagery.
2. Run axe DevTools across the onboarding flow.
3. Capture Percy diffs before rollout.

```python
audit = {{
    \"performance\": {{
        \"lcp\": \"2.3s\",
        \"blocking_scripts\": [\"/static/vendor.js\"],
    }},
    \"accessibility\": [
        \"Add aria-labels to icon-only buttons\",
        \"Ensure focus outlines remain visible\",
    ],
}}

for category, details in audit.items():
    print(category.upper(), \"=>\", details)
```

> Tip: Re-run Lighthouse in CI to keep this report current."
    )
}

fn performance(site: &str) -> String {
    format!(
        "\
Here’s the performance summary for {site}:
- LCP may be slowed by the hero image; try serving an AVIF/WEBP fallback under 150KB.
- Consider lazy-loading below-the-fold sections with intersection observers.
- Bundle analysis suggests splitting vendor scripts and deferring non-critical analytics."
    )
}

fn accessibility(site: &str) -> String {
    format!(
        "\
Accessibility check for {site}:
- Verify each landmark region has clear labels for assistive tech.
- Contrast on CTAs should exceed WCAG AA (>4.5:1); consider darkening the primary brand tint.
- Audit keyboard focus order on the navigation—ensure skip links are visible on focus."
    )
}

fn conversion(_site: &str) -> String {
    "\
Conversion feedback:
- Lead with a benefit-driven headline that mirrors user intent.
- Reinforce the primary CTA near fold breaks; add microcopy that reduces friction.
- Add social proof near pricing or signup to increase trust signals."
        .to_string()
}

fn responsive(_site: &str) -> String {
    "\
Responsive review:
- Test tablet breakpoints around 1024px and 768px—current layout may need tighter padding.
- Ensure tap targets are at least 44px high; hero buttons appear slightly cramped.
- Audit viewport meta tags and typography scale for small screens."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_accessibility_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let reply = generate_reply("Any ACCESSIBILITY issues?", "example.com", &mut rng);
            assert_eq!(reply, accessibility("example.com"));
        }
    }

    #[test]
    fn test_first_match_wins() {
        // "markdown" outranks "performance".
        assert_eq!(
            matching_rule("markdown performance report").map(|r| r.topic),
            Some("markdown-sample")
        );
        // "load" outranks "mobile".
        assert_eq!(
            matching_rule("mobile load times").map(|r| r.topic),
            Some("performance")
        );
        assert_eq!(matching_rule("Tablet layout?").map(|r| r.topic), Some("responsive"));
        assert_eq!(matching_rule("Rewrite the CTA").map(|r| r.topic), Some("conversion"));
    }

    #[test]
    fn test_fallback_is_one_of_the_templates() {
        let templates = fallback_templates("docs.rs");
        assert_eq!(templates.len(), FALLBACK_COUNT);

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let reply = generate_reply("what do you think?", "docs.rs", &mut rng);
            assert!(templates.contains(&reply));
            assert!(reply.contains("docs.rs"));
        }
    }

    #[test]
    fn test_sample_interpolates_site() {
        let reply = generate_reply("give me a README", "example.com", &mut StdRng::seed_from_u64(1));
        assert!(reply.contains("## QA Snapshot for **example.com**"));
        assert!(reply.contains("```python"));
    }

    #[test]
    fn test_cleared_greeting() {
        let text = cleared_greeting("the current preview");
        assert!(text.starts_with(SAMPLE_MARKDOWN));
        assert!(text.ends_with(
            "_History cleared. Preview the current preview or load another URL, then ask for targeted QA insights._"
        ));
    }
}
