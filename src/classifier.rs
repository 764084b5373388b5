//! Topical and quality screening for raw candidate items.
//!
//! Three stateless predicates over declarative pattern tables:
//! - homepage detection (a signal for callers, not a hard reject everywhere)
//! - primary-source detection (prioritize content from or about AI vendors)
//! - finance-title rejection, guarded so product-launch announcements that
//!   happen to mention money survive the screen
//!
//! All predicates are total: malformed URLs yield `false`, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Hosts whose content counts as primary-source, including subdomains.
const PRIMARY_SOURCE_DOMAINS: &[&str] = &[
    "openai.com",
    "anthropic.com",
    "deepmind.google",
    "ai.meta.com",
    "mistral.ai",
    "x.ai",
    "cohere.com",
    "huggingface.co",
    "stability.ai",
    "deepseek.com",
    "blogs.nvidia.com",
];

/// Company and product names that mark content as being *about* a primary
/// source even when mirrored on third-party sites. Matched against the
/// lowercased title+content.
const PRIMARY_SOURCE_KEYWORDS: &[&str] = &[
    "openai",
    "chatgpt",
    "anthropic",
    "claude",
    "gemini",
    "deepmind",
    "llama",
    "mistral",
    "grok",
    "copilot",
    "deepseek",
    "midjourney",
    "stable diffusion",
    "hugging face",
];

/// An ordered list of patterns with a shared label, matched any-of against
/// lowercased text. Groups compose: any-of within a group, all-of across
/// groups.
pub struct PatternGroup {
    label: &'static str,
    patterns: Vec<Regex>,
}

impl PatternGroup {
    fn new(label: &'static str, raw: &[&str]) -> Self {
        let patterns = raw
            .iter()
            .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("bad pattern in {label}: {e}")))
            .collect();
        Self { label, patterns }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Any-of combinator: true when at least one pattern matches.
    pub fn any_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// All-of combinator across groups: every group must have a match.
fn all_groups_match(groups: &[&PatternGroup], text: &str) -> bool {
    groups.iter().all(|g| g.any_match(text))
}

/// Market-noise vocabulary: currency amounts, percent moves, trading terms.
static FINANCE: Lazy<PatternGroup> = Lazy::new(|| {
    PatternGroup::new(
        "finance",
        &[
            r"\$\s?\d",
            r"\d+(?:\.\d+)?\s?%",
            r"\bstocks?\b",
            r"\bshares?\b",
            r"\bearnings\b",
            r"\brevenue\b",
            r"\bipo\b",
            r"\bvaluations?\b",
            r"\bmarket cap\b",
            r"\bnasdaq\b",
            r"\bwall street\b",
            r"\binvestors?\b",
            r"\bquarterly\b",
            r"\bdividends?\b",
            r"\bprofits?\b",
        ],
    )
});

/// Product-launch guard, group one: an action word.
static LAUNCH_ACTIONS: Lazy<PatternGroup> = Lazy::new(|| {
    PatternGroup::new(
        "launch_actions",
        &[
            r"\blaunch(?:es|ed)?\b",
            r"\bunveil(?:s|ed)?\b",
            r"\brelease(?:s|d)?\b",
            r"\bannounce(?:s|d)?\b",
            r"\bintroduc(?:es|ed|ing)\b",
            r"\bdebuts?\b",
            r"\bships?\b",
            r"\brolls? out\b",
        ],
    )
});

/// Product-launch guard, group two: something being launched.
static LAUNCH_SUBJECTS: Lazy<PatternGroup> = Lazy::new(|| {
    PatternGroup::new(
        "launch_subjects",
        &[
            r"\bmodels?\b",
            r"\bfeatures?\b",
            r"\btools?\b",
            r"\bproducts?\b",
            r"\bapps?\b",
            r"\bapis?\b",
            r"\bagents?\b",
            r"\bassistants?\b",
            r"\bupdates?\b",
            r"\bversions?\b",
            r"\bchatbots?\b",
        ],
    )
});

/// True when the URL points at a site root or a single path segment,
/// probably a homepage or section index rather than an article. Callers
/// decide what to do with the signal; it is not a hard reject everywhere.
pub fn is_homepage_url(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return false,
    };
    let segments = parsed
        .path_segments()
        .map(|s| s.filter(|part| !part.is_empty()).count())
        .unwrap_or(0);
    segments <= 1
}

/// True when the URL's host is one of the primary AI-company domains or a
/// subdomain of one.
pub fn is_primary_source_url(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return false,
    };
    let host = match parsed.host_str() {
        Some(h) => h.strip_prefix("www.").unwrap_or(h),
        None => return false,
    };
    PRIMARY_SOURCE_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

/// True when the title or content mentions a primary-source company or
/// product by name.
pub fn is_about_primary_source(title: &str, content: &str) -> bool {
    let text = format!("{} {}", title, content).to_lowercase();
    PRIMARY_SOURCE_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Guarded finance reject: true only when the title matches at least one
/// finance pattern AND does not look like a product-launch announcement.
/// The guard requires a match in *both* launch groups (action and subject)
/// and overrides the reject.
pub fn is_finance_title(title: &str) -> bool {
    let title = title.to_lowercase();
    if !FINANCE.any_match(&title) {
        return false;
    }
    !all_groups_match(&[&LAUNCH_ACTIONS, &LAUNCH_SUBJECTS], &title)
}
