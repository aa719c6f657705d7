//! Markdown rendering of event descriptions.
//!
//! # Responsibility
//! - Define the rendering seam consumed by the event service.
//! - Provide the default regex-based renderer producing both the HTML and
//!   the plain-text projection of a description.
//!
//! # Invariants
//! - HTML output is escaped before any markup substitution.
//! - Only hashtags present in the resolved set are turned into anchors.
//! - The text projection never contains markdown decoration characters.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("valid image regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid code regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid italic regex"));
static HEADING_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A(#{1,6})\s+(.+)\z").expect("valid heading regex"));
static HASH_TAG_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w#])#(\w+)").expect("valid hashtag anchor regex"));

static HEADING_MARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid heading mark regex"));
static LIST_MARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("valid list mark regex"));
static SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\*_`>~\[\]\(\)!]+").expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Both projections derived from one description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub html: String,
    pub text: String,
}

/// Rendering seam: given the raw description and the resolved hashtag set,
/// produces the HTML and plain-text projections to persist.
pub trait MarkdownRenderer {
    fn render(&self, description: &str, hash_tags: &[String]) -> Rendering;
}

/// Default renderer: a small regex transformer covering the markdown subset
/// journal descriptions actually use (headings, paragraphs, emphasis, code,
/// links, images, hashtag anchors).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMarkdownRenderer;

impl MarkdownRenderer for RegexMarkdownRenderer {
    fn render(&self, description: &str, hash_tags: &[String]) -> Rendering {
        Rendering {
            html: render_html(description, hash_tags),
            text: render_text(description),
        }
    }
}

fn render_html(description: &str, hash_tags: &[String]) -> String {
    let escaped = escape_html(description);
    let mut blocks = Vec::new();

    for block in escaped.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        if let Some(caps) = HEADING_BLOCK_RE.captures(block) {
            let level = caps[1].len();
            let body = render_inline(&caps[2], hash_tags);
            blocks.push(format!("<h{level}>{body}</h{level}>"));
        } else {
            let body = render_inline(block, hash_tags).replace('\n', "<br>");
            blocks.push(format!("<p>{body}</p>"));
        }
    }

    blocks.join("\n")
}

fn render_inline(text: &str, hash_tags: &[String]) -> String {
    let with_code = CODE_RE.replace_all(text, "<code>$1</code>");
    let with_images = IMAGE_RE.replace_all(&with_code, r#"<img src="$2" alt="$1">"#);
    let with_links = LINK_RE.replace_all(&with_images, r#"<a href="$2">$1</a>"#);
    let with_bold = BOLD_RE.replace_all(&with_links, "<strong>$1</strong>");
    let with_italic = ITALIC_RE.replace_all(&with_bold, "<em>$1</em>");

    HASH_TAG_ANCHOR_RE
        .replace_all(&with_italic, |caps: &Captures| {
            let name = caps[2].to_lowercase();
            if hash_tags.iter().any(|tag| *tag == name) {
                format!(
                    r##"{}<a class="hash-tag" href="/hash_tags/{}">#{}</a>"##,
                    &caps[1], name, &caps[2]
                )
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn render_text(description: &str) -> String {
    let without_images = IMAGE_RE.replace_all(description, " ");
    let without_links = LINK_RE.replace_all(&without_images, "$1");
    let without_heading_marks = HEADING_MARK_RE.replace_all(&without_links, "");
    let without_list_marks = LIST_MARK_RE.replace_all(&without_heading_marks, "");
    let without_symbols = SYMBOL_RE.replace_all(&without_list_marks, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    normalized.trim().to_string()
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
