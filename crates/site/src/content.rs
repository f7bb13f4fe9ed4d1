//! Rendering of stored post bodies into displayable markup.
//!
//! Post bodies come in two shapes:
//!
//! - Markdown with ```` ``` ```` fenced code blocks
//! - HTML fragments whose code sits in `<pre><code class="language-X">`
//!
//! Both are split into alternating prose and code segments. Prose gets a fixed
//! table of presentation classes. Code is highlighted with syntect into
//! `hl-` prefixed token classes, styled by [`highlight_css`], and wrapped in a
//! `<figure>`. Rendering is pure, deterministic and total: malformed input
//! degrades to literal text.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use comrak::{Options, markdown_to_html};
use moka::future::Cache;
use regex::{Captures, Regex};
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Language used for code without a language tag.
pub const DEFAULT_LANGUAGE: &str = "text";

/// Average reading speed used for reading-time estimates.
const WORDS_PER_MINUTE: usize = 200;

/// Presentation classes attached to bare opening tags in prose.
const PROSE_CLASSES: &[(&str, &str)] = &[
    ("h1", "text-3xl font-bold mt-8 mb-4"),
    ("h2", "text-2xl font-bold mt-8 mb-4"),
    ("h3", "text-xl font-semibold mt-6 mb-3"),
    ("h4", "text-lg font-semibold mt-4 mb-2"),
    ("p", "mb-4 leading-relaxed"),
    ("ul", "list-disc pl-6 mb-4"),
    ("ol", "list-decimal pl-6 mb-4"),
    ("li", "mb-1"),
    ("blockquote", "border-l-4 border-gray-300 pl-4 italic my-4"),
    ("strong", "font-semibold"),
    ("em", "italic"),
];

static PROSE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(h1|h2|h3|h4|p|ul|ol|li|blockquote|strong|em)>").expect("Invalid regex")
});

/// `<pre><code ...>...</code></pre>`, capturing the code attributes and body.
static HTML_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre[^>]*>\s*<code([^>]*)>(.*?)</code>\s*</pre>").expect("Invalid regex")
});

static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class\s*=\s*["']([^"']*)["']"#).expect("Invalid regex")
});

static BLOCK_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<(p|h[1-6]|div|ul|ol|blockquote|section|article|figure|table|pre)[\s>]")
        .expect("Invalid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

/// Token classes are emitted as `hl-<scope>`.
const HIGHLIGHT_CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Bundled syntect theme the stylesheet is generated from.
const HIGHLIGHT_THEME: &str = "InspiredGitHub";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

static HIGHLIGHT_CSS: LazyLock<String> = LazyLock::new(|| {
    let themes = ThemeSet::load_defaults();
    match themes.themes.get(HIGHLIGHT_THEME) {
        Some(theme) => css_for_theme_with_class_style(theme, HIGHLIGHT_CLASS_STYLE)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to build highlight stylesheet");
                String::new()
            }),
        None => {
            tracing::error!(theme = HIGHLIGHT_THEME, "Highlight theme missing");
            String::new()
        }
    }
});

// =============================================================================
// Segments
// =============================================================================

/// Stored body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Markdown,
    Html,
}

impl BodyFormat {
    /// Detect the format of a stored body.
    #[must_use]
    pub fn detect(body: &str) -> Self {
        let lower = body.to_ascii_lowercase();
        if lower.contains("<pre><code") || BLOCK_START_RE.is_match(body.trim_start()) {
            Self::Html
        } else {
            Self::Markdown
        }
    }
}

/// A piece of a post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text in the body's own format.
    Prose(String),
    /// Literal code with its language tag.
    Code { language: String, code: String },
}

/// Split a body into prose and code segments. Empty prose is dropped.
#[must_use]
pub fn split_segments(body: &str, format: BodyFormat) -> Vec<Segment> {
    match format {
        BodyFormat::Markdown => split_markdown(body),
        BodyFormat::Html => split_html(body),
    }
}

fn split_markdown(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prose = String::new();
    let mut lines = body.split_inclusive('\n').peekable();

    while let Some(line) = lines.next() {
        let Some(info) = line.trim_start().strip_prefix("```") else {
            prose.push_str(line);
            continue;
        };

        let mut fence = String::from(line);
        let mut code = String::new();
        let mut closed = false;
        while let Some(inner) = lines.next_if(|_| !closed) {
            if inner.trim() == "```" {
                closed = true;
            } else {
                fence.push_str(inner);
                code.push_str(inner);
            }
        }

        if closed {
            push_prose(&mut segments, &mut prose);
            if code.ends_with('\n') {
                code.pop();
                if code.ends_with('\r') {
                    code.pop();
                }
            }
            segments.push(Segment::Code {
                language: language_tag(info.split_whitespace().next()),
                code,
            });
        } else {
            // Unterminated fence: keep everything as text.
            prose.push_str(&fence);
        }
    }

    push_prose(&mut segments, &mut prose);
    segments
}

fn split_html(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in HTML_CODE_RE.captures_iter(body) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(2)) else {
            continue;
        };

        let mut prose = body.get(last..whole.start()).unwrap_or_default().to_owned();
        push_prose(&mut segments, &mut prose);

        let language = caps
            .get(1)
            .and_then(|attrs| CLASS_ATTR_RE.captures(attrs.as_str()))
            .and_then(|class| class.get(1))
            .and_then(|class| {
                class.as_str().split_whitespace().find_map(|token| {
                    token
                        .strip_prefix("language-")
                        .or_else(|| token.strip_prefix("lang-"))
                })
            });

        segments.push(Segment::Code {
            language: language_tag(language),
            code: html_escape::decode_html_entities(code.as_str()).into_owned(),
        });
        last = whole.end();
    }

    let mut rest = body.get(last..).unwrap_or_default().to_owned();
    push_prose(&mut segments, &mut rest);
    segments
}

fn push_prose(segments: &mut Vec<Segment>, prose: &mut String) {
    if prose.trim().is_empty() {
        prose.clear();
    } else {
        segments.push(Segment::Prose(std::mem::take(prose)));
    }
}

/// Normalize a language tag: lowercase, restricted alphabet, `text` if empty.
fn language_tag(raw: Option<&str>) -> String {
    let tag: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect::<String>()
        .to_ascii_lowercase();

    if tag.is_empty() {
        DEFAULT_LANGUAGE.to_owned()
    } else {
        tag
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// A rendered segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedSegment {
    Prose { html: String },
    Code { language: String, html: String },
}

impl RenderedSegment {
    #[must_use]
    pub fn html(&self) -> &str {
        match self {
            Self::Prose { html } | Self::Code { html, .. } => html,
        }
    }
}

/// A fully rendered body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBody {
    pub format: BodyFormat,
    pub segments: Vec<RenderedSegment>,
    /// All segments concatenated.
    pub html: String,
}

/// Render a stored body.
#[must_use]
pub fn render_body(body: &str) -> RenderedBody {
    let format = BodyFormat::detect(body);

    let segments: Vec<RenderedSegment> = split_segments(body, format)
        .into_iter()
        .map(|segment| match segment {
            Segment::Prose(text) => RenderedSegment::Prose {
                html: render_prose(&text, format),
            },
            Segment::Code { language, code } => RenderedSegment::Code {
                html: render_code(&language, &code),
                language,
            },
        })
        .collect();

    let html = segments.iter().map(RenderedSegment::html).collect();
    RenderedBody {
        format,
        segments,
        html,
    }
}

fn render_prose(text: &str, format: BodyFormat) -> String {
    let html = match format {
        BodyFormat::Markdown => render_markdown(text),
        BodyFormat::Html => text.to_owned(),
    };
    apply_prose_classes(&html)
}

/// Render Markdown with GitHub Flavored Markdown support. Raw HTML is
/// escaped.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    // Enable GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.superscript = true;
    options.extension.footnotes = true;

    options.render.hardbreaks = true;
    options.render.escape = true;

    markdown_to_html(content, &options)
}

/// Attach presentation classes to bare opening tags.
fn apply_prose_classes(html: &str) -> String {
    PROSE_TAG_RE
        .replace_all(html, |caps: &Captures| {
            let tag = caps.get(1).map_or("", |m| m.as_str());
            PROSE_CLASSES
                .iter()
                .find(|(name, _)| *name == tag)
                .map_or_else(
                    || caps.get(0).map_or("", |m| m.as_str()).to_owned(),
                    |(name, class)| format!(r#"<{name} class="{class}">"#),
                )
        })
        .into_owned()
}

fn render_code(language: &str, code: &str) -> String {
    let attr = html_escape::encode_double_quoted_attribute(language);
    format!(
        r#"<figure class="code-block" data-language="{attr}"><figcaption class="code-block-language">{}</figcaption><pre><code class="language-{attr}">{}</code></pre></figure>"#,
        html_escape::encode_text(language),
        highlight(language, code)
    )
}

/// Highlight code into escaped markup with `hl-` token classes.
///
/// Unknown languages use the plain-text grammar; a grammar failure falls
/// back to escaped text.
fn highlight(language: &str, code: &str) -> String {
    let syntax = SYNTAXES
        .find_syntax_by_token(language)
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, HIGHLIGHT_CLASS_STYLE);

    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            tracing::warn!(language, error = %e, "Highlighting failed, rendering plain code");
            return html_escape::encode_text(code).into_owned();
        }
    }
    generator.finalize()
}

/// Stylesheet for highlighted code, served at `/highlight.css`.
#[must_use]
pub fn highlight_css() -> &'static str {
    &HIGHLIGHT_CSS
}

/// Estimated reading time, at least one minute.
#[must_use]
pub fn reading_time_minutes(body: &str) -> u32 {
    let text = match BodyFormat::detect(body) {
        BodyFormat::Html => TAG_RE.replace_all(body, " ").into_owned(),
        BodyFormat::Markdown => body.to_owned(),
    };
    let words = text.split_whitespace().count();
    u32::try_from(words.div_ceil(WORDS_PER_MINUTE))
        .unwrap_or(u32::MAX)
        .max(1)
}

// =============================================================================
// Cache
// =============================================================================

/// Cache of rendered bodies keyed by slug and last update.
///
/// An edit changes `updatedAt`, which changes the key, so stale renders are
/// never served.
#[derive(Clone)]
pub struct RenderCache {
    cache: Cache<(String, Option<i64>), Arc<RenderedBody>>,
}

impl RenderCache {
    /// Create a cache holding up to 500 bodies for five minutes each.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(500)
                .time_to_live(Duration::from_secs(300))
                .build(),
        }
    }

    /// Render a body, reusing the cached result for the same revision.
    pub async fn render(
        &self,
        slug: &str,
        updated_at: Option<DateTime<Utc>>,
        body: &str,
    ) -> Arc<RenderedBody> {
        let key = (slug.to_owned(), updated_at.map(|t| t.timestamp_millis()));
        self.cache
            .get_with(key, async { Arc::new(render_body(body)) })
            .await
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(BodyFormat::detect("plain paragraph"), BodyFormat::Markdown);
        assert_eq!(BodyFormat::detect("# Title\n\ntext"), BodyFormat::Markdown);
        assert_eq!(BodyFormat::detect("  <p>Hello</p>"), BodyFormat::Html);
        assert_eq!(
            BodyFormat::detect("Intro\n<pre><code class=\"language-rs\">x</code></pre>"),
            BodyFormat::Html
        );
        assert_eq!(BodyFormat::detect("<span>inline</span>"), BodyFormat::Markdown);
    }

    #[test]
    fn test_plain_paragraph_is_one_escaped_prose_block() {
        let rendered = render_body("plain paragraph");
        assert_eq!(rendered.segments.len(), 1);
        assert!(matches!(rendered.segments.first(), Some(RenderedSegment::Prose { .. })));
        assert!(rendered.html.contains("plain paragraph"));
        assert!(rendered.html.starts_with(r#"<p class="mb-4 leading-relaxed">"#));
    }

    #[test]
    fn test_markdown_raw_html_is_escaped() {
        let rendered = render_body("hello <script>alert(1)</script>");
        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_split_markdown_fences() {
        let body = "Intro\n\n```Rust ignore\nfn main() {}\n```\nOutro\n```\nno lang\n```";
        let segments = split_segments(body, BodyFormat::Markdown);

        assert_eq!(
            segments,
            vec![
                Segment::Prose("Intro\n\n".to_owned()),
                Segment::Code {
                    language: "rust".to_owned(),
                    code: "fn main() {}".to_owned()
                },
                Segment::Prose("Outro\n".to_owned()),
                Segment::Code {
                    language: "text".to_owned(),
                    code: "no lang".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_fence_stays_prose() {
        let body = "Before\n```python\nprint('x')\n";
        let segments = split_segments(body, BodyFormat::Markdown);
        assert_eq!(segments, vec![Segment::Prose(body.to_owned())]);
    }

    #[test]
    fn test_split_html_code_blocks() {
        let body = r#"<p>See:</p><pre><code class="hljs language-kotlin">val x = a &lt; b &amp;&amp; c</code></pre><p>Done</p><pre><code>plain</code></pre>"#;
        let segments = split_segments(body, BodyFormat::Html);

        assert_eq!(
            segments,
            vec![
                Segment::Prose("<p>See:</p>".to_owned()),
                Segment::Code {
                    language: "kotlin".to_owned(),
                    code: "val x = a < b && c".to_owned()
                },
                Segment::Prose("<p>Done</p>".to_owned()),
                Segment::Code {
                    language: "text".to_owned(),
                    code: "plain".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_code_is_escaped_and_wrapped() {
        let rendered = render_body("```\n<b>bold</b>\n```");
        assert!(rendered.html.starts_with(
            r#"<figure class="code-block" data-language="text"><figcaption class="code-block-language">text</figcaption><pre><code class="language-text">"#
        ));
        assert!(rendered.html.ends_with("</code></pre></figure>"));
        assert!(rendered.html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!rendered.html.contains("<b>"));
    }

    #[test]
    fn test_known_language_is_highlighted() {
        let rendered = render_body("```rust\nfn main() { let x = 1; }\n```");
        let Some(RenderedSegment::Code { language, html }) = rendered.segments.first() else {
            panic!("expected a code segment");
        };
        assert_eq!(language, "rust");
        assert!(html.contains(r#"<span class="hl-"#));
        assert!(html.contains("main"));
        assert_eq!(rendered, render_body("```rust\nfn main() { let x = 1; }\n```"));
    }

    #[test]
    fn test_highlight_stylesheet_targets_token_classes() {
        assert!(highlight_css().contains(".hl-"));
    }

    #[test]
    fn test_html_code_entities_decode_once() {
        let body = r#"<pre><code class="language-js">if (a) &#123; b(&quot;c&quot;) &#125; &hellip;</code></pre>"#;
        let segments = split_segments(body, BodyFormat::Html);
        assert_eq!(
            segments,
            vec![Segment::Code {
                language: "js".to_owned(),
                code: "if (a) { b(\"c\") } \u{2026}".to_owned()
            }]
        );

        let rendered = render_body(body);
        assert!(!rendered.html.contains("&amp;#123;"));
        assert!(!rendered.html.contains("&amp;hellip;"));
        assert!(rendered.html.contains('\u{2026}'));
    }

    #[test]
    fn test_prose_classes_only_touch_bare_tags() {
        let html = apply_prose_classes(
            r#"<h2>T</h2><p id="keep">x</p><em>e</em><span>s</span><h5>h</h5>"#,
        );
        assert_eq!(
            html,
            r#"<h2 class="text-2xl font-bold mt-8 mb-4">T</h2><p id="keep">x</p><em class="italic">e</em><span>s</span><h5>h</h5>"#
        );
    }

    #[test]
    fn test_html_prose_passes_through() {
        let rendered = render_body("<div><p>Hi</p><custom-tag>ok</custom-tag></div>");
        assert_eq!(
            rendered.html,
            r#"<div><p class="mb-4 leading-relaxed">Hi</p><custom-tag>ok</custom-tag></div>"#
        );
    }

    #[test]
    fn test_render_is_total_on_malformed_input() {
        for body in ["", "```", "<pre><code class=\"language-", "<<<>>>", "\u{0}\u{feff}"] {
            let first = render_body(body);
            assert_eq!(first, render_body(body));
        }
    }

    #[test]
    fn test_language_tag_sanitized() {
        assert_eq!(language_tag(Some("C++")), "c++");
        assert_eq!(language_tag(Some("\"><script>")), "script");
        assert_eq!(language_tag(Some("")), "text");
        assert_eq!(language_tag(None), "text");
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time_minutes(""), 1);
        assert_eq!(reading_time_minutes(&"word ".repeat(401)), 3);
        assert_eq!(reading_time_minutes("<p>one two</p>"), 1);
    }

    #[tokio::test]
    async fn test_render_cache_keys_on_revision() {
        let cache = RenderCache::new();
        let at = DateTime::from_timestamp(1_700_000_000, 0);

        let first = cache.render("post", at, "first body").await;
        let cached = cache.render("post", at, "ignored body").await;
        assert!(Arc::ptr_eq(&first, &cached));

        let later = at.map(|t| t + chrono::TimeDelta::seconds(1));
        let fresh = cache.render("post", later, "second body").await;
        assert!(fresh.html.contains("second body"));
    }
}
