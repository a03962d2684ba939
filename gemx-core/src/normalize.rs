//! Message node to Markdown conversion.
//!
//! Every conversion starts by re-parsing the node's outer HTML into a
//! detached fragment. The walk below only ever reads that snapshot, so the
//! live document is never touched.

use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

const REMOVED_TAGS: &[&str] = &[
    "button", "input", "textarea", "select", "svg", "mat-icon", "script", "style", "noscript",
    "img", "header", "template",
];
const DECORATION_CLASS_PARTS: &[&str] = &[
    "icon", "avatar", "toolbar", "menu", "label", "header", "sender", "author",
];
const ROLE_LABELS: &[&str] = &["you said", "gemini said", "you", "gemini", "show thinking"];
const ROLE_LABEL_MAX_CHARS: usize = 20;
const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

static RESIDUAL_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:you said|gemini said|show thinking)[ \t]*(?::[ \t]*|$)")
        .expect("valid regex")
});
static TRAILING_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static CODE_SLOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").expect("valid regex"));
static LANGUAGE_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:language|lang)-([A-Za-z0-9_+#.-]+)$|^([A-Za-z0-9_+#]+)-code$")
        .expect("valid regex")
});

/// Normalizes a located message node. Returns `None` when nothing but
/// decoration was left.
pub fn normalize_element(element: ElementRef<'_>) -> Option<String> {
    normalize_fragment(&element.html())
}

/// Role labels are only dropped while some other text survives; a body that
/// consists of nothing but a label word is kept as written.
pub fn normalize_fragment(html: &str) -> Option<String> {
    let snapshot = Html::parse_fragment(html);
    render_snapshot(&snapshot, true).or_else(|| render_snapshot(&snapshot, false))
}

fn render_snapshot(snapshot: &Html, strip_labels: bool) -> Option<String> {
    let mut writer = MarkdownWriter {
        keep_labels: !strip_labels,
        ..MarkdownWriter::default()
    };
    for child in snapshot.root_element().children() {
        writer.walk(child, true);
    }

    let cleaned = cleanup(&writer.out, strip_labels);
    if cleaned.is_empty() {
        return None;
    }
    Some(writer.fill_code_slots(&cleaned))
}

/// Best-effort language tag for a code block; empty when nothing matches.
pub fn detect_language(element: ElementRef<'_>) -> String {
    let candidates = std::iter::once(element).chain(
        element
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "code"),
    );

    for candidate in candidates {
        let value = candidate.value();
        for class in value.classes() {
            if let Some(caps) = LANGUAGE_CLASS_RE.captures(class)
                && let Some(lang) = caps.get(1).or_else(|| caps.get(2))
            {
                return lang.as_str().to_ascii_lowercase();
            }
        }
        for attr in ["data-language", "data-lang"] {
            if let Some(lang) = value.attr(attr).map(str::trim)
                && !lang.is_empty()
            {
                return lang.to_ascii_lowercase();
            }
        }
    }

    String::new()
}

/// Line cleanup over prose only: code blocks are still slot markers here.
fn cleanup(raw: &str, strip_labels: bool) -> String {
    let without_labels = if strip_labels {
        RESIDUAL_LABEL_RE.replace_all(raw, "")
    } else {
        raw.into()
    };
    let without_trailing = TRAILING_WS_RE.replace_all(&without_labels, "");
    let collapsed = BLANK_RUN_RE.replace_all(&without_trailing, "\n\n");
    collapsed.trim().to_string()
}

#[derive(Default)]
struct MarkdownWriter {
    out: String,
    after_list_marker: bool,
    list_depth: usize,
    keep_labels: bool,
    /// Fenced blocks, referenced from `out` by slot markers.
    code_blocks: Vec<String>,
}

impl MarkdownWriter {
    fn walk(&mut self, node: NodeRef<'_, Node>, is_root: bool) {
        match node.value() {
            Node::Text(text) => self.push_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    if !is_root && self.is_removable(element) {
                        return;
                    }
                    self.element(element);
                }
            }
            _ => {}
        }
    }

    fn walk_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            self.walk(child, false);
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        match name {
            "pre" => self.code_block(element),
            "code" => {
                let source = element.text().collect::<String>();
                let code = collapse_whitespace(&source);
                let code = code.trim();
                if !code.is_empty() {
                    self.push_inline(&source, &format!("`{code}`"));
                }
            }
            "b" | "strong" => self.wrapped(element, "**"),
            "i" | "em" => self.wrapped(element, "*"),
            "a" => {
                let source = element.text().collect::<String>();
                let text = self.render_inline(element);
                match element.value().attr("href").map(str::trim) {
                    Some(href) if !href.is_empty() => {
                        let text = if text.is_empty() { href } else { text.as_str() };
                        self.push_inline(&source, &format!("[{text}]({href})"));
                    }
                    _ => self.push_inline(&source, &text),
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(name.as_bytes()[1] - b'0');
                let text = self.render_inline(element).replace('\n', " ");
                if !text.is_empty() {
                    self.paragraph_break();
                    self.push_raw(&format!("{} {text}", "#".repeat(level)));
                    self.paragraph_break();
                }
            }
            "li" => {
                self.line_break();
                self.out.push_str("- ");
                self.after_list_marker = true;
                self.list_depth += 1;
                self.walk_children(element);
                self.list_depth -= 1;
                self.after_list_marker = false;
                self.line_break();
            }
            "ul" | "ol" => {
                self.line_break();
                self.walk_children(element);
                self.line_break();
            }
            "p" | "blockquote" => {
                self.paragraph_break();
                self.walk_children(element);
                self.paragraph_break();
            }
            "br" => {
                self.out.push('\n');
                self.after_list_marker = false;
            }
            "div" | "section" | "article" | "tr" | "table" | "hr" => {
                self.line_break();
                self.walk_children(element);
                self.line_break();
            }
            "td" | "th" => {
                self.walk_children(element);
                self.push_raw(" ");
            }
            _ => self.walk_children(element),
        }
    }

    fn code_block(&mut self, element: ElementRef<'_>) {
        let language = detect_language(element);
        let raw = element.text().collect::<String>();
        let body = raw.trim_end_matches('\n');
        self.paragraph_break();
        let slot = self.code_blocks.len();
        self.out.push_str(&format!("{SLOT_OPEN}{slot}{SLOT_CLOSE}"));
        self.code_blocks.push(format!("```{language}\n{body}\n```"));
        self.after_list_marker = false;
        self.paragraph_break();
    }

    fn wrapped(&mut self, element: ElementRef<'_>, marker: &str) {
        let source = element.text().collect::<String>();
        let inner = self.render_inline(element);
        if inner.is_empty() {
            if source.contains(char::is_whitespace) {
                self.push_text(" ");
            }
        } else {
            self.push_inline(&source, &format!("{marker}{inner}{marker}"));
        }
    }

    fn render_inline(&mut self, element: ElementRef<'_>) -> String {
        let mut nested = MarkdownWriter {
            keep_labels: self.keep_labels,
            code_blocks: std::mem::take(&mut self.code_blocks),
            ..MarkdownWriter::default()
        };
        nested.walk_children(element);
        self.code_blocks = nested.code_blocks;
        nested.out.trim().to_string()
    }

    /// Pushes inline markup, keeping a separating space only where the
    /// source text had whitespace at that edge.
    fn push_inline(&mut self, source: &str, markup: &str) {
        if source.starts_with(char::is_whitespace) {
            self.push_text(" ");
        }
        self.push_raw(markup);
        if source.ends_with(char::is_whitespace) {
            self.push_text(" ");
        }
    }

    fn push_text(&mut self, text: &str) {
        let collapsed = collapse_whitespace(text);
        let at_line_start = self.out.is_empty() || self.out.ends_with('\n');
        let collapsed = if at_line_start || self.out.ends_with(' ') {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if collapsed.is_empty() {
            return;
        }
        self.out.push_str(collapsed);
        self.after_list_marker = false;
    }

    fn push_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.out.push_str(text);
        self.after_list_marker = false;
    }

    fn line_break(&mut self) {
        if self.after_list_marker || self.out.is_empty() || self.out.ends_with('\n') {
            return;
        }
        self.out.push('\n');
    }

    fn paragraph_break(&mut self) {
        if self.list_depth > 0 {
            self.line_break();
            return;
        }
        if self.after_list_marker || self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn is_removable(&self, element: ElementRef<'_>) -> bool {
        let value = element.value();
        if REMOVED_TAGS.contains(&value.name()) {
            return true;
        }
        if value
            .attr("aria-hidden")
            .is_some_and(|hidden| hidden.eq_ignore_ascii_case("true"))
        {
            return true;
        }
        if value.classes().any(|class| {
            let class = class.to_ascii_lowercase();
            DECORATION_CLASS_PARTS.iter().any(|part| class.contains(part))
        }) {
            return true;
        }

        !self.keep_labels && is_role_label_leaf(element)
    }

    fn fill_code_slots(&self, cleaned: &str) -> String {
        CODE_SLOT_RE
            .replace_all(cleaned, |caps: &regex::Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.code_blocks.get(index))
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

fn is_role_label_leaf(element: ElementRef<'_>) -> bool {
    if element.children().any(|child| child.value().is_element()) {
        return false;
    }
    let text = element.text().collect::<String>();
    let text = text.trim();
    text.chars().count() < ROLE_LABEL_MAX_CHARS
        && ROLE_LABELS
            .iter()
            .any(|label| text.eq_ignore_ascii_case(label))
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars().filter(|c| !matches!(*c, SLOT_OPEN | SLOT_CLOSE)) {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
