use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::model::{Message, MessageRole};
use crate::normalize::normalize_element;

const ROLE_ATTRS: &[&str] = &["data-role", "data-message-author-role", "data-author"];
const HUMAN_HINTS: &[&str] = &["user", "query", "human", "prompt"];
const TIMESTAMP_ATTRS: &[&str] = &[
    "data-timestamp",
    "data-time",
    "data-created-at",
    "data-created",
    "datetime",
];
const MAX_ANCESTOR_LEVELS: usize = 5;
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

static ROLE_TAGGED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("user-query, model-response").expect("valid selector"));
static HEURISTIC: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"[class*="user-query"], [class*="query-text"], [class*="query-content"], [class*="model-response"], [class*="response-content"], [class*="message-content"], message-content, [data-message-author-role], [data-role]"#,
    )
    .expect("valid selector")
});
static HUMAN_CONTENT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#".query-text, .query-content, [class*="query-text"]"#)
        .expect("valid selector")
});
static ASSISTANT_CONTENT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"message-content, .markdown, [class*="markdown"]"#).expect("valid selector")
});
static TIME_ELEMENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time").expect("valid selector"));
static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?\s*(?:[ap]\.?m\.?)?|\b\d{4}-\d{2}-\d{2}\b|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b",
    )
    .expect("valid regex")
});

/// A message-bearing node found in the current document.
#[derive(Debug, Clone)]
pub struct LocatedMessage<'a> {
    pub role: MessageRole,
    pub content: ElementRef<'a>,
    pub timestamp: Option<String>,
}

/// Finds every message container currently in `document`, in document order.
///
/// Purpose-built `user-query` / `model-response` elements are used when the
/// page has them; otherwise class and attribute heuristics pick the topmost
/// matching nodes.
pub fn locate_messages<'a>(document: &'a Html, offset: &FixedOffset) -> Vec<LocatedMessage<'a>> {
    let mut containers = document.select(&ROLE_TAGGED).collect::<Vec<_>>();
    if containers.is_empty() {
        containers = topmost(document.select(&HEURISTIC).collect());
        debug!(count = containers.len(), "role-tagged elements absent, using heuristics");
    }

    containers
        .into_iter()
        .map(|container| {
            let role = classify_role(container);
            let content_selector = match role {
                MessageRole::Human => &*HUMAN_CONTENT,
                MessageRole::Assistant => &*ASSISTANT_CONTENT,
            };
            let content = container
                .select(content_selector)
                .next()
                .unwrap_or(container);
            LocatedMessage {
                role,
                content,
                timestamp: extract_timestamp(container, offset),
            }
        })
        .collect()
}

/// Locates and normalizes one batch. Nodes that normalize to nothing are
/// skipped.
pub fn extract_batch(html: &str, offset: &FixedOffset) -> Vec<Message> {
    let document = Html::parse_document(html);
    locate_messages(&document, offset)
        .into_iter()
        .filter_map(|located| {
            let content = normalize_element(located.content)?;
            Some(Message {
                role: located.role,
                content,
                timestamp: located.timestamp,
            })
        })
        .collect()
}

fn topmost(candidates: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids = candidates
        .iter()
        .map(|candidate| candidate.id())
        .collect::<HashSet<_>>();
    candidates
        .into_iter()
        .filter(|candidate| !candidate.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
        .collect()
}

/// Explicit role attributes win, then human-flavoured tag or class names;
/// everything else is the assistant.
pub fn classify_role(element: ElementRef<'_>) -> MessageRole {
    let value = element.value();
    for attr in ROLE_ATTRS {
        if let Some(role) = value.attr(attr) {
            let role = role.trim().to_ascii_lowercase();
            return if role == "user" || role == "human" {
                MessageRole::Human
            } else {
                MessageRole::Assistant
            };
        }
    }

    let haystack = format!(
        "{} {}",
        value.name(),
        value.attr("class").unwrap_or_default()
    )
    .to_ascii_lowercase();
    if HUMAN_HINTS.iter().any(|hint| haystack.contains(hint)) {
        MessageRole::Human
    } else {
        MessageRole::Assistant
    }
}

/// Opportunistic timestamp lookup; `None` when nothing usable is present.
pub fn extract_timestamp(element: ElementRef<'_>, offset: &FixedOffset) -> Option<String> {
    let mut current = Some(element);
    for _ in 0..=MAX_ANCESTOR_LEVELS {
        let Some(node) = current else {
            break;
        };
        for attr in TIMESTAMP_ATTRS {
            if let Some(raw) = node.value().attr(attr)
                && !raw.trim().is_empty()
            {
                return Some(interpret_timestamp(raw, offset));
            }
        }
        current = node.parent().and_then(ElementRef::wrap);
    }

    if let Some(time) = element.select(&TIME_ELEMENT).next() {
        let raw = time
            .value()
            .attr("datetime")
            .map(ToString::to_string)
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| time.text().collect::<String>());
        if !raw.trim().is_empty() {
            return Some(interpret_timestamp(&raw, offset));
        }
    }

    std::iter::once(element)
        .chain(element.descendants().filter_map(ElementRef::wrap))
        .filter_map(|candidate| candidate.value().attr("aria-label"))
        .find(|label| TIME_PATTERN.is_match(label))
        .map(|label| interpret_timestamp(label, offset))
}

/// Digits are Unix time (seconds up to 10 digits, milliseconds beyond);
/// other values go through a generic date parse and pass through unchanged
/// when that fails.
pub fn interpret_timestamp(raw: &str, offset: &FixedOffset) -> String {
    let trimmed = raw.trim();

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let parsed = trimmed.parse::<i64>().ok().and_then(|value| {
            if trimmed.len() <= 10 {
                DateTime::from_timestamp(value, 0)
            } else {
                DateTime::from_timestamp_millis(value)
            }
        });
        return match parsed {
            Some(datetime) => datetime
                .with_timezone(offset)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            None => trimmed.to_string(),
        };
    }

    parse_date(trimmed, offset)
        .map(|datetime| datetime.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

fn parse_date(raw: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.with_timezone(offset));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc2822(raw) {
        return Some(datetime.with_timezone(offset));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return offset.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    offset.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}
