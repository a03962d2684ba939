use once_cell::sync::Lazy;
use scraper::{Html, Selector};

pub const DEFAULT_TITLE: &str = "Gemini Chat Export";
const MAX_TITLE_CHARS: usize = 200;
const GENERIC_TITLES: &[&str] = &["gemini", "google gemini"];
const TITLE_SUFFIXES: &[&str] = &[" - Gemini", " | Gemini", " - Google Gemini"];

static CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"[data-test-id="conversation-title"]"#,
        ".conversation-title",
        r#".selected [class*="conversation-title"], [aria-current="page"] [class*="conversation-title"], .conversation.selected"#,
        "h1",
        "title",
    ]
    .iter()
    .map(|selector| Selector::parse(selector).expect("valid selector"))
    .collect()
});

/// Picks the first usable title candidate from the page, falling back to
/// [`DEFAULT_TITLE`].
pub fn derive_title(document: &Html) -> String {
    CANDIDATES
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|element| {
            let text = element.text().collect::<Vec<_>>().join(" ");
            clean_candidate(&text)
        })
        .find(|candidate| is_acceptable(candidate))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

fn clean_candidate(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(stripped) = TITLE_SUFFIXES
        .iter()
        .find_map(|suffix| collapsed.strip_suffix(suffix))
    {
        return stripped.trim().to_string();
    }
    collapsed
}

fn is_acceptable(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.chars().count() <= MAX_TITLE_CHARS
        && !GENERIC_TITLES
            .iter()
            .any(|generic| candidate.eq_ignore_ascii_case(generic))
}
