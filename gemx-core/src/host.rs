use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use dirs::{download_dir, home_dir};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GemxError, Result};
use crate::model::Export;

pub const GEMINI_HOST: &str = "gemini.google.com";
const MAX_SLUG_CHARS: usize = 100;
const FALLBACK_SLUG: &str = "gemini-chat";
const EXPORT_EXTENSION: &str = "md";

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://([^/:?#]+)(?::\d+)?(/[^?#]*)?(?:[?#].*)?$").expect("valid regex")
});
static CONVERSATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:/u/\d+)?/app/([0-9A-Za-z_-]+)/?$").expect("valid regex")
});
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Page address the conversation was captured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUrl {
    pub host: String,
    pub conversation_id: Option<String>,
}

impl ChatUrl {
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }
}

impl FromStr for ChatUrl {
    type Err = GemxError;

    /// Rejects anything that is not served from the Gemini web app.
    fn from_str(input: &str) -> Result<Self> {
        let caps = URL_RE
            .captures(input.trim())
            .ok_or_else(|| GemxError::InvalidUrl(input.to_string()))?;
        let host = caps[1].to_ascii_lowercase();
        if host != GEMINI_HOST {
            return Err(GemxError::HostMismatch(host));
        }

        let path = caps.get(2).map_or("/", |path| path.as_str());
        let conversation_id = CONVERSATION_RE
            .captures(path)
            .map(|caps| caps[1].to_string());

        Ok(Self {
            host,
            conversation_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
}

impl ExportSettings {
    pub fn from_env_or_home() -> Result<Self> {
        // Precedence:
        // 1) GEMX_OUTPUT_DIR
        // 2) platform download directory
        // 3) ~/Downloads
        if let Some(dir) = env::var_os("GEMX_OUTPUT_DIR").filter(|dir| !dir.is_empty()) {
            return Ok(Self {
                output_dir: PathBuf::from(dir),
            });
        }
        if let Some(dir) = download_dir() {
            return Ok(Self { output_dir: dir });
        }

        let home = home_dir().ok_or(GemxError::HomeDirectoryNotFound)?;
        Ok(Self {
            output_dir: home.join("Downloads"),
        })
    }
}

/// `<slug>-<YYYY-MM-DD>.md`, where the slug is the lowercased title with
/// non-alphanumeric runs collapsed to `-`.
pub fn export_filename(title: &str, date: NaiveDate) -> String {
    let lowered = title.to_lowercase();
    let collapsed = NON_ALNUM_RE.replace_all(&lowered, "-");
    let capped = collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect::<String>();
    let slug = capped.trim_end_matches('-');
    let slug = if slug.is_empty() { FALLBACK_SLUG } else { slug };

    format!("{slug}-{}.{EXPORT_EXTENSION}", date.format("%Y-%m-%d"))
}

/// Writes the rendered document into `dir` and returns the file path.
pub fn write_export(dir: &Path, export: &Export, date: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| GemxError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(export_filename(&export.title, date));
    fs::write(&path, &export.document).map_err(|source| GemxError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
