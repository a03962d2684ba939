use scraper::Html;
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::error::{GemxError, Result};
use crate::fingerprint::dedupe;
use crate::loader::{Loader, LoaderConfig};
use crate::model::Export;
use crate::render::render_document;
use crate::title::derive_title;
use crate::view::ChatView;

/// Drives the view through a full traversal and renders the conversation.
///
/// Fails with [`GemxError::NoContentFound`] instead of returning an empty
/// export.
#[instrument(skip_all)]
pub fn extract(
    view: &mut dyn ChatView,
    clock: &mut dyn Clock,
    config: &LoaderConfig,
) -> Result<Export> {
    let traversal = Loader::new(&mut *view, &mut *clock, config.clone()).run()?;
    let messages = dedupe(traversal.messages);
    if messages.is_empty() {
        return Err(GemxError::NoContentFound);
    }

    let html = view
        .current_html()
        .map_err(|source| GemxError::extraction("reading the page title", source))?;
    let title = derive_title(&Html::parse_document(&html));
    let document = render_document(&messages, &title, clock.now());

    info!(
        title = %title,
        messages = messages.len(),
        reason = ?traversal.reason,
        "conversation extracted"
    );

    Ok(Export {
        title,
        message_count: messages.len(),
        messages,
        document,
    })
}

pub fn export_to_raw_json(export: &Export) -> Result<String> {
    serde_json::to_string_pretty(export).map_err(|err| GemxError::Serialization(err.to_string()))
}
