use chrono::{DateTime, FixedOffset};

use crate::model::{Message, RoleCounts};

const RULE: &str = "---";

/// Renders the final conversation as a Markdown document.
///
/// Output depends only on the arguments; `now` feeds the provenance line.
pub fn render_document(messages: &[Message], title: &str, now: DateTime<FixedOffset>) -> String {
    let counts = RoleCounts::tally(messages);

    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", title.trim()));
    output.push_str(&format!(
        "- Exported: {} ({})\n",
        now.format("%Y-%m-%d %H:%M:%S"),
        timezone_label(now)
    ));
    output.push_str(&format!(
        "- Messages: {} ({} from you, {} from Gemini)\n\n",
        counts.total, counts.human, counts.assistant
    ));

    for (idx, message) in messages.iter().enumerate() {
        if idx > 0 {
            output.push_str(RULE);
            output.push_str("\n\n");
        }

        match message.timestamp.as_deref() {
            Some(timestamp) => output.push_str(&format!(
                "## {} ({})\n\n",
                message.role.heading(),
                timestamp
            )),
            None => output.push_str(&format!("## {}\n\n", message.role.heading())),
        }
        output.push_str(message.content.trim());
        output.push_str("\n\n");
    }

    let trimmed = output.trim_end().len();
    output.truncate(trimmed);
    output.push('\n');
    output
}

fn timezone_label(now: DateTime<FixedOffset>) -> String {
    format!("UTC{}", now.format("%:z"))
}
