use std::collections::HashSet;

use crate::model::{Direction, Message};

const PREFIX_CHARS: usize = 100;

/// Cheap identity key: the first 100 characters of the trimmed content plus
/// the content length in characters.
///
/// Two different messages that share a 100 character prefix and have the
/// same length collide and are treated as one message.
pub fn fingerprint(content: &str) -> String {
    let trimmed = content.trim();
    let prefix = trimmed.chars().take(PREFIX_CHARS).collect::<String>();
    format!("{}::{}", prefix.trim(), content.chars().count())
}

/// Stable dedupe: the first occurrence of each fingerprint wins.
pub fn dedupe(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|message| seen.insert(fingerprint(&message.content)))
        .collect()
}

/// Messages collected across incremental loads, in oldest-first order.
#[derive(Debug, Clone)]
pub struct Accumulator {
    entries: Vec<(String, Message)>,
    seen: HashSet<String>,
    track_seen: bool,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            seen: HashSet::new(),
            track_seen: true,
        }
    }

    /// Accumulator that keeps every observation; only the final [`dedupe`]
    /// removes repeats.
    pub fn without_seen_set() -> Self {
        Self {
            track_seen: false,
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|(_, message)| message)
    }

    /// Inserts the unseen messages of one locator batch and returns how many
    /// were added.
    ///
    /// `batch` is in document order. New messages are placed next to the
    /// nearest already-known message of the same batch. A batch without any
    /// known message goes before everything when walking toward the origin
    /// and after everything when walking toward the end.
    pub fn merge(&mut self, batch: Vec<Message>, direction: Direction) -> usize {
        let mut inserted = 0;
        let mut pending = Vec::new();
        let mut cursor: Option<usize> = None;

        for message in batch {
            let key = fingerprint(&message.content);

            if self.track_seen && self.seen.contains(&key) {
                let Some(position) = self.position_of(&key) else {
                    // repeated inside this batch and still pending
                    continue;
                };
                if cursor.is_none() && !pending.is_empty() {
                    let count = pending.len();
                    self.entries.splice(position..position, pending.drain(..));
                    inserted += count;
                    cursor = Some(position + count);
                } else {
                    cursor = Some(position);
                }
                continue;
            }

            if self.track_seen {
                self.seen.insert(key.clone());
            }
            match cursor {
                Some(index) => {
                    self.entries.insert(index + 1, (key, message));
                    cursor = Some(index + 1);
                    inserted += 1;
                }
                None => pending.push((key, message)),
            }
        }

        if !pending.is_empty() {
            inserted += pending.len();
            match direction {
                Direction::TowardOrigin => {
                    self.entries.splice(0..0, pending);
                }
                Direction::TowardEnd => self.entries.extend(pending),
            }
        }

        inserted
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(entry_key, _)| entry_key == key)
    }

    /// Final ordered sequence with the authoritative dedupe pass applied.
    pub fn into_messages(self) -> Vec<Message> {
        dedupe(
            self.entries
                .into_iter()
                .map(|(_, message)| message)
                .collect(),
        )
    }
}
