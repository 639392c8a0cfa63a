use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::value_to_text;

/// Deepest nesting level searched for headline candidates in a response.
pub const CANDIDATE_SEARCH_MAX_DEPTH: usize = 4;

/// One of the four headline slots. Slot 1 is the original scraped headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HeaderSlot(pub(crate) u8);

impl HeaderSlot {
    pub const ORIGINAL: HeaderSlot = HeaderSlot(1);
    pub const ALL: [HeaderSlot; 4] = [HeaderSlot(1), HeaderSlot(2), HeaderSlot(3), HeaderSlot(4)];
    /// Slots holding generated candidates.
    pub const SELECTABLE: [HeaderSlot; 3] = [HeaderSlot(2), HeaderSlot(3), HeaderSlot(4)];

    pub fn new(number: u8) -> Option<Self> {
        (1..=4).contains(&number).then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn is_selectable(self) -> bool {
        self.0 >= 2
    }

    /// Wire field name, e.g. `header_3`.
    pub fn key(self) -> String {
        format!("header_{}", self.0)
    }
}

/// Generated candidates for slots 2 to 4. `None` means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlineCandidates {
    slots: [Option<String>; 3],
}

impl HeadlineCandidates {
    pub fn get(&self, slot: HeaderSlot) -> Option<&str> {
        if !slot.is_selectable() {
            return None;
        }
        self.slots[slot.index() - 1].as_deref()
    }

    pub fn set(&mut self, slot: HeaderSlot, text: impl Into<String>) {
        if slot.is_selectable() {
            self.slots[slot.index() - 1] = Some(text.into());
        }
    }

    /// True when at least one candidate holds non-blank text.
    pub fn has_any_text(&self) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|text| !text.trim().is_empty())
    }

    fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

/// Recursively searches a generation response for `header_2`..`header_4`.
///
/// Objects and arrays are walked depth-first; the first value found for a
/// slot wins. Nesting deeper than [`CANDIDATE_SEARCH_MAX_DEPTH`] is ignored.
/// JSON text found along the way is parsed and searched too.
pub fn extract_candidates(response: &Value) -> HeadlineCandidates {
    let mut found = HeadlineCandidates::default();
    search(response, 0, &mut found);
    found
}

fn search(value: &Value, depth: usize, found: &mut HeadlineCandidates) {
    if depth > CANDIDATE_SEARCH_MAX_DEPTH || found.is_complete() {
        return;
    }
    match value {
        Value::Object(map) => {
            for slot in HeaderSlot::SELECTABLE {
                if found.get(slot).is_some() {
                    continue;
                }
                if let Some(text) = map.get(&slot.key()).filter(|v| !v.is_object() && !v.is_array())
                {
                    if !text.is_null() {
                        found.set(slot, value_to_text(text));
                    }
                }
            }
            for child in map.values() {
                search(child, depth + 1, found);
            }
        }
        Value::Array(items) => {
            for child in items {
                search(child, depth + 1, found);
            }
        }
        Value::String(text) => {
            let trimmed = text.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                    search(&parsed, depth + 1, found);
                }
            }
        }
        _ => {}
    }
}

/// Reads candidates stored on the inbox record.
///
/// Accepts an object or its JSON text. Returns `None` when nothing usable is
/// stored, so callers can fall through to the generation response.
pub fn parse_inbox_headlines(stored: Option<&Value>) -> Option<HeadlineCandidates> {
    let value = match stored? {
        Value::String(text) => serde_json::from_str::<Value>(text.trim()).ok()?,
        other => other.clone(),
    };
    let map = value.as_object()?;
    let mut candidates = HeadlineCandidates::default();
    for slot in HeaderSlot::SELECTABLE {
        if let Some(text) = map.get(&slot.key()).map(value_to_text) {
            if !text.trim().is_empty() {
                candidates.set(slot, text);
            }
        }
    }
    candidates.has_any_text().then_some(candidates)
}

/// Final texts for all four slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOptions {
    slots: [String; 4],
}

impl HeaderOptions {
    /// Options with only the original headline filled in.
    pub fn with_original(headline_raw: &str) -> Self {
        let mut options = Self::default();
        options.slots[0] = headline_raw.to_string();
        options
    }

    /// Merges the candidate sources in priority order: inbox snapshot, then
    /// the generation response, then empty. Texts are trimmed.
    pub fn resolve(
        headline_raw: &str,
        inbox: Option<&HeadlineCandidates>,
        response: Option<&HeadlineCandidates>,
    ) -> Self {
        let mut options = Self::with_original(headline_raw);
        for slot in HeaderSlot::SELECTABLE {
            let text = inbox
                .and_then(|c| c.get(slot))
                .filter(|t| !t.trim().is_empty())
                .or_else(|| response.and_then(|c| c.get(slot)))
                .unwrap_or_default();
            options.slots[slot.index()] = text.trim().to_string();
        }
        options
    }

    pub fn get(&self, slot: HeaderSlot) -> &str {
        &self.slots[slot.index()]
    }

    /// Replaces a candidate's text. Slot 1 is immutable; returns false for it.
    pub fn set(&mut self, slot: HeaderSlot, text: impl Into<String>) -> bool {
        if !slot.is_selectable() {
            return false;
        }
        self.slots[slot.index()] = text.into();
        true
    }

    pub fn is_empty_at(&self, slot: HeaderSlot) -> bool {
        self.get(slot).trim().is_empty()
    }

    /// First selectable, non-empty slot whose text equals `text`.
    pub fn find_slot_matching(&self, text: &str) -> Option<HeaderSlot> {
        let wanted = text.trim();
        if wanted.is_empty() {
            return None;
        }
        HeaderSlot::SELECTABLE
            .into_iter()
            .find(|slot| self.get(*slot).trim() == wanted)
    }
}
