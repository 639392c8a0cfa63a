use crate::headlines::{HeaderOptions, HeaderSlot};
use crate::model::{ArticlePayload, BulletList, NewsItem, Paragraph, QuoteParagraph};

const ALTERNATIVES_TITLE: &str = "Alternative headlines:";
const QUOTE_SEPARATOR: &str = "\n\n";

impl ArticlePayload {
    /// Skeleton payload for an item that has never been drafted.
    pub fn fallback(item: &NewsItem) -> Self {
        Self {
            header: item.headline_raw.clone(),
            header_1: item.headline_raw.clone(),
            selected_header_number: Some(HeaderSlot::ORIGINAL.number()),
            anons: Some(String::new()),
            paragraph_1: Some(Paragraph::empty()),
            paragraph_2: Some(QuoteParagraph::empty()),
            paragraph_3: Some(Paragraph::empty()),
            background: Some(BulletList::empty()),
            source: item.source_url.clone(),
            language: "ru".to_string(),
            ..Self::default()
        }
    }

    pub fn header_text(&self, slot: HeaderSlot) -> &str {
        match slot.number() {
            1 => &self.header_1,
            2 => &self.header_2,
            3 => &self.header_3,
            _ => &self.header_4,
        }
    }

    pub fn set_header_text(&mut self, slot: HeaderSlot, text: impl Into<String>) {
        let text = text.into();
        match slot.number() {
            1 => self.header_1 = text,
            2 => self.header_2 = text,
            3 => self.header_3 = text,
            _ => self.header_4 = text,
        }
    }

    /// The payload's header texts as options; slot 1 defaults to the raw headline.
    pub fn header_options(&self, fallback_headline: &str) -> HeaderOptions {
        let original = if self.header_1.trim().is_empty() {
            fallback_headline
        } else {
            &self.header_1
        };
        let mut options = HeaderOptions::with_original(original);
        for slot in HeaderSlot::SELECTABLE {
            options.set(slot, self.header_text(slot));
        }
        options
    }

    /// Writes all four headers and selects `slot`.
    ///
    /// An empty chosen slot falls back to slot 1. Returns the slot actually
    /// selected; afterwards `header` equals that slot's text.
    pub fn apply_header_options(&mut self, options: &HeaderOptions, slot: HeaderSlot) -> HeaderSlot {
        for each in HeaderSlot::ALL {
            self.set_header_text(each, options.get(each));
        }
        let chosen = if options.is_empty_at(slot) {
            HeaderSlot::ORIGINAL
        } else {
            slot
        };
        self.selected_header_number = Some(chosen.number());
        self.header = self.header_text(chosen).to_string();
        chosen
    }

    /// Selected slot when it is in range and points at non-empty text.
    pub fn selected_slot(&self) -> Option<HeaderSlot> {
        let slot = HeaderSlot::new(self.selected_header_number?)?;
        (!self.header_text(slot).trim().is_empty()).then_some(slot)
    }

    /// Copies generated body fields onto this payload, keeping headers.
    pub fn merge_draft_body(&mut self, body: ArticlePayload) {
        if body.anons.is_some() {
            self.anons = body.anons;
        }
        if body.paragraph_1.is_some() {
            self.paragraph_1 = body.paragraph_1;
        }
        if body.paragraph_2.is_some() {
            self.paragraph_2 = body.paragraph_2;
        }
        if body.paragraph_3.is_some() {
            self.paragraph_3 = body.paragraph_3;
        }
        if body.background.is_some() {
            self.background = body.background;
        }
        if !body.source.trim().is_empty() {
            self.source = body.source;
        }
        if !body.language.trim().is_empty() {
            self.language = body.language;
        }
        if body.sport_id.is_some() {
            self.sport_id = body.sport_id;
        }
        if body.category_id.is_some() {
            self.category_id = body.category_id;
        }
        for (key, value) in body.extra {
            self.extra.entry(key).or_insert(value);
        }
    }

    /// Unattended selection: slot 2 is published no matter what it holds.
    ///
    /// Candidate texts come from `options`; slot 2 falls back through the
    /// payload's own header 2, header 1, `header` and finally `headline_raw`.
    pub fn force_published_header(&mut self, options: &HeaderOptions, headline_raw: &str) {
        let header_2 = [
            options.get(HeaderSlot(2)),
            &self.header_2,
            &self.header_1,
            &self.header,
            headline_raw,
        ]
        .into_iter()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string();

        if self.header_1.trim().is_empty() {
            self.header_1 = headline_raw.to_string();
        }
        self.header_2 = header_2;
        self.header_3 = options.get(HeaderSlot(3)).to_string();
        self.header_4 = options.get(HeaderSlot(4)).to_string();
        self.selected_header_number = Some(2);
        self.header = self.header_2.clone();
    }

    /// Puts the slot 3 and slot 4 candidates on top of paragraph 1.
    ///
    /// Paragraph 1 is created when missing; the block is left out when both
    /// candidates are blank.
    pub fn prepend_alternative_headlines(&mut self, header_3: &str, header_4: &str) {
        let lines: Vec<String> = [header_3, header_4]
            .into_iter()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| format!("- {text}"))
            .collect();
        let paragraph = self.paragraph_1.get_or_insert_with(Paragraph::empty);
        if lines.is_empty() {
            return;
        }
        let block = format!("{ALTERNATIVES_TITLE}\n{}", lines.join("\n"));
        paragraph.content = format!("{block}\n\n{}", paragraph.content)
            .trim()
            .to_string();
    }

    pub fn quote_text(&self) -> String {
        self.paragraph_2
            .as_ref()
            .map(|quote| quote.content.join(QUOTE_SEPARATOR))
            .unwrap_or_default()
    }

    pub fn set_quote_text(&mut self, text: &str) {
        let quote = self.paragraph_2.get_or_insert_with(QuoteParagraph::empty);
        quote.content = text.split(QUOTE_SEPARATOR).map(ToOwned::to_owned).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options(texts: [&str; 4]) -> HeaderOptions {
        let mut options = HeaderOptions::with_original(texts[0]);
        for slot in HeaderSlot::SELECTABLE {
            options.set(slot, texts[slot.index()]);
        }
        options
    }

    #[test]
    fn empty_choice_falls_back_to_original() {
        let mut payload = ArticlePayload::default();
        let chosen = payload.apply_header_options(&options(["Raw", "Two", "", "Four"]), HeaderSlot(3));
        assert_eq!(chosen, HeaderSlot::ORIGINAL);
        assert_eq!(payload.header, "Raw");
        assert_eq!(payload.selected_header_number, Some(1));
    }

    #[test]
    fn alternative_block_lists_only_non_empty_candidates() {
        let mut payload = ArticlePayload {
            paragraph_1: Some(Paragraph {
                content: "Lead text.".to_string(),
                ..Paragraph::empty()
            }),
            ..ArticlePayload::default()
        };
        payload.prepend_alternative_headlines("", "Four");
        assert_eq!(
            payload.paragraph_1.unwrap().content,
            "Alternative headlines:\n- Four\n\nLead text."
        );
    }

    #[test]
    fn alternative_block_creates_missing_paragraph() {
        let mut payload = ArticlePayload::default();
        payload.prepend_alternative_headlines("Three", "Four");
        let paragraph = payload.paragraph_1.unwrap();
        assert_eq!(paragraph.content, "Alternative headlines:\n- Three\n- Four");
        assert_eq!(paragraph.opening_html_tag, "<p>");
    }

    #[test]
    fn forced_header_uses_fallback_chain() {
        let mut payload = ArticlePayload {
            header_1: "One".to_string(),
            ..ArticlePayload::default()
        };
        payload.force_published_header(&options(["Raw", "", "Three", ""]), "Raw");
        assert_eq!(payload.header_2, "One");
        assert_eq!(payload.header, "One");
        assert_eq!(payload.selected_header_number, Some(2));
    }

    #[test]
    fn quote_blocks_split_on_blank_lines() {
        let mut payload = ArticlePayload::default();
        payload.set_quote_text("first\n\nsecond");
        assert_eq!(payload.paragraph_2.as_ref().unwrap().content.len(), 2);
        assert_eq!(payload.quote_text(), "first\n\nsecond");
    }

    #[test]
    fn draft_merge_keeps_headers() {
        let mut payload = ArticlePayload {
            header: "Chosen".to_string(),
            header_2: "Chosen".to_string(),
            selected_header_number: Some(2),
            source: "https://a.example".to_string(),
            ..ArticlePayload::default()
        };
        let body = ArticlePayload {
            header: "Generator header".to_string(),
            anons: Some("Teaser".to_string()),
            language: "en".to_string(),
            ..ArticlePayload::default()
        };
        payload.merge_draft_body(body);
        assert_eq!(payload.header, "Chosen");
        assert_eq!(payload.anons.as_deref(), Some("Teaser"));
        assert_eq!(payload.language, "en");
        assert_eq!(payload.source, "https://a.example");
    }
}
