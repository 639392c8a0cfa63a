use serde::{Deserialize, Serialize};

/// Publication environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishTarget {
    Staging,
    Production,
}

impl PublishTarget {
    pub fn is_production(self) -> bool {
        matches!(self, PublishTarget::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLinks {
    pub staging_base: String,
    pub production_base: String,
}

impl Default for AdminLinks {
    fn default() -> Self {
        Self {
            staging_base: "https://ru-hd-13215.test.b33.io/admin/post/".to_string(),
            production_base: "https://legalbet.ru/admin/post/".to_string(),
        }
    }
}

impl AdminLinks {
    pub fn edit_link(&self, target: PublishTarget, external_id: &str) -> String {
        let base = match target {
            PublishTarget::Staging => &self.staging_base,
            PublishTarget::Production => &self.production_base,
        };
        format!("{base}{external_id}/edit")
    }
}

/// Timing and behaviour knobs of the manual writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterSettings {
    /// Review countdown before auto-advancing, in seconds.
    pub review_delay_secs: u32,
    /// Minimum time the publish result stays on screen.
    pub publish_display_ms: u64,
    pub publish_tick_ms: u64,
    /// Client-side limit for headline generation.
    pub headlines_timeout_ms: u64,
    /// Start a staging-publish countdown once the draft is ready.
    pub auto_publish_draft: bool,
    pub admin_links: AdminLinks,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            review_delay_secs: 7,
            publish_display_ms: 4_000,
            publish_tick_ms: 250,
            headlines_timeout_ms: 25_000,
            auto_publish_draft: false,
            admin_links: AdminLinks::default(),
        }
    }
}
