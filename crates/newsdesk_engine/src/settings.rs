use std::time::Duration;

use newsdesk_core::AdminLinks;

/// Prompt variants sent with each generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSettings {
    pub background: u32,
    pub article_payload: u32,
    pub headlines: u32,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            background: 1,
            article_payload: 3,
            headlines: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Backend origin, e.g. `https://news.example.com`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Upper bound for a single call. Generation endpoints are slow.
    pub request_timeout: Duration,
    pub prompts: PromptSettings,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            prompts: PromptSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    /// Server-side publish timeout in seconds, passed through to the backend.
    pub backend_timeout_secs: u32,
    pub limit: u32,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_500),
            poll_timeout: Duration::from_secs(120),
            backend_timeout_secs: 300,
            limit: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoSettings {
    /// Channel that receives completion notifications.
    pub report_channel: String,
    /// Login email of whoever asked for the run.
    pub requester: Option<String>,
    pub admin_links: AdminLinks,
    pub publish: PublishSettings,
}

impl Default for AutoSettings {
    fn default() -> Self {
        Self {
            report_channel: "C09UTNAMNFQ".to_string(),
            requester: None,
            admin_links: AdminLinks::default(),
            publish: PublishSettings::default(),
        }
    }
}
