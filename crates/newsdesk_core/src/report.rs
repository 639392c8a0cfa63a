use crate::model::NewsId;

pub const UNKNOWN_REQUESTER: &str = "unknown";
pub const LINK_NOT_OBTAINED: &str = "not obtained";

/// Facts summarized in the completion notification of an unattended run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub news_id: NewsId,
    pub requester: Option<String>,
    pub elapsed_ms: u64,
    pub admin_link: Option<String>,
}

/// Notification text: id, requester, `M min S s.` duration and admin link.
pub fn completion_report(report: &CompletionReport) -> String {
    let requester = report
        .requester
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .unwrap_or(UNKNOWN_REQUESTER);
    let total_secs = (report.elapsed_ms + 500) / 1000;
    let link = report.admin_link.as_deref().unwrap_or(LINK_NOT_OBTAINED);
    format!(
        "News #{} generated.\nRequested by: {}\nDuration: {} min {} s.\nAdmin link: {}",
        report.news_id,
        requester,
        total_secs / 60,
        total_secs % 60,
        link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_rounds_duration_and_fills_defaults() {
        let text = completion_report(&CompletionReport {
            news_id: 42,
            requester: None,
            elapsed_ms: 125_600,
            admin_link: None,
        });
        assert_eq!(
            text,
            "News #42 generated.\nRequested by: unknown\nDuration: 2 min 6 s.\nAdmin link: not obtained"
        );
    }
}
