//! Per-link result records and their Slack rendering

use crate::types::{JobOutcome, link_display_name};
use serde::Serialize;

/// Separator between report lines
pub const LINE_SEPARATOR: &str = "\n\n";

/// Result for one extracted link
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// The link as extracted from the message
    pub link: String,
    /// How the job ended
    pub outcome: JobOutcome,
    /// Public share URL, only for complete jobs whose share succeeded
    pub share_url: Option<String>,
}

impl LinkReport {
    /// A failed record for a link that never produced a job
    pub fn failed(link: &str, error: impl Into<String>) -> Self {
        Self {
            link: link.to_string(),
            outcome: JobOutcome::Failed {
                name: link_display_name(link),
                error: error.into(),
            },
            share_url: None,
        }
    }

    /// Display name, falling back to the start of the link
    pub fn name(&self) -> String {
        let name = self.outcome.name().trim();
        if name.is_empty() {
            link_display_name(&self.link)
        } else {
            name.to_string()
        }
    }
}

/// Render one report line
pub fn render_line(report: &LinkReport) -> String {
    let name = report.name();
    match (&report.outcome, &report.share_url) {
        (JobOutcome::Complete { .. }, Some(url)) => {
            format!(":white_check_mark: *{name}*\n{url}")
        }
        (JobOutcome::Complete { .. }, None) => format!(
            ":hourglass_flowing_sand: *{name}* — download finished on PikPak (share link unavailable)."
        ),
        (JobOutcome::TimedOut { .. }, _) => format!(
            ":hourglass: *{name}* — download started but still processing on PikPak. Check your account in a few minutes."
        ),
        (JobOutcome::Failed { error, .. }, _) => format!(":x: *{name}* — error: {error}"),
    }
}

/// Render the consolidated reply, one line per report in order
pub fn render_report(reports: &[LinkReport]) -> String {
    reports
        .iter()
        .map(render_line)
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

/// Immediate reply sent before any link is processed
pub fn acknowledgment(link_count: usize) -> String {
    format!(
        ":arrows_counterclockwise: Received {link_count} link(s). Sending to PikPak and waiting for the download..."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileId;

    fn complete(name: &str, share_url: Option<&str>) -> LinkReport {
        LinkReport {
            link: "https://example.com/a.iso".to_string(),
            outcome: JobOutcome::Complete {
                file_id: FileId("F1".to_string()),
                name: name.to_string(),
            },
            share_url: share_url.map(str::to_string),
        }
    }

    #[test]
    fn complete_with_share_shows_url() {
        assert_eq!(
            render_line(&complete("a.iso", Some("https://mypikpak.com/s/X"))),
            ":white_check_mark: *a.iso*\nhttps://mypikpak.com/s/X"
        );
    }

    #[test]
    fn complete_without_share_is_degraded_success() {
        assert_eq!(
            render_line(&complete("a.iso", None)),
            ":hourglass_flowing_sand: *a.iso* — download finished on PikPak (share link unavailable)."
        );
    }

    #[test]
    fn timed_out_line() {
        let report = LinkReport {
            link: "magnet:?xt=urn:btih:x".to_string(),
            outcome: JobOutcome::TimedOut {
                name: "big.mkv".to_string(),
            },
            share_url: None,
        };
        assert_eq!(
            render_line(&report),
            ":hourglass: *big.mkv* — download started but still processing on PikPak. Check your account in a few minutes."
        );
    }

    #[test]
    fn failed_line_falls_back_to_link_prefix() {
        let link = format!("https://example.com/{}", "x".repeat(200));
        let report = LinkReport::failed(&link, "boom");
        let expected = format!(":x: *{}* — error: boom", &link[..80]);
        assert_eq!(render_line(&report), expected);
    }

    #[test]
    fn blank_name_uses_link() {
        assert_eq!(
            complete("  ", None).name(),
            "https://example.com/a.iso"
        );
    }

    #[test]
    fn report_lines_are_blank_line_separated() {
        let reports = [
            LinkReport::failed("ed2k://a", "nope"),
            complete("b", Some("https://s/b")),
        ];
        assert_eq!(
            render_report(&reports),
            ":x: *ed2k://a* — error: nope\n\n:white_check_mark: *b*\nhttps://s/b"
        );
    }

    #[test]
    fn acknowledgment_counts_links() {
        assert_eq!(
            acknowledgment(2),
            ":arrows_counterclockwise: Received 2 link(s). Sending to PikPak and waiting for the download..."
        );
    }
}
