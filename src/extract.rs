//! Link extraction from chat text

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Magnet (`magnet:?xt=urn:<ns>:<hash>`), ed2k and http(s) links.
///
/// Slack renders links as `<url|label>`, so `|` and `>` end an http(s) link as
/// well as whitespace. ed2k links use `|` as their own field separator.
#[allow(clippy::expect_used)]
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)magnet:\?xt=urn:[a-z0-9]+:[a-z0-9]{32,}|ed2k://[^\s>]+|https?://[^\s>|]+")
        .expect("link pattern is valid")
});

/// Finds downloadable links in message text
#[derive(Clone, Debug)]
pub struct LinkExtractor {
    ignored_hosts: Vec<String>,
}

impl LinkExtractor {
    /// Create an extractor that skips http(s) links to `ignored_hosts` and their subdomains
    pub fn new<I, S>(ignored_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ignored_hosts: ignored_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Links in `text`, in order of appearance
    ///
    /// Duplicates are kept; every occurrence gets its own report line. Tracker
    /// URLs inside a magnet's parameters (`&tr=http://...`) are not links of
    /// their own.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut magnet_end = 0;
        let mut links = Vec::new();

        for m in LINK_RE.find_iter(text) {
            if m.start() < magnet_end {
                continue;
            }
            if m.as_str()
                .get(..7)
                .is_some_and(|scheme| scheme.eq_ignore_ascii_case("magnet:"))
            {
                magnet_end = text[m.end()..]
                    .find(|c: char| c.is_whitespace() || c == '>' || c == '|')
                    .map_or(text.len(), |offset| m.end() + offset);
            }

            let link = m.as_str().replace("&amp;", "&");
            if !self.is_ignored(&link) {
                links.push(link);
            }
        }
        links
    }

    fn is_ignored(&self, link: &str) -> bool {
        let lower = link.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return false;
        }

        let Some(host) = Url::parse(link)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        else {
            return false;
        };

        self.ignored_hosts
            .iter()
            .any(|ignored| host == *ignored || host.ends_with(&format!(".{ignored}")))
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(["slack.com"])
    }
}
