//! SEARCH: real-time web lookups
//!
//! Two sources, merged: a Wikipedia REST summary for the slugged query,
//! and the first readable paragraph scraped from the top web results
//! (DuckDuckGo HTML endpoint). Either source may fail independently; the
//! handler only errors when both come back empty.

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::dispatch::Handler;
use crate::{Error, Result};

/// How many result pages to fetch summaries from
const MAX_RESULTS: usize = 3;

/// Minimum paragraph length considered a real summary
const MIN_SUMMARY_LEN: usize = 80;

/// Hosts and file types that never contain a readable summary
const SKIP_PATTERNS: [&str; 6] = [
    "gstatic",
    "google.com/search",
    "accounts.google.com",
    ".jpg",
    ".png",
    ".webp",
];

#[derive(serde::Deserialize)]
struct WikiSummary {
    #[serde(default)]
    extract: Option<String>,
}

/// Web search handler
pub struct SearchHandler {
    http: reqwest::Client,
    slug_filter: Regex,
}

impl SearchHandler {
    /// Create the search handler
    ///
    /// # Errors
    ///
    /// Returns error if the internal patterns fail to compile
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; orion-assistant)")
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        let slug_filter =
            Regex::new(r"[^\w\s]").map_err(|e| Error::Handler(format!("slug pattern: {e}")))?;

        Ok(Self { http, slug_filter })
    }

    /// Fetch the Wikipedia summary for a slugged query, if any
    async fn wikipedia_summary(&self, query: &str) -> Option<String> {
        let title = self
            .slug_filter
            .replace_all(query, "")
            .trim()
            .replace(' ', "_");
        if title.is_empty() {
            return None;
        }

        let url = format!("https://en.wikipedia.org/api/rest_v1/page/summary/{title}");
        let summary: WikiSummary = self
            .http
            .get(&url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .json()
            .await
            .ok()?;

        summary.extract.filter(|s| !s.trim().is_empty())
    }

    /// Collect result links from the DuckDuckGo HTML endpoint
    async fn result_links(&self, query: &str) -> Result<Vec<Url>> {
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );
        let html = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let selector = Selector::parse("a.result__a")
            .map_err(|e| Error::Handler(format!("result selector: {e}")))?;

        let document = Html::parse_document(&html);
        let mut links = Vec::new();
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(target) = resolve_result_href(href) {
                if is_useful_link(&target) {
                    links.push(target);
                    if links.len() == MAX_RESULTS {
                        break;
                    }
                }
            }
        }

        Ok(links)
    }

    /// Scrape the first substantial paragraph from a result page
    async fn scrape_summary(&self, link: &Url) -> Option<String> {
        let html = self
            .http
            .get(link.clone())
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .text()
            .await
            .ok()?;

        let selector = Selector::parse("p").ok()?;
        let document = Html::parse_document(&html);
        document
            .select(&selector)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .find(|text| text.len() > MIN_SUMMARY_LEN)
    }
}

#[async_trait]
impl Handler for SearchHandler {
    async fn handle(&self, query: &str) -> Result<String> {
        let mut sections = Vec::new();

        match self.result_links(query).await {
            Ok(links) => {
                for link in links {
                    if let Some(summary) = self.scrape_summary(&link).await {
                        sections.push(format!("{}: {summary}", host_of(&link)));
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "web result lookup failed"),
        }

        if let Some(extract) = self.wikipedia_summary(query).await {
            sections.push(format!("Wikipedia: {extract}"));
        }

        if sections.is_empty() {
            return Err(Error::Handler(format!("no useful results for: {query}")));
        }
        Ok(sections.join("\n"))
    }
}

/// Resolve a DuckDuckGo result href, unwrapping its redirect if present
fn resolve_result_href(href: &str) -> Option<Url> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    // Redirect links carry the real target in the `uddg` query parameter.
    if parsed.path().starts_with("/l/") {
        let target = parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())?;
        return Url::parse(&target).ok();
    }

    Some(parsed)
}

/// Filter out image links and search-engine chrome
fn is_useful_link(url: &Url) -> bool {
    let text = url.as_str();
    url.scheme().starts_with("http") && !SKIP_PATTERNS.iter().any(|bad| text.contains(bad))
}

/// Short host label for the aggregated reply
fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or("web").to_string()
}
