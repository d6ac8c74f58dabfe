//! Page signal scanner - single-shot descriptive scan of one landing page
//!
//! Fetches the page once with a bounded timeout, derives a performance
//! score from the elapsed time and classifies niche and tech platform via
//! fixed keyword lexicons. Every failure (network, parse) is returned as a
//! structured `success=false` result; a scan never propagates an error.

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::domain::ad::AdPatch;
use crate::domain::constants::{
    SCAN_NICHE_FALLBACK, SCAN_NICHE_LEXICON, TECH_FALLBACK, TECH_MARKERS,
};
use crate::infrastructure::http_client::HttpClient;

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());

const TITLE_MAX_CHARS: usize = 50;
const COPY_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub success: bool,
    pub data: Option<ScanData>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanData {
    pub title: String,
    pub copy: String,
    pub niche: String,
    pub rating: f64,
    pub tech_stack: TechStack,
    pub site_traffic: SiteTraffic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteTraffic {
    /// Needs an external traffic API; not measured here.
    pub visitors: Option<u64>,
    pub bounce_rate: Option<f64>,
    pub load_time_sec: f64,
}

impl ScanData {
    /// Enrich a canonical patch with the scanned page attributes.
    pub fn apply_to(&self, patch: &mut AdPatch) {
        patch.tech_stack = Some(json!({ "platform": self.tech_stack.platform }));
        patch.site_traffic = Some(json!({
            "visitors": self.site_traffic.visitors,
            "bounceRate": self.site_traffic.bounce_rate,
            "loadTimeSec": self.site_traffic.load_time_sec,
        }));
    }
}

pub struct PageScanner {
    client: Arc<HttpClient>,
}

impl PageScanner {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Scan one URL. Single attempt, no retry.
    pub async fn scan(&self, url: &str) -> ScanResult {
        match self.scan_inner(url).await {
            Ok(data) => ScanResult {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => ScanResult {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn scan_inner(&self, url: &str) -> anyhow::Result<ScanData> {
        let url = if url.starts_with("http") {
            url.to_string()
        } else {
            format!("https://{url}")
        };

        let started = Instant::now();
        let response = self.client.get(&url).await?;
        // Time to headers; the body transfer must not skew the score.
        let load_time = started.elapsed().as_secs_f64();
        let body = response.text().await?;
        let performance_score = ((1.0 - load_time / 3.0) * 100.0).clamp(0.0, 100.0);
        debug!("Scanned {} in {:.2}s (score {})", url, load_time, performance_score);

        let document = Html::parse_document(&body);
        let title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let description = document
            .select(&META_DESCRIPTION_SELECTOR)
            .next()
            .and_then(|m| m.value().attr("content"))
            .unwrap_or_default()
            .to_string();

        let page_text = document
            .root_element()
            .text()
            .collect::<String>()
            .to_lowercase();
        let markup = body.to_lowercase();

        let niche = SCAN_NICHE_LEXICON
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| page_text.contains(k)))
            .map_or(SCAN_NICHE_FALLBACK, |(category, _)| *category);
        let platform = TECH_MARKERS
            .iter()
            .find(|(marker, _)| markup.contains(marker))
            .map_or(TECH_FALLBACK, |(_, label)| *label);

        Ok(ScanData {
            title: truncate(&title, TITLE_MAX_CHARS),
            copy: truncate(&description, COPY_MAX_CHARS),
            niche: niche.to_string(),
            rating: performance_score / 10.0,
            tech_stack: TechStack {
                platform: platform.to_string(),
            },
            site_traffic: SiteTraffic {
                visitors: None,
                bounce_rate: None,
                load_time_sec: (load_time * 100.0).round() / 100.0,
            },
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;

    fn scanner() -> PageScanner {
        PageScanner::new(Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap()))
    }

    #[tokio::test]
    async fn scan_extracts_metadata_and_classifies() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/lp")
            .with_header("content-type", "text/html")
            .with_body(
                r#"<html><head><title>Oferta imperdível</title>
                <meta name="description" content="Emagrecer com dieta natural">
                </head><body>
                <p>Emagrecer rápido, dieta sem dor.</p>
                <script src="https://cdn.shopify.com/app.js"></script>
                </body></html>"#,
            )
            .create_async()
            .await;

        let result = scanner().scan(&format!("{}/lp", server.url())).await;

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data.title, "Oferta imperdível");
        assert_eq!(data.niche, "SAÚDE");
        assert_eq!(data.tech_stack.platform, "Shopify");
        assert!(data.rating >= 0.0 && data.rating <= 10.0);
        assert!(data.site_traffic.load_time_sec >= 0.0);
    }

    #[tokio::test]
    async fn unreachable_page_returns_structured_failure() {
        // Nothing listens on this port.
        let result = scanner().scan("http://127.0.0.1:1/lp").await;
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn load_time_excludes_body_download() {
        use std::io::Write;

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/slow")
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_millis(500));
                w.write_all(b"<html><head><title>t</title></head></html>")
            })
            .create_async()
            .await;

        let result = scanner().scan(&format!("{}/slow", server.url())).await;
        let data = result.data.unwrap();
        assert!(
            data.site_traffic.load_time_sec < 0.4,
            "got {}",
            data.site_traffic.load_time_sec
        );
    }

    #[tokio::test]
    async fn long_titles_are_truncated() {
        let mut server = mockito::Server::new_async().await;
        let long_title = "x".repeat(80);
        let _m = server
            .mock("GET", "/t")
            .with_body(format!("<html><head><title>{long_title}</title></head></html>"))
            .create_async()
            .await;

        let result = scanner().scan(&format!("{}/t", server.url())).await;
        let data = result.data.unwrap();
        assert_eq!(data.title.chars().count(), 53);
        assert!(data.title.ends_with("..."));
    }

    #[test]
    fn scan_data_enriches_a_patch() {
        let data = ScanData {
            title: "t".into(),
            copy: "c".into(),
            niche: "TECH".into(),
            rating: 8.0,
            tech_stack: TechStack {
                platform: "WordPress".into(),
            },
            site_traffic: SiteTraffic {
                visitors: None,
                bounce_rate: None,
                load_time_sec: 0.42,
            },
        };

        let mut row = crate::domain::normalizer::RawAdRow::default();
        row.insert("ID", serde_json::Value::String("a1".into()));
        let mut patch = crate::domain::normalizer::normalize(&row).unwrap();
        data.apply_to(&mut patch);

        assert_eq!(patch.tech_stack.unwrap()["platform"], "WordPress");
        assert_eq!(patch.site_traffic.unwrap()["loadTimeSec"], 0.42);
    }
}
