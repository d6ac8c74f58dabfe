//! Record normalizer - maps loose source rows into canonical patches
//!
//! Source rows come from CSV exports or API payloads whose column names
//! vary; lookups accept the common aliases case-insensitively and
//! non-string cells are stringified before matching. Everything here is
//! pure and deterministic.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use crate::domain::ad::{AdPatch, AdStatus, CreativeType};
use crate::domain::constants::{
    DEFAULT_AD_COUNT, NICHE_FALLBACK, NICHE_LEXICON, REGION_FALLBACK, REGION_LEXICON,
    VIDEO_EXTENSIONS,
};
use crate::domain::error::{IngestError, IngestResult};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Column aliases accepted for the external id.
pub const EXTERNAL_ID_ALIASES: [&str; 3] = ["ID", "id", "external_id"];

/// One loosely-typed source row. Keys are the source's own column names.
#[derive(Debug, Clone, Default)]
pub struct RawAdRow(HashMap<String, Value>);

impl RawAdRow {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self(fields)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Case-insensitive lookup over a list of column aliases. Non-string
    /// values are stringified; empty strings count as absent.
    pub fn get_str(&self, aliases: &[&str]) -> Option<String> {
        for alias in aliases {
            let wanted = alias.to_lowercase();
            for (key, value) in &self.0 {
                if key.to_lowercase() == wanted {
                    let text = stringify(value);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
        }
        None
    }
}

impl FromIterator<(String, Value)> for RawAdRow {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Extract the first run of ASCII digits from a free-text count hint.
pub fn extract_count(text: &str) -> i64 {
    DIGIT_RUN
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(DEFAULT_AD_COUNT)
}

/// Classify a niche from descriptive copy; first lexicon category wins.
pub fn classify_niche(description: &str) -> &'static str {
    let text = description.to_lowercase();
    for (category, keywords) in NICHE_LEXICON {
        if keywords.iter().any(|k| text.contains(k)) {
            return category;
        }
    }
    NICHE_FALLBACK
}

/// Classify a region from the count-hint text; returns (name, code).
pub fn classify_region(info: &str) -> (&'static str, &'static str) {
    let text = info.to_lowercase();
    for (name, code, keywords) in REGION_LEXICON {
        if keywords.iter().any(|k| text.contains(k)) {
            return (name, code);
        }
    }
    REGION_FALLBACK
}

/// Classify the creative type from a media URL.
pub fn classify_creative(media_url: &str) -> CreativeType {
    let url = media_url.to_lowercase();
    if VIDEO_EXTENSIONS.iter().any(|ext| url.contains(ext)) || url.contains("video") {
        CreativeType::Video
    } else {
        CreativeType::Direct
    }
}

/// Rating heuristic derived from the ad count, capped at 5.0.
pub fn rating_for(count: i64) -> f64 {
    (3.0 + count as f64 / 50.0).min(5.0)
}

/// Normalize one raw row into a canonical patch.
///
/// The only failure mode is a row without a usable external id; every
/// other field falls back to a deterministic default.
pub fn normalize(row: &RawAdRow) -> IngestResult<AdPatch> {
    let external_id = row
        .get_str(&EXTERNAL_ID_ALIASES)
        .ok_or_else(|| IngestError::Row("row has no external id".into()))?;

    let title = row
        .get_str(&["Página", "page", "title", "brand"])
        .unwrap_or_else(|| "Sinal Desconhecido".to_string());
    let info_ads = row
        .get_str(&["Info Ads", "info_ads", "adCount"])
        .unwrap_or_else(|| "1".to_string());
    let media_url = row.get_str(&["URL Criativo", "url_criativo", "mediaUrl"]);
    let library_url = row.get_str(&["URL Biblioteca", "url_biblioteca", "libraryUrl"]);
    let description = row.get_str(&["Descrição", "description", "copy"]);
    let sales_page_url = row.get_str(&["URL Destino", "url_destino", "salesPageUrl"]);

    let ad_count = extract_count(&info_ads);
    let (region, region_code) = classify_region(&info_ads);
    let niche = classify_niche(description.as_deref().unwrap_or(""));
    let creative_type = classify_creative(media_url.as_deref().unwrap_or(""));

    let brand_id = title.to_lowercase().replace(' ', "_");
    let brand_logo = format!(
        "https://ui-avatars.com/api/?name={}&background=020617&color=fff&bold=true",
        title.replace(' ', "+")
    );
    let media_hash = if external_id.chars().count() > 4 {
        let tail: String = external_id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("AS-{}", tail.to_uppercase())
    } else {
        "AS-NEW".to_string()
    };
    let targeting = json!({
        "locations": [{
            "country": region,
            "code": region_code,
            "volume": ad_count * 100,
        }]
    });

    Ok(AdPatch {
        insights: format!("Sinal detectado com {ad_count} ativos na região {region}."),
        external_id,
        title,
        brand_id,
        brand_logo,
        platform: "Facebook".to_string(),
        niche: niche.to_string(),
        region: region.to_string(),
        creative_type,
        status: AdStatus::for_count(ad_count),
        media_hash,
        cta: "Saiba Mais".to_string(),
        rating: rating_for(ad_count),
        ad_count,
        ticket_price: "Consultar".to_string(),
        funnel_type: "Direto".to_string(),
        thumbnail: media_url.clone(),
        media_url,
        copy_text: description,
        sales_page_url,
        library_url,
        targeting: Some(targeting),
        performance: None,
        tech_stack: None,
        site_traffic: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(pairs: &[(&str, &str)]) -> RawAdRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[rstest]
    #[case("45 anúncios ativos", 45)]
    #[case("sem contagem", 1)]
    #[case("", 1)]
    #[case("top 3 de 120", 3)]
    fn count_hint_takes_first_digit_run(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(extract_count(text), expected);
    }

    #[rstest]
    #[case("emagrecer rápido com dieta", "Saúde & Bem-estar")]
    #[case("renda com investimento em crypto", "Finanças & Investimentos")]
    #[case("melhor cassino online", "iGaming & Apostas")]
    #[case("frete grátis na loja", "E-commerce & Dropshipping")]
    #[case("curso de marketing", "Infoprodutos & Educação")]
    #[case("nada a ver", "Negócios")]
    fn niche_lexicon_matches(#[case] description: &str, #[case] expected: &str) {
        assert_eq!(classify_niche(description), expected);
    }

    #[test]
    fn niche_lexicon_order_wins() {
        // Matches both the health and the finance lexicon; the health
        // category comes first and must win.
        assert_eq!(
            classify_niche("dieta que dá dinheiro"),
            "Saúde & Bem-estar"
        );
    }

    #[rstest]
    #[case("44 ads brasil", "Brasil", "BR")]
    #[case("12 ads united states", "Estados Unidos", "US")]
    #[case("colombia 3", "Colômbia", "CO")]
    #[case("sem pista nenhuma", "Brasil", "BR")]
    fn region_lexicon_matches(#[case] info: &str, #[case] name: &str, #[case] code: &str) {
        assert_eq!(classify_region(info), (name, code));
    }

    #[rstest]
    #[case("https://cdn.x/y.mp4", CreativeType::Video)]
    #[case("https://cdn.x/y.MOV", CreativeType::Video)]
    #[case("https://cdn.x/preview-video-1", CreativeType::Video)]
    #[case("https://cdn.x/banner.png", CreativeType::Direct)]
    #[case("", CreativeType::Direct)]
    fn creative_type_from_url(#[case] url: &str, #[case] expected: CreativeType) {
        assert_eq!(classify_creative(url), expected);
    }

    #[test]
    fn normalize_fills_defaults_and_derivations() {
        let patch = normalize(&row(&[
            ("ID", "a1"),
            ("URL Criativo", "http://x/y.mp4"),
            ("Info Ads", "45 ads brasil"),
        ]))
        .unwrap();

        assert_eq!(patch.external_id, "a1");
        assert_eq!(patch.title, "Sinal Desconhecido");
        assert_eq!(patch.ad_count, 45);
        assert_eq!(patch.status, AdStatus::Scaling);
        assert_eq!(patch.creative_type, CreativeType::Video);
        assert_eq!(patch.region, "Brasil");
        assert!((patch.rating - 3.9).abs() < 1e-9);
        assert_eq!(patch.media_hash, "AS-NEW");
        assert_eq!(patch.thumbnail, patch.media_url);
        let targeting = patch.targeting.unwrap();
        assert_eq!(targeting["locations"][0]["volume"], 4500);
    }

    #[test]
    fn normalize_requires_an_external_id() {
        let err = normalize(&row(&[("Página", "Marca X")])).unwrap_err();
        assert!(matches!(err, IngestError::Row(_)));
    }

    #[test]
    fn non_string_cells_are_stringified() {
        let mut r = RawAdRow::default();
        r.insert("id", Value::Number(1042.into()));
        r.insert("Info Ads", Value::Number(12.into()));
        let patch = normalize(&r).unwrap();
        assert_eq!(patch.external_id, "1042");
        assert_eq!(patch.ad_count, 12);
    }

    #[test]
    fn aliases_are_case_insensitive() {
        let patch = normalize(&row(&[("id", "x9"), ("página", "Marca X")])).unwrap();
        assert_eq!(patch.title, "Marca X");
        assert_eq!(patch.brand_id, "marca_x");
    }
}
