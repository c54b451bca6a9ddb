//! Human-readable formatting for document listings.

use serde::Serialize;

/// Breadcrumb-style rendering of a document's source page.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct DocumentSource {
    pub text: String,
    pub url: Option<String>,
}

/// `https://city.gov/dept/parks/` becomes `dept ▸ parks`, linked when safe.
pub fn document_source(source: Option<&str>) -> DocumentSource {
    let Some(source) = source else {
        return DocumentSource {
            text: String::new(),
            url: None,
        };
    };

    let text = match strip_origin(source) {
        Some(path) => path.split('/').collect::<Vec<_>>().join(" ▸ "),
        None => source.to_string(),
    };
    DocumentSource {
        text,
        url: safe_url(source),
    }
}

/// The path after `scheme://host/` without a trailing slash, or `None` when
/// the URL has no path.
fn strip_origin(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let (host, path) = rest.split_once('/')?;
    if host.is_empty() {
        return None;
    }
    let path = path.strip_suffix('/').unwrap_or(path);
    (!path.is_empty()).then_some(path)
}

/// The trimmed URL if it is http or https.
pub fn safe_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}

pub fn format_metadata(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "—".to_string(),
    }
}

/// Compact counts: 1234 → `1.23k`, 1234567 → `1.23M`.
pub fn short_number(n: i64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "k")];

    let value = n as f64;
    for (scale, suffix) in UNITS {
        if value.abs() >= scale {
            let scaled = format!("{:.2}", value / scale);
            let scaled = scaled.trim_end_matches('0').trim_end_matches('.');
            return format!("{}{}", scaled, suffix);
        }
    }
    n.to_string()
}
