// URL decomposition for the event envelope.
//
// Transactions receive a URL assembled from whichever of http.url,
// http.target, host and scheme attributes were present on the span; the
// decomposed form feeds the downstream schema directly.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Url {
    /// The URL exactly as reported by the instrumentation.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original: String,
    /// The re-assembled absolute URL, when one could be derived.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub full: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fragment: String,
}

impl Url {
    /// Assemble a URL from the original value plus fallback hostname and
    /// scheme. The original may be absolute or a bare path; a bare path is
    /// joined onto `scheme://hostname`. When no absolute URL can be formed,
    /// only `original` is retained.
    pub fn parse_from_parts(original: &str, hostname: &str, scheme: &str) -> Self {
        let scheme = if scheme.is_empty() { "http" } else { scheme };

        let parsed = match url::Url::parse(original) {
            Ok(u) if u.has_host() => Some(u),
            _ if !hostname.is_empty() => {
                let sep = if original.starts_with('/') { "" } else { "/" };
                url::Url::parse(&format!("{scheme}://{hostname}{sep}{original}")).ok()
            }
            _ => None,
        };

        match parsed {
            Some(u) => Url {
                original: original.to_owned(),
                full: u.to_string(),
                scheme: u.scheme().to_owned(),
                domain: u.host_str().unwrap_or_default().to_owned(),
                port: u.port(),
                path: u.path().to_owned(),
                query: u.query().unwrap_or_default().to_owned(),
                fragment: u.fragment().unwrap_or_default().to_owned(),
            },
            None => Url {
                original: original.to_owned(),
                ..Default::default()
            },
        }
    }
}
