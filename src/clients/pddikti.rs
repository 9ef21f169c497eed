use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// The four entity kinds exposed by the PDDikti search API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Mahasiswa,
    Dosen,
    Prodi,
    Pt,
}

impl Resource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mahasiswa => "mahasiswa",
            Self::Dosen => "dosen",
            Self::Prodi => "prodi",
            Self::Pt => "pt",
        }
    }

    /// Upstream path segment. The upstream abbreviates "mahasiswa" to "mhs";
    /// the other three match our public names.
    const fn upstream_segment(self) -> &'static str {
        match self {
            Self::Mahasiswa => "mhs",
            Self::Dosen => "dosen",
            Self::Prodi => "prodi",
            Self::Pt => "pt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mahasiswa" => Some(Self::Mahasiswa),
            "dosen" => Some(Self::Dosen),
            "prodi" => Some(Self::Prodi),
            "pt" => Some(Self::Pt),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PddiktiError {
    /// Upstream answered with a non-success status; status and body are
    /// propagated verbatim for diagnostics.
    #[error("PDDikti returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Upstream answered 2xx with a body that is not valid JSON. A contract
    /// violation, surfaced separately from ordinary upstream failures.
    #[error("PDDikti returned an unparseable body: {0}")]
    Parse(String),

    #[error("Failed to reach PDDikti: {0}")]
    Connection(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct PddiktiClient {
    client: Client,
    base_url: String,
}

impl PddiktiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .user_agent("Diktisearch/1.0")
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
        Ok(Self::with_shared_client(client, base_url))
    }

    #[must_use]
    pub fn with_shared_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Free-text search for one resource kind. Returns the raw entity records;
    /// callers treat them as untyped bags of string fields.
    ///
    /// The upstream is known to answer "no matches" with an empty body rather
    /// than `[]`, and occasionally with a bare object instead of an array.
    /// Both are normalized here.
    pub async fn search(&self, resource: Resource, query: &str) -> Result<Vec<Value>, PddiktiError> {
        let url = format!(
            "{}/pencarian/{}/{}",
            self.base_url,
            resource.upstream_segment(),
            urlencoding::encode(query)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PddiktiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_search_body(&body)
    }

    /// Thin detail forward. A 404 from upstream means the id does not exist,
    /// which is a `None` rather than an error.
    pub async fn detail(&self, resource: Resource, id: &str) -> Result<Option<Value>, PddiktiError> {
        let url = format!(
            "{}/detail/{}/{}",
            self.base_url,
            resource.upstream_segment(),
            urlencoding::encode(id)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PddiktiError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| PddiktiError::Parse(e.to_string()))?;
        Ok(Some(value))
    }
}

/// Normalizes a 2xx search body: empty → `[]`, bare object → one-element
/// array, `null` → `[]`, anything unparseable → parse error.
fn parse_search_body(body: &str) -> Result<Vec<Value>, PddiktiError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| PddiktiError::Parse(e.to_string()))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other @ Value::Object(_) => Ok(vec![other]),
        other => Err(PddiktiError::Parse(format!(
            "expected an array or object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_empty_result() {
        assert!(parse_search_body("").unwrap().is_empty());
        assert!(parse_search_body("   \n").unwrap().is_empty());
    }

    #[test]
    fn test_null_body_is_empty_result() {
        assert!(parse_search_body("null").unwrap().is_empty());
    }

    #[test]
    fn test_bare_object_is_coerced_to_array() {
        let items = parse_search_body(r#"{"nama": "Budi"}"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["nama"], "Budi");
    }

    #[test]
    fn test_array_passes_through() {
        let items = parse_search_body(r#"[{"nama": "A"}, {"nama": "B"}]"#).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let err = parse_search_body("<html>oops</html>").unwrap_err();
        assert!(matches!(err, PddiktiError::Parse(_)));
    }

    #[test]
    fn test_scalar_body_is_parse_error() {
        let err = parse_search_body("42").unwrap_err();
        assert!(matches!(err, PddiktiError::Parse(_)));
    }

    #[test]
    fn test_resource_parse_round_trip() {
        for resource in [
            Resource::Mahasiswa,
            Resource::Dosen,
            Resource::Prodi,
            Resource::Pt,
        ] {
            assert_eq!(Resource::parse(resource.as_str()), Some(resource));
        }
        assert_eq!(Resource::parse("jurusan"), None);
    }
}
