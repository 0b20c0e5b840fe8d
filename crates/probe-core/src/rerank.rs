//! Wire types for the `/rerank` endpoint of a text-embeddings router.

use crate::config::RerankDefaults;
use crate::error::Result;
use crate::probe::ProbeRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /rerank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankRequest {
    pub query: String,
    pub texts: Vec<String>,
    pub raw_scores: bool,
    pub return_text: bool,
}

impl RerankRequest {
    pub fn new<I, S>(query: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            texts: texts.into_iter().map(Into::into).collect(),
            raw_scores: false,
            return_text: true,
        }
    }

    /// The deep-learning query and four candidate texts used by the smoke test.
    pub fn sample() -> Self {
        Self::new(RerankDefaults::QUERY, RerankDefaults::TEXTS)
    }

    pub fn with_raw_scores(mut self, raw_scores: bool) -> Self {
        self.raw_scores = raw_scores;
        self
    }

    pub fn with_return_text(mut self, return_text: bool) -> Self {
        self.return_text = return_text;
        self
    }

    /// Build the probe request targeting `base_url` (e.g. `http://localhost:8081`).
    pub fn to_probe_request(&self, base_url: &str) -> Result<ProbeRequest> {
        ProbeRequest::post_json(rerank_url(base_url), self)
    }
}

/// One entry of a rerank response, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedText {
    #[serde(default)]
    pub index: Option<usize>,
    pub score: f64,
    #[serde(default)]
    pub text: Option<String>,
}

/// Interpret a success body as a ranking; `None` if it has another shape.
pub fn parse_ranking(body: &Value) -> Option<Vec<RankedText>> {
    if !body.is_array() {
        return None;
    }
    serde_json::from_value(body.clone()).ok()
}

/// `http://host:port` for a router listening on `host:port`.
pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{}:{}", host, port)
}

/// Join `base_url` with the rerank path.
pub fn rerank_url(base_url: &str) -> String {
    format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        RerankDefaults::RERANK_PATH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_request_body() {
        let body = serde_json::to_value(RerankRequest::sample()).unwrap();

        assert_eq!(body["query"], "What is deep learning?");
        assert_eq!(body["texts"].as_array().unwrap().len(), 4);
        assert_eq!(body["raw_scores"], false);
        assert_eq!(body["return_text"], true);
    }

    #[test]
    fn test_to_probe_request() {
        let request = RerankRequest::new("q", ["a", "b"])
            .with_raw_scores(true)
            .to_probe_request("http://localhost:8081/")
            .unwrap();

        assert_eq!(request.url(), "http://localhost:8081/rerank");
        assert_eq!(
            request.body(),
            Some(&json!({
                "query": "q",
                "texts": ["a", "b"],
                "raw_scores": true,
                "return_text": true
            }))
        );
    }

    #[test]
    fn test_parse_ranking() {
        let body = json!([
            {"index": 0, "score": 0.98, "text": "Deep learning is..."},
            {"index": 3, "score": 0.41}
        ]);
        let ranking = parse_ranking(&body).unwrap();

        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].index, Some(0));
        assert_eq!(ranking[1].text, None);
    }

    #[test]
    fn test_parse_ranking_other_shapes() {
        assert!(parse_ranking(&json!({"status": "ready"})).is_none());
        assert!(parse_ranking(&json!([{"text": "no score"}])).is_none());
    }

    #[test]
    fn test_urls() {
        assert_eq!(base_url("localhost", 8081), "http://localhost:8081");
        assert_eq!(rerank_url("http://localhost:8081"), "http://localhost:8081/rerank");
    }
}
