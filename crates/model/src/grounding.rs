use serde::{Deserialize, Serialize};

/// A citation record returned alongside a search-grounded response.
///
/// Records are opaque apart from the optional `web` source. Unknown fields
/// are ignored, so records of other source types deserialize to a chunk
/// without `web`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundingChunk {
    /// The web page this chunk refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

impl GroundingChunk {
    /// Creates a chunk pointing to a web page.
    #[inline]
    pub fn web<U: Into<String>, T: Into<String>>(uri: U, title: T) -> Self {
        Self {
            web: Some(WebSource {
                uri: Some(uri.into()),
                title: Some(title.into()),
            }),
        }
    }
}

/// A web page cited by the model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebSource {
    /// The page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// The page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_mixed_records() {
        let chunks: Vec<GroundingChunk> = serde_json::from_value(json!([
            { "web": { "uri": "http://a", "title": "A" } },
            { "web": {} },
            { "foo": 1 },
        ]))
        .unwrap();
        assert_eq!(chunks[0], GroundingChunk::web("http://a", "A"));
        assert_eq!(chunks[1].web, Some(WebSource::default()));
        assert_eq!(chunks[2].web, None);
    }
}
