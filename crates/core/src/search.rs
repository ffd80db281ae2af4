use std::collections::HashSet;

use fixmyrig_model::{GroundingChunk, ModelProvider, ModelRequest, ModelTool};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::model_client::ModelClient;
use crate::prompts::search_prompt;

/// The summary used when a search fails.
pub const FAILED_SUMMARY: &str = "Failed to fetch resources. Please try again.";

/// The summary used when the model returns no text.
pub const EMPTY_SUMMARY: &str = "No description generated.";

/// A cited web page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchLink {
    /// The page title.
    pub title: String,
    /// The page URL.
    pub url: String,
}

/// The outcome of a resource search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The model's summary of the findings.
    pub summary: String,
    /// The pages the summary is grounded on.
    pub links: Vec<SearchLink>,
}

/// How repeated citations of the same page are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LinkPolicy {
    /// Every citation is kept, duplicates included.
    #[default]
    KeepDuplicates,
    /// Only the first citation of each URL is kept.
    DedupByUrl,
}

/// Turns citation records into links.
///
/// Records without a web source, or whose source lacks a URL or a title,
/// are dropped. The remaining links keep the order of the records.
pub fn extract_links(
    chunks: &[GroundingChunk],
    policy: LinkPolicy,
) -> Vec<SearchLink> {
    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter_map(|chunk| {
            let web = chunk.web.as_ref()?;
            let url = web.uri.as_deref().filter(|uri| !uri.is_empty())?;
            let title = web.title.as_deref().filter(|title| !title.is_empty())?;
            Some(SearchLink {
                title: title.to_owned(),
                url: url.to_owned(),
            })
        })
        .filter(|link| match policy {
            LinkPolicy::KeepDuplicates => true,
            LinkPolicy::DedupByUrl => seen.insert(link.url.clone()),
        })
        .collect()
}

/// Looks up drivers, manuals and forum solutions with a grounded search.
#[derive(Clone)]
pub struct SearchRelay {
    client: ModelClient,
    model: Option<String>,
    policy: LinkPolicy,
}

impl SearchRelay {
    /// Creates a relay with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            client: ModelClient::new(provider),
            model: None,
            policy: LinkPolicy::default(),
        }
    }

    /// Selects the model. The provider's default is used otherwise.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets how repeated citations are handled.
    #[inline]
    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs a search. Blank queries are ignored and return `Ok(None)`.
    ///
    /// The summary is returned as the model wrote it.
    pub async fn search(
        &self,
        query: &str,
    ) -> Result<Option<SearchResult>, RelayError> {
        if query.trim().is_empty() {
            trace!("ignoring a blank query");
            return Ok(None);
        }
        let request = ModelRequest::new(search_prompt(query))
            .with_model(self.model.clone())
            .with_tool(ModelTool::WebSearch);
        let response = self.client.generate(request).await?;
        let links = extract_links(&response.citations, self.policy);
        debug!(
            "search returned {} links from {} citations",
            links.len(),
            response.citations.len()
        );
        Ok(Some(SearchResult {
            summary: response.text,
            links,
        }))
    }

    /// Runs a search for display. Failures and empty summaries are
    /// reported in the summary instead of being returned.
    pub async fn lookup(&self, query: &str) -> Option<SearchResult> {
        match self.search(query).await {
            Ok(Some(mut result)) => {
                if result.summary.is_empty() {
                    result.summary = EMPTY_SUMMARY.to_owned();
                }
                Some(result)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("resource search failed: {err}");
                Some(SearchResult {
                    summary: FAILED_SUMMARY.to_owned(),
                    links: vec![],
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use fixmyrig_test_model::{PresetGenerate, TestModelProvider};
    use serde_json::json;

    use super::*;

    fn link(title: &str, url: &str) -> SearchLink {
        SearchLink {
            title: title.to_owned(),
            url: url.to_owned(),
        }
    }

    #[test]
    fn test_extract_links() {
        let chunks: Vec<GroundingChunk> = serde_json::from_value(json!([
            { "web": { "uri": "http://a", "title": "A" } },
            { "web": {} },
            { "foo": 1 },
            { "web": { "uri": "http://b", "title": "B" } }
        ]))
        .unwrap();

        assert_eq!(
            extract_links(&chunks, LinkPolicy::KeepDuplicates),
            [link("A", "http://a"), link("B", "http://b")]
        );
    }

    #[test]
    fn test_extract_links_incomplete_and_duplicates() {
        let chunks: Vec<GroundingChunk> = serde_json::from_value(json!([
            { "web": { "uri": "http://a", "title": "" } },
            { "web": { "uri": "", "title": "Empty" } },
            { "web": { "title": "No URL" } },
            { "web": { "uri": "http://b", "title": "B" } },
            { "web": { "uri": "http://c", "title": "C" } },
            { "web": { "uri": "http://b", "title": "B again" } }
        ]))
        .unwrap();

        assert_eq!(
            extract_links(&chunks, LinkPolicy::KeepDuplicates),
            [
                link("B", "http://b"),
                link("C", "http://c"),
                link("B again", "http://b")
            ]
        );
        assert_eq!(
            extract_links(&chunks, LinkPolicy::DedupByUrl),
            [link("B", "http://b"), link("C", "http://c")]
        );
        assert!(extract_links(&[], LinkPolicy::DedupByUrl).is_empty());
    }

    #[tokio::test]
    async fn test_search() {
        let provider = TestModelProvider::default();
        provider.add_generation(
            PresetGenerate::with_text("Get the BIOS update from ASUS.")
                .with_citations([
                    GroundingChunk::web("https://asus.com/b550", "ASUS"),
                    GroundingChunk::default(),
                ]),
        );
        let relay = SearchRelay::with_model_provider(provider.clone());

        let result = relay.search("ASUS B550 BIOS").await.unwrap().unwrap();
        assert_eq!(result.summary, "Get the BIOS update from ASUS.");
        assert_eq!(result.links, [link("ASUS", "https://asus.com/b550")]);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, search_prompt("ASUS B550 BIOS"));
        assert_eq!(requests[0].tools, [ModelTool::WebSearch]);
        assert!(requests[0].session.is_none());
        assert!(requests[0].attachment.is_none());
    }

    #[tokio::test]
    async fn test_blank_query() {
        let provider = TestModelProvider::default();
        let relay = SearchRelay::with_model_provider(provider.clone());
        assert!(relay.search("  ").await.unwrap().is_none());
        assert!(relay.lookup("").await.is_none());
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_fallbacks() {
        let provider = TestModelProvider::default();
        provider.add_generation(PresetGenerate::failure());
        provider.add_generation(PresetGenerate::with_text("").with_citations(
            [GroundingChunk::web("http://a", "A")],
        ));
        let relay = SearchRelay::with_model_provider(provider);

        assert_eq!(
            relay.lookup("RTX 3080 drivers").await.unwrap(),
            SearchResult {
                summary: FAILED_SUMMARY.to_owned(),
                links: vec![],
            }
        );
        assert_eq!(
            relay.lookup("RTX 3080 drivers").await.unwrap(),
            SearchResult {
                summary: EMPTY_SUMMARY.to_owned(),
                links: vec![link("A", "http://a")],
            }
        );
        assert!(matches!(
            relay.search("RTX 3080 drivers").await,
            Err(RelayError::Transport(_))
        ));
    }
}
