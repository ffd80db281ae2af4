use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use fixmyrig_model::{
    ErrorKind, GroundingChunk, ModelFinishReason, ModelRequest, ModelTool,
};
use serde::{Deserialize, Serialize};

use crate::Error;

// -------------------------------------
// Types shared by requests and responses
// -------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    #[inline]
    pub fn model_text(text: String) -> Self {
        Self {
            role: Some("model".to_owned()),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    #[inline]
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct GoogleSearch {}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ApiError>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

impl GenerateContentResponse {
    /// Rejects payloads that carry an error or a blocked prompt.
    pub fn check(&self) -> Result<(), Error> {
        if let Some(error) = &self.error {
            return Err(error.to_error());
        }
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(Error::new(
                format!("prompt blocked: {reason}"),
                ErrorKind::Moderated,
            ));
        }
        Ok(())
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let mut text = None::<String>;
        for part in &content.parts {
            if let Some(t) = &part.text {
                text.get_or_insert_default().push_str(t);
            }
        }
        text
    }

    #[inline]
    pub fn finish_reason(&self) -> Option<ModelFinishReason> {
        let reason = self.candidates.first()?.finish_reason.as_deref()?;
        Some(match reason {
            "STOP" => ModelFinishReason::Stop,
            "MAX_TOKENS" => ModelFinishReason::MaxTokens,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => {
                ModelFinishReason::Safety
            }
            _ => ModelFinishReason::Other,
        })
    }

    pub fn into_citations(mut self) -> Vec<GroundingChunk> {
        if self.candidates.is_empty() {
            return vec![];
        }
        self.candidates
            .swap_remove(0)
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default()
    }
}

impl ApiError {
    pub fn to_error(&self) -> Error {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| "unknown provider error".to_owned());
        let kind = match (self.code, self.status.as_deref()) {
            (Some(401 | 403), _)
            | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
                ErrorKind::Unauthorized
            }
            (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => {
                ErrorKind::RateLimitExceeded
            }
            _ => ErrorKind::Other,
        };
        Error::new(message, kind)
    }
}

// -----------
// Conversions
// -----------

/// Builds the user turn of a request, attachment first.
pub fn create_user_content(req: &ModelRequest) -> Content {
    let mut parts = Vec::with_capacity(2);
    if let Some(attachment) = &req.attachment {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: attachment.media_type.essence_str().to_owned(),
                data: BASE64.encode(&attachment.data),
            }),
        });
    }
    parts.push(Part::text(req.text.clone()));
    Content {
        role: Some("user".to_owned()),
        parts,
    }
}

#[inline]
pub fn create_request(
    req: &ModelRequest,
    history: Vec<Content>,
    instructions: Option<&str>,
) -> GenerateContentRequest {
    let mut contents = history;
    contents.push(create_user_content(req));
    GenerateContentRequest {
        contents,
        system_instruction: instructions.map(|text| Content {
            role: None,
            parts: vec![Part::text(text.to_owned())],
        }),
        tools: req.tools.iter().map(create_tool).collect(),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    match tool {
        ModelTool::WebSearch => Tool {
            google_search: GoogleSearch {},
        },
    }
}
