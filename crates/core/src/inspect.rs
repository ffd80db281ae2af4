use bytes::Bytes;
use fixmyrig_model::{ImageAttachment, ModelProvider, ModelRequest};
use mime::Mime;

use crate::error::RelayError;
use crate::model_client::ModelClient;
use crate::prompts::INSPECTION_PROMPT;

/// Shown when the model returns no text for an image.
pub const EMPTY_REPORT: &str = "Could not analyze image.";

/// Shown when an image could not be analyzed.
pub const FAILED_REPORT: &str = "Error analyzing image. Please try again.";

/// Asks the model to inspect a photo of a PC component for damage.
///
/// Every analysis is independent: no session is used and nothing is
/// remembered between calls.
#[derive(Clone)]
pub struct InspectionRelay {
    client: ModelClient,
    model: Option<String>,
}

impl InspectionRelay {
    /// Creates a relay with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            client: ModelClient::new(provider),
            model: None,
        }
    }

    /// Selects the model. The provider's default is used otherwise.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Analyzes an image and returns the model's report as is.
    pub async fn analyze(
        &self,
        image: impl Into<Bytes>,
        media_type: Mime,
    ) -> Result<String, RelayError> {
        let attachment = ImageAttachment::new(image, media_type);
        debug!(
            "analyzing a {} image of {} bytes",
            attachment.media_type,
            attachment.data.len()
        );
        let request = ModelRequest::new(INSPECTION_PROMPT)
            .with_model(self.model.clone())
            .with_attachment(attachment);
        let response = self.client.generate(request).await?;
        Ok(response.text)
    }

    /// Analyzes an image and returns a report for display. Failures are
    /// reported in the text instead of being returned.
    pub async fn report(
        &self,
        image: impl Into<Bytes>,
        media_type: Mime,
    ) -> String {
        match self.analyze(image, media_type).await {
            Ok(text) if text.is_empty() => EMPTY_REPORT.to_owned(),
            Ok(text) => text,
            Err(err) => {
                warn!("image analysis failed: {err}");
                FAILED_REPORT.to_owned()
            }
        }
    }
}
