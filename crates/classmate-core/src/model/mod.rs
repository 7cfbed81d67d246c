//! Generative-model adapter interface.
//!
//! Flows talk to the hosted model only through the [`GenerativeModel`]
//! trait. A request carries the rendered prompt plus the JSON Schema the
//! answer must follow; the adapter returns the parsed JSON value and
//! [`structured`] turns it into the flow's typed output.
//!
//! ```text
//! flow::run(input)
//!     |
//!     v
//! build_prompt(input) + output_schema::<T>()
//!     |
//!     v
//! GenerativeModel::generate(request) --> serde_json::Value --> T
//! ```

pub mod error;
pub mod gemini;
pub mod schema;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::FlowError;

pub use error::ModelError;
pub use gemini::{GeminiClient, GeminiConfig};
pub use schema::output_schema;

/// A single structured-generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Flow name, used for logging only.
    pub flow: &'static str,
    /// Fully rendered natural-language prompt.
    pub prompt: String,
    /// JSON Schema the response must conform to.
    pub response_schema: serde_json::Value,
}

/// Adapter interface for hosted generative models.
///
/// The trait is object safe so the server can share one
/// `Arc<dyn GenerativeModel>` across handlers.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier (e.g. "gemini-2.5-flash").
    fn name(&self) -> &str;

    /// Run one generation and return the model's JSON answer.
    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, ModelError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GenerativeModel) {}
};

/// Call `model` with `prompt` and decode the answer into `T`.
///
/// The schema sent upstream is derived from `T`, so a payload that fails to
/// deserialize is reported as [`FlowError::Contract`].
pub async fn structured<T>(
    model: &dyn GenerativeModel,
    flow: &'static str,
    prompt: String,
) -> Result<T, FlowError>
where
    T: DeserializeOwned + JsonSchema,
{
    let request = GenerationRequest {
        flow,
        prompt,
        response_schema: output_schema::<T>(),
    };

    info!(flow, model = model.name(), "calling generative model");
    debug!(flow, prompt_chars = request.prompt.len(), "prompt rendered");

    let value = model.generate(&request).await?;
    serde_json::from_value(value)
        .map_err(|e| FlowError::Contract(format!("{flow}: response does not match schema: {e}")))
}
