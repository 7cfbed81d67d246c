use thiserror::Error;

use crate::model::ModelError;
use crate::validate::FieldErrors;

/// Failure of a generation flow.
///
/// Flows are all-or-nothing: any of these means no output was produced.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The request failed input validation; nothing was sent upstream.
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    /// The model call itself failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model answered, but the answer broke the output contract.
    #[error("model response violated the output contract: {0}")]
    Contract(String),
}

impl From<FieldErrors> for FlowError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}
