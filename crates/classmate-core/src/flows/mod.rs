//! Teacher-facing generation flows.
//!
//! Every flow has the same shape: a camelCase input type with
//! `validate()`, a `build_prompt()` that fills in defaults for optional
//! fields, and an async `run()` that calls the model through
//! [`crate::model::structured`] and checks the output contract.

pub mod activities;
pub mod assessment;
pub mod essay_grading;
pub mod lesson_plan;
pub mod material;

/// Substituted when the teacher leaves grading notes empty.
pub const NO_TEACHER_NOTES: &str = "No specific teacher notes provided.";

/// Substituted when no style guide has been saved.
pub const NO_STYLE_GUIDE: &str =
    "No style guide provided. Use a generally encouraging and constructive tone.";

/// Substituted when a material request has no specific instructions.
pub const STANDARD_MATERIAL_FORMAT: &str = "Use a standard format for this material type.";

const GRADE_LEVEL_REQUIRED: &str = "Grade level is required.";

/// `value` unless it is missing or blank.
pub(crate) fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

/// Append a `Label: value` line.
pub(crate) fn push_field(prompt: &mut String, label: &str, value: &str) {
    prompt.push_str(label);
    prompt.push_str(": ");
    prompt.push_str(value.trim());
    prompt.push('\n');
}

/// Append a headed block of free text followed by a blank line.
pub(crate) fn push_block(prompt: &mut String, heading: &str, body: &str) {
    prompt.push_str("### ");
    prompt.push_str(heading);
    prompt.push_str("\n\n");
    prompt.push_str(body.trim());
    prompt.push_str("\n\n");
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::model::{GenerationRequest, GenerativeModel, ModelError};

    /// Returns one canned answer and remembers the last request.
    pub struct ScriptedModel {
        answer: serde_json::Value,
        last: Mutex<Option<GenerationRequest>>,
    }

    impl ScriptedModel {
        pub fn new(answer: serde_json::Value) -> Self {
            Self {
                answer,
                last: Mutex::new(None),
            }
        }

        pub fn last_request(&self) -> GenerationRequest {
            self.last
                .lock()
                .unwrap()
                .clone()
                .expect("model was not called")
        }

        pub fn was_called(&self) -> bool {
            self.last.lock().unwrap().is_some()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<serde_json::Value, ModelError> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(self.answer.clone())
        }
    }
}
