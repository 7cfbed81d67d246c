//! Learning material generation (worksheets, flashcards, reading passages...).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{GRADE_LEVEL_REQUIRED, STANDARD_MATERIAL_FORMAT, or_default, push_field};
use crate::error::FlowError;
use crate::model::{self, GenerativeModel};
use crate::validate::FieldErrors;

pub const FLOW: &str = "learning_material";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialInput {
    pub material_type: String,
    pub topic: String,
    pub grade_level: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MaterialOutput {
    /// The material as Markdown.
    pub content: String,
}

impl MaterialInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len(
            "materialType",
            &self.material_type,
            3,
            "Please describe the material type.",
        );
        errors.min_len("topic", &self.topic, 3, "A topic is required.");
        errors.min_len("gradeLevel", &self.grade_level, 1, GRADE_LEVEL_REQUIRED);
        errors.into_result()
    }

    pub fn build_prompt(&self) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(
            "You are a curriculum designer helping a teacher prepare classroom materials.\n\n",
        );
        push_field(&mut prompt, "Material type", &self.material_type);
        push_field(&mut prompt, "Topic", &self.topic);
        push_field(&mut prompt, "Grade level", &self.grade_level);
        push_field(
            &mut prompt,
            "Specific instructions",
            or_default(self.instructions.as_deref(), STANDARD_MATERIAL_FORMAT),
        );
        prompt.push_str(
            "\n## Output requirements\n\n\
             1. Format `content` as Markdown: `#` headings, `*` bullets, and tables for \
             structured data such as flashcards.\n\
             2. Keep it accurate, clear, and right for the grade level.\n\
             3. Deliver the complete material, not an outline of it.\n",
        );
        prompt
    }
}

pub async fn run(
    model: &dyn GenerativeModel,
    input: &MaterialInput,
) -> Result<MaterialOutput, FlowError> {
    input.validate()?;
    model::structured(model, FLOW, input.build_prompt()).await
}
