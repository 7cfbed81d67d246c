//! Essay grading, one essay at a time or as a batch with a CSV report.
//!
//! A batch is graded in a single model call. The model must return exactly
//! one result per submitted file; anything else fails the whole batch. The
//! CSV is always rendered locally from the checked results.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    GRADE_LEVEL_REQUIRED, NO_STYLE_GUIDE, NO_TEACHER_NOTES, or_default, push_block, push_field,
};
use crate::error::FlowError;
use crate::model::{self, GenerativeModel};
use crate::report;
use crate::validate::FieldErrors;

pub const FLOW: &str = "essay_grading";
pub const BATCH_FLOW: &str = "batch_essay_grading";

const RUBRIC_MIN: usize = 20;

// ---------------------------------------------------------------------------
// Single essay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EssayGradingInput {
    pub essay: String,
    pub rubric: String,
    pub grade_level: String,
    pub teacher_notes: Option<String>,
    pub style_guide: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EssayGradingOutput {
    /// The grade, in whatever form the rubric uses (e.g. "B+" or "85/100").
    pub grade: String,
    /// Feedback addressed to the student: strengths and areas to improve.
    pub feedback: String,
    /// Why this grade was given, with reference to the rubric.
    pub reasoning: String,
}

impl EssayGradingInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("essay", &self.essay, 50, "Essay content is too short.");
        errors.min_len("rubric", &self.rubric, RUBRIC_MIN, "Rubric must be provided.");
        errors.min_len("gradeLevel", &self.grade_level, 1, GRADE_LEVEL_REQUIRED);
        errors.into_result()
    }

    pub fn build_prompt(&self) -> String {
        let mut prompt = String::with_capacity(2048 + self.essay.len());
        push_grader_preamble(&mut prompt, "a student essay", "the student's");
        push_field(&mut prompt, "Grade level", &self.grade_level);
        prompt.push('\n');
        push_shared_context(
            &mut prompt,
            &self.rubric,
            self.teacher_notes.as_deref(),
            self.style_guide.as_deref(),
        );
        push_block(&mut prompt, "Essay", &self.essay);
        prompt.push_str(
            "Give a grade, feedback, and the reasoning behind the grade. \
             Cover both strengths and areas for improvement, and keep everything \
             helpful and appropriate for a student at this grade level.\n",
        );
        prompt
    }
}

pub async fn grade(
    model: &dyn GenerativeModel,
    input: &EssayGradingInput,
) -> Result<EssayGradingOutput, FlowError> {
    input.validate()?;
    model::structured(model, FLOW, input.build_prompt()).await
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EssayFile {
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchGradingInput {
    pub essays: Vec<EssayFile>,
    pub grade_level: String,
    pub rubric: String,
    pub teacher_notes: Option<String>,
    pub style_guide: Option<String>,
}

/// Grading result for one file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EssayGradingResult {
    /// The essay's file name, trimmed of surrounding whitespace.
    pub file_name: String,
    /// The grade, in whatever form the rubric uses.
    pub grade: String,
    /// Feedback addressed to the student.
    pub feedback: String,
    /// Why this grade was given, with reference to the rubric.
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGradingOutput {
    pub results: Vec<EssayGradingResult>,
    pub csv_content: String,
}

/// What the model is asked for. The CSV is never taken from the model.
#[derive(Debug, Deserialize, JsonSchema)]
struct BatchModelOutput {
    /// One entry per essay, in any order.
    results: Vec<EssayGradingResult>,
}

impl BatchGradingInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.essays.is_empty() {
            errors.add("essays", "Please upload at least one essay file.");
        }
        for (i, essay) in self.essays.iter().enumerate() {
            errors.min_len(
                &format!("essays[{i}].fileName"),
                &essay.file_name,
                1,
                "File name is required.",
            );
            errors.min_len(
                &format!("essays[{i}].content"),
                &essay.content,
                1,
                "Essay file is empty.",
            );
        }
        errors.min_len("gradeLevel", &self.grade_level, 1, GRADE_LEVEL_REQUIRED);
        errors.min_len("rubric", &self.rubric, RUBRIC_MIN, "A detailed rubric is required.");
        errors.into_result()
    }

    /// Copy of the input with every file name trimmed, the form used for
    /// duplicate checks, the prompt, result matching and the CSV.
    fn with_trimmed_names(&self) -> Self {
        let essays = self
            .essays
            .iter()
            .map(|e| EssayFile {
                file_name: e.file_name.trim().to_string(),
                content: e.content.clone(),
            })
            .collect();
        Self {
            essays,
            ..self.clone()
        }
    }

    pub fn build_prompt(&self) -> String {
        let body: usize = self.essays.iter().map(|e| e.content.len() + 64).sum();
        let mut prompt = String::with_capacity(2048 + body);
        push_grader_preamble(&mut prompt, "a batch of student essays", "the students'");
        push_field(&mut prompt, "Grade level", &self.grade_level);
        prompt.push('\n');
        push_shared_context(
            &mut prompt,
            &self.rubric,
            self.teacher_notes.as_deref(),
            self.style_guide.as_deref(),
        );
        prompt.push_str("### Essays\n\n");
        prompt.push_str("The same rubric applies to every essay.\n\n");
        for essay in &self.essays {
            push_field(&mut prompt, "File name", &essay.file_name);
            prompt.push_str(essay.content.trim());
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!(
            "Return exactly {} results, one per essay above. Copy each `fileName` \
             exactly as given. For every essay give a grade, feedback, and the \
             reasoning behind the grade, appropriate for students at this grade level.\n",
            self.essays.len()
        ));
        prompt
    }
}

/// Match model results to input files, returning them in input order.
///
/// Fails unless every file name appears exactly once.
fn order_results(
    essays: &[EssayFile],
    results: Vec<EssayGradingResult>,
) -> Result<Vec<EssayGradingResult>, String> {
    let mut by_name: HashMap<String, EssayGradingResult> = HashMap::with_capacity(results.len());
    for mut result in results {
        result.file_name = result.file_name.trim().to_string();
        if !essays.iter().any(|e| e.file_name == result.file_name) {
            return Err(format!("result for unknown file {:?}", result.file_name));
        }
        let name = result.file_name.clone();
        if by_name.insert(name.clone(), result).is_some() {
            return Err(format!("file {name:?} graded more than once"));
        }
    }

    let mut ordered = Vec::with_capacity(essays.len());
    for essay in essays {
        match by_name.remove(&essay.file_name) {
            Some(result) => ordered.push(result),
            None => return Err(format!("no result for file {:?}", essay.file_name)),
        }
    }
    Ok(ordered)
}

pub async fn grade_batch(
    model: &dyn GenerativeModel,
    input: &BatchGradingInput,
) -> Result<BatchGradingOutput, FlowError> {
    input.validate()?;
    let input = input.with_trimmed_names();
    if let Some(name) = duplicate_file_name(&input.essays) {
        let mut errors = FieldErrors::new();
        errors.add("essays", format!("File name {name:?} appears more than once."));
        return Err(errors.into());
    }

    let output: BatchModelOutput =
        model::structured(model, BATCH_FLOW, input.build_prompt()).await?;
    let results = order_results(&input.essays, output.results).map_err(|e| {
        warn!(flow = BATCH_FLOW, error = %e, "batch results rejected");
        FlowError::Contract(format!("{BATCH_FLOW}: {e}"))
    })?;

    info!(flow = BATCH_FLOW, essays = results.len(), "batch graded");
    let csv_content = report::grading_csv(&results);
    Ok(BatchGradingOutput {
        results,
        csv_content,
    })
}

fn duplicate_file_name(essays: &[EssayFile]) -> Option<&str> {
    essays.iter().enumerate().find_map(|(i, e)| {
        essays[..i]
            .iter()
            .any(|prev| prev.file_name == e.file_name)
            .then_some(e.file_name.as_str())
    })
}

// ---------------------------------------------------------------------------
// Shared prompt pieces
// ---------------------------------------------------------------------------

fn push_grader_preamble(prompt: &mut String, what: &str, whose: &str) {
    prompt.push_str(&format!(
        "You are a teaching assistant grading {what}. Adapt your grading to {whose} \
         grade level. The teacher's notes are the final authority: follow them over \
         anything else. Write your feedback in the teacher's own voice, as shown in \
         the style guide.\n\n"
    ));
}

fn push_shared_context(
    prompt: &mut String,
    rubric: &str,
    teacher_notes: Option<&str>,
    style_guide: Option<&str>,
) {
    push_block(prompt, "Teacher's style guide", or_default(style_guide, NO_STYLE_GUIDE));
    push_block(prompt, "Rubric", rubric);
    push_block(prompt, "Teacher's notes", or_default(teacher_notes, NO_TEACHER_NOTES));
}
