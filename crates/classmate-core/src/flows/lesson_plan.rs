//! Personalized lesson plan generation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{GRADE_LEVEL_REQUIRED, push_field};
use crate::error::FlowError;
use crate::model::{self, GenerativeModel};
use crate::validate::FieldErrors;

pub const FLOW: &str = "lesson_plan";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonPlanInput {
    pub student_needs: String,
    pub curriculum: String,
    pub objectives: String,
    pub grade_level: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanOutput {
    /// A single detailed lesson plan, readable by a teacher.
    pub lesson_plan: String,
}

impl LessonPlanInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len(
            "studentNeeds",
            &self.student_needs,
            10,
            "Please provide more detail on student needs.",
        );
        errors.min_len("curriculum", &self.curriculum, 2, "Curriculum is required.");
        errors.min_len(
            "objectives",
            &self.objectives,
            10,
            "Please provide more detail on lesson objectives.",
        );
        errors.min_len("gradeLevel", &self.grade_level, 1, GRADE_LEVEL_REQUIRED);
        errors.min_len("subject", &self.subject, 2, "Subject is required.");
        errors.into_result()
    }

    pub fn build_prompt(&self) -> String {
        let mut prompt = String::with_capacity(1024);
        prompt.push_str(
            "You are an experienced teacher who writes personalized lesson plans. \
             Using the student needs, curriculum, objectives, grade level and subject \
             below, write one detailed lesson plan.\n\n",
        );
        push_field(&mut prompt, "Student needs", &self.student_needs);
        push_field(&mut prompt, "Curriculum", &self.curriculum);
        push_field(&mut prompt, "Objectives", &self.objectives);
        push_field(&mut prompt, "Grade level", &self.grade_level);
        push_field(&mut prompt, "Subject", &self.subject);
        prompt.push_str(
            "\nDraw on a range of teaching methods and include differentiated activities. \
             The plan should adapt to how these students learn. \
             Lay it out so a teacher can follow it at a glance. \
             Write a single lesson, not a unit or a series.\n",
        );
        prompt
    }
}

pub async fn run(
    model: &dyn GenerativeModel,
    input: &LessonPlanInput,
) -> Result<LessonPlanOutput, FlowError> {
    input.validate()?;
    model::structured(model, FLOW, input.build_prompt()).await
}
