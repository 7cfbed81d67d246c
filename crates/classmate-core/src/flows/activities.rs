//! Differentiated activities: one tailored activity per student profile.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{GRADE_LEVEL_REQUIRED, push_field};
use crate::error::FlowError;
use crate::model::{self, GenerativeModel};
use crate::validate::FieldErrors;

pub const FLOW: &str = "differentiated_activities";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentProfile {
    pub student_id: String,
    pub learning_style: String,
    pub needs: String,
    pub current_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivitiesInput {
    pub topic: String,
    pub grade_level: String,
    pub students: Vec<StudentProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// The student ID exactly as given.
    pub student_id: String,
    /// What the student will do.
    pub activity_description: String,
    /// Why the activity suits this student's style, needs, and level.
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesOutput {
    /// Exactly one activity per student.
    pub activities: Vec<Activity>,
}

impl ActivitiesInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("topic", &self.topic, 2, "Topic is required.");
        errors.min_len("gradeLevel", &self.grade_level, 1, GRADE_LEVEL_REQUIRED);
        if self.students.is_empty() {
            errors.add("students", "At least one student is required.");
        }
        for (i, s) in self.students.iter().enumerate() {
            let field = |name: &str| format!("students[{i}].{name}");
            errors.min_len(&field("studentId"), &s.student_id, 1, "Student ID is required.");
            errors.min_len(
                &field("learningStyle"),
                &s.learning_style,
                2,
                "Learning style is required.",
            );
            errors.min_len(&field("needs"), &s.needs, 2, "Needs are required.");
            errors.min_len(
                &field("currentLevel"),
                &s.current_level,
                2,
                "Current level is required.",
            );
        }
        errors.into_result()
    }

    pub fn build_prompt(&self) -> String {
        let mut prompt = String::with_capacity(1024 + self.students.len() * 160);
        prompt.push_str(
            "You are an experienced teacher who designs differentiated learning activities. \
             For each student below, suggest one activity that fits their learning style, \
             needs, and current level for this topic and grade level, and explain why it \
             suits them.\n\n",
        );
        push_field(&mut prompt, "Topic", &self.topic);
        push_field(&mut prompt, "Grade level", &self.grade_level);
        prompt.push_str("\n### Students\n\n");
        for s in &self.students {
            push_field(&mut prompt, "Student ID", &s.student_id);
            push_field(&mut prompt, "Learning style", &s.learning_style);
            push_field(&mut prompt, "Needs", &s.needs);
            push_field(&mut prompt, "Current level", &s.current_level);
            prompt.push('\n');
        }
        prompt.push_str(&format!(
            "Return exactly {} activities, one for each student, and copy each \
             `studentId` exactly as given. Keep the activities engaging and suitable \
             for the student.\n",
            self.students.len()
        ));
        prompt
    }
}

/// Return activities in student order, one per student.
fn order_activities(
    students: &[StudentProfile],
    activities: Vec<Activity>,
) -> Result<Vec<Activity>, String> {
    if activities.len() != students.len() {
        return Err(format!(
            "expected {} activities, got {}",
            students.len(),
            activities.len()
        ));
    }
    let mut by_id: HashMap<String, Activity> = HashMap::with_capacity(activities.len());
    for activity in activities {
        let id = activity.student_id.clone();
        if by_id.insert(id.clone(), activity).is_some() {
            return Err(format!("student {id:?} has more than one activity"));
        }
    }
    students
        .iter()
        .map(|s| {
            by_id
                .remove(&s.student_id)
                .ok_or_else(|| format!("no activity for student {:?}", s.student_id))
        })
        .collect()
}

pub async fn run(
    model: &dyn GenerativeModel,
    input: &ActivitiesInput,
) -> Result<ActivitiesOutput, FlowError> {
    input.validate()?;
    let output: ActivitiesOutput = model::structured(model, FLOW, input.build_prompt()).await?;
    let activities = order_activities(&input.students, output.activities).map_err(|e| {
        warn!(flow = FLOW, error = %e, "activities rejected");
        FlowError::Contract(format!("{FLOW}: {e}"))
    })?;
    Ok(ActivitiesOutput { activities })
}
