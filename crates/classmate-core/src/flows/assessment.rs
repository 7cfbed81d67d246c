//! Automatic assessment generation, with a playable quiz for quiz and game
//! assessments.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{GRADE_LEVEL_REQUIRED, push_field};
use crate::error::FlowError;
use crate::model::{self, GenerativeModel};
use crate::quiz::{self, OPTIONS_PER_QUESTION, QUIZ_LENGTH, QuizContractError, QuizQuestion};
use crate::validate::FieldErrors;

pub const FLOW: &str = "assessment";

// ---------------------------------------------------------------------------
// AssessmentType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentType {
    Quiz,
    Game,
    Project,
    Essay,
}

impl AssessmentType {
    /// Quiz and game assessments carry a multiple-choice quiz.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Quiz | Self::Game)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Game => "game",
            Self::Project => "project",
            Self::Essay => "essay",
        }
    }
}

impl fmt::Display for AssessmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentType {
    type Err = AssessmentTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "quiz" => Ok(Self::Quiz),
            "game" => Ok(Self::Game),
            "project" => Ok(Self::Project),
            "essay" => Ok(Self::Essay),
            other => Err(AssessmentTypeParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentTypeParseError(pub String);

impl fmt::Display for AssessmentTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid assessment type: {:?} (expected quiz, game, project, or essay)",
            self.0
        )
    }
}

impl std::error::Error for AssessmentTypeParseError {}

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

/// The type arrives as a string so that a missing or unknown value is
/// reported as a field error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentInput {
    pub topic: String,
    pub grade_level: String,
    pub assessment_type: String,
    pub learning_objectives: String,
    pub curriculum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentOutput {
    /// The assessment in plain text or Markdown, ending with an "Answer Key"
    /// section.
    pub assessment_content: String,
    /// Notes for the teacher about the assessment.
    pub feedback: String,
    /// Five multiple-choice questions. Required for quiz and game
    /// assessments only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuizQuestion>>,
}

impl AssessmentInput {
    /// Check every field; on success returns the parsed assessment type.
    pub fn validate(&self) -> Result<AssessmentType, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.min_len("topic", &self.topic, 2, "Topic is required.");
        errors.min_len("gradeLevel", &self.grade_level, 1, GRADE_LEVEL_REQUIRED);
        let assessment_type = if self.assessment_type.trim().is_empty() {
            errors.add("assessmentType", "Assessment type is required.");
            None
        } else {
            match self.assessment_type.parse::<AssessmentType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    errors.add("assessmentType", e.to_string());
                    None
                }
            }
        };
        errors.min_len(
            "learningObjectives",
            &self.learning_objectives,
            10,
            "Please provide detailed learning objectives.",
        );
        errors.min_len("curriculum", &self.curriculum, 2, "Curriculum is required.");
        match assessment_type {
            Some(t) if errors.is_empty() => Ok(t),
            _ => Err(errors),
        }
    }

    pub fn build_prompt(&self, assessment_type: AssessmentType) -> String {
        let mut prompt = String::with_capacity(1536);
        prompt.push_str(
            "You are an experienced teacher preparing an assessment for your class.\n\n",
        );
        push_field(&mut prompt, "Topic", &self.topic);
        push_field(&mut prompt, "Grade level", &self.grade_level);
        push_field(&mut prompt, "Assessment type", assessment_type.as_str());
        push_field(&mut prompt, "Learning objectives", &self.learning_objectives);
        push_field(&mut prompt, "Curriculum", &self.curriculum);

        prompt.push_str("\n## Output requirements\n\n");
        prompt.push_str(
            "1. `assessmentContent` is plain text or Markdown. Never use HTML.\n\
             2. Include clear questions, instructions for students, and evaluation criteria.\n\
             3. End `assessmentContent` with a section titled \"Answer Key\" that answers every question.\n\
             4. Pitch the difficulty at the stated grade level and keep it engaging.\n",
        );
        if assessment_type.is_interactive() {
            prompt.push_str(&format!(
                "5. Also fill `quiz` with exactly {QUIZ_LENGTH} multiple-choice questions. \
                 Each question has exactly {OPTIONS_PER_QUESTION} options, and its `answer` \
                 is copied verbatim from one of them.\n",
            ));
        } else {
            prompt.push_str("5. Leave `quiz` out.\n");
        }
        prompt.push_str("\nUse `feedback` for short notes to the teacher about the assessment.\n");
        prompt
    }
}

/// Enforce the quiz contract for interactive types; drop any quiz otherwise.
fn check_output(
    assessment_type: AssessmentType,
    mut output: AssessmentOutput,
) -> Result<AssessmentOutput, QuizContractError> {
    if !assessment_type.is_interactive() {
        output.quiz = None;
        return Ok(output);
    }
    let questions = output.quiz.as_deref().ok_or(QuizContractError::Missing)?;
    quiz::check_quiz(questions)?;
    Ok(output)
}

pub async fn run(
    model: &dyn GenerativeModel,
    input: &AssessmentInput,
) -> Result<AssessmentOutput, FlowError> {
    let assessment_type = input.validate()?;
    let output = model::structured(model, FLOW, input.build_prompt(assessment_type)).await?;
    check_output(assessment_type, output).map_err(|e| {
        tracing::warn!(flow = FLOW, error = %e, "assessment quiz rejected");
        FlowError::Contract(format!("{FLOW}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::ScriptedModel;

    fn input(assessment_type: AssessmentType) -> AssessmentInput {
        AssessmentInput {
            topic: "Photosynthesis".into(),
            grade_level: "7".into(),
            assessment_type: assessment_type.to_string(),
            learning_objectives: "Explain how plants make food from light".into(),
            curriculum: "NGSS".into(),
        }
    }

    fn quiz_json(count: usize) -> serde_json::Value {
        let questions: Vec<_> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "question": format!("Question {i}?"),
                    "options": ["A", "B", "C", "D"],
                    "answer": "C",
                })
            })
            .collect();
        serde_json::Value::Array(questions)
    }

    #[test]
    fn type_round_trips_through_str() {
        for t in [
            AssessmentType::Quiz,
            AssessmentType::Game,
            AssessmentType::Project,
            AssessmentType::Essay,
        ] {
            assert_eq!(t.to_string().parse::<AssessmentType>().unwrap(), t);
        }
        assert!("exam".parse::<AssessmentType>().is_err());
    }

    #[test]
    fn only_quiz_and_game_are_interactive() {
        assert!(AssessmentType::Quiz.is_interactive());
        assert!(AssessmentType::Game.is_interactive());
        assert!(!AssessmentType::Project.is_interactive());
        assert!(!AssessmentType::Essay.is_interactive());
    }

    #[test]
    fn short_objectives_rejected() {
        let bad = AssessmentInput {
            learning_objectives: "plants".into(),
            ..input(AssessmentType::Quiz)
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(
            errors.get("learningObjectives"),
            Some("Please provide detailed learning objectives.")
        );
    }

    #[test]
    fn prompt_asks_for_quiz_only_when_interactive() {
        let game = input(AssessmentType::Game);
        assert!(game.build_prompt(AssessmentType::Game).contains("exactly 5 multiple-choice"));
        let essay = input(AssessmentType::Essay);
        assert!(essay.build_prompt(AssessmentType::Essay).contains("Leave `quiz` out"));
    }

    #[test]
    fn valid_input_yields_parsed_type() {
        assert_eq!(input(AssessmentType::Project).validate(), Ok(AssessmentType::Project));
    }

    #[tokio::test]
    async fn missing_type_rejected_before_model_call() {
        let body = serde_json::json!({
            "topic": "Photosynthesis",
            "gradeLevel": "7",
            "learningObjectives": "Explain how plants make food from light",
            "curriculum": "NGSS",
        });
        let missing: AssessmentInput = serde_json::from_value(body).unwrap();
        let model = ScriptedModel::new(serde_json::json!({}));
        let err = run(&model, &missing).await.unwrap_err();
        match err {
            FlowError::Validation(fields) => {
                assert_eq!(fields.get("assessmentType"), Some("Assessment type is required."));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(!model.was_called());
    }

    #[test]
    fn unknown_type_reported_on_field() {
        let exam = AssessmentInput {
            assessment_type: "exam".into(),
            ..input(AssessmentType::Quiz)
        };
        let errors = exam.validate().unwrap_err();
        assert!(errors.get("assessmentType").unwrap().contains("\"exam\""));
    }

    #[tokio::test]
    async fn quiz_assessment_with_valid_quiz() {
        let model = ScriptedModel::new(serde_json::json!({
            "assessmentContent": "Questions...\n\nAnswer Key",
            "feedback": "Good coverage",
            "quiz": quiz_json(5),
        }));
        let out = run(&model, &input(AssessmentType::Quiz)).await.unwrap();
        let quiz = out.quiz.unwrap();
        assert_eq!(quiz.len(), 5);
        assert!(quiz.iter().all(|q| q.options.len() == 4 && q.options.contains(&q.answer)));
    }

    #[tokio::test]
    async fn game_without_quiz_is_contract_error() {
        let model = ScriptedModel::new(serde_json::json!({
            "assessmentContent": "Game rules",
            "feedback": "Fun",
        }));
        let err = run(&model, &input(AssessmentType::Game)).await.unwrap_err();
        assert!(matches!(err, FlowError::Contract(ref m) if m.contains("missing")), "got {err:?}");
    }

    #[tokio::test]
    async fn short_quiz_is_contract_error() {
        let model = ScriptedModel::new(serde_json::json!({
            "assessmentContent": "Q",
            "feedback": "F",
            "quiz": quiz_json(3),
        }));
        let err = run(&model, &input(AssessmentType::Quiz)).await.unwrap_err();
        assert!(matches!(err, FlowError::Contract(_)));
    }

    #[tokio::test]
    async fn project_drops_returned_quiz() {
        let model = ScriptedModel::new(serde_json::json!({
            "assessmentContent": "Build a model leaf",
            "feedback": "Hands-on",
            "quiz": quiz_json(2),
        }));
        let out = run(&model, &input(AssessmentType::Project)).await.unwrap();
        assert!(out.quiz.is_none());
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("quiz").is_none());
    }
}
