//! `classmate grade` and `classmate batch-grade`: grade essay files from disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use classmate_core::GenerativeModel;
use classmate_core::files;
use classmate_core::flows::essay_grading::{
    self, BatchGradingInput, BatchGradingOutput, EssayFile, EssayGradingInput, EssayGradingOutput,
};

/// Options shared by single and batch grading.
#[derive(Debug, Clone)]
pub struct GradeOptions {
    pub rubric: PathBuf,
    pub grade_level: String,
    pub notes: Option<String>,
    /// The saved style guide, if any.
    pub style_guide: Option<String>,
}

fn read_rubric(path: &Path) -> Result<String> {
    files::read_text_file(path).context("failed to read rubric")
}

pub async fn run_grade(
    model: &dyn GenerativeModel,
    essay: &Path,
    options: &GradeOptions,
) -> Result<EssayGradingOutput> {
    let input = EssayGradingInput {
        essay: files::read_text_file(essay).context("failed to read essay")?,
        rubric: read_rubric(&options.rubric)?,
        grade_level: options.grade_level.clone(),
        teacher_notes: options.notes.clone(),
        style_guide: options.style_guide.clone(),
    };

    let out = essay_grading::grade(model, &input)
        .await
        .with_context(|| format!("failed to grade {}", essay.display()))?;

    println!("Grade: {}", out.grade);
    println!();
    println!("Feedback:");
    println!("{}", out.feedback);
    println!();
    println!("Reasoning:");
    println!("{}", out.reasoning);
    Ok(out)
}

/// Grade every file in one model call and write the CSV report to `output`.
///
/// All files are read before the model is called; one unreadable file
/// aborts the batch.
pub async fn run_batch_grade(
    model: &dyn GenerativeModel,
    essays: &[PathBuf],
    options: &GradeOptions,
    output: &Path,
) -> Result<BatchGradingOutput> {
    let essays = essays
        .iter()
        .map(|path| -> Result<EssayFile> {
            Ok(EssayFile {
                file_name: files::display_name(path),
                content: files::read_text_file(path)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let input = BatchGradingInput {
        essays,
        grade_level: options.grade_level.clone(),
        rubric: read_rubric(&options.rubric)?,
        teacher_notes: options.notes.clone(),
        style_guide: options.style_guide.clone(),
    };

    let out = essay_grading::grade_batch(model, &input)
        .await
        .context("failed to grade essays")?;

    std::fs::write(output, &out.csv_content)
        .with_context(|| format!("failed to write report to {}", output.display()))?;

    println!("{:<40} {:<10}", "FILE", "GRADE");
    println!("{}", "-".repeat(52));
    for r in &out.results {
        println!("{:<40} {:<10}", r.file_name, r.grade);
    }
    println!();
    println!(
        "Graded {} essay(s). Report written to {}",
        out.results.len(),
        output.display()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use classmate_test_utils::CannedModel;

    use super::*;

    const ESSAY: &str = "The printing press changed how ideas spread across Europe, \
                         making books cheaper and literacy more common.";

    fn options(dir: &Path) -> GradeOptions {
        let rubric = dir.join("rubric.md");
        std::fs::write(&rubric, "Thesis 40%, evidence 40%, style 20%").unwrap();
        GradeOptions {
            rubric,
            grade_level: "10".into(),
            notes: None,
            style_guide: Some("Open with praise.".into()),
        }
    }

    #[tokio::test]
    async fn grade_single_file_sends_rubric_and_style() {
        let dir = tempfile::TempDir::new().unwrap();
        let essay = dir.path().join("essay.txt");
        std::fs::write(&essay, ESSAY).unwrap();
        let model = CannedModel::replying(json!({
            "grade": "A-", "feedback": "Strong", "reasoning": "Clear thesis"
        }));

        let out = run_grade(&model, &essay, &options(dir.path())).await.unwrap();
        assert_eq!(out.grade, "A-");

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Thesis 40%, evidence 40%, style 20%"));
        assert!(prompt.contains("Open with praise."));
    }

    #[tokio::test]
    async fn batch_writes_csv_in_file_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("alice.txt");
        let b = dir.path().join("bob.md");
        std::fs::write(&a, ESSAY).unwrap();
        std::fs::write(&b, ESSAY).unwrap();
        let model = CannedModel::replying(json!({
            "results": [
                { "fileName": "bob.md", "grade": "B", "feedback": "Good, \"solid\"", "reasoning": "ok" },
                { "fileName": "alice.txt", "grade": "A", "feedback": "Great", "reasoning": "ok" },
            ]
        }));
        let output = dir.path().join("grades.csv");

        let out = run_batch_grade(&model, &[a, b], &options(dir.path()), &output)
            .await
            .unwrap();
        assert_eq!(out.results.len(), 2);

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            csv,
            "fileName,grade,feedback,reasoning\n\
             alice.txt,A,Great,ok\n\
             bob.md,B,\"Good, \"\"solid\"\"\",ok"
        );
    }

    #[tokio::test]
    async fn unreadable_file_aborts_before_model_call() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("scan.docx");
        std::fs::write(&good, ESSAY).unwrap();
        std::fs::write(&bad, "binary").unwrap();
        let model = CannedModel::new();
        let output = dir.path().join("grades.csv");

        let err = run_batch_grade(&model, &[good, bad], &options(dir.path()), &output)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("only .txt and .md files are accepted"));
        assert!(model.requests().is_empty());
        assert!(!output.exists());
    }
}
