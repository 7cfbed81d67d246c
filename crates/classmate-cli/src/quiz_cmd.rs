//! `classmate quiz`: generate a quiz or game assessment and play it in the
//! terminal.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use classmate_core::GenerativeModel;
use classmate_core::flows::assessment::{self, AssessmentInput};
use classmate_core::quiz::{AnswerOutcome, QuizQuestion, QuizSession};

pub async fn run_quiz(model: &dyn GenerativeModel, input: &AssessmentInput) -> Result<()> {
    let out = assessment::run(model, input)
        .await
        .context("failed to create assessment")?;
    let questions = out
        .quiz
        .context("the assessment came back without a quiz")?;

    println!("Topic: {} ({})", input.topic, input.assessment_type);
    println!("Answer with the option number or its text.");
    println!();

    let mut session = QuizSession::new(questions);
    let stdin = io::stdin();
    play(&mut session, stdin.lock(), io::stdout().lock())?;
    Ok(())
}

/// Resolve a typed answer to one of the question's options.
///
/// Accepts the 1-based option number or the option text (case-insensitive).
fn pick_option<'q>(question: &'q QuizQuestion, line: &str) -> Option<&'q str> {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| question.options.get(i))
            .map(String::as_str);
    }
    question
        .options
        .iter()
        .find(|o| o.trim().eq_ignore_ascii_case(line))
        .map(String::as_str)
}

/// Play rounds until the player declines another, reading one answer per
/// line.
///
/// Stops early at end of input; unanswered questions count as wrong.
pub fn play(
    session: &mut QuizSession,
    mut input: impl BufRead,
    mut out: impl Write,
) -> io::Result<()> {
    let mut line = String::new();
    loop {
        if !play_round(session, &mut input, &mut out, &mut line)? {
            return Ok(());
        }
        write!(out, "Play again? [y/N] ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return writeln!(out);
        }
        if !matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            return Ok(());
        }
        session.restart();
        writeln!(out)?;
    }
}

/// One pass over the questions. Returns `false` if input ran out first.
fn play_round(
    session: &mut QuizSession,
    input: &mut impl BufRead,
    out: &mut impl Write,
    line: &mut String,
) -> io::Result<bool> {
    while let Some(question) = session.current_question().cloned() {
        writeln!(
            out,
            "Question {}/{}: {}",
            session.position(),
            session.total(),
            question.question
        )?;
        for (i, option) in question.options.iter().enumerate() {
            writeln!(out, "  {}) {option}", i + 1)?;
        }

        let choice = loop {
            write!(out, "> ")?;
            out.flush()?;
            line.clear();
            if input.read_line(line)? == 0 {
                writeln!(out)?;
                writeln!(out, "Quiz ended early.")?;
                write_score(session, out)?;
                return Ok(false);
            }
            match pick_option(&question, line) {
                Some(choice) => break choice.to_string(),
                None => writeln!(
                    out,
                    "Please answer with 1-{} or the text of an option.",
                    question.options.len()
                )?,
            }
        };

        match session.answer(&choice) {
            Some(AnswerOutcome::Correct) => writeln!(out, "Correct!")?,
            Some(AnswerOutcome::Incorrect { correct_answer }) => {
                writeln!(out, "Incorrect. The answer was: {correct_answer}")?
            }
            None => break,
        }
        writeln!(out)?;
    }
    write_score(session, out)?;
    Ok(true)
}

fn write_score(session: &QuizSession, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Score: {}/{} ({}%)",
        session.score(),
        session.total(),
        session.percent()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, answer: &str) -> QuizQuestion {
        QuizQuestion {
            question: text.into(),
            options: vec!["Red".into(), "Green".into(), "Blue".into(), "Yellow".into()],
            answer: answer.into(),
        }
    }

    fn quiz() -> Vec<QuizQuestion> {
        vec![
            question("Colour of grass?", "Green"),
            question("Colour of the sky?", "Blue"),
            question("Colour of a banana?", "Yellow"),
            question("Colour of a fire truck?", "Red"),
            question("Colour of the sea?", "Blue"),
        ]
    }

    fn run(answers: &str) -> (QuizSession, String) {
        let mut session = QuizSession::new(quiz());
        let mut out = Vec::new();
        play(&mut session, answers.as_bytes(), &mut out).unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn number_and_text_answers() {
        let q = question("?", "Green");
        assert_eq!(pick_option(&q, "2\n"), Some("Green"));
        assert_eq!(pick_option(&q, "  blue "), Some("Blue"));
        assert_eq!(pick_option(&q, "0"), None);
        assert_eq!(pick_option(&q, "5"), None);
        assert_eq!(pick_option(&q, "purple"), None);
    }

    #[test]
    fn full_run_reports_percent() {
        let (session, out) = run("2\nBlue\n1\n1\n3\n");
        assert!(session.is_finished());
        assert_eq!(session.score(), 4);
        assert!(out.contains("Incorrect. The answer was: Yellow"));
        assert!(out.contains("Score: 4/5 (80%)\nPlay again? [y/N] "));
    }

    #[test]
    fn invalid_answer_reprompts() {
        let (session, out) = run("9\ngreen\n3\n4\n1\n3\n");
        assert_eq!(session.score(), 5);
        assert!(out.contains("Please answer with 1-4 or the text of an option."));
        assert!(out.contains("Score: 5/5 (100%)"));
    }

    #[test]
    fn end_of_input_stops_early() {
        let (session, out) = run("2\n");
        assert!(!session.is_finished());
        assert!(out.contains("Quiz ended early."));
        assert!(out.ends_with("Score: 1/5 (20%)\n"));
        assert!(!out.contains("Play again?"));
    }

    #[test]
    fn play_again_restarts_from_first_question() {
        let (session, out) = run("1\n1\n1\n1\n1\ny\n2\n3\n4\n1\n3\nn\n");
        assert!(session.is_finished());
        assert_eq!(session.score(), 5);
        assert_eq!(out.matches("Question 1/5: Colour of grass?").count(), 2);
        assert!(out.contains("Score: 1/5 (20%)"));
        assert!(out.contains("Score: 5/5 (100%)"));
        assert_eq!(out.matches("Play again? [y/N] ").count(), 2);
    }

    #[test]
    fn anything_but_yes_ends_play() {
        let (session, out) = run("2\n3\n4\n1\n3\nmaybe\n");
        assert_eq!(session.score(), 5);
        assert_eq!(out.matches("Question 1/5").count(), 1);
    }
}
