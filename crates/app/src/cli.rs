//! Line-oriented terminal front end for a running quiz.

use quiz_core::model::{Answer, OptionId, Question, QuestionBody};
use services::{ExpectedAnswer, ReviewItem, SessionCommand};

pub const HELP: &str = "\
commands:
  next | prev | jump <n>       move between questions
  pick <option-id>             answer a choice or fill-in-blank question
  match <left-id> <text>       pair a left item with a right-hand text
  write <text>                 answer a free-response question
  clear                        remove the answer to the current question
  pause | resume               stop or restart the countdown
  finish                       submit now
  help                         show this list";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(SessionCommand),
    Help,
    Empty,
}

/// Turns an input line into a session command.
///
/// Answers target the current question, which the driver resolves when it
/// applies the command.
pub fn parse_line(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word {
        "" => return Ok(Input::Empty),
        "help" | "?" => return Ok(Input::Help),
        "next" | "n" => SessionCommand::Next,
        "prev" | "p" => SessionCommand::Previous,
        "finish" => SessionCommand::Finish,
        "pause" => SessionCommand::Pause,
        "resume" => SessionCommand::Resume,
        "clear" => SessionCommand::ClearCurrent,
        "jump" => {
            let n: usize = rest
                .parse()
                .map_err(|_| format!("jump expects a question number, got {rest:?}"))?;
            if n == 0 {
                return Err("questions are numbered from 1".into());
            }
            SessionCommand::JumpTo(n - 1)
        }
        "pick" => {
            let id: OptionId = rest
                .parse()
                .map_err(|_| format!("pick expects an option id, got {rest:?}"))?;
            SessionCommand::AnswerCurrent(Answer::Choice(id))
        }
        "match" => {
            let (left, text) = rest
                .split_once(char::is_whitespace)
                .ok_or("match expects <left-id> <text>")?;
            let left: OptionId = left
                .parse()
                .map_err(|_| format!("match expects a numeric left id, got {left:?}"))?;
            SessionCommand::MatchCurrent {
                left,
                right: text.trim().to_owned(),
            }
        }
        "write" => {
            if rest.is_empty() {
                return Err("write expects some text".into());
            }
            SessionCommand::AnswerCurrent(Answer::Text(rest.to_owned()))
        }
        other => return Err(format!("unknown command {other:?}, type help")),
    };
    Ok(Input::Command(command))
}

/// Multi-line rendering of a question for the terminal.
pub fn render_question(index: usize, total: usize, question: &Question, choices: &[String]) -> String {
    let mut out = format!(
        "\n[{}/{}] {} ({}, weight {})\n",
        index + 1,
        total,
        question.text(),
        question.kind(),
        question.weight()
    );
    match question.body() {
        QuestionBody::SingleChoice { options } | QuestionBody::FillBlank { options } => {
            for option in options {
                out.push_str(&format!("  {}) {}\n", option.id, option.text));
            }
        }
        QuestionBody::Matching { pairs } => {
            for pair in pairs {
                out.push_str(&format!("  {}) {}\n", pair.left_id, pair.left_text));
            }
            out.push_str("  choices:\n");
            for choice in choices {
                out.push_str(&format!("    - {choice}\n"));
            }
        }
        QuestionBody::FreeResponse { .. } => out.push_str("  (answer with: write <text>)\n"),
    }
    out
}

pub fn render_review(item: &ReviewItem) -> String {
    let verdict = if item.needs_grading() {
        "needs grading"
    } else if item.outcome.is_correct {
        "correct"
    } else {
        "wrong"
    };
    let mut out = format!("- {} [{verdict}]\n", item.prompt);
    match &item.expected {
        Some(ExpectedAnswer::Option { text, .. }) => {
            out.push_str(&format!("    expected: {text}\n"));
        }
        Some(ExpectedAnswer::Pairs { pairs }) => {
            for (left, right) in pairs {
                out.push_str(&format!("    expected: {left} -> {right}\n"));
            }
        }
        Some(ExpectedAnswer::ModelAnswer { text }) => {
            out.push_str(&format!("    model answer: {text}\n"));
        }
        None => {}
    }
    if let Some(explanation) = &item.explanation {
        out.push_str(&format!("    {explanation}\n"));
    }
    out
}
