use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

use quiz_core::model::{Question, QuestionId, QuizSettings, UserId};
use services::{
    Clock, PersistOutcome, QuizLoopService, QuizSession, ResultHistoryService, SessionDriver,
    SessionError, SessionEvent,
};
use storage::repository::{PersistContext, QuestionBank, Storage};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod args;
mod cli;
mod seed;

use args::{Args, Command, prepare_sqlite_file, print_usage};
use cli::{HELP, Input, parse_line, render_question, render_review};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: start a quiz when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let settings = match parsed.duration_secs {
        Some(secs) => QuizSettings::default().with_duration_secs(secs)?,
        None => QuizSettings::default(),
    };

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    tracing::debug!(db = %parsed.db_url, "storage ready");

    match cmd {
        Command::Run => run_quiz(&storage, &parsed, settings).await,
        Command::Seed => seed_lesson(storage.questions.as_ref(), &parsed).await,
        Command::History => show_history(&storage, &parsed, settings).await,
    }
}

async fn seed_lesson(
    bank: &dyn QuestionBank,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let questions = seed::sample_questions()?;
    for (position, question) in (0u32..).zip(&questions) {
        bank.upsert_question(args.lesson_id, args.week, position, question)
            .await?;
    }
    println!(
        "seeded {} questions into lesson {} week {}",
        questions.len(),
        args.lesson_id,
        args.week
    );
    Ok(())
}

async fn show_history(
    storage: &Storage,
    args: &Args,
    settings: QuizSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(user_id) = args.user_id else {
        eprintln!("history needs --user <id> or QUIZ_USER_ID");
        return Ok(());
    };
    let history =
        ResultHistoryService::new(Arc::clone(&storage.history)).with_settings(&settings);
    let items = history.list_recent(user_id).await?;
    if items.is_empty() {
        println!("no results for user {user_id}");
    }
    for item in items {
        let origin = match (item.lesson_id, item.week) {
            (Some(lesson), Some(week)) => format!("lesson {lesson} week {week}"),
            _ => "ad hoc".to_owned(),
        };
        println!(
            "#{} {} {origin}: {}% ({}/{} points, {} ungraded, {})",
            item.id,
            item.finished_at.format("%Y-%m-%d %H:%M"),
            item.percentage,
            item.earned_score,
            item.possible_score,
            item.ungraded,
            item.reason
        );
    }
    Ok(())
}

async fn run_quiz(
    storage: &Storage,
    args: &Args,
    settings: QuizSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = QuizLoopService::new(
        Clock::default_clock(),
        Arc::clone(&storage.questions),
        Arc::clone(&storage.results),
    )
    .with_settings(settings);

    let mut session = match service.start_session(args.lesson_id, args.week).await {
        Ok(session) => session,
        Err(SessionError::EmptyQuestionSet) => {
            eprintln!(
                "no quiz for lesson {} week {}; try `quiz seed` first",
                args.lesson_id, args.week
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let questions: Vec<Question> = session.questions().to_vec();
    let choices: HashMap<QuestionId, Vec<String>> = questions
        .iter()
        .filter_map(|q| {
            session
                .matching_choices(q.id())
                .map(|c| (q.id(), c.to_vec()))
        })
        .collect();

    println!(
        "{} questions, {} seconds. Type help for commands.",
        questions.len(),
        session.remaining_secs()
    );
    print_question(&questions, &choices, 0);

    let (tx, rx) = mpsc::channel(16);
    spawn_input_reader(tx);

    SessionDriver::default()
        .run(&mut session, rx, |event| match event {
            SessionEvent::Moved { index } => print_question(&questions, &choices, index),
            SessionEvent::Answered { .. } => println!("saved"),
            SessionEvent::Cleared { .. } => println!("cleared"),
            SessionEvent::Tick { remaining } => {
                if remaining % 60 == 0 || remaining <= 10 {
                    println!("{remaining}s left");
                }
            }
            SessionEvent::Paused => println!("paused"),
            SessionEvent::Resumed => println!("resumed"),
            SessionEvent::Rejected { reason } => println!("{reason}"),
            SessionEvent::FinishFailed { reason } => {
                eprintln!("time is up, scoring failed: {reason}");
            }
            SessionEvent::Finished(_) => {}
        })
        .await?;

    // stdin closed before the end
    if !session.is_finished() {
        session.finish_now()?;
    }
    print_summary(&session);

    let context = args
        .user_id
        .map_or_else(PersistContext::anonymous, PersistContext::for_user);
    match service.deliver(&mut session, &context).await {
        Some(PersistOutcome::Persisted { id }) => println!("saved as result #{id}"),
        Some(PersistOutcome::Skipped) => println!("not saved: run with --user to keep results"),
        Some(PersistOutcome::Failed { reason }) => eprintln!("could not save result: {reason}"),
        None => {}
    }
    Ok(())
}

fn print_question(questions: &[Question], choices: &HashMap<QuestionId, Vec<String>>, index: usize) {
    if let Some(question) = questions.get(index) {
        let shuffled = choices.get(&question.id()).map_or(&[][..], Vec::as_slice);
        print!("{}", render_question(index, questions.len(), question, shuffled));
    }
}

fn print_summary(session: &QuizSession) {
    let Some(result) = session.result() else {
        return;
    };
    if let Some(reason) = session.finish_reason() {
        println!("\nfinished ({reason})");
    }
    println!(
        "score: {}/{} ({}%), correct {}, wrong {}, ungraded {}",
        result.earned_score(),
        result.possible_score(),
        result.percentage(),
        result.correct_count(),
        result.wrong_count(),
        result.ungraded_count()
    );
    let unanswered = session.progress().unanswered();
    if unanswered > 0 {
        println!("{unanswered} left unanswered");
    }
    for item in session.review().unwrap_or_default() {
        print!("{}", render_review(&item));
    }
}

/// Reads stdin on a plain thread; a blocking read must not hold up runtime shutdown.
fn spawn_input_reader(tx: mpsc::Sender<services::SessionCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Ok(Input::Command(command)) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(Input::Help) => println!("{HELP}"),
                Ok(Input::Empty) => {}
                Err(message) => println!("{message}"),
            }
        }
    });
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
