//! Survey Flow Integration Tests
//!
//! Drives the terminal survey with scripted input against a real
//! CSV file sink in a temp directory.

use std::io::Cursor;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use watermark_survey::adapters::{FlatFileSink, ResponseSink};
use watermark_survey::cli::{Survey, SurveyEnd};
use watermark_survey::core::{tally_file, Session, Variant};
use watermark_survey::corpus::read_corpus;
use watermark_survey::domain::QuestionMode;

const CORPUS: &str = "\
id|text|label
1|El sol salía lentamente sobre el valle.|Humanos
2|\"La ciudad | dormía bajo la lluvia.\"|IA_Boost_v2
3|Los datos muestran una tendencia clara.|IA_plain
4|   |Humanos
5|Mi abuela cocinaba los domingos.|Humanos
";

fn session(mode: QuestionMode) -> Session {
    let corpus = read_corpus(CORPUS.as_bytes(), b'|').unwrap();
    assert_eq!(corpus.len(), 4);

    let mut rng = StdRng::seed_from_u64(11);
    Session::start_with_rng(&corpus, Variant::new(mode, 2), &mut rng).unwrap()
}

async fn run(session: &mut Session, sink: &dyn ResponseSink, script: &str) -> (SurveyEnd, String) {
    let mut output = Vec::new();
    let end = Survey::new(Cursor::new(script.to_string()), &mut output)
        .run(session, sink)
        .await
        .unwrap();
    (end, String::from_utf8(output).unwrap())
}

#[tokio::test]
async fn test_two_step_survey_is_stored() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);
    let mut session = session(QuestionMode::TwoStep);

    // Text 1: human. Text 2: AI, with watermark. Then submit.
    let (end, output) = run(&mut session, &sink, "1\n2\n1\nenviar\n").await;

    assert_eq!(end, SurveyEnd::Submitted);
    assert!(output.contains("Tus respuestas han sido registradas"));
    assert!(session.is_submitted());

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.starts_with("session_id,timestamp,texto_id,texto,clasificacion_usuario_ia"));
    assert!(content.contains(&session.id().to_string()));

    let tally = tally_file(&path).unwrap();
    assert_eq!(tally.rows, 2);
    assert_eq!(tally.sessions, 1);
}

#[tokio::test]
async fn test_skipped_question_blocks_submit() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);
    let mut session = session(QuestionMode::Binary);

    // Skip text 2, try to submit, then answer it and submit again
    let (end, output) = run(&mut session, &sink, "1\n\nenviar\n2\n2\nenviar\n").await;

    assert_eq!(end, SurveyEnd::Submitted);
    assert!(output.contains("Falta: 2"));
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
}

#[tokio::test]
async fn test_invalid_option_is_reprompted() {
    let temp = TempDir::new().unwrap();
    let sink = FlatFileSink::new(temp.path().join("respuestas.csv"));
    let mut session = session(QuestionMode::Ternary);

    let (end, output) = run(&mut session, &sink, "7\n3\n1\nenviar\n").await;

    assert_eq!(end, SurveyEnd::Submitted);
    assert!(output.contains("Elige un número entre 1 y 3."));
}

#[tokio::test]
async fn test_end_of_input_abandons_without_storing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);
    let mut session = session(QuestionMode::Binary);

    let (end, _) = run(&mut session, &sink, "1\n").await;

    assert_eq!(end, SurveyEnd::Abandoned);
    assert!(!session.is_submitted());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_unwritable_store_reports_failure() {
    let temp = TempDir::new().unwrap();
    // A directory where the file should be makes the open fail
    let path = temp.path().join("respuestas.csv");
    std::fs::create_dir_all(&path).unwrap();
    let sink = FlatFileSink::new(&path);
    let mut session = session(QuestionMode::Binary);

    let (end, output) = run(&mut session, &sink, "1\n1\nenviar\nsalir\n").await;

    assert_eq!(end, SurveyEnd::Abandoned);
    assert!(output.contains("No se pudieron guardar tus respuestas"));
    assert!(!session.is_submitted());
}
