//! Flat File Sink Integration Tests
//!
//! Tests for the append-only CSV backend through the sink trait.

use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use watermark_survey::adapters::{FlatFileSink, ResponseSink};
use watermark_survey::core::tally_file;
use watermark_survey::domain::{
    Answer, Batch, GroundTruth, QuestionMode, Response, RowSchema, WatermarkChoice,
};

fn batch(mode: QuestionMode, schema: RowSchema) -> Batch {
    let session_id = Uuid::new_v4();
    Batch {
        mode,
        schema,
        responses: vec![
            Response {
                session_id,
                timestamp: Utc::now(),
                passage_id: "10".to_string(),
                text: "Primer texto".to_string(),
                answer: Answer::Human,
                truth: GroundTruth::Human,
            },
            Response {
                session_id,
                timestamp: Utc::now(),
                passage_id: "11".to_string(),
                text: "Segundo texto\ncon salto de línea".to_string(),
                answer: Answer::Ai {
                    watermark: Some(WatermarkChoice::WithWatermark),
                },
                truth: GroundTruth::AiWithWatermark,
            },
        ],
    }
}

#[tokio::test]
async fn test_appends_accumulate_under_one_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);

    for _ in 0..3 {
        sink.append(&batch(QuestionMode::TwoStep, RowSchema::Split))
            .await
            .unwrap();
    }

    let tally = tally_file(&path).unwrap();
    assert_eq!(tally.schema, Some(RowSchema::Split));
    assert_eq!(tally.rows, 6);
    assert_eq!(tally.sessions, 3);
    assert_eq!(tally.exact.correct, 6);
}

#[tokio::test]
async fn test_retry_of_same_batch_is_not_duplicated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);
    let b = batch(QuestionMode::Binary, RowSchema::Compact);

    sink.append(&b).await.unwrap();
    sink.append(&b).await.unwrap();

    let tally = tally_file(&path).unwrap();
    assert_eq!(tally.rows, 2);
}

#[tokio::test]
async fn test_padded_layout_has_seven_columns() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);

    sink.append(&batch(QuestionMode::Ternary, RowSchema::Padded))
        .await
        .unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    assert_eq!(rdr.headers().unwrap().len(), 7);
    for record in rdr.records() {
        let record = record.unwrap();
        assert_eq!(record.len(), 7);
        assert_eq!(&record[6], "");
    }
}

#[tokio::test]
async fn test_empty_batch_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);

    let empty = Batch {
        mode: QuestionMode::Binary,
        schema: RowSchema::Compact,
        responses: Vec::new(),
    };
    sink.append(&empty).await.unwrap();

    assert!(!path.exists());
}

#[tokio::test]
async fn test_retry_after_interrupted_write_stores_every_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);
    let full = batch(QuestionMode::TwoStep, RowSchema::Split);

    // Leave only the header and first row on disk
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(full.header()).unwrap();
    wtr.write_record(&full.rows()[0]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    sink.append(&full).await.unwrap();

    let tally = tally_file(&path).unwrap();
    assert_eq!(tally.rows, 2);
    assert_eq!(tally.sessions, 1);
}

#[tokio::test]
async fn test_layout_change_is_refused() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("respuestas.csv");
    let sink = FlatFileSink::new(&path);

    sink.append(&batch(QuestionMode::TwoStep, RowSchema::Split))
        .await
        .unwrap();
    assert!(sink
        .append(&batch(QuestionMode::Binary, RowSchema::Compact))
        .await
        .is_err());

    // Every stored row still matches the header width
    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let records: Vec<_> = rdr.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 2);
}
