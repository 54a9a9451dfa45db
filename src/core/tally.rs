//! Accuracy summary over stored response rows.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::{Classification, RowSchema};

/// Correct answers out of scored rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Fraction correct, `None` when nothing was scored
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Summary of a response file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub schema: Option<RowSchema>,
    pub rows: usize,
    pub sessions: usize,
    /// Full answer matches the ground truth
    pub exact: Score,
    /// Human vs AI dimension
    pub provenance: Score,
    /// Watermark dimension, over AI passages where it was asked
    pub watermark: Score,
}

/// Summarize a response file written by the flat-file sink
pub fn tally_file(path: &Path) -> Result<Tally> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open responses file: {}", path.display()))?;
    tally_reader(file)
}

/// Summarize CSV response rows from any reader
pub fn tally_reader<R: Read>(reader: R) -> Result<Tally> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let header: Vec<String> = rdr
        .headers()
        .context("Failed to read responses header")?
        .iter()
        .map(str::to_string)
        .collect();
    let schema = RowSchema::from_header(header.as_slice())
        .with_context(|| format!("Unrecognized response header: {}", header.join(",")))?;

    let mut tally = Tally {
        schema: Some(schema),
        ..Default::default()
    };
    let mut sessions = HashSet::new();

    for record in rdr.records() {
        let record = record.context("Failed to read response row")?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim();

        tally.rows += 1;
        sessions.insert(cell(0).to_string());

        let user = Classification::from_label(cell(4));
        let real = Classification::from_label(cell(5));
        let user_side = user.map(|c| c.provenance());
        tally
            .provenance
            .add(user_side.is_some() && user_side == real.map(|c| c.provenance()));

        match schema {
            RowSchema::Compact => {
                tally.exact.add(user.is_some() && user == real);
            }
            RowSchema::Padded => {
                tally.exact.add(user.is_some() && user == real);
                // Ternary: marked vs unmarked is told apart on every AI passage
                if real.is_some_and(|c| c.provenance() == Classification::Ai) {
                    tally.watermark.add(user == real);
                }
            }
            RowSchema::Split => {
                let user_mark = cell(6);
                let real_mark = cell(7);
                tally
                    .exact
                    .add(user.is_some() && user == real && user_mark == real_mark);
                if !real_mark.is_empty() && !user_mark.is_empty() {
                    tally.watermark.add(user_mark == real_mark);
                }
            }
        }
    }

    tally.sessions = sessions.len();
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tally() {
        let data = "\
session_id,timestamp,texto_id,texto,clasificacion_usuario_ia,clasificacion_real_ia,clasificacion_usuario_watermark,clasificacion_real_watermark
a,t,1,uno,Escrito por humano,Escrito por humano,,
a,t,2,dos,Escrito por IA,Escrito por IA,Escrito por IA con marca de agua,Escrito por IA sin marca de agua
b,t,3,tres,Escrito por humano,Escrito por IA,,Escrito por IA con marca de agua
";
        let tally = tally_reader(data.as_bytes()).unwrap();

        assert_eq!(tally.schema, Some(RowSchema::Split));
        assert_eq!(tally.rows, 3);
        assert_eq!(tally.sessions, 2);
        assert_eq!(tally.provenance, Score { correct: 2, total: 3 });
        assert_eq!(tally.exact, Score { correct: 1, total: 3 });
        assert_eq!(tally.watermark, Score { correct: 0, total: 1 });
    }

    #[test]
    fn test_compact_tally() {
        let data = "\
session_id,timestamp,texto_id,texto,clasificacion_usuario,clasificacion_real
a,t,1,uno,Escrito por IA,Escrito por IA
a,t,2,dos,Escrito por IA,Escrito por humano
";
        let tally = tally_reader(data.as_bytes()).unwrap();

        assert_eq!(tally.exact, Score { correct: 1, total: 2 });
        assert_eq!(tally.watermark.accuracy(), None);
        assert_eq!(tally.provenance.accuracy(), Some(0.5));
    }

    #[test]
    fn test_padded_tally_scores_all_ai_passages() {
        let data = "\
session_id,timestamp,texto_id,texto,clasificacion_usuario,clasificacion_real,clasificacion_usuario_watermark
a,t,1,uno,Escrito por IA,Escrito por IA,
a,t,2,dos,Escrito por IA,Escrito por IA con marca de agua,
b,t,3,tres,Escrito por humano,Escrito por humano,
";
        let tally = tally_reader(data.as_bytes()).unwrap();

        assert_eq!(tally.schema, Some(RowSchema::Padded));
        assert_eq!(tally.exact, Score { correct: 2, total: 3 });
        assert_eq!(tally.provenance, Score { correct: 3, total: 3 });
        assert_eq!(tally.watermark, Score { correct: 1, total: 2 });
    }

    #[test]
    fn test_unknown_header() {
        assert!(tally_reader("a,b,c\n1,2,3\n".as_bytes()).is_err());
    }
}
