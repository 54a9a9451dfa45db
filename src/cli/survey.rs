//! Terminal front-end for one survey session.
//!
//! Shows each sampled passage followed by its question(s), then lets the
//! participant revise answers or submit. Input and output are generic so
//! the loop can be driven from tests.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::adapters::ResponseSink;
use crate::core::{Session, SessionError, SubmitOutcome};
use crate::domain::{Classification, QuestionMode, WatermarkChoice};

/// How a survey run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyEnd {
    /// Responses were stored
    Submitted,
    /// The participant left (or input ended) before submitting
    Abandoned,
}

const PRIMARY_QUESTION: &str = "¿Quién crees que ha escrito este texto?";
const SECONDARY_QUESTION: &str = "Clasificación de la marca de agua:";
const SECONDARY_OPTIONS: [WatermarkChoice; 2] =
    [WatermarkChoice::WithWatermark, WatermarkChoice::WithoutWatermark];

/// Prompt loop over a line-oriented input and an output
pub struct Survey<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Survey<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Run the session until it is submitted or abandoned
    pub async fn run(&mut self, session: &mut Session, sink: &dyn ResponseSink) -> Result<SurveyEnd> {
        self.intro(session)?;

        for index in 0..session.passages().len() {
            if !self.ask(session, index)? {
                return Ok(SurveyEnd::Abandoned);
            }
        }

        loop {
            writeln!(
                self.output,
                "\nEscribe 'enviar' para enviar tus respuestas, el número de un texto para cambiar su respuesta, o 'salir'."
            )?;
            let Some(line) = self.read_line()? else {
                return Ok(SurveyEnd::Abandoned);
            };

            match line.as_str() {
                "enviar" => match session.submit(sink).await {
                    Ok(SubmitOutcome::Submitted { .. }) => {
                        writeln!(self.output, "✅ ¡Gracias! Tus respuestas han sido registradas.")?;
                        writeln!(self.output, "🎉 Has completado la encuesta. Gracias por tu participación.")?;
                        return Ok(SurveyEnd::Submitted);
                    }
                    Ok(SubmitOutcome::AlreadySubmitted) => {
                        writeln!(self.output, "Ya has enviado tus respuestas en esta sesión.")?;
                        return Ok(SurveyEnd::Submitted);
                    }
                    Err(SessionError::IncompleteSubmission { unanswered }) => {
                        let pending: Vec<String> =
                            unanswered.iter().map(|i| (i + 1).to_string()).collect();
                        writeln!(
                            self.output,
                            "❗ Por favor, responde a todas las preguntas de cada texto antes de enviar. Falta: {}",
                            pending.join(", ")
                        )?;
                    }
                    Err(SessionError::Persistence(e)) => {
                        writeln!(
                            self.output,
                            "⚠️ No se pudieron guardar tus respuestas ({:#}). Escribe 'enviar' para reintentar.",
                            e
                        )?;
                    }
                    Err(e) => return Err(e.into()),
                },
                "salir" => return Ok(SurveyEnd::Abandoned),
                other => match other.parse::<usize>() {
                    Ok(n) if (1..=session.passages().len()).contains(&n) => {
                        if !self.ask(session, n - 1)? {
                            return Ok(SurveyEnd::Abandoned);
                        }
                    }
                    _ => writeln!(self.output, "Opción no reconocida: {}", other)?,
                },
            }
        }
    }

    fn intro(&mut self, session: &Session) -> Result<()> {
        let count = session.passages().len();
        writeln!(self.output, "📝 Clasifica los textos: ¿Humano o IA con marca de agua?\n")?;
        writeln!(
            self.output,
            "Este formulario forma parte de un experimento académico sobre la detección de textos generados por inteligencia artificial (IA)."
        )?;
        match session.variant().mode {
            QuestionMode::TwoStep => writeln!(
                self.output,
                "Se te presentarán {} textos. Indica quién crees que escribió cada uno y, si crees que fue una IA, si lleva marca de agua.",
                count
            )?,
            _ => writeln!(
                self.output,
                "Se te presentarán {} textos. Indica quién crees que escribió cada uno.",
                count
            )?,
        }
        writeln!(
            self.output,
            "Deja una pregunta en blanco para responderla más tarde.\n⚠️ Solo puedes enviar una respuesta por sesión. ¡Gracias por participar!"
        )?;
        Ok(())
    }

    /// Ask the question(s) for one passage. Returns false when input ended.
    fn ask(&mut self, session: &mut Session, index: usize) -> Result<bool> {
        let mode = session.variant().mode;
        let text = session.passages()[index].text.clone();
        writeln!(self.output, "\n### Texto {}\n", index + 1)?;
        for line in text.lines() {
            writeln!(self.output, "    {}", line)?;
        }

        let options = mode.primary_options();
        let labels: Vec<&str> = options.iter().map(Classification::label).collect();
        match self.choose(PRIMARY_QUESTION, &labels)? {
            Choice::Eof => return Ok(false),
            Choice::Skip => return Ok(true),
            Choice::Picked(i) => session.record_primary(index, options[i])?,
        }

        let needs_secondary = mode.has_secondary()
            && session.answer(index).map(|a| a.primary()) == Some(Classification::Ai);
        if needs_secondary {
            let labels: Vec<&str> = SECONDARY_OPTIONS
                .iter()
                .map(|c| c.classification().label())
                .collect();
            match self.choose(SECONDARY_QUESTION, &labels)? {
                Choice::Eof => return Ok(false),
                Choice::Skip => {}
                Choice::Picked(i) => session.record_secondary(index, SECONDARY_OPTIONS[i])?,
            }
        }

        Ok(true)
    }

    fn choose(&mut self, question: &str, labels: &[&str]) -> Result<Choice> {
        loop {
            writeln!(self.output, "{}", question)?;
            for (i, label) in labels.iter().enumerate() {
                writeln!(self.output, "  {}) {}", i + 1, label)?;
            }
            write!(self.output, "> ")?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                return Ok(Choice::Eof);
            };
            if line.is_empty() {
                return Ok(Choice::Skip);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=labels.len()).contains(&n) => return Ok(Choice::Picked(n - 1)),
                _ => writeln!(self.output, "Elige un número entre 1 y {}.", labels.len())?,
            }
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        Ok((read > 0).then(|| line.trim().to_lowercase()))
    }
}

enum Choice {
    Picked(usize),
    Skip,
    Eof,
}
