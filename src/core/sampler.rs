//! Random selection of the passages a session shows.

use rand::seq::index;
use rand::Rng;
use tracing::debug;

use crate::corpus::Corpus;
use crate::domain::Passage;

use super::session::SessionError;

/// Minimum number of valid passages a corpus must hold to start a session
pub const MIN_CORPUS_SIZE: usize = 3;

/// Draws a session's passages once and remembers the draw
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    drawn: Option<Vec<Passage>>,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `k` distinct passages uniformly without replacement.
    ///
    /// Only the first successful call samples; later calls return the same
    /// passages in the same order regardless of their arguments.
    pub fn draw<R: Rng + ?Sized>(
        &mut self,
        corpus: &Corpus,
        k: usize,
        rng: &mut R,
    ) -> Result<&[Passage], SessionError> {
        if self.drawn.is_none() {
            let required = k.max(MIN_CORPUS_SIZE);
            if corpus.len() < required {
                return Err(SessionError::CorpusTooSmall {
                    available: corpus.len(),
                    required,
                });
            }

            let picked: Vec<Passage> = index::sample(rng, corpus.len(), k)
                .into_iter()
                .map(|i| corpus.passages()[i].clone())
                .collect();
            debug!(
                ids = ?picked.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
                "Sampled passages"
            );
            self.drawn = Some(picked);
        }

        Ok(self.drawn.as_deref().unwrap_or_default())
    }

    /// Passages from the first draw, if any
    pub fn drawn(&self) -> Option<&[Passage]> {
        self.drawn.as_deref()
    }

    /// Take the drawn passages out of the sampler
    pub fn into_drawn(self) -> Option<Vec<Passage>> {
        self.drawn
    }
}
