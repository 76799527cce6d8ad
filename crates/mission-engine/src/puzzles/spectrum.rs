//! Spectrum decode: mark the bands carrying the periodic emission.
//! Non-blocking; the player can close it and keep working.

use std::collections::BTreeSet;

use rand::seq::index::sample;

use crate::puzzle::{Puzzle, PuzzleContext, PuzzleInput, Validation};

/// Receiver bands.
pub const BANDS: usize = 12;
/// Bands carrying the signal.
pub const SIGNAL_BANDS: usize = 4;

/// Band-selection puzzle.
#[derive(Debug, Clone)]
pub struct SpectrumPuzzle {
    signal: BTreeSet<usize>,
    marked: BTreeSet<usize>,
}

impl SpectrumPuzzle {
    /// Pick the signal bands from the context seed.
    pub fn new(ctx: &PuzzleContext) -> Self {
        let mut rng = super::rng_for(ctx);
        let signal = sample(&mut rng, BANDS, SIGNAL_BANDS).into_iter().collect();
        Self {
            signal,
            marked: BTreeSet::new(),
        }
    }

    /// Bands carrying the signal.
    pub fn signal_bands(&self) -> &BTreeSet<usize> {
        &self.signal
    }

    /// Bands the player has marked.
    pub fn marked(&self) -> &BTreeSet<usize> {
        &self.marked
    }
}

impl Puzzle for SpectrumPuzzle {
    fn blocking(&self) -> bool {
        false
    }

    fn handle_input(&mut self, input: &PuzzleInput) -> bool {
        let PuzzleInput::Toggle { index } = *input else {
            return false;
        };
        if index >= BANDS {
            return false;
        }
        if !self.marked.remove(&index) {
            self.marked.insert(index);
        }
        true
    }

    fn validate(&mut self) -> Validation {
        if self.marked == self.signal {
            return Validation::solved(
                "Pattern isolated.",
                format!("Spectrum decoded: bands {:?} repeat in phase", self.signal),
            );
        }
        let hits = self.marked.intersection(&self.signal).count();
        let spurious = self.marked.len() - hits;
        Validation::failed(format!(
            "{hits} of {SIGNAL_BANDS} signal bands marked, {spurious} spurious."
        ))
    }

    fn surface(&self) -> String {
        (0..BANDS)
            .map(|b| if self.marked.contains(&b) { '#' } else { '.' })
            .collect()
    }
}
