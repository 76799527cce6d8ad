//! Built-in mini-games.
//!
//! Each puzzle derives its layout from [`PuzzleContext::seed`] through a
//! `Pcg64` generator, so the same seed always produces the same targets.

mod antenna;
mod spectrum;
mod triangulation;

pub use antenna::AntennaPuzzle;
pub use spectrum::SpectrumPuzzle;
pub use triangulation::TriangulationPuzzle;

use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::puzzle::{Puzzle, PuzzleContext};

/// Generator for a puzzle's layout.
pub(crate) fn rng_for(ctx: &PuzzleContext) -> Pcg64 {
    Pcg64::seed_from_u64(ctx.seed)
}

/// Constructor for [`AntennaPuzzle`].
pub fn antenna(ctx: &PuzzleContext) -> Box<dyn Puzzle> {
    Box::new(AntennaPuzzle::new(ctx))
}

/// Constructor for [`SpectrumPuzzle`].
pub fn spectrum(ctx: &PuzzleContext) -> Box<dyn Puzzle> {
    Box::new(SpectrumPuzzle::new(ctx))
}

/// Constructor for [`TriangulationPuzzle`].
pub fn triangulation(ctx: &PuzzleContext) -> Box<dyn Puzzle> {
    Box::new(TriangulationPuzzle::new(ctx))
}
