//! High-gain antenna alignment: three dials, each within tolerance of a
//! hidden carrier peak. Blocking.

use mission_core::state::TechVar;
use rand::Rng;

use crate::puzzle::{Puzzle, PuzzleContext, PuzzleInput, Validation};

/// Dial names, in index order.
pub const DIALS: [&str; 3] = ["azimuth", "elevation", "polarization"];

/// Exclusive upper bound of each dial, in degrees.
const RANGES: [i32; 3] = [360, 90, 180];

/// Blocking three-dial alignment puzzle.
#[derive(Debug, Clone)]
pub struct AntennaPuzzle {
    targets: [i32; 3],
    dials: [i32; 3],
    tolerance: i32,
}

impl AntennaPuzzle {
    /// Lay out targets from the context seed. Tolerance widens with the
    /// probe's antenna alignment reading: 2 degrees plus one per 10%.
    pub fn new(ctx: &PuzzleContext) -> Self {
        let mut rng = super::rng_for(ctx);
        let targets = RANGES.map(|range| rng.gen_range(0..range));
        let dials = RANGES.map(|range| rng.gen_range(0..range));
        let tolerance = 2 + i32::from(ctx.tech.get(TechVar::AntennaAlignment)) / 10;
        Self {
            targets,
            dials,
            tolerance,
        }
    }

    /// Hidden targets.
    pub fn targets(&self) -> [i32; 3] {
        self.targets
    }

    /// Current dial readings.
    pub fn dials(&self) -> [i32; 3] {
        self.dials
    }

    /// Accepted error per dial, in degrees.
    pub fn tolerance(&self) -> i32 {
        self.tolerance
    }

    /// Error of dial `i`. Azimuth wraps around.
    fn error(&self, i: usize) -> i32 {
        let diff = (self.dials[i] - self.targets[i]).abs();
        if i == 0 {
            diff.min(RANGES[0] - diff)
        } else {
            diff
        }
    }

    fn locked(&self) -> usize {
        (0..DIALS.len())
            .filter(|&i| self.error(i) <= self.tolerance)
            .count()
    }
}

impl Puzzle for AntennaPuzzle {
    fn blocking(&self) -> bool {
        true
    }

    fn handle_input(&mut self, input: &PuzzleInput) -> bool {
        let PuzzleInput::SetDial { dial, value } = *input else {
            return false;
        };
        let Some(&range) = RANGES.get(dial) else {
            return false;
        };
        self.dials[dial] = if dial == 0 {
            value.rem_euclid(range)
        } else {
            value.clamp(0, range - 1)
        };
        true
    }

    fn validate(&mut self) -> Validation {
        let locked = self.locked();
        if locked == DIALS.len() {
            Validation::solved(
                "Carrier peak locked.",
                format!(
                    "Antenna locked at az {} el {} pol {}",
                    self.dials[0], self.dials[1], self.dials[2]
                ),
            )
        } else {
            Validation::failed(format!("{locked} of 3 dials on peak."))
        }
    }

    fn surface(&self) -> String {
        DIALS
            .iter()
            .zip(self.dials)
            .map(|(name, value)| format!("{name}={value:03}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
