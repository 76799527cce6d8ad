//! Origin triangulation: pick the grid cell where the bearings cross.
//! Blocking. A wrong guess reports how far off it was.

use rand::Rng;

use crate::puzzle::{Puzzle, PuzzleContext, PuzzleInput, Validation};

/// Grid side length.
pub const GRID: usize = 8;

/// Grid-selection puzzle.
#[derive(Debug, Clone)]
pub struct TriangulationPuzzle {
    origin: (usize, usize),
    selected: Option<(usize, usize)>,
}

impl TriangulationPuzzle {
    /// Place the origin from the context seed.
    pub fn new(ctx: &PuzzleContext) -> Self {
        let mut rng = super::rng_for(ctx);
        let origin = (rng.gen_range(0..GRID), rng.gen_range(0..GRID));
        Self {
            origin,
            selected: None,
        }
    }

    /// Hidden origin cell.
    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    /// Currently selected cell.
    pub fn selected(&self) -> Option<(usize, usize)> {
        self.selected
    }
}

impl Puzzle for TriangulationPuzzle {
    fn blocking(&self) -> bool {
        true
    }

    fn handle_input(&mut self, input: &PuzzleInput) -> bool {
        let PuzzleInput::Select { row, col } = *input else {
            return false;
        };
        if row >= GRID || col >= GRID {
            return false;
        }
        self.selected = Some((row, col));
        true
    }

    fn validate(&mut self) -> Validation {
        let Some((row, col)) = self.selected else {
            return Validation::failed("Select a cell first.");
        };
        if (row, col) == self.origin {
            return Validation::solved(
                "Bearings converge.",
                format!("Origin fixed at grid {}{}", (b'A' + row as u8) as char, col + 1),
            );
        }
        let distance = row.abs_diff(self.origin.0) + col.abs_diff(self.origin.1);
        Validation::failed(format!("Bearings miss by {distance} cells."))
    }

    fn surface(&self) -> String {
        (0..GRID)
            .map(|r| {
                (0..GRID)
                    .map(|c| if self.selected == Some((r, c)) { 'X' } else { '.' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
