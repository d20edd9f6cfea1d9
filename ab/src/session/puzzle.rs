//! Puzzle session - one generated crossword and the user's progress on it

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Grid, GridError, GridView, MalformedPlacementError, Placement, PlacementIndex, build_answer_grid, set_cell,
};

/// Solution grid, answer overlay, placement index and reveal flag
///
/// Replaced wholesale by each generation; never merged with older state.
#[derive(Debug, Clone)]
pub struct PuzzleSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    solution: Grid,
    answer: Grid,
    placements: PlacementIndex,
    reveal: bool,
}

impl PuzzleSession {
    /// Assemble a session from layout output
    ///
    /// Fails if any placement disagrees with the grid.
    pub fn build(solution: Grid, placements: Vec<Placement>) -> Result<Self, MalformedPlacementError> {
        debug!(rows = solution.rows(), cols = solution.cols(), count = placements.len(), "PuzzleSession::build: called");
        let placements = PlacementIndex::build(&solution, placements)?;
        let answer = build_answer_grid(&solution);
        Ok(Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            solution,
            answer,
            placements,
            reveal: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn solution(&self) -> &Grid {
        &self.solution
    }

    pub fn answer(&self) -> &Grid {
        &self.answer
    }

    pub fn placements(&self) -> &PlacementIndex {
        &self.placements
    }

    pub fn reveal(&self) -> bool {
        self.reveal
    }

    pub fn set_reveal(&mut self, reveal: bool) {
        self.reveal = reveal;
    }

    /// What the grid currently shows
    pub fn view(&self) -> GridView<'_> {
        GridView::new(&self.solution, &self.answer, self.reveal)
    }

    /// Replace the overlay with one where `(row, col)` holds `value`
    pub fn edit(&mut self, row: usize, col: usize, value: &str) -> Result<(), GridError> {
        self.answer = set_cell(&self.solution, &self.answer, row, col, value)?;
        Ok(())
    }

    /// `(filled, playable)` cell counts of the overlay
    pub fn progress(&self) -> (usize, usize) {
        (self.answer.filled_count(), self.answer.playable_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, Direction, WireCell};

    fn layout() -> (Grid, Vec<Placement>) {
        let s = |c: &str| Some(c.to_string());
        let grid: Vec<Vec<WireCell>> = vec![vec![s("C"), s("A"), s("T")], vec![None, None, s("O")], vec![
            None,
            None,
            s("P"),
        ]];
        let placements = vec![
            Placement::new("CAT", 0, 0, Direction::Across, "Feline"),
            Placement::new("TOP", 0, 2, Direction::Down, "Summit"),
        ];
        (Grid::from_wire(&grid).unwrap(), placements)
    }

    #[test]
    fn test_build_creates_empty_overlay() {
        let (grid, placements) = layout();
        let puzzle = PuzzleSession::build(grid, placements).unwrap();

        assert_eq!(puzzle.answer().block_mask(), puzzle.solution().block_mask());
        assert_eq!(puzzle.progress(), (0, 5));
        assert_eq!(puzzle.placements().len(), 2);
        assert!(!puzzle.reveal());
    }

    #[test]
    fn test_build_rejects_malformed_placements() {
        let (grid, mut placements) = layout();
        placements.push(Placement::new("DOG", 2, 0, Direction::Across, "Canine"));
        assert!(PuzzleSession::build(grid, placements).is_err());
    }

    #[test]
    fn test_edit_and_reveal() {
        let (grid, placements) = layout();
        let mut puzzle = PuzzleSession::build(grid, placements).unwrap();

        puzzle.edit(0, 0, "k").unwrap();
        assert_eq!(puzzle.view().cell(0, 0), Some(Cell::Letter('K')));
        assert_eq!(puzzle.progress(), (1, 5));

        puzzle.set_reveal(true);
        assert_eq!(puzzle.view().cell(0, 0), Some(Cell::Letter('C')));

        puzzle.set_reveal(false);
        assert_eq!(puzzle.view().cell(0, 0), Some(Cell::Letter('K')));
    }

    #[test]
    fn test_edit_block_leaves_overlay_unchanged() {
        let (grid, placements) = layout();
        let mut puzzle = PuzzleSession::build(grid, placements).unwrap();
        let before = puzzle.answer().clone();

        assert!(puzzle.edit(1, 0, "A").is_err());
        assert_eq!(puzzle.answer(), &before);
    }
}
