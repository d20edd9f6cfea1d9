//! Crossword grid model
//!
//! The solution grid is fixed once generated. The user's answers live in a
//! separate overlay grid of identical shape, where every playable cell starts
//! out `Empty` and blocks are copied as-is. Edits never mutate a grid in
//! place: [`set_cell`] returns a new overlay and the caller swaps it in.

use thiserror::Error;
use tracing::debug;

use super::placement::Direction;

/// Tokens the layout service uses for non-playable cells (besides `null`)
pub const BLOCK_TOKENS: &[&str] = &["", "#", "##", "⬛⬛"];

/// One grid cell as it appears on the wire
pub type WireCell = Option<String>;

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Playable cell holding an uppercase letter
    Letter(char),
    /// Non-playable cell
    Block,
    /// Playable cell the user has not filled (overlay grids only)
    Empty,
}

impl Cell {
    pub fn is_block(self) -> bool {
        matches!(self, Cell::Block)
    }

    pub fn letter(self) -> Option<char> {
        match self {
            Cell::Letter(c) => Some(c),
            _ => None,
        }
    }
}

/// Errors from building or editing a grid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Cell ({row}, {col}) is a block")]
    BlockCell { row: usize, col: usize },

    #[error("Invalid cell value {value:?}: expected a single letter or an empty string")]
    InvalidValue { value: String },

    #[error("Row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("Unrecognized cell token {token:?} at ({row}, {col})")]
    UnknownToken { row: usize, col: usize, token: String },

    #[error("Grid has no cells")]
    Empty,

    #[error("Overlay is {found_rows}x{found_cols}, solution is {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}

/// Uppercase a single alphabetic character, rejecting anything that does not
/// map to exactly one uppercase character
fn canonical_letter(c: char) -> Option<char> {
    if !c.is_alphabetic() {
        return None;
    }
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => Some(u),
        _ => None,
    }
}

/// Rectangular matrix of cells, stored row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid from rows of cells
    pub fn new(rows: Vec<Vec<Cell>>) -> Result<Self, GridError> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || expected == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(rows.len() * expected);
        for (row, cols) in rows.iter().enumerate() {
            if cols.len() != expected {
                return Err(GridError::Ragged {
                    row,
                    expected,
                    found: cols.len(),
                });
            }
            cells.extend_from_slice(cols);
        }

        Ok(Self {
            rows: rows.len(),
            cols: expected,
            cells,
        })
    }

    /// Parse a solution grid from the layout service's wire format
    ///
    /// `null` and the [`BLOCK_TOKENS`] are blocks; a single alphabetic
    /// character is a letter (stored uppercase). Anything else is rejected.
    pub fn from_wire(rows: &[Vec<WireCell>]) -> Result<Self, GridError> {
        debug!(row_count = rows.len(), "Grid::from_wire: called");
        let mut parsed = Vec::with_capacity(rows.len());
        for (row, cells) in rows.iter().enumerate() {
            let mut parsed_row = Vec::with_capacity(cells.len());
            for (col, cell) in cells.iter().enumerate() {
                parsed_row.push(parse_wire_cell(row, col, cell.as_deref())?);
            }
            parsed.push(parsed_row);
        }
        Self::new(parsed)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> GridError {
        GridError::OutOfBounds {
            row,
            col,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Cell at `(row, col)`, or `None` outside the grid
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.offset(row, col).map(|i| self.cells[i])
    }

    /// One row of cells
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        (row < self.rows).then(|| &self.cells[row * self.cols..(row + 1) * self.cols])
    }

    pub fn is_block(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some_and(Cell::is_block)
    }

    /// Block positions, row-major
    pub fn block_mask(&self) -> Vec<bool> {
        self.cells.iter().map(|c| c.is_block()).collect()
    }

    /// Number of playable (non-block) cells
    pub fn playable_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_block()).count()
    }

    /// Number of cells holding a letter
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| matches!(c, Cell::Letter(_))).count()
    }

    /// Read `len` cells starting at `(row, col)` stepping by `direction`
    ///
    /// Returns `None` if the run leaves the grid.
    pub fn read_run(&self, row: usize, col: usize, direction: Direction, len: usize) -> Option<Vec<Cell>> {
        (0..len)
            .map(|k| {
                let (r, c) = direction.step(row, col, k);
                self.get(r, c)
            })
            .collect()
    }

    fn with_cell(&self, row: usize, col: usize, cell: Cell) -> Self {
        let mut next = self.clone();
        if let Some(i) = self.offset(row, col) {
            next.cells[i] = cell;
        }
        next
    }
}

fn parse_wire_cell(row: usize, col: usize, token: Option<&str>) -> Result<Cell, GridError> {
    let Some(token) = token else {
        return Ok(Cell::Block);
    };
    if BLOCK_TOKENS.contains(&token) {
        return Ok(Cell::Block);
    }

    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => canonical_letter(c).map(Cell::Letter).ok_or_else(|| GridError::UnknownToken {
            row,
            col,
            token: token.to_string(),
        }),
        _ => Err(GridError::UnknownToken {
            row,
            col,
            token: token.to_string(),
        }),
    }
}

/// Build the user-answer overlay for a solution grid
///
/// Same dimensions; blocks copied, every other cell `Empty`.
pub fn build_answer_grid(solution: &Grid) -> Grid {
    debug!(rows = solution.rows, cols = solution.cols, "build_answer_grid: called");
    Grid {
        rows: solution.rows,
        cols: solution.cols,
        cells: solution
            .cells
            .iter()
            .map(|c| if c.is_block() { Cell::Block } else { Cell::Empty })
            .collect(),
    }
}

/// Write `value` into the overlay at `(row, col)`, returning the new overlay
///
/// `value` must be a single alphabetic character (stored uppercase) or the
/// empty string (clears the cell). Block cells of the solution are never
/// writable. The input overlay is left untouched.
pub fn set_cell(solution: &Grid, answer: &Grid, row: usize, col: usize, value: &str) -> Result<Grid, GridError> {
    debug!(row, col, %value, "set_cell: called");
    if solution.dimensions() != answer.dimensions() {
        return Err(GridError::ShapeMismatch {
            rows: solution.rows,
            cols: solution.cols,
            found_rows: answer.rows,
            found_cols: answer.cols,
        });
    }

    let target = solution.get(row, col).ok_or_else(|| solution.out_of_bounds(row, col))?;
    if target.is_block() {
        debug!(row, col, "set_cell: rejected block cell");
        return Err(GridError::BlockCell { row, col });
    }

    let mut chars = value.chars();
    let cell = match (chars.next(), chars.next()) {
        (None, _) => Cell::Empty,
        (Some(c), None) => canonical_letter(c).map(Cell::Letter).ok_or_else(|| GridError::InvalidValue {
            value: value.to_string(),
        })?,
        _ => {
            return Err(GridError::InvalidValue {
                value: value.to_string(),
            });
        }
    };

    Ok(answer.with_cell(row, col, cell))
}

/// Read-side view combining solution, overlay and the reveal flag
///
/// With `reveal` set, playable cells show the solution letters; the overlay
/// itself is never touched, so clearing the flag shows the user's entries again.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    solution: &'a Grid,
    answer: &'a Grid,
    reveal: bool,
}

impl<'a> GridView<'a> {
    pub fn new(solution: &'a Grid, answer: &'a Grid, reveal: bool) -> Self {
        Self {
            solution,
            answer,
            reveal,
        }
    }

    pub fn reveal(&self) -> bool {
        self.reveal
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.solution.dimensions()
    }

    /// Visible cell at `(row, col)`
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        let solution = self.solution.get(row, col)?;
        if solution.is_block() {
            return Some(Cell::Block);
        }
        if self.reveal {
            Some(solution)
        } else {
            Some(self.answer.get(row, col).unwrap_or(Cell::Empty))
        }
    }

    /// Visible cells of one row
    pub fn row(&self, row: usize) -> Vec<Cell> {
        (0..self.solution.cols()).filter_map(|col| self.cell(row, col)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wire(rows: &[&[Option<&str>]]) -> Vec<Vec<WireCell>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
            .collect()
    }

    fn sample() -> Grid {
        // C A T
        // # # O
        // # # P
        Grid::from_wire(&wire(&[
            &[Some("C"), Some("A"), Some("T")],
            &[Some("#"), None, Some("O")],
            &[Some("⬛⬛"), Some(""), Some("P")],
        ]))
        .unwrap()
    }

    #[test]
    fn test_from_wire_parses_letters_and_blocks() {
        let grid = sample();
        assert_eq!(grid.dimensions(), (3, 3));
        assert_eq!(grid.get(0, 0), Some(Cell::Letter('C')));
        assert_eq!(grid.get(1, 0), Some(Cell::Block));
        assert_eq!(grid.get(1, 1), Some(Cell::Block));
        assert_eq!(grid.get(2, 1), Some(Cell::Block));
        assert_eq!(grid.get(2, 2), Some(Cell::Letter('P')));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn test_from_wire_uppercases_letters() {
        let grid = Grid::from_wire(&wire(&[&[Some("a"), Some("#")]])).unwrap();
        assert_eq!(grid.get(0, 0), Some(Cell::Letter('A')));
    }

    #[test]
    fn test_from_wire_rejects_ragged_rows() {
        let err = Grid::from_wire(&wire(&[&[Some("A"), Some("B")], &[Some("C")]])).unwrap_err();
        assert_eq!(
            err,
            GridError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_from_wire_rejects_unknown_tokens() {
        let err = Grid::from_wire(&wire(&[&[Some("AB")]])).unwrap_err();
        assert!(matches!(err, GridError::UnknownToken { row: 0, col: 0, .. }));

        let err = Grid::from_wire(&wire(&[&[Some("7")]])).unwrap_err();
        assert!(matches!(err, GridError::UnknownToken { .. }));
    }

    #[test]
    fn test_from_wire_rejects_empty() {
        assert_eq!(Grid::from_wire(&[]).unwrap_err(), GridError::Empty);
        assert_eq!(Grid::from_wire(&[vec![]]).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn test_build_answer_grid_empties_letters() {
        let solution = sample();
        let answer = build_answer_grid(&solution);

        assert_eq!(answer.dimensions(), solution.dimensions());
        assert_eq!(answer.block_mask(), solution.block_mask());
        assert_eq!(answer.filled_count(), 0);
        assert_eq!(answer.playable_count(), 5);
    }

    #[test]
    fn test_set_cell_uppercases_and_returns_new_grid() {
        let solution = sample();
        let answer = build_answer_grid(&solution);

        let next = set_cell(&solution, &answer, 0, 1, "a").unwrap();
        assert_eq!(next.get(0, 1), Some(Cell::Letter('A')));
        // Original overlay untouched
        assert_eq!(answer.get(0, 1), Some(Cell::Empty));
    }

    #[test]
    fn test_set_cell_empty_string_clears() {
        let solution = sample();
        let answer = set_cell(&solution, &build_answer_grid(&solution), 0, 0, "x").unwrap();
        let cleared = set_cell(&solution, &answer, 0, 0, "").unwrap();
        assert_eq!(cleared.get(0, 0), Some(Cell::Empty));
    }

    #[test]
    fn test_set_cell_rejects_block() {
        let solution = sample();
        let answer = build_answer_grid(&solution);

        let err = set_cell(&solution, &answer, 1, 0, "A").unwrap_err();
        assert_eq!(err, GridError::BlockCell { row: 1, col: 0 });
    }

    #[test]
    fn test_set_cell_rejects_invalid_values() {
        let solution = sample();
        let answer = build_answer_grid(&solution);

        for value in ["AB", "1", " ", "?"] {
            let err = set_cell(&solution, &answer, 0, 0, value).unwrap_err();
            assert!(matches!(err, GridError::InvalidValue { .. }), "value {:?}", value);
        }
    }

    #[test]
    fn test_set_cell_rejects_out_of_bounds() {
        let solution = sample();
        let answer = build_answer_grid(&solution);

        let err = set_cell(&solution, &answer, 0, 3, "A").unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { row: 0, col: 3, .. }));
    }

    #[test]
    fn test_set_cell_rejects_shape_mismatch() {
        let solution = sample();
        let other = Grid::new(vec![vec![Cell::Empty]]).unwrap();
        let err = set_cell(&solution, &other, 0, 0, "A").unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_read_run() {
        let grid = sample();
        let down = grid.read_run(0, 2, Direction::Down, 3).unwrap();
        assert_eq!(down, vec![Cell::Letter('T'), Cell::Letter('O'), Cell::Letter('P')]);
        assert!(grid.read_run(0, 2, Direction::Across, 2).is_none());
    }

    #[test]
    fn test_grid_view_reveal() {
        let solution = sample();
        let answer = set_cell(&solution, &build_answer_grid(&solution), 0, 0, "K").unwrap();

        let hidden = GridView::new(&solution, &answer, false);
        assert_eq!(hidden.cell(0, 0), Some(Cell::Letter('K')));
        assert_eq!(hidden.cell(0, 1), Some(Cell::Empty));
        assert_eq!(hidden.cell(1, 0), Some(Cell::Block));

        let shown = GridView::new(&solution, &answer, true);
        assert_eq!(shown.cell(0, 0), Some(Cell::Letter('C')));
        assert_eq!(shown.cell(0, 1), Some(Cell::Letter('A')));
        assert_eq!(shown.row(1), vec![Cell::Block, Cell::Block, Cell::Letter('O')]);
    }

    fn solution_strategy() -> impl Strategy<Value = Grid> {
        (1usize..8, 1usize..8).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(
                prop::collection::vec(prop::option::weighted(0.7, prop::char::range('A', 'Z')), cols),
                rows,
            )
            .prop_map(|rows| {
                let cells = rows
                    .into_iter()
                    .map(|r| r.into_iter().map(|c| c.map(Cell::Letter).unwrap_or(Cell::Block)).collect())
                    .collect();
                Grid::new(cells).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_answer_grid_keeps_block_pattern(solution in solution_strategy()) {
            let answer = build_answer_grid(&solution);
            prop_assert_eq!(answer.dimensions(), solution.dimensions());
            prop_assert_eq!(answer.block_mask(), solution.block_mask());
            prop_assert_eq!(answer.filled_count(), 0);
        }

        #[test]
        fn prop_reveal_toggle_restores_overlay(
            solution in solution_strategy(),
            edits in prop::collection::vec((0usize..8, 0usize..8, prop::char::range('a', 'z')), 0..20),
        ) {
            let mut answer = build_answer_grid(&solution);
            for (row, col, c) in edits {
                if let Ok(next) = set_cell(&solution, &answer, row, col, &c.to_string()) {
                    answer = next;
                }
            }
            let before: Vec<Vec<Cell>> = (0..answer.rows()).map(|r| answer.row(r).unwrap().to_vec()).collect();

            let revealed = GridView::new(&solution, &answer, true);
            for r in 0..solution.rows() {
                prop_assert_eq!(revealed.row(r), solution.row(r).unwrap().to_vec());
            }

            let hidden = GridView::new(&solution, &answer, false);
            for (r, row) in before.iter().enumerate() {
                prop_assert_eq!(&hidden.row(r), row);
            }
            prop_assert_eq!(answer.block_mask(), solution.block_mask());
        }
    }
}
