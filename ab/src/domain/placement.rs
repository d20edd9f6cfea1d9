//! Word placements and the clue index
//!
//! A placement binds one answer word and its clue to a start cell and a
//! direction. The layout service returns the grid and the placements
//! separately; [`PlacementIndex::build`] checks that every placement reads
//! back its own word from the grid before anything is shown.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::clue::Clue;
use super::grid::{Cell, Grid};

/// Direction a word runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    /// Coordinates of the `offset`-th cell of a word starting at `(row, col)`
    pub fn step(self, row: usize, col: usize, offset: usize) -> (usize, usize) {
        match self {
            Direction::Across => (row, col + offset),
            Direction::Down => (row + offset, col),
        }
    }

    /// Section heading for clue lists
    pub fn heading(self) -> &'static str {
        match self {
            Direction::Across => "Across",
            Direction::Down => "Down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One answer word's position, direction and clue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Answer, canonical uppercase
    pub word: String,
    /// 0-based start row
    pub row: usize,
    /// 0-based start column
    pub col: usize,
    pub direction: Direction,
    pub clue: String,
}

impl Placement {
    pub fn new(
        word: impl Into<String>,
        row: usize,
        col: usize,
        direction: Direction,
        clue: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into().trim().to_uppercase(),
            row,
            col,
            direction,
            clue: clue.into(),
        }
    }

    /// Number of letters in the answer
    pub fn len(&self) -> usize {
        self.word.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    /// Grid coordinates covered by this placement, in reading order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len()).map(|k| self.direction.step(self.row, self.col, k))
    }

    /// The `{clue, answer}` pair the assistant service expects
    pub fn to_clue(&self) -> Clue {
        Clue::new(self.clue.clone(), self.word.clone())
    }

    /// Check that this placement reads back its own word from `grid`
    pub fn validate(&self, grid: &Grid) -> Result<(), MalformedPlacementError> {
        debug!(word = %self.word, row = self.row, col = self.col, direction = %self.direction, "Placement::validate: called");
        if self.is_empty() {
            return Err(MalformedPlacementError::EmptyWord {
                clue: self.clue.clone(),
            });
        }

        let run = grid
            .read_run(self.row, self.col, self.direction, self.len())
            .ok_or_else(|| MalformedPlacementError::OutOfBounds {
                word: self.word.clone(),
                row: self.row,
                col: self.col,
                direction: self.direction,
                rows: grid.rows(),
                cols: grid.cols(),
            })?;

        let found: String = run
            .iter()
            .map(|cell| match cell {
                Cell::Letter(c) => *c,
                _ => '?',
            })
            .collect();

        if found != self.word.to_uppercase() {
            debug!(word = %self.word, %found, "Placement::validate: letters do not match grid");
            return Err(MalformedPlacementError::LetterMismatch {
                word: self.word.clone(),
                row: self.row,
                col: self.col,
                direction: self.direction,
                found,
            });
        }

        Ok(())
    }
}

/// Placement data that contradicts the grid it came with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPlacementError {
    #[error("Placement for clue {clue:?} has an empty answer")]
    EmptyWord { clue: String },

    #[error("Placement {word:?} at ({row}, {col}) {direction} runs outside the {rows}x{cols} grid")]
    OutOfBounds {
        word: String,
        row: usize,
        col: usize,
        direction: Direction,
        rows: usize,
        cols: usize,
    },

    #[error("Placement {word:?} at ({row}, {col}) {direction} reads {found:?} from the grid")]
    LetterMismatch {
        word: String,
        row: usize,
        col: usize,
        direction: Direction,
        found: String,
    },
}

/// Placements split into across/down sections, each ordered by `(row, col)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementIndex {
    across: Vec<Placement>,
    down: Vec<Placement>,
}

impl PlacementIndex {
    /// Partition by direction and sort each section by start position
    ///
    /// The sort is stable, so placements sharing a start cell keep their
    /// input order and repeated calls give identical output.
    pub fn index(placements: &[Placement]) -> Self {
        debug!(count = placements.len(), "PlacementIndex::index: called");
        let (mut across, mut down): (Vec<Placement>, Vec<Placement>) = placements
            .iter()
            .cloned()
            .partition(|p| p.direction == Direction::Across);
        across.sort_by_key(|p| (p.row, p.col));
        down.sort_by_key(|p| (p.row, p.col));
        Self { across, down }
    }

    /// Validate every placement against `grid`, then index them
    ///
    /// Words are canonicalized to uppercase first. The first inconsistent
    /// placement fails the whole index.
    pub fn build(grid: &Grid, placements: Vec<Placement>) -> Result<Self, MalformedPlacementError> {
        debug!(count = placements.len(), "PlacementIndex::build: called");
        let placements: Vec<Placement> = placements
            .into_iter()
            .map(|p| Placement::new(p.word, p.row, p.col, p.direction, p.clue))
            .collect();
        for placement in &placements {
            placement.validate(grid)?;
        }
        Ok(Self::index(&placements))
    }

    pub fn across(&self) -> &[Placement] {
        &self.across
    }

    pub fn down(&self) -> &[Placement] {
        &self.down
    }

    pub fn section(&self, direction: Direction) -> &[Placement] {
        match direction {
            Direction::Across => &self.across,
            Direction::Down => &self.down,
        }
    }

    /// Placement by its 1-based number within a section
    pub fn get(&self, direction: Direction, number: usize) -> Option<&Placement> {
        number.checked_sub(1).and_then(|i| self.section(direction).get(i))
    }

    /// Section and 1-based number of a placement
    pub fn position_of(&self, placement: &Placement) -> Option<(Direction, usize)> {
        self.section(placement.direction)
            .iter()
            .position(|p| p == placement)
            .map(|i| (placement.direction, i + 1))
    }

    pub fn contains(&self, placement: &Placement) -> bool {
        self.position_of(placement).is_some()
    }

    /// All placements, across section first
    pub fn iter(&self) -> impl Iterator<Item = &Placement> {
        self.across.iter().chain(self.down.iter())
    }

    pub fn len(&self) -> usize {
        self.across.len() + self.down.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clue text for display, with the answer appended when revealed
pub fn resolve_display_text(placement: &Placement, reveal_answers: bool) -> String {
    if reveal_answers {
        format!("{} ({})", placement.clue, placement.word)
    } else {
        placement.clue.clone()
    }
}
