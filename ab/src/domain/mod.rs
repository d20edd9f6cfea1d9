//! Puzzle domain types
//!
//! Pure data: grids, placements and clues. Nothing here performs I/O or
//! holds shared state; the controller owns the live values.

mod clue;
mod grid;
mod placement;

pub use clue::{Clue, Difficulty, normalize_topics};
pub use grid::{BLOCK_TOKENS, Cell, Grid, GridError, GridView, WireCell, build_answer_grid, set_cell};
pub use placement::{Direction, MalformedPlacementError, Placement, PlacementIndex, resolve_display_text};
