//! Plain-text rendering of grids and clue lists

use crate::domain::{Cell, Direction, GridView, PlacementIndex, resolve_display_text};

fn glyph(cell: Cell) -> char {
    match cell {
        Cell::Letter(c) => c,
        Cell::Block => '#',
        Cell::Empty => '.',
    }
}

/// Grid with column numbers on top and row numbers on the left
pub fn render_grid(view: &GridView<'_>) -> String {
    let (rows, cols) = view.dimensions();
    let mut out = String::from("   ");
    for col in 0..cols {
        out.push_str(&format!("{:>3}", col));
    }
    out.push('\n');

    for row in 0..rows {
        out.push_str(&format!("{:>3}", row));
        for cell in view.row(row) {
            out.push_str(&format!("{:>3}", glyph(cell)));
        }
        out.push('\n');
    }
    out
}

/// Short reference used to pick a clue, e.g. `a1` or `d3`
pub fn clue_ref(direction: Direction, number: usize) -> String {
    match direction {
        Direction::Across => format!("a{}", number),
        Direction::Down => format!("d{}", number),
    }
}

/// Parse `a1` / `d3` (case-insensitive) into a section and 1-based number
pub fn parse_clue_ref(input: &str) -> Option<(Direction, usize)> {
    let input = input.trim().to_ascii_lowercase();
    let (direction, number) = if let Some(rest) = input.strip_prefix('a') {
        (Direction::Across, rest)
    } else if let Some(rest) = input.strip_prefix('d') {
        (Direction::Down, rest)
    } else {
        return None;
    };
    match number.parse::<usize>() {
        Ok(n) if n > 0 => Some((direction, n)),
        _ => None,
    }
}

/// Both clue sections, numbered from 1 in index order
pub fn render_clues(index: &PlacementIndex, reveal: bool) -> String {
    let mut out = String::new();
    for direction in [Direction::Across, Direction::Down] {
        let section = index.section(direction);
        if section.is_empty() {
            continue;
        }
        out.push_str(direction.heading());
        out.push('\n');
        for (i, placement) in section.iter().enumerate() {
            out.push_str(&format!(
                "  {:<4} ({},{}) {}\n",
                clue_ref(direction, i + 1),
                placement.row,
                placement.col,
                resolve_display_text(placement, reveal)
            ));
        }
    }
    out
}
