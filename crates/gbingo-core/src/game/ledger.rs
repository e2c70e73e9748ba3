use std::collections::BTreeMap;

use super::Number;

/// 1-based address of a ledger entry when viewed as rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub position: usize,
}

/// Append-only sequence of drawn numbers for one configuration.
///
/// Rows are a display-time view over the flat sequence; only the width is
/// stored.
#[derive(Clone, Debug)]
pub struct Ledger {
    row_width: usize,
    numbers: Vec<Number>,
}

impl Ledger {
    pub fn new(row_width: usize) -> Self {
        Self {
            row_width: row_width.max(1),
            numbers: Vec::new(),
        }
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn numbers(&self) -> &[Number] {
        &self.numbers
    }

    pub fn append(&mut self, batch: &[Number]) {
        self.numbers.extend_from_slice(batch);
    }

    pub fn rows(&self) -> Vec<Vec<Number>> {
        chunk_rows(&self.numbers, self.row_width)
    }

    pub fn search(&self, target: Number) -> Vec<Position> {
        self.numbers
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == target)
            .map(|(i, _)| Position {
                row: i / self.row_width + 1,
                position: i % self.row_width + 1,
            })
            .collect()
    }

    /// Occurrence count per distinct value, ascending by value.
    pub fn frequency(&self) -> BTreeMap<Number, usize> {
        let mut out = BTreeMap::new();
        for n in &self.numbers {
            *out.entry(*n).or_insert(0) += 1;
        }
        out
    }
}

/// Split `numbers` into rows of `row_width`; the last row may be short.
pub fn chunk_rows(numbers: &[Number], row_width: usize) -> Vec<Vec<Number>> {
    numbers
        .chunks(row_width.max(1))
        .map(|row| row.to_vec())
        .collect()
}
