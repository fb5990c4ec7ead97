// ==========================================
// Repooler - Destination Well Allocation
// ==========================================
// 96-well plates filled column-major: A:1..H:1, A:2..H:2, ...
// up to 12 columns, then the next plate of the list
// ==========================================

use crate::domain::types::PlateWell;

pub const PLATE_ROWS: usize = 8;
pub const PLATE_COLUMNS: usize = 12;
pub const WELLS_PER_PLATE: usize = PLATE_ROWS * PLATE_COLUMNS;

const ROW_LETTERS: [char; PLATE_ROWS] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// Well label for a column-major index within one plate
pub fn well_label(index: usize) -> String {
    let index = index % WELLS_PER_PLATE;
    let row = ROW_LETTERS[index % PLATE_ROWS];
    let column = index / PLATE_ROWS + 1;
    format!("{}:{}", row, column)
}

// ==========================================
// DestinationWells - iterator over free wells
// ==========================================
#[derive(Debug, Clone)]
pub struct DestinationWells<'a> {
    plates: &'a [String],
    next: usize,
}

impl<'a> DestinationWells<'a> {
    pub fn new(plates: &'a [String]) -> Self {
        Self { plates, next: 0 }
    }

    /// Wells handed out so far
    pub fn used(&self) -> usize {
        self.next
    }
}

impl Iterator for DestinationWells<'_> {
    type Item = PlateWell;

    fn next(&mut self) -> Option<PlateWell> {
        let plate = self.plates.get(self.next / WELLS_PER_PLATE)?;
        let well = PlateWell::new(plate, &well_label(self.next));
        self.next += 1;
        Some(well)
    }
}
