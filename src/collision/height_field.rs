use super::{Surface, SurfaceQuery};

/// Regular grid of ground heights on the XZ plane.
///
/// Cell `(col, row)` covers `origin + [col, col + 1) * cell_size` on X and
/// `origin + [row, row + 1) * cell_size` on Z. A `None` cell is a wall.
#[derive(Clone, Debug)]
pub struct HeightField {
    origin_x: f32,
    origin_z: f32,
    cell_size: f32,
    columns: usize,
    rows: usize,
    cells: Vec<Option<f32>>,
}

impl HeightField {
    /// `cells` is row-major: `cells[row * columns + col]`.
    pub fn new(
        origin_x: f32,
        origin_z: f32,
        cell_size: f32,
        columns: usize,
        cells: Vec<Option<f32>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            cell_size.is_finite() && cell_size > 0.0,
            "cell size must be positive, got {}",
            cell_size
        );
        anyhow::ensure!(columns > 0, "height field needs at least one column");
        anyhow::ensure!(
            cells.len() % columns == 0,
            "{} cells don't fill rows of {} columns",
            cells.len(),
            columns
        );
        Ok(Self {
            origin_x,
            origin_z,
            cell_size,
            columns,
            rows: cells.len() / columns,
            cells,
        })
    }

    /// Open field of constant height.
    pub fn flat(
        origin_x: f32,
        origin_z: f32,
        cell_size: f32,
        columns: usize,
        rows: usize,
        height: f32,
    ) -> anyhow::Result<Self> {
        Self::new(
            origin_x,
            origin_z,
            cell_size,
            columns,
            vec![Some(height); columns * rows],
        )
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid cell containing `(x, z)`, if inside the field.
    pub fn cell_at(&self, x: f32, z: f32) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.cell_size).floor();
        let row = ((z - self.origin_z) / self.cell_size).floor();
        // NaN fails both comparisons
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.columns && row < self.rows).then_some((col, row))
    }

    pub fn set(&mut self, col: usize, row: usize, cell: Option<f32>) {
        if col < self.columns && row < self.rows {
            self.cells[row * self.columns + col] = cell;
        } else {
            log::warn!("height field cell ({}, {}) is out of range", col, row);
        }
    }

    pub fn block(&mut self, col: usize, row: usize) {
        self.set(col, row, None);
    }
}

impl SurfaceQuery for HeightField {
    fn surface_at(&self, x: f32, z: f32) -> Surface {
        match self.cell_at(x, z) {
            None => Surface::OutOfBounds,
            Some((col, row)) => match self.cells[row * self.columns + col] {
                Some(ground) => Surface::Open { ground },
                None => Surface::Blocked,
            },
        }
    }
}
