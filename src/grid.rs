use serde::{Deserialize, Serialize};




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * One logically rectangular axis of the grid: a named interval divided into
 * `num_cells` equal zones.
 */
pub struct Dimension {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub num_cells: usize,
}




// ============================================================================
impl Dimension {

    pub fn new(name: &str, lower: f64, upper: f64, num_cells: usize) -> Self {
        Self {
            name: name.to_string(),
            lower,
            upper,
            num_cells,
        }
    }

    pub fn cell_spacing(&self) -> f64 {
        (self.upper - self.lower) / self.num_cells as f64
    }

    pub fn cell_center(&self, index: usize) -> f64 {
        self.lower + self.cell_spacing() * (index as f64 + 0.5)
    }

    pub fn cell_centers(&self) -> Vec<f64> {
        (0..self.num_cells).map(|i| self.cell_center(i)).collect()
    }

    pub fn is_valid(&self) -> bool {
        self.num_cells > 0 && self.lower.is_finite() && self.upper.is_finite() && self.upper > self.lower
    }
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * A simple rectilinear structured mesh, of one or more dimensions. Zones are
 * addressed in row-major order: the last axis varies fastest.
 */
pub struct Grid {
    pub dimensions: Vec<Dimension>,
}




// ============================================================================
impl Grid {

    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self { dimensions }
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.num_cells).collect()
    }

    pub fn total_zones(&self) -> usize {
        self.dimensions.iter().map(|d| d.num_cells).product()
    }

    pub fn cell_spacing(&self) -> Vec<f64> {
        self.dimensions.iter().map(Dimension::cell_spacing).collect()
    }

    /**
     * Return the coordinates of the centre of the zone at the given
     * multi-index.
     */
    pub fn cell_center(&self, index: &[usize]) -> Vec<f64> {
        self.dimensions
            .iter()
            .zip(index)
            .map(|(d, &i)| d.cell_center(i))
            .collect()
    }

    /**
     * Convert a flat (row-major) zone index into a multi-index.
     */
    pub fn unravel(&self, mut flat: usize) -> Vec<usize> {
        let mut index = vec![0; self.ndim()];
        for (n, d) in self.dimensions.iter().enumerate().rev() {
            index[n] = flat % d.num_cells;
            flat /= d.num_cells;
        }
        index
    }

    pub fn ravel(&self, index: &[usize]) -> usize {
        self.dimensions
            .iter()
            .zip(index)
            .fold(0, |flat, (d, &i)| flat * d.num_cells + i)
    }

    pub fn is_valid(&self) -> bool {
        !self.dimensions.is_empty() && self.dimensions.iter().all(Dimension::is_valid)
    }
}
