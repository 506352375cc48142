use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::grid::Grid;




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * The evolving solution on one grid patch: `meqn` conserved fields laid out
 * field-major over the zones of the grid (`q[m * total_zones + zone]`), an
 * optional auxiliary array with the same layout, named global scalar
 * parameters (e.g. gravity), and the simulation time.
 */
pub struct State {
    pub grid: Grid,
    pub meqn: usize,
    pub maux: usize,
    pub q: Vec<f64>,
    pub aux: Option<Vec<f64>>,
    pub aux_global: BTreeMap<String, f64>,
    pub t: f64,
}




// ============================================================================
impl State {

    /**
     * Create a zero-initialized state with `meqn` fields on the given grid.
     */
    pub fn new(grid: Grid, meqn: usize) -> Self {
        let q = vec![0.0; meqn * grid.total_zones()];
        Self {
            grid,
            meqn,
            maux: 0,
            q,
            aux: None,
            aux_global: BTreeMap::new(),
            t: 0.0,
        }
    }

    /**
     * Generate a state on the given grid, with field values defined from a
     * closure of the zone centre coordinates.
     */
    pub fn from_function<F>(grid: Grid, meqn: usize, f: F) -> Self
    where
        F: Fn(&[f64], &mut [f64]),
    {
        let mut state = Self::new(grid, meqn);
        let mut values = vec![0.0; meqn];
        let n = state.num_zones();

        for zone in 0..n {
            let x = state.grid.cell_center(&state.grid.unravel(zone));
            f(&x, &mut values);
            for (m, v) in values.iter().enumerate() {
                state.q[m * n + zone] = *v;
            }
        }
        state
    }

    pub fn with_aux(mut self, maux: usize, aux: Vec<f64>) -> Self {
        self.maux = maux;
        self.aux = Some(aux);
        self
    }

    pub fn with_global(mut self, name: &str, value: f64) -> Self {
        self.aux_global.insert(name.to_string(), value);
        self
    }

    pub fn num_zones(&self) -> usize {
        self.grid.total_zones()
    }

    pub fn global(&self, name: &str) -> Option<f64> {
        self.aux_global.get(name).cloned()
    }

    /**
     * Return the contiguous slice holding field `m` over all zones.
     */
    pub fn field(&self, m: usize) -> &[f64] {
        let n = self.num_zones();
        &self.q[m * n..(m + 1) * n]
    }

    pub fn field_mut(&mut self, m: usize) -> &mut [f64] {
        let n = self.num_zones();
        &mut self.q[m * n..(m + 1) * n]
    }

    /**
     * Gather the `meqn` field values at one zone.
     */
    pub fn zone_values(&self, zone: usize) -> Vec<f64> {
        let n = self.num_zones();
        (0..self.meqn).map(|m| self.q[m * n + zone]).collect()
    }

    /**
     * Sum of field `m` over the grid, weighted by the zone volume.
     */
    pub fn integral(&self, m: usize) -> f64 {
        let volume: f64 = self.grid.cell_spacing().iter().product();
        self.field(m).iter().sum::<f64>() * volume
    }

    /**
     * Check the structural invariants: the array lengths agree with the
     * declared number of equations (and auxiliary fields) and the grid
     * dimensions, and the time is finite.
     */
    pub fn is_valid(&self) -> bool {
        let n = self.num_zones();
        let aux_ok = match &self.aux {
            Some(aux) => self.maux > 0 && aux.len() == self.maux * n,
            None => self.maux == 0,
        };
        self.grid.is_valid() && self.meqn > 0 && self.q.len() == self.meqn * n && aux_ok && self.t.is_finite()
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::State;
    use crate::grid::{Dimension, Grid};

    fn grid() -> Grid {
        Grid::new(vec![Dimension::new("x", 0.0, 1.0, 4), Dimension::new("y", 0.0, 1.0, 2)])
    }

    #[test]
    fn state_from_function_works() {
        let state = State::from_function(grid(), 2, |x, q| {
            q[0] = x[0];
            q[1] = 10.0 * x[1];
        });
        assert!(state.is_valid());
        assert_eq!(state.field(0), &[0.125, 0.125, 0.375, 0.375, 0.625, 0.625, 0.875, 0.875]);
        assert_eq!(state.zone_values(1), vec![0.125, 7.5]);
    }

    #[test]
    fn integral_is_volume_weighted() {
        let state = State::from_function(grid(), 1, |_, q| q[0] = 2.0);
        assert!((state.integral(0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_shapes_are_invalid() {
        let mut state = State::new(grid(), 3);
        assert!(state.is_valid());
        state.q.pop();
        assert!(!state.is_valid());

        let state = State::new(grid(), 3).with_aux(1, vec![0.0; 7]);
        assert!(!state.is_valid());

        let mut state = State::new(grid(), 3);
        state.maux = 2;
        assert!(!state.is_valid());
    }

    #[test]
    fn globals_are_named() {
        let state = State::new(grid(), 1).with_global("grav", 9.81);
        assert_eq!(state.global("grav"), Some(9.81));
        assert_eq!(state.global("rho"), None);
    }
}
