use crate::geometry::{BoundaryCondition, Face};




/**
 * A working copy of a state's field array, padded with `num_ghost` guard
 * zones on both sides of every axis. The interior is copied in from the
 * state, and the guard zones are populated according to the boundary
 * condition on each face. Data are laid out field-major and row-major, like
 * [`State`](crate::state::State), but over the padded shape.
 */
#[derive(Clone, Debug)]
pub struct Extended {
    meqn: usize,
    num_ghost: usize,
    interior: Vec<usize>,
    shape: Vec<usize>,
    interior_map: Vec<usize>,
    data: Vec<f64>,
}




// ============================================================================
impl Extended {

    pub fn zeros(meqn: usize, interior: &[usize], num_ghost: usize) -> Self {
        let shape: Vec<usize> = interior.iter().map(|n| n + 2 * num_ghost).collect();
        let padded_zones: usize = shape.iter().product();
        let interior_zones: usize = interior.iter().product();

        let mut interior_map = Vec::with_capacity(interior_zones);
        let mut index = vec![0; interior.len()];

        for _ in 0..interior_zones {
            let flat = index
                .iter()
                .zip(&shape)
                .fold(0, |flat, (i, n)| flat * n + i + num_ghost);
            interior_map.push(flat);

            for axis in (0..interior.len()).rev() {
                index[axis] += 1;
                if index[axis] < interior[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }

        Self {
            meqn,
            num_ghost,
            interior: interior.to_vec(),
            shape,
            interior_map,
            data: vec![0.0; meqn * padded_zones],
        }
    }

    pub fn meqn(&self) -> usize {
        self.meqn
    }

    pub fn num_ghost(&self) -> usize {
        self.num_ghost
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn num_zones(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn num_interior_zones(&self) -> usize {
        self.interior_map.len()
    }

    /**
     * Distance, in the flat padded array of one field, between neighboring
     * zones along the given axis.
     */
    pub fn stride(&self, axis: usize) -> usize {
        self.shape[axis + 1..].iter().product()
    }

    /**
     * Map a flat interior zone index to its flat index in the padded array.
     */
    pub fn padded_index(&self, zone: usize) -> usize {
        self.interior_map[zone]
    }

    pub fn field(&self, m: usize) -> &[f64] {
        let n = self.num_zones();
        &self.data[m * n..(m + 1) * n]
    }

    pub fn value(&self, m: usize, padded_zone: usize) -> f64 {
        self.data[m * self.num_zones() + padded_zone]
    }

    /**
     * Copy the given (unpadded) field array into the interior, then populate
     * the guard zones one axis at a time. Filling axis by axis over the full
     * padded extent of the other axes also fills the corner zones.
     *
     * `bc[axis]` is the (lower, upper) boundary condition pair, and
     * `normal[axis]` names the field which is negated by a reflecting
     * boundary on that axis.
     */
    pub fn fill(&mut self, q: &[f64], bc: &[(BoundaryCondition, BoundaryCondition)], normal: &[Option<usize>]) {
        let n = self.num_zones();
        let ni = self.num_interior_zones();

        for m in 0..self.meqn {
            for zone in 0..ni {
                self.data[m * n + self.interior_map[zone]] = q[m * ni + zone];
            }
        }
        for axis in 0..self.interior.len() {
            for &face in Face::both().iter() {
                let condition = match face {
                    Face::Lower => bc[axis].0,
                    Face::Upper => bc[axis].1,
                };
                self.fill_face(axis, face, condition, normal[axis]);
            }
        }
    }

    fn fill_face(&mut self, axis: usize, face: Face, bc: BoundaryCondition, normal: Option<usize>) {
        let g = self.num_ghost;
        let len = self.interior[axis];
        let stride = self.stride(axis);
        let extent = self.shape[axis];
        let n = self.num_zones();

        for m in 0..self.meqn {
            let sign = if bc == BoundaryCondition::Reflecting && normal == Some(m) { -1.0 } else { 1.0 };

            for base in (0..n).filter(|p| (p / stride) % extent == 0) {
                for k in 0..g {
                    let (dst, src) = match (face, bc) {
                        (Face::Lower, BoundaryCondition::Outflow) => (g - 1 - k, g),
                        (Face::Lower, BoundaryCondition::Reflecting) => (g - 1 - k, g + k),
                        (Face::Lower, BoundaryCondition::Periodic) => (g - 1 - k, g + len - 1 - k),
                        (Face::Upper, BoundaryCondition::Outflow) => (g + len + k, g + len - 1),
                        (Face::Upper, BoundaryCondition::Reflecting) => (g + len + k, g + len - 1 - k),
                        (Face::Upper, BoundaryCondition::Periodic) => (g + len + k, g + k),
                    };
                    let value = self.data[m * n + base + src * stride];
                    self.data[m * n + base + dst * stride] = sign * value;
                }
            }
        }
    }
}
