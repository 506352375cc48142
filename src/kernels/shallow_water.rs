use std::ops::{Add, Sub, Mul, Div};
use crate::boundary::Extended;
use crate::geometry::Direction;
use crate::kernel::{Kernel, KernelContext, Sweep};
use crate::reconstruction::Reconstruction;




// ============================================================================
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conserved(f64, f64, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Primitive(f64, f64, f64);




/**
 * A Godunov update of the shallow water equations in one or two dimensions,
 * using the HLLE approximate Riemann solver. The fields are the depth and
 * the momenta (`h, hu` in 1D, `h, hu, hv` in 2D). Interface states are
 * reconstructed field by field from the conserved variables, as the kernel
 * context asks. The gravitational acceleration is read from the `grav`
 * global parameter.
 */
pub struct ShallowWater {
    default_gravity: f64,
}




// ============================================================================
impl ShallowWater {

    pub fn new() -> Self {
        Self { default_gravity: 1.0 }
    }

    /**
     * The left and right states at the face between padded zone `c` and
     * its upper neighbor along the axis with the given stride.
     */
    fn face(q: &Extended, reconstruction: &Reconstruction, c: usize, stride: usize) -> (Conserved, Conserved) {
        let mut l = [0.0; 3];
        let mut r = [0.0; 3];

        for m in 0..q.meqn().min(3) {
            let v = |k: isize| q.value(m, (c as isize + k * stride as isize) as usize);
            let (a, b) = reconstruction.interface(m, v);
            l[m] = a;
            r[m] = b;
        }
        (Conserved(l[0], l[1], l[2]), Conserved(r[0], r[1], r[2]))
    }
}

impl Default for ShallowWater {
    fn default() -> Self {
        Self::new()
    }
}




// ============================================================================
impl Conserved {

    pub fn to_primitive(&self) -> Primitive {
        if self.0 > 0.0 {
            Primitive(self.0, self.1 / self.0, self.2 / self.0)
        } else {
            Primitive(0.0, 0.0, 0.0)
        }
    }

    fn write_to_slice(&self, dq: &mut [f64], zone: usize, num_zones: usize) {
        for (m, v) in [self.0, self.1, self.2].iter().enumerate() {
            if let Some(x) = dq.get_mut(m * num_zones + zone) {
                *x += v;
            }
        }
    }
}




// ============================================================================
impl Primitive {

    pub fn depth(&self) -> f64 {
        self.0
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        match direction {
            Direction::I => self.1,
            Direction::J => self.2,
            Direction::K => 0.0,
        }
    }

    pub fn gravity_wave_speed(&self, gravity: f64) -> f64 {
        (gravity * self.depth()).sqrt()
    }

    pub fn outer_wavespeeds(&self, direction: Direction, gravity: f64) -> (f64, f64) {
        let c = self.gravity_wave_speed(gravity);
        let vn = self.velocity(direction);
        (vn - c, vn + c)
    }

    pub fn to_conserved(&self) -> Conserved {
        Conserved(self.0, self.0 * self.1, self.0 * self.2)
    }

    pub fn flux_vector(&self, direction: Direction, gravity: f64) -> Conserved {
        let h = self.depth();
        let vn = self.velocity(direction);
        let pg = 0.5 * gravity * h * h;
        let u = self.to_conserved();

        Conserved(
            u.0 * vn,
            u.1 * vn + pg * direction.along(Direction::I),
            u.2 * vn + pg * direction.along(Direction::J),
        )
    }
}




// ============================================================================
impl Add<Conserved> for Conserved {
    type Output = Conserved;
    fn add(self, u: Self) -> Conserved {
        Conserved(self.0 + u.0, self.1 + u.1, self.2 + u.2)
    }
}

impl Sub<Conserved> for Conserved {
    type Output = Self;
    fn sub(self, u: Self) -> Self {
        Self(self.0 - u.0, self.1 - u.1, self.2 - u.2)
    }
}

impl Mul<f64> for Conserved {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0 * a, self.1 * a, self.2 * a)
    }
}

impl Div<f64> for Conserved {
    type Output = Self;
    fn div(self, a: f64) -> Self {
        Self(self.0 / a, self.1 / a, self.2 / a)
    }
}




/**
 * Return the HLLE intercell flux and the fastest signal speed at the face.
 */
pub fn riemann_hlle(pl: Primitive, pr: Primitive, direction: Direction, gravity: f64) -> (Conserved, f64) {
    let ul = pl.to_conserved();
    let ur = pr.to_conserved();
    let fl = pl.flux_vector(direction, gravity);
    let fr = pr.flux_vector(direction, gravity);

    let (alm, alp) = pl.outer_wavespeeds(direction, gravity);
    let (arm, arp) = pr.outer_wavespeeds(direction, gravity);
    let ap = alp.max(arp).max(0.0);
    let am = alm.min(arm).min(0.0);
    let speed = ap.max(-am);

    if ap - am == 0.0 {
        (Conserved(0.0, 0.0, 0.0), 0.0)
    } else {
        ((fl * ap - fr * am - (ul - ur) * ap * am) / (ap - am), speed)
    }
}




// ============================================================================
impl Kernel for ShallowWater {

    fn name(&self) -> &str {
        "shallow-water-hlle"
    }

    fn increment(&mut self, q: &Extended, context: &KernelContext, dq: &mut [f64]) -> f64 {
        let gravity = context.aux_global.get("grav").cloned().unwrap_or(self.default_gravity);
        let spacing = context.grid.cell_spacing();
        let ndim = spacing.len().min(2);
        let num_zones = q.num_interior_zones();

        let axes: Vec<usize> = match context.sweep {
            Sweep::Unsplit => (0..ndim).collect(),
            Sweep::Axis(axis) => vec![axis],
        };

        for x in dq.iter_mut() {
            *x = 0.0;
        }

        let mut cfl: f64 = 0.0;

        for axis in axes {
            let direction = match Direction::from_axis(axis) {
                Some(direction) => direction,
                None => continue,
            };
            let stride = q.stride(axis);
            let dtdx = context.dt / spacing[axis];

            for zone in 0..num_zones {
                let p = q.padded_index(zone);
                let (ul, ur) = Self::face(q, context.reconstruction, p - stride, stride);
                let (fm, sm) = riemann_hlle(ul.to_primitive(), ur.to_primitive(), direction, gravity);
                let (ul, ur) = Self::face(q, context.reconstruction, p, stride);
                let (fp, sp) = riemann_hlle(ul.to_primitive(), ur.to_primitive(), direction, gravity);

                ((fp - fm) * -dtdx).write_to_slice(dq, zone, num_zones);
                cfl = cfl.max(sm.max(sp) * dtdx);
            }
        }
        cfl
    }
}
