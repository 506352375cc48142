use serde::Serialize;




#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Limiter {
    None,
    Minmod,
    Superbee,
    VanLeer,
    MC,
}




// ============================================================================
impl Limiter {

    /**
     * The limited slope of a zone, given the differences `a` to its left
     * neighbor and `b` to its right neighbor. `Limiter::None` gives the
     * unlimited centered slope.
     */
    pub fn slope(self, a: f64, b: f64) -> f64 {
        if self == Limiter::None {
            return 0.5 * (a + b);
        }
        if a * b <= 0.0 {
            return 0.0;
        }
        let s = a.signum();
        let (a, b) = (a.abs(), b.abs());

        match self {
            Limiter::Minmod => s * a.min(b),
            Limiter::Superbee => s * (2.0 * a).min(b).max(a.min(2.0 * b)),
            Limiter::VanLeer => s * 2.0 * a * b / (a + b),
            Limiter::MC => s * (2.0 * a).min(2.0 * b).min(0.5 * (a + b)),
            Limiter::None => 0.0,
        }
    }
}




/**
 * How a kernel reconstructs the two states at a zone interface from the zone
 * averages around it. Resolved from the solver configuration at setup.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum Reconstruction {

    /// First order: the interface states are the adjacent zone averages.
    PiecewiseConstant,

    /// Piecewise linear, with one slope limiter per field.
    Limited(Vec<Limiter>),

    /// Weighted essentially non-oscillatory, of order 3 or 5.
    Weno(u32),
}




// ============================================================================
impl Reconstruction {

    /**
     * The number of guard zones needed on each side to reconstruct every
     * interface of the interior.
     */
    pub fn stencil_width(&self) -> usize {
        match self {
            Reconstruction::PiecewiseConstant => 1,
            Reconstruction::Limited(_) => 2,
            Reconstruction::Weno(3) => 2,
            Reconstruction::Weno(_) => 3,
        }
    }

    /**
     * Return the left and right states of field `m` at the interface between
     * zone 0 and zone 1, where `v(k)` is the average of zone `k`.
     */
    pub fn interface<F: Fn(isize) -> f64>(&self, m: usize, v: F) -> (f64, f64) {
        match self {
            Reconstruction::PiecewiseConstant => (v(0), v(1)),
            Reconstruction::Limited(limiters) => {
                let limiter = limiters.get(m).or_else(|| limiters.last()).cloned().unwrap_or(Limiter::None);
                let sl = limiter.slope(v(0) - v(-1), v(1) - v(0));
                let sr = limiter.slope(v(1) - v(0), v(2) - v(1));
                (v(0) + 0.5 * sl, v(1) - 0.5 * sr)
            }
            Reconstruction::Weno(3) => (weno3(v(-1), v(0), v(1)), weno3(v(2), v(1), v(0))),
            Reconstruction::Weno(_) => (
                weno5(v(-2), v(-1), v(0), v(1), v(2)),
                weno5(v(3), v(2), v(1), v(0), v(-1)),
            ),
        }
    }
}




// ============================================================================
const WENO_EPSILON: f64 = 1e-6;

/**
 * Third-order WENO value at the face between `v1` and the next zone over,
 * on the side of `v1`.
 */
fn weno3(v0: f64, v1: f64, v2: f64) -> f64 {
    let p = [-0.5 * v0 + 1.5 * v1, 0.5 * v1 + 0.5 * v2];
    let b = [(v1 - v0).powi(2), (v2 - v1).powi(2)];
    let d = [1.0 / 3.0, 2.0 / 3.0];
    weighted(&p, &b, &d)
}

/**
 * Fifth-order WENO (Jiang and Shu) value at the face between `v2` and `v3`,
 * on the side of `v2`.
 */
fn weno5(v0: f64, v1: f64, v2: f64, v3: f64, v4: f64) -> f64 {
    let p = [
        (2.0 * v0 - 7.0 * v1 + 11.0 * v2) / 6.0,
        (-v1 + 5.0 * v2 + 2.0 * v3) / 6.0,
        (2.0 * v2 + 5.0 * v3 - v4) / 6.0,
    ];
    let b = [
        13.0 / 12.0 * (v0 - 2.0 * v1 + v2).powi(2) + 0.25 * (v0 - 4.0 * v1 + 3.0 * v2).powi(2),
        13.0 / 12.0 * (v1 - 2.0 * v2 + v3).powi(2) + 0.25 * (v1 - v3).powi(2),
        13.0 / 12.0 * (v2 - 2.0 * v3 + v4).powi(2) + 0.25 * (3.0 * v2 - 4.0 * v3 + v4).powi(2),
    ];
    let d = [0.1, 0.6, 0.3];
    weighted(&p, &b, &d)
}

fn weighted(p: &[f64], b: &[f64], d: &[f64]) -> f64 {
    let w: Vec<f64> = b.iter().zip(d).map(|(b, d)| d / (WENO_EPSILON + b).powi(2)).collect();
    let total: f64 = w.iter().sum();
    w.iter().zip(p).map(|(w, p)| w * p).sum::<f64>() / total
}
