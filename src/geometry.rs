use serde::{Deserialize, Serialize};




/**
 * Enum to identify one of the two faces of the domain along a given axis
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Lower,
    Upper,
}




#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]

/**
 * Rule used to populate the ghost zones outside a domain face.
 */
pub enum BoundaryCondition {
    /// Zero-gradient extrapolation of the nearest interior zone.
    Outflow,
    /// Mirror image of the interior, with the normal velocity negated.
    Reflecting,
    /// Wrap-around copy from the opposite side of the domain.
    Periodic,
}




// ============================================================================
impl BoundaryCondition {

    /**
     * Periodic boundaries have to be paired: if either face along an axis is
     * periodic, the other one must be too.
     */
    pub fn is_consistent_pair(lower: Self, upper: Self) -> bool {
        (lower == BoundaryCondition::Periodic) == (upper == BoundaryCondition::Periodic)
    }
}




// ============================================================================
impl Face {
    pub fn both() -> [Face; 2] {
        [Face::Lower, Face::Upper]
    }
}




#[derive(Clone, Copy, Debug, PartialEq, Eq)]

/**
 * Enum to hold a unit vector along one of the (up to three) grid axes
 */
pub enum Direction {
    I,
    J,
    K,
}




// ============================================================================
impl Direction {

    pub fn along(&self, other: Direction) -> f64 {
        if *self == other {
            1.0
        } else {
            0.0
        }
    }

    pub fn from_axis(axis: usize) -> Option<Self> {
        match axis {
            0 => Some(Direction::I),
            1 => Some(Direction::J),
            2 => Some(Direction::K),
            _ => None,
        }
    }

    pub fn axis(&self) -> usize {
        match self {
            Direction::I => 0,
            Direction::J => 1,
            Direction::K => 2,
        }
    }
}
