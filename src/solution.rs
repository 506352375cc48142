use serde::{Deserialize, Serialize};
use crate::grid::Grid;
use crate::state::State;




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]

/**
 * The simulation solution: one or more states (patches), all sharing the
 * same simulation time. The common case is a single state.
 */
pub struct Solution {
    pub states: Vec<State>,
}




// ============================================================================
impl Solution {

    pub fn new(state: State) -> Self {
        Self { states: vec![state] }
    }

    pub fn from_states(states: Vec<State>) -> Self {
        Self { states }
    }

    /**
     * The primary state. Every constructed solution holds at least one.
     */
    pub fn state(&self) -> &State {
        &self.states[0]
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.states[0]
    }

    pub fn grid(&self) -> &Grid {
        &self.state().grid
    }

    pub fn ndim(&self) -> usize {
        self.grid().ndim()
    }

    pub fn meqn(&self) -> usize {
        self.state().meqn
    }

    pub fn t(&self) -> f64 {
        self.state().t
    }

    pub fn set_t(&mut self, t: f64) {
        for state in &mut self.states {
            state.t = t;
        }
    }

    /**
     * A solution is valid if it has at least one state, all states are
     * valid, and they agree on the time, the number of equations and the
     * number of grid dimensions.
     */
    pub fn is_valid(&self) -> bool {
        match self.states.first() {
            None => false,
            Some(first) => self.states.iter().all(|s| {
                s.is_valid() && s.t == first.t && s.meqn == first.meqn && s.grid.ndim() == first.grid.ndim()
            }),
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::Solution;
    use crate::grid::{Dimension, Grid};
    use crate::state::State;

    fn state(n: usize) -> State {
        State::new(Grid::new(vec![Dimension::new("x", 0.0, 1.0, n)]), 2)
    }

    #[test]
    fn multi_state_solutions_share_time() {
        let mut solution = Solution::from_states(vec![state(4), state(8)]);
        assert!(solution.is_valid());
        solution.set_t(0.5);
        assert!(solution.states.iter().all(|s| s.t == 0.5));

        solution.states[1].t = 0.25;
        assert!(!solution.is_valid());
    }

    #[test]
    fn empty_solution_is_invalid() {
        assert!(!Solution::from_states(vec![]).is_valid());
        assert!(Solution::new(state(3)).is_valid());
    }
}
