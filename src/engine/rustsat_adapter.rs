//! Adapters for rustsat solver backends
//!
//! Wraps rustsat-compatible SAT solvers behind the crate's
//! [`SolverBridge`] trait.

use super::{SolveStatus, SolverBridge};

/// Adapter that lets any rustsat-compatible solver serve as the backend.
///
/// # Example
///
/// ```ignore
/// use rustsat_batsat::BasicSolver;
/// let solver = RustSatAdapter::new(BasicSolver::default());
/// ```
pub struct RustSatAdapter<S> {
    solver: S,
    num_vars: u32,
    num_clauses: u32,
}

/// The default backend: batsat behind the adapter.
pub type BatsatBridge = RustSatAdapter<rustsat_batsat::BasicSolver>;

impl<S> RustSatAdapter<S> {
    /// Creates a new adapter wrapping the given solver
    pub fn new(solver: S) -> Self {
        Self {
            solver,
            num_vars: 0,
            num_clauses: 0,
        }
    }
}

impl Default for BatsatBridge {
    fn default() -> Self {
        Self::new(rustsat_batsat::BasicSolver::default())
    }
}

impl<S: rustsat::solvers::Solve> SolverBridge for RustSatAdapter<S> {
    fn ensure_var_count(&mut self, num_vars: u32) {
        // rustsat creates variables on demand as clauses arrive; only the
        // count is tracked here for the bridge interface
        self.num_vars = self.num_vars.max(num_vars);
    }

    fn add_clause(&mut self, lits: &[i32]) -> bool {
        use rustsat::types::{Clause, Lit, Var};

        debug_assert!(lits.iter().all(|&l| l != 0 && l.unsigned_abs() <= Var::MAX_IDX + 1));
        let lits_vec: Vec<Lit> = lits
            .iter()
            .map(|&lit| {
                let var = Var::new(lit.unsigned_abs() - 1);
                if lit > 0 {
                    var.pos_lit()
                } else {
                    var.neg_lit()
                }
            })
            .collect();

        let clause = Clause::from(&lits_vec[..]);
        self.num_clauses += 1;
        self.solver.add_clause(clause).is_ok()
    }

    fn solve(&mut self) -> SolveStatus {
        use rustsat::solvers::SolverResult;
        match self.solver.solve() {
            Ok(SolverResult::Sat) => SolveStatus::Satisfiable,
            Ok(SolverResult::Unsat) => SolveStatus::Unsatisfiable,
            _ => SolveStatus::Unknown,
        }
    }

    fn value_of(&self, lit: i32) -> bool {
        use rustsat::types::{TernaryVal, Var};
        let var = lit.unsigned_abs();
        if var == 0 || var > self.num_vars {
            return false;
        }
        let v = Var::new(var - 1);
        let value = match self.solver.solution(v) {
            Ok(assignment) => matches!(assignment.var_value(v), TernaryVal::True),
            Err(_) => false,
        };
        if lit < 0 {
            !value
        } else {
            value
        }
    }

    fn num_variables(&self) -> u32 {
        self.num_vars
    }

    fn num_clauses(&self) -> u32 {
        self.num_clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batsat_basic_sat() {
        let mut solver = BatsatBridge::default();

        solver.ensure_var_count(2);
        assert!(solver.add_clause(&[1, 2]));
        assert_eq!(solver.num_clauses(), 1);
        assert_eq!(solver.solve(), SolveStatus::Satisfiable);
    }

    #[test]
    fn batsat_unsat() {
        let mut solver = BatsatBridge::default();

        solver.ensure_var_count(1);
        solver.add_clause(&[1]);
        solver.add_clause(&[-1]);
        assert_eq!(solver.solve(), SolveStatus::Unsatisfiable);
    }

    #[test]
    fn batsat_solution_readback() {
        let mut solver = BatsatBridge::default();

        solver.ensure_var_count(2);
        solver.add_clause(&[1]);
        solver.add_clause(&[-2]);

        assert_eq!(solver.solve(), SolveStatus::Satisfiable);
        assert!(solver.value_of(1));
        assert!(!solver.value_of(2));
        assert!(solver.value_of(-2));
    }
}
