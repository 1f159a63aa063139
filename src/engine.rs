//! SAT backend trait and implementations

pub mod rustsat_adapter;

/// Verdict of a SAT backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// A satisfying assignment was found
    Satisfiable,
    /// The clause set is unsatisfiable
    Unsatisfiable,
    /// The backend gave up (resource limits, unsupported input)
    Unknown,
}

/// Core SAT backend trait.
///
/// Variables are 1-indexed; literals are signed integers, negative for
/// negated variables (DIMACS convention). Callers are expected to remove
/// duplicate literals before adding a clause; the empty clause signals
/// immediate unsatisfiability.
pub trait SolverBridge {
    /// Announces that variables will range over `1..=num_vars`
    fn ensure_var_count(&mut self, num_vars: u32);

    /// Adds a clause; returns false when the backend rejects it
    /// (out of memory or a broken solver state)
    fn add_clause(&mut self, lits: &[i32]) -> bool;

    /// Solves the clause set added so far
    fn solve(&mut self) -> SolveStatus;

    /// Truth value of a literal under the last satisfying assignment.
    /// Only meaningful after `solve` returned [`SolveStatus::Satisfiable`].
    fn value_of(&self, lit: i32) -> bool;

    /// Number of variables announced
    fn num_variables(&self) -> u32;

    /// Number of clauses added
    fn num_clauses(&self) -> u32;
}

/// A scriptable backend for tests.
///
/// Records every clause it is given, answers `solve` from a prepared
/// script, and reads assignments from a set of true variables installed by
/// the test.
pub struct RecordingSolver {
    num_vars: u32,
    clauses: Vec<Vec<i32>>,
    script: std::collections::VecDeque<SolveStatus>,
    true_vars: rustc_hash::FxHashSet<u32>,
}

impl RecordingSolver {
    /// Creates a backend that answers `Unsatisfiable` forever
    pub fn new() -> Self {
        Self {
            num_vars: 0,
            clauses: Vec::new(),
            script: std::collections::VecDeque::new(),
            true_vars: rustc_hash::FxHashSet::default(),
        }
    }

    /// Creates a backend answering the scripted statuses in order, then
    /// `Unsatisfiable`
    pub fn with_script(script: impl IntoIterator<Item = SolveStatus>) -> Self {
        let mut solver = Self::new();
        solver.script = script.into_iter().collect();
        solver
    }

    /// Marks a variable true in the assignment reported after a
    /// `Satisfiable` verdict
    pub fn set_true(&mut self, var: u32) {
        self.true_vars.insert(var);
    }

    /// The clauses added so far
    pub fn clauses(&self) -> &[Vec<i32>] {
        &self.clauses
    }
}

impl Default for RecordingSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBridge for RecordingSolver {
    fn ensure_var_count(&mut self, num_vars: u32) {
        self.num_vars = self.num_vars.max(num_vars);
    }

    fn add_clause(&mut self, lits: &[i32]) -> bool {
        self.clauses.push(lits.to_vec());
        true
    }

    fn solve(&mut self) -> SolveStatus {
        self.script
            .pop_front()
            .unwrap_or(SolveStatus::Unsatisfiable)
    }

    fn value_of(&self, lit: i32) -> bool {
        let value = self.true_vars.contains(&lit.unsigned_abs());
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
        self.clauses.len() as u32
    }
}
