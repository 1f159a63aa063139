//! The model-size search loop
//!
//! Drives the domain size upward from a starting point. Each round builds
//! a fresh variable layout and SAT backend, encodes the clause set at the
//! current size, and asks the backend for a verdict: a satisfying
//! assignment becomes a finite model, unsatisfiability past the derived
//! model-size bound becomes a refutation, and resource exhaustion
//! (wall-clock or variable-space) ends the search without a verdict.

use crate::encoder::{ClauseBuffer, Encoder, VarLayout};
use crate::engine::rustsat_adapter::BatsatBridge;
use crate::engine::{SolveStatus, SolverBridge};
use crate::flatten::{self, FlatClause, FlatLiteral};
use crate::model::{self, FiniteModel};
use crate::sorts::{self, SortedSignature, NO_BOUND};
use crate::symmetry::{self, SymbolOrder, SymbolOrderPolicy, WidgetOrder};
use crate::term::Problem;
use crate::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Identifier of the SAT engine used by [`ModelFinder::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SatBackend {
    /// batsat through the rustsat adapter
    #[default]
    Batsat,
}

/// Search options. All fields have defaults.
#[derive(Debug, Clone)]
pub struct Options {
    /// Initial domain size (≥ 1)
    pub start_size: usize,
    /// Start at the number of constants instead of `start_size`
    pub use_constants_as_start: bool,
    /// Scales the canonicity window; 0 disables canonicity clauses
    pub symmetry_ratio: f64,
    /// Widget interleaving for grounded-term sequences
    pub widget_order: WidgetOrder,
    /// Symbol ordering within sorts
    pub symbol_order: SymbolOrderPolicy,
    /// SAT engine for [`ModelFinder::run`]
    pub sat_backend: SatBackend,
    /// Wall-clock budget; polled between phases and rounds
    pub time_limit: Option<Duration>,
    /// When set, a DIMACS snapshot `fmb<n>.cnf` of every round's CNF is
    /// written into this directory
    pub dimacs_dir: Option<PathBuf>,
    /// Emit the clause requiring the full domain to be used (only applies
    /// while no function has arity above 1)
    pub use_model_size_cap: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            start_size: 1,
            use_constants_as_start: false,
            symmetry_ratio: 1.0,
            widget_order: WidgetOrder::default(),
            symbol_order: SymbolOrderPolicy::default(),
            sat_backend: SatBackend::default(),
            time_limit: None,
            dimacs_dir: None,
            use_model_size_cap: false,
        }
    }
}

/// Counters and timings accumulated over one search.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    rounds: u32,
    last_size: usize,
    num_variables: u32,
    num_clauses: u32,
    preparation_time: Duration,
    encoding_time: Duration,
    solving_time: Duration,
}

impl Statistics {
    /// Number of rounds attempted
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Domain size of the last round
    pub fn last_size(&self) -> usize {
        self.last_size
    }

    /// SAT variable count of the last round
    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    /// SAT clause count of the last round
    pub fn num_clauses(&self) -> u32 {
        self.num_clauses
    }

    /// Time spent flattening, inferring sorts and computing bounds
    pub fn preparation_time(&self) -> Duration {
        self.preparation_time
    }

    /// Total time spent encoding across rounds
    pub fn encoding_time(&self) -> Duration {
        self.encoding_time
    }

    /// Total time spent inside the SAT backend across rounds
    pub fn solving_time(&self) -> Duration {
        self.solving_time
    }
}

/// Result of a search.
#[derive(Debug)]
pub enum Outcome {
    /// A finite model was found
    Satisfiable {
        /// The extracted interpretation
        model: FiniteModel,
        /// Search statistics
        stats: Statistics,
    },
    /// No model of any size exists; stands for the empty clause derived
    /// from exhausting the model-size bound (or from preparation)
    Refutation {
        /// Search statistics
        stats: Statistics,
    },
    /// The wall-clock budget ran out
    TimeLimit {
        /// Search statistics
        stats: Statistics,
    },
    /// No verdict: incomplete input, variable-space overflow, or the
    /// backend gave up
    Unknown {
        /// Search statistics
        stats: Statistics,
    },
}

impl Outcome {
    /// True when a model was found
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, Outcome::Satisfiable { .. })
    }

    /// True for a (bounded) refutation
    pub fn is_refutation(&self) -> bool {
        matches!(self, Outcome::Refutation { .. })
    }

    /// The model, when satisfiable
    pub fn model(&self) -> Option<&FiniteModel> {
        match self {
            Outcome::Satisfiable { model, .. } => Some(model),
            _ => None,
        }
    }

    /// The statistics of the search
    pub fn statistics(&self) -> &Statistics {
        match self {
            Outcome::Satisfiable { stats, .. }
            | Outcome::Refutation { stats }
            | Outcome::TimeLimit { stats }
            | Outcome::Unknown { stats } => stats,
        }
    }
}

/// The finite model finder.
pub struct ModelFinder {
    options: Options,
}

impl ModelFinder {
    /// Creates a finder with the given options
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Runs the search with the configured SAT backend.
    pub fn run(&self, problem: &Problem) -> Result<Outcome> {
        match self.options.sat_backend {
            SatBackend::Batsat => self.run_with(problem, BatsatBridge::default),
        }
    }

    /// Runs the search with a caller-supplied backend factory; a fresh
    /// backend is created for every round.
    pub fn run_with<B, F>(&self, problem: &Problem, mut new_bridge: F) -> Result<Outcome>
    where
        B: SolverBridge,
        F: FnMut() -> B,
    {
        let mut stats = Statistics::default();

        if !problem.complete {
            tracing::info!("options are incomplete for this problem, giving up");
            return Ok(Outcome::Unknown { stats });
        }

        let start = Instant::now();
        let deadline = self.options.time_limit.map(|limit| start + limit);

        let prepared = match flatten::prepare(problem) {
            Ok(prepared) => prepared,
            Err(flatten::RefutationFound) => {
                tracing::info!("empty clause derived during preparation");
                return Ok(Outcome::Refutation { stats });
            }
        };
        let del_f = problem.deleted_function_flags();
        let del_p = problem.deleted_predicate_flags();

        let mut sorted = sorts::infer(&problem.signature, &prepared, &del_f, &del_p);
        let order = SymbolOrder::new(
            &problem.signature,
            &prepared.clauses,
            self.options.symbol_order,
        );
        order.apply(&mut sorted, self.options.symbol_order);

        let cbounds: Vec<Vec<u32>> = prepared
            .clauses
            .iter()
            .map(|c| clause_bounds(c, &sorted))
            .collect();

        let mut constant_count = 0usize;
        let mut max_arity = 0usize;
        for f in 0..problem.signature.functions() {
            if del_f[f] {
                continue;
            }
            let arity = problem.signature.function_arity(f);
            if arity == 0 {
                constant_count += 1;
            }
            max_arity = max_arity.max(arity);
        }

        // Effectively propositional problems cannot grow past their
        // constants: no function introduces new elements.
        let mut max_model_size = prepared.max_model_size;
        if max_arity == 0 {
            let constants = sorted
                .distinct_constants
                .iter()
                .copied()
                .max()
                .unwrap_or(0)
                .max(1);
            max_model_size = max_model_size.min(constants);
        }
        if max_model_size < u32::MAX {
            tracing::info!(max_model_size, "detected maximum model size");
        }

        stats.preparation_time = start.elapsed();

        let mut size = if self.options.use_constants_as_start {
            constant_count.max(1)
        } else {
            self.options.start_size.max(1)
        };

        loop {
            stats.rounds += 1;
            stats.last_size = size;
            if out_of_time(deadline) {
                return Ok(Outcome::TimeLimit { stats });
            }
            tracing::debug!(size, "trying model size");

            let Some(layout) = VarLayout::build(&problem.signature, &del_f, &del_p, size) else {
                tracing::info!(size, "cannot represent all propositional literals internally");
                return Ok(Outcome::Unknown { stats });
            };
            let grounded = symmetry::grounded_terms(
                &problem.signature,
                &sorted,
                size,
                self.options.widget_order,
            );

            let encode_start = Instant::now();
            let mut encoder =
                Encoder::new(&problem.signature, &sorted, &layout, &del_f, &del_p);
            encoder.add_ground_clauses(&prepared.ground);
            encoder.add_instances(&prepared.clauses, &cbounds);
            encoder.add_functionality();
            encoder.add_symmetry(&grounded, self.options.symmetry_ratio);
            encoder.add_totality();
            if self.options.use_model_size_cap {
                encoder.add_use_model_size(&grounded);
            }
            let buffer = encoder.finish();
            stats.encoding_time += encode_start.elapsed();
            stats.num_variables = layout.total_vars();
            stats.num_clauses = buffer.len() as u32;

            if let Some(dir) = &self.options.dimacs_dir {
                write_dimacs(dir, size, layout.total_vars(), &buffer)?;
            }

            let mut bridge = new_bridge();
            bridge.ensure_var_count(layout.total_vars());
            let mut rejected = false;
            for clause in buffer.iter() {
                if !bridge.add_clause(clause) {
                    rejected = true;
                    break;
                }
            }
            if rejected {
                tracing::error!(size, "sat backend rejected a clause, giving up");
                return Ok(Outcome::Unknown { stats });
            }

            if out_of_time(deadline) {
                return Ok(Outcome::TimeLimit { stats });
            }

            let solve_start = Instant::now();
            let status = bridge.solve();
            let solve_time = solve_start.elapsed();
            stats.solving_time += solve_time;
            tracing::debug!(size, ?status, ?solve_time, "sat backend verdict");

            match status {
                SolveStatus::Satisfiable => {
                    tracing::info!(size, "found model");
                    let model = model::extract(
                        &bridge,
                        &layout,
                        &problem.signature,
                        &del_f,
                        &del_p,
                        &problem.deleted_functions,
                        &problem.deleted_predicates,
                    );
                    return Ok(Outcome::Satisfiable { model, stats });
                }
                SolveStatus::Unknown => {
                    tracing::info!(size, "sat backend gave up");
                    return Ok(Outcome::Unknown { stats });
                }
                SolveStatus::Unsatisfiable => {}
            }

            if (size as u64) >= (max_model_size as u64) {
                if max_arity == 0 {
                    tracing::info!("checked all constants of an effectively propositional problem");
                } else {
                    tracing::info!("all larger models are excluded by a distinctness constraint");
                }
                return Ok(Outcome::Refutation { stats });
            }

            // this round's buffer and backend are dropped before the next
            // size is attempted
            size += 1;
        }
    }
}

fn out_of_time(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Per-variable sort bounds of a clause, read off the symbol positions the
/// variable occupies. Variables occurring only in two-variable equalities
/// are unbounded.
fn clause_bounds(clause: &FlatClause, sorted: &SortedSignature) -> Vec<u32> {
    fn set(bounds: &mut [u32], v: usize, bound: u32) {
        if bounds[v] != 0 {
            debug_assert_eq!(bounds[v], bound, "variable occupies differently bounded sorts");
        } else {
            bounds[v] = bound;
        }
    }

    let mut bounds = vec![0u32; clause.var_count];
    for lit in &clause.literals {
        match lit {
            FlatLiteral::VarEq { .. } => {}
            FlatLiteral::FuncEq {
                func, args, res, ..
            } => {
                let fb = &sorted.function_bounds[*func];
                set(&mut bounds, *res, fb[0]);
                for (i, &a) in args.iter().enumerate() {
                    set(&mut bounds, a, fb[i + 1]);
                }
            }
            FlatLiteral::Pred { pred, args, .. } => {
                let pb = &sorted.predicate_bounds[*pred];
                for (i, &a) in args.iter().enumerate() {
                    set(&mut bounds, a, pb[i]);
                }
            }
        }
    }
    for b in &mut bounds {
        if *b == 0 {
            *b = NO_BOUND;
        }
    }
    bounds
}

fn write_dimacs(dir: &Path, size: usize, num_vars: u32, buffer: &ClauseBuffer) -> Result<()> {
    let path = dir.join(format!("fmb{}.cnf", size));
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "p cnf {} {}", num_vars.saturating_sub(1), buffer.len())?;
    for clause in buffer.iter() {
        for lit in clause {
            write!(out, "{} ", lit)?;
        }
        writeln!(out, "0")?;
    }
    out.flush()?;
    Ok(())
}
