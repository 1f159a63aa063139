//! # finmod
//!
//! A SAT-based finite model finder for first-order logic with equality.
//!
//! Given a set of clauses, `finmod` searches for a finite interpretation
//! (a domain `1..=n` with concrete tables for every function and predicate
//! symbol) that satisfies all of them. The question "is there a model of
//! size `n`?" is reduced to propositional satisfiability, delegated to a
//! SAT backend, and `n` grows until a model appears, a derived size bound
//! turns unsatisfiability into a refutation, or resources run out.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finmod::search::{ModelFinder, Options};
//! use finmod::term::{Clause, Literal, Problem, Signature, Term};
//!
//! // f(a) = a
//! let mut sig = Signature::new();
//! let a = sig.add_constant("a");
//! let f = sig.add_function("f", 1);
//! let clause = Clause::new(vec![Literal::eq(
//!     Term::app(f, vec![Term::constant(a)]),
//!     Term::constant(a),
//! )]);
//!
//! let problem = Problem::new(sig, vec![clause]);
//! let outcome = ModelFinder::new(Options::default()).run(&problem)?;
//!
//! if let Some(model) = outcome.model() {
//!     println!("{}", model);
//! }
//! ```

#![warn(missing_docs)]

/// First-order signature, terms, literals, clauses and the problem input
pub mod term;

/// Clause flattening and variable normalisation
pub mod flatten;

/// Sort inference over argument positions
pub mod sorts;

/// Symbol ordering and grounded-term sequences for symmetry breaking
pub mod symmetry;

/// Propositional variable layout and clause-group emission
pub mod encoder;

/// The model-size search loop
pub mod search;

/// Finite model representation and extraction
pub mod model;

/// SAT backend trait and implementations
pub mod engine;

/// Error types
pub mod error {
    //! Error types for finmod

    use thiserror::Error;

    /// Errors that can abort a search
    #[derive(Error, Debug)]
    pub enum FinmodError {
        /// Writing a DIMACS snapshot failed
        #[error("i/o error: {0}")]
        Io(#[from] std::io::Error),
    }

    /// Result type for finmod operations
    pub type Result<T> = std::result::Result<T, FinmodError>;
}

pub use error::{FinmodError, Result};
pub use model::FiniteModel;
pub use search::{ModelFinder, Options, Outcome};
pub use term::{Clause, Literal, Problem, Signature, Term};
