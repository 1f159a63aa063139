//! First-order signature, terms, literals and clauses
//!
//! This module is the read-only term view the rest of the crate works
//! against: a [`Signature`] of function and predicate symbols, [`Term`]s and
//! [`Literal`]s built over it, and the [`Problem`] input object bundling the
//! clause set with the leftovers of upstream preprocessing (eliminated
//! symbols and their definitions).

use std::fmt;

/// Index of a function symbol in a [`Signature`].
pub type FuncId = usize;

/// Index of a predicate symbol in a [`Signature`].
///
/// Index 0 is reserved for the built-in equality predicate and is never a
/// user predicate.
pub type PredId = usize;

/// Index of a logical variable, local to a clause.
pub type VarId = usize;

/// A function symbol with its arity.
///
/// `usage_count` carries the occurrence count accumulated by upstream
/// preprocessing; it is only consulted by the `PreprocessedUsage` symbol
/// ordering policy.
#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    name: String,
    arity: usize,
    usage_count: u32,
}

impl FunctionSymbol {
    /// Returns the name of this symbol
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arity of this symbol
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the usage count recorded by preprocessing
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }
}

/// A predicate symbol with its arity.
#[derive(Debug, Clone)]
pub struct PredicateSymbol {
    name: String,
    arity: usize,
}

impl PredicateSymbol {
    /// Returns the name of this symbol
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arity of this symbol
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// The symbol table of a problem.
///
/// Symbols are registered up front and addressed by dense indices.
/// Predicate index 0 is pre-registered as the equality predicate; equality
/// is handled structurally (as [`Literal::Equality`]) and the slot exists
/// only so that user predicates start at 1.
#[derive(Debug, Clone)]
pub struct Signature {
    functions: Vec<FunctionSymbol>,
    predicates: Vec<PredicateSymbol>,
}

impl Signature {
    /// Creates an empty signature with the reserved equality predicate.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            predicates: vec![PredicateSymbol {
                name: "=".to_string(),
                arity: 2,
            }],
        }
    }

    /// Registers a function symbol and returns its id.
    pub fn add_function(&mut self, name: impl Into<String>, arity: usize) -> FuncId {
        self.functions.push(FunctionSymbol {
            name: name.into(),
            arity,
            usage_count: 0,
        });
        self.functions.len() - 1
    }

    /// Registers a constant (nullary function symbol).
    pub fn add_constant(&mut self, name: impl Into<String>) -> FuncId {
        self.add_function(name, 0)
    }

    /// Registers a predicate symbol and returns its id (always ≥ 1).
    pub fn add_predicate(&mut self, name: impl Into<String>, arity: usize) -> PredId {
        self.predicates.push(PredicateSymbol {
            name: name.into(),
            arity,
        });
        self.predicates.len() - 1
    }

    /// Number of function symbols
    pub fn functions(&self) -> usize {
        self.functions.len()
    }

    /// Number of predicate symbols, including the reserved slot 0
    pub fn predicates(&self) -> usize {
        self.predicates.len()
    }

    /// Looks up a function symbol
    pub fn function(&self, f: FuncId) -> &FunctionSymbol {
        &self.functions[f]
    }

    /// Looks up a predicate symbol
    pub fn predicate(&self, p: PredId) -> &PredicateSymbol {
        &self.predicates[p]
    }

    /// Arity of a function symbol
    pub fn function_arity(&self, f: FuncId) -> usize {
        self.functions[f].arity
    }

    /// Arity of a predicate symbol
    pub fn predicate_arity(&self, p: PredId) -> usize {
        self.predicates[p].arity
    }

    /// Records a preprocessing usage count for a function symbol.
    pub fn set_usage_count(&mut self, f: FuncId, count: u32) {
        self.functions[f].usage_count = count;
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::new()
    }
}

/// A first-order term: a variable or a function application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A logical variable
    Var(VarId),
    /// A function symbol applied to argument terms
    App {
        /// The applied function symbol
        func: FuncId,
        /// Argument terms, one per arity position
        args: Vec<Term>,
    },
}

impl Term {
    /// Creates a variable term
    pub fn var(v: VarId) -> Self {
        Term::Var(v)
    }

    /// Creates an application term
    pub fn app(func: FuncId, args: Vec<Term>) -> Self {
        Term::App { func, args }
    }

    /// Creates a constant term (nullary application)
    pub fn constant(func: FuncId) -> Self {
        Term::App {
            func,
            args: Vec::new(),
        }
    }

    /// Returns the variable id if this is a variable term
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(*v),
            Term::App { .. } => None,
        }
    }

    /// Returns true if this term is a constant
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::App { args, .. } if args.is_empty())
    }

    /// The largest variable id occurring in the term, if any
    pub fn max_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(*v),
            Term::App { args, .. } => args.iter().filter_map(Term::max_var).max(),
        }
    }
}

/// A literal: an (in)equation between terms or a predicate atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// `lhs = rhs` (positive) or `lhs ≠ rhs` (negative)
    Equality {
        /// True for `=`, false for `≠`
        polarity: bool,
        /// Left-hand side
        lhs: Term,
        /// Right-hand side
        rhs: Term,
    },
    /// `p(args)` (positive) or `¬p(args)` (negative)
    Predicate {
        /// True for the atom, false for its negation
        polarity: bool,
        /// The predicate symbol
        pred: PredId,
        /// Argument terms, one per arity position
        args: Vec<Term>,
    },
}

impl Literal {
    /// Creates a positive equation `lhs = rhs`
    pub fn eq(lhs: Term, rhs: Term) -> Self {
        Literal::Equality {
            polarity: true,
            lhs,
            rhs,
        }
    }

    /// Creates a negative equation `lhs ≠ rhs`
    pub fn neq(lhs: Term, rhs: Term) -> Self {
        Literal::Equality {
            polarity: false,
            lhs,
            rhs,
        }
    }

    /// Creates a positive predicate atom
    pub fn pred(pred: PredId, args: Vec<Term>) -> Self {
        Literal::Predicate {
            polarity: true,
            pred,
            args,
        }
    }

    /// Creates a negated predicate atom
    pub fn npred(pred: PredId, args: Vec<Term>) -> Self {
        Literal::Predicate {
            polarity: false,
            pred,
            args,
        }
    }

    /// The largest variable id occurring in the literal, if any
    pub fn max_var(&self) -> Option<VarId> {
        match self {
            Literal::Equality { lhs, rhs, .. } => lhs.max_var().max(rhs.max_var()),
            Literal::Predicate { args, .. } => args.iter().filter_map(Term::max_var).max(),
        }
    }
}

/// A clause: a disjunction of literals, implicitly universally quantified.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    /// The disjuncts
    pub literals: Vec<Literal>,
}

impl Clause {
    /// Creates a clause from its literals
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals }
    }

    /// Returns true for the empty clause
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

/// Definition of a function symbol eliminated by preprocessing:
/// `func(vars) = body`.
#[derive(Debug, Clone)]
pub struct DeletedFunction {
    /// The eliminated symbol
    pub func: FuncId,
    /// The argument variables of the definition head
    pub vars: Vec<VarId>,
    /// The defining term over `vars`
    pub body: Term,
}

/// Body of an eliminated-predicate definition.
///
/// A small formula language, just rich enough to express the definitions
/// preprocessing produces (fixed truth values for pure predicates, literal
/// bodies and their boolean combinations).
#[derive(Debug, Clone)]
pub enum PredDef {
    /// Constant true
    True,
    /// Constant false
    False,
    /// A single literal body
    Literal(Literal),
    /// Negation
    Not(Box<PredDef>),
    /// Conjunction
    And(Vec<PredDef>),
    /// Disjunction
    Or(Vec<PredDef>),
}

/// Definition of a predicate symbol eliminated by preprocessing:
/// `pred(vars) ⟺ body`.
#[derive(Debug, Clone)]
pub struct DeletedPredicate {
    /// The eliminated symbol
    pub pred: PredId,
    /// The argument variables of the definition head
    pub vars: Vec<VarId>,
    /// The defining formula over `vars`
    pub body: PredDef,
}

/// The model-finding input: a signature, a clause set, and the outputs of
/// upstream preprocessing that model extraction must compensate for.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Symbol table
    pub signature: Signature,
    /// The clause set to satisfy
    pub clauses: Vec<Clause>,
    /// Function symbols eliminated by preprocessing, in elimination order
    pub deleted_functions: Vec<DeletedFunction>,
    /// Predicate symbols eliminated by preprocessing, in elimination order
    pub deleted_predicates: Vec<DeletedPredicate>,
    /// False when the upstream option profile makes model finding
    /// incomplete for this problem; the search then reports unknown
    /// without doing any work.
    pub complete: bool,
}

impl Problem {
    /// Creates a problem over a signature and clause set, with no
    /// eliminated symbols.
    pub fn new(signature: Signature, clauses: Vec<Clause>) -> Self {
        Self {
            signature,
            clauses,
            deleted_functions: Vec::new(),
            deleted_predicates: Vec::new(),
            complete: true,
        }
    }

    /// Marks function symbols eliminated by preprocessing.
    pub fn deleted_function_flags(&self) -> Vec<bool> {
        let mut del = vec![false; self.signature.functions()];
        for d in &self.deleted_functions {
            del[d.func] = true;
        }
        del
    }

    /// Marks predicate symbols eliminated by preprocessing.
    pub fn deleted_predicate_flags(&self) -> Vec<bool> {
        let mut del = vec![false; self.signature.predicates()];
        for d in &self.deleted_predicates {
            del[d.pred] = true;
        }
        del
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "X{}", v),
            Term::App { func, args } => {
                write!(f, "f{}", func)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_reserves_equality_slot() {
        let mut sig = Signature::new();
        assert_eq!(sig.predicates(), 1);
        assert_eq!(sig.predicate(0).name(), "=");

        let p = sig.add_predicate("p", 1);
        assert_eq!(p, 1);
        assert_eq!(sig.predicate_arity(p), 1);
    }

    #[test]
    fn register_symbols() {
        let mut sig = Signature::new();
        let a = sig.add_constant("a");
        let f = sig.add_function("f", 2);

        assert_eq!(sig.functions(), 2);
        assert_eq!(sig.function_arity(a), 0);
        assert_eq!(sig.function_arity(f), 2);
        assert_eq!(sig.function(f).name(), "f");
    }

    #[test]
    fn term_max_var() {
        let mut sig = Signature::new();
        let f = sig.add_function("f", 2);

        let t = Term::app(f, vec![Term::var(3), Term::app(f, vec![Term::var(7), Term::var(0)])]);
        assert_eq!(t.max_var(), Some(7));
        assert_eq!(Term::constant(f).max_var(), None);
    }

    #[test]
    fn deleted_flags() {
        let mut sig = Signature::new();
        let a = sig.add_constant("a");
        let g = sig.add_constant("g");

        let mut prb = Problem::new(sig, vec![]);
        prb.deleted_functions.push(DeletedFunction {
            func: g,
            vars: vec![],
            body: Term::constant(a),
        });

        let del = prb.deleted_function_flags();
        assert!(!del[a]);
        assert!(del[g]);
    }
}
