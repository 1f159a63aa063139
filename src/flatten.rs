//! Clause preparation: flattening and variable normalisation
//!
//! Rewrites arbitrary input clauses into *flat* clauses: every literal is a
//! variable (dis)equality `x = y`, a definition equality `f(x̄) = y` over
//! distinct variables, or a predicate atom over variables. Non-variable
//! subterms are extracted into fresh variables guarded by negative
//! definition literals (`C ∨ L[t]` becomes `t ≠ x ∨ C ∨ L[x]`). Variables
//! are renumbered dense-from-0 per clause, and clauses without variables
//! are split off as propositional ground clauses.

use crate::term::{Clause, FuncId, Literal, PredId, Problem, Term, VarId};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// A literal of a flat clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatLiteral {
    /// `x = y` / `x ≠ y` between two distinct variables
    VarEq {
        /// True for `=`, false for `≠`
        polarity: bool,
        /// First variable
        x: VarId,
        /// Second variable
        y: VarId,
    },
    /// `f(args) = res` / `f(args) ≠ res` with variable arguments
    FuncEq {
        /// True for `=`, false for `≠`
        polarity: bool,
        /// Head function symbol
        func: FuncId,
        /// Argument variables
        args: Vec<VarId>,
        /// Result variable
        res: VarId,
    },
    /// `p(args)` / `¬p(args)` with variable arguments
    Pred {
        /// True for the atom, false for its negation
        polarity: bool,
        /// Predicate symbol
        pred: PredId,
        /// Argument variables
        args: Vec<VarId>,
    },
}

/// A flat, variable-normalised clause with at least one variable.
#[derive(Debug, Clone)]
pub struct FlatClause {
    /// The flat literals
    pub literals: Vec<FlatLiteral>,
    /// Number of distinct variables; ids are dense in `0..var_count`
    pub var_count: usize,
}

/// A variable-free clause. Flattening guarantees these consist of nullary
/// predicate literals only.
#[derive(Debug, Clone)]
pub struct GroundClause {
    /// `(predicate, polarity)` per literal
    pub literals: Vec<(PredId, bool)>,
}

/// Marker returned when preparation derives the empty clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefutationFound;

/// The output of clause preparation.
#[derive(Debug)]
pub struct PreparedClauses {
    /// Non-ground flat clauses
    pub clauses: Vec<FlatClause>,
    /// Propositional ground clauses
    pub ground: Vec<GroundClause>,
    /// Constant pairs asserted equal by unit ground equalities, harvested
    /// before flattening for sort-bound refinement
    pub constant_identities: Vec<(FuncId, FuncId)>,
    /// Model-size cap derived from all-positive two-variable-equality
    /// clauses; `u32::MAX` when no such clause exists
    pub max_model_size: u32,
}

/// Flattens and normalises every clause of the problem.
pub fn prepare(problem: &Problem) -> Result<PreparedClauses, RefutationFound> {
    let mut prepared = PreparedClauses {
        clauses: Vec::new(),
        ground: Vec::new(),
        constant_identities: Vec::new(),
        max_model_size: u32::MAX,
    };

    for clause in &problem.clauses {
        if let [Literal::Equality {
            polarity: true,
            lhs,
            rhs,
        }] = clause.literals.as_slice()
        {
            if lhs.is_constant() && rhs.is_constant() {
                let (Term::App { func: cl, .. }, Term::App { func: cr, .. }) = (lhs, rhs) else {
                    unreachable!()
                };
                prepared.constant_identities.push((*cl, *cr));
            }
        }

        let Some(literals) = flatten_clause(clause)? else {
            continue; // tautology
        };
        let (literals, var_count) = normalise(literals);

        if var_count == 0 {
            let ground = literals
                .iter()
                .map(|lit| match lit {
                    FlatLiteral::Pred {
                        polarity,
                        pred,
                        args,
                    } => {
                        debug_assert!(args.is_empty());
                        (*pred, *polarity)
                    }
                    _ => unreachable!("variable-free flat literals are nullary atoms"),
                })
                .collect();
            prepared.ground.push(GroundClause { literals: ground });
        } else {
            let all_pos_eq = literals
                .iter()
                .all(|l| matches!(l, FlatLiteral::VarEq { polarity: true, .. }));
            if all_pos_eq && (var_count as u32) < prepared.max_model_size {
                prepared.max_model_size = var_count as u32;
            }
            prepared.clauses.push(FlatClause {
                literals,
                var_count,
            });
        }
    }

    Ok(prepared)
}

/// Per-clause subterm extraction state.
struct Extraction {
    next_var: VarId,
    extracted: IndexMap<Term, VarId>,
    defs: Vec<FlatLiteral>,
}

impl Extraction {
    fn new(clause: &Clause) -> Self {
        let next_var = clause
            .literals
            .iter()
            .filter_map(Literal::max_var)
            .max()
            .map_or(0, |v| v + 1);
        Self {
            next_var,
            extracted: IndexMap::new(),
            defs: Vec::new(),
        }
    }

    fn fresh(&mut self) -> VarId {
        let v = self.next_var;
        self.next_var += 1;
        v
    }

    /// Returns a variable naming `term`, extracting it (and its subterms)
    /// behind a negative definition literal if it is not a variable.
    /// Identical subterms within a clause share one extraction variable.
    fn var_of(&mut self, term: &Term) -> VarId {
        match term {
            Term::Var(v) => *v,
            Term::App { func, args } => {
                if let Some(&v) = self.extracted.get(term) {
                    return v;
                }
                let arg_vars: Vec<VarId> = args.iter().map(|a| self.var_of(a)).collect();
                let v = self.fresh();
                self.extracted.insert(term.clone(), v);
                self.defs.push(FlatLiteral::FuncEq {
                    polarity: false,
                    func: *func,
                    args: arg_vars,
                    res: v,
                });
                v
            }
        }
    }
}

/// Flattens one clause. Returns `None` for tautologies, an error when the
/// clause flattens to the empty clause.
fn flatten_clause(clause: &Clause) -> Result<Option<Vec<FlatLiteral>>, RefutationFound> {
    let mut ex = Extraction::new(clause);
    let mut lits = Vec::with_capacity(clause.literals.len());

    for lit in &clause.literals {
        match lit {
            Literal::Equality { polarity, lhs, rhs } => match (lhs.as_var(), rhs.as_var()) {
                (Some(x), Some(y)) => {
                    if x == y {
                        if *polarity {
                            return Ok(None); // x = x satisfies the clause
                        }
                        continue; // x ≠ x can never hold
                    }
                    lits.push(FlatLiteral::VarEq {
                        polarity: *polarity,
                        x,
                        y,
                    });
                }
                (head, var) => {
                    // Orient as head-term = result-variable; a second
                    // non-variable side is extracted first.
                    let (head_term, res) = match (head, var) {
                        (None, Some(y)) => (lhs, y),
                        (Some(x), None) => (rhs, x),
                        (None, None) => (lhs, ex.var_of(rhs)),
                        (Some(_), Some(_)) => unreachable!(),
                    };
                    let Term::App { func, args } = head_term else {
                        unreachable!()
                    };
                    let arg_vars: Vec<VarId> = args.iter().map(|a| ex.var_of(a)).collect();
                    lits.push(FlatLiteral::FuncEq {
                        polarity: *polarity,
                        func: *func,
                        args: arg_vars,
                        res,
                    });
                }
            },
            Literal::Predicate {
                polarity,
                pred,
                args,
            } => {
                let arg_vars: Vec<VarId> = args.iter().map(|a| ex.var_of(a)).collect();
                lits.push(FlatLiteral::Pred {
                    polarity: *polarity,
                    pred: *pred,
                    args: arg_vars,
                });
            }
        }
    }

    let mut literals = ex.defs;
    literals.extend(lits);
    if literals.is_empty() {
        return Err(RefutationFound);
    }
    Ok(Some(literals))
}

/// Renumbers variables dense-from-0 in order of first occurrence.
fn normalise(mut literals: Vec<FlatLiteral>) -> (Vec<FlatLiteral>, usize) {
    let mut renaming: FxHashMap<VarId, VarId> = FxHashMap::default();
    fn rename(v: &mut VarId, renaming: &mut FxHashMap<VarId, VarId>) {
        let next = renaming.len();
        *v = *renaming.entry(*v).or_insert(next);
    }

    for lit in &mut literals {
        match lit {
            FlatLiteral::VarEq { x, y, .. } => {
                rename(x, &mut renaming);
                rename(y, &mut renaming);
            }
            FlatLiteral::FuncEq { args, res, .. } => {
                for a in args {
                    rename(a, &mut renaming);
                }
                rename(res, &mut renaming);
            }
            FlatLiteral::Pred { args, .. } => {
                for a in args {
                    rename(a, &mut renaming);
                }
            }
        }
    }

    let var_count = renaming.len();
    (literals, var_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Signature;

    #[test]
    fn ground_propositional_clauses_stay_ground() {
        let mut sig = Signature::new();
        let p = sig.add_predicate("p", 0);
        let q = sig.add_predicate("q", 0);

        let prb = Problem::new(
            sig,
            vec![
                Clause::new(vec![Literal::pred(p, vec![]), Literal::pred(q, vec![])]),
                Clause::new(vec![Literal::npred(p, vec![])]),
            ],
        );
        let prepared = prepare(&prb).unwrap();

        assert!(prepared.clauses.is_empty());
        assert_eq!(prepared.ground.len(), 2);
        assert_eq!(prepared.ground[0].literals, vec![(p, true), (q, true)]);
        assert_eq!(prepared.ground[1].literals, vec![(p, false)]);
    }

    #[test]
    fn function_equation_flattens_with_shared_extraction() {
        let mut sig = Signature::new();
        let a = sig.add_constant("a");
        let f = sig.add_function("f", 1);

        // f(a) = a  becomes  a ≠ X0 ∨ f(X0) = X0
        let prb = Problem::new(
            sig,
            vec![Clause::new(vec![Literal::eq(
                Term::app(f, vec![Term::constant(a)]),
                Term::constant(a),
            )])],
        );
        let prepared = prepare(&prb).unwrap();

        assert_eq!(prepared.clauses.len(), 1);
        let clause = &prepared.clauses[0];
        assert_eq!(clause.var_count, 1);
        assert_eq!(
            clause.literals,
            vec![
                FlatLiteral::FuncEq {
                    polarity: false,
                    func: a,
                    args: vec![],
                    res: 0,
                },
                FlatLiteral::FuncEq {
                    polarity: true,
                    func: f,
                    args: vec![0],
                    res: 0,
                },
            ]
        );
    }

    #[test]
    fn predicate_arguments_are_extracted() {
        let mut sig = Signature::new();
        let f = sig.add_function("f", 1);
        let p = sig.add_predicate("p", 1);

        // p(f(x))  becomes  f(X0) ≠ X1 ∨ p(X1)
        let prb = Problem::new(
            sig,
            vec![Clause::new(vec![Literal::pred(
                p,
                vec![Term::app(f, vec![Term::var(0)])],
            )])],
        );
        let prepared = prepare(&prb).unwrap();

        let clause = &prepared.clauses[0];
        assert_eq!(clause.var_count, 2);
        assert_eq!(
            clause.literals,
            vec![
                FlatLiteral::FuncEq {
                    polarity: false,
                    func: f,
                    args: vec![0],
                    res: 1,
                },
                FlatLiteral::Pred {
                    polarity: true,
                    pred: p,
                    args: vec![1],
                },
            ]
        );
    }

    #[test]
    fn unit_ground_equalities_are_harvested() {
        let mut sig = Signature::new();
        let a = sig.add_constant("a");
        let b = sig.add_constant("b");

        let prb = Problem::new(
            sig,
            vec![Clause::new(vec![Literal::eq(
                Term::constant(a),
                Term::constant(b),
            )])],
        );
        let prepared = prepare(&prb).unwrap();

        assert_eq!(prepared.constant_identities, vec![(a, b)]);
        // the clause itself is still kept (as  b ≠ X0 ∨ a = X0)
        assert_eq!(prepared.clauses.len(), 1);
    }

    #[test]
    fn reflexive_disequality_is_a_refutation() {
        let sig = Signature::new();
        let prb = Problem::new(
            sig,
            vec![Clause::new(vec![Literal::neq(Term::var(0), Term::var(0))])],
        );
        assert!(prepare(&prb).is_err());
    }

    #[test]
    fn reflexive_equality_makes_a_tautology() {
        let mut sig = Signature::new();
        let p = sig.add_predicate("p", 1);
        let prb = Problem::new(
            sig,
            vec![Clause::new(vec![
                Literal::eq(Term::var(0), Term::var(0)),
                Literal::pred(p, vec![Term::var(1)]),
            ])],
        );
        let prepared = prepare(&prb).unwrap();
        assert!(prepared.clauses.is_empty());
        assert!(prepared.ground.is_empty());
    }

    #[test]
    fn distinctness_heuristic_caps_model_size() {
        let sig = Signature::new();
        // x1 = x2 ∨ x1 = x3 ∨ x2 = x3: no three pairwise distinct elements
        let prb = Problem::new(
            sig,
            vec![Clause::new(vec![
                Literal::eq(Term::var(0), Term::var(1)),
                Literal::eq(Term::var(0), Term::var(2)),
                Literal::eq(Term::var(1), Term::var(2)),
            ])],
        );
        let prepared = prepare(&prb).unwrap();
        assert_eq!(prepared.max_model_size, 3);
    }

    #[test]
    fn empty_input_clause_is_a_refutation() {
        let prb = Problem::new(Signature::new(), vec![Clause::new(vec![])]);
        assert!(prepare(&prb).is_err());
    }
}
