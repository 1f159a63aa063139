//! Symbol ordering and grounded-term sequences for symmetry breaking
//!
//! Symmetry breaking needs, per sort, a canonical enumeration of terms that
//! can introduce domain values: the sort's constants followed by "widgets"
//! `(f, m)` pairing each function ranging into the sort with a domain
//! index. The enumeration order is controlled by two policies: how symbols
//! are ordered within a sort, and how widgets are interleaved.

use crate::flatten::{FlatClause, FlatLiteral};
use crate::sorts::SortedSignature;
use crate::term::{FuncId, Signature};

/// A canonical element for symmetry breaking: a function symbol with all
/// its argument positions collapsed to one domain index. Constants use
/// grounding 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundedTerm {
    /// The symbol
    pub func: FuncId,
    /// The collapsed argument index, 0 for constants
    pub grounding: usize,
}

/// Interleaving of function symbols and domain indices in the widget
/// portion of a grounded-term sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetOrder {
    /// All indices of one function before the next function
    #[default]
    FunctionFirst,
    /// All functions at one index before the next index
    ArgumentFirst,
    /// Index `1 + ((m + i) mod n)` for the `i`-th function at step `m`
    Diagonal,
}

/// Ordering of constants and functions within each sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolOrderPolicy {
    /// Keep occurrence (registration) order
    #[default]
    Occurrence,
    /// Sort by descending usage count recorded by preprocessing
    PreprocessedUsage,
    /// Sort by descending usage count recounted from the flat clauses
    Usage,
}

/// Owns the usage-count side table and applies the symbol ordering policy
/// to a sorted signature. Counts are never written back to the signature.
#[derive(Debug)]
pub struct SymbolOrder {
    usage: Vec<u32>,
}

impl SymbolOrder {
    /// Builds the usage table for the given policy.
    ///
    /// `Usage` counts, per function symbol, the definition equalities
    /// `f(x̄) = y` it heads in the flat clauses; `PreprocessedUsage` copies
    /// the counts carried on the signature.
    pub fn new(signature: &Signature, clauses: &[FlatClause], policy: SymbolOrderPolicy) -> Self {
        let mut usage = vec![0u32; signature.functions()];
        match policy {
            SymbolOrderPolicy::Occurrence => {}
            SymbolOrderPolicy::PreprocessedUsage => {
                for (f, slot) in usage.iter_mut().enumerate() {
                    *slot = signature.function(f).usage_count();
                }
            }
            SymbolOrderPolicy::Usage => {
                for clause in clauses {
                    for lit in &clause.literals {
                        if let FlatLiteral::FuncEq { func, .. } = lit {
                            usage[*func] += 1;
                        }
                    }
                }
            }
        }
        Self { usage }
    }

    /// Reorders each sort's constants and functions by descending usage.
    /// `Occurrence` leaves the inference order untouched.
    pub fn apply(&self, sorted: &mut SortedSignature, policy: SymbolOrderPolicy) {
        if policy == SymbolOrderPolicy::Occurrence {
            return;
        }
        for s in 0..sorted.sorts {
            sorted.sorted_constants[s].sort_by_key(|&f| std::cmp::Reverse(self.usage[f]));
            sorted.sorted_functions[s].sort_by_key(|&f| std::cmp::Reverse(self.usage[f]));
        }
    }
}

/// Builds the per-sort grounded-term sequences for domain size `size`.
///
/// Constants come first with grounding 0. A function is skipped entirely
/// when its range bound is below `size`; a widget is skipped when any
/// argument bound is below its grounding index. The `Diagonal` order keeps
/// the modular formula even when that repeats a pair.
pub fn grounded_terms(
    signature: &Signature,
    sorted: &SortedSignature,
    size: usize,
    order: WidgetOrder,
) -> Vec<Vec<GroundedTerm>> {
    let mut result = Vec::with_capacity(sorted.sorts);
    for s in 0..sorted.sorts {
        let mut terms: Vec<GroundedTerm> = sorted.sorted_constants[s]
            .iter()
            .map(|&c| GroundedTerm {
                func: c,
                grounding: 0,
            })
            .collect();

        let functions = &sorted.sorted_functions[s];
        match order {
            WidgetOrder::FunctionFirst => {
                for &f in functions {
                    for m in 1..=size {
                        push_widget(signature, sorted, size, f, m, &mut terms);
                    }
                }
            }
            WidgetOrder::ArgumentFirst => {
                for m in 1..=size {
                    for &f in functions {
                        push_widget(signature, sorted, size, f, m, &mut terms);
                    }
                }
            }
            WidgetOrder::Diagonal => {
                for m in 1..=size {
                    for (i, &f) in functions.iter().enumerate() {
                        let g = 1 + ((m + i) % size);
                        push_widget(signature, sorted, size, f, g, &mut terms);
                    }
                }
            }
        }
        result.push(terms);
    }
    result
}

fn push_widget(
    signature: &Signature,
    sorted: &SortedSignature,
    size: usize,
    f: FuncId,
    grounding: usize,
    terms: &mut Vec<GroundedTerm>,
) {
    let bounds = &sorted.function_bounds[f];
    if (bounds[0] as usize) < size {
        return;
    }
    for i in 0..signature.function_arity(f) {
        if (bounds[i + 1] as usize) < grounding {
            return;
        }
    }
    terms.push(GroundedTerm { func: f, grounding });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::prepare;
    use crate::sorts;
    use crate::term::{Clause, Literal, Problem, Signature, Term};

    fn cycle_problem() -> (Problem, SortedSignature) {
        let mut sig = Signature::new();
        let a = sig.add_constant("a");
        let f = sig.add_function("f", 1);
        let g = sig.add_function("g", 1);

        // link everything into one sort: f(g(x)) = x, f(a) ≠ a
        let prb = Problem::new(
            sig,
            vec![
                Clause::new(vec![Literal::eq(
                    Term::app(f, vec![Term::app(g, vec![Term::var(0)])]),
                    Term::var(0),
                )]),
                Clause::new(vec![Literal::neq(
                    Term::app(f, vec![Term::constant(a)]),
                    Term::constant(a),
                )]),
            ],
        );
        let prepared = prepare(&prb).unwrap();
        let sorted = sorts::infer(
            &prb.signature,
            &prepared,
            &prb.deleted_function_flags(),
            &prb.deleted_predicate_flags(),
        );
        (prb, sorted)
    }

    #[test]
    fn function_first_order() {
        let (prb, sorted) = cycle_problem();
        let gts = grounded_terms(&prb.signature, &sorted, 2, WidgetOrder::FunctionFirst);

        assert_eq!(gts.len(), 1);
        let expect: Vec<(FuncId, usize)> =
            vec![(0, 0), (1, 1), (1, 2), (2, 1), (2, 2)];
        let got: Vec<(FuncId, usize)> = gts[0].iter().map(|g| (g.func, g.grounding)).collect();
        assert_eq!(got, expect);
    }

    #[test]
    fn argument_first_order() {
        let (prb, sorted) = cycle_problem();
        let gts = grounded_terms(&prb.signature, &sorted, 2, WidgetOrder::ArgumentFirst);

        let got: Vec<(FuncId, usize)> = gts[0].iter().map(|g| (g.func, g.grounding)).collect();
        assert_eq!(got, vec![(0, 0), (1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn diagonal_order() {
        let (prb, sorted) = cycle_problem();
        let gts = grounded_terms(&prb.signature, &sorted, 2, WidgetOrder::Diagonal);

        // m=1: f at 1+((1+0)%2)=2, g at 1+((1+1)%2)=1; m=2: f at 1, g at 2
        let got: Vec<(FuncId, usize)> = gts[0].iter().map(|g| (g.func, g.grounding)).collect();
        assert_eq!(got, vec![(0, 0), (1, 2), (2, 1), (1, 1), (2, 2)]);
    }

    #[test]
    fn range_bound_skips_function() {
        let mut sig = Signature::new();
        let a = sig.add_constant("a");
        let f = sig.add_function("f", 1);
        let p = sig.add_predicate("p", 1);
        let q = sig.add_predicate("q", 1);

        // f maps the one-element sort of a into a constant-free sort, so
        // its range bound resolves to 1; at size 2 the f widgets disappear.
        let prb = Problem::new(
            sig,
            vec![
                Clause::new(vec![Literal::pred(p, vec![Term::constant(a)])]),
                Clause::new(vec![
                    Literal::npred(p, vec![Term::var(0)]),
                    Literal::npred(q, vec![Term::app(f, vec![Term::var(0)])]),
                ]),
            ],
        );
        let prepared = prepare(&prb).unwrap();
        let sorted = sorts::infer(
            &prb.signature,
            &prepared,
            &prb.deleted_function_flags(),
            &prb.deleted_predicate_flags(),
        );

        let gts = grounded_terms(&prb.signature, &sorted, 2, WidgetOrder::FunctionFirst);
        for terms in &gts {
            assert!(terms.iter().all(|g| g.func != f));
        }
    }

    #[test]
    fn usage_policy_reorders_functions() {
        let mut sig = Signature::new();
        let f = sig.add_function("f", 1);
        let g = sig.add_function("g", 1);

        // g heads three definition equalities, f heads one
        let prb = Problem::new(
            sig,
            vec![
                Clause::new(vec![Literal::eq(
                    Term::app(g, vec![Term::app(g, vec![Term::var(0)])]),
                    Term::var(0),
                )]),
                Clause::new(vec![Literal::neq(
                    Term::app(f, vec![Term::var(0)]),
                    Term::app(g, vec![Term::var(0)]),
                )]),
            ],
        );
        let prepared = prepare(&prb).unwrap();
        let mut sorted = sorts::infer(
            &prb.signature,
            &prepared,
            &prb.deleted_function_flags(),
            &prb.deleted_predicate_flags(),
        );
        assert_eq!(sorted.sorted_functions[0], vec![f, g]);

        let order = SymbolOrder::new(&prb.signature, &prepared.clauses, SymbolOrderPolicy::Usage);
        order.apply(&mut sorted, SymbolOrderPolicy::Usage);
        assert_eq!(sorted.sorted_functions[0], vec![g, f]);

        // occurrence order leaves the inference order alone
        let occ = SymbolOrder::new(&prb.signature, &prepared.clauses, SymbolOrderPolicy::Occurrence);
        let mut resorted = sorts::infer(
            &prb.signature,
            &prepared,
            &prb.deleted_function_flags(),
            &prb.deleted_predicate_flags(),
        );
        occ.apply(&mut resorted, SymbolOrderPolicy::Occurrence);
        assert_eq!(resorted.sorted_functions[0], vec![f, g]);
    }
}
