//! End-to-end searches against the batsat backend.

use finmod::encoder::next_tuple;
use finmod::search::{ModelFinder, Options};
use finmod::symmetry::{SymbolOrderPolicy, WidgetOrder};
use finmod::term::{Clause, DeletedFunction, Literal, Problem, Signature, Term};
use finmod::{FiniteModel, Outcome};
use rustc_hash::FxHashMap;

fn solve(problem: &Problem) -> Outcome {
    ModelFinder::new(Options::default()).run(problem).unwrap()
}

/// Checks that every clause of the problem holds in the model under all
/// variable assignments over the model's domain.
fn verify_model(problem: &Problem, model: &FiniteModel) {
    let n = model.domain_size();
    for clause in &problem.clauses {
        let vars = clause
            .literals
            .iter()
            .filter_map(Literal::max_var)
            .max()
            .map_or(0, |v| v + 1);
        if vars == 0 {
            let assignment = FxHashMap::default();
            let holds = clause
                .literals
                .iter()
                .any(|l| model.evaluate_literal(l, &assignment) == Some(true));
            assert!(holds, "ground clause violated: {:?}", clause);
            continue;
        }
        let bounds = vec![n; vars];
        let mut grounding = vec![1usize; vars];
        loop {
            let assignment: FxHashMap<usize, usize> =
                (0..vars).zip(grounding.iter().copied()).collect();
            let holds = clause
                .literals
                .iter()
                .any(|l| model.evaluate_literal(l, &assignment) == Some(true));
            assert!(
                holds,
                "clause {:?} violated under assignment {:?}",
                clause, grounding
            );
            if !next_tuple(&mut grounding, &bounds) {
                break;
            }
        }
    }
}

#[test]
fn pure_propositional_problem() {
    // {p, q}, {¬p}: satisfiable with one element, p false and q true
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

    let outcome = solve(&prb);
    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.statistics().last_size(), 1);

    let model = outcome.model().unwrap();
    assert_eq!(model.predicate_value(p, &[]), Some(false));
    assert_eq!(model.predicate_value(q, &[]), Some(true));
}

#[test]
fn contradictory_equality_chain_refutes_at_size_one() {
    // {a = b}, {b = c}, {a ≠ c}: the ground equalities collapse the sort
    // to one element, so the search stops right after size 1
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let b = sig.add_constant("b");
    let c = sig.add_constant("c");
    let prb = Problem::new(
        sig,
        vec![
            Clause::new(vec![Literal::eq(Term::constant(a), Term::constant(b))]),
            Clause::new(vec![Literal::eq(Term::constant(b), Term::constant(c))]),
            Clause::new(vec![Literal::neq(Term::constant(a), Term::constant(c))]),
        ],
    );

    let outcome = solve(&prb);
    assert!(outcome.is_refutation());
    assert_eq!(outcome.statistics().last_size(), 1);
}

#[test]
fn function_fixpoint_has_a_one_element_model() {
    // {f(a) = a}
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let f = sig.add_function("f", 1);
    let prb = Problem::new(
        sig,
        vec![Clause::new(vec![Literal::eq(
            Term::app(f, vec![Term::constant(a)]),
            Term::constant(a),
        )])],
    );

    let outcome = solve(&prb);
    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.statistics().last_size(), 1);

    let model = outcome.model().unwrap();
    assert_eq!(model.constant(a), Some(1));
    assert_eq!(model.function_value(f, &[1]), Some(1));
    verify_model(&prb, model);
}

#[test]
fn distinctness_clause_caps_the_search() {
    // no three pairwise distinct elements, but a and b differ: the first
    // satisfiable size is 2 and the derived bound is 3
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let b = sig.add_constant("b");
    let prb = Problem::new(
        sig,
        vec![
            Clause::new(vec![
                Literal::eq(Term::var(0), Term::var(1)),
                Literal::eq(Term::var(0), Term::var(2)),
                Literal::eq(Term::var(1), Term::var(2)),
            ]),
            Clause::new(vec![Literal::neq(Term::constant(a), Term::constant(b))]),
        ],
    );

    let outcome = solve(&prb);
    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.statistics().last_size(), 2);

    let model = outcome.model().unwrap();
    let ea = model.constant(a).unwrap();
    let eb = model.constant(b).unwrap();
    assert_ne!(ea, eb);
    verify_model(&prb, model);
}

#[test]
fn involution_without_fixpoint_needs_two_elements() {
    // {f(f(x)) = x}, {f(a) ≠ a}
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let f = sig.add_function("f", 1);
    let prb = Problem::new(
        sig,
        vec![
            Clause::new(vec![Literal::eq(
                Term::app(f, vec![Term::app(f, vec![Term::var(0)])]),
                Term::var(0),
            )]),
            Clause::new(vec![Literal::neq(
                Term::app(f, vec![Term::constant(a)]),
                Term::constant(a),
            )]),
        ],
    );

    let outcome = solve(&prb);
    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.statistics().last_size(), 2);

    let model = outcome.model().unwrap();
    let ea = model.constant(a).unwrap();
    let img = model.function_value(f, &[ea]).unwrap();
    assert_ne!(img, ea);
    assert_eq!(model.function_value(f, &[img]), Some(ea));
    verify_model(&prb, model);
}

#[test]
fn epr_problem_refutes_after_its_constants() {
    // {p(a)}, {¬p(x)}: effectively propositional with one constant
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let p = sig.add_predicate("p", 1);
    let prb = Problem::new(
        sig,
        vec![
            Clause::new(vec![Literal::pred(p, vec![Term::constant(a)])]),
            Clause::new(vec![Literal::npred(p, vec![Term::var(0)])]),
        ],
    );

    let outcome = solve(&prb);
    assert!(outcome.is_refutation());
    assert_eq!(outcome.statistics().last_size(), 1);
}

#[test]
fn idempotent_binary_operation() {
    // {m(x, x) = x}, {a ≠ b}
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let b = sig.add_constant("b");
    let m = sig.add_function("m", 2);
    let prb = Problem::new(
        sig,
        vec![
            Clause::new(vec![Literal::eq(
                Term::app(m, vec![Term::var(0), Term::var(0)]),
                Term::var(0),
            )]),
            Clause::new(vec![Literal::neq(Term::constant(a), Term::constant(b))]),
        ],
    );

    let outcome = solve(&prb);
    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.statistics().last_size(), 2);
    verify_model(&prb, outcome.model().unwrap());
}

#[test]
fn all_widget_and_symbol_orders_agree() {
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let f = sig.add_function("f", 1);
    let clauses = vec![
        Clause::new(vec![Literal::eq(
            Term::app(f, vec![Term::app(f, vec![Term::var(0)])]),
            Term::var(0),
        )]),
        Clause::new(vec![Literal::neq(
            Term::app(f, vec![Term::constant(a)]),
            Term::constant(a),
        )]),
    ];
    let prb = Problem::new(sig, clauses);

    for widget_order in [
        WidgetOrder::FunctionFirst,
        WidgetOrder::ArgumentFirst,
        WidgetOrder::Diagonal,
    ] {
        for symbol_order in [
            SymbolOrderPolicy::Occurrence,
            SymbolOrderPolicy::PreprocessedUsage,
            SymbolOrderPolicy::Usage,
        ] {
            for symmetry_ratio in [0.0, 0.5, 1.0] {
                let finder = ModelFinder::new(Options {
                    widget_order,
                    symbol_order,
                    symmetry_ratio,
                    ..Options::default()
                });
                let outcome = finder.run(&prb).unwrap();
                assert!(outcome.is_satisfiable());
                assert_eq!(outcome.statistics().last_size(), 2);
                verify_model(&prb, outcome.model().unwrap());
            }
        }
    }
}

#[test]
fn constants_as_starting_size() {
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let b = sig.add_constant("b");
    let c = sig.add_constant("c");
    let prb = Problem::new(
        sig,
        vec![
            Clause::new(vec![Literal::neq(Term::constant(a), Term::constant(b))]),
            Clause::new(vec![Literal::neq(Term::constant(b), Term::constant(c))]),
        ],
    );

    let finder = ModelFinder::new(Options {
        use_constants_as_start: true,
        ..Options::default()
    });
    let outcome = finder.run(&prb).unwrap();
    assert!(outcome.is_satisfiable());
    // the search starts (and immediately succeeds) at the constant count
    assert_eq!(outcome.statistics().last_size(), 3);
    assert_eq!(outcome.statistics().rounds(), 1);
}

#[test]
fn eliminated_function_is_reexpanded_in_the_model() {
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let f = sig.add_function("f", 1);
    let g = sig.add_function("g", 1);

    let mut prb = Problem::new(
        sig,
        vec![Clause::new(vec![Literal::eq(
            Term::app(f, vec![Term::constant(a)]),
            Term::constant(a),
        )])],
    );
    // g was rewritten away as g(x) := f(f(x))
    prb.deleted_functions.push(DeletedFunction {
        func: g,
        vars: vec![0],
        body: Term::app(f, vec![Term::app(f, vec![Term::var(0)])]),
    });

    let outcome = solve(&prb);
    let model = outcome.model().unwrap();
    assert_eq!(model.function_value(g, &[1]), Some(1));
}

#[test]
fn larger_starting_size_is_respected() {
    let mut sig = Signature::new();
    let a = sig.add_constant("a");
    let prb = Problem::new(
        sig,
        vec![Clause::new(vec![Literal::eq(
            Term::constant(a),
            Term::constant(a),
        )])],
    );

    let finder = ModelFinder::new(Options {
        start_size: 2,
        ..Options::default()
    });
    let outcome = finder.run(&prb).unwrap();
    assert!(outcome.is_satisfiable());
    assert_eq!(outcome.statistics().last_size(), 2);
}
