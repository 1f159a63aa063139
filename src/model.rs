//! Finite model representation and extraction
//!
//! Reads a satisfying assignment back from the SAT backend into concrete
//! interpretation tables, then re-expands symbols that preprocessing
//! eliminated by evaluating their recorded definitions over the
//! materialised interpretation.

use crate::encoder::VarLayout;
use crate::engine::SolverBridge;
use crate::term::{
    DeletedFunction, DeletedPredicate, FuncId, Literal, PredDef, PredId, Signature, Term, VarId,
};
use rustc_hash::FxHashMap;
use std::fmt;

/// A finite interpretation: a domain `1..=size` with function and
/// predicate tables.
///
/// Entries can be missing where the sort bounds kept a function input
/// tuple unconstrained; the model stays well-defined on the restricted
/// domain and such entries print nothing.
#[derive(Debug, Clone)]
pub struct FiniteModel {
    size: usize,
    function_names: Vec<String>,
    function_arities: Vec<usize>,
    predicate_names: Vec<String>,
    predicate_arities: Vec<usize>,
    constants: FxHashMap<FuncId, usize>,
    functions: FxHashMap<FuncId, Vec<Option<usize>>>,
    predicates: FxHashMap<PredId, Vec<Option<bool>>>,
}

impl FiniteModel {
    /// Creates an empty model over the domain `1..=size`
    pub fn new(signature: &Signature, size: usize) -> Self {
        Self {
            size,
            function_names: (0..signature.functions())
                .map(|f| signature.function(f).name().to_string())
                .collect(),
            function_arities: (0..signature.functions())
                .map(|f| signature.function_arity(f))
                .collect(),
            predicate_names: (0..signature.predicates())
                .map(|p| signature.predicate(p).name().to_string())
                .collect(),
            predicate_arities: (0..signature.predicates())
                .map(|p| signature.predicate_arity(p))
                .collect(),
            constants: FxHashMap::default(),
            functions: FxHashMap::default(),
            predicates: FxHashMap::default(),
        }
    }

    /// The domain size
    pub fn domain_size(&self) -> usize {
        self.size
    }

    fn table_index(&self, args: &[usize]) -> usize {
        let mut index = 0;
        let mut mult = 1;
        for &a in args {
            debug_assert!((1..=self.size).contains(&a));
            index += (a - 1) * mult;
            mult *= self.size;
        }
        index
    }

    /// Records `constant ↦ element`
    pub fn add_constant_definition(&mut self, f: FuncId, element: usize) {
        self.constants.insert(f, element);
    }

    /// Records `f(args) = element`
    pub fn add_function_definition(&mut self, f: FuncId, args: &[usize], element: usize) {
        let arity = self.function_arities[f];
        debug_assert_eq!(args.len(), arity);
        let size = self.size.pow(arity as u32);
        let index = self.table_index(args);
        let table = self.functions.entry(f).or_insert_with(|| vec![None; size]);
        table[index] = Some(element);
    }

    /// Records the truth value of `p(args)`
    pub fn add_predicate_definition(&mut self, p: PredId, args: &[usize], value: bool) {
        let arity = self.predicate_arities[p];
        debug_assert_eq!(args.len(), arity);
        let size = self.size.pow(arity as u32);
        let index = self.table_index(args);
        let table = self.predicates.entry(p).or_insert_with(|| vec![None; size]);
        table[index] = Some(value);
    }

    /// Interpretation of a constant
    pub fn constant(&self, f: FuncId) -> Option<usize> {
        self.constants.get(&f).copied()
    }

    /// Interpretation of `f(args)`; `None` for entries left partial
    pub fn function_value(&self, f: FuncId, args: &[usize]) -> Option<usize> {
        if args.is_empty() {
            return self.constant(f);
        }
        let index = self.table_index(args);
        self.functions.get(&f).and_then(|t| t[index])
    }

    /// Truth value of `p(args)`
    pub fn predicate_value(&self, p: PredId, args: &[usize]) -> Option<bool> {
        let index = self.table_index(args);
        self.predicates.get(&p).and_then(|t| t[index])
    }

    /// Evaluates a ground instance of a term under a variable assignment.
    pub fn evaluate_term(
        &self,
        term: &Term,
        assignment: &FxHashMap<VarId, usize>,
    ) -> Option<usize> {
        match term {
            Term::Var(v) => assignment.get(v).copied(),
            Term::App { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.evaluate_term(a, assignment)?);
                }
                self.function_value(*func, &values)
            }
        }
    }

    /// Evaluates a ground instance of a literal under a variable
    /// assignment.
    pub fn evaluate_literal(
        &self,
        literal: &Literal,
        assignment: &FxHashMap<VarId, usize>,
    ) -> Option<bool> {
        match literal {
            Literal::Equality { polarity, lhs, rhs } => {
                let l = self.evaluate_term(lhs, assignment)?;
                let r = self.evaluate_term(rhs, assignment)?;
                Some((l == r) == *polarity)
            }
            Literal::Predicate {
                polarity,
                pred,
                args,
            } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.evaluate_term(a, assignment)?);
                }
                Some(self.predicate_value(*pred, &values)? == *polarity)
            }
        }
    }

    fn evaluate_def(
        &self,
        def: &PredDef,
        assignment: &FxHashMap<VarId, usize>,
    ) -> Option<bool> {
        match def {
            PredDef::True => Some(true),
            PredDef::False => Some(false),
            PredDef::Literal(lit) => self.evaluate_literal(lit, assignment),
            PredDef::Not(inner) => self.evaluate_def(inner, assignment).map(|v| !v),
            PredDef::And(parts) => {
                let mut result = true;
                for part in parts {
                    result &= self.evaluate_def(part, assignment)?;
                }
                Some(result)
            }
            PredDef::Or(parts) => {
                let mut result = false;
                for part in parts {
                    result |= self.evaluate_def(part, assignment)?;
                }
                Some(result)
            }
        }
    }
}

impl fmt::Display for FiniteModel {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "% finite model of size {}", self.size)?;
        for (f, &e) in sorted_entries(&self.constants) {
            writeln!(out, "{} = {}", self.function_names[f], e)?;
        }
        for (f, table) in sorted_entries(&self.functions) {
            let arity = self.function_arities[f];
            let mut args = vec![1usize; arity];
            let bounds = vec![self.size; arity];
            loop {
                if let Some(e) = table[self.table_index(&args)] {
                    writeln!(
                        out,
                        "{}({}) = {}",
                        self.function_names[f],
                        format_args_list(&args),
                        e
                    )?;
                }
                if !crate::encoder::next_tuple(&mut args, &bounds) {
                    break;
                }
            }
        }
        for (p, table) in sorted_entries(&self.predicates) {
            let arity = self.predicate_arities[p];
            if arity == 0 {
                if let Some(v) = table[0] {
                    writeln!(out, "{} = {}", self.predicate_names[p], v)?;
                }
                continue;
            }
            let mut args = vec![1usize; arity];
            let bounds = vec![self.size; arity];
            loop {
                if let Some(v) = table[self.table_index(&args)] {
                    writeln!(
                        out,
                        "{}({}) = {}",
                        self.predicate_names[p],
                        format_args_list(&args),
                        v
                    )?;
                }
                if !crate::encoder::next_tuple(&mut args, &bounds) {
                    break;
                }
            }
        }
        Ok(())
    }
}

fn sorted_entries<V>(map: &FxHashMap<usize, V>) -> impl Iterator<Item = (usize, &V)> {
    let mut entries: Vec<(usize, &V)> = map.iter().map(|(&k, v)| (k, v)).collect();
    entries.sort_by_key(|&(k, _)| k);
    entries.into_iter()
}

fn format_args_list(args: &[usize]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Materialises the interpretation from the backend's satisfying
/// assignment, then re-expands eliminated symbols from their definitions.
#[allow(clippy::too_many_arguments)]
pub fn extract<B: SolverBridge>(
    bridge: &B,
    layout: &VarLayout,
    signature: &Signature,
    del_f: &[bool],
    del_p: &[bool],
    deleted_functions: &[DeletedFunction],
    deleted_predicates: &[DeletedPredicate],
) -> FiniteModel {
    let size = layout.size();
    let mut model = FiniteModel::new(signature, size);

    for f in 0..signature.functions() {
        if del_f[f] || signature.function_arity(f) > 0 {
            continue;
        }
        for e in 1..=size {
            if bridge.value_of(layout.function_lit(f, &[e], true)) {
                model.add_constant_definition(f, e);
                break;
            }
        }
    }

    for f in 0..signature.functions() {
        let arity = signature.function_arity(f);
        if del_f[f] || arity == 0 {
            continue;
        }
        let bounds = vec![size; arity];
        let mut args = vec![1usize; arity];
        let mut tuple = vec![0usize; arity + 1];
        loop {
            tuple[..arity].copy_from_slice(&args);
            // the image can be missing when sort bounds left this input
            // tuple unconstrained; the entry then stays partial
            for e in 1..=size {
                tuple[arity] = e;
                if bridge.value_of(layout.function_lit(f, &tuple, true)) {
                    model.add_function_definition(f, &args, e);
                    break;
                }
            }
            if !crate::encoder::next_tuple(&mut args, &bounds) {
                break;
            }
        }
    }

    for p in 1..signature.predicates() {
        if del_p[p] {
            continue;
        }
        let arity = signature.predicate_arity(p);
        if arity == 0 {
            let value = bridge.value_of(layout.predicate_lit(p, &[], true));
            model.add_predicate_definition(p, &[], value);
            continue;
        }
        let bounds = vec![size; arity];
        let mut args = vec![1usize; arity];
        loop {
            let value = bridge.value_of(layout.predicate_lit(p, &args, true));
            model.add_predicate_definition(p, &args, value);
            if !crate::encoder::next_tuple(&mut args, &bounds) {
                break;
            }
        }
    }

    // Eliminated symbols, most recently introduced first so definitions
    // can refer to symbols eliminated before them.
    for deleted in deleted_functions.iter().rev() {
        let arity = deleted.vars.len();
        if arity == 0 {
            let assignment = FxHashMap::default();
            if let Some(e) = model.evaluate_term(&deleted.body, &assignment) {
                model.add_constant_definition(deleted.func, e);
            }
            continue;
        }
        let bounds = vec![size; arity];
        let mut args = vec![1usize; arity];
        loop {
            let assignment: FxHashMap<VarId, usize> =
                deleted.vars.iter().copied().zip(args.iter().copied()).collect();
            if let Some(e) = model.evaluate_term(&deleted.body, &assignment) {
                model.add_function_definition(deleted.func, &args, e);
            }
            if !crate::encoder::next_tuple(&mut args, &bounds) {
                break;
            }
        }
    }

    for deleted in deleted_predicates.iter().rev() {
        let arity = deleted.vars.len();
        if arity == 0 {
            let assignment = FxHashMap::default();
            if let Some(v) = model.evaluate_def(&deleted.body, &assignment) {
                model.add_predicate_definition(deleted.pred, &[], v);
            }
            continue;
        }
        let bounds = vec![size; arity];
        let mut args = vec![1usize; arity];
        loop {
            let assignment: FxHashMap<VarId, usize> =
                deleted.vars.iter().copied().zip(args.iter().copied()).collect();
            if let Some(v) = model.evaluate_def(&deleted.body, &assignment) {
                model.add_predicate_definition(deleted.pred, &args, v);
            }
            if !crate::encoder::next_tuple(&mut args, &bounds) {
                break;
            }
        }
    }

    model
}
