//! Propositional encoding of a clause set at a fixed domain size
//!
//! For a target size `n`, lays out one propositional variable per
//! function-graph fact `f(d̄) = e` and predicate fact `p(d̄)` within the
//! inferred sort bounds, then emits the clause groups whose models
//! correspond to first-order models of size ≤ `n`: ground clauses, clause
//! instances, functionality, totality, and the two symmetry-breaking
//! schemes (ordered totality and canonicity).

use crate::flatten::{FlatClause, FlatLiteral, GroundClause};
use crate::sorts::SortedSignature;
use crate::symmetry::GroundedTerm;
use crate::term::{FuncId, PredId, Signature};

/// A DIMACS-style SAT literal: variable index with a sign.
pub type SatLit = i32;

/// Largest admissible SAT variable index; literals must fit in an `i32`.
pub const MAX_VARS: u32 = i32::MAX as u32;

/// Advances a mixed-radix counter in place. `counter[i]` runs over
/// `1..=bounds[i]` with the last position fastest; returns false once the
/// enumeration is exhausted. All bounds must be at least 1.
pub fn next_tuple(counter: &mut [usize], bounds: &[usize]) -> bool {
    debug_assert_eq!(counter.len(), bounds.len());
    for i in (0..counter.len()).rev() {
        if counter[i] == bounds[i] {
            counter[i] = 1;
        } else {
            counter[i] += 1;
            return true;
        }
    }
    false
}

/// The propositional variable layout for one domain size.
///
/// Offsets are assigned contiguously from 1, a block of `n^(arity+1)`
/// variables per live function and `n^arity` per live predicate. The
/// mapping from in-bounds fact tuples to variables is a bijection.
#[derive(Debug)]
pub struct VarLayout {
    size: usize,
    f_offsets: Vec<u32>,
    p_offsets: Vec<u32>,
    total_vars: u32,
}

impl VarLayout {
    /// Computes the layout for domain size `size`, or `None` when the
    /// variable count would overflow the SAT variable range.
    pub fn build(
        signature: &Signature,
        del_f: &[bool],
        del_p: &[bool],
        size: usize,
    ) -> Option<VarLayout> {
        let n = u32::try_from(size).ok()?;
        let mut offsets: u32 = 1;
        let mut f_offsets = vec![0u32; signature.functions()];
        for (f, slot) in f_offsets.iter_mut().enumerate() {
            if del_f[f] {
                continue;
            }
            *slot = offsets;
            let arity = u32::try_from(signature.function_arity(f)).ok()?;
            let block = n.checked_pow(arity + 1)?;
            offsets = offsets.checked_add(block)?;
        }
        let mut p_offsets = vec![0u32; signature.predicates()];
        for (p, slot) in p_offsets.iter_mut().enumerate().skip(1) {
            if del_p[p] {
                continue;
            }
            *slot = offsets;
            let arity = u32::try_from(signature.predicate_arity(p)).ok()?;
            let block = n.checked_pow(arity)?;
            offsets = offsets.checked_add(block)?;
        }
        if offsets > MAX_VARS {
            return None;
        }
        Some(VarLayout {
            size,
            f_offsets,
            p_offsets,
            total_vars: offsets,
        })
    }

    /// The domain size this layout was built for
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of SAT variables, including the unused variable 0 slot
    pub fn total_vars(&self) -> u32 {
        self.total_vars
    }

    /// Variable for `f(grounding[..arity]) = grounding[arity]`
    pub fn function_var(&self, f: FuncId, grounding: &[usize]) -> u32 {
        debug_assert!(self.f_offsets[f] != 0, "eliminated function encoded");
        self.var_at(self.f_offsets[f], grounding)
    }

    /// Variable for `p(grounding)`
    pub fn predicate_var(&self, p: PredId, grounding: &[usize]) -> u32 {
        debug_assert!(p > 0, "predicate slot 0 is reserved");
        debug_assert!(self.p_offsets[p] != 0, "eliminated predicate encoded");
        self.var_at(self.p_offsets[p], grounding)
    }

    fn var_at(&self, offset: u32, grounding: &[usize]) -> u32 {
        let mut var = offset;
        let mut mult: u32 = 1;
        for &g in grounding {
            debug_assert!((1..=self.size).contains(&g));
            var += mult * (g as u32 - 1);
            mult = mult.wrapping_mul(self.size as u32);
        }
        var
    }

    /// Literal for a function fact with the given polarity
    pub fn function_lit(&self, f: FuncId, grounding: &[usize], polarity: bool) -> SatLit {
        let var = self.function_var(f, grounding) as SatLit;
        if polarity {
            var
        } else {
            -var
        }
    }

    /// Literal for a predicate fact with the given polarity
    pub fn predicate_lit(&self, p: PredId, grounding: &[usize], polarity: bool) -> SatLit {
        let var = self.predicate_var(p, grounding) as SatLit;
        if polarity {
            var
        } else {
            -var
        }
    }
}

/// Collects the CNF of one round before it is handed to the backend.
/// Duplicate literals are removed and tautological clauses dropped on add.
#[derive(Debug, Default)]
pub struct ClauseBuffer {
    clauses: Vec<Vec<SatLit>>,
}

impl ClauseBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause, deduplicating literals. A clause containing a
    /// complementary pair is silently dropped.
    pub fn add(&mut self, mut lits: Vec<SatLit>) {
        lits.sort_unstable_by_key(|l| (l.unsigned_abs(), l.is_negative()));
        lits.dedup();
        if lits.windows(2).any(|w| w[0] == -w[1]) {
            return;
        }
        self.clauses.push(lits);
    }

    /// Number of buffered clauses
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// True when no clause has been buffered
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Iterates over the buffered clauses
    pub fn iter(&self) -> impl Iterator<Item = &[SatLit]> {
        self.clauses.iter().map(Vec::as_slice)
    }
}

/// Emits the clause groups for one round into a [`ClauseBuffer`].
pub struct Encoder<'a> {
    signature: &'a Signature,
    sorted: &'a SortedSignature,
    layout: &'a VarLayout,
    del_f: &'a [bool],
    del_p: &'a [bool],
    buffer: ClauseBuffer,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder for one round
    pub fn new(
        signature: &'a Signature,
        sorted: &'a SortedSignature,
        layout: &'a VarLayout,
        del_f: &'a [bool],
        del_p: &'a [bool],
    ) -> Self {
        Self {
            signature,
            sorted,
            layout,
            del_f,
            del_p,
            buffer: ClauseBuffer::new(),
        }
    }

    /// Consumes the encoder, returning the accumulated CNF
    pub fn finish(self) -> ClauseBuffer {
        self.buffer
    }

    fn size(&self) -> usize {
        self.layout.size()
    }

    fn live_functions(&self) -> impl Iterator<Item = FuncId> + '_ {
        (0..self.signature.functions()).filter(|&f| !self.del_f[f])
    }

    /// Ground input clauses map literal-for-literal onto their nullary
    /// predicate variables.
    pub fn add_ground_clauses(&mut self, ground: &[GroundClause]) {
        for clause in ground {
            let lits = clause
                .literals
                .iter()
                .map(|&(p, polarity)| self.layout.predicate_lit(p, &[], polarity))
                .collect();
            self.buffer.add(lits);
        }
    }

    /// Instantiates every non-ground clause over all groundings within the
    /// per-variable bounds.
    pub fn add_instances(&mut self, clauses: &[FlatClause], cbounds: &[Vec<u32>]) {
        let size = self.size();
        for (clause, bounds) in clauses.iter().zip(cbounds) {
            debug_assert!(clause.var_count > 0);
            let mins: Vec<usize> = bounds
                .iter()
                .map(|&b| (b as usize).min(size))
                .collect();
            let mut grounding = vec![1usize; clause.var_count];
            loop {
                if let Some(lits) = self.instance_lits(clause, &grounding) {
                    self.buffer.add(lits);
                }
                if !next_tuple(&mut grounding, &mins) {
                    break;
                }
            }
        }
    }

    /// Translates one clause under one grounding. Returns `None` when a
    /// two-variable equality is true under the grounding (the instance is
    /// a tautology); equalities false under the grounding drop out.
    fn instance_lits(&self, clause: &FlatClause, grounding: &[usize]) -> Option<Vec<SatLit>> {
        let mut lits = Vec::with_capacity(clause.literals.len());
        let mut tuple = Vec::new();
        for lit in &clause.literals {
            match lit {
                FlatLiteral::VarEq { polarity, x, y } => {
                    let equal = grounding[*x] == grounding[*y];
                    if *polarity == equal {
                        return None;
                    }
                }
                FlatLiteral::FuncEq {
                    polarity,
                    func,
                    args,
                    res,
                } => {
                    tuple.clear();
                    tuple.extend(args.iter().map(|&a| grounding[a]));
                    tuple.push(grounding[*res]);
                    lits.push(self.layout.function_lit(*func, &tuple, *polarity));
                }
                FlatLiteral::Pred {
                    polarity,
                    pred,
                    args,
                } => {
                    tuple.clear();
                    tuple.extend(args.iter().map(|&a| grounding[a]));
                    lits.push(self.layout.predicate_lit(*pred, &tuple, *polarity));
                }
            }
        }
        Some(lits)
    }

    /// At-most-one image per input tuple:
    /// `¬[f(d̄) = d_a] ∨ ¬[f(d̄) = d_b]` for every pair of range values.
    pub fn add_functionality(&mut self) {
        let size = self.size();
        for f in self.live_functions().collect::<Vec<_>>() {
            let arity = self.signature.function_arity(f);
            let bounds = &self.sorted.function_bounds[f];
            let range = (bounds[0] as usize).min(size);

            // counter: two range values first, then the argument tuple
            let mut mins = vec![range, range];
            mins.extend((0..arity).map(|i| (bounds[i + 1] as usize).min(size)));
            let mut grounding = vec![1usize; arity + 2];
            let mut tuple = vec![0usize; arity + 1];
            loop {
                if grounding[0] < grounding[1] {
                    tuple[..arity].copy_from_slice(&grounding[2..]);
                    tuple[arity] = grounding[0];
                    let first = self.layout.function_lit(f, &tuple, false);
                    tuple[arity] = grounding[1];
                    let second = self.layout.function_lit(f, &tuple, false);
                    self.buffer.add(vec![first, second]);
                }
                if !next_tuple(&mut grounding, &mins) {
                    break;
                }
            }
        }
    }

    /// At-least-one image per input tuple, over the bounded range.
    pub fn add_totality(&mut self) {
        let size = self.size();
        for f in self.live_functions().collect::<Vec<_>>() {
            let arity = self.signature.function_arity(f);
            let bounds = &self.sorted.function_bounds[f];
            let range = (bounds[0] as usize).min(size);

            if arity == 0 {
                let lits = (1..=range)
                    .map(|e| self.layout.function_lit(f, &[e], true))
                    .collect();
                self.buffer.add(lits);
                continue;
            }

            let mins: Vec<usize> = (0..arity)
                .map(|i| (bounds[i + 1] as usize).min(size))
                .collect();
            let mut grounding = vec![1usize; arity];
            let mut tuple = vec![0usize; arity + 1];
            loop {
                tuple[..arity].copy_from_slice(&grounding);
                let lits = (1..=range)
                    .map(|e| {
                        tuple[arity] = e;
                        self.layout.function_lit(f, &tuple, true)
                    })
                    .collect();
                self.buffer.add(lits);
                if !next_tuple(&mut grounding, &mins) {
                    break;
                }
            }
        }
    }

    /// Both symmetry-breaking schemes for every sort.
    pub fn add_symmetry(&mut self, grounded_terms: &[Vec<GroundedTerm>], ratio: f64) {
        for terms in grounded_terms {
            self.add_ordered_totality(terms);
            self.add_canonicity(terms, ratio);
        }
    }

    /// Restricted totality: the `n`-th grounded term of the sort takes a
    /// value in `1..=n`.
    fn add_ordered_totality(&mut self, terms: &[GroundedTerm]) {
        let size = self.size();
        if terms.len() < size {
            return;
        }
        let gt = terms[size - 1];
        let arity = self.signature.function_arity(gt.func);
        let mut tuple = vec![gt.grounding; arity + 1];
        let lits = (1..=size)
            .map(|i| {
                tuple[arity] = i;
                self.layout.function_lit(gt.func, &tuple, true)
            })
            .collect();
        self.buffer.add(lits);
    }

    /// Canonicity: a grounded term may only introduce value `n` once an
    /// earlier grounded term has introduced `n − 1`. The window scales
    /// with `ratio`; at 0 nothing is emitted.
    fn add_canonicity(&mut self, terms: &[GroundedTerm], ratio: f64) {
        let size = self.size();
        if size <= 1 {
            return;
        }
        let mut window = (ratio * size as f64).ceil() as usize;
        if window > terms.len() {
            window = terms.len();
        }
        for i in 1..window {
            let gti = terms[i];
            let arity_i = self.signature.function_arity(gti.func);
            let mut tuple = vec![gti.grounding; arity_i + 1];
            tuple[arity_i] = size;
            let mut lits = vec![self.layout.function_lit(gti.func, &tuple, false)];
            for &gtj in &terms[..i] {
                let arity_j = self.signature.function_arity(gtj.func);
                let mut tuple_j = vec![gtj.grounding; arity_j + 1];
                tuple_j[arity_j] = size - 1;
                lits.push(self.layout.function_lit(gtj.func, &tuple_j, true));
            }
            self.buffer.add(lits);
        }
    }

    /// One clause requiring value `n` to actually be taken by a constant
    /// or a unary-function image. Only applicable when no live function
    /// has arity above 1.
    pub fn add_use_model_size(&mut self, grounded_terms: &[Vec<GroundedTerm>]) {
        let size = self.size();
        let max_arity = self
            .live_functions()
            .map(|f| self.signature.function_arity(f))
            .max()
            .unwrap_or(0);
        if max_arity > 1 {
            return;
        }

        let mut lits = Vec::new();
        for terms in grounded_terms {
            for gt in terms {
                let arity = self.signature.function_arity(gt.func);
                if arity == 0 {
                    lits.push(self.layout.function_lit(gt.func, &[size], true));
                } else {
                    for m in 1..=size {
                        lits.push(self.layout.function_lit(gt.func, &[m, size], true));
                    }
                }
            }
        }
        if !lits.is_empty() {
            self.buffer.add(lits);
        }
    }
}
