//! Sort inference over argument positions
//!
//! Computes the inferred sorts of a flat clause set: the coarsest partition
//! of symbol argument positions such that positions sharing a variable (or
//! linked through an equality) land in the same class. Each class that
//! contains a symbol position becomes a sort, carrying its constants, the
//! functions ranging into it, and a cardinality bound. Bounds feed the
//! encoder's variable layout and clause instantiation.

use crate::flatten::{FlatLiteral, PreparedClauses};
use crate::term::{FuncId, Signature};
use rustc_hash::FxHashMap;

/// Sentinel for an unbounded sort, mirrored into the symbol bound tables.
pub const NO_BOUND: u32 = u32::MAX;

/// Index of an inferred sort.
pub type SortId = usize;

/// The sorted signature: inferred sorts with their members and bounds.
#[derive(Debug)]
pub struct SortedSignature {
    /// Number of inferred sorts
    pub sorts: usize,
    /// Per sort: its constants, in occurrence order until reordered by the
    /// symbol ordering policy
    pub sorted_constants: Vec<Vec<FuncId>>,
    /// Per sort: the non-nullary functions whose range is this sort
    pub sorted_functions: Vec<Vec<FuncId>>,
    /// Per sort: cardinality upper bound (`NO_BOUND` = unbounded)
    pub sort_bounds: Vec<u32>,
    /// Per sort: number of distinct constants modulo the recorded ground
    /// unit equalities
    pub distinct_constants: Vec<u32>,
    /// Per function: `[range bound, arg bounds...]`; empty for eliminated
    /// symbols
    pub function_bounds: Vec<Vec<u32>>,
    /// Per predicate: argument bounds; empty for slot 0 and eliminated
    /// symbols
    pub predicate_bounds: Vec<Vec<u32>>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx != ry {
            self.parent[ry] = rx;
        }
    }
}

/// Infers sorts and bounds from the prepared clauses.
///
/// Eliminated symbols take no part in inference; their bound rows are left
/// empty.
pub fn infer(
    signature: &Signature,
    prepared: &PreparedClauses,
    del_f: &[bool],
    del_p: &[bool],
) -> SortedSignature {
    // Node layout: one node per function position (range first, then
    // arguments), one per predicate argument position, then one per clause
    // variable.
    let mut f_base = vec![0usize; signature.functions()];
    let mut nodes = 0usize;
    for f in 0..signature.functions() {
        f_base[f] = nodes;
        nodes += signature.function_arity(f) + 1;
    }
    let mut p_base = vec![0usize; signature.predicates()];
    for p in 0..signature.predicates() {
        p_base[p] = nodes;
        nodes += signature.predicate_arity(p);
    }
    let clause_base = nodes;
    for clause in &prepared.clauses {
        nodes += clause.var_count;
    }

    let mut uf = UnionFind::new(nodes);

    let mut var_base = clause_base;
    for clause in &prepared.clauses {
        for lit in &clause.literals {
            match lit {
                FlatLiteral::VarEq { x, y, .. } => {
                    uf.union(var_base + x, var_base + y);
                }
                FlatLiteral::FuncEq {
                    func, args, res, ..
                } => {
                    uf.union(var_base + res, f_base[*func]);
                    for (i, a) in args.iter().enumerate() {
                        uf.union(var_base + a, f_base[*func] + i + 1);
                    }
                }
                FlatLiteral::Pred { pred, args, .. } => {
                    for (i, a) in args.iter().enumerate() {
                        uf.union(var_base + a, p_base[*pred] + i);
                    }
                }
            }
        }
        var_base += clause.var_count;
    }

    // Dense sort ids for every class containing a live symbol position.
    let mut sort_of_root: FxHashMap<usize, SortId> = FxHashMap::default();
    fn sort_id(root: usize, sort_of_root: &mut FxHashMap<usize, SortId>) -> SortId {
        let next = sort_of_root.len();
        *sort_of_root.entry(root).or_insert(next)
    }

    let mut function_sorts: Vec<Vec<SortId>> = vec![Vec::new(); signature.functions()];
    let mut predicate_sorts: Vec<Vec<SortId>> = vec![Vec::new(); signature.predicates()];
    for f in 0..signature.functions() {
        if del_f[f] {
            continue;
        }
        for i in 0..=signature.function_arity(f) {
            let root = uf.find(f_base[f] + i);
            function_sorts[f].push(sort_id(root, &mut sort_of_root));
        }
    }
    for p in 1..signature.predicates() {
        if del_p[p] {
            continue;
        }
        for i in 0..signature.predicate_arity(p) {
            let root = uf.find(p_base[p] + i);
            predicate_sorts[p].push(sort_id(root, &mut sort_of_root));
        }
    }

    let sorts = sort_of_root.len();
    let mut sorted_constants: Vec<Vec<FuncId>> = vec![Vec::new(); sorts];
    let mut sorted_functions: Vec<Vec<FuncId>> = vec![Vec::new(); sorts];
    for f in 0..signature.functions() {
        if del_f[f] {
            continue;
        }
        let range = function_sorts[f][0];
        if signature.function_arity(f) == 0 {
            sorted_constants[range].push(f);
        } else {
            sorted_functions[range].push(f);
        }
    }

    // Distinct-constant counting: identify constants forced equal by unit
    // ground equalities, then count classes per sort.
    let mut cuf = UnionFind::new(signature.functions());
    for &(a, b) in &prepared.constant_identities {
        cuf.union(a, b);
    }
    let mut distinct_constants = vec![0u32; sorts];
    for (s, constants) in sorted_constants.iter().enumerate() {
        let mut roots: Vec<usize> = constants.iter().map(|&c| cuf.find(c)).collect();
        roots.sort_unstable();
        roots.dedup();
        distinct_constants[s] = roots.len() as u32;
    }

    // A sort no non-nullary function ranges into is generated by its
    // constants alone. Sorts with functions are bounded too when every
    // argument sort of every such function is already bounded: the
    // generated elements are constants plus function images over bounded
    // argument spaces. Iterate to a fixpoint; recursive sorts never
    // resolve and stay unbounded.
    let mut sort_bounds = vec![NO_BOUND; sorts];
    for s in 0..sorts {
        if sorted_functions[s].is_empty() {
            sort_bounds[s] = distinct_constants[s].max(1);
        }
    }
    let mut changed = true;
    while changed {
        changed = false;
        for s in 0..sorts {
            if sort_bounds[s] != NO_BOUND || sorted_functions[s].is_empty() {
                continue;
            }
            let mut total = distinct_constants[s] as u64;
            let mut resolved = true;
            for &f in &sorted_functions[s] {
                let mut images = 1u64;
                for &arg_sort in &function_sorts[f][1..] {
                    if sort_bounds[arg_sort] == NO_BOUND {
                        resolved = false;
                        break;
                    }
                    images = images.saturating_mul(sort_bounds[arg_sort] as u64);
                }
                if !resolved {
                    break;
                }
                total = total.saturating_add(images);
            }
            if resolved {
                sort_bounds[s] = total.clamp(1, NO_BOUND as u64) as u32;
                changed = true;
            }
        }
    }

    let function_bounds: Vec<Vec<u32>> = function_sorts
        .iter()
        .map(|ss| ss.iter().map(|&s| sort_bounds[s]).collect())
        .collect();
    let predicate_bounds: Vec<Vec<u32>> = predicate_sorts
        .iter()
        .map(|ss| ss.iter().map(|&s| sort_bounds[s]).collect())
        .collect();

    SortedSignature {
        sorts,
        sorted_constants,
        sorted_functions,
        sort_bounds,
        distinct_constants,
        function_bounds,
        predicate_bounds,
    }
}
