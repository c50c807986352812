//! Foreign-key dependency analysis: topological ordering, cycle detection,
//! wave batching, level grouping and pivot/root/leaf classification.
//!
//! Edge-case policy, applied uniformly: self-references never block ordering
//! and never count toward cycles; duplicate FKs to the same target count
//! once; FKs pointing outside the input set are treated as absent.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;

use crate::domain::error::SchemaError;
use crate::domain::schema::Table;

/// Pivot tables are named `<left>_<right>` by convention.
static PIVOT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+_[a-z0-9]+$").unwrap());

pub struct DependencyGraph<'a> {
    tables: Vec<&'a Table>,
    /// deps[i] — indexes of in-set tables that `tables[i]` references
    /// (self-references excluded, duplicates collapsed).
    deps: Vec<Vec<usize>>,
    /// reverse adjacency: tables that reference `tables[i]`.
    dependents: Vec<Vec<usize>>,
    /// referrer → referenced, used for path queries.
    graph: DiGraph<usize, ()>,
    node_of: HashMap<String, NodeIndex>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(tables: &'a [Table]) -> Self {
        let refs: Vec<&Table> = tables.iter().collect();
        let index_of: HashMap<&str, usize> = refs
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut graph = DiGraph::new();
        let mut node_of = HashMap::new();
        for (i, t) in refs.iter().enumerate() {
            let node = graph.add_node(i);
            node_of.insert(t.name.clone(), node);
        }

        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); refs.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); refs.len()];
        for (i, t) in refs.iter().enumerate() {
            let mut seen = HashSet::new();
            for fk in &t.foreign_keys {
                if fk.is_self_referencing(&t.name) {
                    continue;
                }
                // FKs whose target lives outside the input set are silently dropped.
                let Some(&j) = index_of.get(fk.referenced_table.as_str()) else {
                    continue;
                };
                if seen.insert(j) {
                    deps[i].push(j);
                    dependents[j].push(i);
                    graph.add_edge(node_of[&t.name], node_of[&refs[j].name], ());
                }
            }
        }

        DependencyGraph {
            tables: refs,
            deps,
            dependents,
            graph,
            node_of,
        }
    }

    // ── Ordering ────────────────────────────────────────────────────────────

    /// Topological order: for every FK `A → B` with both endpoints in the
    /// set, `B` precedes `A`. Fails with the first detected cycle; order
    /// among independent tables is the input order.
    pub fn resolve(&self) -> Result<Vec<&'a Table>, SchemaError> {
        let cycles = self.detect_cycles();
        if let Some(first) = cycles.into_iter().next() {
            return Err(SchemaError::CircularDependency { cycle: first });
        }
        Ok(self.sorted_best_effort())
    }

    /// The order `resolve` would return, but cycle-tolerant: tables caught
    /// in a cycle are appended in input order after everything placeable.
    /// This is the order batch emission degrades to.
    pub fn sorted_best_effort(&self) -> Vec<&'a Table> {
        let n = self.tables.len();
        let mut emitted = vec![false; n];
        let mut order = Vec::with_capacity(n);

        // Repeatedly take the first table (in input order) whose in-set
        // dependencies are all emitted. Quadratic, but n is table count.
        loop {
            let mut placed = false;
            for i in 0..n {
                if emitted[i] {
                    continue;
                }
                if self.deps[i].iter().all(|&j| emitted[j]) {
                    emitted[i] = true;
                    order.push(self.tables[i]);
                    placed = true;
                    break;
                }
            }
            if !placed {
                break;
            }
        }
        // Anything left participates in a cycle.
        for i in 0..n {
            if !emitted[i] {
                order.push(self.tables[i]);
            }
        }
        order
    }

    // ── Cycles ──────────────────────────────────────────────────────────────

    /// Depth-first traversal with an explicit recursion stack. Each reported
    /// cycle is the walk from the first occurrence of the repeated node back
    /// to itself, with the repeated node appended to close the loop.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        let n = self.tables.len();
        let mut color = vec![WHITE; n];
        let mut cycles = Vec::new();

        // Recursive DFS via an explicit stack of (node, next-dep cursor).
        for start in 0..n {
            if color[start] != WHITE {
                continue;
            }
            let mut path: Vec<usize> = Vec::new();
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = GRAY;
            path.push(start);

            while !stack.is_empty() {
                let (node, cursor) = *stack.last().unwrap();
                if cursor < self.deps[node].len() {
                    stack.last_mut().unwrap().1 += 1;
                    let next = self.deps[node][cursor];
                    match color[next] {
                        WHITE => {
                            color[next] = GRAY;
                            path.push(next);
                            stack.push((next, 0));
                        }
                        GRAY => {
                            let pos = path.iter().position(|&p| p == next).unwrap();
                            let mut cycle: Vec<String> = path[pos..]
                                .iter()
                                .map(|&p| self.tables[p].name.clone())
                                .collect();
                            cycle.push(self.tables[next].name.clone());
                            cycles.push(cycle);
                        }
                        _ => {}
                    }
                } else {
                    color[node] = BLACK;
                    path.pop();
                    stack.pop();
                }
            }
        }
        cycles
    }

    /// Names of every table that participates in at least one cycle.
    pub fn cycle_members(&self) -> HashSet<String> {
        self.detect_cycles()
            .into_iter()
            .flatten()
            .collect()
    }

    /// True iff adding an FK `from → to` would close a loop, i.e. a path
    /// from `to` back to `from` already exists.
    pub fn would_create_cycle(&self, from: &str, to: &str) -> bool {
        let (Some(&f), Some(&t)) = (self.node_of.get(from), self.node_of.get(to)) else {
            return false;
        };
        has_path_connecting(&self.graph, t, f, None)
    }

    // ── Grouping ────────────────────────────────────────────────────────────

    /// Waves where no table references another inside the same wave. Walks
    /// the sorted list and closes the current wave whenever the next table
    /// references something already in it.
    pub fn group_into_batches(&self) -> Vec<Vec<&'a Table>> {
        let order = self.sorted_best_effort();
        let index_of: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut batches: Vec<Vec<&Table>> = Vec::new();
        let mut current: Vec<&Table> = Vec::new();
        let mut current_names: HashSet<&str> = HashSet::new();

        for table in order {
            let i = index_of[table.name.as_str()];
            let blocked = self.deps[i]
                .iter()
                .any(|&j| current_names.contains(self.tables[j].name.as_str()));
            if blocked && !current.is_empty() {
                batches.push(std::mem::take(&mut current));
                current_names.clear();
            }
            current_names.insert(table.name.as_str());
            current.push(table);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    /// Iterative fixed point: level 0 holds tables with no in-set
    /// dependencies; level k holds tables whose every dependency sits at a
    /// level below k. Tables trapped in cycles never settle and are omitted.
    pub fn group_by_level(&self) -> BTreeMap<usize, Vec<String>> {
        let n = self.tables.len();
        let mut level: Vec<Option<usize>> = vec![None; n];

        loop {
            let mut changed = false;
            for i in 0..n {
                if level[i].is_some() {
                    continue;
                }
                let deps = &self.deps[i];
                if deps.iter().all(|&j| level[j].is_some()) {
                    let assigned = deps
                        .iter()
                        .map(|&j| level[j].unwrap() + 1)
                        .max()
                        .unwrap_or(0);
                    level[i] = Some(assigned);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut grouped: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for i in 0..n {
            if let Some(l) = level[i] {
                grouped.entry(l).or_default().push(self.tables[i].name.clone());
            }
        }
        grouped
    }

    // ── Classification ──────────────────────────────────────────────────────

    /// A pivot joins two other tables in a many-to-many relation: exactly
    /// two in-set FKs, a `left_right` name, and no meaningful payload beyond
    /// the keys (an id, timestamps and at most one extra column).
    pub fn is_pivot(&self, table: &Table) -> bool {
        let Some(i) = self
            .tables
            .iter()
            .position(|t| t.name == table.name)
        else {
            return false;
        };
        let in_set_fks = self.tables[i]
            .foreign_keys
            .iter()
            .filter(|fk| {
                self.tables
                    .iter()
                    .any(|t| t.name == fk.referenced_table)
            })
            .count();
        if in_set_fks != 2 {
            return false;
        }
        if !PIVOT_NAME.is_match(&table.name) {
            return false;
        }
        let mut allowed = 2 + 1; // the two keys plus one extra
        if table.has_column("id") {
            allowed += 1;
        }
        if table.has_timestamps() {
            allowed += 2;
        }
        table.columns.len() <= allowed
    }

    pub fn pivot_tables(&self) -> Vec<&'a Table> {
        self.tables
            .iter()
            .copied()
            .filter(|t| self.is_pivot(t))
            .collect()
    }

    /// Tables that depend on nothing inside the set. Pivots are excluded by
    /// construction (they carry two FKs).
    pub fn root_tables(&self) -> Vec<&'a Table> {
        self.tables
            .iter()
            .enumerate()
            .filter(|(i, t)| self.deps[*i].is_empty() && !self.is_pivot(t))
            .map(|(_, t)| *t)
            .collect()
    }

    /// Tables nothing inside the set references. A pivot is never a leaf
    /// even though it is typically unreferenced.
    pub fn leaf_tables(&self) -> Vec<&'a Table> {
        self.tables
            .iter()
            .enumerate()
            .filter(|(i, t)| self.dependents[*i].is_empty() && !self.is_pivot(t))
            .map(|(_, t)| *t)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
