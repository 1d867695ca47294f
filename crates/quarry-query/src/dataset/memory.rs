//! In-memory dataset.

use std::collections::{BTreeMap, BTreeSet};

use quarry_core::{Quad, Term};

use super::{Dataset, DatasetResult, GraphTarget, QuadCursor};

type Triple = (Term, Term, Term);

/// A dataset held in ordered sets: one default graph plus named graphs.
///
/// Scans materialize the matching quads up front, so a cursor never
/// observes later inserts.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    default_graph: BTreeSet<Triple>,
    named: BTreeMap<Term, BTreeSet<Triple>>,
}

impl MemoryDataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a triple into the default graph.
    pub fn insert(&mut self, subject: Term, predicate: Term, object: Term) -> bool {
        self.default_graph.insert((subject, predicate, object))
    }

    /// Inserts a triple into a named graph, creating the graph if needed.
    pub fn insert_named(&mut self, graph: Term, subject: Term, predicate: Term, object: Term) -> bool {
        self.named.entry(graph).or_default().insert((subject, predicate, object))
    }

    /// Inserts a quad.
    pub fn insert_quad(&mut self, quad: Quad) -> bool {
        match quad.graph_name {
            Some(graph) => self.insert_named(graph, quad.subject, quad.predicate, quad.object),
            None => self.insert(quad.subject, quad.predicate, quad.object),
        }
    }

    /// Total number of stored triples across all graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.default_graph.len() + self.named.values().map(BTreeSet::len).sum::<usize>()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scan_graph(
        triples: &BTreeSet<Triple>,
        graph_name: Option<&Term>,
        pattern: [Option<&Term>; 3],
        out: &mut Vec<DatasetResult<Quad>>,
    ) {
        let [s, p, o] = pattern;
        let matches = |want: Option<&Term>, have: &Term| want.map_or(true, |w| w == have);
        out.extend(
            triples
                .iter()
                .filter(|(ts, tp, to)| matches(s, ts) && matches(p, tp) && matches(o, to))
                .map(|(ts, tp, to)| {
                    Ok(Quad::new(ts.clone(), tp.clone(), to.clone(), graph_name.cloned()))
                }),
        );
    }
}

impl Dataset for MemoryDataset {
    fn quads_for_pattern(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: GraphTarget<'_>,
    ) -> DatasetResult<QuadCursor> {
        let pattern = [subject, predicate, object];
        let mut out = Vec::new();
        match graph {
            GraphTarget::Default => Self::scan_graph(&self.default_graph, None, pattern, &mut out),
            GraphTarget::Named(name) => {
                if let Some(triples) = self.named.get(name) {
                    Self::scan_graph(triples, Some(name), pattern, &mut out);
                }
            }
            GraphTarget::AnyNamed => {
                for (name, triples) in &self.named {
                    Self::scan_graph(triples, Some(name), pattern, &mut out);
                }
            }
        }
        Ok(Box::new(out.into_iter()))
    }

    fn graph_names(&self) -> DatasetResult<Vec<Term>> {
        Ok(self.named.keys().cloned().collect())
    }
}
