//! End-to-end tests for operator compilation.
//!
//! These tests compile operator trees against small in-memory datasets and
//! check the produced bindings:
//! - Pattern matching and joins
//! - Optional joins under both strategies
//! - Unions, graphs, tables and extensions
//! - Solution modifiers under a join seed
//! - Error propagation and cancellation

use std::sync::Arc;

use quarry_query::exec::operators::{BindingsIter, JoinKind, NestedLoopJoinIter};
use quarry_query::{
    execute, Binding, BoxedIter, Dataset, DatasetError, DatasetResult, ExecError, ExecResult,
    ExecutionConfig, ExecutionContext, Expr, ExtensionRealizer, ExtensionRegistry, GraphTarget,
    LeftJoinStrategy, MemoryDataset, Op, OpExtension, Quad, QuadCursor, QueryExecution, SortKey,
    Term, TermPattern, TriplePattern, Variable,
};

fn ex(local: &str) -> Term {
    Term::iri(format!("http://example.org/{local}"))
}

fn var(name: &str) -> Variable {
    Variable::new(name)
}

fn tp(s: impl Into<TermPattern>, p: &str, o: impl Into<TermPattern>) -> TriplePattern {
    TriplePattern::new(s, ex(p), o)
}

fn ctx(ds: MemoryDataset) -> ExecutionContext {
    ExecutionContext::new(Arc::new(ds))
}

/// `:a :p1 :x`, `:b :p1 :y`, `:b :p2 :z`
fn optional_fixture() -> MemoryDataset {
    let mut ds = MemoryDataset::new();
    ds.insert(ex("a"), ex("p1"), ex("x"));
    ds.insert(ex("b"), ex("p1"), ex("y"));
    ds.insert(ex("b"), ex("p2"), ex("z"));
    ds
}

/// People with ages and a `knows` graph.
fn people_fixture() -> MemoryDataset {
    let mut ds = MemoryDataset::new();
    for (name, age) in [("alice", 34), ("bob", 17), ("carol", 52), ("dave", 25)] {
        ds.insert(ex(name), ex("age"), Term::integer(age));
    }
    ds.insert(ex("alice"), ex("knows"), ex("bob"));
    ds.insert(ex("alice"), ex("knows"), ex("carol"));
    ds.insert(ex("carol"), ex("knows"), ex("dave"));
    ds
}

fn column(rows: &[Binding], name: &str) -> Vec<Option<Term>> {
    rows.iter().map(|row| row.get(&var(name)).cloned()).collect()
}

// ============================================================================
// Pattern Matching
// ============================================================================

mod patterns {
    use super::*;

    #[test]
    fn empty_bgp_yields_one_empty_binding() {
        let rows = execute(&Op::bgp(vec![]), ExecutionContext::default()).unwrap();
        assert_eq!(rows, vec![Binding::empty()]);
    }

    #[test]
    fn bgp_joins_patterns_by_substitution() {
        let op = Op::bgp(vec![
            tp(var("p"), "knows", var("q")),
            tp(var("q"), "age", var("age")),
        ]);
        let rows = execute(&op, ctx(people_fixture())).unwrap();

        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!(row.contains(&var("p")));
            assert!(row.contains(&var("q")));
            assert!(row.contains(&var("age")));
        }
    }

    #[test]
    fn repeated_variable_must_match_itself() {
        let mut ds = MemoryDataset::new();
        ds.insert(ex("a"), ex("same"), ex("a"));
        ds.insert(ex("a"), ex("same"), ex("b"));
        let rows = execute(&Op::bgp(vec![tp(var("x"), "same", var("x"))]), ctx(ds)).unwrap();

        assert_eq!(rows, vec![Binding::from_pairs([(var("x"), ex("a"))])]);
    }

    #[test]
    fn filter_placement_does_not_change_results() {
        let op = Op::bgp(vec![
            tp(var("p"), "knows", var("q")),
            tp(var("q"), "age", var("age")),
        ])
        .filter(Expr::var("age").gt_eq(Expr::integer(25)));

        let placed = execute(&op, ctx(people_fixture())).unwrap();
        let wrapped = execute(
            &op,
            ctx(people_fixture()).with_config(ExecutionConfig::new().with_filter_placement(false)),
        )
        .unwrap();

        assert_eq!(placed, wrapped);
        assert_eq!(placed.len(), 2);
    }

    #[test]
    fn filter_error_excludes_row() {
        // ?missing is never bound; the comparison fails for every row.
        let op = Op::bgp(vec![tp(var("p"), "age", var("age"))])
            .filter(Expr::var("missing").gt(Expr::integer(0)));
        assert!(execute(&op, ctx(people_fixture())).unwrap().is_empty());
    }
}

// ============================================================================
// Joins
// ============================================================================

mod joins {
    use super::*;

    #[test]
    fn join_feeds_left_output_into_right() {
        let op = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))])
            .join(Op::bgp(vec![tp(var("q"), "age", var("age"))]));
        let rows = execute(&op, ctx(people_fixture())).unwrap();

        assert_eq!(column(&rows, "age"), vec![Some(Term::integer(17)), Some(Term::integer(52))]);
    }

    #[test]
    fn disjoint_join_is_cross_product() {
        let op = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))])
            .join(Op::bgp(vec![tp(ex("carol"), "knows", var("r"))]));
        assert_eq!(execute(&op, ctx(people_fixture())).unwrap().len(), 2);
    }

    #[test]
    fn filter_scope_is_independent_of_join_order() {
        let mut ds = MemoryDataset::new();
        ds.insert(ex("a"), ex("age"), Term::integer(30));
        ds.insert(ex("a"), ex("name"), ex("n"));
        let ds = Arc::new(ds);

        let ages = Op::bgp(vec![tp(var("s"), "age", var("age"))]);
        // ?age is not bound inside the filtered side, so the filter always fails.
        let names = Op::bgp(vec![tp(var("s"), "name", var("n"))])
            .filter(Expr::var("age").gt(Expr::integer(18)));

        let ab = execute(&ages.clone().join(names.clone()), ExecutionContext::new(ds.clone()))
            .unwrap();
        let ba = execute(&names.join(ages), ExecutionContext::new(ds)).unwrap();

        assert_eq!(ab, ba);
        assert!(ab.is_empty());
    }

    #[test]
    fn filter_on_own_variables_still_runs_seeded() {
        let op = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))])
            .join(Op::bgp(vec![tp(var("q"), "age", var("age"))]).filter(
                Expr::var("age").gt(Expr::integer(18)),
            ));
        let rows = execute(&op, ctx(people_fixture())).unwrap();
        assert_eq!(column(&rows, "q"), vec![Some(ex("carol"))]);
    }

    #[test]
    fn left_join_keeps_unmatched_rows() {
        for strategy in [LeftJoinStrategy::Auto, LeftJoinStrategy::Exhaustive] {
            let op = Op::bgp(vec![tp(var("s"), "p1", var("o"))])
                .left_join(Op::bgp(vec![tp(var("s"), "p2", var("o2"))]), None);
            let context = ctx(optional_fixture())
                .with_config(ExecutionConfig::new().with_left_join_strategy(strategy));
            let rows = execute(&op, context).unwrap();

            assert_eq!(rows.len(), 2, "{strategy:?}");
            assert_eq!(rows[0].get(&var("s")), Some(&ex("a")));
            assert_eq!(rows[0].get(&var("o2")), None);
            assert_eq!(rows[1].get(&var("s")), Some(&ex("b")));
            assert_eq!(rows[1].get(&var("o2")), Some(&ex("z")));
        }
    }

    #[test]
    fn left_join_filter_sees_both_sides() {
        for strategy in [LeftJoinStrategy::Auto, LeftJoinStrategy::Exhaustive] {
            let op = Op::bgp(vec![tp(var("p"), "age", var("age"))]).left_join(
                Op::bgp(vec![tp(var("p"), "knows", var("q"))]),
                Some(Expr::var("age").gt(Expr::integer(40))),
            );
            let context = ctx(people_fixture())
                .with_config(ExecutionConfig::new().with_left_join_strategy(strategy));
            let rows = execute(&op, context).unwrap();

            // Only carol (52) keeps her optional match; alice's two are rejected.
            assert_eq!(rows.len(), 4, "{strategy:?}");
            let with_q: Vec<_> = rows.iter().filter(|r| r.contains(&var("q"))).collect();
            assert_eq!(with_q.len(), 1);
            assert_eq!(with_q[0].get(&var("p")), Some(&ex("carol")));
        }
    }

    #[test]
    fn left_join_with_non_pattern_optional_side() {
        let optional = Op::bgp(vec![tp(var("p"), "knows", var("q"))]).slice(0, Some(1));
        let op = Op::bgp(vec![tp(var("p"), "age", var("age"))]).left_join(optional, None);
        let rows = execute(&op, ctx(people_fixture())).unwrap();

        // The optional side is evaluated once: only its first row (alice) joins.
        assert_eq!(rows.len(), 4);
        assert_eq!(rows.iter().filter(|r| r.contains(&var("q"))).count(), 1);
    }
}

// ============================================================================
// Union, Graph, Table
// ============================================================================

mod structure {
    use super::*;

    #[test]
    fn union_keeps_left_then_right_with_duplicates() {
        let branch = || Op::bgp(vec![tp(ex("alice"), "knows", var("q"))]);
        let rows = execute(&branch().union(branch()), ctx(people_fixture())).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], rows[2]);
        assert_eq!(rows[1], rows[3]);
    }

    #[test]
    fn union_under_seed_replays_every_seed_row() {
        let seed = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))]);
        let union = Op::bgp(vec![tp(var("q"), "age", var("age"))])
            .union(Op::bgp(vec![tp(var("q"), "knows", var("r"))]));
        let rows = execute(&seed.join(union), ctx(people_fixture())).unwrap();

        // Left branch: bob 17, carol 52. Right branch: carol knows dave.
        assert_eq!(rows.len(), 3);
        assert_eq!(column(&rows, "age")[..2], [Some(Term::integer(17)), Some(Term::integer(52))]);
        assert_eq!(rows[2].get(&var("r")), Some(&ex("dave")));
    }

    fn graph_fixture() -> MemoryDataset {
        let mut ds = MemoryDataset::new();
        ds.insert(ex("s"), ex("p"), Term::string("default"));
        ds.insert_named(ex("g1"), ex("s"), ex("p"), Term::string("one"));
        ds.insert_named(ex("g2"), ex("s"), ex("p"), Term::string("two"));
        ds
    }

    #[test]
    fn graph_with_iri_scopes_patterns() {
        let op = Op::graph(ex("g2"), Op::bgp(vec![tp(ex("s"), "p", var("o"))]));
        let rows = execute(&op, ctx(graph_fixture())).unwrap();
        assert_eq!(column(&rows, "o"), vec![Some(Term::string("two"))]);
    }

    #[test]
    fn graph_with_variable_iterates_named_graphs() {
        let op = Op::graph(var("g"), Op::bgp(vec![tp(ex("s"), "p", var("o"))]));
        let rows = execute(&op, ctx(graph_fixture())).unwrap();

        assert_eq!(column(&rows, "g"), vec![Some(ex("g1")), Some(ex("g2"))]);
        assert_eq!(column(&rows, "o"), vec![Some(Term::string("one")), Some(Term::string("two"))]);
    }

    #[test]
    fn graph_variable_bound_by_seed() {
        let table = Op::table(vec![var("g")], vec![Binding::from_pairs([(var("g"), ex("g1"))])]);
        let op = table.join(Op::graph(var("g"), Op::bgp(vec![tp(ex("s"), "p", var("o"))])));
        let rows = execute(&op, ctx(graph_fixture())).unwrap();
        assert_eq!(column(&rows, "o"), vec![Some(Term::string("one"))]);
    }

    #[test]
    fn dataset_names_lists_and_filters() {
        let rows = execute(&Op::dataset_names(var("g")), ctx(graph_fixture())).unwrap();
        assert_eq!(column(&rows, "g"), vec![Some(ex("g1")), Some(ex("g2"))]);

        let rows = execute(&Op::dataset_names(ex("g2")), ctx(graph_fixture())).unwrap();
        assert_eq!(rows, vec![Binding::empty()]);
        let rows = execute(&Op::dataset_names(ex("nope")), ctx(graph_fixture())).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn table_rows_in_order() {
        let rows: Vec<_> =
            (1..=3).map(|i| Binding::from_pairs([(var("n"), Term::integer(i))])).collect();
        let result = execute(&Op::table(vec![var("n")], rows.clone()), ExecutionContext::default())
            .unwrap();
        assert_eq!(result, rows);
    }

    #[test]
    fn table_under_seed_keeps_compatible_rows() {
        let table = Op::table(
            vec![var("p"), var("label")],
            vec![
                Binding::from_pairs([(var("p"), ex("bob")), (var("label"), Term::string("Bob"))]),
                Binding::from_pairs([(var("p"), ex("zed")), (var("label"), Term::string("Zed"))]),
            ],
        );
        let op = Op::bgp(vec![tp(var("p"), "age", var("age"))]).join(table);
        let rows = execute(&op, ctx(people_fixture())).unwrap();

        assert_eq!(column(&rows, "label"), vec![Some(Term::string("Bob"))]);
    }
}

// ============================================================================
// Solution Modifiers
// ============================================================================

mod modifiers {
    use super::*;

    fn ages() -> Op {
        Op::bgp(vec![tp(var("p"), "age", var("age"))])
    }

    #[test]
    fn order_project_slice() {
        let op = ages()
            .order_by(vec![SortKey::desc(Expr::var("age"))])
            .project(vec![var("p")])
            .slice(1, Some(2));
        let rows = execute(&op, ctx(people_fixture())).unwrap();

        assert_eq!(column(&rows, "p"), vec![Some(ex("alice")), Some(ex("dave"))]);
        assert!(rows.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn distinct_after_project() {
        let op = Op::bgp(vec![tp(var("p"), "knows", var("q"))]).project(vec![var("p")]).distinct();
        let rows = execute(&op, ctx(people_fixture())).unwrap();
        assert_eq!(column(&rows, "p"), vec![Some(ex("alice")), Some(ex("carol"))]);
    }

    #[test]
    fn modifiers_under_join_seed_are_evaluated_independently() {
        // The sliced subtree is evaluated once and then joined, so the slice
        // limits the subtree, not the joined result.
        let left = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))]);
        let right = ages().order_by(vec![SortKey::asc(Expr::var("age"))]).slice(0, Some(1));
        let rows = execute(&left.join(right), ctx(people_fixture())).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.get(&var("age")) == Some(&Term::integer(17))));
    }

    #[test]
    fn project_drops_variables_seen_only_inside() {
        let left = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))]);
        // ?q is projected out of the inner pattern, so it does not join with the outer ?q.
        let right = Op::bgp(vec![tp(var("q"), "age", var("age"))]).project(vec![var("age")]);
        let rows = execute(&left.join(right), ctx(people_fixture())).unwrap();

        assert_eq!(rows.len(), 2 * 4);
    }

    #[test]
    fn slice_past_end_is_empty() {
        let rows = execute(&ages().slice(10, None), ctx(people_fixture())).unwrap();
        assert!(rows.is_empty());
    }
}

// ============================================================================
// Extensions
// ============================================================================

mod extensions {
    use super::*;

    /// Binds a variable to `0..n`.
    struct Range;

    struct RangeSpec {
        var: Variable,
        count: i64,
    }

    impl ExtensionRealizer for Range {
        fn realize(
            &self,
            ext: &OpExtension,
            seed: BoxedIter,
            ctx: &ExecutionContext,
        ) -> ExecResult<BoxedIter> {
            let range = ext
                .payload::<RangeSpec>()
                .ok_or_else(|| ExecError::unsupported("ex:range", "bad payload"))?;
            let rows = (0..range.count)
                .map(|i| Binding::from_pairs([(range.var.clone(), Term::integer(i))]))
                .collect();
            Ok(Box::new(NestedLoopJoinIter::new(
                JoinKind::Inner,
                None,
                seed,
                Box::new(BindingsIter::new(rows)),
                ctx.clone(),
            )))
        }
    }

    fn range(count: i64) -> Op {
        Op::extension(OpExtension::new("ex:range", RangeSpec { var: var("i"), count }))
    }

    #[test]
    fn missing_realization_is_unsupported() {
        let err = QueryExecution::new(&range(3), ExecutionContext::default()).err().unwrap();
        assert!(err.is_unsupported());
        assert!(matches!(err, ExecError::UnsupportedOperator { .. }));
    }

    #[test]
    fn registered_realization_is_used() {
        let registry = ExtensionRegistry::new().with("ex:range", Arc::new(Range));
        let context = ctx(people_fixture()).with_extensions(registry);
        let op = Op::bgp(vec![tp(ex("alice"), "knows", var("q"))]).join(range(3));

        assert_eq!(execute(&op, context).unwrap().len(), 6);
    }

    #[test]
    fn unsupported_inside_union_fails_whole_compile() {
        let op = Op::bgp(vec![]).union(range(1));
        let err = execute(&op, ExecutionContext::default()).unwrap_err();
        assert!(err.is_unsupported());
    }
}

// ============================================================================
// Errors and Cancellation
// ============================================================================

mod failures {
    use super::*;

    /// Yields one quad, then fails.
    struct FlakyDataset;

    impl Dataset for FlakyDataset {
        fn quads_for_pattern(
            &self,
            _subject: Option<&Term>,
            _predicate: Option<&Term>,
            _object: Option<&Term>,
            _graph: GraphTarget<'_>,
        ) -> DatasetResult<QuadCursor> {
            let first = Quad::new(ex("s"), ex("p"), ex("o"), None);
            Ok(Box::new(
                [Ok(first), Err(DatasetError::Storage("read failed".to_string()))].into_iter(),
            ))
        }

        fn graph_names(&self) -> DatasetResult<Vec<Term>> {
            Err(DatasetError::Storage("no catalog".to_string()))
        }
    }

    #[test]
    fn dataset_error_propagates() {
        let op = Op::bgp(vec![tp(var("s"), "p", var("o"))]);
        let mut execution =
            QueryExecution::new(&op, ExecutionContext::new(Arc::new(FlakyDataset))).unwrap();

        assert!(execution.next().unwrap().is_some());
        assert!(matches!(execution.next(), Err(ExecError::Dataset(DatasetError::Storage(_)))));
        assert!(execution.state().is_closed());
    }

    #[test]
    fn graph_names_error_propagates() {
        let err =
            execute(&Op::dataset_names(var("g")), ExecutionContext::new(Arc::new(FlakyDataset)))
                .unwrap_err();
        assert!(matches!(err, ExecError::Dataset(_)));
    }

    #[test]
    fn cancellation_before_first_row() {
        let context = ctx(people_fixture());
        context.cancel();
        let err = execute(&Op::bgp(vec![tp(var("p"), "age", var("age"))]), context).unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
    }

    #[test]
    fn buffer_limit_is_enforced() {
        let op = Op::bgp(vec![tp(var("p"), "age", var("age"))])
            .order_by(vec![SortKey::asc(Expr::var("age"))]);
        let context =
            ctx(people_fixture()).with_config(ExecutionConfig::new().with_max_rows_in_memory(2));
        let err = execute(&op, context).unwrap_err();
        assert!(matches!(err, ExecError::QueryTooLarge { limit: 2, .. }));
    }
}
