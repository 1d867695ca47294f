//! Algebra operator tree.
//!
//! [`Op`] is a closed enum: every consumer matches it exhaustively, so a new
//! operator kind cannot be added without every compiler path handling it.
//! Children are shared through [`Arc`] so subtrees can be recompiled per
//! input binding without cloning the tree.

// Allow matching arms with identical bodies - intentional for grouping
#![allow(clippy::match_same_arms)]

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use quarry_core::{Binding, TermPattern, TriplePattern, Variable};

use super::expr::Expr;

/// Sort direction for an ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Ascending,
    /// Descending.
    Descending,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// The expression to sort on.
    pub expr: Expr,
    /// The direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending key.
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self { expr, direction: SortDirection::Ascending }
    }

    /// Descending key.
    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self { expr, direction: SortDirection::Descending }
    }
}

/// An inline table of bindings (VALUES).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Declared variables. Rows may leave some unbound.
    pub vars: Vec<Variable>,
    /// Rows in order.
    pub rows: Vec<Binding>,
}

impl Table {
    /// Creates a table.
    #[must_use]
    pub const fn new(vars: Vec<Variable>, rows: Vec<Binding>) -> Self {
        Self { vars, rows }
    }

    /// The table with one empty row, the join identity.
    #[must_use]
    pub fn unit() -> Self {
        Self { vars: Vec::new(), rows: vec![Binding::empty()] }
    }
}

/// An engine-specific operator realized by a registered extension.
#[derive(Clone)]
pub struct OpExtension {
    /// Registry key for the realization.
    pub name: String,
    /// Opaque payload handed to the realization.
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl OpExtension {
    /// Creates an extension node payload.
    pub fn new(name: impl Into<String>, payload: impl Any + Send + Sync) -> Self {
        Self { name: name.into(), payload: Arc::new(payload) }
    }

    /// Downcasts the payload.
    #[must_use]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for OpExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpExtension")
            .field("name", &self.name)
            .field("payload", &"<opaque>")
            .finish()
    }
}

impl PartialEq for OpExtension {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.payload, &other.payload)
    }
}

/// An algebra operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ========== Leaf Nodes ==========
    /// Basic graph pattern over the active graph.
    Bgp(Vec<TriplePattern>),

    /// Triple patterns scoped to an explicit graph term or variable.
    QuadPattern {
        /// Graph IRI or variable.
        graph: TermPattern,
        /// Patterns matched inside that graph.
        patterns: Vec<TriplePattern>,
    },

    /// Enumerate the dataset's named graphs.
    DatasetNames {
        /// Variable to bind, or a constant name to test for.
        name: TermPattern,
    },

    /// Inline bindings.
    Table(Table),

    /// Engine-specific operator.
    Extension(OpExtension),

    // ========== Binary Nodes ==========
    /// Inner join.
    Join {
        /// Left input.
        left: Arc<Op>,
        /// Right input.
        right: Arc<Op>,
    },

    /// Optional (left outer) join.
    LeftJoin {
        /// Required side.
        left: Arc<Op>,
        /// Optional side.
        right: Arc<Op>,
        /// Condition evaluated over merged rows.
        filter: Option<Expr>,
    },

    /// Bag union.
    Union {
        /// First branch.
        left: Arc<Op>,
        /// Second branch.
        right: Arc<Op>,
    },

    // ========== Unary Nodes ==========
    /// Row restriction.
    Filter {
        /// Condition.
        expr: Expr,
        /// Input.
        sub: Arc<Op>,
    },

    /// Evaluate `sub` against a named graph.
    Graph {
        /// Graph IRI or variable.
        name: TermPattern,
        /// Input.
        sub: Arc<Op>,
    },

    /// Sort.
    Order {
        /// Keys, most significant first.
        keys: Vec<SortKey>,
        /// Input.
        sub: Arc<Op>,
    },

    /// Restrict visible variables.
    Project {
        /// Variables to keep.
        vars: Vec<Variable>,
        /// Input.
        sub: Arc<Op>,
    },

    /// Remove duplicate rows.
    Distinct {
        /// Input.
        sub: Arc<Op>,
    },

    /// OFFSET / LIMIT.
    Slice {
        /// Rows to skip.
        offset: usize,
        /// Maximum rows to yield, `None` for unbounded.
        limit: Option<usize>,
        /// Input.
        sub: Arc<Op>,
    },
}

impl Op {
    // ========== Constructors ==========

    /// A basic graph pattern.
    #[must_use]
    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Self::Bgp(patterns)
    }

    /// A graph-scoped pattern.
    pub fn quad_pattern(graph: impl Into<TermPattern>, patterns: Vec<TriplePattern>) -> Self {
        Self::QuadPattern { graph: graph.into(), patterns }
    }

    /// Named graph enumeration.
    pub fn dataset_names(name: impl Into<TermPattern>) -> Self {
        Self::DatasetNames { name: name.into() }
    }

    /// An inline table.
    #[must_use]
    pub fn table(vars: Vec<Variable>, rows: Vec<Binding>) -> Self {
        Self::Table(Table::new(vars, rows))
    }

    /// An extension node.
    #[must_use]
    pub fn extension(ext: OpExtension) -> Self {
        Self::Extension(ext)
    }

    /// Scopes `sub` to a named graph.
    pub fn graph(name: impl Into<TermPattern>, sub: Self) -> Self {
        Self::Graph { name: name.into(), sub: Arc::new(sub) }
    }

    /// Inner join of `self` and `right`.
    #[must_use]
    pub fn join(self, right: Self) -> Self {
        Self::Join { left: Arc::new(self), right: Arc::new(right) }
    }

    /// Optional join of `self` and `right`.
    #[must_use]
    pub fn left_join(self, right: Self, filter: Option<Expr>) -> Self {
        Self::LeftJoin { left: Arc::new(self), right: Arc::new(right), filter }
    }

    /// Union of `self` and `right`.
    #[must_use]
    pub fn union(self, right: Self) -> Self {
        Self::Union { left: Arc::new(self), right: Arc::new(right) }
    }

    /// Filters `self`.
    #[must_use]
    pub fn filter(self, expr: Expr) -> Self {
        Self::Filter { expr, sub: Arc::new(self) }
    }

    /// Sorts `self`.
    #[must_use]
    pub fn order_by(self, keys: Vec<SortKey>) -> Self {
        Self::Order { keys, sub: Arc::new(self) }
    }

    /// Projects `self`.
    #[must_use]
    pub fn project(self, vars: Vec<Variable>) -> Self {
        Self::Project { vars, sub: Arc::new(self) }
    }

    /// Removes duplicates from `self`.
    #[must_use]
    pub fn distinct(self) -> Self {
        Self::Distinct { sub: Arc::new(self) }
    }

    /// Applies offset and limit to `self`.
    #[must_use]
    pub fn slice(self, offset: usize, limit: Option<usize>) -> Self {
        Self::Slice { offset, limit, sub: Arc::new(self) }
    }

    // ========== Introspection ==========

    /// Short operator name for logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bgp(_) => "BGP",
            Self::QuadPattern { .. } => "QuadPattern",
            Self::DatasetNames { .. } => "DatasetNames",
            Self::Table(_) => "Table",
            Self::Extension(_) => "Extension",
            Self::Join { .. } => "Join",
            Self::LeftJoin { .. } => "LeftJoin",
            Self::Union { .. } => "Union",
            Self::Filter { .. } => "Filter",
            Self::Graph { .. } => "Graph",
            Self::Order { .. } => "Order",
            Self::Project { .. } => "Project",
            Self::Distinct { .. } => "Distinct",
            Self::Slice { .. } => "Slice",
        }
    }

    /// Direct children, left to right.
    #[must_use]
    pub fn children(&self) -> Vec<&Op> {
        match self {
            Self::Bgp(_)
            | Self::QuadPattern { .. }
            | Self::DatasetNames { .. }
            | Self::Table(_)
            | Self::Extension(_) => vec![],

            Self::Join { left, right }
            | Self::LeftJoin { left, right, .. }
            | Self::Union { left, right } => vec![left.as_ref(), right.as_ref()],

            Self::Filter { sub, .. }
            | Self::Graph { sub, .. }
            | Self::Order { sub, .. }
            | Self::Project { sub, .. }
            | Self::Distinct { sub }
            | Self::Slice { sub, .. } => vec![sub.as_ref()],
        }
    }

    /// Variables this subtree can bind.
    ///
    /// Extension nodes are opaque and contribute nothing.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<Variable>) {
        match self {
            Self::Bgp(patterns) => {
                vars.extend(patterns.iter().flat_map(|p| p.variables().cloned()));
            }
            Self::QuadPattern { graph, patterns } => {
                vars.extend(graph.as_variable().cloned());
                vars.extend(patterns.iter().flat_map(|p| p.variables().cloned()));
            }
            Self::DatasetNames { name } => vars.extend(name.as_variable().cloned()),
            Self::Table(table) => {
                vars.extend(table.vars.iter().cloned());
                vars.extend(table.rows.iter().flat_map(|row| row.variables().cloned()));
            }
            Self::Extension(_) => {}
            Self::Graph { name, sub } => {
                vars.extend(name.as_variable().cloned());
                sub.collect_variables(vars);
            }
            Self::Project { vars: projected, .. } => vars.extend(projected.iter().cloned()),
            _ => {
                for child in self.children() {
                    child.collect_variables(vars);
                }
            }
        }
    }

    /// Whether this node's own realization is correct when fed an arbitrary
    /// seed stream by substitution.
    ///
    /// Nodes whose result depends on the whole input (ordering, duplicate
    /// removal, slicing), hide variables (projection) or keep unmatched rows
    /// (optional join) are not: under a seed they are evaluated on their own
    /// and joined with the seed afterwards. A filter is seedable only when
    /// its subtree can bind every variable it mentions, so seed bindings
    /// never reach the condition.
    #[must_use]
    pub fn is_seedable(&self) -> bool {
        match self {
            Self::LeftJoin { .. }
            | Self::Order { .. }
            | Self::Project { .. }
            | Self::Distinct { .. }
            | Self::Slice { .. } => false,
            Self::Filter { expr, sub } => expr.variables().is_subset(&sub.variables()),
            _ => true,
        }
    }

    /// Whether this node can be probed directly with one binding at a time.
    #[must_use]
    pub const fn is_probeable(&self) -> bool {
        matches!(self, Self::Bgp(_) | Self::QuadPattern { .. })
    }

    /// Returns a displayable tree view of this operator.
    #[must_use]
    pub fn display_tree(&self) -> DisplayTree<'_> {
        DisplayTree { op: self }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_tree())
    }
}

/// Helper for tree-style operator display.
pub struct DisplayTree<'a> {
    op: &'a Op,
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(f, self.op, "", true)
    }
}

fn fmt_node(f: &mut fmt::Formatter<'_>, op: &Op, prefix: &str, is_last: bool) -> fmt::Result {
    let connector = if is_last { "└── " } else { "├── " };

    write!(f, "{prefix}{connector}")?;
    fmt_node_content(f, op)?;
    writeln!(f)?;

    let children = op.children();
    let new_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });

    for (i, child) in children.iter().enumerate() {
        fmt_node(f, child, &new_prefix, i == children.len() - 1)?;
    }

    Ok(())
}

fn fmt_patterns(f: &mut fmt::Formatter<'_>, patterns: &[TriplePattern]) -> fmt::Result {
    for (i, pattern) in patterns.iter().enumerate() {
        if i > 0 {
            write!(f, " . ")?;
        }
        write!(f, "{pattern}")?;
    }
    Ok(())
}

fn fmt_node_content(f: &mut fmt::Formatter<'_>, op: &Op) -> fmt::Result {
    match op {
        Op::Bgp(patterns) => {
            write!(f, "BGP: ")?;
            fmt_patterns(f, patterns)?;
        }
        Op::QuadPattern { graph, patterns } => {
            write!(f, "QuadPattern {graph}: ")?;
            fmt_patterns(f, patterns)?;
        }
        Op::DatasetNames { name } => write!(f, "DatasetNames: {name}")?,
        Op::Table(table) => write!(f, "Table: {} rows", table.rows.len())?,
        Op::Extension(ext) => write!(f, "Extension: {}", ext.name)?,
        Op::Join { .. } => write!(f, "Join")?,
        Op::LeftJoin { filter, .. } => {
            write!(f, "LeftJoin")?;
            if let Some(expr) = filter {
                write!(f, " [filter: {expr}]")?;
            }
        }
        Op::Union { .. } => write!(f, "Union")?,
        Op::Filter { expr, .. } => write!(f, "Filter: {expr}")?,
        Op::Graph { name, .. } => write!(f, "Graph: {name}")?,
        Op::Order { keys, .. } => {
            write!(f, "Order: ")?;
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                match key.direction {
                    SortDirection::Ascending => write!(f, "{}", key.expr)?,
                    SortDirection::Descending => write!(f, "{} DESC", key.expr)?,
                }
            }
        }
        Op::Project { vars, .. } => {
            write!(f, "Project:")?;
            for var in vars {
                write!(f, " {var}")?;
            }
        }
        Op::Distinct { .. } => write!(f, "Distinct")?,
        Op::Slice { offset, limit, .. } => match limit {
            Some(limit) => write!(f, "Slice: offset {offset}, limit {limit}")?,
            None => write!(f, "Slice: offset {offset}")?,
        },
    }
    Ok(())
}
