//! The view pipeline.
//!
//! [`project`] turns the row tree, column registry, expansion flags and a
//! [`ViewQuery`] into the flat list of rows a host paints. It owns no state
//! and never mutates its inputs.
//!
//! Stages run in this order:
//!
//! 1. **Filter and search** mark every row that matches. A row is kept if it
//!    matches or if any of its descendants is kept; rows kept only to give a
//!    match its context carry `matched == false`.
//! 2. **Sort** orders each kept sibling list with the same comparator.
//! 3. **Flatten** walks the kept rows in pre-order and descends only into
//!    expanded rows. A match below a collapsed row stays hidden.
//!
//! # Example
//!
//! ```
//! use horizon_grid::model::{
//!     project, CellType, ColumnDef, ColumnRegistry, ExpansionState, NewRow, RowTree, SortOrder,
//!     SortSpec, ViewQuery,
//! };
//!
//! let columns = ColumnRegistry::from_defs([ColumnDef::new("name", "Name", CellType::Text)]).unwrap();
//! let mut rows = RowTree::new();
//! let b = rows.insert_root(NewRow::new().with_value("name", "B"));
//! let a = rows.insert_root(NewRow::new().with_value("name", "A"));
//!
//! let query = ViewQuery::new().with_sort(SortSpec::new("name", SortOrder::Ascending));
//! let view = project(&rows, &columns, &ExpansionState::new(), &query);
//! assert_eq!(view.row_ids(), vec![a, b]);
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::cell_type::SortKey;
use super::column::{ColumnDef, ColumnRegistry};
use super::expansion::ExpansionState;
use super::row_tree::{RowId, RowNode, RowTree};
use super::value::CellValue;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first; empty cells lead.
    #[default]
    Ascending,
    /// Largest first; empty cells trail.
    Descending,
}

impl SortOrder {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Column and direction to sort by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    /// Column key.
    pub column: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Creates a sort spec.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// The sort that results from clicking `column`'s header: the same
    /// column flips direction, any other column starts ascending.
    pub fn click(current: Option<&SortSpec>, column: &str) -> SortSpec {
        match current {
            Some(spec) if spec.column == column => SortSpec::new(column, spec.order.reversed()),
            _ => SortSpec::new(column, SortOrder::Ascending),
        }
    }
}

/// Search, filters and sort applied by [`project`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    /// Case-insensitive substring matched against every value of a row.
    #[serde(default)]
    pub search: String,
    /// Exact, case-insensitive match of a column's display string.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Optional ordering of each sibling list.
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl ViewQuery {
    /// A query that shows everything in tree order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search term.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Adds a filter.
    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    /// Sets the sort.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Filters with a non-blank value.
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.filters
            .iter()
            .map(|(key, value)| (key.as_str(), value.trim()))
            .filter(|(_, value)| !value.is_empty())
    }

    /// Returns `true` if search or any filter would hide rows.
    pub fn is_filtering(&self) -> bool {
        !self.search.trim().is_empty() || self.active_filters().next().is_some()
    }
}

/// One painted row.
#[derive(Debug, Clone, Copy)]
pub struct VisibleRow<'a> {
    /// The row.
    pub row: &'a RowNode,
    /// Nesting depth, roots are 0.
    pub depth: usize,
    /// Parent id, `None` for roots.
    pub parent: Option<RowId>,
    /// Whether the row has children that survive filtering, i.e. whether an
    /// expander should be drawn.
    pub has_children: bool,
    /// Whether the row is expanded.
    pub expanded: bool,
    /// `false` if the row is shown only because a descendant matched.
    pub matched: bool,
}

impl VisibleRow<'_> {
    /// The row id.
    pub fn id(&self) -> RowId {
        self.row.id()
    }
}

/// Output of [`project`].
#[derive(Debug, Clone)]
pub struct GridView<'a> {
    /// Rows in paint order.
    pub rows: Vec<VisibleRow<'a>>,
    /// Visible columns in display order.
    pub columns: Vec<&'a ColumnDef>,
}

impl<'a> GridView<'a> {
    /// Number of painted rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows are painted.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row ids in paint order.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().map(VisibleRow::id).collect()
    }

    /// Visible column keys in display order.
    pub fn column_keys(&self) -> Vec<&'a str> {
        self.columns.iter().map(|def| def.key.as_str()).collect()
    }

    /// Display strings of one painted row, one per visible column.
    pub fn cells(&self, index: usize) -> Option<Vec<String>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .map(|def| row.row.value(&def.key).map(|v| def.display(v)).unwrap_or_default())
                .collect(),
        )
    }
}

/// Projects the tree into the rows to paint.
#[tracing::instrument(skip_all, target = "horizon_grid::view", level = "trace", fields(rows = rows.len()))]
pub fn project<'a>(
    rows: &'a RowTree,
    columns: &'a ColumnRegistry,
    expansion: &ExpansionState,
    query: &ViewQuery,
) -> GridView<'a> {
    let matcher = Matcher::new(columns, query);
    let kept = if matcher.is_active() {
        mark(rows, &matcher)
    } else {
        HashMap::new()
    };

    let sorter = query
        .sort
        .as_ref()
        .and_then(|spec| columns.get(&spec.column).map(|def| (def, spec.order)));

    let mut projection = Projection {
        rows,
        expansion,
        kept: matcher.is_active().then_some(&kept),
        sorter,
        out: Vec::new(),
    };
    projection.walk();

    tracing::trace!(
        target: horizon_grid_core::logging::targets::VIEW,
        visible = projection.out.len(),
        filtering = matcher.is_active(),
        "projected view"
    );
    GridView {
        rows: projection.out,
        columns: columns.visible_columns(),
    }
}

/// Lowercased search term and filters, resolved against the columns.
struct Matcher<'q> {
    columns: &'q ColumnRegistry,
    search: Option<String>,
    filters: Vec<(&'q str, String)>,
}

impl<'q> Matcher<'q> {
    fn new(columns: &'q ColumnRegistry, query: &'q ViewQuery) -> Self {
        let search = query.search.trim();
        Self {
            columns,
            search: (!search.is_empty()).then(|| search.to_lowercase()),
            filters: query
                .active_filters()
                .map(|(key, value)| (key, value.to_lowercase()))
                .collect(),
        }
    }

    fn is_active(&self) -> bool {
        self.search.is_some() || !self.filters.is_empty()
    }

    fn display(&self, key: &str, value: &CellValue) -> String {
        match self.columns.get(key) {
            Some(def) => def.display(value),
            None => value.to_display_string(),
        }
    }

    fn matches(&self, row: &RowNode) -> bool {
        let filters_pass = self.filters.iter().all(|(key, wanted)| {
            row.value(key)
                .map(|value| self.display(key, value).trim().to_lowercase() == *wanted)
                .unwrap_or(false)
        });
        if !filters_pass {
            return false;
        }
        match &self.search {
            None => true,
            Some(term) => row
                .values()
                .iter()
                .any(|(key, value)| self.display(key, value).to_lowercase().contains(term.as_str())),
        }
    }
}

/// Maps every kept row to its own match flag.
fn mark(rows: &RowTree, matcher: &Matcher<'_>) -> HashMap<RowId, bool> {
    let order: Vec<&RowNode> = rows.preorder().map(|entry| entry.row).collect();
    let mut kept = HashMap::new();
    // Reverse pre-order settles every child before its parent.
    for node in order.into_iter().rev() {
        let matched = matcher.matches(node);
        let descendant_kept = node.children().iter().any(|child| kept.contains_key(child));
        if matched || descendant_kept {
            kept.insert(node.id(), matched);
        }
    }
    kept
}

struct Projection<'a, 'k> {
    rows: &'a RowTree,
    expansion: &'k ExpansionState,
    kept: Option<&'k HashMap<RowId, bool>>,
    sorter: Option<(&'a ColumnDef, SortOrder)>,
    out: Vec<VisibleRow<'a>>,
}

impl<'a> Projection<'a, '_> {
    fn is_kept(&self, id: RowId) -> bool {
        self.kept.is_none_or(|kept| kept.contains_key(&id))
    }

    fn siblings(&self, ids: &[RowId]) -> Vec<&'a RowNode> {
        let mut level: Vec<&'a RowNode> = ids
            .iter()
            .filter(|&&id| self.is_kept(id))
            .filter_map(|id| self.rows.get(*id))
            .collect();

        if let Some((def, order)) = self.sorter {
            let caps = def.capabilities();
            let mut keyed: Vec<(SortKey, &'a RowNode)> = level
                .into_iter()
                .map(|node| (caps.sort_key(node.value(&def.key)), node))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = a.cmp(b);
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
            level = keyed.into_iter().map(|(_, node)| node).collect();
        }
        level
    }

    /// Emits rows in pre-order, sorting each sibling list as it is entered.
    fn walk(&mut self) {
        let mut stack: Vec<(&'a RowNode, usize, Option<RowId>)> = self
            .siblings(self.rows.roots())
            .into_iter()
            .rev()
            .map(|node| (node, 0, None))
            .collect();
        while let Some((node, depth, parent)) = stack.pop() {
            let id = node.id();
            let has_children = node.children().iter().any(|&child| self.is_kept(child));
            let expanded = self.expansion.is_expanded(id);
            let matched = self
                .kept
                .is_none_or(|kept| kept.get(&id).copied().unwrap_or(false));
            self.out.push(VisibleRow {
                row: node,
                depth,
                parent,
                has_children,
                expanded,
                matched,
            });
            if expanded && has_children {
                let children = self.siblings(node.children());
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1, Some(id))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellType, NewRow};

    fn columns() -> ColumnRegistry {
        ColumnRegistry::from_defs([
            ColumnDef::new("name", "Name", CellType::Text),
            ColumnDef::new("amount", "Amount", CellType::Number),
            ColumnDef::new("state", "State", CellType::Select).with_options(["Matched", "Unmatched"]),
        ])
        .unwrap()
    }

    fn ledger() -> (RowTree, Vec<RowId>) {
        let mut rows = RowTree::new();
        let march = rows.insert_root(NewRow::new().with_value("name", "March"));
        let deposit = rows
            .insert_child(
                march,
                NewRow::new()
                    .with_value("name", "Deposit")
                    .with_value("amount", 900)
                    .with_value("state", "Matched"),
            )
            .unwrap();
        let fee = rows
            .insert_child(
                march,
                NewRow::new()
                    .with_value("name", "Bank fee")
                    .with_value("amount", 12)
                    .with_value("state", "Unmatched"),
            )
            .unwrap();
        let april = rows.insert_root(NewRow::new().with_value("name", "April"));
        (rows, vec![march, deposit, fee, april])
    }

    #[test]
    fn test_sort_toggle_example() {
        let columns = columns();
        let mut rows = RowTree::new();
        let one = rows.insert_root(NewRow::new().with_value("name", "B"));
        let two = rows.insert_root(NewRow::new().with_value("name", "A"));
        let expansion = ExpansionState::new();

        let first = SortSpec::click(None, "name");
        let query = ViewQuery::new().with_sort(first.clone());
        assert_eq!(project(&rows, &columns, &expansion, &query).row_ids(), vec![two, one]);

        let second = SortSpec::click(Some(&first), "name");
        assert_eq!(second.order, SortOrder::Descending);
        let query = ViewQuery::new().with_sort(second);
        assert_eq!(project(&rows, &columns, &expansion, &query).row_ids(), vec![one, two]);
    }

    #[test]
    fn test_click_other_column_resets_to_ascending() {
        let current = SortSpec::new("name", SortOrder::Descending);
        assert_eq!(
            SortSpec::click(Some(&current), "amount"),
            SortSpec::new("amount", SortOrder::Ascending)
        );
    }

    #[test]
    fn test_numeric_sort_per_sibling_list() {
        let columns = columns();
        let (rows, ids) = ledger();
        let mut expansion = ExpansionState::new();
        expansion.expand(ids[0]);

        let query = ViewQuery::new().with_sort(SortSpec::new("amount", SortOrder::Ascending));
        let view = project(&rows, &columns, &expansion, &query);
        // Roots have no amount and keep their order; children sort 12 < 900.
        assert_eq!(view.row_ids(), vec![ids[0], ids[2], ids[1], ids[3]]);
        assert_eq!(view.rows[1].depth, 1);
        assert_eq!(view.rows[1].parent, Some(ids[0]));
    }

    #[test]
    fn test_sort_is_stable_and_empty_first() {
        let columns = columns();
        let mut rows = RowTree::new();
        let a = rows.insert_root(NewRow::new().with_value("amount", 5));
        let b = rows.insert_root(NewRow::new());
        let c = rows.insert_root(NewRow::new().with_value("amount", 5));
        let d = rows.insert_root(NewRow::new().with_value("amount", -1));
        let expansion = ExpansionState::new();

        let asc = ViewQuery::new().with_sort(SortSpec::new("amount", SortOrder::Ascending));
        assert_eq!(project(&rows, &columns, &expansion, &asc).row_ids(), vec![b, d, a, c]);

        let desc = ViewQuery::new().with_sort(SortSpec::new("amount", SortOrder::Descending));
        assert_eq!(project(&rows, &columns, &expansion, &desc).row_ids(), vec![a, c, d, b]);
    }

    #[test]
    fn test_filter_keeps_context_ancestors() {
        let columns = columns();
        let (rows, ids) = ledger();
        let mut expansion = ExpansionState::new();
        expansion.expand(ids[0]);

        let query = ViewQuery::new().with_filter("state", "unmatched");
        let view = project(&rows, &columns, &expansion, &query);
        assert_eq!(view.row_ids(), vec![ids[0], ids[2]]);
        assert!(!view.rows[0].matched);
        assert!(view.rows[1].matched);
    }

    #[test]
    fn test_match_under_collapsed_parent_stays_hidden() {
        let columns = columns();
        let (rows, ids) = ledger();
        let expansion = ExpansionState::new();

        let query = ViewQuery::new().with_search("FEE");
        let view = project(&rows, &columns, &expansion, &query);
        assert_eq!(view.row_ids(), vec![ids[0]]);
        assert!(view.rows[0].has_children);
        assert!(!view.rows[0].expanded);
    }

    #[test]
    fn test_blank_search_and_filters_are_inactive() {
        let columns = columns();
        let (rows, ids) = ledger();
        let expansion = ExpansionState::new();

        let query = ViewQuery::new().with_search("   ").with_filter("state", "");
        assert!(!query.is_filtering());
        let view = project(&rows, &columns, &expansion, &query);
        assert_eq!(view.row_ids(), vec![ids[0], ids[3]]);
        assert!(view.rows.iter().all(|r| r.matched));
    }

    #[test]
    fn test_search_matches_any_value() {
        let columns = columns();
        let (rows, ids) = ledger();
        let mut expansion = ExpansionState::new();
        expansion.expand(ids[0]);

        let view = project(&rows, &columns, &expansion, &ViewQuery::new().with_search("900"));
        assert_eq!(view.row_ids(), vec![ids[0], ids[1]]);

        let view = project(&rows, &columns, &expansion, &ViewQuery::new().with_search("apr"));
        assert_eq!(view.row_ids(), vec![ids[3]]);
    }

    #[test]
    fn test_filter_and_search_combine() {
        let columns = columns();
        let (rows, ids) = ledger();
        let mut expansion = ExpansionState::new();
        expansion.expand(ids[0]);

        let query = ViewQuery::new().with_filter("state", "Matched").with_search("fee");
        assert!(project(&rows, &columns, &expansion, &query).is_empty());
    }

    #[test]
    fn test_hidden_columns_and_cells() {
        let mut columns = columns();
        columns.set_visible("amount", false).unwrap();
        let (rows, ids) = ledger();
        let mut expansion = ExpansionState::new();
        expansion.expand(ids[0]);

        let view = project(&rows, &columns, &expansion, &ViewQuery::new());
        assert_eq!(view.column_keys(), vec!["name", "state"]);
        assert_eq!(
            view.cells(1),
            Some(vec!["Deposit".to_string(), "Matched".to_string()])
        );
        assert_eq!(view.cells(9), None);
    }

    #[test]
    fn test_deep_chain_projects_without_recursion() {
        const DEPTH: usize = 20_000;

        let worker = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let columns = columns();
                let mut rows = RowTree::new();
                let mut last = rows.insert_root(NewRow::new().with_value("name", "Level 0"));
                for level in 1..DEPTH {
                    let row = NewRow::new().with_value("name", format!("Level {level}"));
                    last = rows.insert_child(last, row).unwrap();
                }
                rows.set_value(last, "state", CellValue::from("Matched")).unwrap();
                let mut expansion = ExpansionState::new();
                expansion.expand_all(&rows);

                let query = ViewQuery::new()
                    .with_filter("state", "Matched")
                    .with_sort(SortSpec::new("name", SortOrder::Descending));
                let view = project(&rows, &columns, &expansion, &query);
                assert_eq!(view.len(), DEPTH);
                assert_eq!(view.row_ids().last(), Some(&last));

                let matched: Vec<bool> = view.rows.iter().map(|row| row.matched).collect();
                assert_eq!(matched.iter().filter(|&&m| m).count(), 1);
                assert!(matched[DEPTH - 1]);
            })
            .unwrap();
        worker.join().unwrap();
    }
}
