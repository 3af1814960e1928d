//! `EXPLAIN QUERY PLAN` tree assembly and rendering.
//!
//! SQLite's `EXPLAIN QUERY PLAN` returns a flat table of `(id, parent,
//! notused, detail)` rows; this module turns that table into a tree keyed
//! by `parent` and renders it as indented text. Plain `EXPLAIN` (the
//! bytecode program) is out of scope — `cursor.explain` always upgrades the
//! SQL to `EXPLAIN QUERY PLAN` before calling the driver.

use std::fmt;

use rqlite_client_core::error::Error;
use serde_json::Value;

/// One row of an `EXPLAIN QUERY PLAN` result, plus its children.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainNode {
    pub id: i64,
    pub detail: String,
    pub children: Vec<ExplainNode>,
}

/// The assembled plan tree: every row whose `parent == 0` is a root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplainTree {
    pub roots: Vec<ExplainNode>,
}

/// How [`ExplainTree::render`] turns a tree into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplainFormat {
    /// Indented tree text — [`ExplainTree`]'s `Display` impl.
    #[default]
    Tree,
    /// One row per line, flattened in traversal order, no indentation.
    Flat,
}

struct Row {
    id: i64,
    parent: i64,
    detail: String,
}

fn row_from_values(values: &[Value]) -> Result<Row, Error> {
    let id = values
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::protocol("EXPLAIN QUERY PLAN row missing integer id"))?;
    let parent = values
        .get(1)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::protocol("EXPLAIN QUERY PLAN row missing integer parent"))?;
    let detail = values
        .get(3)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::protocol("EXPLAIN QUERY PLAN row missing string detail"))?
        .to_string();
    Ok(Row { id, parent, detail })
}

impl ExplainTree {
    /// Assembles `rows` (each `[id, parent, notused, detail]`) into a tree.
    pub fn from_rows(rows: &[Vec<Value>]) -> Result<Self, Error> {
        let parsed: Vec<Row> = rows.iter().map(|r| row_from_values(r)).collect::<Result<_, _>>()?;

        fn build(parsed: &[Row], parent: i64) -> Vec<ExplainNode> {
            parsed
                .iter()
                .filter(|r| r.parent == parent)
                .map(|r| ExplainNode { id: r.id, detail: r.detail.clone(), children: build(parsed, r.id) })
                .collect()
        }

        Ok(ExplainTree { roots: build(&parsed, 0) })
    }

    /// Renders this tree as text in the given format, without the
    /// indentation `Flat` deliberately drops.
    pub fn render(&self, format: ExplainFormat) -> String {
        match format {
            ExplainFormat::Tree => self.to_string(),
            ExplainFormat::Flat => {
                fn collect(nodes: &[ExplainNode], out: &mut String) {
                    for node in nodes {
                        out.push_str(&node.detail);
                        out.push('\n');
                        collect(&node.children, out);
                    }
                }
                let mut out = String::new();
                collect(&self.roots, &mut out);
                out
            }
        }
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &ExplainNode, depth: usize) -> fmt::Result {
    writeln!(f, "{}{}", "  ".repeat(depth), node.detail)?;
    for child in &node.children {
        write_node(f, child, depth + 1)?;
    }
    Ok(())
}

impl fmt::Display for ExplainTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            write_node(f, root, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, parent: i64, detail: &str) -> Vec<Value> {
        vec![Value::from(id), Value::from(parent), Value::from(0), Value::from(detail)]
    }

    #[test]
    fn assembles_a_flat_scan_into_a_single_root() {
        let rows = vec![row(1, 0, "SCAN t")];
        let tree = ExplainTree::from_rows(&rows).unwrap();
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].detail, "SCAN t");
        assert!(tree.roots[0].children.is_empty());
    }

    #[test]
    fn nests_children_under_their_parent() {
        let rows = vec![
            row(1, 0, "SCAN t1"),
            row(2, 1, "SEARCH t2 USING INDEX idx (x=?)"),
            row(3, 1, "USE TEMP B-TREE FOR ORDER BY"),
        ];
        let tree = ExplainTree::from_rows(&rows).unwrap();
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].children.len(), 2);
        assert_eq!(tree.roots[0].children[0].detail, "SEARCH t2 USING INDEX idx (x=?)");
    }

    #[test]
    fn renders_indented_text() {
        let rows = vec![row(1, 0, "SCAN t1"), row(2, 1, "SEARCH t2 USING INDEX idx (x=?)")];
        let tree = ExplainTree::from_rows(&rows).unwrap();
        let rendered = tree.to_string();
        assert_eq!(rendered, "SCAN t1\n  SEARCH t2 USING INDEX idx (x=?)\n");
    }

    #[test]
    fn flat_format_drops_indentation() {
        let rows = vec![row(1, 0, "SCAN t1"), row(2, 1, "SEARCH t2 USING INDEX idx (x=?)")];
        let tree = ExplainTree::from_rows(&rows).unwrap();
        assert_eq!(tree.render(ExplainFormat::Flat), "SCAN t1\nSEARCH t2 USING INDEX idx (x=?)\n");
        assert_eq!(tree.render(ExplainFormat::Tree), tree.to_string());
    }

    #[test]
    fn rejects_a_row_missing_the_detail_column() {
        let rows = vec![vec![Value::from(1), Value::from(0), Value::from(0)]];
        assert!(ExplainTree::from_rows(&rows).is_err());
    }
}
