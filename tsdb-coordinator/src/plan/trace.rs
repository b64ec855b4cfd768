// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution tracing for EXPLAIN ANALYZE
//!
//! A [`Trace`] owns a tree of [`Span`]s. Spans are cheap handles that can be
//! passed to the planner and its iterators; each records labels, typed
//! fields and its own duration. The finished tree renders as indented text.

use crate::ast::format_duration;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Typed value recorded on a span
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Duration(Duration),
    Integer(i64),
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Duration(d) => f.write_str(&format_duration(*d)),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn duration(key: impl Into<String>, d: Duration) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Duration(d),
        }
    }

    pub fn int(key: impl Into<String>, i: i64) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Integer(i),
        }
    }

    pub fn string(key: impl Into<String>, s: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::String(s.into()),
        }
    }
}

#[derive(Debug)]
struct SpanData {
    name: String,
    labels: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    start: Instant,
    duration: Option<Duration>,
    children: Vec<Span>,
}

/// Handle to one node of a trace
#[derive(Debug, Clone)]
pub struct Span {
    data: Arc<Mutex<SpanData>>,
}

impl Span {
    fn new(name: impl Into<String>) -> Self {
        Self {
            data: Arc::new(Mutex::new(SpanData {
                name: name.into(),
                labels: BTreeMap::new(),
                fields: BTreeMap::new(),
                start: Instant::now(),
                duration: None,
                children: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.data.lock().name.clone()
    }

    /// Start a child span
    pub fn start_child(&self, name: impl Into<String>) -> Span {
        let child = Span::new(name);
        self.data.lock().children.push(child.clone());
        child
    }

    pub fn set_label(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.lock().labels.insert(key.into(), value.into());
    }

    /// Add fields, replacing any with the same key
    pub fn merge_fields(&self, fields: impl IntoIterator<Item = Field>) {
        let mut data = self.data.lock();
        for field in fields {
            data.fields.insert(field.key, field.value);
        }
    }

    /// Record the span's duration; later calls are ignored
    pub fn finish(&self) {
        let mut data = self.data.lock();
        if data.duration.is_none() {
            data.duration = Some(data.start.elapsed());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.data.lock().duration.is_some()
    }

    fn tree(&self) -> TreeNode {
        let data = self.data.lock();
        let mut node = TreeNode::new(data.name.clone());
        if !data.labels.is_empty() {
            let mut labels = TreeNode::new("labels");
            for (k, v) in &data.labels {
                labels.children.push(TreeNode::new(format!("{}: {}", k, v)));
            }
            node.children.push(labels);
        }
        for (k, v) in &data.fields {
            node.children.push(TreeNode::new(format!("{}: {}", k, v)));
        }
        for child in &data.children {
            node.children.push(child.tree());
        }
        node
    }
}

/// A trace rooted at a single span
#[derive(Debug, Clone)]
pub struct Trace {
    id: Uuid,
    root: Span,
}

impl Trace {
    /// Create a trace and return its root span
    pub fn new(name: impl Into<String>) -> (Trace, Span) {
        let root = Span::new(name);
        (
            Trace {
                id: Uuid::new_v4(),
                root: root.clone(),
            },
            root,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the span tree
    pub fn tree(&self) -> TreeNode {
        let mut top = TreeNode::new(".");
        top.children.push(self.root.tree());
        top
    }
}

/// Printable tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub text: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }

    fn write_children(&self, f: &mut fmt::Formatter, prefix: &str) -> fmt::Result {
        for (i, child) in self.children.iter().enumerate() {
            let last = i + 1 == self.children.len();
            let connector = if last { "└── " } else { "├── " };
            write!(f, "\n{}{}{}", prefix, connector, child.text)?;
            let indent = if last { "    " } else { "│   " };
            child.write_children(f, &format!("{}{}", prefix, indent))?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text)?;
        self.write_children(f, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_rendering() {
        let (trace, root) = Trace::new("select");
        let child = root.start_child("create_iterator");
        child.set_label("measurement", "cpu");
        child.finish();
        root.merge_fields([Field::int("rows", 3)]);
        root.finish();

        let text = trace.tree().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                ".",
                "└── select",
                "    ├── rows: 3",
                "    └── create_iterator",
                "        └── labels",
                "            └── measurement: cpu",
            ]
        );
    }

    #[test]
    fn test_finish_is_sticky() {
        let (_, root) = Trace::new("select");
        root.finish();
        assert!(root.is_finished());
        root.finish();
        assert!(root.is_finished());
    }
}
