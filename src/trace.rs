//! Read-only walk of a computation graph, for tools which draw it
//!
//! A [`Trace`] collects every value reachable from a root together with the operand links
//! between them. [`Trace::graph`] turns it into the node/edge layout used when drawing:
//! each derived value gets an extra operator node between its operands and itself, so
//! `a * b = c` becomes `a -> (*) -> c` and `b -> (*) -> c`.

use std::collections::{HashMap, HashSet};

use crate::values::Value;

/// Values reachable from a root and the operand links between them
#[derive(Debug, Clone)]
pub struct Trace {
    nodes: Vec<Value>,
    /// (operand, result) pairs
    edges: Vec<(Value, Value)>,
}

impl Trace {
    /// Walks from `root` visiting each value once, root first
    pub fn from_value(root: &Value) -> Self {
        let mut nodes = vec![];
        let mut edges = vec![];
        let mut seen: HashSet<u64> = HashSet::new();
        let mut stack = vec![root.clone()];

        while let Some(value) = stack.pop() {
            if !seen.insert(value.id()) {
                continue;
            }
            let operands = value.operands();
            for operand in operands.iter() {
                edges.push((operand.clone(), value.clone()));
            }
            // reversed so the first operand is walked first
            stack.extend(operands.into_iter().rev());
            nodes.push(value);
        }
        log::debug!(
            "traced {} nodes and {} edges from {}",
            nodes.len(),
            edges.len(),
            root.node_id()
        );
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Value] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(Value, Value)] {
        &self.edges
    }

    /// Builds the drawable layout of the trace.
    ///
    /// # Panics
    /// If an edge refers to a node which was not traced. Values are always built after
    /// their operands, so this means the graph itself is corrupt.
    pub fn graph(&self) -> Graph {
        let mut graph = Graph::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for value in self.nodes.iter() {
            let value_key = value.node_id();
            index.insert(value_key.clone(), graph.nodes.len());
            graph.nodes.push(GraphNode {
                key: value_key.clone(),
                label: value.graph_label(),
                kind: GraphNodeKind::Value,
            });

            if let Some(op) = value.op() {
                let op_key = format!("{}{}", value_key, op);
                index.insert(op_key.clone(), graph.nodes.len());
                graph.nodes.push(GraphNode {
                    key: op_key.clone(),
                    label: op.symbol(),
                    kind: GraphNodeKind::Op,
                });
                graph.edges.push((op_key, value_key));
            }
        }

        for (operand, result) in self.edges.iter() {
            let from = operand.node_id();
            let to = match result.op() {
                Some(op) => format!("{}{}", result.node_id(), op),
                None => result.node_id(),
            };
            if !index.contains_key(&from) || !index.contains_key(&to) {
                panic!("Missing node for edge from {} to {}", from, to);
            }
            graph.edges.push((from, to));
        }
        graph
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNodeKind {
    /// A value in the computation graph
    Value,
    /// The operation which produced the value it points to
    Op,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Unique name of the node within the graph
    pub key: String,
    pub label: String,
    pub kind: GraphNodeKind,
}

/// Drawable layout of a traced computation graph, edges are `(from, to)` node keys
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<(String, String)>,
}

impl Graph {
    pub fn node(&self, key: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_nodes_and_edges() {
        let a = Value::new(2.0).with_label("a");
        let b = Value::new(-3.0).with_label("b");
        let c = (&a * &b).with_label("c");
        let d = (&c + &a).with_label("d");

        let trace = Trace::from_value(&d);
        // a is reached twice but traced once
        assert_eq!(trace.nodes(), &[d.clone(), c.clone(), a.clone(), b.clone()]);
        assert_eq!(trace.edges().len(), 4);
        assert!(trace.edges().contains(&(a.clone(), d.clone())));
        assert!(trace.edges().contains(&(a.clone(), c.clone())));
        assert!(trace.edges().contains(&(b.clone(), c.clone())));
        assert!(trace.edges().contains(&(c.clone(), d.clone())));
    }

    #[test]
    fn test_trace_leaf() {
        let a = Value::new(1.0);
        let trace = Trace::from_value(&a);
        assert_eq!(trace.nodes(), &[a.clone()]);
        assert!(trace.edges().is_empty());
        let graph = trace.graph();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_graph_inserts_op_nodes() {
        let a = Value::new(2.0).with_label("a");
        let b = Value::new(3.0).with_label("b");
        let c = (&a * &b).with_label("c");
        let o = c.tanh().with_label("o");
        o.backward();

        let graph = Trace::from_value(&o).graph();
        // four values and two operators
        assert_eq!(graph.nodes.len(), 6);
        // op -> value for each operator, plus one per operand link
        assert_eq!(graph.edges.len(), 5);

        let mul_key = format!("{}*", c.node_id());
        let tanh_key = format!("{}tanh", o.node_id());
        assert_eq!(graph.node(&mul_key).map(|n| n.kind), Some(GraphNodeKind::Op));
        assert_eq!(graph.node(&tanh_key).map(|n| n.label.as_str()), Some("tanh"));
        assert!(graph.edges.contains(&(a.node_id(), mul_key.clone())));
        assert!(graph.edges.contains(&(b.node_id(), mul_key.clone())));
        assert!(graph.edges.contains(&(mul_key, c.node_id())));
        assert!(graph.edges.contains(&(c.node_id(), tanh_key.clone())));
        assert!(graph.edges.contains(&(tanh_key, o.node_id())));

        let a_node = graph.node(&a.node_id()).unwrap();
        assert_eq!(a_node.kind, GraphNodeKind::Value);
        assert_eq!(a_node.label, a.graph_label());
        assert!(a_node.label.starts_with("{ a | d 2.0000 | g "));
    }
}
