use std::collections::HashMap;

/// Canonical label of the node a dialogue begins at.
pub const START: &str = "START";
/// Canonical successor that ends a dialogue.
pub const QUIT: &str = "QUIT";

/// Label a node is declared under. Only `start` has a sentinel here.
pub fn canonical_node_label(label: &str) -> &str {
    match label {
        "start" => START,
        other => other,
    }
}

/// Maps the successor aliases `start` and `quit` to their sentinels.
pub fn canonical_label(label: &str) -> &str {
    match label {
        "start" => START,
        "quit" => QUIT,
        other => other,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Statement,
    Question,
}

impl NodeKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(Self::Statement),
            "q" => Some(Self::Question),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub next: String,
    /// Name of the callback fired when this response is picked.
    pub trigger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub label: String,
    pub kind: NodeKind,
    pub text: String,
    /// Successor of a statement. Questions branch through their responses instead.
    pub next: String,
    pub responses: Vec<Response>,
}

/// A parsed script: its name and its nodes in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dialogue {
    pub name: String,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl Dialogue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Inserts a node, replacing any node that already uses its label.
    ///
    /// A replaced node keeps the position of the first definition and is returned.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        match self.index.get(&node.label) {
            Some(&i) => Some(std::mem::replace(&mut self.nodes[i], node)),
            None => {
                self.index.insert(node.label.clone(), self.nodes.len());
                self.nodes.push(node);
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&Node> {
        self.index.get(label).map(|&i| &self.nodes[i])
    }

    pub fn start(&self) -> Option<&Node> {
        self.get(START)
    }

    /// Nodes in first-seen order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(label: &str, text: &str) -> Node {
        Node {
            label: label.to_string(),
            kind: NodeKind::Statement,
            text: text.to_string(),
            next: QUIT.to_string(),
            responses: Vec::new(),
        }
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut dialogue = Dialogue::new("d");
        dialogue.insert(statement("a", "first"));
        dialogue.insert(statement("b", "other"));
        let old = dialogue.insert(statement("a", "second"));

        assert_eq!(old.map(|n| n.text), Some("first".to_string()));
        assert_eq!(dialogue.len(), 2);
        let labels: Vec<_> = dialogue.nodes().map(|n| n.text.as_str()).collect();
        assert_eq!(labels, ["second", "other"]);
    }

    #[test]
    fn test_canonical_label() {
        assert_eq!(canonical_label("start"), START);
        assert_eq!(canonical_label("quit"), QUIT);
        assert_eq!(canonical_label("Start"), "Start");
        assert_eq!(canonical_node_label("start"), START);
        assert_eq!(canonical_node_label("quit"), "quit");
    }
}
