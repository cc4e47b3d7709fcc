use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// A phylogeny tree. Leaves carry a name and an optional branch length;
/// internal nodes are labelled after parsing (see [`Tree::label`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub name: String,
    pub len: String,
    pub children: Vec<Tree>,
}

impl Tree {
    #[must_use]
    pub fn leaf(name: impl Into<String>, len: impl Into<String>) -> Tree {
        Tree { name: name.into(), len: len.into(), children: Vec::new() }
    }

    #[must_use]
    pub fn internal(children: Vec<Tree>, name: impl Into<String>, len: impl Into<String>) -> Tree {
        Tree { name: name.into(), len: len.into(), children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Label all internal nodes `root_name<N>` in pre-order. Leaf nodes keep
    /// their name but are counted in the numbering.
    pub fn label(&mut self, root_name: &str) {
        let mut last = 0;
        self.label_from(&mut last, root_name);
    }

    fn label_from(&mut self, last_label: &mut u32, root_name: &str) {
        *last_label += 1;
        if self.children.is_empty() {
            return;
        }
        self.name = format!("{root_name}{last_label}");
        for child in &mut self.children {
            child.label_from(last_label, root_name);
        }
    }

    /// Enumerate the groups of the tree: for every node, its name and the set
    /// of leaf names below it, children before parents.
    #[must_use]
    pub fn groups(&self) -> Vec<(String, BTreeSet<String>)> {
        let mut result = Vec::new();
        self.collect_groups(&mut result);
        result
    }

    fn collect_groups(&self, result: &mut Vec<(String, BTreeSet<String>)>) -> BTreeSet<String> {
        if self.children.is_empty() {
            let only = BTreeSet::from([self.name.clone()]);
            result.push((self.name.clone(), only.clone()));
            return only;
        }
        let mut current = BTreeSet::new();
        for child in &self.children {
            current.extend(child.collect_groups(result));
        }
        result.push((self.name.clone(), current.clone()));
        current
    }

    /// The lineage of every leaf: its ancestor names joined with `:` followed
    /// by the leaf name, in tree order.
    #[must_use]
    pub fn lineage(&self) -> Vec<String> {
        let mut result = Vec::new();
        let mut ancestors = Vec::new();
        self.collect_lineage(&mut ancestors, &mut result);
        result
    }

    fn collect_lineage(&self, ancestors: &mut Vec<String>, result: &mut Vec<String>) {
        if self.children.is_empty() {
            let mut element = String::new();
            for parent in ancestors.iter() {
                element.push_str(parent);
                element.push(':');
            }
            element.push_str(&self.name);
            result.push(element);
            return;
        }
        ancestors.push(self.name.clone());
        for child in &self.children {
            child.collect_lineage(ancestors, result);
        }
        ancestors.pop();
    }

    /// A copy of the tree with `suffix` appended to every node whose name is
    /// in `marked`. Feeds the cladogram output.
    #[must_use]
    pub fn mark(&self, marked: &BTreeSet<String>, suffix: &str) -> Tree {
        let mut result = self.clone();
        result.mark_in_place(marked, suffix);
        result
    }

    fn mark_in_place(&mut self, marked: &BTreeSet<String>, suffix: &str) {
        if marked.contains(&self.name) {
            self.name.push_str(suffix);
        }
        for child in &mut self.children {
            child.mark_in_place(marked, suffix);
        }
    }
}

/// Prints the tree in the Newick format, without the final `;`.
impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")?;
        }
        write!(f, "{}", self.name)?;
        if !self.len.is_empty() {
            write!(f, ":{}", self.len)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        // ((A:1,B:2),C);
        Tree::internal(
            vec![
                Tree::internal(vec![Tree::leaf("A", "1"), Tree::leaf("B", "2")], "", ""),
                Tree::leaf("C", ""),
            ],
            "",
            "",
        )
    }

    #[test]
    fn labelling_is_preorder() {
        let mut t = sample();
        t.label("Node");
        assert_eq!(t.name, "Node1");
        assert_eq!(t.children[0].name, "Node2");
        assert_eq!(t.to_string(), "((A:1,B:2)Node2,C)Node1");
    }

    #[test]
    fn groups_children_first() {
        let mut t = sample();
        t.label("Node");
        let groups = t.groups();
        let names: Vec<&str> = groups.iter().map(|g| g.0.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "Node2", "C", "Node1"]);
        assert_eq!(groups[2].1, BTreeSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(groups[4].1.len(), 3);
    }

    #[test]
    fn lineage_lists_ancestors() {
        let mut t = sample();
        t.label("Node");
        assert_eq!(t.lineage(), vec!["Node1:Node2:A", "Node1:Node2:B", "Node1:C"]);
    }

    #[test]
    fn marking_appends_suffix() {
        let mut t = sample();
        t.label("Node");
        let marked = t.mark(&BTreeSet::from(["A".to_string(), "Node2".to_string()]), "*");
        assert_eq!(marked.to_string(), "((A*:1,B:2)Node2*,C)Node1");
    }
}
