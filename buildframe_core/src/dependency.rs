//! Reference-graph analysis for nested builder composition.
//!
//! Cyclic type references are allowed structurally, but the planner must
//! know about them: a builder inside a reference cycle cannot offer
//! auto-constructing nested setters without risking unbounded expansion.

use crate::model::{FieldKind, TypeModel};
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// A helper struct to track recursion information for types
#[derive(Debug)]
pub struct RecursionInfo {
    /// `type_name -> scc_id`
    comp_of: HashMap<String, usize>,
    /// `scc_id -> is_recursive`
    recursive: HashMap<usize, bool>,
}

impl RecursionInfo {
    /// Returns true when current & target are in the **same** SCC and that
    /// SCC is either larger than 1 **or** has a self-loop
    pub fn is_recursive_pair(&self, current: &str, target: &str) -> bool {
        let c_id = self.comp_of.get(current);
        let t_id = self.comp_of.get(target);
        match (c_id, t_id) {
            (Some(c), Some(t)) if c == t => self.recursive[c],
            _ => false,
        }
    }
}

/// Build the dependency graph from the models' `FieldKind` trees and analyze
/// recursion
pub fn analyse_recursion(models: &[TypeModel]) -> RecursionInfo {
    let known: HashSet<&str> = models.iter().map(|m| m.name.as_str()).collect();

    let mut deps: HashMap<&str, HashSet<&str>> = HashMap::new();
    for model in models {
        let entry = deps.entry(model.name.as_str()).or_default();
        for field in &model.fields {
            collect_refs(&field.kind, &known, entry);
        }
    }

    debug!("building reference graph for {} types", models.len());
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (&from, tos) in &deps {
        // ensure node exists even if it has no outgoing edges
        graph.add_node(from);
        for &to in tos {
            graph.add_edge(from, to, ());
        }
    }
    trace!(
        node_count = graph.node_count(),
        edge_count = graph.edge_count(),
        "graph built"
    );

    let sccs = kosaraju_scc(&graph);
    debug!(scc_count = sccs.len(), "SCCs found");

    let mut comp_of = HashMap::new();
    let mut recursive = HashMap::new();

    for (idx, comp) in sccs.iter().enumerate() {
        let self_loop = comp.len() == 1 && graph.contains_edge(comp[0], comp[0]);
        recursive.insert(idx, self_loop || comp.len() > 1);
        for member in comp {
            comp_of.insert((*member).to_string(), idx);
        }
    }

    RecursionInfo { comp_of, recursive }
}

fn collect_refs<'a>(kind: &'a FieldKind, known: &HashSet<&str>, out: &mut HashSet<&'a str>) {
    match kind {
        FieldKind::Nested(type_ref) => {
            if known.contains(type_ref.name.as_str()) {
                out.insert(type_ref.name.as_str());
            }
        }
        FieldKind::Optional(inner) | FieldKind::Collection(inner) => {
            collect_refs(inner, known, out);
        }
        FieldKind::Scalar(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldModel, TypeRef};
    use std::path::PathBuf;

    fn model(name: &str, nested: &[&str]) -> TypeModel {
        TypeModel {
            name: name.to_string(),
            builder_name: format!("{}Builder", name),
            file: PathBuf::from("src/lib.rs"),
            line: 1,
            fields: nested
                .iter()
                .enumerate()
                .map(|(i, target)| FieldModel {
                    name: format!("field{}", i),
                    kind: FieldKind::Nested(TypeRef {
                        name: (*target).to_string(),
                        boxed: false,
                    }),
                    required: true,
                    default: None,
                })
                .collect(),
        }
    }

    fn optional_self_model(name: &str) -> TypeModel {
        TypeModel {
            name: name.to_string(),
            builder_name: format!("{}Builder", name),
            file: PathBuf::from("src/lib.rs"),
            line: 1,
            fields: vec![FieldModel {
                name: "next".to_string(),
                kind: FieldKind::Optional(Box::new(FieldKind::Nested(TypeRef {
                    name: name.to_string(),
                    boxed: false,
                }))),
                required: false,
                default: None,
            }],
        }
    }

    #[test]
    fn test_acyclic_pair() {
        let models = vec![model("User", &["Profile"]), model("Profile", &[])];
        let info = analyse_recursion(&models);
        assert!(!info.is_recursive_pair("User", "Profile"));
    }

    #[test]
    fn test_self_loop_through_optional() {
        let models = vec![optional_self_model("Node")];
        let info = analyse_recursion(&models);
        assert!(info.is_recursive_pair("Node", "Node"));
    }

    #[test]
    fn test_two_type_cycle() {
        let models = vec![model("A", &["B"]), model("B", &["A"]), model("C", &["A"])];
        let info = analyse_recursion(&models);
        assert!(info.is_recursive_pair("A", "B"));
        assert!(info.is_recursive_pair("B", "A"));
        // C points into the cycle but is not part of it.
        assert!(!info.is_recursive_pair("C", "A"));
    }
}
