//! Default structural validator

use super::{LabelRules, SchemaValidator, ValidationSchema, Violation};
use crate::core::data::{GraphData, NodeRecord};
use crate::core::entity::{NODE_ID, UniqueKey};
use std::collections::{BTreeSet, HashMap};

/// Checks nodes and edges against compiled label rules
///
/// Nodes: label known, required properties present, every property declared
/// (unless the label allows additional ones) and passing its checks.
/// Edges: both endpoints resolve through the unique key, the link is declared
/// on the source label and points at the destination's label. A link marked
/// `required` needs an edge from every node of its label.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, data: &GraphData, schema: &ValidationSchema) -> BTreeSet<Violation> {
        let mut violations = BTreeSet::new();
        let unique_key = data.unique_field.unwrap_or_default();

        for error in &schema.errors {
            violations.insert(Violation::new("dictionary", error.clone()));
        }

        let mut labels_by_key: HashMap<String, &str> = HashMap::new();
        let mut outgoing: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for (i, node) in data.nodes.iter().enumerate() {
            let path = format!("nodes[{}]", i);
            if let Some(key) = node.key(unique_key) {
                labels_by_key.insert(key, node.label.as_str());
            }
            match schema.label(&node.label) {
                Some(rules) => check_node(&path, node, rules, unique_key, &mut violations),
                None => {
                    violations.insert(Violation::new(
                        path,
                        format!("unknown label '{}'", node.label),
                    ));
                }
            }
        }

        for (i, edge) in data.edges.iter().enumerate() {
            let path = format!("edges[{}]", i);
            let src = labels_by_key.get(&edge.src);
            let dst = labels_by_key.get(&edge.dst);

            if src.is_none() {
                violations.insert(Violation::new(
                    path.clone(),
                    format!("source '{}' matches no node {}", edge.src, unique_key),
                ));
            }
            if dst.is_none() {
                violations.insert(Violation::new(
                    path.clone(),
                    format!("destination '{}' matches no node {}", edge.dst, unique_key),
                ));
            }
            let (Some(src_label), Some(dst_label)) = (src, dst) else {
                continue;
            };
            let Some(rules) = schema.label(src_label) else {
                continue;
            };
            outgoing.entry(edge.src.as_str()).or_default().insert(edge.label.as_str());
            match rules.links.get(&edge.label) {
                None => {
                    violations.insert(Violation::new(
                        path,
                        format!("link '{}' is not defined for '{}'", edge.label, src_label),
                    ));
                }
                Some(target) if target != dst_label => {
                    violations.insert(Violation::new(
                        path,
                        format!(
                            "link '{}' on '{}' points to '{}', not '{}'",
                            edge.label, src_label, target, dst_label
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        for (i, node) in data.nodes.iter().enumerate() {
            let Some(rules) = schema.label(&node.label) else {
                continue;
            };
            let key = node.key(unique_key);
            let links = key.as_deref().and_then(|key| outgoing.get(key));
            for link in &rules.required_links {
                if !links.is_some_and(|links| links.contains(link.as_str())) {
                    violations.insert(Violation::new(
                        format!("nodes[{}]", i),
                        format!("required link '{}' has no edge", link),
                    ));
                }
            }
        }

        violations
    }
}

fn check_node(
    path: &str,
    node: &NodeRecord,
    rules: &LabelRules,
    unique_key: UniqueKey,
    violations: &mut BTreeSet<Violation>,
) {
    for required in &rules.required {
        if !node.properties.contains_key(required) {
            violations.insert(Violation::new(
                format!("{}.{}", path, required),
                "required property is missing",
            ));
        }
    }

    for (name, value) in &node.properties {
        match rules.properties.get(name) {
            Some(checks) => {
                for check in checks {
                    if let Err(message) = check(name, value) {
                        violations.insert(Violation::new(format!("{}.{}", path, name), message));
                    }
                }
            }
            None if name == NODE_ID || name == unique_key.field() => {}
            None if rules.additional_properties => {}
            None => {
                violations.insert(Violation::new(
                    format!("{}.{}", path, name),
                    format!("property is not defined for '{}'", node.label),
                ));
            }
        }
    }
}
