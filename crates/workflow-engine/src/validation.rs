//! Validation for node configuration and graph structure
//!
//! Config validation is advisory: the editor asks for it before treating
//! a node as configured, but failures never block graph edits. The
//! executor only performs its own minimal liveness check at run time.
//! Structural checks report dangling edges and ambiguous branch handles.

use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::{EdgeId, GraphEdge, NodeConfig, NodeId, NodeType, WorkflowGraph};

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").expect("valid phone regex"));

const HTTP_METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
const CONDITION_OPERATORS: [&str; 5] = ["equals", "not_equals", "contains", "greater_than", "less_than"];
const SMS_MAX_CHARS: usize = 160;

/// What is wrong with a config field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// Field absent, not a string, or empty
    Required,
    /// Field present but malformed
    Invalid,
    /// Field longer than allowed
    TooLong { max: usize },
}

/// A single field-level config problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

/// Validate a node's config against the schema for its type
///
/// Returns every field error found (not just the first). Trigger types
/// have no schema and always pass.
pub fn validate_node_config(node_type: NodeType, config: &NodeConfig) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut fields = FieldCheck {
        config,
        errors: &mut errors,
    };

    match node_type {
        NodeType::TriggerManual | NodeType::TriggerWebhook => {}
        NodeType::ActionHttp => {
            fields.matching("url", &URL_RE, "URL is required", "Invalid URL");
            fields.one_of("method", &HTTP_METHODS);
            fields.optional_string("headers");
            fields.optional_string("body");
        }
        NodeType::ActionEmail => {
            fields.matching("to", &EMAIL_RE, "Email is required", "Invalid email address");
            fields.non_empty("subject", "Subject is required");
            fields.non_empty("body", "Body is required");
        }
        NodeType::ActionSms => {
            fields.matching(
                "phone",
                &PHONE_RE,
                "Phone number must be exactly 10 digits",
                "Phone number must be exactly 10 digits",
            );
            if let Some(message) = fields.non_empty("message", "Message is required") {
                if message.chars().count() > SMS_MAX_CHARS {
                    fields.errors.push(FieldError::new(
                        "message",
                        FieldErrorKind::TooLong { max: SMS_MAX_CHARS },
                        "SMS must be under 160 characters",
                    ));
                }
            }
        }
        NodeType::LogicCondition => {
            fields.non_empty("field", "Field name is required");
            fields.one_of("operator", &CONDITION_OPERATORS);
            fields.non_empty("value", "Value is required");
        }
        NodeType::LogicTransform => {
            fields.non_empty("script", "Script is required");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

struct FieldCheck<'a> {
    config: &'a NodeConfig,
    errors: &'a mut Vec<FieldError>,
}

impl<'a> FieldCheck<'a> {
    fn string(&self, field: &str) -> Option<&'a str> {
        self.config.get(field).and_then(Value::as_str)
    }

    fn non_empty(&mut self, field: &str, message: &str) -> Option<&'a str> {
        match self.string(field) {
            Some(value) if !value.is_empty() => Some(value),
            _ => {
                self.errors
                    .push(FieldError::new(field, FieldErrorKind::Required, message));
                None
            }
        }
    }

    fn matching(&mut self, field: &str, re: &Regex, required: &str, invalid: &str) {
        if let Some(value) = self.non_empty(field, required) {
            if !re.is_match(value) {
                self.errors
                    .push(FieldError::new(field, FieldErrorKind::Invalid, invalid));
            }
        }
    }

    fn one_of(&mut self, field: &str, allowed: &[&str]) {
        let message = format!("Expected one of {}", allowed.join(", "));
        match self.string(field) {
            Some(value) if allowed.iter().any(|a| *a == value) => {}
            Some(_) => self
                .errors
                .push(FieldError::new(field, FieldErrorKind::Invalid, message)),
            None => self
                .errors
                .push(FieldError::new(field, FieldErrorKind::Required, message)),
        }
    }

    fn optional_string(&mut self, field: &str) {
        match self.config.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => self.errors.push(FieldError::new(
                field,
                FieldErrorKind::Invalid,
                "Expected a string",
            )),
        }
    }
}

/// Structural problem in a workflow graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    /// An edge references a non-existent node
    DanglingEdge { edge_id: EdgeId, node_id: NodeId },
    /// More than one edge leaves the same (source, handle) pair
    BranchConflict {
        node_id: NodeId,
        handle: String,
        edge_ids: Vec<EdgeId>,
    },
    /// Two nodes share an id
    DuplicateNodeId { node_id: NodeId },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingEdge { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::BranchConflict {
                node_id,
                handle,
                edge_ids,
            } => write!(
                f,
                "Node '{}' has {} edges on handle '{}'",
                node_id,
                edge_ids.len(),
                handle
            ),
            Self::DuplicateNodeId { node_id } => write!(f, "Duplicate node id '{}'", node_id),
        }
    }
}

impl std::error::Error for GraphIssue {}

/// Validate the structure of a workflow graph
///
/// Returns all issues found, in a stable order.
pub fn validate_structure(graph: &WorkflowGraph) -> Vec<GraphIssue> {
    let mut issues = Vec::new();

    let mut node_ids: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            issues.push(GraphIssue::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                issues.push(GraphIssue::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }

    // Group branch-labelled edges by (source, handle), keeping first-seen order
    let mut groups: Vec<((&str, &str), Vec<EdgeId>)> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    for edge in &graph.edges {
        let Some(handle) = edge.source_handle.as_deref() else {
            continue;
        };
        let key = (edge.source.as_str(), handle);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(edge.id.clone()),
            None => {
                index.insert(key, groups.len());
                groups.push((key, vec![edge.id.clone()]));
            }
        }
    }
    for ((source, handle), edge_ids) in groups {
        if edge_ids.len() > 1 {
            issues.push(GraphIssue::BranchConflict {
                node_id: source.to_string(),
                handle: handle.to_string(),
                edge_ids,
            });
        }
    }

    issues
}

/// The existing edge that already occupies `(source, handle)`, if any
///
/// Unlabelled edges never conflict.
pub fn conflicting_branch<'a>(
    graph: &'a WorkflowGraph,
    source: &str,
    handle: Option<&str>,
) -> Option<&'a GraphEdge> {
    let handle = handle?;
    graph
        .outgoing_edges(source)
        .find(|e| e.source_handle.as_deref() == Some(handle))
}
