//! Soft-fail diagnostics for projects, palettes and their entities.
//!
//! A diagnostic never aborts the operation that produced it: the entity keeps
//! working in a possibly inconsistent state and the finding is logged. The
//! same shape is used for findings recorded during mutation and for the
//! out-of-band [`check_project`] pass.

use crate::id::{TypeId, Uid};
use crate::project::Project;
use serde::{Deserialize, Serialize};

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The model is inconsistent: something was lost or overwritten.
    Error,
    /// The model is usable but not what was asked for.
    Warning,
}

/// What a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    Project,
    Palette,
    Node(Uid),
    Link(Uid),
    Type(TypeId),
}

/// A single structural or type-mismatch finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub subject: Subject,
    /// Short rule identifier (e.g. "unresolved-endpoint", "json-not-object").
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(subject: Subject, rule: &'static str, message: impl Into<String>) -> Self {
        Self::new(subject, rule, Severity::Error, message.into())
    }

    pub fn warning(subject: Subject, rule: &'static str, message: impl Into<String>) -> Self {
        Self::new(subject, rule, Severity::Warning, message.into())
    }

    fn new(subject: Subject, rule: &'static str, severity: Severity, message: String) -> Self {
        log::warn!("[{rule}] {subject:?}: {message}");
        Self {
            subject,
            rule,
            severity,
            message,
        }
    }
}

// Rules are plain strings so they can be matched on by UI code.
pub const JSON_NOT_OBJECT: &str = "json-not-object";
pub const UNRESOLVED_ENDPOINT: &str = "unresolved-endpoint";
pub const DUPLICATE_TYPE_ID: &str = "duplicate-type-id";
pub const ADJACENCY_OVERWRITE: &str = "adjacency-overwrite";
pub const MISSING_TYPE: &str = "missing-type";
pub const STALE_COUNTER: &str = "stale-uid-counter";

// ─── Project check ───────────────────────────────────────────────────────

/// Re-derive the structural diagnostics of a project.
///
/// Reports without modifying anything.
#[must_use]
pub fn check_project(project: &Project) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    check_link_endpoints(project, &mut diags);
    check_unresolved_types(project, &mut diags);
    check_uid_counter(project, &mut diags);
    diags
}

/// Every link's endpoints must resolve and be present in the adjacency index.
fn check_link_endpoints(project: &Project, diags: &mut Vec<Diagnostic>) {
    for link in project.links() {
        for (end, uid) in [("source", link.source()), ("target", link.target())] {
            if project.node(uid).is_none() {
                diags.push(Diagnostic::error(
                    Subject::Link(link.uid()),
                    UNRESOLVED_ENDPOINT,
                    format!("{end} node {uid} is not in the project"),
                ));
            }
        }
        if !project.is_link_indexed(link.uid()) {
            diags.push(Diagnostic::error(
                Subject::Link(link.uid()),
                ADJACENCY_OVERWRITE,
                "link is missing from its nodes' adjacency",
            ));
        }
    }
}

/// Nodes whose requested type is absent from the palette.
fn check_unresolved_types(project: &Project, diags: &mut Vec<Diagnostic>) {
    for node in project.nodes() {
        if !node.is_type_resolved() {
            diags.push(Diagnostic::warning(
                Subject::Node(node.uid()),
                MISSING_TYPE,
                format!(
                    "type `{}` is not in palette `{}`; showing as `{}`",
                    node.type_name(),
                    project.palette_name(),
                    node.type_id()
                ),
            ));
        }
    }
}

/// The counter must be ahead of every allocated uid.
fn check_uid_counter(project: &Project, diags: &mut Vec<Diagnostic>) {
    let highest = project
        .nodes()
        .map(|n| n.uid())
        .chain(project.links().map(|l| l.uid()))
        .max();
    if let Some(highest) = highest
        && highest.get() >= project.uid_counter()
    {
        diags.push(Diagnostic::error(
            Subject::Project,
            STALE_COUNTER,
            format!(
                "uid counter {} is not ahead of uid {highest}",
                project.uid_counter()
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeMode;
    use crate::palette::Palette;
    use crate::schema::NodeType;
    use crate::geometry::Point;

    fn palette() -> Palette {
        let mut p = Palette::new("default");
        p.add_item(NodeType::new(TypeId::intern("thing"), "General"))
            .unwrap();
        p
    }

    #[test]
    fn clean_project_has_no_findings() {
        let mut project = Project::new("P", palette());
        let a = project.create_empty_node(TypeId::intern("thing"), Point::new(0.0, 0.0));
        let b = project.create_empty_node(TypeId::intern("thing"), Point::new(10.0, 0.0));
        project.add_full_link(Some(a), b).unwrap();
        assert!(check_project(&project).is_empty());
    }

    #[test]
    fn unresolved_type_is_reported() {
        let mut project = Project::new("P", palette());
        let uid = project.add_node(TypeId::intern("gadget"), NodeMode::Full, Point::default());
        let diags = check_project(&project);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, MISSING_TYPE);
        assert_eq!(diags[0].subject, Subject::Node(uid));
    }
}
