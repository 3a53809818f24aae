//! On-disk shapes of projects and palettes, as exchanged with the file
//! server, and conversion to and from the live model.
//!
//! Live references are replaced by uids on export. Import rebuilds the
//! adjacency index from `sourceRef`/`targetRef`; a node's `linkRefs` are
//! only cross-checked.

use crate::data::Data;
use crate::diagnostics::{self, Diagnostic, Subject};
use crate::error::Result;
use crate::geometry::{Point, ViewBox};
use crate::id::{TypeId, Uid};
use crate::link::Link;
use crate::node::{Expansion, Node, NodeMode};
use crate::palette::{Palette, Section};
use crate::project::Project;
use crate::schema::NodeType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn is_false(b: &bool) -> bool {
    !*b
}

// ─── Project ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub project: String,
    #[serde(rename = "server_ts", default)]
    pub server_ts: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(default)]
    pub palette_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub nodes: BTreeMap<Uid, NodeFile>,
    #[serde(default)]
    pub links: BTreeMap<Uid, LinkFile>,
    #[serde(default)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct General {
    /// Next uid to allocate.
    pub uid: u64,
    #[serde(default)]
    pub view_box: ViewBox,
}

impl Default for General {
    fn default() -> Self {
        Self {
            uid: 1,
            view_box: ViewBox::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFile {
    pub uid: Uid,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub user: String,
    /// The requested type name, even when the palette lacks it.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub mode: NodeMode,
    #[serde(default)]
    pub expanded: Expansion,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub show_type: bool,
    #[serde(default)]
    pub hide: bool,
    #[serde(default)]
    pub pos: Point,
    #[serde(default)]
    pub link_refs: Vec<Uid>,
    #[serde(default)]
    pub data: Data,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFile {
    pub uid: Uid,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub hide: bool,
    #[serde(default = "default_anchor")]
    pub anchor_pos: f64,
    #[serde(default)]
    pub bender: f64,
    #[serde(default)]
    pub bidirectional: bool,
    pub source_ref: Uid,
    pub target_ref: Uid,
    #[serde(default)]
    pub data: Data,
}

fn default_anchor() -> f64 {
    crate::link::DEFAULT_ANCHOR_POS
}

impl Node {
    /// The on-disk shape of this node. `link_refs` come from the project.
    pub fn export(&self, link_refs: Vec<Uid>) -> NodeFile {
        NodeFile {
            uid: self.uid(),
            created: self.created(),
            user: self.user().to_string(),
            type_name: self.type_name().to_string(),
            mode: self.mode(),
            expanded: self.expansion(),
            selected: self.is_selected(),
            show_type: self.shows_type(),
            hide: self.is_hidden(),
            pos: self.pos(),
            link_refs,
            data: self.data().clone(),
        }
    }
}

impl Link {
    pub fn export(&self) -> LinkFile {
        LinkFile {
            uid: self.uid(),
            created: self.created(),
            user: self.user().to_string(),
            selected: self.is_selected(),
            hide: self.is_hidden(),
            anchor_pos: self.anchor_pos(),
            bender: self.bender(),
            bidirectional: self.is_bidirectional(),
            source_ref: self.source(),
            target_ref: self.target(),
            data: self.data().clone(),
        }
    }
}

impl Project {
    pub fn to_file(&self) -> ProjectFile {
        let nodes = self
            .nodes()
            .map(|n| {
                let refs = self.list_all_links(n.uid()).iter().map(|l| l.uid()).collect();
                (n.uid(), n.export(refs))
            })
            .collect();
        let links = self.links().map(|l| (l.uid(), l.export())).collect();
        ProjectFile {
            project: self.name.clone(),
            server_ts: self.server_ts,
            read_only: self.read_only,
            palette_name: self.palette_name.clone(),
            owner: self.owner.clone(),
            general: General {
                uid: self.uid_counter,
                view_box: self.view_box,
            },
            nodes,
            links,
            extras: self.extras.clone(),
        }
    }

    /// Rebuild a project from its file. Without a palette the project still
    /// opens, bound to an empty palette carrying the saved name.
    ///
    /// Defects (dangling endpoints, stale counter, inconsistent `linkRefs`)
    /// are recorded as diagnostics and do not fail the load.
    pub fn from_file(file: ProjectFile, palette: Option<Palette>) -> Self {
        let palette = palette.unwrap_or_else(|| {
            log::warn!(
                "project `{}`: palette `{}` is not available",
                file.project,
                file.palette_name
            );
            Palette::new(&file.palette_name)
        });
        let mut project = Project::new(&file.project, palette);
        project.palette_name = file.palette_name;
        project.owner = file.owner;
        project.read_only = file.read_only;
        project.server_ts = file.server_ts;
        project.view_box = file.general.view_box;
        project.extras = file.extras;
        project.uid_counter = file.general.uid;

        let mut link_refs = Vec::new();
        for (key, n) in file.nodes {
            if key != n.uid {
                project.diagnostics.push(Diagnostic::warning(
                    Subject::Node(n.uid),
                    diagnostics::ADJACENCY_OVERWRITE,
                    format!("node stored under key {key} declares uid {}", n.uid),
                ));
            }
            let node = Node::new(
                n.uid,
                &n.type_name,
                &project.palette,
                n.mode,
                n.pos,
                n.created,
                &n.user,
            )
            .restore(n.expanded, n.selected, n.hide, n.show_type, n.data);
            link_refs.push((n.uid, n.link_refs));
            project.insert_node(node);
        }

        for (_, l) in file.links {
            let link = Link::new(l.uid, l.source_ref, l.target_ref, l.created, &l.user).restore(
                l.bidirectional,
                l.anchor_pos,
                l.bender,
                l.selected,
                l.hide,
                l.data,
            );
            project.insert_link(link);
        }

        for (uid, refs) in link_refs {
            for link in refs {
                if !project.link(link).is_some_and(|l| l.touches(uid)) {
                    project.diagnostics.push(Diagnostic::warning(
                        Subject::Node(uid),
                        diagnostics::ADJACENCY_OVERWRITE,
                        format!("linkRefs names {link}, which does not touch this node"),
                    ));
                }
            }
        }

        let highest = project
            .nodes
            .keys()
            .chain(project.links.keys())
            .map(|u| u.get())
            .max();
        if let Some(highest) = highest
            && highest >= project.uid_counter
        {
            project.diagnostics.push(Diagnostic::warning(
                Subject::Project,
                diagnostics::STALE_COUNTER,
                format!(
                    "uid counter {} advanced past uid {highest}",
                    project.uid_counter
                ),
            ));
            project.uid_counter = highest + 1;
        }

        log::debug!(
            "loaded project `{}`: {} nodes, {} links, {} diagnostics",
            project.name,
            project.node_count(),
            project.link_count(),
            project.diagnostics.len()
        );
        project
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    pub fn from_json(json: &str, palette: Option<Palette>) -> Result<Self> {
        let file: ProjectFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file, palette))
    }

    /// Replace this project's content with `file`, keeping subscribers.
    /// Used when restoring undo snapshots. The uid counter never moves
    /// back, so uids handed out since the snapshot stay retired.
    pub fn replace_with(&mut self, file: ProjectFile) {
        let palette = self.palette.clone();
        let user = std::mem::take(&mut self.user);
        let events = std::mem::take(&mut self.events);
        let counter = self.uid_counter;
        *self = Project::from_file(file, Some(palette)).with_user(&user);
        self.uid_counter = self.uid_counter.max(counter);
        self.events = events;
    }
}

// ─── Palette ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteFile {
    pub name: String,
    #[serde(rename = "server_ts", default)]
    pub server_ts: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub items: BTreeMap<String, NodeType>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

impl Palette {
    pub fn to_file(&self) -> PaletteFile {
        PaletteFile {
            name: self.name().to_string(),
            server_ts: self.server_ts,
            read_only: self.is_read_only(),
            owner: self.owner().map(str::to_string),
            sections: self.sections().to_vec(),
            items: self
                .items()
                .into_iter()
                .map(|t| (t.id.as_str().to_string(), t.clone()))
                .collect(),
            extras: self.extras.clone(),
        }
    }

    pub fn from_file(file: PaletteFile) -> Self {
        let mut palette =
            Palette::from_parts(file.name, file.owner, file.read_only, file.sections, file.extras);
        palette.server_ts = file.server_ts;
        for (key, item) in file.items {
            palette.load_item(&key, item);
        }
        palette
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::from_file(serde_json::from_str(json)?))
    }
}

/// Type ids referenced by a project file that `palette` does not define.
pub fn missing_types(file: &ProjectFile, palette: &Palette) -> Vec<String> {
    let mut missing: Vec<String> = file
        .nodes
        .values()
        .filter(|n| !palette.contains(TypeId::intern(&n.type_name)))
        .map(|n| n.type_name.clone())
        .collect();
    missing.sort();
    missing.dedup();
    missing
}
