pub mod config;
pub mod data;
pub mod diagnostics;
pub mod edit;
pub mod error;
pub mod event;
pub mod file;
pub mod geometry;
pub mod id;
pub mod link;
pub mod node;
pub mod palette;
pub mod project;
pub mod schema;
pub mod store;
pub mod template;

pub use config::SketchConfig;
pub use data::{Data, DataChange, Property, PropertyType};
pub use diagnostics::{Diagnostic, Severity, Subject, check_project};
pub use edit::{LinkEditor, NodeEditor};
pub use error::{Result, SketchError};
pub use event::{ChangeEvent, EventBus, ProjectChange, SubscriptionId};
pub use file::{LinkFile, NodeFile, PaletteFile, ProjectFile};
pub use geometry::{Point, ViewBox};
pub use id::{TypeId, Uid};
pub use link::{Link, LinkChange, PartialLink};
pub use node::{Expansion, Node, NodeChange, NodeMode};
pub use palette::{Palette, Section};
pub use project::Project;
pub use schema::{Color, DropRules, HandleLevel, NodeType, TypeSchema, TypeSettings};
pub use template::Template;
