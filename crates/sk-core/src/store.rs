//! Persistence interface of the external file server.
//!
//! The real server speaks JSON over HTTP; [`ProjectStore`] is the surface the
//! canvas consumes, and [`MemoryStore`] is an in-process implementation used
//! by tests and offline sessions.

use crate::file::{PaletteFile, ProjectFile};
use crate::palette::Palette;
use crate::project::{Project, now_millis};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },

    /// No session user; the HTTP server answers 401.
    #[error("not signed in")]
    Unauthorized,

    #[error("`{name}` was saved elsewhere (server_ts {stored}, ours {ours})")]
    Conflict { name: String, stored: i64, ours: i64 },

    #[error("`{0}` is a read-only share")]
    ReadOnly(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub owner: Option<String>,
    pub server_ts: i64,
}

pub trait ProjectStore {
    fn get_project(&self, name: &str) -> Result<ProjectFile, StoreError>;
    fn list_projects(&self) -> Result<Vec<Entry>, StoreError>;
    /// Save and return the new `server_ts`.
    fn save_project(&mut self, file: ProjectFile) -> Result<i64, StoreError>;
    fn delete_project(&mut self, name: &str) -> Result<(), StoreError>;

    fn get_palette(&self, name: &str) -> Result<PaletteFile, StoreError>;
    fn list_palettes(&self) -> Result<Vec<Entry>, StoreError>;
    fn save_palette(&mut self, file: PaletteFile) -> Result<i64, StoreError>;
    fn delete_palette(&mut self, name: &str) -> Result<(), StoreError>;
}

/// Open a project together with its palette. A missing palette does not
/// prevent opening.
pub fn open_project(store: &impl ProjectStore, name: &str) -> Result<Project, StoreError> {
    let file = store.get_project(name)?;
    let palette = match store.get_palette(&file.palette_name) {
        Ok(p) => Some(Palette::from_file(p)),
        Err(StoreError::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    Ok(Project::from_file(file, palette))
}

/// Save `project` and adopt the server timestamp.
pub fn save_project(project: &mut Project, store: &mut impl ProjectStore) -> Result<(), StoreError> {
    if project.is_read_only() {
        return Err(StoreError::ReadOnly(project.name().to_string()));
    }
    project.server_ts = store.save_project(project.to_file())?;
    Ok(())
}

// ─── In-memory store ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    user: Option<String>,
    last_ts: i64,
    projects: BTreeMap<String, ProjectFile>,
    palettes: BTreeMap<String, PaletteFile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: &str) {
        self.user = Some(user.to_string());
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }

    fn session(&self) -> Result<&str, StoreError> {
        self.user.as_deref().ok_or(StoreError::Unauthorized)
    }

    /// Strictly increasing, close to wall-clock time.
    fn stamp(&mut self) -> i64 {
        self.last_ts = now_millis().max(self.last_ts + 1);
        self.last_ts
    }

    fn check_fresh(name: &str, stored: Option<i64>, ours: i64) -> Result<(), StoreError> {
        match stored {
            Some(stored) if ours != 0 && ours < stored => Err(StoreError::Conflict {
                name: name.to_string(),
                stored,
                ours,
            }),
            _ => Ok(()),
        }
    }
}

impl ProjectStore for MemoryStore {
    fn get_project(&self, name: &str) -> Result<ProjectFile, StoreError> {
        self.session()?;
        self.projects.get(name).cloned().ok_or(StoreError::NotFound {
            kind: "project",
            name: name.to_string(),
        })
    }

    fn list_projects(&self) -> Result<Vec<Entry>, StoreError> {
        self.session()?;
        Ok(self
            .projects
            .values()
            .map(|p| Entry {
                name: p.project.clone(),
                owner: p.owner.clone(),
                server_ts: p.server_ts,
            })
            .collect())
    }

    fn save_project(&mut self, mut file: ProjectFile) -> Result<i64, StoreError> {
        self.session()?;
        if file.read_only {
            return Err(StoreError::ReadOnly(file.project));
        }
        let stored = self.projects.get(&file.project).map(|p| p.server_ts);
        Self::check_fresh(&file.project, stored, file.server_ts)?;
        file.server_ts = self.stamp();
        log::debug!("store: saved project `{}` at {}", file.project, file.server_ts);
        let ts = file.server_ts;
        self.projects.insert(file.project.clone(), file);
        Ok(ts)
    }

    fn delete_project(&mut self, name: &str) -> Result<(), StoreError> {
        self.session()?;
        self.projects
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                kind: "project",
                name: name.to_string(),
            })
    }

    fn get_palette(&self, name: &str) -> Result<PaletteFile, StoreError> {
        self.session()?;
        self.palettes.get(name).cloned().ok_or(StoreError::NotFound {
            kind: "palette",
            name: name.to_string(),
        })
    }

    fn list_palettes(&self) -> Result<Vec<Entry>, StoreError> {
        self.session()?;
        Ok(self
            .palettes
            .values()
            .map(|p| Entry {
                name: p.name.clone(),
                owner: p.owner.clone(),
                server_ts: p.server_ts,
            })
            .collect())
    }

    fn save_palette(&mut self, mut file: PaletteFile) -> Result<i64, StoreError> {
        self.session()?;
        if file.read_only {
            return Err(StoreError::ReadOnly(file.name));
        }
        let stored = self.palettes.get(&file.name).map(|p| p.server_ts);
        Self::check_fresh(&file.name, stored, file.server_ts)?;
        file.server_ts = self.stamp();
        let ts = file.server_ts;
        self.palettes.insert(file.name.clone(), file);
        Ok(ts)
    }

    fn delete_palette(&mut self, name: &str) -> Result<(), StoreError> {
        self.session()?;
        self.palettes
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                kind: "palette",
                name: name.to_string(),
            })
    }
}
