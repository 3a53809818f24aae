//! Undo/Redo command stack.
//!
//! Every undoable edit is recorded as a pair of project snapshots, encoded
//! with MessagePack. Undo restores the "before" snapshot, redo the "after"
//! one.
//!
//! Drag gestures use **batching**: the snapshot is captured when the
//! gesture starts and again when it ends, so the whole gesture undoes in a
//! single step.

use sk_core::{Project, ProjectFile};

/// One undoable step.
#[derive(Debug, Clone)]
pub struct Command {
    before: Vec<u8>,
    after: Vec<u8>,
    description: String,
}

impl Command {
    pub fn description(&self) -> &str {
        &self.description
    }
}

fn snapshot(project: &Project) -> Option<Vec<u8>> {
    // Named encoding: the file shapes skip default fields.
    rmp_serde::to_vec_named(&project.to_file())
        .inspect_err(|e| log::warn!("undo snapshot failed: {e}"))
        .ok()
}

fn restore(project: &mut Project, bytes: &[u8]) -> bool {
    match rmp_serde::from_slice::<ProjectFile>(bytes) {
        Ok(file) => {
            project.replace_with(file);
            true
        }
        Err(e) => {
            log::warn!("undo snapshot unreadable: {e}");
            false
        }
    }
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of a batch.
    batch_snapshot: Option<Vec<u8>>,
    batch_description: String,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(256)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_description: String::new(),
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Start a batch group. All edits until the matching
    /// [`CommandStack::end_batch`] become one undo step.
    pub fn begin_batch(&mut self, project: &Project, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = snapshot(project);
            self.batch_description = description.to_string();
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the project
    /// changed, one command is pushed.
    pub fn end_batch(&mut self, project: &Project) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        if let (Some(before), Some(after)) = (self.batch_snapshot.take(), snapshot(project)) {
            let description = std::mem::take(&mut self.batch_description);
            self.push(before, after, description);
        }
    }

    /// Apply `edit` to the project and record it as one undo step. Inside a
    /// batch the edit is applied live and captured by the batch.
    pub fn execute<R>(
        &mut self,
        project: &mut Project,
        description: &str,
        edit: impl FnOnce(&mut Project) -> R,
    ) -> R {
        if self.batch_depth > 0 {
            return edit(project);
        }
        let before = snapshot(project);
        let result = edit(project);
        if let (Some(before), Some(after)) = (before, snapshot(project)) {
            self.push(before, after, description.to_string());
        }
        result
    }

    fn push(&mut self, before: Vec<u8>, after: Vec<u8>, description: String) {
        // Only push if the project actually changed
        if before == after {
            return;
        }
        log::debug!("undo step: {description}");
        self.undo_stack.push(Command {
            before,
            after,
            description,
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, project: &mut Project) -> Option<String> {
        let cmd = self.undo_stack.pop()?;
        if !restore(project, &cmd.before) {
            self.undo_stack.push(cmd);
            return None;
        }
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, project: &mut Project) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        if !restore(project, &cmd.after) {
            self.redo_stack.push(cmd);
            return None;
        }
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Forget all history, e.g. after loading another project.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_core::{NodeType, Palette, Point, TypeId};

    fn project() -> Project {
        let mut palette = Palette::new("default");
        palette
            .add_item(NodeType::new(TypeId::intern("thing"), "General"))
            .unwrap();
        Project::new("P", palette)
    }

    #[test]
    fn undo_redo_single_edit() {
        let mut p = project();
        let mut stack = CommandStack::new(10);
        let a = stack.execute(&mut p, "add node", |p| {
            p.create_empty_node(TypeId::intern("thing"), Point::new(1.0, 2.0))
        });
        assert!(stack.can_undo());

        assert_eq!(stack.undo(&mut p).as_deref(), Some("add node"));
        assert!(p.node(a).is_none());
        assert!(stack.can_redo());

        assert_eq!(stack.redo(&mut p).as_deref(), Some("add node"));
        assert_eq!(p.node(a).unwrap().pos(), Point::new(1.0, 2.0));
    }

    #[test]
    fn no_op_edits_are_not_recorded() {
        let mut p = project();
        let mut stack = CommandStack::new(10);
        stack.execute(&mut p, "nothing", |_| ());
        assert!(!stack.can_undo());
    }

    #[test]
    fn batch_collapses_to_one_step() {
        let mut p = project();
        let mut stack = CommandStack::new(10);
        let a = stack.execute(&mut p, "add", |p| {
            p.create_empty_node(TypeId::intern("thing"), Point::default())
        });

        stack.begin_batch(&p, "drag");
        for _ in 0..5 {
            stack.execute(&mut p, "move", |p| p.edit_node(a, |n| n.move_by(10.0, 0.0)));
        }
        stack.end_batch(&p);
        assert_eq!(stack.undo_len(), 2);

        assert_eq!(stack.undo(&mut p).as_deref(), Some("drag"));
        assert_eq!(p.node(a).unwrap().pos(), Point::default());
    }

    #[test]
    fn depth_is_bounded() {
        let mut p = project();
        let mut stack = CommandStack::new(3);
        for i in 0..5 {
            stack.execute(&mut p, "add", |p| {
                p.create_empty_node(TypeId::intern("thing"), Point::new(i as f64, 0.0))
            });
        }
        assert_eq!(stack.undo_len(), 3);
        while stack.undo(&mut p).is_some() {}
        assert_eq!(p.node_count(), 2);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut p = project();
        let mut stack = CommandStack::new(10);
        stack.execute(&mut p, "a", |p| {
            p.create_empty_node(TypeId::intern("thing"), Point::default())
        });
        stack.undo(&mut p);
        stack.execute(&mut p, "b", |p| {
            p.create_empty_node(TypeId::intern("thing"), Point::default())
        });
        assert!(!stack.can_redo());
    }
}
