//! A named catalog of node types, grouped into ordered sections.
//!
//! Item ids are unique within a palette. A palette viewed from another
//! user's share is read-only: every mutator fails with
//! [`SketchError::ReadOnly`].

use crate::data::Property;
use crate::diagnostics::{self, Diagnostic, Subject};
use crate::error::{Result, SketchError};
use crate::id::TypeId;
use crate::schema::NodeType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A palette section: a heading items are grouped under.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Other section attributes, kept verbatim.
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extras: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    name: String,
    owner: Option<String>,
    read_only: bool,
    pub(crate) server_ts: i64,
    sections: Vec<Section>,
    items: HashMap<TypeId, NodeType>,
    pub(crate) extras: serde_json::Map<String, serde_json::Value>,
    /// Bound when no item can serve as the default.
    fallback: NodeType,
    diagnostics: Vec<Diagnostic>,
}

impl Palette {
    /// An empty, editable palette owned by the current user.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            read_only: false,
            server_ts: 0,
            sections: Vec::new(),
            items: HashMap::new(),
            extras: serde_json::Map::new(),
            fallback: NodeType::unknown(),
            diagnostics: Vec::new(),
        }
    }

    /// Mark this palette as another user's shared, read-only copy.
    pub fn into_shared(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self.read_only = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn server_ts(&self) -> i64 {
        self.server_ts
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            Err(SketchError::ReadOnly(format!("palette `{}`", self.name)))
        } else {
            Ok(())
        }
    }

    // ─── Items ───────────────────────────────────────────────────────────

    pub fn item(&self, id: TypeId) -> Option<&NodeType> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items ordered by `position`, ties broken by id.
    pub fn items(&self) -> Vec<&NodeType> {
        let mut items: Vec<&NodeType> = self.items.values().collect();
        items.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        items
    }

    pub fn items_in_section(&self, section: &str) -> Vec<&NodeType> {
        self.items()
            .into_iter()
            .filter(|t| t.section == section)
            .collect()
    }

    /// Add a type. Its section is created when missing.
    ///
    /// A duplicate id is recorded as a diagnostic and rejected; the existing
    /// item is kept.
    pub fn add_item(&mut self, item: NodeType) -> Result<()> {
        self.check_writable()?;
        self.insert_item(item)
    }

    fn insert_item(&mut self, item: NodeType) -> Result<()> {
        let id = item.id;
        if self.items.contains_key(&id) {
            self.diagnostics.push(Diagnostic::error(
                Subject::Type(id),
                diagnostics::DUPLICATE_TYPE_ID,
                format!("palette `{}` already has a type `{id}`", self.name),
            ));
            return Err(SketchError::DuplicateTypeId(id));
        }
        if !item.section.is_empty() {
            self.ensure_section(&item.section);
        }
        self.items.insert(id, item);
        Ok(())
    }

    /// Edit an item in place. The id cannot be changed this way; use
    /// [`Palette::rename_item`].
    pub fn update_item(&mut self, id: TypeId, edit: impl FnOnce(&mut NodeType)) -> Result<()> {
        self.check_writable()?;
        let item = self.items.get_mut(&id).ok_or(SketchError::UnknownType(id))?;
        edit(item);
        item.id = id;
        let section = item.section.clone();
        if !section.is_empty() {
            self.ensure_section(&section);
        }
        Ok(())
    }

    /// Change an item's id, keeping the lookup index and parent references
    /// consistent.
    pub fn rename_item(&mut self, old: TypeId, new: TypeId) -> Result<()> {
        self.check_writable()?;
        if old == new {
            return Ok(());
        }
        if self.items.contains_key(&new) {
            return Err(SketchError::DuplicateTypeId(new));
        }
        let mut item = self.items.remove(&old).ok_or(SketchError::UnknownType(old))?;
        item.id = new;
        self.items.insert(new, item);
        for other in self.items.values_mut() {
            if let Some(schema) = other.schema.as_mut() {
                for parent in schema.parents.iter_mut().filter(|p| **p == old) {
                    *parent = new;
                }
            }
        }
        log::debug!("palette `{}`: renamed type `{old}` to `{new}`", self.name);
        Ok(())
    }

    pub fn remove_item(&mut self, id: TypeId) -> Result<NodeType> {
        self.check_writable()?;
        self.items.remove(&id).ok_or(SketchError::UnknownType(id))
    }

    /// Next free `position` for an appended item.
    pub fn next_position(&self) -> u32 {
        self.items
            .values()
            .map(|t| t.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// The type a node binds to when its own type is missing: the first
    /// item by position, or a synthesized `unknown` type.
    pub fn default_type(&self) -> &NodeType {
        self.items().into_iter().next().unwrap_or(&self.fallback)
    }

    /// Look up `id`, falling back to the default type. The flag tells
    /// whether `id` itself was found.
    pub fn resolve(&self, id: TypeId) -> (&NodeType, bool) {
        match self.items.get(&id) {
            Some(t) => (t, true),
            None => (self.default_type(), false),
        }
    }

    /// Schema properties of `id`, with inherited parents applied first so
    /// nearer definitions win.
    pub fn schema_properties(&self, id: TypeId) -> BTreeMap<String, Property> {
        let mut out = BTreeMap::new();
        let mut visiting = HashSet::new();
        self.collect_schema(id, &mut out, &mut visiting);
        out
    }

    fn collect_schema(
        &self,
        id: TypeId,
        out: &mut BTreeMap<String, Property>,
        visiting: &mut HashSet<TypeId>,
    ) {
        if !visiting.insert(id) {
            return;
        }
        let Some(schema) = self.items.get(&id).and_then(|t| t.schema.as_ref()) else {
            return;
        };
        for parent in schema.parents.iter().rev() {
            self.collect_schema(*parent, out, visiting);
        }
        for (name, prop) in &schema.properties {
            out.insert(name.clone(), prop.clone());
        }
    }

    // ─── Sections ────────────────────────────────────────────────────────

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    fn ensure_section(&mut self, name: &str) {
        if !self.has_section(name) {
            self.sections.push(Section::new(name));
        }
    }

    pub fn add_section(&mut self, name: &str) -> Result<()> {
        self.check_writable()?;
        self.ensure_section(name);
        Ok(())
    }

    pub fn rename_section(&mut self, old: &str, new: &str) -> Result<()> {
        self.check_writable()?;
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.name == old)
            .ok_or_else(|| SketchError::UnknownSection(old.to_string()))?;
        section.name = new.to_string();
        for item in self.items.values_mut().filter(|t| t.section == old) {
            item.section = new.to_string();
        }
        Ok(())
    }

    /// Delete an empty section.
    pub fn delete_section(&mut self, name: &str) -> Result<()> {
        self.check_writable()?;
        let count = self.items.values().filter(|t| t.section == name).count();
        if count > 0 {
            return Err(SketchError::SectionInUse {
                name: name.to_string(),
                count,
            });
        }
        let before = self.sections.len();
        self.sections.retain(|s| s.name != name);
        if self.sections.len() == before {
            return Err(SketchError::UnknownSection(name.to_string()));
        }
        Ok(())
    }

    // ─── Persistence helpers ─────────────────────────────────────────────

    pub(crate) fn from_parts(
        name: String,
        owner: Option<String>,
        read_only: bool,
        sections: Vec<Section>,
        extras: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let mut palette = Self::new(&name);
        palette.owner = owner;
        palette.read_only = read_only;
        palette.sections = sections;
        palette.extras = extras;
        palette
    }

    /// Insert while loading: read-only palettes are still populated.
    pub(crate) fn load_item(&mut self, key: &str, mut item: NodeType) {
        if item.id.as_str() != key {
            self.diagnostics.push(Diagnostic::warning(
                Subject::Type(item.id),
                diagnostics::DUPLICATE_TYPE_ID,
                format!("item stored under `{key}` declares id `{}`", item.id),
            ));
            if self.items.contains_key(&item.id) {
                item.id = TypeId::intern(key);
            }
        }
        // Duplicates are already recorded by insert_item.
        let _ = self.insert_item(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PropertyType;
    use crate::schema::TypeSchema;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use smallvec::smallvec;

    fn item(id: &str, section: &str, position: u32) -> NodeType {
        let mut t = NodeType::new(TypeId::intern(id), section);
        t.position = position;
        t
    }

    fn sample() -> Palette {
        let mut p = Palette::new("default");
        p.add_item(item("thing", "General", 1)).unwrap();
        p.add_item(item("note", "General", 0)).unwrap();
        p.add_item(item("person", "People", 2)).unwrap();
        p
    }

    #[test]
    fn items_are_ordered_by_position() {
        let p = sample();
        let ids: Vec<&str> = p.items().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["note", "thing", "person"]);
        assert_eq!(p.default_type().id.as_str(), "note");
        assert_eq!(p.next_position(), 3);
        assert_eq!(p.sections().len(), 2);
    }

    #[test]
    fn duplicate_id_is_rejected_and_recorded() {
        let mut p = sample();
        let err = p.add_item(item("thing", "Other", 9)).unwrap_err();
        assert!(matches!(err, SketchError::DuplicateTypeId(_)));
        assert_eq!(p.item(TypeId::intern("thing")).unwrap().section, "General");
        assert_eq!(p.diagnostics().len(), 1);
    }

    #[test]
    fn rename_updates_index_and_parents() {
        let mut p = sample();
        p.update_item(TypeId::intern("person"), |t| {
            t.schema = Some(TypeSchema {
                parents: smallvec![TypeId::intern("thing")],
                ..Default::default()
            });
        })
        .unwrap();

        p.rename_item(TypeId::intern("thing"), TypeId::intern("object"))
            .unwrap();
        assert!(p.item(TypeId::intern("thing")).is_none());
        assert_eq!(
            p.item(TypeId::intern("object")).unwrap().id,
            TypeId::intern("object")
        );
        let parents = &p.item(TypeId::intern("person")).unwrap().schema.as_ref().unwrap().parents;
        assert_eq!(parents.as_slice(), &[TypeId::intern("object")]);

        let err = p
            .rename_item(TypeId::intern("note"), TypeId::intern("person"))
            .unwrap_err();
        assert!(matches!(err, SketchError::DuplicateTypeId(_)));
    }

    #[test]
    fn section_in_use_cannot_be_deleted() {
        let mut p = sample();
        let err = p.delete_section("People").unwrap_err();
        assert!(matches!(err, SketchError::SectionInUse { count: 1, .. }));

        p.remove_item(TypeId::intern("person")).unwrap();
        p.delete_section("People").unwrap();
        assert!(!p.has_section("People"));
    }

    #[test]
    fn rename_section_moves_items() {
        let mut p = sample();
        p.rename_section("General", "Basics").unwrap();
        assert_eq!(p.items_in_section("Basics").len(), 2);
        assert!(p.items_in_section("General").is_empty());
    }

    #[test]
    fn shared_palette_is_read_only() {
        let mut p = sample().into_shared("alice");
        assert_eq!(p.owner(), Some("alice"));
        assert!(matches!(
            p.add_item(item("x", "", 0)),
            Err(SketchError::ReadOnly(_))
        ));
        assert!(matches!(
            p.delete_section("General"),
            Err(SketchError::ReadOnly(_))
        ));
    }

    #[test]
    fn empty_palette_defaults_to_unknown() {
        let p = Palette::new("empty");
        let (t, found) = p.resolve(TypeId::intern("thing"));
        assert!(!found);
        assert_eq!(t.id.as_str(), crate::schema::UNKNOWN_TYPE);
    }

    #[test]
    fn schema_properties_inherit_from_parents() {
        let mut p = sample();
        let prop = |v: serde_json::Value| Property::new(v, PropertyType::Normal);
        p.update_item(TypeId::intern("thing"), |t| {
            t.schema = Some(TypeSchema {
                properties: [("a".to_string(), prop(json!("base"))), ("b".to_string(), prop(json!("base")))]
                    .into_iter()
                    .collect(),
                // A cycle must not recurse forever.
                parents: smallvec![TypeId::intern("person")],
                ..Default::default()
            });
        })
        .unwrap();
        p.update_item(TypeId::intern("person"), |t| {
            t.schema = Some(TypeSchema {
                parents: smallvec![TypeId::intern("thing")],
                properties: [("b".to_string(), prop(json!("own")))].into_iter().collect(),
                ..Default::default()
            });
        })
        .unwrap();

        let props = p.schema_properties(TypeId::intern("person"));
        assert_eq!(props["a"].value, json!("base"));
        assert_eq!(props["b"].value, json!("own"));
    }
}
