//! Palette item types: icon, property schema, layout template and per-type
//! behavior settings.

use crate::data::{Property, PropertyType};
use crate::id::TypeId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB` or `#RRGGBB`. The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let channel = |hi: u8, lo: u8| -> Option<f32> {
            Some((hex_val(hi)? << 4 | hex_val(lo)?) as f32 / 255.0)
        };
        match bytes.len() {
            3 => Some(Self::rgba(
                channel(bytes[0], bytes[0])?,
                channel(bytes[1], bytes[1])?,
                channel(bytes[2], bytes[2])?,
                1.0,
            )),
            6 => Some(Self::rgba(
                channel(bytes[0], bytes[1])?,
                channel(bytes[2], bytes[3])?,
                channel(bytes[4], bytes[5])?,
                1.0,
            )),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB` (alpha is not persisted for type colors).
    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// HSL → RGB, all components in [0, 1].
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let hue = |mut t: f32| {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };
        Self::rgba(hue(h + 1.0 / 3.0), hue(h), hue(h - 1.0 / 3.0), 1.0)
    }
}

// ─── Drop / paste affinity ───────────────────────────────────────────────

/// How strongly a type claims a dropped or pasted payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HandleLevel {
    #[default]
    None,
    /// A configured substring occurs somewhere in the payload.
    Weak,
    /// The payload ends in a configured file extension.
    Medium,
    /// The payload starts with a configured prefix.
    Strong,
}

/// Declarative rules a type uses to claim payloads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DropRules {
    pub prefixes: Vec<String>,
    pub extensions: Vec<String>,
    pub partials: Vec<String>,
    /// Level reported when no rule matches.
    pub default_level: HandleLevel,
}

impl DropRules {
    /// Score one payload variant. Matching is case-insensitive; extensions
    /// are compared against the text with any query or fragment removed.
    pub fn score(&self, text: &str) -> HandleLevel {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return self.default_level;
        }
        if self
            .prefixes
            .iter()
            .any(|p| !p.is_empty() && text.starts_with(&p.to_lowercase()))
        {
            return HandleLevel::Strong;
        }
        let path = text.split(['?', '#']).next().unwrap_or_default();
        if self.extensions.iter().any(|ext| {
            let ext = ext.trim_start_matches('.').to_lowercase();
            !ext.is_empty() && path.ends_with(&format!(".{ext}"))
        }) {
            return HandleLevel::Medium;
        }
        if self
            .partials
            .iter()
            .any(|p| !p.is_empty() && text.contains(&p.to_lowercase()))
        {
            return HandleLevel::Weak;
        }
        self.default_level
    }
}

// ─── Settings & schema ───────────────────────────────────────────────────

/// Per-type behavior configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeSettings {
    pub can_handle: DropRules,
    /// Width of expanded detail content, in node-space units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_width: Option<f64>,
    /// Icon size, in node-space units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_size: Option<f64>,
    /// New nodes of this type append the type name to their label.
    pub show_type: bool,
}

/// Default property set and inheritance for a type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeSchema {
    /// Types whose schema properties this type inherits, nearest first.
    pub parents: SmallVec<[TypeId; 2]>,
    pub properties: BTreeMap<String, Property>,
    /// Declared type of the node's primary value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<PropertyType>,
}

// ─── Node type ───────────────────────────────────────────────────────────

/// A palette item: a reusable node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    pub id: TypeId,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub icon_alt: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub settings: TypeSettings,
    /// Template interpolated into a node's custom detail content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TypeSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_color: Option<String>,
}

impl NodeType {
    pub fn new(id: TypeId, section: &str) -> Self {
        Self {
            id,
            icon: String::new(),
            icon_alt: id.as_str().to_string(),
            label: id.as_str().to_string(),
            position: 0,
            section: section.to_string(),
            settings: TypeSettings::default(),
            layout: None,
            schema: None,
            node_color: None,
            custom_color: None,
        }
    }

    /// The generic type a node falls back to when its palette has nothing
    /// better to offer.
    pub fn unknown() -> Self {
        let mut t = Self::new(TypeId::intern(UNKNOWN_TYPE), "");
        t.label = "Unknown".to_string();
        t
    }

    /// Display color: the custom color, else the palette color, else one
    /// derived from the type id so each type is stable across sessions.
    pub fn color(&self) -> Color {
        self.custom_color
            .as_deref()
            .or(self.node_color.as_deref())
            .and_then(Color::from_hex)
            .unwrap_or_else(|| derive_color(self.id.as_str()))
    }

    pub fn has_layout(&self) -> bool {
        self.layout.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.id.as_str()
        } else {
            &self.label
        }
    }
}

/// Id of the synthesized fallback type.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Hash the id (FNV-1a) onto the hue wheel.
fn derive_color(id: &str) -> Color {
    let hash = id
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
    Color::from_hsl((hash % 360) as f32 / 360.0, 0.55, 0.72)
}
