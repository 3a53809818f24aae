//! Platform-neutral input events.
//!
//! The page translates DOM events into these; coordinates are absolute
//! screen-space pixels.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Ctrl on most platforms, ⌘ on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Content handed over by a drop or a paste. Browsers offer a rich (HTML)
/// and a plain variant; either may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub rich: Option<String>,
    #[serde(default)]
    pub plain: String,
}

impl Payload {
    pub fn plain(text: &str) -> Self {
        Self {
            rich: None,
            plain: text.to_string(),
        }
    }

    pub fn with_rich(mut self, html: &str) -> Self {
        self.rich = Some(html.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.plain.trim().is_empty() && self.rich.as_deref().is_none_or(|r| r.trim().is_empty())
    }

    /// The non-empty variants, rich first.
    pub fn variants(&self) -> SmallVec<[&str; 2]> {
        self.rich
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.plain.as_str()))
            .filter(|v| !v.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    Wheel {
        x: f64,
        y: f64,
        delta_y: f64,
    },
    Drop {
        x: f64,
        y: f64,
        payload: Payload,
    },
    Paste {
        payload: Payload,
    },
    Key {
        key: String,
        modifiers: Modifiers,
    },
}

impl InputEvent {
    pub fn from_pointer_down(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerDown { x, y, modifiers }
    }

    pub fn from_pointer_move(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerMove { x, y, modifiers }
    }

    pub fn from_pointer_up(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerUp { x, y, modifiers }
    }

    /// Screen position, for events that have one.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Wheel { x, y, .. }
            | Self::Drop { x, y, .. } => Some((*x, *y)),
            Self::Paste { .. } | Self::Key { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_variants_skip_blank() {
        let p = Payload::plain("https://example.org").with_rich("  ");
        assert_eq!(p.variants().as_slice(), &["https://example.org"]);
        assert!(Payload::plain(" ").is_empty());
        assert!(!Payload::plain("").with_rich("<b>x</b>").is_empty());
    }

    #[test]
    fn positions() {
        let down = InputEvent::from_pointer_down(3.0, 4.0, Modifiers::NONE);
        assert_eq!(down.position(), Some((3.0, 4.0)));
        let paste = InputEvent::Paste {
            payload: Payload::default(),
        };
        assert_eq!(paste.position(), None);
    }
}
