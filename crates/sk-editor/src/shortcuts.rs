//! Keyboard bindings of the canvas.
//!
//! The page forwards `KeyboardEvent.key` with the modifier flags; the
//! binding table turns that into a [`ShortcutAction`]. Ctrl and ⌘ count as
//! the same command modifier, and Alt is ignored.

use crate::input::Modifiers;

/// What a key press asks the canvas to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    ToolSelect,
    ToolLink,
    Undo,
    Redo,
    Delete,
    SelectAll,
    /// Return the selected full nodes to empty.
    SwitchToEmpty,
    ToggleExpansion,
    ToggleHidden,
    ToggleShowType,
    ToggleBidirectional,
    ZoomIn,
    ZoomOut,
    ZoomToFit,
    /// Clear the selection and abandon any link being drawn.
    Deselect,
    ToggleDebug,
}

/// Modifier state a binding asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chord {
    Bare,
    Shift,
    Cmd,
    CmdShift,
}

impl Chord {
    fn of(modifiers: Modifiers) -> Self {
        match (modifiers.ctrl || modifiers.meta, modifiers.shift) {
            (false, false) => Self::Bare,
            (false, true) => Self::Shift,
            (true, false) => Self::Cmd,
            (true, true) => Self::CmdShift,
        }
    }
}

use ShortcutAction as A;

/// Key names compare ASCII case-insensitively.
const BINDINGS: &[(Chord, &str, ShortcutAction)] = &[
    (Chord::Bare, "v", A::ToolSelect),
    (Chord::Bare, "l", A::ToolLink),
    (Chord::Bare, "e", A::ToggleExpansion),
    (Chord::Bare, "Enter", A::ToggleExpansion),
    (Chord::Bare, "h", A::ToggleHidden),
    (Chord::Bare, "b", A::ToggleBidirectional),
    (Chord::Bare, "Delete", A::Delete),
    (Chord::Bare, "Backspace", A::Delete),
    (Chord::Bare, "Escape", A::Deselect),
    (Chord::Shift, "t", A::ToggleShowType),
    (Chord::Cmd, "z", A::Undo),
    (Chord::Cmd, "y", A::Redo),
    (Chord::Cmd, "a", A::SelectAll),
    (Chord::Cmd, "=", A::ZoomIn),
    (Chord::Cmd, "+", A::ZoomIn),
    (Chord::Cmd, "-", A::ZoomOut),
    (Chord::Cmd, "0", A::ZoomToFit),
    (Chord::CmdShift, "z", A::Redo),
    (Chord::CmdShift, "+", A::ZoomIn),
    (Chord::CmdShift, "d", A::ToggleDebug),
    (Chord::CmdShift, "Delete", A::SwitchToEmpty),
    (Chord::CmdShift, "Backspace", A::SwitchToEmpty),
];

impl ShortcutAction {
    /// The action bound to `key` under `modifiers`, if any.
    pub fn for_key(key: &str, modifiers: Modifiers) -> Option<Self> {
        let chord = Chord::of(modifiers);
        BINDINGS
            .iter()
            .find(|(c, k, _)| *c == chord && k.eq_ignore_ascii_case(key))
            .map(|&(_, _, action)| action)
    }

    /// Name reported to the page.
    pub fn name(self) -> &'static str {
        match self {
            A::ToolSelect => "toolSelect",
            A::ToolLink => "toolLink",
            A::Undo => "undo",
            A::Redo => "redo",
            A::Delete => "delete",
            A::SelectAll => "selectAll",
            A::SwitchToEmpty => "switchToEmpty",
            A::ToggleExpansion => "toggleExpansion",
            A::ToggleHidden => "toggleHidden",
            A::ToggleShowType => "toggleShowType",
            A::ToggleBidirectional => "toggleBidirectional",
            A::ZoomIn => "zoomIn",
            A::ZoomOut => "zoomOut",
            A::ZoomToFit => "zoomToFit",
            A::Deselect => "deselect",
            A::ToggleDebug => "toggleDebug",
        }
    }

    /// Whether the action edits the project, and so is refused on a
    /// read-only one.
    pub fn edits_project(self) -> bool {
        matches!(
            self,
            A::Undo
                | A::Redo
                | A::Delete
                | A::SwitchToEmpty
                | A::ToggleExpansion
                | A::ToggleHidden
                | A::ToggleShowType
                | A::ToggleBidirectional
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMD: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    const CMD_SHIFT: Modifiers = Modifiers {
        ctrl: true,
        shift: true,
        ..Modifiers::NONE
    };

    #[test]
    fn ctrl_and_meta_are_one_modifier() {
        assert_eq!(ShortcutAction::for_key("z", CMD), Some(A::Undo));
        assert_eq!(ShortcutAction::for_key("z", META), Some(A::Undo));
        assert_eq!(ShortcutAction::for_key("Z", CMD_SHIFT), Some(A::Redo));
    }

    #[test]
    fn chord_decides_between_bindings_of_one_key() {
        let cases = [
            ("Backspace", Modifiers::NONE, Some(A::Delete)),
            ("Backspace", CMD_SHIFT, Some(A::SwitchToEmpty)),
            ("Backspace", CMD, None),
            ("t", Modifiers::SHIFT, Some(A::ToggleShowType)),
            ("t", Modifiers::NONE, None),
            ("ENTER", Modifiers::NONE, Some(A::ToggleExpansion)),
        ];
        for (key, modifiers, expected) in cases {
            assert_eq!(ShortcutAction::for_key(key, modifiers), expected, "{key} {modifiers:?}");
        }
    }

    #[test]
    fn alt_does_not_change_the_binding() {
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        assert_eq!(ShortcutAction::for_key("l", alt), Some(A::ToolLink));
        assert_eq!(ShortcutAction::for_key("Tab", Modifiers::NONE), None);
    }

    #[test]
    fn view_and_session_actions_leave_the_project_alone() {
        assert!(A::Delete.edits_project());
        assert!(!A::ZoomToFit.edits_project());
        assert!(!A::Deselect.edits_project());
        assert_eq!(A::ToggleBidirectional.name(), "toggleBidirectional");
    }
}
