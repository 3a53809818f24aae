pub mod clicks;
pub mod commands;
pub mod hooks;
pub mod input;
pub mod interact;
pub mod session;
pub mod shortcuts;
pub mod toast;

pub use commands::CommandStack;
pub use hooks::{DefaultBehavior, Dispatcher, Hook, HookName, NodeContext, TypeBehavior, TypeContext};
pub use input::{InputEvent, Modifiers, Payload};
pub use interact::{CanvasController, KeyOutcome, ToolKind};
pub use session::{DragState, LinkDraw, Session};
pub use shortcuts::ShortcutAction;
pub use toast::{Toast, ToastLevel, Toasts};
