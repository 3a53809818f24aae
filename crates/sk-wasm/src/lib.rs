//! WASM bridge for Sketchboard: exposes the canvas controller to the page.
//!
//! Compiled via `wasm-pack build --target web`. The page forwards DOM
//! events to a [`SketchCanvas`], repaints with the SVG from
//! [`SketchCanvas::render`] whenever a handler returns `true`, and shows
//! the notices drained by [`SketchCanvas::take_toasts`].

use sk_core::{Palette, Project, PropertyType, SketchConfig, TypeId, Uid};
use sk_editor::{CanvasController, InputEvent, Modifiers, Payload, ToolKind};
use sk_render::kurbo::Rect;
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas.
///
/// Wraps one [`CanvasController`]; every interaction from the page goes
/// through it.
#[wasm_bindgen]
pub struct SketchCanvas {
    controller: CanvasController,
    width: f64,
    height: f64,
}

fn screen(width: f64, height: f64) -> Rect {
    Rect::new(0.0, 0.0, width, height)
}

fn mods(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

/// Rich variants arrive as an empty string when the page has none.
fn payload(plain: &str, rich: &str) -> Payload {
    let payload = Payload::plain(plain);
    if rich.trim().is_empty() {
        payload
    } else {
        payload.with_rich(rich)
    }
}

fn parse_uid(uid: &str) -> Option<Uid> {
    uid.parse()
        .inspect_err(|e| log::warn!("bad uid `{uid}`: {e}"))
        .ok()
}

fn error_json(e: impl std::fmt::Display) -> String {
    serde_json::json!({ "ok": false, "error": e.to_string() }).to_string()
}

#[wasm_bindgen]
impl SketchCanvas {
    /// Create a canvas of the given size holding an empty project.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        console_logger_setup();

        let project = Project::new("untitled", Palette::new("default"));
        Self {
            controller: CanvasController::new(project, screen(width, height), SketchConfig::default()),
            width,
            height,
        }
    }

    /// Open a project from its persisted JSON. `palette_json` may be empty,
    /// in which case nodes bind to a synthesized fallback type.
    /// `config_json` may be empty for the defaults.
    ///
    /// Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn load(&mut self, project_json: &str, palette_json: &str, user: &str, config_json: &str) -> String {
        let palette = if palette_json.trim().is_empty() {
            None
        } else {
            match Palette::from_json(palette_json) {
                Ok(p) => Some(p),
                Err(e) => return error_json(e),
            }
        };
        let config = if config_json.trim().is_empty() {
            SketchConfig::default()
        } else {
            match SketchConfig::from_json(config_json) {
                Ok(c) => c,
                Err(e) => return error_json(e),
            }
        };
        let project = match Project::from_json(project_json, palette) {
            Ok(p) => p.with_user(user),
            Err(e) => return error_json(e),
        };
        log::info!("opened project `{}` as {user}", project.name());
        self.controller = CanvasController::new(project, screen(self.width, self.height), config);
        r#"{"ok":true}"#.to_string()
    }

    /// The project as persisted JSON, or `undefined` if it cannot be encoded.
    pub fn export_json(&self) -> Option<String> {
        self.controller
            .export_json()
            .inspect_err(|e| log::warn!("export failed: {e}"))
            .ok()
    }

    /// The canvas SVG document.
    pub fn render(&mut self) -> String {
        self.controller.render()
    }

    /// Resize the canvas.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.controller.resize(screen(width, height));
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Handle pointer down event. Returns true if the canvas needs repainting.
    pub fn handle_pointer_down(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let event = InputEvent::from_pointer_down(x, y, mods(shift, ctrl, alt, meta));
        self.controller.handle(&event)
    }

    /// Handle pointer move event. Returns true if the canvas needs repainting.
    pub fn handle_pointer_move(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let event = InputEvent::from_pointer_move(x, y, mods(shift, ctrl, alt, meta));
        self.controller.handle(&event)
    }

    /// Handle pointer up event. Returns true if the canvas needs repainting.
    pub fn handle_pointer_up(&mut self, x: f64, y: f64, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        let event = InputEvent::from_pointer_up(x, y, mods(shift, ctrl, alt, meta));
        self.controller.handle(&event)
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.controller.handle(&InputEvent::Wheel { x, y, delta_y })
    }

    /// A DOM click. Single clicks are held back until [`Self::tick`] shows no
    /// double click followed.
    pub fn handle_click(&mut self, x: f64, y: f64) {
        self.handle_click_at(now_ms(), x, y);
    }

    /// [`Self::handle_click`] with an explicit timestamp in milliseconds.
    pub fn handle_click_at(&mut self, now_ms: f64, x: f64, y: f64) {
        self.controller.click(now_ms, x, y);
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) -> bool {
        self.controller.double_click(x, y)
    }

    /// Fire single clicks whose delay has passed. Call from a timer.
    pub fn tick(&mut self) -> bool {
        self.tick_at(now_ms())
    }

    pub fn tick_at(&mut self, now_ms: f64) -> bool {
        self.controller.tick(now_ms)
    }

    // ─── Drop & paste ────────────────────────────────────────────────────

    /// Content dropped at a screen position. `rich` is the HTML variant, or
    /// empty. Returns true if something was added or populated.
    pub fn handle_drop(&mut self, x: f64, y: f64, plain: &str, rich: &str) -> bool {
        self.controller.handle(&InputEvent::Drop {
            x,
            y,
            payload: payload(plain, rich),
        })
    }

    pub fn handle_paste(&mut self, plain: &str, rich: &str) -> bool {
        self.controller.handle(&InputEvent::Paste {
            payload: payload(plain, rich),
        })
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool, "action":"<action_name>", "tool":"<tool_name>"}`
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let outcome = self.controller.key(key, mods(shift, ctrl, alt, meta));
        serde_json::json!({
            "changed": outcome.changed,
            "action": outcome.action.map_or("none", |a| a.name()),
            "tool": self.controller.tool().name(),
        })
        .to_string()
    }

    /// Switch the active tool by name; unknown names select.
    pub fn set_tool(&mut self, name: &str) {
        self.controller
            .set_tool(ToolKind::from_name(name).unwrap_or(ToolKind::Select));
    }

    /// Get the current tool name.
    pub fn get_tool_name(&self) -> String {
        self.controller.tool().name().to_string()
    }

    /// The type double clicks on empty canvas create. Empty clears it.
    pub fn set_current_type(&mut self, type_name: &str) {
        let id = (!type_name.is_empty()).then(|| TypeId::intern(type_name));
        self.controller.session_mut().set_current_type(id);
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.controller.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.controller.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.controller.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.controller.can_redo()
    }

    pub fn set_label(&mut self, uid: &str, label: &str) -> bool {
        parse_uid(uid).is_some_and(|uid| self.controller.set_label(uid, label))
    }

    /// Set a node property. `value_json` is any JSON value; `kind` is a
    /// property type name such as `"text"` or `"url"`.
    pub fn set_property(&mut self, uid: &str, name: &str, value_json: &str, kind: &str) -> bool {
        let Some(uid) = parse_uid(uid) else {
            return false;
        };
        let value = match serde_json::from_str(value_json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("property {name}: bad value: {e}");
                return false;
            }
        };
        let kind = match serde_json::from_value::<PropertyType>(serde_json::Value::String(kind.to_string())) {
            Ok(k) => k,
            Err(e) => {
                log::warn!("property {name}: {e}");
                return false;
            }
        };
        self.controller.set_property(uid, name, value, kind)
    }

    pub fn switch_node_type(&mut self, uid: &str, type_name: &str) -> bool {
        parse_uid(uid).is_some_and(|uid| self.controller.switch_node_type(uid, TypeId::intern(type_name)))
    }

    /// Selected node uids as a JSON array of strings.
    pub fn get_selected_ids(&self) -> String {
        let ids: Vec<String> = self
            .controller
            .project()
            .selected_nodes()
            .iter()
            .map(ToString::to_string)
            .collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Drain pending notices as a JSON array of `{"level","message"}`.
    pub fn take_toasts(&mut self) -> String {
        let toasts = self.controller.take_toasts();
        serde_json::to_string(&toasts).unwrap_or_else(|_| "[]".to_string())
    }

    /// Structural diagnostics of the open project as JSON.
    pub fn check(&self) -> String {
        let diagnostics = self.controller.project().check();
        serde_json::to_string(&diagnostics).unwrap_or_else(|_| "[]".to_string())
    }
}

// ─── Platform glue ───────────────────────────────────────────────────────

fn now_ms() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64() * 1000.0)
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Sketchboard WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

fn console_logger_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_LOGGER: Once = Once::new();
        SET_LOGGER.call_once(|| {
            if let Err(e) = console_log::init_with_level(log::Level::Debug) {
                web_sys::console::warn_1(&format!("logger already set: {e}").into());
            }
        });
    }
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate project JSON. Returns `{"ok":true,"diagnostics":[...]}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(project_json: &str, palette_json: &str) -> String {
    let palette = if palette_json.trim().is_empty() {
        None
    } else {
        match Palette::from_json(palette_json) {
            Ok(p) => Some(p),
            Err(e) => return error_json(e),
        }
    };
    match Project::from_json(project_json, palette) {
        Ok(project) => {
            let mut diagnostics = project.diagnostics().to_vec();
            diagnostics.extend(project.check());
            serde_json::json!({ "ok": true, "diagnostics": diagnostics }).to_string()
        }
        Err(e) => error_json(e),
    }
}
