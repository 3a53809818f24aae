//! Integration tests: pointer, drop, click and keyboard handling through
//! the canvas controller.

use sk_core::{
    DropRules, Expansion, HandleLevel, NodeType, Palette, Point, Project, SketchConfig, TypeId,
    ViewBox,
};
use sk_editor::hooks::NodeContext;
use sk_editor::{
    CanvasController, InputEvent, Modifiers, Payload, ShortcutAction, ToastLevel, ToolKind,
    TypeBehavior,
};
use sk_render::kurbo::Rect;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn palette() -> Palette {
    let mut palette = Palette::new("default");
    let mut weblink = NodeType::new(TypeId::intern("weblink"), "Web");
    weblink.settings.can_handle = DropRules {
        prefixes: vec!["http".into()],
        ..DropRules::default()
    };
    let mut note = NodeType::new(TypeId::intern("note"), "General");
    note.position = 1;
    note.settings.can_handle.default_level = HandleLevel::None;
    palette.add_item(weblink).unwrap();
    palette.add_item(note).unwrap();
    palette
}

/// A project whose viewBox maps node-space 1:1 onto an 800×600 screen.
fn project() -> Project {
    let mut p = Project::new("P1", palette()).with_user("ada");
    p.set_view_box(ViewBox {
        left: 0.0,
        top: 0.0,
        width: 800.0,
        height: 600.0,
        zoom_factor: 1.0,
    });
    p
}

fn controller(p: Project) -> CanvasController {
    init_logger();
    CanvasController::new(p, Rect::new(0.0, 0.0, 800.0, 600.0), SketchConfig::default())
}

fn down(c: &mut CanvasController, x: f64, y: f64) -> bool {
    c.handle(&InputEvent::from_pointer_down(x, y, Modifiers::NONE))
}

fn move_to(c: &mut CanvasController, x: f64, y: f64) -> bool {
    c.handle(&InputEvent::from_pointer_move(x, y, Modifiers::NONE))
}

fn up(c: &mut CanvasController, x: f64, y: f64) -> bool {
    c.handle(&InputEvent::from_pointer_up(x, y, Modifiers::NONE))
}

fn drop_text(c: &mut CanvasController, x: f64, y: f64, text: &str) -> bool {
    c.handle(&InputEvent::Drop {
        x,
        y,
        payload: Payload::plain(text),
    })
}

// ─── Dragging ────────────────────────────────────────────────────────────

#[test]
fn node_drag_is_one_undo_step() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let mut c = controller(p);

    assert!(down(&mut c, 100.0, 100.0));
    move_to(&mut c, 120.0, 110.0);
    move_to(&mut c, 150.0, 120.0);
    up(&mut c, 150.0, 120.0);
    assert_eq!(c.project().node(a).unwrap().pos(), Point::new(150.0, 120.0));
    assert!(c.project().node(a).unwrap().is_selected());

    // The browser's click after a drag is not a click.
    c.click(0.0, 150.0, 120.0);
    assert!(!c.tick(1000.0));

    assert!(c.undo());
    assert_eq!(c.project().node(a).unwrap().pos(), Point::new(100.0, 100.0));
    assert!(!c.can_undo());
}

#[test]
fn press_without_release_still_records_history() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let mut c = controller(p);

    // The release of this drag happens outside the canvas and is lost.
    down(&mut c, 100.0, 100.0);
    move_to(&mut c, 130.0, 100.0);
    down(&mut c, 500.0, 500.0);
    up(&mut c, 500.0, 500.0);
    assert!(c.can_undo(), "cut-short drag was not recorded");

    let b = c
        .create_node_at(TypeId::intern("note"), sk_core::NodeMode::Empty, 300.0, 300.0)
        .unwrap();
    assert!(c.undo());
    assert!(c.project().node(b).is_none());
    assert!(c.undo());
    assert_eq!(c.project().node(a).unwrap().pos(), Point::new(100.0, 100.0));
}

#[test]
fn undo_mid_drag_closes_the_drag_first() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let mut c = controller(p);

    down(&mut c, 100.0, 100.0);
    move_to(&mut c, 140.0, 100.0);
    assert!(c.undo());
    assert_eq!(c.project().node(a).unwrap().pos(), Point::new(100.0, 100.0));
    assert!(c.session().drag().is_none());
    assert!(c.redo());
    assert_eq!(c.project().node(a).unwrap().pos(), Point::new(140.0, 100.0));
}

#[test]
fn background_drag_pans_and_persists_view() {
    let mut c = controller(project());
    down(&mut c, 400.0, 300.0);
    move_to(&mut c, 300.0, 250.0);
    up(&mut c, 300.0, 250.0);
    let vb = c.project().view_box();
    assert_eq!((vb.left, vb.top), (100.0, 50.0));
}

#[test]
fn wheel_zooms_around_cursor() {
    let mut c = controller(project());
    let before = c.viewport().screen_to_node(sk_render::kurbo::Point::new(200.0, 150.0));
    c.handle(&InputEvent::Wheel {
        x: 200.0,
        y: 150.0,
        delta_y: -120.0,
    });
    let vb = c.project().view_box();
    assert!(vb.zoom_factor < 1.0);
    let after = c.viewport().screen_to_node(sk_render::kurbo::Point::new(200.0, 150.0));
    assert!((before.x - after.x).abs() < 1e-9 && (before.y - after.y).abs() < 1e-9);
}

#[test]
fn anchor_drag_sets_bender_and_position() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let b = p.create_empty_node(TypeId::intern("note"), Point::new(300.0, 100.0));
    let l = p.add_full_link(Some(a), b).unwrap();
    let mut c = controller(p);

    assert!(down(&mut c, 200.0, 100.0));
    move_to(&mut c, 200.0, 140.0);
    up(&mut c, 200.0, 140.0);
    let link = c.project().link(l).unwrap();
    assert!((link.bender() - 4.0).abs() < 1e-9);
    assert!((link.anchor_pos() - 0.5).abs() < 1e-9);
    assert!(link.is_selected());

    assert!(c.undo());
    assert_eq!(c.project().link(l).unwrap().bender(), 0.0);
}

#[test]
fn marquee_selects_nodes_inside() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let b = p.create_empty_node(TypeId::intern("note"), Point::new(500.0, 500.0));
    let mut c = controller(p);

    c.handle(&InputEvent::from_pointer_down(10.0, 10.0, Modifiers::SHIFT));
    move_to(&mut c, 200.0, 200.0);
    assert!(c.render().contains("sk-marquee"));
    c.handle(&InputEvent::from_pointer_up(200.0, 200.0, Modifiers::SHIFT));
    assert_eq!(c.project().selected_nodes(), vec![a]);
    assert!(!c.project().node(b).unwrap().is_selected());
}

// ─── Link drawing ────────────────────────────────────────────────────────

#[test]
fn link_tool_draws_and_abandons_links() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let b = p.create_empty_node(TypeId::intern("note"), Point::new(300.0, 100.0));
    let mut c = controller(p);
    c.set_tool(ToolKind::Link);

    down(&mut c, 100.0, 100.0);
    assert!(c.session().is_drawing_link());
    move_to(&mut c, 300.0, 100.0);
    assert_eq!(c.session().link().unwrap().target, Some(b));
    assert!(c.render().contains("sk-link-draft"));
    up(&mut c, 300.0, 100.0);
    assert!(!c.session().is_drawing_link());
    assert_eq!(c.project().link_count(), 1);
    let link = c.project().list_outgoing_links(a)[0];
    assert_eq!(link.target(), b);

    // Released over empty canvas: nothing is added and the session is clean.
    down(&mut c, 100.0, 100.0);
    move_to(&mut c, 600.0, 500.0);
    up(&mut c, 600.0, 500.0);
    assert!(!c.session().is_drawing_link());
    assert_eq!(c.project().link_count(), 1);
    let toasts = c.take_toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].level, ToastLevel::Info);
}

#[test]
fn escape_abandons_link_in_progress() {
    let mut p = project();
    p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let mut c = controller(p);
    c.set_tool(ToolKind::Link);
    down(&mut c, 100.0, 100.0);
    assert!(c.session().is_drawing_link());
    c.dispatch_action(ShortcutAction::Deselect);
    assert!(!c.session().is_drawing_link());
    assert_eq!(c.project().link_count(), 0);
}

// ─── Drop & paste ────────────────────────────────────────────────────────

#[test]
fn drop_routes_to_empty_node_or_new_node_or_toast() {
    let mut p = project();
    let empty = p.create_empty_node(TypeId::intern("weblink"), Point::new(100.0, 100.0));
    let mut c = controller(p);

    // Onto an empty node whose type claims the payload.
    assert!(drop_text(&mut c, 100.0, 100.0, "https://example.org"));
    let node = c.project().node(empty).unwrap();
    assert!(node.is_full());
    assert_eq!(node.label(), "https://example.org");
    assert_eq!(c.project().node_count(), 1);

    // Onto empty canvas: a new full node of the claiming type.
    assert!(drop_text(&mut c, 400.0, 400.0, "https://rust-lang.org"));
    assert_eq!(c.project().node_count(), 2);
    let created = c.project().selected_nodes()[0];
    let node = c.project().node(created).unwrap();
    assert_eq!(node.type_name(), "weblink");
    assert_eq!(node.pos(), Point::new(400.0, 400.0));
    assert_eq!(c.elements().view(created).unwrap().label, "https://rust-lang.org");

    // Nothing claims plain prose.
    assert!(!drop_text(&mut c, 600.0, 100.0, "just words"));
    assert_eq!(c.project().node_count(), 2);
    let toasts = c.take_toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].level, ToastLevel::Warning);
}

#[test]
fn paste_fills_the_selected_empty_node() {
    let mut p = project();
    let empty = p.create_empty_node(TypeId::intern("weblink"), Point::new(100.0, 100.0));
    p.edit_node(empty, |n| n.set_selected(true));
    let mut c = controller(p);
    assert!(c.handle(&InputEvent::Paste {
        payload: Payload::plain("http://example.org/a"),
    }));
    assert!(c.project().node(empty).unwrap().is_full());
    assert_eq!(c.project().node_count(), 1);
}

#[test]
fn read_only_project_refuses_edits() {
    let mut file = project().to_file();
    file.read_only = true;
    let mut c = controller(Project::from_file(file, Some(palette())));
    assert!(!drop_text(&mut c, 100.0, 100.0, "https://example.org"));
    assert_eq!(c.project().node_count(), 0);
    assert_eq!(c.take_toasts()[0].level, ToastLevel::Warning);
}

#[test]
fn read_only_notice_is_shown_once() {
    let mut p = project();
    p.create_full_node(TypeId::intern("note"), Point::new(100.0, 100.0), "A");
    let mut file = p.to_file();
    file.read_only = true;
    let mut c = controller(Project::from_file(file, Some(palette())));

    for t in [0.0, 1000.0, 2000.0] {
        c.click(t, 100.0, 100.0);
        assert!(!c.tick(t + 500.0));
    }
    assert!(!drop_text(&mut c, 100.0, 100.0, "https://example.org"));
    assert_eq!(c.take_toasts().len(), 1);
}

// ─── Clicks ──────────────────────────────────────────────────────────────

#[test]
fn single_click_cycles_detail_after_delay() {
    let mut p = project();
    let a = p.create_full_node(TypeId::intern("note"), Point::new(100.0, 100.0), "A");
    p.edit_node(a, |n| n.set_normal_property("role", "pilot"));
    let mut c = controller(p);

    c.click(0.0, 100.0, 100.0);
    assert!(!c.tick(100.0));
    assert!(c.tick(300.0));
    assert_eq!(c.project().node(a).unwrap().expansion(), Expansion::Table);
    assert!(c.render().contains("sk-properties"));
}

#[test]
fn double_click_preempts_single_clicks() {
    let mut p = project();
    let a = p.create_full_node(TypeId::intern("note"), Point::new(100.0, 100.0), "A");
    p.edit_node(a, |n| n.set_normal_property("role", "pilot"));
    let mut c = controller(p);

    c.click(0.0, 100.0, 100.0);
    c.click(80.0, 100.0, 100.0);
    assert!(c.double_click(100.0, 100.0));
    assert_eq!(c.project().node(a).unwrap().expansion(), Expansion::Custom);
    assert!(!c.tick(1000.0));
    assert_eq!(c.project().node(a).unwrap().expansion(), Expansion::Custom);
}

#[test]
fn expanding_node_without_detail_collapses() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let mut c = controller(p);
    c.click(0.0, 100.0, 100.0);
    c.tick(1000.0);
    assert_eq!(c.project().node(a).unwrap().expansion(), Expansion::Collapsed);
}

#[test]
fn double_click_on_canvas_creates_empty_node() {
    let mut c = controller(project());
    c.session_mut().set_current_type(Some(TypeId::intern("note")));
    assert!(c.double_click(250.0, 250.0));
    let node = c.project().nodes().next().unwrap();
    assert!(node.is_empty());
    assert_eq!(node.type_name(), "note");
    assert_eq!(node.pos(), Point::new(250.0, 250.0));
}

// ─── Keyboard & behaviors ────────────────────────────────────────────────

#[test]
fn delete_key_removes_selection_and_undo_restores_it() {
    let mut p = project();
    let a = p.create_empty_node(TypeId::intern("note"), Point::new(100.0, 100.0));
    let b = p.create_empty_node(TypeId::intern("note"), Point::new(300.0, 100.0));
    p.add_full_link(Some(a), b).unwrap();
    let mut c = controller(p);

    down(&mut c, 100.0, 100.0);
    up(&mut c, 100.0, 100.0);
    let outcome = c.key("Delete", Modifiers::NONE);
    assert_eq!(outcome.action, Some(ShortcutAction::Delete));
    assert!(outcome.changed);
    assert!(c.project().node(a).is_none());
    assert_eq!(c.project().link_count(), 0);

    let undo = c.key(
        "z",
        Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        },
    );
    assert!(undo.changed);
    assert!(c.project().node(a).is_some());
    assert_eq!(c.project().link_count(), 1);
    assert!(c.render().contains(&format!("data-uid=\"{a}\"")));
}

#[test]
fn tab_is_not_bound() {
    let mut c = controller(project());
    c.key("l", Modifiers::NONE);
    let outcome = c.key("Tab", Modifiers::NONE);
    assert_eq!(outcome.action, None);
    assert_eq!(c.tool(), ToolKind::Link);
}

struct Starred;

impl TypeBehavior for Starred {
    fn icon(&self, _ctx: &NodeContext<'_>) -> String {
        "icons/star.svg".into()
    }

    fn label_text(&self, ctx: &NodeContext<'_>) -> String {
        format!("★ {}", ctx.node().map(|n| n.label()).unwrap_or_default())
    }
}

#[test]
fn registered_behavior_applies_to_existing_nodes() {
    let mut p = project();
    let a = p.create_full_node(TypeId::intern("note"), Point::new(100.0, 100.0), "Idea");
    let mut c = controller(p);
    assert_eq!(c.elements().view(a).unwrap().label, "Idea");

    c.register_behavior(TypeId::intern("note"), Starred);
    let view = c.elements().view(a).unwrap();
    assert_eq!(view.icon, "icons/star.svg");
    assert_eq!(view.label, "★ Idea");

    // Label text follows data edits.
    assert!(c.set_label(a, "Plan"));
    assert_eq!(c.elements().view(a).unwrap().label, "★ Plan");
    assert!(c.render().contains("★ Plan"));
}
