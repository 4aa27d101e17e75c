//! Integration tests for mesh nodes.
//!
//! These tests drive [`MeshNode`] through its public API only and observe the
//! results through events, the bound geometry and a [`HeadlessContext`].
//!
//! # Test Categories
//!
//! - **Derivation Tests**: normals and palette colors on freshly bound geometry
//! - **Change Routing Tests**: structural, derived, render-mode and ignored writes
//! - **Model Tests**: pending model resolution and failure
//! - **Event Tests**: listener-count driven hook attachment
//! - **Lifecycle Tests**: cloning and disposal

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rstest::rstest;

use mesh_node::body::HookKind;
use mesh_node::geometry::{COLOR, NORMAL, POSITION};
use mesh_node::{
    property, AttributeDescription, BinderState, ChangeClass, DrawMode, HeadlessContext,
    MeshError, MeshEvent, MeshEventKind, MeshNode, MeshShape, NodeDescriptor, PendingModel,
    Program, RenderInfo, RenderableBody,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn program(context: &Arc<HeadlessContext>, attributes: &[&str]) -> Arc<Program> {
    Arc::new(Program::new(context.clone(), attributes.iter().copied()))
}

fn single_triangle() -> AttributeDescription {
    AttributeDescription::new().with_attribute(
        POSITION,
        3,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    )
}

fn vertices(count: usize) -> AttributeDescription {
    let positions = (0..count * 3).map(|i| i as f32).collect();
    AttributeDescription::new().with_attribute(POSITION, 3, positions)
}

fn cube(context: &Arc<HeadlessContext>) -> MeshNode {
    MeshNode::with_program(
        program(context, &["position", "normal", "color"]),
        NodeDescriptor::new().with_shape(MeshShape::Box),
    )
    .unwrap()
}

/// Records every `updatemesh` event a node dispatches.
fn record_updates(
    node: &MeshNode,
) -> Arc<Mutex<Vec<(Option<Arc<RenderableBody>>, Option<Arc<RenderableBody>>)>>> {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();
    node.add_event_listener(MeshEventKind::UpdateMesh, move |event: &MeshEvent| {
        if let MeshEvent::UpdateMesh { old_body, new_body } = event {
            sink.lock().unwrap().push((old_body.clone(), new_body.clone()));
        }
    });
    updates
}

// ============================================================================
// Derivation Tests
// ============================================================================

/// A single counter-clockwise triangle in the XY plane gets +Z normals on all
/// three vertices.
#[test]
fn test_single_triangle_normal() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let node = MeshNode::with_program(
        program(&context, &["position", "normal"]),
        NodeDescriptor::new().with_model(single_triangle()),
    )
    .unwrap();

    let geometry = node.geometry().unwrap().read();
    let normals = geometry.attribute(NORMAL).unwrap();
    assert_eq!(normals.size, 3);
    assert_eq!(normals.data, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
}

/// A normal attribute supplied with the model is never overwritten.
#[test]
fn test_supplied_normals_kept() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let model = single_triangle().with_attribute(NORMAL, 3, vec![1.0, 0.0, 0.0].repeat(3));
    let node = MeshNode::with_program(
        program(&context, &["position", "normal"]),
        NodeDescriptor::new().with_model(model),
    )
    .unwrap();

    let geometry = node.geometry().unwrap().read();
    assert_eq!(&geometry.attribute(NORMAL).unwrap().data[0..3], &[1.0, 0.0, 0.0]);
}

/// Palette [red, green] with divisor 2 over 4 vertices bands as
/// red, red, green, green.
#[test]
fn test_palette_banding() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let red = [1.0f32, 0.0, 0.0, 1.0];
    let green = [0.0f32, 1.0, 0.0, 1.0];
    let node = MeshNode::with_program(
        program(&context, &["position", "color"]),
        NodeDescriptor::new()
            .with_model(vertices(4))
            .with_attribute(property::COLORS, [red, green].concat())
            .with_attribute(property::COLOR_DIVISOR, 2i64),
    )
    .unwrap();

    let geometry = node.geometry().unwrap().read();
    let colors = geometry.attribute(COLOR).unwrap();
    assert_eq!(colors.size, 4);
    assert_eq!(colors.data, [red, red, green, green].concat());
}

/// Vertex `i` takes palette entry `(i / divisor) % entries`.
#[rstest]
#[case::one_per_vertex(1, 3)]
#[case::one_per_triangle(3, 3)]
#[case::longer_than_buffer(16, 2)]
fn test_palette_index_formula(#[case] divisor: i64, #[case] entries: usize) {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let palette: Vec<f32> = (0..entries * 4).map(|i| (i / 4) as f32).collect();
    let node = MeshNode::with_program(
        program(&context, &["position", "color"]),
        NodeDescriptor::new()
            .with_model(vertices(9))
            .with_attribute(property::COLORS, palette)
            .with_attribute(property::COLOR_DIVISOR, divisor),
    )
    .unwrap();

    let geometry = node.geometry().unwrap().read();
    let colors = &geometry.attribute(COLOR).unwrap().data;
    for (i, color) in colors.chunks(4).enumerate() {
        let expected = ((i / divisor as usize) % entries) as f32;
        assert_eq!(color, &[expected; 4], "vertex {i}");
    }
}

/// Invalid palettes and divisors are rejected at construction.
#[rstest]
#[case::zero_divisor(vec![1.0, 1.0, 1.0, 1.0], 0)]
#[case::negative_divisor(vec![1.0, 1.0, 1.0, 1.0], -2)]
#[case::empty_palette(vec![], 1)]
#[case::partial_entry(vec![1.0, 1.0, 1.0], 1)]
fn test_invalid_color_inputs(#[case] palette: Vec<f32>, #[case] divisor: i64) {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let result = MeshNode::with_program(
        program(&context, &["position", "color"]),
        NodeDescriptor::new()
            .with_model(vertices(3))
            .with_attribute(property::COLORS, palette)
            .with_attribute(property::COLOR_DIVISOR, divisor),
    );
    assert!(matches!(result, Err(MeshError::InvalidAttribute { .. })));
}

/// A program shared by two nodes registers the color computer once and both
/// nodes derive colors from their own palettes.
#[test]
fn test_shared_program() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let shared = program(&context, &["position", "color"]);
    let make = |palette: Vec<f32>| {
        MeshNode::with_program(
            shared.clone(),
            NodeDescriptor::new()
                .with_model(vertices(3))
                .with_attribute(property::COLORS, palette),
        )
        .unwrap()
    };
    let a = make(vec![1.0, 0.0, 0.0, 1.0]);
    let b = make(vec![0.0, 0.0, 1.0, 1.0]);

    assert_eq!(shared.extra_attributes().len(), 1);
    assert_eq!(a.geometry().unwrap().read().attribute(COLOR).unwrap().data[2], 0.0);
    assert_eq!(b.geometry().unwrap().read().attribute(COLOR).unwrap().data[2], 1.0);
}

// ============================================================================
// Change Routing Tests
// ============================================================================

/// Changing a structural property fires exactly one `updatemesh` and swaps
/// the body; writing the same value again does nothing.
#[rstest]
#[case::width(property::WIDTH, 2.0f32.into())]
#[case::depth(property::DEPTH, 0.5f32.into())]
#[case::segments(property::HEIGHT_SEGMENTS, 4i64.into())]
fn test_structural_change(#[case] key: &str, #[case] value: mesh_node::AttributeValue) {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    let updates = record_updates(&node);
    let first = node.body().unwrap().clone();

    assert_eq!(node.set_attribute(key, value.clone()).unwrap(), ChangeClass::Structural);
    {
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        let (old, new) = &updates[0];
        assert!(Arc::ptr_eq(old.as_ref().unwrap(), &first));
        assert!(!Arc::ptr_eq(new.as_ref().unwrap(), &first));
        assert!(Arc::ptr_eq(new.as_ref().unwrap(), node.body().unwrap()));
    }

    assert_eq!(node.set_attribute(key, value).unwrap(), ChangeClass::Ignored);
    assert_eq!(updates.lock().unwrap().len(), 1);
}

/// Rewriting a default in the other numeric form is not a change.
#[test]
fn test_equal_numeric_forms_are_ignored() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    let updates = record_updates(&node);
    let first = node.body().unwrap().clone();

    assert_eq!(node.set_attribute(property::WIDTH, 1i64).unwrap(), ChangeClass::Ignored);
    assert_eq!(
        node.set_attribute(property::WIDTH_SEGMENTS, 1.0f32).unwrap(),
        ChangeClass::Ignored
    );
    assert_eq!(
        node.set_attribute(property::COLOR_DIVISOR, 3.0f32).unwrap(),
        ChangeClass::Ignored
    );

    assert!(updates.lock().unwrap().is_empty());
    assert!(Arc::ptr_eq(node.body().unwrap(), &first));
    assert!(node.attributes().changed().is_empty());
}

/// Segment counts change the generated vertex count.
#[test]
fn test_segments_regenerate_geometry() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    assert_eq!(node.geometry().unwrap().read().vertex_count(), Some(24));

    node.set_attribute(property::WIDTH_SEGMENTS, 2i64).unwrap();
    // Four faces span X and each gains a column of two vertices.
    assert_eq!(node.geometry().unwrap().read().vertex_count(), Some(32));
}

/// A palette change rewrites the existing color buffer in place and
/// re-uploads it on the next draw.
#[test]
fn test_palette_change_in_place() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    let updates = record_updates(&node);
    let body = node.body().unwrap().clone();
    let buffer = node.geometry().unwrap().read().attribute(COLOR).unwrap().data.as_ptr();

    body.draw(&RenderInfo::default());
    context.clear();
    body.draw(&RenderInfo::default());
    assert!(context.uploads().is_empty());

    let class = node
        .set_attribute(property::COLORS, vec![0.0f32, 0.0, 1.0, 1.0])
        .unwrap();
    assert_eq!(class, ChangeClass::Derived { attribute: COLOR });
    assert!(updates.lock().unwrap().is_empty());
    assert!(Arc::ptr_eq(&body, node.body().unwrap()));
    assert_eq!(
        node.geometry().unwrap().read().attribute(COLOR).unwrap().data.as_ptr(),
        buffer
    );

    body.draw(&RenderInfo::default());
    let uploads = context.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].name, COLOR);
    assert_eq!(uploads[0].byte_len, 24 * 4 * 4);
}

/// Derived properties are a no-op when the program does not consume color.
#[test]
fn test_palette_change_without_color_program() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = MeshNode::with_program(
        program(&context, &["position"]),
        NodeDescriptor::new().with_model(vertices(3)),
    )
    .unwrap();

    node.set_attribute(property::COLOR_DIVISOR, 1i64).unwrap();
    assert!(!node.geometry().unwrap().read().has_attribute(COLOR));
}

/// The draw mode changes on the existing body and reaches the backend.
#[rstest]
#[case::by_value(DrawMode::Lines.into(), DrawMode::Lines, 0x0001)]
#[case::by_name("triangle_strip".into(), DrawMode::TriangleStrip, 0x0005)]
fn test_mode_change(
    #[case] value: mesh_node::AttributeValue,
    #[case] expected: DrawMode,
    #[case] constant: u32,
) {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    let updates = record_updates(&node);
    let body = node.body().unwrap().clone();

    assert_eq!(node.set_attribute(property::MODE, value).unwrap(), ChangeClass::RenderMode);
    assert!(updates.lock().unwrap().is_empty());
    assert!(Arc::ptr_eq(&body, node.body().unwrap()));
    assert_eq!(body.mode(), expected);

    body.draw(&RenderInfo::default());
    assert_eq!(context.draws().last().unwrap().mode, constant);
}

/// An unknown mode name is rejected and the mode is unchanged.
#[test]
fn test_unknown_mode_rejected() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    assert!(node.set_attribute(property::MODE, "WIREFRAME").is_err());
    assert_eq!(node.mode(), DrawMode::Triangles);
}

// ============================================================================
// Model Tests
// ============================================================================

/// A pending model leaves the node without geometry until it resolves, then
/// fires exactly one `updatemesh`.
#[test]
fn test_pending_model_resolution() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let (resolver, pending) = PendingModel::channel();
    let mut node = MeshNode::with_program(
        program(&context, &["position", "normal"]),
        NodeDescriptor::new().with_model(pending),
    )
    .unwrap();
    let updates = record_updates(&node);

    assert!(node.geometry().is_none());
    assert!(node.is_model_pending());
    assert_eq!(node.state(), BinderState::BoundNoGeometry);
    assert!(node.poll_model().is_none());

    let loader = thread::spawn(move || resolver.resolve(single_triangle()));
    assert!(loader.join().unwrap());

    assert!(matches!(node.poll_model(), Some(Ok(()))));
    assert!(node.geometry().is_some());
    assert_eq!(node.state(), BinderState::Bound);
    assert_eq!(updates.lock().unwrap().len(), 1);

    assert!(node.poll_model().is_none());
    assert_eq!(updates.lock().unwrap().len(), 1);
}

/// A failed or abandoned resolution is reported once and leaves the node
/// without geometry.
#[rstest]
#[case::failed(true)]
#[case::dropped(false)]
fn test_pending_model_failure(#[case] send_failure: bool) {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let (resolver, pending) = PendingModel::channel();
    let mut node = MeshNode::with_program(
        program(&context, &["position"]),
        NodeDescriptor::new().with_model(pending),
    )
    .unwrap();
    let updates = record_updates(&node);

    if send_failure {
        assert!(resolver.fail("file not found"));
    } else {
        drop(resolver);
    }

    assert!(matches!(node.poll_model(), Some(Err(MeshError::ModelResolution(_)))));
    assert!(node.poll_model().is_none());
    assert_eq!(node.state(), BinderState::BoundNoGeometry);
    assert!(updates.lock().unwrap().is_empty());
}

/// Resolving after disposal is a no-op.
#[test]
fn test_resolution_after_dispose() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let (resolver, pending) = PendingModel::channel();
    let mut node = MeshNode::with_program(
        program(&context, &["position"]),
        NodeDescriptor::new().with_model(pending),
    )
    .unwrap();

    node.dispose();
    assert!(!resolver.resolve(single_triangle()));
    assert!(node.poll_model().is_none());
    assert!(node.geometry().is_none());
}

/// Construction without a program fails.
#[test]
fn test_missing_program() {
    init_logger();
    let result = MeshNode::new(NodeDescriptor::new().with_model(single_triangle()));
    assert!(matches!(result, Err(MeshError::MissingProgram)));
}

// ============================================================================
// Event Tests
// ============================================================================

/// Render hooks are attached on the first listener and detached with the
/// last; intermediate changes leave the body alone.
#[test]
fn test_render_hook_reference_counting() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let node = cube(&context);
    let body = node.body().unwrap().clone();
    let calls = Arc::new(AtomicUsize::new(0));

    let listen = || {
        let calls = calls.clone();
        node.add_event_listener(MeshEventKind::BeforeRender, move |_: &MeshEvent| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };

    body.draw(&RenderInfo::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let first = listen();
    let second = listen();
    body.draw(&RenderInfo::default());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    node.remove_event_listener(MeshEventKind::BeforeRender, first);
    body.draw(&RenderInfo::default());
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    node.remove_event_listener(MeshEventKind::BeforeRender, second);
    body.draw(&RenderInfo::default());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Before-render runs before the draw call and after-render after it, each
/// with the frame info passed to `draw`.
#[test]
fn test_render_event_order() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let node = cube(&context);
    let log = Arc::new(Mutex::new(Vec::new()));

    for kind in [MeshEventKind::BeforeRender, MeshEventKind::AfterRender] {
        let log = log.clone();
        let context = context.clone();
        node.add_event_listener(kind, move |event: &MeshEvent| {
            let frame = match event {
                MeshEvent::BeforeRender(info) | MeshEvent::AfterRender(info) => info.frame,
                MeshEvent::UpdateMesh { .. } => unreachable!(),
            };
            log.lock()
                .unwrap()
                .push((event.kind(), frame, context.draws().len()));
        });
    }

    node.body().unwrap().draw(&RenderInfo {
        frame: 7,
        delta_time: 0.016,
    });
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            (MeshEventKind::BeforeRender, 7, 0),
            (MeshEventKind::AfterRender, 7, 1),
        ]
    );
}

/// `remove_all_listeners` detaches the hook even though the count drops in
/// one step.
#[test]
fn test_remove_all_listeners() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let node = cube(&context);
    for _ in 0..3 {
        node.add_event_listener(MeshEventKind::AfterRender, |_: &MeshEvent| {});
    }
    let body = node.body().unwrap().clone();

    assert_eq!(node.remove_all_listeners(MeshEventKind::AfterRender), 3);
    assert_eq!(node.listener_count(MeshEventKind::AfterRender), 0);
    assert_eq!(body.hook_count(HookKind::AfterRender), 0);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

/// A deep clone of a node with two children has two independent children.
#[test]
fn test_deep_clone_independent() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut parent = cube(&context);
    parent.set_attribute(property::WIDTH, 3.0f32).unwrap();
    for depth in [2.0f32, 5.0] {
        let mut child = cube(&context);
        child.set_attribute(property::DEPTH, depth).unwrap();
        parent.append_child(child);
    }

    let mut clone = parent.clone_node(true).unwrap();
    assert_eq!(clone.children().len(), 2);
    assert_eq!(clone.attributes().number(property::WIDTH), Some(3.0));
    assert_eq!(clone.children()[1].attributes().number(property::DEPTH), Some(5.0));
    assert_eq!(clone.meshes().len(), 3);

    clone.children_mut()[0]
        .set_attribute(property::DEPTH, 9.0f32)
        .unwrap();
    clone.children_mut()[1]
        .set_attribute(property::COLORS, vec![0.0f32, 1.0, 0.0, 1.0])
        .unwrap();

    let original = &parent.children()[0];
    assert_eq!(original.attributes().number(property::DEPTH), Some(2.0));
    let geometry = parent.children()[1].geometry().unwrap().read();
    assert_eq!(&geometry.attribute(COLOR).unwrap().data[0..4], &[0.5, 0.5, 0.5, 1.0]);
}

/// A clone of a mesh node copies the resolved model, not the shared buffer.
#[test]
fn test_clone_detaches_model() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = MeshNode::with_program(
        program(&context, &["position", "color"]),
        NodeDescriptor::new().with_model(vertices(3)),
    )
    .unwrap();
    let mut clone = node.clone_node(false).unwrap();

    clone
        .set_attribute(property::COLORS, vec![1.0f32, 0.0, 0.0, 1.0])
        .unwrap();
    node.set_attribute(property::COLORS, vec![0.0f32, 0.0, 1.0, 1.0])
        .unwrap();

    let ours = node.geometry().unwrap().read().attribute(COLOR).unwrap().data.clone();
    let theirs = clone.geometry().unwrap().read().attribute(COLOR).unwrap().data.clone();
    assert_eq!(&ours[0..4], &[0.0, 0.0, 1.0, 1.0]);
    assert_eq!(&theirs[0..4], &[1.0, 0.0, 0.0, 1.0]);
}

/// Disposal detaches hooks and rejects further writes.
#[test]
fn test_dispose() {
    init_logger();
    let context = Arc::new(HeadlessContext::new());
    let mut node = cube(&context);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    node.add_event_listener(MeshEventKind::BeforeRender, move |_: &MeshEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let body = node.body().unwrap().clone();

    node.dispose();
    body.draw(&RenderInfo::default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(node.body().is_none());
    assert!(matches!(node.update_mesh(), Err(MeshError::Disposed)));
    assert!(matches!(node.clone_node(false), Err(MeshError::Disposed)));
}
