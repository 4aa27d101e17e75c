//! Headless demo of a reactive cube node
//!
//! Run with:
//!   cargo run --example cube_demo
//!   cargo run --example cube_demo -- --frames 5 --width 2 --mode lines
//!   RUST_LOG=debug cargo run --example cube_demo -- --pending
//!
//! Builds a box node bound to a program consuming `position`, `normal` and
//! `color`, registers listeners, changes a few properties and draws the body
//! through a recording context.

use std::sync::Arc;
use std::thread;

use clap::Parser;
use mesh_node::{
    property, DrawMode, HeadlessContext, MeshEvent, MeshEventKind, MeshNode, MeshShape,
    NodeDescriptor, PendingModel, Program, RenderInfo,
};

#[derive(Parser, Debug)]
#[command(
    name = "cube_demo",
    about = "Drive a mesh node through property changes and headless draws",
    version
)]
struct Args {
    /// Number of frames to draw after the property changes.
    #[arg(long, default_value = "3")]
    frames: u64,

    /// Box width applied after construction.
    #[arg(long, default_value = "2.0")]
    width: f32,

    /// Segments along each axis.
    #[arg(long, default_value = "1")]
    segments: i64,

    /// Draw mode (GL name, case-insensitive).
    #[arg(long, default_value = "triangles")]
    mode: DrawMode,

    /// Also load a triangle mesh from a background thread.
    #[arg(long)]
    pending: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let context = Arc::new(HeadlessContext::new());
    let program = Arc::new(
        Program::new(context.clone(), ["position", "normal", "color"]).with_label("lit-color"),
    );

    let descriptor = NodeDescriptor::new()
        .with_shape(MeshShape::Box)
        .with_attribute(property::WIDTH_SEGMENTS, args.segments)
        .with_attribute(property::HEIGHT_SEGMENTS, args.segments)
        .with_attribute(property::DEPTH_SEGMENTS, args.segments)
        .with_attribute(
            property::COLORS,
            vec![1.0f32, 0.2, 0.2, 1.0, 0.2, 1.0, 0.2, 1.0, 0.2, 0.2, 1.0, 1.0],
        );

    let mut cube = match MeshNode::with_program(program.clone(), descriptor) {
        Ok(node) => node,
        Err(e) => {
            eprintln!("Failed to create cube: {}", e);
            return;
        }
    };

    cube.add_event_listener(MeshEventKind::UpdateMesh, |event: &MeshEvent| {
        if let MeshEvent::UpdateMesh { old_body, new_body } = event {
            println!(
                "updatemesh: body {:?} -> {:?}",
                old_body.as_ref().map(|b| b.id()),
                new_body.as_ref().map(|b| b.id())
            );
        }
    });
    cube.add_event_listener(MeshEventKind::AfterRender, |event: &MeshEvent| {
        if let MeshEvent::AfterRender(info) = event {
            println!("afterrender: frame {}", info.frame);
        }
    });

    let changes: [(&str, mesh_node::AttributeValue); 4] = [
        (property::WIDTH, args.width.into()),
        (property::WIDTH, args.width.into()),
        (property::COLOR_DIVISOR, 6i64.into()),
        (property::MODE, args.mode.into()),
    ];
    for (key, value) in changes {
        match cube.set_attribute(key, value) {
            Ok(class) => println!("{} -> {:?}", key, class),
            Err(e) => eprintln!("{} rejected: {}", key, e),
        }
    }

    if args.pending {
        let (resolver, pending) = PendingModel::channel();
        let mut mesh = match MeshNode::with_program(
            program.clone(),
            NodeDescriptor::new().with_model(pending),
        ) {
            Ok(node) => node,
            Err(e) => {
                eprintln!("Failed to create mesh: {}", e);
                return;
            }
        };
        println!("mesh state before resolution: {:?}", mesh.state());

        let loader = thread::spawn(move || {
            let triangle = mesh_node::AttributeDescription::new().with_attribute(
                "position",
                3,
                vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            );
            resolver.resolve(triangle)
        });
        if loader.join().unwrap_or(false) {
            if let Some(Err(e)) = mesh.poll_model() {
                eprintln!("Model resolution failed: {}", e);
            }
        }
        println!("mesh state after resolution: {:?}", mesh.state());
        cube.append_child(mesh);
    }

    for frame in 0..args.frames {
        let info = RenderInfo {
            frame,
            delta_time: 1.0 / 60.0,
        };
        for body in cube.meshes() {
            body.draw(&info);
        }
    }

    println!();
    println!("Uploads:");
    for upload in context.uploads() {
        println!("  {:<10} {} bytes", upload.name, upload.byte_len);
    }
    println!("Draw calls: {}", context.draws().len());

    cube.dispose();
}
