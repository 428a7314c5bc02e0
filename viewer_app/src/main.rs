//! Headless viewer demo
//!
//! Runs a visualization session without a GPU: a simulated robot publishes
//! transforms from a feed thread while the main thread replays a short
//! gesture script and renders into a recording context.
//!
//! Usage: `headless_viewer [config.toml|config.ron]`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use vis_engine::config::ConfigError;
use vis_engine::foundation::logging;
use vis_engine::prelude::*;
use vis_engine::render::lock_selection;

const FRAME_COUNT: u32 = 120;
const FRAME_PERIOD: Duration = Duration::from_millis(16);
const SURFACE: (u32, u32) = (800, 600);

/// Demo errors
#[derive(Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error("Could not start thread: {0}")]
    Thread(#[from] std::io::Error),
}

fn load_config() -> Result<ViewerConfig, AppError> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ViewerConfig::load_from_file(&path)?),
        None => Ok(ViewerConfig::default()),
    }
}

/// Robot driving a circle around the odometry origin, with a laser on top
fn robot_transforms(step: u32) -> Vec<StampedTransform> {
    let t = step as f32 * FRAME_PERIOD.as_secs_f32();
    let heading = t * 0.5;
    let position = Vec3::new(2.0 * heading.cos(), 2.0 * heading.sin(), 0.0);
    let rotation = Quat::from_axis_angle(&Vec3::z_axis(), heading + std::f32::consts::FRAC_PI_2);
    let stamp = f64::from(t);
    vec![
        StampedTransform::new("/world", "/odom", RigidTransform::identity(), stamp),
        StampedTransform::new("/odom", "/base_link", RigidTransform::new(position, rotation), stamp),
        StampedTransform::new(
            "/base_link",
            "/laser",
            RigidTransform::from_translation(Vec3::new(0.2, 0.0, 0.3)),
            stamp,
        ),
    ]
}

fn spawn_robot(feed: TransformFeed) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("robot-sim".to_string()).spawn(move || {
        for step in 0..FRAME_COUNT {
            if !feed.publish(robot_transforms(step)) {
                log::warn!("Transform listener went away");
                return;
            }
            thread::sleep(FRAME_PERIOD);
        }
    })
}

fn scripted_gestures(frame: u32) -> Vec<TouchEvent> {
    let (width, height) = SURFACE;
    let center = (width as f32 / 2.0, height as f32 / 2.0);
    match frame {
        10..=19 => vec![TouchEvent::Scroll { distance_x: 8.0, distance_y: -2.0 }],
        25 => vec![TouchEvent::Fling { velocity_x: -1500.0, velocity_y: 0.0 }],
        50 => vec![
            TouchEvent::ScaleBegin { focus_x: center.0, focus_y: center.1 },
            TouchEvent::Scale { focus_x: center.0 - 20.0, focus_y: center.1, scale_factor: 1.5 },
            TouchEvent::ScaleEnd,
        ],
        60 => vec![TouchEvent::LongPress { x: (width / 2) as i32, y: (height / 2) as i32 }],
        _ => Vec::new(),
    }
}

fn run(config: ViewerConfig) -> Result<(), AppError> {
    let tree = Arc::new(FrameTransformTree::new());
    let (feed, listener) = TransformListener::spawn(Arc::clone(&tree))?;
    let robot = spawn_robot(feed)?;

    let mut view = VisualizationView::with_tree(config, tree)?;
    view.add_default_layers();
    view.add_layer(Box::new(AxisLayer::new(Some(FrameId::new("base_link"))).with_scale(0.5)));
    view.add_layer(Box::new(AxisLayer::new(Some(FrameId::new("laser"))).with_scale(0.2)));
    if let Err(e) = view.start() {
        log::warn!("Some layers did not start: {}", e);
    }

    let (width, height) = SURFACE;
    let mut gl = RecordingContext::new(Viewport::new(width, height));
    view.on_surface_created(&mut gl);
    view.on_surface_changed(&mut gl, Viewport::new(width, height));

    let camera = view.camera_handle();
    for frame in 0..FRAME_COUNT {
        match frame {
            70 => {
                log::info!("Locking camera onto /base_link");
                camera.set_target_frame(Some(FrameId::new("base_link")));
            }
            100 => {
                log::info!("Releasing camera lock");
                camera.set_target_frame(None);
            }
            _ => {}
        }
        for event in scripted_gestures(frame) {
            if !view.on_touch_event(&event) {
                log::debug!("Unhandled gesture {:?}", event);
            }
        }

        let stats = view.render_frame(&mut gl)?;
        if stats.selection_pass {
            match lock_selection(view.selection()).selected_info() {
                Some(info) => log::info!("Picked {:?}", info),
                None => log::info!("Nothing under the pick point"),
            }
        }
        if stats.gl_error.is_some() || stats.layers_failed > 0 || frame % 30 == 0 {
            log::info!(
                "Frame {}: {} drawn, {} unresolved, {} failed, {} draw calls, camera at {:?}",
                frame,
                stats.layers_drawn,
                stats.layers_unresolved,
                stats.layers_failed,
                gl.calls().len(),
                view.camera().camera().as_slice(),
            );
        }
        thread::sleep(FRAME_PERIOD);
    }

    view.shutdown();
    if robot.join().is_err() {
        log::error!("Robot simulation thread panicked");
    }
    let messages = listener.join();
    log::info!("Transform listener applied {} messages", messages);
    Ok(())
}

fn main() -> Result<(), AppError> {
    let config = load_config()?;
    logging::init_with_level(&config.logging.level);

    log::info!("Starting headless viewer");
    run(config)?;
    log::info!("Headless viewer finished");
    Ok(())
}
