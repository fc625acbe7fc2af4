use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use tracing::{info, warn};

use scope_sim::{
    load_sim_config_from_env, BlockModelCatalog, ColorMap, Layout, MetricKind, OverlayState,
    PresetCatalog, SceneCache, SimulationDriver, SnapshotCache, ViewMode2D, WorkflowKind,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_sim_config_from_env();
    let presets = PresetCatalog::builtin();
    let layout = presets
        .get(&config.preset)
        .unwrap_or_else(|| Layout::from_spec("Compact", 3, 4, 32));

    let mut driver = SimulationDriver::new(layout, &config);
    let mut scene = SceneCache::new(&config);
    let mut snapshot = SnapshotCache::new();
    let mut overlay = OverlayState::default();
    let catalog = BlockModelCatalog::new();

    let command_rx = spawn_stdin_listener();

    info!(
        target: "chipscope::headless",
        preset = %config.preset,
        lanes = driver.layout().total_lanes(),
        interval_ms = driver.tick_interval_ms(),
        "chipscope headless core ready"
    );

    loop {
        let interval = Duration::from_millis(driver.tick_interval_ms() as u64);
        match command_rx.recv_timeout(interval) {
            Ok(Command::Quit) => break,
            Ok(command) => handle_command(
                command,
                &mut driver,
                &mut scene,
                &mut snapshot,
                &mut overlay,
                &presets,
                &catalog,
            ),
            Err(RecvTimeoutError::Timeout) => {
                if driver.is_running() {
                    run_tick(&mut driver, &mut scene, &mut snapshot, &mut overlay, &catalog);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn run_tick(
    driver: &mut SimulationDriver,
    scene: &mut SceneCache,
    snapshot: &mut SnapshotCache,
    overlay: &mut OverlayState,
    catalog: &BlockModelCatalog,
) {
    driver.step();
    scene.mark_color_dirty();
    scene.refresh(driver.layout());
    snapshot.render(catalog, driver.layout(), driver.tick());
    let time_s = driver.tick() as f32 * driver.tick_interval_ms() as f32 / 1000.0;
    let _overlay_ops = overlay.build(catalog, driver.layout(), time_s);
    overlay.advance();

    let metrics = driver.metrics();
    info!(
        target: "chipscope::headless",
        tick = metrics.tick,
        lanes = metrics.lane_count,
        mean_activity = metrics.mean_sub_unit_activity,
        freq_ghz = metrics.freq_ghz,
        power_w = metrics.power_w,
        temp_c = metrics.temp_c,
        "tick.completed"
    );
}

#[derive(Debug)]
enum Command {
    Start,
    Stop,
    Tick(u32),
    Interval(u32),
    Utilization(u32),
    Voltage(u32),
    View(String),
    Metric(String),
    Colormap(String),
    Show { key: String, on: bool },
    Highlight(String),
    Hover(String),
    Workflow(String),
    Preset(String),
    Import(PathBuf),
    Export(PathBuf),
    Status,
    Quit,
}

fn spawn_stdin_listener() -> Receiver<Command> {
    let (sender, receiver) = unbounded::<Command>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_command(trimmed) {
                Some(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                None => warn!("Invalid command: {}", trimmed),
            }
        }
        let _ = sender.send(Command::Quit);
    });
    receiver
}

fn parse_command(input: &str) -> Option<Command> {
    let mut parts = input.split_whitespace();
    match parts.next()? {
        "start" => Some(Command::Start),
        "stop" => Some(Command::Stop),
        "tick" => {
            let amount = parts.next().unwrap_or("1").parse().ok()?;
            Some(Command::Tick(amount))
        }
        "interval" => Some(Command::Interval(parts.next()?.parse().ok()?)),
        "util" => Some(Command::Utilization(parts.next()?.parse().ok()?)),
        "volt" => Some(Command::Voltage(parts.next()?.parse().ok()?)),
        "view" => Some(Command::View(parts.next()?.to_string())),
        "metric" => Some(Command::Metric(parts.next()?.to_string())),
        "colormap" => Some(Command::Colormap(parts.next()?.to_string())),
        "show" => {
            let key = parts.next()?.to_string();
            let on = match parts.next().unwrap_or("on") {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                _ => return None,
            };
            Some(Command::Show { key, on })
        }
        "highlight" => Some(Command::Highlight(
            parts.next().unwrap_or("none").to_string(),
        )),
        "hover" => Some(Command::Hover(parts.next().unwrap_or("none").to_string())),
        "workflow" => Some(Command::Workflow(parts.next()?.to_string())),
        "preset" => Some(Command::Preset(parts.next()?.to_string())),
        "import" => Some(Command::Import(PathBuf::from(parts.next()?))),
        "export" => Some(Command::Export(PathBuf::from(parts.next()?))),
        "status" => Some(Command::Status),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn handle_command(
    command: Command,
    driver: &mut SimulationDriver,
    scene: &mut SceneCache,
    snapshot: &mut SnapshotCache,
    overlay: &mut OverlayState,
    presets: &PresetCatalog,
    catalog: &BlockModelCatalog,
) {
    match command {
        Command::Start => driver.start(),
        Command::Stop => driver.stop(),
        Command::Tick(amount) => {
            for _ in 0..amount {
                run_tick(driver, scene, snapshot, overlay, catalog);
            }
        }
        Command::Interval(ms) => {
            driver.set_tick_interval_ms(ms);
            info!(
                target: "chipscope::headless",
                effective_ms = driver.tick_interval_ms(),
                "command.applied=interval"
            );
        }
        Command::Utilization(pct) => driver.set_global_utilization_pct(pct),
        Command::Voltage(mv) => driver.set_voltage_mv(mv),
        Command::View(mode) => match ViewMode2D::from_key(&mode) {
            Some(mode) => scene.set_view_mode(mode),
            None => warn!("Unknown view mode: {}", mode),
        },
        Command::Metric(name) => match MetricKind::from_key(&name) {
            Some(metric) => scene.set_metric(metric),
            None => warn!("Unknown metric: {}", name),
        },
        Command::Colormap(name) => scene.set_colormap(ColorMap::from_key(&name)),
        Command::Show { key, on } => snapshot.set_visibility_key(&key, on),
        Command::Highlight(key) => snapshot.set_highlight_key(&key),
        Command::Hover(key) => overlay.set_hover(scope_proto::ComponentKind::from_key(&key)),
        Command::Workflow(key) => match WorkflowKind::from_key(&key) {
            Some(kind) => overlay.start_workflow(kind),
            None => warn!("Unknown workflow: {}", key),
        },
        Command::Preset(key) => match presets.get(&key) {
            Some(layout) => {
                driver.replace_layout(layout);
                scene.mark_layout_dirty();
                snapshot.invalidate();
            }
            None => warn!("Unknown preset: {}", key),
        },
        Command::Import(path) => match Layout::from_file(&path) {
            Ok(layout) => {
                if layout.clusters.is_empty() {
                    // Advisory only; the empty model is still usable.
                    info!(
                        target: "chipscope::headless",
                        path = %path.display(),
                        "import.empty_model"
                    );
                }
                driver.replace_layout(layout);
                scene.mark_layout_dirty();
                snapshot.invalidate();
            }
            Err(err) => warn!(
                target: "chipscope::headless",
                path = %path.display(),
                error = %err,
                "import.failed"
            ),
        },
        Command::Export(path) => match driver.layout().to_file(&path) {
            Ok(()) => info!(
                target: "chipscope::headless",
                path = %path.display(),
                "export.completed"
            ),
            Err(err) => warn!(
                target: "chipscope::headless",
                path = %path.display(),
                error = %err,
                "export.failed"
            ),
        },
        Command::Status => {
            let metrics = driver.metrics();
            info!(
                target: "chipscope::headless",
                running = driver.is_running(),
                tick = metrics.tick,
                layout = %driver.layout().name,
                lanes = metrics.lane_count,
                mean_activity = metrics.mean_sub_unit_activity,
                temp_c = metrics.temp_c,
                "status"
            );
        }
        Command::Quit => unreachable!("quit handled by the main loop"),
    }
}
