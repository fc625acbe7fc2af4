//! Simulation driver: owns the feedback engine and the layout, advances
//! both on each tick, and publishes an "updated" event after all mutation
//! completes.

use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::SimConfig;
use crate::dvfs::{DvfsEngine, DvfsOutput};
use crate::hashing::fnv1a;
use crate::metrics::{collect_metrics, SimulationMetrics};
use crate::model::Layout;
use crate::scalar::{clamp01, Scalar};

pub const MIN_TICK_INTERVAL_MS: u32 = 16;
pub const MAX_TICK_INTERVAL_MS: u32 = 600;
pub const MIN_VOLTAGE_MV: u32 = 600;
pub const MAX_VOLTAGE_MV: u32 = 1300;

const PHASE_STEP: f32 = 0.06;

/// Summary published to subscribers once per completed step, so hosts need
/// not walk the tree for status displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    pub tick: u64,
    pub freq_ghz: f32,
    pub power_w: f32,
    pub temp_c: f32,
    pub mean_sub_unit_activity: f32,
}

/// Stopped → Running → Stopped, driven by explicit `start`/`stop`. The host
/// owns the periodic timer; the driver only exposes `step`.
pub struct SimulationDriver {
    layout: Layout,
    engine: DvfsEngine,
    running: bool,
    tick: u64,
    phase: f32,
    tick_interval_ms: u32,
    utilization: f32,
    volts: f32,
    seed: u64,
    rng: SmallRng,
    last_wall: Instant,
    last_output: DvfsOutput,
    metrics: SimulationMetrics,
    subscribers: Vec<Sender<TickEvent>>,
}

impl SimulationDriver {
    pub fn new(layout: Layout, config: &SimConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed ^ fnv1a(&layout.name));
        let mut driver = Self {
            layout,
            engine: DvfsEngine::new(config.dvfs.clone()),
            running: false,
            tick: 0,
            phase: 0.0,
            tick_interval_ms: MIN_TICK_INTERVAL_MS,
            utilization: 0.0,
            volts: 0.0,
            seed: config.seed,
            rng,
            last_wall: Instant::now(),
            last_output: DvfsOutput::default(),
            metrics: SimulationMetrics::default(),
            subscribers: Vec::new(),
        };
        driver.set_tick_interval_ms(config.tick_interval_ms);
        driver.set_global_utilization_pct(config.utilization_pct);
        driver.set_voltage_mv(config.voltage_mv);
        driver
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_interval_ms(&self) -> u32 {
        self.tick_interval_ms
    }

    pub fn utilization(&self) -> f32 {
        self.utilization
    }

    pub fn voltage(&self) -> f32 {
        self.volts
    }

    /// Clamped to [16, 600]; the host re-reads the interval each loop turn,
    /// so a change while running re-arms the timer without touching phase.
    pub fn set_tick_interval_ms(&mut self, ms: u32) {
        self.tick_interval_ms = ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
    }

    /// Clamped to [0, 100], stored as [0, 1].
    pub fn set_global_utilization_pct(&mut self, pct: u32) {
        self.utilization = pct.min(100) as f32 / 100.0;
    }

    /// Clamped to [600, 1300] mV, stored in volts.
    pub fn set_voltage_mv(&mut self, mv: u32) {
        self.volts = mv.clamp(MIN_VOLTAGE_MV, MAX_VOLTAGE_MV) as f32 / 1000.0;
    }

    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            // Reset the reference clock so the first tick after a pause
            // never sees a large dt spike.
            self.last_wall = Instant::now();
            info!(target: "chipscope::driver", tick = self.tick, "sim.started");
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!(target: "chipscope::driver", tick = self.tick, "sim.stopped");
        }
    }

    /// Wholesale swap to a new model. Topology never mutates in place.
    pub fn replace_layout(&mut self, layout: Layout) {
        self.rng = SmallRng::seed_from_u64(self.seed ^ fnv1a(&layout.name));
        self.layout = layout;
        self.engine.reset();
        self.metrics = collect_metrics(self.tick, &self.layout, self.last_output);
        info!(
            target: "chipscope::driver",
            name = %self.layout.name,
            lanes = self.layout.total_lanes(),
            "layout.replaced"
        );
        self.publish();
    }

    /// Subscribe to per-step updates. Disconnected receivers are pruned on
    /// the next publish.
    pub fn subscribe(&mut self) -> Receiver<TickEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Host-timer entry point: derives `dt` from the wall clock.
    pub fn step(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_wall).as_secs_f32();
        self.last_wall = now;
        self.step_with_dt(dt);
    }

    /// Pure, deterministic tick body. Ordering is fixed: feedback engine
    /// first, then top-down propagation so every sub-unit's activity is
    /// current before its lanes read it.
    pub fn step_with_dt(&mut self, dt: f32) {
        let util = self.utilization;
        let output = self.engine.step(dt.max(0.001), self.volts, util);
        self.last_output = output;

        self.phase += PHASE_STEP;
        let phase = self.phase;
        let base = 0.15 + 0.85 * util;
        let thermal_drag = (1.0 - (output.temp_c - 70.0).max(0.0) * 0.01).max(0.6);
        let lane_temp = clamp01((output.temp_c - 25.0) / 80.0);

        for cluster in &mut self.layout.clusters {
            for sub_unit in &mut cluster.sub_units {
                let wave = 0.25 * (phase + sub_unit.id as f32 * 0.19).sin();
                let noise = self.rng.gen_range(-0.05f32..0.05);
                let sub_activity = clamp01(base + wave * thermal_drag + noise);
                sub_unit.activity = Scalar::from_f32_unit(sub_activity);

                for (i, lane) in sub_unit.lanes.iter_mut().enumerate() {
                    let jitter = 0.18 * (phase * 1.7 + i as f32 * 0.13).sin();
                    let noise = self.rng.gen_range(-0.04f32..0.04);
                    lane.activity =
                        Scalar::from_f32_unit(0.7 * sub_activity + 0.3 * (base + jitter) + noise);
                    lane.temperature = Scalar::from_f32_unit(lane_temp);
                    lane.mem_pressure = Scalar::from_f32_unit(
                        0.2 + 0.8 * (phase * 0.6 + i as f32 * 0.07).sin().abs(),
                    );
                }
            }
        }

        self.tick += 1;
        self.metrics = collect_metrics(self.tick, &self.layout, output);
        self.publish();
    }

    fn publish(&mut self) {
        let event = TickEvent {
            tick: self.tick,
            freq_ghz: self.last_output.freq_ghz,
            power_w: self.last_output.power_w,
            temp_c: self.last_output.temp_c,
            mean_sub_unit_activity: self.metrics.mean_sub_unit_activity,
        };
        self.subscribers.retain(|sender| sender.send(event).is_ok());
    }
}
