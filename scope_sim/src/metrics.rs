use crate::dvfs::DvfsOutput;
use crate::model::Layout;

/// Per-tick aggregate telemetry, refreshed after every driver step.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SimulationMetrics {
    pub tick: u64,
    pub lane_count: usize,
    pub mean_sub_unit_activity: f32,
    pub mean_lane_activity: f32,
    pub freq_ghz: f32,
    pub power_w: f32,
    pub temp_c: f32,
}

pub fn collect_metrics(tick: u64, layout: &Layout, engine_output: DvfsOutput) -> SimulationMetrics {
    let mut sub_unit_total = 0f64;
    let mut sub_unit_count = 0u64;
    let mut lane_total = 0f64;
    let mut lane_count = 0u64;

    for sub_unit in layout.sub_units() {
        sub_unit_total += sub_unit.activity.to_f32() as f64;
        sub_unit_count += 1;
        for lane in &sub_unit.lanes {
            lane_total += lane.activity.to_f32() as f64;
            lane_count += 1;
        }
    }

    SimulationMetrics {
        tick,
        lane_count: lane_count as usize,
        mean_sub_unit_activity: if sub_unit_count > 0 {
            (sub_unit_total / sub_unit_count as f64) as f32
        } else {
            0.0
        },
        mean_lane_activity: if lane_count > 0 {
            (lane_total / lane_count as f64) as f32
        } else {
            0.0
        },
        freq_ghz: engine_output.freq_ghz,
        power_w: engine_output.power_w,
        temp_c: engine_output.temp_c,
    }
}
