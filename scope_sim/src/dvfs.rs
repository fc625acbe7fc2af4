//! DVFS feedback engine: voltage → frequency → power → temperature →
//! throttle, one continuous state variable (`temp_c`), no discrete modes.

use serde::Deserialize;

/// Engine parameters. Defaults model an illustrative, uncalibrated part.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DvfsParams {
    pub effective_capacitance: f32,
    pub ambient_c: f32,
    pub thermal_tau_s: f32,
    pub initial_temp_c: f32,
    pub min_volts: f32,
    pub max_volts: f32,
    pub throttle_threshold_c: f32,
    pub throttle_slope_per_c: f32,
    pub throttle_floor: f32,
}

impl Default for DvfsParams {
    fn default() -> Self {
        Self {
            effective_capacitance: 220.0,
            ambient_c: 30.0,
            thermal_tau_s: 5.0,
            initial_temp_c: 40.0,
            min_volts: 0.6,
            max_volts: 1.3,
            throttle_threshold_c: 80.0,
            throttle_slope_per_c: 0.01,
            throttle_floor: 0.5,
        }
    }
}

/// Outputs of one engine step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DvfsOutput {
    pub freq_ghz: f32,
    pub power_w: f32,
    pub temp_c: f32,
}

/// Closed-loop engine state. Temperature persists across ticks; everything
/// else is recomputed from the inputs.
#[derive(Debug, Clone)]
pub struct DvfsEngine {
    params: DvfsParams,
    temp_c: f32,
}

impl DvfsEngine {
    pub fn new(params: DvfsParams) -> Self {
        let temp_c = params.initial_temp_c;
        Self { params, temp_c }
    }

    pub fn temp_c(&self) -> f32 {
        self.temp_c
    }

    pub fn params(&self) -> &DvfsParams {
        &self.params
    }

    pub fn reset(&mut self) {
        self.temp_c = self.params.initial_temp_c;
    }

    /// Voltage-scaled base frequency in GHz: super-linear curve with
    /// diminishing returns outside nominal voltage.
    fn base_frequency(&self, volts: f32) -> f32 {
        let span = self.params.max_volts - self.params.min_volts;
        1.2 + 2.2 * ((volts - self.params.min_volts) / span).powf(0.8)
    }

    /// Frequency before the throttle factor, for the given clamped inputs.
    /// The utilization factor keeps an idle clock above a floor.
    pub fn unthrottled_frequency(&self, volts: f32, util01: f32) -> f32 {
        let volts = volts.clamp(self.params.min_volts, self.params.max_volts);
        let util01 = util01.clamp(0.0, 1.0);
        self.base_frequency(volts) * (0.55 + 0.45 * util01)
    }

    /// Advance the engine by `dt` seconds. Out-of-band inputs are clamped,
    /// never rejected; the engine cannot fail, only degrade.
    pub fn step(&mut self, dt: f32, volts: f32, util01: f32) -> DvfsOutput {
        let dt = dt.max(0.001);
        let volts = volts.clamp(self.params.min_volts, self.params.max_volts);
        let util01 = util01.clamp(0.0, 1.0);

        let mut freq_ghz = self.unthrottled_frequency(volts, util01);
        let power_w = self.params.effective_capacitance * volts * volts * freq_ghz * util01 * 0.001;

        // dt enters multiplicatively so variable tick rates share the same
        // long-run behavior. The coefficient is capped at 1 so a dt far
        // beyond tau (a tick after a long pause) lands on the target
        // instead of overshooting it.
        let target = self.params.ambient_c + 0.7 * power_w;
        let alpha = (dt / self.params.thermal_tau_s.max(0.1)).min(1.0);
        self.temp_c += (target - self.temp_c) * alpha;

        if self.temp_c > self.params.throttle_threshold_c {
            let overshoot = self.temp_c - self.params.throttle_threshold_c;
            freq_ghz *= (1.0 - overshoot * self.params.throttle_slope_per_c)
                .max(self.params.throttle_floor);
        }

        DvfsOutput {
            freq_ghz,
            power_w,
            temp_c: self.temp_c,
        }
    }
}

impl Default for DvfsEngine {
    fn default() -> Self {
        Self::new(DvfsParams::default())
    }
}
