//! Metric selection and colormaps for telemetry-derived tile coloring.

use crate::model::Lane;
use crate::scalar::clamp01;

/// Which telemetry field drives tile colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    #[default]
    Utilization,
    Temperature,
    MemPressure,
}

impl MetricKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "utilization" => Some(MetricKind::Utilization),
            "temperature" => Some(MetricKind::Temperature),
            "mem_pressure" => Some(MetricKind::MemPressure),
            _ => None,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            MetricKind::Utilization => "utilization",
            MetricKind::Temperature => "temperature",
            MetricKind::MemPressure => "mem_pressure",
        }
    }

    pub fn sample(self, lane: &Lane) -> f32 {
        match self {
            MetricKind::Utilization => lane.activity.to_f32(),
            MetricKind::Temperature => lane.temperature.to_f32(),
            MetricKind::MemPressure => lane.mem_pressure.to_f32(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMap {
    #[default]
    Turbo,
    Viridis,
    Gray,
    Plasma,
    Inferno,
}

impl ColorMap {
    /// Unknown names fall back to Turbo.
    pub fn from_key(key: &str) -> Self {
        match key {
            "viridis" => ColorMap::Viridis,
            "gray" => ColorMap::Gray,
            "plasma" => ColorMap::Plasma,
            "inferno" => ColorMap::Inferno,
            _ => ColorMap::Turbo,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            ColorMap::Turbo => "turbo",
            ColorMap::Viridis => "viridis",
            ColorMap::Gray => "gray",
            ColorMap::Plasma => "plasma",
            ColorMap::Inferno => "inferno",
        }
    }

    pub fn sample(self, t: f32) -> [f32; 3] {
        let t = clamp01(t);
        match self {
            ColorMap::Turbo => turbo(t),
            ColorMap::Viridis => viridis(t),
            ColorMap::Gray => [t, t, t],
            ColorMap::Plasma => [
                clamp01(2.0 * t),
                clamp01(2.0 * (1.0 - (t - 0.5).abs())),
                clamp01(2.0 * (1.0 - t)),
            ],
            ColorMap::Inferno => [
                clamp01(0.8 * t + 0.2),
                clamp01(t * 0.4),
                clamp01(0.1 + 0.9 * (1.0 - t)),
            ],
        }
    }
}

fn turbo(t: f32) -> [f32; 3] {
    let r = 34.61 + t * (1172.33 + t * (-10793.56 + t * (33300.12 + t * (-38394.49 + t * 15054.31))));
    let g = 23.31 + t * (557.33 + t * (1225.33 + t * (-3574.96 + t * (3083.81 - t * 852.12))));
    let b = 27.2 + t * (3211.1 + t * (-15327.97 + t * (27814.0 + t * (-22569.18 + t * 6838.66))));
    [clamp01(r / 255.0), clamp01(g / 255.0), clamp01(b / 255.0)]
}

const VIRIDIS_ANCHORS: [(f32, [f32; 3]); 5] = [
    (0.0, [68.0 / 255.0, 1.0 / 255.0, 84.0 / 255.0]),
    (0.25, [59.0 / 255.0, 82.0 / 255.0, 139.0 / 255.0]),
    (0.5, [33.0 / 255.0, 145.0 / 255.0, 140.0 / 255.0]),
    (0.75, [94.0 / 255.0, 201.0 / 255.0, 97.0 / 255.0]),
    (1.0, [253.0 / 255.0, 231.0 / 255.0, 37.0 / 255.0]),
];

fn viridis(t: f32) -> [f32; 3] {
    for window in VIRIDIS_ANCHORS.windows(2) {
        let (a_t, a_c) = window[0];
        let (b_t, b_c) = window[1];
        if (a_t..=b_t).contains(&t) {
            let k = (t - a_t) / (b_t - a_t + 1e-9);
            return [
                a_c[0] + (b_c[0] - a_c[0]) * k,
                a_c[1] + (b_c[1] - a_c[1]) * k,
                a_c[2] + (b_c[2] - a_c[2]) * k,
            ];
        }
    }
    VIRIDIS_ANCHORS[VIRIDIS_ANCHORS.len() - 1].1
}
