//! Headless core of the chip-hierarchy visualizer.
//!
//! Owns the Lane → SubUnit → Cluster → Layout telemetry tree, the DVFS
//! feedback engine that drives it, and the two rendering caches an external
//! renderer consumes: the incremental 2-D scene cache and the
//! fingerprint-keyed 3-D snapshot cache. The core neither draws pixels nor
//! owns a window or timer.

pub mod catalog;
pub mod colormap;
pub mod config;
pub mod driver;
pub mod dvfs;
mod hashing;
pub mod log_stream;
pub mod metrics;
pub mod model;
pub mod presets;
mod scalar;
pub mod scene2d;
pub mod snapshot3d;

pub use catalog::BlockModelCatalog;
pub use colormap::{ColorMap, MetricKind};
pub use config::{load_sim_config_from_env, SimConfig, SimConfigError};
pub use driver::{SimulationDriver, TickEvent};
pub use dvfs::{DvfsEngine, DvfsOutput, DvfsParams};
pub use log_stream::{log_collector, LogEnvelope, LogForwardLayer, TimedScope};
pub use metrics::SimulationMetrics;
pub use model::{Cluster, Lane, Layout, LayoutDocError, SubUnit};
pub use presets::{LayoutPreset, PresetCatalog};
pub use scalar::{clamp01, Scalar};
pub use scene2d::{SceneCache, TileItem, TileKind, ViewMode2D};
pub use snapshot3d::{
    CatalogError, ModelCatalog, OverlayState, SnapshotCache, WorkflowAnimation, WorkflowKind,
};
