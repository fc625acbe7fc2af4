//! Incremental 2-D scene cache: dirty-flag-gated rebuild of per-entity
//! screen geometry, typed tile pools to avoid per-tick allocation, and a
//! frame-skip policy keyed to scene size.

use crate::colormap::{ColorMap, MetricKind};
use crate::config::{FrameSkipConfig, SceneConfig, SimConfig};
use crate::log_stream::TimedScope;
use crate::model::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode2D {
    #[default]
    Logical,
    /// Renders as the flat die arrangement.
    SubUnitFocus,
    Die,
}

impl ViewMode2D {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "logical" => Some(ViewMode2D::Logical),
            "sub_unit_focus" => Some(ViewMode2D::SubUnitFocus),
            "die" => Some(ViewMode2D::Die),
            _ => None,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            ViewMode2D::Logical => "logical",
            ViewMode2D::SubUnitFocus => "sub_unit_focus",
            ViewMode2D::Die => "die",
        }
    }

    fn is_flat(self) -> bool {
        !matches!(self, ViewMode2D::Logical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    fn inset(self, amount: f32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            w: (self.w - 2.0 * amount).max(0.0),
            h: (self.h - 2.0 * amount).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Lane,
    SubUnit,
    Cluster,
}

/// One visual item of the 2-D scene. Items are reused through the typed
/// pools; `reinit` overwrites everything a fresh construction would set.
#[derive(Debug, Clone, PartialEq)]
pub struct TileItem {
    pub kind: TileKind,
    pub rect: Rect,
    pub color: [f32; 3],
    pub label: Option<String>,
    pub outlined: bool,
    pub visible: bool,
}

impl TileItem {
    fn fresh(kind: TileKind) -> Self {
        Self {
            kind,
            rect: Rect::default(),
            color: [0.0, 0.0, 0.0],
            label: None,
            outlined: false,
            visible: false,
        }
    }

    fn reinit(&mut self, rect: Rect, label: Option<String>, outlined: bool) {
        self.rect = rect;
        self.label = label;
        self.outlined = outlined;
        self.visible = true;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounters {
    /// Items handed out, whether reused or freshly constructed.
    pub acquired: u64,
    /// Items handed out from the pool rather than constructed.
    pub reused: u64,
    /// Items hidden and returned to the pool.
    pub released: u64,
}

impl PoolCounters {
    pub fn churn(&self) -> u64 {
        self.acquired + self.released
    }
}

/// Typed object pool. Teardown hides items and stores them here; rebuild
/// pops and reinitializes in place, constructing only on a dry pool.
#[derive(Debug, Default)]
struct TilePool {
    kind_counters: PoolCounters,
    free: Vec<TileItem>,
}

impl TilePool {
    fn acquire(&mut self, kind: TileKind, rect: Rect, label: Option<String>, outlined: bool) -> TileItem {
        self.kind_counters.acquired += 1;
        let mut item = match self.free.pop() {
            Some(item) => {
                self.kind_counters.reused += 1;
                item
            }
            None => TileItem::fresh(kind),
        };
        item.reinit(rect, label, outlined);
        item
    }

    fn release(&mut self, mut item: TileItem) {
        item.visible = false;
        self.kind_counters.released += 1;
        self.free.push(item);
    }

    fn pooled(&self) -> usize {
        self.free.len()
    }
}

/// Per-entity screen rectangles, computed once per topology/view change.
/// Geometry depends only on counts, never on telemetry.
#[derive(Debug, Clone, Default, PartialEq)]
struct SceneGeometry {
    cluster_rects: Vec<Rect>,
    sub_unit_rects: Vec<Rect>,
    lane_rects: Vec<Rect>,
}

fn grid_dims(count: usize) -> (usize, usize) {
    if count == 0 {
        return (1, 0);
    }
    let cols = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    (cols, rows)
}

fn lane_grid_dims(count: usize) -> (usize, usize) {
    if count == 0 {
        return (4, 0);
    }
    let cols = ((count as f32).sqrt() as usize).max(4);
    let rows = count.div_ceil(cols);
    (cols, rows)
}

fn grid_cell(bounds: Rect, cols: usize, rows: usize, index: usize) -> Rect {
    let row = index / cols;
    let col = index % cols;
    let w = bounds.w / cols as f32;
    let h = bounds.h / rows.max(1) as f32;
    Rect::new(bounds.x + col as f32 * w, bounds.y + row as f32 * h, w, h)
}

fn compute_geometry(layout: &Layout, mode: ViewMode2D, scene: &SceneConfig) -> SceneGeometry {
    let available = Rect::new(0.0, 0.0, scene.width, scene.height).inset(scene.margin);
    let mut geometry = SceneGeometry::default();

    if mode.is_flat() {
        let sub_unit_count = layout.sub_unit_count();
        let (cols, rows) = grid_dims(sub_unit_count);
        for (index, sub_unit) in layout.sub_units().enumerate() {
            let cell = grid_cell(available, cols, rows, index).inset(scene.cluster_inset);
            push_lane_rects(&mut geometry, cell, sub_unit.lanes.len(), scene.lane_inset);
            geometry.sub_unit_rects.push(cell);
        }
        return geometry;
    }

    let (cluster_cols, cluster_rows) = grid_dims(layout.clusters.len());
    for (cluster_index, cluster) in layout.clusters.iter().enumerate() {
        let cluster_rect = grid_cell(available, cluster_cols, cluster_rows, cluster_index)
            .inset(scene.cluster_inset);
        geometry.cluster_rects.push(cluster_rect);

        let (sub_cols, sub_rows) = grid_dims(cluster.sub_units.len());
        for (sub_index, sub_unit) in cluster.sub_units.iter().enumerate() {
            let sub_rect =
                grid_cell(cluster_rect, sub_cols, sub_rows, sub_index).inset(scene.sub_unit_inset);
            push_lane_rects(&mut geometry, sub_rect, sub_unit.lanes.len(), scene.lane_inset);
            geometry.sub_unit_rects.push(sub_rect);
        }
    }
    geometry
}

fn push_lane_rects(geometry: &mut SceneGeometry, bounds: Rect, lane_count: usize, inset: f32) {
    let (cols, rows) = lane_grid_dims(lane_count);
    for index in 0..lane_count {
        geometry
            .lane_rects
            .push(grid_cell(bounds, cols, rows, index).inset(inset));
    }
}

/// The render cache manager for the 2-D tiled view.
///
/// Three independent dirty flags gate the work: `layout_dirty` (topology
/// changed, full recompute and pool churn), `view_dirty` (presentation
/// changed, tiles reinitialized in place where counts allow), and
/// `color_dirty` (telemetry colors only, subject to frame skip).
pub struct SceneCache {
    scene: SceneConfig,
    bands: FrameSkipConfig,
    view_mode: ViewMode2D,
    colormap: ColorMap,
    metric: MetricKind,
    show_labels: bool,
    show_grid: bool,
    layout_dirty: bool,
    view_dirty: bool,
    color_dirty: bool,
    frame_counter: u32,
    frame_skip: u32,
    geometry_revision: u64,
    geometry: SceneGeometry,
    cluster_tiles: Vec<TileItem>,
    sub_unit_tiles: Vec<TileItem>,
    lane_tiles: Vec<TileItem>,
    cluster_pool: TilePool,
    sub_unit_pool: TilePool,
    lane_pool: TilePool,
}

impl SceneCache {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            scene: config.scene,
            bands: config.frame_skip,
            view_mode: ViewMode2D::default(),
            colormap: ColorMap::default(),
            metric: MetricKind::default(),
            show_labels: true,
            show_grid: true,
            layout_dirty: true,
            view_dirty: false,
            color_dirty: false,
            frame_counter: 0,
            frame_skip: 1,
            geometry_revision: 0,
            geometry: SceneGeometry::default(),
            cluster_tiles: Vec::new(),
            sub_unit_tiles: Vec::new(),
            lane_tiles: Vec::new(),
            cluster_pool: TilePool::default(),
            sub_unit_pool: TilePool::default(),
            lane_pool: TilePool::default(),
        }
    }

    pub fn view_mode(&self) -> ViewMode2D {
        self.view_mode
    }

    pub fn colormap(&self) -> ColorMap {
        self.colormap
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    pub fn frame_skip(&self) -> u32 {
        self.frame_skip
    }

    pub fn geometry_revision(&self) -> u64 {
        self.geometry_revision
    }

    pub fn lane_tiles(&self) -> &[TileItem] {
        &self.lane_tiles
    }

    pub fn sub_unit_tiles(&self) -> &[TileItem] {
        &self.sub_unit_tiles
    }

    pub fn cluster_tiles(&self) -> &[TileItem] {
        &self.cluster_tiles
    }

    pub fn counters(&self, kind: TileKind) -> PoolCounters {
        match kind {
            TileKind::Lane => self.lane_pool.kind_counters,
            TileKind::SubUnit => self.sub_unit_pool.kind_counters,
            TileKind::Cluster => self.cluster_pool.kind_counters,
        }
    }

    pub fn pooled(&self, kind: TileKind) -> usize {
        match kind {
            TileKind::Lane => self.lane_pool.pooled(),
            TileKind::SubUnit => self.sub_unit_pool.pooled(),
            TileKind::Cluster => self.cluster_pool.pooled(),
        }
    }

    /// Topology changed; the next refresh runs the full rebuild path.
    pub fn mark_layout_dirty(&mut self) {
        self.layout_dirty = true;
    }

    /// Telemetry changed; the next refresh recolors, subject to frame skip.
    pub fn mark_color_dirty(&mut self) {
        self.color_dirty = true;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode2D) {
        if self.view_mode != mode {
            self.view_mode = mode;
            self.view_dirty = true;
        }
    }

    pub fn set_colormap(&mut self, map: ColorMap) {
        if self.colormap != map {
            self.colormap = map;
            self.color_dirty = true;
        }
    }

    pub fn set_metric(&mut self, metric: MetricKind) {
        if self.metric != metric {
            self.metric = metric;
            self.color_dirty = true;
        }
    }

    pub fn set_show_labels(&mut self, show: bool) {
        if self.show_labels != show {
            self.show_labels = show;
            self.view_dirty = true;
        }
    }

    pub fn set_show_grid(&mut self, show: bool) {
        if self.show_grid != show {
            self.show_grid = show;
            self.view_dirty = true;
        }
    }

    /// Consult the dirty flags and bring the cached scene current.
    ///
    /// Rebuilds triggered by `layout_dirty`/`view_dirty` always run
    /// immediately; only the color-only path is frame-skipped.
    pub fn refresh(&mut self, layout: &Layout) {
        if self.layout_dirty || self.view_dirty {
            let _scope = TimedScope::new("scene2d.rebuild");
            self.rebuild(layout);
            self.recolor(layout);
            self.layout_dirty = false;
            self.view_dirty = false;
            self.color_dirty = false;
            return;
        }

        if self.color_dirty {
            self.color_dirty = false;
            self.frame_counter = self.frame_counter.wrapping_add(1);
            if self.frame_counter % self.frame_skip != 0 {
                return;
            }
            self.recolor(layout);
        }
    }

    fn rebuild(&mut self, layout: &Layout) {
        self.geometry = compute_geometry(layout, self.view_mode, &self.scene);
        self.geometry_revision += 1;
        self.frame_skip = self.bands.skip_factor(layout.total_lanes());

        let logical = !self.view_mode.is_flat();
        let cluster_labels = logical && self.show_labels;
        let sub_unit_outline = if logical { true } else { self.show_grid };

        sync_tiles(
            &mut self.cluster_tiles,
            &mut self.cluster_pool,
            TileKind::Cluster,
            &self.geometry.cluster_rects,
            |index| {
                let label = cluster_labels
                    .then(|| layout.clusters.get(index).map(|c| format!("Cluster {}", c.id)))
                    .flatten();
                (label, true)
            },
        );

        let sub_unit_ids: Vec<u32> = layout.sub_units().map(|s| s.id).collect();
        let sub_unit_labels = logical && self.show_labels;
        sync_tiles(
            &mut self.sub_unit_tiles,
            &mut self.sub_unit_pool,
            TileKind::SubUnit,
            &self.geometry.sub_unit_rects,
            |index| {
                let label = sub_unit_labels
                    .then(|| sub_unit_ids.get(index).map(|id| format!("SubUnit {}", id)))
                    .flatten();
                (label, sub_unit_outline)
            },
        );

        sync_tiles(
            &mut self.lane_tiles,
            &mut self.lane_pool,
            TileKind::Lane,
            &self.geometry.lane_rects,
            |_| (None, false),
        );

        tracing::debug!(
            target: "chipscope::scene2d",
            mode = self.view_mode.as_key(),
            revision = self.geometry_revision,
            lanes = self.lane_tiles.len(),
            frame_skip = self.frame_skip,
            "scene.rebuilt"
        );
    }

    fn recolor(&mut self, layout: &Layout) {
        for (tile, lane) in self.lane_tiles.iter_mut().zip(layout.lanes()) {
            tile.color = self.colormap.sample(self.metric.sample(lane));
        }
    }
}

/// Bring `tiles` to the desired rect list. Matching counts reinitialize in
/// place with zero pool churn; mismatches release extras or acquire more.
fn sync_tiles<F>(
    tiles: &mut Vec<TileItem>,
    pool: &mut TilePool,
    kind: TileKind,
    rects: &[Rect],
    mut detail: F,
) where
    F: FnMut(usize) -> (Option<String>, bool),
{
    while tiles.len() > rects.len() {
        if let Some(item) = tiles.pop() {
            pool.release(item);
        }
    }

    for (index, rect) in rects.iter().enumerate() {
        let (label, outlined) = detail(index);
        if index < tiles.len() {
            tiles[index].reinit(*rect, label, outlined);
        } else {
            tiles.push(pool.acquire(kind, *rect, label, outlined));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_and_layout() -> (SceneCache, Layout) {
        let config = SimConfig::default();
        (SceneCache::new(&config), Layout::from_spec("Test", 2, 3, 16))
    }

    #[test]
    fn initial_refresh_builds_every_tile() {
        let (mut cache, layout) = cache_and_layout();
        cache.refresh(&layout);
        assert_eq!(cache.lane_tiles().len(), 2 * 3 * 16);
        assert_eq!(cache.sub_unit_tiles().len(), 6);
        assert_eq!(cache.cluster_tiles().len(), 2);
        assert_eq!(cache.geometry_revision(), 1);
        assert!(cache.lane_tiles().iter().all(|tile| tile.visible));
    }

    #[test]
    fn clean_refresh_is_idempotent() {
        let (mut cache, layout) = cache_and_layout();
        cache.refresh(&layout);
        let revision = cache.geometry_revision();
        let counters = cache.counters(TileKind::Lane);
        let tiles = cache.lane_tiles().to_vec();

        cache.refresh(&layout);
        cache.refresh(&layout);

        assert_eq!(cache.geometry_revision(), revision);
        assert_eq!(cache.counters(TileKind::Lane), counters);
        assert_eq!(cache.lane_tiles(), tiles.as_slice());
    }

    #[test]
    fn view_change_reinitializes_in_place() {
        let (mut cache, layout) = cache_and_layout();
        cache.refresh(&layout);
        let lane_counters = cache.counters(TileKind::Lane);

        cache.set_view_mode(ViewMode2D::Die);
        cache.refresh(&layout);

        // Lane and sub-unit counts are unchanged, so no lane churn; the
        // cluster tiles are released into their pool.
        assert_eq!(cache.counters(TileKind::Lane), lane_counters);
        assert!(cache.cluster_tiles().is_empty());
        assert_eq!(cache.pooled(TileKind::Cluster), 2);
        assert_eq!(cache.geometry_revision(), 2);
    }

    #[test]
    fn pool_reuse_on_layout_swap() {
        let (mut cache, layout) = cache_and_layout();
        cache.refresh(&layout);

        let smaller = Layout::from_spec("Smaller", 1, 2, 16);
        cache.mark_layout_dirty();
        cache.refresh(&smaller);
        assert_eq!(cache.lane_tiles().len(), 32);
        assert_eq!(cache.pooled(TileKind::Lane), 96 - 32);

        cache.mark_layout_dirty();
        cache.refresh(&layout);
        let counters = cache.counters(TileKind::Lane);
        // Growing back reuses the pooled tiles before constructing fresh.
        assert_eq!(counters.reused, 96 - 32);
        assert_eq!(cache.pooled(TileKind::Lane), 0);
    }

    #[test]
    fn sub_unit_focus_matches_die_arrangement() {
        let config = SimConfig::default();
        let layout = Layout::from_spec("Test", 2, 3, 16);

        let mut focus = SceneCache::new(&config);
        focus.set_view_mode(ViewMode2D::SubUnitFocus);
        focus.refresh(&layout);

        let mut die = SceneCache::new(&config);
        die.set_view_mode(ViewMode2D::Die);
        die.refresh(&layout);

        assert_eq!(focus.lane_tiles(), die.lane_tiles());
        assert_eq!(focus.sub_unit_tiles(), die.sub_unit_tiles());
    }

    #[test]
    fn color_refresh_honors_frame_skip() {
        let config = SimConfig {
            frame_skip: FrameSkipConfig {
                full_rate_max_lanes: 10,
                half_rate_max_lanes: 20,
            },
            ..SimConfig::default()
        };
        let mut cache = SceneCache::new(&config);
        let mut layout = Layout::from_spec("Test", 1, 1, 16);
        cache.refresh(&layout);
        assert_eq!(cache.frame_skip(), 2);

        // Make telemetry visible in colors.
        layout.clusters[0].sub_units[0].lanes[0].activity = crate::scalar::Scalar::one();
        let before = cache.lane_tiles()[0].color;

        cache.mark_color_dirty();
        cache.refresh(&layout); // counter 1 -> skipped
        assert_eq!(cache.lane_tiles()[0].color, before);

        cache.mark_color_dirty();
        cache.refresh(&layout); // counter 2 -> runs
        assert_ne!(cache.lane_tiles()[0].color, before);
    }

    #[test]
    fn rebuild_ignores_frame_skip() {
        let config = SimConfig {
            frame_skip: FrameSkipConfig {
                full_rate_max_lanes: 1,
                half_rate_max_lanes: 2,
            },
            ..SimConfig::default()
        };
        let mut cache = SceneCache::new(&config);
        let layout = Layout::from_spec("Test", 1, 1, 16);
        cache.refresh(&layout);
        let revision = cache.geometry_revision();

        cache.set_view_mode(ViewMode2D::Die);
        cache.refresh(&layout);
        assert_eq!(cache.geometry_revision(), revision + 1);
    }

    #[test]
    fn labels_follow_the_toggle() {
        let (mut cache, layout) = cache_and_layout();
        cache.refresh(&layout);
        assert!(cache.cluster_tiles()[0].label.is_some());
        assert!(cache.sub_unit_tiles()[0].label.is_some());

        cache.set_show_labels(false);
        cache.refresh(&layout);
        assert!(cache.cluster_tiles()[0].label.is_none());
        assert!(cache.sub_unit_tiles()[0].label.is_none());
    }

    #[test]
    fn grid_toggle_controls_flat_outlines() {
        let (mut cache, layout) = cache_and_layout();
        cache.set_view_mode(ViewMode2D::Die);
        cache.refresh(&layout);
        assert!(cache.sub_unit_tiles()[0].outlined);

        cache.set_show_grid(false);
        cache.refresh(&layout);
        assert!(!cache.sub_unit_tiles()[0].outlined);
    }

    #[test]
    fn geometry_is_counts_only() {
        let (mut cache, mut layout) = cache_and_layout();
        cache.refresh(&layout);
        let rects: Vec<Rect> = cache.lane_tiles().iter().map(|t| t.rect).collect();

        for lane in layout
            .clusters
            .iter_mut()
            .flat_map(|c| c.sub_units.iter_mut())
            .flat_map(|s| s.lanes.iter_mut())
        {
            lane.activity = crate::scalar::Scalar::one();
        }
        cache.mark_color_dirty();
        cache.refresh(&layout);

        let after: Vec<Rect> = cache.lane_tiles().iter().map(|t| t.rect).collect();
        assert_eq!(rects, after);
    }
}
