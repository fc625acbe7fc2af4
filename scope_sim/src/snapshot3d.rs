//! Coarse snapshot cache for the 3-D view: one compiled draw program keyed
//! by a fingerprint of visibility and highlight state. Dynamic effects are
//! drawn as a separate overlay pass and never invalidate the cache.

use scope_proto::{
    encode_program, ComponentKind, ComponentStyle, DetailLevel, DrawCmd, DrawProgram,
    SceneFingerprint, VisibilityFlags,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::log_stream::TimedScope;
use crate::model::Layout;

/// Seam to the external geometry catalog. `emit` appends the primitives for
/// one component category, already styled for the current highlight state.
pub trait ModelCatalog {
    fn draw_order(&self) -> &[ComponentKind];

    fn base_color(&self, kind: ComponentKind) -> [f32; 4];

    fn emit(
        &self,
        kind: ComponentKind,
        style: &ComponentStyle,
        layout: &Layout,
        out: &mut Vec<DrawCmd>,
    ) -> Result<(), CatalogError>;
}

#[derive(Debug, Error)]
#[error("catalog failed to emit {kind}: {reason}")]
pub struct CatalogError {
    pub kind: &'static str,
    pub reason: String,
}

impl CatalogError {
    pub fn new(kind: ComponentKind, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.as_key(),
            reason: reason.into(),
        }
    }
}

/// Highlight rule: the highlighted component turns bright red, everything
/// else dims to translucent grey while any highlight is active.
pub fn resolve_style(
    kind: ComponentKind,
    highlight: Option<ComponentKind>,
    base_color: [f32; 4],
    detail: DetailLevel,
) -> ComponentStyle {
    let color = match highlight {
        Some(active) if active == kind => [1.0, 0.2, 0.1, 1.0],
        Some(_) => [0.5, 0.5, 0.5, 0.2],
        None => base_color,
    };
    ComponentStyle {
        color,
        brightness: 1.0,
        detail,
    }
}

struct CachedProgram {
    fingerprint: SceneFingerprint,
    program: DrawProgram,
    encoded: Vec<u8>,
}

/// The snapshot cache proper.
#[derive(Default)]
pub struct SnapshotCache {
    visible: VisibilityFlags,
    highlight: Option<ComponentKind>,
    detail: DetailLevel,
    cached: Option<CachedProgram>,
    replays: u64,
    recompiles: u64,
    failed_compiles: u64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self {
            visible: VisibilityFlags::all(),
            ..Self::default()
        }
    }

    pub fn fingerprint(&self) -> SceneFingerprint {
        SceneFingerprint {
            visible: self.visible,
            highlight: self.highlight,
        }
    }

    pub fn replays(&self) -> u64 {
        self.replays
    }

    pub fn recompiles(&self) -> u64 {
        self.recompiles
    }

    pub fn failed_compiles(&self) -> u64 {
        self.failed_compiles
    }

    pub fn is_visible(&self, kind: ComponentKind) -> bool {
        self.visible.contains(kind.visibility_bit())
    }

    pub fn highlight(&self) -> Option<ComponentKind> {
        self.highlight
    }

    pub fn set_visible(&mut self, kind: ComponentKind, visible: bool) {
        self.visible.set(kind.visibility_bit(), visible);
    }

    /// Unknown keys are ignored, never an error.
    pub fn set_visibility_key(&mut self, key: &str, visible: bool) {
        match ComponentKind::from_key(key) {
            Some(kind) => self.set_visible(kind, visible),
            None => debug!(
                target: "chipscope::snapshot",
                key,
                "visibility.unknown_key=ignored"
            ),
        }
    }

    pub fn set_highlight(&mut self, highlight: Option<ComponentKind>) {
        self.highlight = highlight;
    }

    /// Unknown keys clear the highlight.
    pub fn set_highlight_key(&mut self, key: &str) {
        self.highlight = ComponentKind::from_key(key);
        if self.highlight.is_none() {
            debug!(
                target: "chipscope::snapshot",
                key,
                "highlight.unknown_key=cleared"
            );
        }
    }

    pub fn set_detail(&mut self, detail: DetailLevel) {
        if self.detail != detail {
            self.detail = detail;
            // Detail feeds compiled geometry, so the cached artifact is
            // stale even though the fingerprint did not move.
            self.cached = None;
        }
    }

    /// Drop the cached artifact (used on wholesale layout replacement).
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Serve the compiled program for the current fingerprint.
    ///
    /// On a fingerprint match the cached artifact is replayed. On mismatch
    /// a new artifact is compiled; if compilation fails the previous valid
    /// artifact is retained and served (stale-but-valid beats blank).
    /// `None` only when there has never been a successful compile.
    pub fn render(
        &mut self,
        catalog: &dyn ModelCatalog,
        layout: &Layout,
        tick: u64,
    ) -> Option<&DrawProgram> {
        let fingerprint = self.fingerprint();
        let hit = self
            .cached
            .as_ref()
            .is_some_and(|cached| cached.fingerprint == fingerprint);

        if hit {
            self.replays += 1;
        } else {
            let _scope = TimedScope::new("snapshot3d.compile");
            match compile_program(catalog, layout, &fingerprint, self.detail, tick) {
                Ok(program) => match encode_program(&program) {
                    Ok(encoded) => {
                        self.recompiles += 1;
                        debug!(
                            target: "chipscope::snapshot",
                            tick,
                            ops = program.header.op_count,
                            fingerprint = fingerprint.hash64(),
                            "cache.recompiled"
                        );
                        self.cached = Some(CachedProgram {
                            fingerprint,
                            program,
                            encoded,
                        });
                    }
                    Err(err) => {
                        self.failed_compiles += 1;
                        warn!(
                            target: "chipscope::snapshot",
                            error = %err,
                            "cache.encode_failed=serving_stale"
                        );
                    }
                },
                Err(err) => {
                    self.failed_compiles += 1;
                    warn!(
                        target: "chipscope::snapshot",
                        error = %err,
                        "cache.compile_failed=serving_stale"
                    );
                }
            }
        }

        self.cached.as_ref().map(|cached| &cached.program)
    }

    /// Byte encoding of the cached artifact, for hosts that forward it.
    pub fn encoded_program(&self) -> Option<&[u8]> {
        self.cached.as_ref().map(|cached| cached.encoded.as_slice())
    }
}

fn compile_program(
    catalog: &dyn ModelCatalog,
    layout: &Layout,
    fingerprint: &SceneFingerprint,
    detail: DetailLevel,
    tick: u64,
) -> Result<DrawProgram, CatalogError> {
    let mut ops = Vec::new();
    for &kind in catalog.draw_order() {
        if !fingerprint.visible.contains(kind.visibility_bit()) {
            continue;
        }
        let style = resolve_style(kind, fingerprint.highlight, catalog.base_color(kind), detail);
        catalog.emit(kind, &style, layout, &mut ops)?;
    }
    Ok(DrawProgram::new(tick, fingerprint, ops))
}

/// Click-triggered workflow animations, each with its own frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    Matmul,
    MemoryFlow,
    SubUnitExecution,
    DieLayout,
}

impl WorkflowKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "matmul" => Some(WorkflowKind::Matmul),
            "memory_flow" => Some(WorkflowKind::MemoryFlow),
            "sub_unit_execution" => Some(WorkflowKind::SubUnitExecution),
            "die_layout" => Some(WorkflowKind::DieLayout),
            _ => None,
        }
    }

    pub fn total_frames(self) -> u32 {
        match self {
            WorkflowKind::Matmul => 120,
            WorkflowKind::MemoryFlow => 100,
            WorkflowKind::SubUnitExecution => 80,
            WorkflowKind::DieLayout => 60,
        }
    }

    fn focus_component(self) -> ComponentKind {
        match self {
            WorkflowKind::Matmul | WorkflowKind::SubUnitExecution | WorkflowKind::DieLayout => {
                ComponentKind::Die
            }
            WorkflowKind::MemoryFlow => ComponentKind::Vram,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowAnimation {
    pub kind: WorkflowKind,
    pub frame: u32,
}

impl WorkflowAnimation {
    pub fn new(kind: WorkflowKind) -> Self {
        Self { kind, frame: 0 }
    }

    pub fn progress(&self) -> f32 {
        self.frame as f32 / self.kind.total_frames() as f32
    }

    pub fn finished(&self) -> bool {
        self.frame >= self.kind.total_frames()
    }

    pub fn advance(&mut self) {
        if !self.finished() {
            self.frame += 1;
        }
    }
}

/// Per-tick dynamic effects, emitted fresh every frame outside the cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayState {
    pub hover: Option<ComponentKind>,
    pub workflow: Option<WorkflowAnimation>,
}

impl OverlayState {
    pub fn set_hover(&mut self, hover: Option<ComponentKind>) {
        self.hover = hover;
    }

    pub fn start_workflow(&mut self, kind: WorkflowKind) {
        self.workflow = Some(WorkflowAnimation::new(kind));
    }

    /// Advance the workflow one frame, retiring it when done.
    pub fn advance(&mut self) {
        if let Some(animation) = self.workflow.as_mut() {
            animation.advance();
            if animation.finished() {
                self.workflow = None;
            }
        }
    }

    /// Build the overlay ops for this frame. Catalog failures here are
    /// advisory: the affected effect is skipped, nothing propagates.
    pub fn build(
        &self,
        catalog: &dyn ModelCatalog,
        layout: &Layout,
        time_s: f32,
    ) -> Vec<DrawCmd> {
        let mut ops = Vec::new();

        if let Some(hovered) = self.hover {
            let pulse = 0.7 + 0.3 * (10.0 * time_s).sin();
            let mut style = resolve_style(hovered, None, catalog.base_color(hovered), DetailLevel::Low);
            style.brightness = pulse;
            if let Err(err) = catalog.emit(hovered, &style, layout, &mut ops) {
                debug!(
                    target: "chipscope::snapshot",
                    error = %err,
                    "overlay.hover_skipped"
                );
            }
        }

        if let Some(animation) = self.workflow {
            let focus = animation.kind.focus_component();
            let mut style = resolve_style(focus, None, catalog.base_color(focus), DetailLevel::Low);
            style.brightness = 0.5 + 0.5 * animation.progress();
            if let Err(err) = catalog.emit(focus, &style, layout, &mut ops) {
                debug!(
                    target: "chipscope::snapshot",
                    error = %err,
                    "overlay.workflow_skipped"
                );
            }
            // Progress sweep across the scene footprint.
            ops.push(DrawCmd::Line {
                from: [-1.0, 1.2, 0.0],
                to: [-1.0 + 2.0 * animation.progress(), 1.2, 0.0],
                width: 2.0,
                color: [1.0, 1.0, 1.0, 0.8],
            });
        }

        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BlockModelCatalog;

    struct FailingCatalog {
        order: [ComponentKind; 1],
    }

    impl FailingCatalog {
        fn new() -> Self {
            Self {
                order: [ComponentKind::Die],
            }
        }
    }

    impl ModelCatalog for FailingCatalog {
        fn draw_order(&self) -> &[ComponentKind] {
            &self.order
        }

        fn base_color(&self, _kind: ComponentKind) -> [f32; 4] {
            [0.0, 0.0, 0.0, 1.0]
        }

        fn emit(
            &self,
            kind: ComponentKind,
            _style: &ComponentStyle,
            _layout: &Layout,
            _out: &mut Vec<DrawCmd>,
        ) -> Result<(), CatalogError> {
            Err(CatalogError::new(kind, "geometry asset unavailable"))
        }
    }

    fn fixture() -> (SnapshotCache, BlockModelCatalog, Layout) {
        (
            SnapshotCache::new(),
            BlockModelCatalog::new(),
            Layout::from_spec("Test", 2, 2, 8),
        )
    }

    #[test]
    fn matching_fingerprint_replays_without_recompiling() {
        let (mut cache, catalog, layout) = fixture();
        cache.render(&catalog, &layout, 1).expect("compiles");
        assert_eq!(cache.recompiles(), 1);

        cache.render(&catalog, &layout, 2).expect("replays");
        cache.render(&catalog, &layout, 3).expect("replays");
        assert_eq!(cache.recompiles(), 1);
        assert_eq!(cache.replays(), 2);
    }

    #[test]
    fn visibility_toggle_forces_exactly_one_recompile() {
        let (mut cache, catalog, layout) = fixture();
        cache.render(&catalog, &layout, 1);
        let first_hash = cache
            .render(&catalog, &layout, 1)
            .expect("cached")
            .header
            .content_hash;

        cache.set_visible(ComponentKind::Cooling, false);
        let second_hash = cache
            .render(&catalog, &layout, 2)
            .expect("recompiled")
            .header
            .content_hash;
        assert_ne!(first_hash, second_hash);
        assert_eq!(cache.recompiles(), 2);
    }

    #[test]
    fn double_toggle_within_one_render_is_one_net_recompile() {
        let (mut cache, catalog, layout) = fixture();
        cache.render(&catalog, &layout, 1);
        assert_eq!(cache.recompiles(), 1);

        // Toggle off and back on before the next render request.
        cache.set_visible(ComponentKind::Pcb, false);
        cache.set_visible(ComponentKind::Pcb, true);
        cache.render(&catalog, &layout, 2);
        assert!(cache.is_visible(ComponentKind::Pcb));
        assert_eq!(cache.recompiles(), 1);
        assert_eq!(cache.replays(), 1);
    }

    #[test]
    fn highlight_changes_the_fingerprint() {
        let (mut cache, catalog, layout) = fixture();
        let base = cache.fingerprint().hash64();
        cache.set_highlight_key("die");
        assert_ne!(cache.fingerprint().hash64(), base);
        cache.render(&catalog, &layout, 1);
        cache.set_highlight(None);
        cache.render(&catalog, &layout, 2);
        assert_eq!(cache.recompiles(), 2);
    }

    #[test]
    fn unknown_highlight_key_clears() {
        let (mut cache, _catalog, _layout) = fixture();
        cache.set_highlight(Some(ComponentKind::Vram));
        cache.set_highlight_key("flux_capacitor");
        assert_eq!(cache.highlight(), None);
    }

    #[test]
    fn unknown_visibility_key_is_a_no_op() {
        let (mut cache, _catalog, _layout) = fixture();
        let before = cache.fingerprint();
        cache.set_visibility_key("flux_capacitor", false);
        assert_eq!(cache.fingerprint(), before);
    }

    #[test]
    fn compile_failure_retains_previous_artifact() {
        let (mut cache, catalog, layout) = fixture();
        let good_hash = cache
            .render(&catalog, &layout, 1)
            .expect("compiles")
            .header
            .content_hash;

        cache.set_visible(ComponentKind::Traces, false);
        let failing = FailingCatalog::new();
        let served = cache.render(&failing, &layout, 2).expect("stale served");
        assert_eq!(served.header.content_hash, good_hash);
        assert_eq!(cache.failed_compiles(), 1);

        // The stale fingerprint is still the old one, so a working catalog
        // recompiles on the next request.
        cache.render(&catalog, &layout, 3);
        assert_eq!(cache.recompiles(), 2);
    }

    #[test]
    fn compile_failure_with_empty_cache_yields_none() {
        let mut cache = SnapshotCache::new();
        let layout = Layout::from_spec("Test", 1, 1, 4);
        let failing = FailingCatalog::new();
        assert!(cache.render(&failing, &layout, 1).is_none());
    }

    #[test]
    fn highlighted_style_is_bright_red_and_others_dim() {
        let highlighted = resolve_style(
            ComponentKind::Die,
            Some(ComponentKind::Die),
            [0.1, 0.6, 0.1, 1.0],
            DetailLevel::Standard,
        );
        assert_eq!(highlighted.color, [1.0, 0.2, 0.1, 1.0]);

        let dimmed = resolve_style(
            ComponentKind::Pcb,
            Some(ComponentKind::Die),
            [0.1, 0.6, 0.1, 1.0],
            DetailLevel::Standard,
        );
        assert_eq!(dimmed.color, [0.5, 0.5, 0.5, 0.2]);

        let normal = resolve_style(
            ComponentKind::Pcb,
            None,
            [0.1, 0.6, 0.1, 1.0],
            DetailLevel::Standard,
        );
        assert_eq!(normal.color, [0.1, 0.6, 0.1, 1.0]);
    }

    #[test]
    fn overlay_never_touches_the_cache() {
        let (mut cache, catalog, layout) = fixture();
        cache.render(&catalog, &layout, 1);
        let fingerprint = cache.fingerprint();

        let mut overlay = OverlayState::default();
        overlay.set_hover(Some(ComponentKind::Cooling));
        overlay.start_workflow(WorkflowKind::Matmul);
        for frame in 0..200 {
            let ops = overlay.build(&catalog, &layout, frame as f32 / 60.0);
            if frame < 120 {
                assert!(!ops.is_empty());
            }
            overlay.advance();
        }

        assert_eq!(cache.fingerprint(), fingerprint);
        cache.render(&catalog, &layout, 2);
        assert_eq!(cache.recompiles(), 1);
        assert!(overlay.workflow.is_none());
    }

    #[test]
    fn workflow_progress_runs_zero_to_one() {
        let mut animation = WorkflowAnimation::new(WorkflowKind::DieLayout);
        assert_eq!(animation.progress(), 0.0);
        for _ in 0..WorkflowKind::DieLayout.total_frames() {
            animation.advance();
        }
        assert!(animation.finished());
        assert_eq!(animation.progress(), 1.0);
    }
}
