//! Built-in block model catalog.
//!
//! Renderer-grade catalogs live outside the core; this one emits simple
//! axis-aligned blocks per component so the snapshot cache, the headless
//! binary, and the tests have real geometry to compile. Detail-to-density
//! mapping is catalog-owned.

use scope_proto::{ComponentKind, ComponentStyle, DetailLevel, DrawCmd};

use crate::model::Layout;
use crate::snapshot3d::{CatalogError, ModelCatalog};

pub struct BlockModelCatalog {
    order: Vec<ComponentKind>,
}

impl BlockModelCatalog {
    pub fn new() -> Self {
        // Back-to-front paint order for translucent parts.
        Self {
            order: vec![
                ComponentKind::Backplate,
                ComponentKind::Pcb,
                ComponentKind::Traces,
                ComponentKind::Microscopic,
                ComponentKind::PowerDelivery,
                ComponentKind::Vram,
                ComponentKind::Die,
                ComponentKind::Cooling,
                ComponentKind::IoBracket,
                ComponentKind::Chassis,
            ],
        }
    }

    fn fin_count(detail: DetailLevel) -> usize {
        match detail {
            DetailLevel::Low => 8,
            DetailLevel::Standard => 24,
            DetailLevel::Ultra => 64,
        }
    }
}

impl Default for BlockModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn shaded(style: &ComponentStyle) -> [f32; 4] {
    [
        style.color[0] * style.brightness,
        style.color[1] * style.brightness,
        style.color[2] * style.brightness,
        style.color[3],
    ]
}

fn boxed(min: [f32; 3], max: [f32; 3], style: &ComponentStyle) -> DrawCmd {
    DrawCmd::Box {
        min,
        max,
        color: shaded(style),
    }
}

impl ModelCatalog for BlockModelCatalog {
    fn draw_order(&self) -> &[ComponentKind] {
        &self.order
    }

    fn base_color(&self, kind: ComponentKind) -> [f32; 4] {
        match kind {
            ComponentKind::Chassis => [0.35, 0.35, 0.38, 0.5],
            ComponentKind::Cooling => [0.55, 0.57, 0.60, 1.0],
            ComponentKind::Pcb => [0.05, 0.25, 0.08, 1.0],
            ComponentKind::Die => [0.15, 0.15, 0.2, 1.0],
            ComponentKind::Vram => [0.1, 0.1, 0.12, 1.0],
            ComponentKind::PowerDelivery => [0.3, 0.28, 0.2, 1.0],
            ComponentKind::Backplate => [0.2, 0.2, 0.22, 1.0],
            ComponentKind::IoBracket => [0.6, 0.6, 0.62, 1.0],
            ComponentKind::Microscopic => [0.4, 0.4, 0.42, 1.0],
            ComponentKind::Traces => [0.7, 0.55, 0.2, 1.0],
        }
    }

    fn emit(
        &self,
        kind: ComponentKind,
        style: &ComponentStyle,
        layout: &Layout,
        out: &mut Vec<DrawCmd>,
    ) -> Result<(), CatalogError> {
        match kind {
            ComponentKind::Chassis => {
                out.push(boxed([-1.1, -0.5, -0.3], [1.1, 0.5, 0.3], style));
            }
            ComponentKind::Backplate => {
                out.push(boxed([-1.05, -0.45, -0.28], [1.05, 0.45, -0.26], style));
            }
            ComponentKind::Pcb => {
                out.push(boxed([-1.0, -0.4, -0.25], [1.0, 0.4, -0.2], style));
            }
            ComponentKind::IoBracket => {
                out.push(boxed([-1.15, -0.45, -0.3], [-1.1, 0.45, 0.3], style));
            }
            ComponentKind::Die => {
                // One block per sub-unit, laid out cluster-major.
                let sub_units = layout.sub_unit_count().max(1);
                let cols = (sub_units as f32).sqrt().ceil() as usize;
                let cell = 0.5 / cols as f32;
                for index in 0..sub_units {
                    let row = index / cols;
                    let col = index % cols;
                    let x = -0.25 + col as f32 * cell;
                    let y = -0.25 + row as f32 * cell;
                    out.push(boxed(
                        [x, y, -0.2],
                        [x + cell * 0.9, y + cell * 0.9, -0.15],
                        style,
                    ));
                }
            }
            ComponentKind::Vram => {
                // One chip per cluster, ringed around the die.
                let chips = layout.clusters.len().max(1);
                for index in 0..chips {
                    let angle = index as f32 / chips as f32 * std::f32::consts::TAU;
                    let x = 0.5 * angle.cos();
                    let y = 0.35 * angle.sin();
                    out.push(boxed(
                        [x - 0.06, y - 0.04, -0.2],
                        [x + 0.06, y + 0.04, -0.17],
                        style,
                    ));
                }
            }
            ComponentKind::PowerDelivery => {
                for phase in 0..8 {
                    let x = 0.7 + (phase % 4) as f32 * 0.08;
                    let y = -0.3 + (phase / 4) as f32 * 0.12;
                    out.push(boxed([x, y, -0.2], [x + 0.06, y + 0.08, -0.14], style));
                }
            }
            ComponentKind::Cooling => {
                for fan in 0..2 {
                    out.push(DrawCmd::Cylinder {
                        center: [-0.5 + fan as f32, 0.0, 0.1],
                        radius: 0.35,
                        height: 0.1,
                        color: shaded(style),
                    });
                }
                let fins = Self::fin_count(style.detail);
                let pitch = 2.0 / fins as f32;
                for fin in 0..fins {
                    let x = -1.0 + fin as f32 * pitch;
                    out.push(boxed([x, -0.4, -0.1], [x + pitch * 0.4, 0.4, 0.05], style));
                }
            }
            ComponentKind::Microscopic => {
                if style.detail == DetailLevel::Ultra {
                    for index in 0..32 {
                        let x = -0.9 + (index % 8) as f32 * 0.05;
                        let y = 0.3 + (index / 8) as f32 * 0.03;
                        out.push(boxed(
                            [x, y, -0.2],
                            [x + 0.01, y + 0.01, -0.19],
                            style,
                        ));
                    }
                }
            }
            ComponentKind::Traces => {
                let runs = layout.clusters.len().max(1).min(16);
                for run in 0..runs {
                    let y = -0.35 + run as f32 * (0.7 / runs as f32);
                    out.push(DrawCmd::Line {
                        from: [-0.25, y, -0.19],
                        to: [0.6, y, -0.19],
                        width: 1.0,
                        color: shaded(style),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_emits_something_at_ultra() {
        let catalog = BlockModelCatalog::new();
        let layout = Layout::from_spec("Test", 2, 2, 8);
        for &kind in catalog.draw_order() {
            let style = ComponentStyle {
                color: catalog.base_color(kind),
                brightness: 1.0,
                detail: DetailLevel::Ultra,
            };
            let mut ops = Vec::new();
            catalog
                .emit(kind, &style, &layout, &mut ops)
                .expect("emit succeeds");
            assert!(!ops.is_empty(), "{:?} emitted nothing", kind);
        }
    }

    #[test]
    fn detail_level_scales_cooling_density() {
        let catalog = BlockModelCatalog::new();
        let layout = Layout::from_spec("Test", 1, 1, 4);
        let mut low = Vec::new();
        let mut ultra = Vec::new();
        for (detail, ops) in [(DetailLevel::Low, &mut low), (DetailLevel::Ultra, &mut ultra)] {
            let style = ComponentStyle {
                color: catalog.base_color(ComponentKind::Cooling),
                brightness: 1.0,
                detail,
            };
            catalog
                .emit(ComponentKind::Cooling, &style, &layout, ops)
                .expect("emit succeeds");
        }
        assert!(ultra.len() > low.len());
    }

    #[test]
    fn die_blocks_track_sub_unit_count() {
        let catalog = BlockModelCatalog::new();
        let layout = Layout::from_spec("Test", 3, 4, 2);
        let style = ComponentStyle::new(catalog.base_color(ComponentKind::Die));
        let mut ops = Vec::new();
        catalog
            .emit(ComponentKind::Die, &style, &layout, &mut ops)
            .expect("emit succeeds");
        assert_eq!(ops.len(), 12);
    }
}
