//! Data contracts crossing the core/renderer boundary: the layout
//! interchange document, the compiled draw program, the visibility
//! capability set, and the scene fingerprint that keys the snapshot cache.

use ahash::RandomState;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::hash::{BuildHasher, Hash, Hasher};

/// Hierarchical layout interchange document.
///
/// Every field is defaulted so a partially-specified document still yields a
/// usable (possibly empty) layout on import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutDoc {
    pub name: String,
    pub lanes_per_sub_unit: u32,
    pub clusters: Vec<ClusterDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterDoc {
    pub id: u32,
    pub sub_units: Vec<SubUnitDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SubUnitDoc {
    pub id: u32,
    /// Lane IDs; each produces a fresh lane with default telemetry.
    pub lanes: Vec<u32>,
}

/// Drawable component categories of the 3-D model view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Chassis,
    Cooling,
    Pcb,
    Die,
    Vram,
    PowerDelivery,
    Backplate,
    IoBracket,
    Microscopic,
    Traces,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 10] = [
        ComponentKind::Chassis,
        ComponentKind::Cooling,
        ComponentKind::Pcb,
        ComponentKind::Die,
        ComponentKind::Vram,
        ComponentKind::PowerDelivery,
        ComponentKind::Backplate,
        ComponentKind::IoBracket,
        ComponentKind::Microscopic,
        ComponentKind::Traces,
    ];

    pub fn as_key(self) -> &'static str {
        match self {
            ComponentKind::Chassis => "chassis",
            ComponentKind::Cooling => "cooling",
            ComponentKind::Pcb => "pcb",
            ComponentKind::Die => "die",
            ComponentKind::Vram => "vram",
            ComponentKind::PowerDelivery => "power_delivery",
            ComponentKind::Backplate => "backplate",
            ComponentKind::IoBracket => "io_bracket",
            ComponentKind::Microscopic => "microscopic",
            ComponentKind::Traces => "traces",
        }
    }

    /// Unknown keys yield `None`; callers treat that as a no-op.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_key() == key)
    }

    pub fn visibility_bit(self) -> VisibilityFlags {
        match self {
            ComponentKind::Chassis => VisibilityFlags::CHASSIS,
            ComponentKind::Cooling => VisibilityFlags::COOLING,
            ComponentKind::Pcb => VisibilityFlags::PCB,
            ComponentKind::Die => VisibilityFlags::DIE,
            ComponentKind::Vram => VisibilityFlags::VRAM,
            ComponentKind::PowerDelivery => VisibilityFlags::POWER_DELIVERY,
            ComponentKind::Backplate => VisibilityFlags::BACKPLATE,
            ComponentKind::IoBracket => VisibilityFlags::IO_BRACKET,
            ComponentKind::Microscopic => VisibilityFlags::MICROSCOPIC,
            ComponentKind::Traces => VisibilityFlags::TRACES,
        }
    }
}

bitflags! {
    /// Capability set of boolean visibility toggles, one per drawable
    /// category. Feeds the scene fingerprint together with the highlight.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct VisibilityFlags: u16 {
        const CHASSIS = 1 << 0;
        const COOLING = 1 << 1;
        const PCB = 1 << 2;
        const DIE = 1 << 3;
        const VRAM = 1 << 4;
        const POWER_DELIVERY = 1 << 5;
        const BACKPLATE = 1 << 6;
        const IO_BRACKET = 1 << 7;
        const MICROSCOPIC = 1 << 8;
        const TRACES = 1 << 9;
    }
}

impl Default for VisibilityFlags {
    fn default() -> Self {
        VisibilityFlags::all()
    }
}

/// State tuple that determines the compiled scene: which categories are
/// visible plus the active highlight. Dynamic overlays never enter here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SceneFingerprint {
    pub visible: VisibilityFlags,
    pub highlight: Option<ComponentKind>,
}

impl SceneFingerprint {
    pub fn hash64(&self) -> u64 {
        let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
        self.visible.bits().hash(&mut hasher);
        self.highlight.map(ComponentKind::as_key).hash(&mut hasher);
        hasher.finish()
    }
}

/// Rendering detail hint consumed by model catalogs. Mapping a level to
/// cosmetic geometry density (fin/blade counts) is catalog-owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DetailLevel {
    Low,
    #[default]
    Standard,
    Ultra,
}

/// Per-component style resolved from the highlight state before a catalog
/// emits geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentStyle {
    pub color: [f32; 4],
    pub brightness: f32,
    pub detail: DetailLevel,
}

impl ComponentStyle {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            brightness: 1.0,
            detail: DetailLevel::Standard,
        }
    }
}

/// One primitive of a compiled draw program. Catalogs emit these; the
/// renderer replays them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCmd {
    Box {
        min: [f32; 3],
        max: [f32; 3],
        color: [f32; 4],
    },
    Cylinder {
        center: [f32; 3],
        radius: f32,
        height: f32,
        color: [f32; 4],
    },
    Line {
        from: [f32; 3],
        to: [f32; 3],
        width: f32,
        color: [f32; 4],
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawHeader {
    pub tick: u64,
    pub op_count: u32,
    pub fingerprint_hash: u64,
    pub content_hash: u64,
}

/// Compiled draw artifact: header plus the ordered primitive ops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawProgram {
    pub header: DrawHeader,
    pub ops: Vec<DrawCmd>,
}

impl DrawProgram {
    pub fn new(tick: u64, fingerprint: &SceneFingerprint, ops: Vec<DrawCmd>) -> Self {
        let program = Self {
            header: DrawHeader {
                tick,
                op_count: ops.len() as u32,
                fingerprint_hash: fingerprint.hash64(),
                content_hash: 0,
            },
            ops,
        };
        program.finalize()
    }

    fn finalize(mut self) -> Self {
        self.header.content_hash = hash_program(&self);
        self
    }
}

/// Deterministic content hash over the encoded program, header hash zeroed.
pub fn hash_program(program: &DrawProgram) -> u64 {
    let mut clone = program.clone();
    clone.header.content_hash = 0;
    let encoded = bincode::serialize(&clone).expect("draw program serialization for hashing");
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    hasher.write(&encoded);
    hasher.finish()
}

pub fn encode_program(program: &DrawProgram) -> Result<Vec<u8>, ProtoError> {
    Ok(bincode::serialize(program)?)
}

pub fn decode_program(bytes: &[u8]) -> Result<DrawProgram, ProtoError> {
    Ok(bincode::deserialize(bytes)?)
}

#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("draw program encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_doc_defaults_missing_fields() {
        let doc: LayoutDoc = serde_json::from_str("{}").expect("empty document parses");
        assert_eq!(doc.name, "");
        assert_eq!(doc.lanes_per_sub_unit, 0);
        assert!(doc.clusters.is_empty());
    }

    #[test]
    fn layout_doc_uses_camel_case_keys() {
        let doc = LayoutDoc {
            name: "Demo".to_string(),
            lanes_per_sub_unit: 32,
            clusters: vec![ClusterDoc {
                id: 0,
                sub_units: vec![SubUnitDoc {
                    id: 0,
                    lanes: vec![0, 1],
                }],
            }],
        };
        let json = serde_json::to_string(&doc).expect("document serializes");
        assert!(json.contains("\"lanesPerSubUnit\":32"));
        assert!(json.contains("\"subUnits\""));
        let back: LayoutDoc = serde_json::from_str(&json).expect("round-trip parses");
        assert_eq!(back, doc);
    }

    #[test]
    fn component_kind_keys_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_key(kind.as_key()), Some(kind));
        }
        assert_eq!(ComponentKind::from_key("warp_drive"), None);
    }

    #[test]
    fn fingerprint_hash_tracks_visibility_and_highlight() {
        let base = SceneFingerprint::default();
        let mut toggled = base;
        toggled.visible.remove(VisibilityFlags::COOLING);
        assert_ne!(base.hash64(), toggled.hash64());

        let highlighted = SceneFingerprint {
            highlight: Some(ComponentKind::Die),
            ..base
        };
        assert_ne!(base.hash64(), highlighted.hash64());
        assert_eq!(base.hash64(), SceneFingerprint::default().hash64());
    }

    #[test]
    fn program_content_hash_is_stable() {
        let fingerprint = SceneFingerprint::default();
        let ops = vec![DrawCmd::Box {
            min: [0.0, 0.0, 0.0],
            max: [1.0, 1.0, 1.0],
            color: [0.2, 0.3, 0.4, 1.0],
        }];
        let a = DrawProgram::new(7, &fingerprint, ops.clone());
        let b = DrawProgram::new(7, &fingerprint, ops);
        assert_eq!(a.header.content_hash, b.header.content_hash);
        assert_eq!(a.header.op_count, 1);

        let encoded = encode_program(&a).expect("program encodes");
        let decoded = decode_program(&encoded).expect("program decodes");
        assert_eq!(decoded, a);
    }
}
