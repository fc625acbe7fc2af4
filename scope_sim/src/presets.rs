//! Named parametric layout presets.
//!
//! The catalog is an explicit value handed to whoever constructs the driver;
//! there is no process-wide registry.

use crate::model::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPreset {
    pub key: &'static str,
    pub display_name: &'static str,
    pub clusters: u32,
    pub sub_units_per_cluster: u32,
    pub lanes_per_sub_unit: u32,
}

impl LayoutPreset {
    pub fn build(&self) -> Layout {
        Layout::from_spec(
            self.display_name,
            self.clusters,
            self.sub_units_per_cluster,
            self.lanes_per_sub_unit,
        )
    }
}

#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<LayoutPreset>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        Self {
            presets: BUILTIN_PRESETS.to_vec(),
        }
    }

    /// Lookup by key; unknown keys return `None`.
    pub fn get(&self, key: &str) -> Option<Layout> {
        self.presets
            .iter()
            .find(|preset| preset.key == key)
            .map(LayoutPreset::build)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.presets.iter().map(|preset| preset.key)
    }

    pub fn presets(&self) -> &[LayoutPreset] {
        &self.presets
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN_PRESETS: &[LayoutPreset] = &[
    LayoutPreset {
        key: "rtx_4090",
        display_name: "RTX 4090",
        clusters: 7,
        sub_units_per_cluster: 9,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "rtx_4080",
        display_name: "RTX 4080",
        clusters: 5,
        sub_units_per_cluster: 7,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "rtx_4070_ti",
        display_name: "RTX 4070 Ti",
        clusters: 6,
        sub_units_per_cluster: 8,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "rtx_4070",
        display_name: "RTX 4070",
        clusters: 5,
        sub_units_per_cluster: 7,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "rtx_4060_ti",
        display_name: "RTX 4060 Ti",
        clusters: 4,
        sub_units_per_cluster: 6,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "rtx_4060",
        display_name: "RTX 4060",
        clusters: 3,
        sub_units_per_cluster: 6,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "rx_7900_xtx",
        display_name: "RX 7900 XTX",
        clusters: 12,
        sub_units_per_cluster: 2,
        lanes_per_sub_unit: 64,
    },
    LayoutPreset {
        key: "rx_7900_xt",
        display_name: "RX 7900 XT",
        clusters: 10,
        sub_units_per_cluster: 2,
        lanes_per_sub_unit: 64,
    },
    LayoutPreset {
        key: "rx_7800_xt",
        display_name: "RX 7800 XT",
        clusters: 8,
        sub_units_per_cluster: 2,
        lanes_per_sub_unit: 64,
    },
    LayoutPreset {
        key: "rx_7700_xt",
        display_name: "RX 7700 XT",
        clusters: 6,
        sub_units_per_cluster: 2,
        lanes_per_sub_unit: 64,
    },
    LayoutPreset {
        key: "h100_sxm5",
        display_name: "H100 SXM5",
        clusters: 8,
        sub_units_per_cluster: 18,
        lanes_per_sub_unit: 128,
    },
    LayoutPreset {
        key: "compact_demo",
        display_name: "Compact",
        clusters: 3,
        sub_units_per_cluster: 4,
        lanes_per_sub_unit: 32,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_resolves_known_keys() {
        let catalog = PresetCatalog::builtin();
        let layout = catalog.get("rtx_4090").expect("preset exists");
        assert_eq!(layout.clusters.len(), 7);
        assert_eq!(layout.sub_unit_count(), 63);
        assert_eq!(layout.lanes_per_sub_unit, 128);
    }

    #[test]
    fn unknown_key_is_none() {
        let catalog = PresetCatalog::builtin();
        assert!(catalog.get("voodoo_2").is_none());
    }

    #[test]
    fn preset_keys_are_unique() {
        let catalog = PresetCatalog::builtin();
        let mut keys: Vec<_> = catalog.keys().collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}
