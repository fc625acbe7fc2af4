//! Fixed-topology processor hierarchy: Lane → SubUnit → Cluster → Layout.
//!
//! Topology is immutable after construction; only the scalar telemetry
//! fields mutate, and only the simulation driver mutates them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use scope_proto::{ClusterDoc, LayoutDoc, SubUnitDoc};
use thiserror::Error;

use crate::scalar::Scalar;

/// Leaf element carrying per-tick telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub id: u32,
    pub activity: Scalar,
    pub temperature: Scalar,
    pub mem_pressure: Scalar,
}

impl Lane {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            activity: Scalar::zero(),
            temperature: Scalar::from_f32(0.3),
            mem_pressure: Scalar::from_f32(0.2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubUnit {
    pub id: u32,
    pub lanes: Vec<Lane>,
    pub activity: Scalar,
}

impl SubUnit {
    pub fn new(id: u32, lanes: Vec<Lane>) -> Self {
        Self {
            id,
            lanes,
            activity: Scalar::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: u32,
    pub sub_units: Vec<SubUnit>,
}

/// Root of the hierarchy; owns the whole tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    pub clusters: Vec<Cluster>,
    pub lanes_per_sub_unit: u32,
}

impl Layout {
    /// Parametric factory. Lane and sub-unit IDs are global counters during
    /// construction; cluster IDs run 0..cluster_count.
    pub fn from_spec(
        name: &str,
        cluster_count: u32,
        sub_units_per_cluster: u32,
        lanes_per_sub_unit: u32,
    ) -> Self {
        let mut clusters = Vec::with_capacity(cluster_count as usize);
        let mut lane_id = 0u32;
        let mut sub_unit_id = 0u32;
        for cluster_id in 0..cluster_count {
            let mut sub_units = Vec::with_capacity(sub_units_per_cluster as usize);
            for _ in 0..sub_units_per_cluster {
                let lanes = (0..lanes_per_sub_unit)
                    .map(|offset| Lane::new(lane_id + offset))
                    .collect();
                lane_id += lanes_per_sub_unit;
                sub_units.push(SubUnit::new(sub_unit_id, lanes));
                sub_unit_id += 1;
            }
            clusters.push(Cluster {
                id: cluster_id,
                sub_units,
            });
        }
        Self {
            name: name.to_string(),
            clusters,
            lanes_per_sub_unit,
        }
    }

    /// Build a layout from an interchange document. Missing fields have
    /// already been defaulted during deserialization; lane entries are IDs
    /// producing fresh lanes with default telemetry.
    pub fn from_doc(doc: &LayoutDoc) -> Self {
        let name = if doc.name.is_empty() {
            "Custom".to_string()
        } else {
            doc.name.clone()
        };
        let lanes_per_sub_unit = if doc.lanes_per_sub_unit == 0 {
            64
        } else {
            doc.lanes_per_sub_unit
        };
        let clusters = doc
            .clusters
            .iter()
            .map(|cluster| Cluster {
                id: cluster.id,
                sub_units: cluster
                    .sub_units
                    .iter()
                    .map(|sub_unit| {
                        SubUnit::new(
                            sub_unit.id,
                            sub_unit.lanes.iter().map(|&id| Lane::new(id)).collect(),
                        )
                    })
                    .collect(),
            })
            .collect();
        Self {
            name,
            clusters,
            lanes_per_sub_unit,
        }
    }

    pub fn to_doc(&self) -> LayoutDoc {
        LayoutDoc {
            name: self.name.clone(),
            lanes_per_sub_unit: self.lanes_per_sub_unit,
            clusters: self
                .clusters
                .iter()
                .map(|cluster| ClusterDoc {
                    id: cluster.id,
                    sub_units: cluster
                        .sub_units
                        .iter()
                        .map(|sub_unit| SubUnitDoc {
                            id: sub_unit.id,
                            lanes: sub_unit.lanes.iter().map(|lane| lane.id).collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, LayoutDocError> {
        let doc: LayoutDoc = serde_json::from_str(json)?;
        Ok(Self::from_doc(&doc))
    }

    pub fn to_json_string(&self) -> Result<String, LayoutDocError> {
        Ok(serde_json::to_string_pretty(&self.to_doc())?)
    }

    pub fn from_file(path: &Path) -> Result<Self, LayoutDocError> {
        let contents = fs::read_to_string(path).map_err(|source| LayoutDocError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), LayoutDocError> {
        let json = self.to_json_string()?;
        fs::write(path, json).map_err(|source| LayoutDocError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn total_lanes(&self) -> usize {
        self.clusters
            .iter()
            .flat_map(|cluster| cluster.sub_units.iter())
            .map(|sub_unit| sub_unit.lanes.len())
            .sum()
    }

    pub fn sub_unit_count(&self) -> usize {
        self.clusters
            .iter()
            .map(|cluster| cluster.sub_units.len())
            .sum()
    }

    pub fn sub_units(&self) -> impl Iterator<Item = &SubUnit> {
        self.clusters
            .iter()
            .flat_map(|cluster| cluster.sub_units.iter())
    }

    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.sub_units().flat_map(|sub_unit| sub_unit.lanes.iter())
    }
}

#[derive(Debug, Error)]
pub enum LayoutDocError {
    #[error("failed to parse layout document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read layout document from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write layout document to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
