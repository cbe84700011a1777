//! Footprint data model: master template, client map file, composed cells,
//! and the live engagement overlay.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use bevy::reflect::Reflect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hex_math::HexCoordinate;
use crate::slots::{MAX_SLOTS, SlotError, SlotCatalog, slot_label};

/// Semantic service category of a slot, e.g. `ELN` or `REGULATORY_AFFAIRS`.
///
/// Kept as an open string so unknown categories pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceAreaId(pub String);

impl ServiceAreaId {
    /// Raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceAreaId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ServiceAreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How engaged the client is in a service area.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Reflect,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementState {
    /// Baseline for every composed cell.
    #[default]
    NotEngaged,
    /// Engagement in progress.
    CurrentlyEngaged,
    /// Engagement being pursued.
    ActivelyPursuing,
}

impl EngagementState {
    /// All states in legend order.
    pub const ALL: [Self; 3] = [
        Self::NotEngaged,
        Self::CurrentlyEngaged,
        Self::ActivelyPursuing,
    ];

    /// Next state in legend order, wrapping around.
    pub fn cycle(self) -> Self {
        match self {
            Self::NotEngaged => Self::CurrentlyEngaged,
            Self::CurrentlyEngaged => Self::ActivelyPursuing,
            Self::ActivelyPursuing => Self::NotEngaged,
        }
    }

    /// Wire name, e.g. `NOT_ENGAGED`.
    pub fn key(self) -> &'static str {
        match self {
            Self::NotEngaged => "NOT_ENGAGED",
            Self::CurrentlyEngaged => "CURRENTLY_ENGAGED",
            Self::ActivelyPursuing => "ACTIVELY_PURSUING",
        }
    }
}

/// Per-cell drawing style. An empty `background_color` means "not overridden".
#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualProperties {
    /// Outline color, `#rrggbb`.
    pub border_color: String,
    /// Fill override, `#rrggbb` or empty.
    pub background_color: String,
    /// Outline width in pixels.
    pub border_thickness: f32,
    /// 0.0..=1.0.
    pub opacity: f32,
}

/// Partial style carried by one overlay record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualPatch {
    /// Replaces the outline color when set.
    pub border_color: Option<String>,
    /// Replaces the fill override when set.
    pub background_color: Option<String>,
    /// Replaces the outline width when set.
    pub border_thickness: Option<f32>,
    /// Replaces the opacity when set.
    pub opacity: Option<f32>,
}

impl VisualPatch {
    /// `base` with every field present in this patch replaced.
    pub fn apply_to(&self, base: &VisualProperties) -> VisualProperties {
        VisualProperties {
            border_color: self
                .border_color
                .clone()
                .unwrap_or_else(|| base.border_color.clone()),
            background_color: self
                .background_color
                .clone()
                .unwrap_or_else(|| base.background_color.clone()),
            border_thickness: self.border_thickness.unwrap_or(base.border_thickness),
            opacity: self.opacity.unwrap_or(base.opacity),
        }
    }
}

/// Template violations found at publish or load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Slot table problem inside one cluster.
    #[error(transparent)]
    Slot(#[from] SlotError),
    /// Two slots anywhere in the template share a cell id.
    #[error("cell id {id} used by more than one slot")]
    DuplicateCellId {
        /// Repeated id.
        id: String,
    },
    /// Two clusters share an id.
    #[error("duplicate cluster id {id}")]
    DuplicateCluster {
        /// Repeated id.
        id: String,
    },
}

/// One slot of a master-template cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Cluster-unique id. Map files may name it bare, matching it in every
    /// cluster, or qualified as [`cell_id`].
    pub id: String,
    /// Catalog position, 1..=10 (`C{index}`).
    pub index: u8,
    /// Offset from the cluster center.
    pub axial_offset: HexCoordinate,
    /// Service category assigned to this slot.
    pub service_area: ServiceAreaId,
    /// Service type whose abbreviation can label the cell.
    #[serde(default)]
    pub service_type_id: Option<String>,
    /// Label defined by the template itself.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Cell-level state key (`CLIENT_AREA`, ... or a legacy key).
    #[serde(default)]
    pub cell_state: Option<String>,
}

impl Slot {
    /// `C1`..`C10`.
    pub fn label(&self) -> String {
        slot_label(self.index)
    }
}

/// Template-unique id of the cell generated from `slot_id` in `cluster_id`.
pub fn cell_id(cluster_id: &str, slot_id: &str) -> String {
    format!("{cluster_id}-{slot_id}")
}

/// A named hexagonal region of up to ten slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster id, e.g. `H1` or `core-systems`.
    pub id: String,
    /// Optional title.
    #[serde(default)]
    pub label: Option<String>,
    /// Axial center.
    pub center_position: HexCoordinate,
    /// Ordered slots.
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl Cluster {
    fn validate(&self) -> Result<(), SlotError> {
        if self.slots.len() > MAX_SLOTS {
            return Err(SlotError::TooManySlots {
                cluster: self.id.clone(),
                count: self.slots.len(),
            });
        }
        let mut seen = HashSet::new();
        let mut seen_index = HashSet::new();
        for slot in &self.slots {
            if !(1..=MAX_SLOTS as u8).contains(&slot.index) {
                return Err(SlotError::IndexOutOfRange { index: slot.index });
            }
            if !seen_index.insert(slot.index) {
                return Err(SlotError::DuplicateSlot {
                    cluster: self.id.clone(),
                    id: slot_label(slot.index),
                });
            }
            if !seen.insert(slot.id.as_str()) {
                return Err(SlotError::DuplicateSlot {
                    cluster: self.id.clone(),
                    id: slot.id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Shared cluster/slot topology. Never mutated once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterTemplate {
    /// Template id.
    pub id: String,
    /// Published version.
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Clusters in drawing order.
    pub clusters: Vec<Cluster>,
}

impl MasterTemplate {
    /// Checks slot limits and id uniqueness. Slot ids only need to be unique
    /// within their cluster, but the qualified cell ids must not collide.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut clusters = HashSet::new();
        let mut cells = HashSet::new();
        for cluster in &self.clusters {
            if !clusters.insert(cluster.id.as_str()) {
                return Err(TemplateError::DuplicateCluster {
                    id: cluster.id.clone(),
                });
            }
            cluster.validate()?;
            for slot in &cluster.slots {
                let id = cell_id(&cluster.id, &slot.id);
                if !cells.insert(id.clone()) {
                    return Err(TemplateError::DuplicateCellId { id });
                }
            }
        }
        Ok(())
    }

    /// Validates and freezes the template for sharing between clients.
    pub fn publish(self) -> Result<Arc<Self>, TemplateError> {
        self.validate()?;
        Ok(Arc::new(self))
    }

    /// Cluster by id.
    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

/// Per-client overlay on the master template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFile {
    /// Map file id.
    #[serde(default)]
    pub id: String,
    /// Owning client. Filled in by the loader when absent.
    #[serde(default)]
    pub client_id: String,
    /// Map revision, part of the composed template id.
    #[serde(default = "default_map_version")]
    pub version: String,
    /// Enabled slots, by bare slot id or qualified cell id.
    #[serde(default)]
    pub active_cells: HashSet<String>,
    /// Slot or cell id → label override; the cell id wins.
    #[serde(default)]
    pub cell_display_names: HashMap<String, String>,
    /// Cluster id → visible. Missing clusters are visible.
    #[serde(default)]
    pub cluster_visibility: HashMap<String, bool>,
    /// When the map was authored.
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    /// Who authored it.
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_map_version() -> String {
    "1.0.0".into()
}

impl MapFile {
    /// Visibility of a cluster; only an explicit `false` hides it.
    pub fn is_cluster_visible(&self, cluster_id: &str) -> bool {
        self.cluster_visibility
            .get(cluster_id)
            .copied()
            .unwrap_or(true)
    }

    /// Whether an id is listed as enabled, verbatim.
    pub fn is_active(&self, id: &str) -> bool {
        self.active_cells.contains(id)
    }

    /// Whether `slot_id` of `cluster_id` is enabled under either its bare
    /// or its qualified id.
    pub fn is_slot_active(&self, cluster_id: &str, slot_id: &str) -> bool {
        self.is_active(slot_id) || self.is_active(&cell_id(cluster_id, slot_id))
    }

    /// Label override for a slot, qualified id first.
    pub fn display_name_for(&self, cluster_id: &str, slot_id: &str) -> Option<&str> {
        self.cell_display_names
            .get(&cell_id(cluster_id, slot_id))
            .or_else(|| self.cell_display_names.get(slot_id))
            .map(String::as_str)
    }
}

/// A slot instantiated for one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// `{clusterId}-{slotId}`, unique across the template.
    pub id: String,
    /// Owning cluster.
    pub cluster_id: String,
    /// Catalog position of the slot.
    pub slot_index: u8,
    /// Service category.
    pub service_area_type: ServiceAreaId,
    /// Absolute axial position (cluster center + slot offset).
    pub position: HexCoordinate,
    /// Resolved label.
    pub display_name: String,
    /// Always true for generated cells; inactive slots are not generated.
    pub is_active: bool,
    /// Live engagement state.
    pub engagement_state: EngagementState,
    /// Cell-level state key, possibly legacy.
    pub cell_state: Option<String>,
    /// Drawing style before resolution.
    pub visual_properties: VisualProperties,
}

/// Composer output for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintTemplate {
    /// `{clientId}-{mapFile.version}`.
    pub id: String,
    /// Client this footprint belongs to.
    pub client_id: String,
    /// Shared master template.
    pub master_template: Arc<MasterTemplate>,
    /// Map file it was composed with.
    pub map_file: MapFile,
    /// Renderable cells in template order.
    pub generated_cells: Vec<Cell>,
    /// Composition time.
    pub generated_at: DateTime<Utc>,
}

impl FootprintTemplate {
    /// Cell by id.
    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.generated_cells.iter().find(|c| c.id == id)
    }

    /// Copy with one cell's engagement state replaced. Other cells and the
    /// style fields are untouched; unknown ids yield an unchanged copy.
    ///
    /// The stored `background_color` is left alone: the fill is derived from
    /// the state when the cell is resolved, so a cell without a `cell_state`
    /// key or explicit background picks up the new state color there, while
    /// one carrying either keeps its fill.
    pub fn with_cell_state(&self, cell_id: &str, state: EngagementState) -> Self {
        let mut updated = self.clone();
        if let Some(cell) = updated
            .generated_cells
            .iter_mut()
            .find(|c| c.id == cell_id)
        {
            cell.engagement_state = state;
        }
        updated
    }
}

/// Live overlay record for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementData {
    /// Target cell id.
    pub cell_id: String,
    /// State to display.
    pub engagement_state: EngagementState,
    /// Style fields to override for this record.
    #[serde(default)]
    pub visual_properties: Option<VisualPatch>,
    /// Feed timestamp.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl EngagementData {
    /// Record that only sets the state.
    pub fn state(cell_id: impl Into<String>, engagement_state: EngagementState) -> Self {
        Self {
            cell_id: cell_id.into(),
            engagement_state,
            visual_properties: None,
            last_updated: Some(Utc::now()),
        }
    }
}

// ── Built-in defaults ──────────────────────────────────────────────

struct DefaultCluster {
    id: &'static str,
    label: &'static str,
    center: HexCoordinate,
    areas: &'static [(&'static str, Option<&'static str>)],
}

const DEFAULT_CLUSTERS: [DefaultCluster; 2] = [
    DefaultCluster {
        id: "core-systems",
        label: "Core Systems",
        center: HexCoordinate::new(0, 0),
        areas: &[
            ("ELN", Some("ST_ELN")),
            ("LIMS", Some("ST_LIMS")),
            ("SDMS", Some("ST_SDMS")),
            ("CDS", Some("ST_CDS")),
            ("BI", Some("ST_BI")),
            ("ODM", Some("ST_ODM")),
            ("CM", Some("ST_CM")),
        ],
    },
    DefaultCluster {
        id: "consulting-services",
        label: "Consulting Services",
        center: HexCoordinate::new(5, -3),
        areas: &[
            ("STRATEGIC_CONSULTING", None),
            ("DIGITAL_TRANSFORMATION", Some("ST_ERP")),
            ("REGULATORY_AFFAIRS", Some("ST_REGULATORY_SUBMISSION")),
            ("QUALITY_ASSURANCE", Some("ST_QMS")),
        ],
    },
];

/// Deterministic master template used when nothing else can be loaded.
pub fn default_master_template() -> MasterTemplate {
    let catalog = SlotCatalog::canonical();
    let clusters = DEFAULT_CLUSTERS
        .iter()
        .map(|dc| Cluster {
            id: dc.id.into(),
            label: Some(dc.label.into()),
            center_position: dc.center,
            slots: catalog
                .iter()
                .zip(dc.areas)
                .map(|(cs, &(area, service_type))| Slot {
                    id: cs.label(),
                    index: cs.index,
                    axial_offset: cs.offset,
                    service_area: area.into(),
                    service_type_id: service_type.map(Into::into),
                    display_name: None,
                    cell_state: None,
                })
                .collect(),
        })
        .collect();

    MasterTemplate {
        id: "default-master".into(),
        version: "1.0.0".into(),
        description: "Default pharmaceutical services honeycomb template".into(),
        clusters,
    }
}

/// Map file enabling every slot of `master` with all clusters visible.
pub fn default_map_file(client_id: &str, master: &MasterTemplate) -> MapFile {
    MapFile {
        id: format!("{client_id}-default"),
        client_id: client_id.into(),
        version: default_map_version(),
        active_cells: master
            .clusters
            .iter()
            .flat_map(|c| c.slots.iter().map(|s| cell_id(&c.id, &s.id)))
            .collect(),
        cell_display_names: HashMap::new(),
        cluster_visibility: master
            .clusters
            .iter()
            .map(|c| (c.id.clone(), true))
            .collect(),
        created_date: None,
        created_by: Some("system".into()),
    }
}
