//! Slot catalog: the fixed inner-cell positions of a cluster.
//!
//! A cluster holds up to [`MAX_SLOTS`] slots labelled `C1..C10`. Offsets are
//! axial and relative to the cluster center. Configuration may supply them as
//! fractional values with a stale `s`; [`RawOffset::normalize`] is the single
//! place where that gets repaired.

use std::collections::HashSet;

use bevy::log::warn;
use bevy::math::Vec2;
use bevy::reflect::Reflect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hex_math::{HexCoordinate, HexError, HexGeometry};

/// Upper bound on slots per cluster.
pub const MAX_SLOTS: usize = 10;

/// Canonical C1..C10 offsets, laid out in 2, 3, 2, 1, 2 rows.
const CANONICAL_OFFSETS: [(i32, i32); MAX_SLOTS] = [
    (-2, 0),
    (0, -1),
    (-3, 1),
    (-1, 0),
    (1, -1),
    (-2, 1),
    (0, 0),
    (-1, 1),
    (-2, 2),
    (0, 1),
];

/// Slot table violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Two slots in the same cluster share an identifier.
    #[error("duplicate slot id {id} in cluster {cluster}")]
    DuplicateSlot {
        /// Owning cluster (or `catalog` for the bare table).
        cluster: String,
        /// Repeated slot id.
        id: String,
    },
    /// More than [`MAX_SLOTS`] slots.
    #[error("cluster {cluster} has {count} slots, at most 10 allowed")]
    TooManySlots {
        /// Owning cluster.
        cluster: String,
        /// Number of slots supplied.
        count: usize,
    },
    /// Unusable offset.
    #[error("bad slot offset: {0}")]
    Coordinate(#[from] HexError),
    /// Slot index outside `1..=10`.
    #[error("slot index {index} outside 1..=10")]
    IndexOutOfRange {
        /// Supplied index.
        index: u8,
    },
}

/// An axial offset as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawOffset {
    /// Possibly fractional q.
    pub q: f32,
    /// Possibly fractional r.
    pub r: f32,
    /// Stored s, if any. Never trusted.
    #[serde(default)]
    pub s: Option<f32>,
}

impl RawOffset {
    /// Rounds `q` and `r` to the nearest integer and recomputes `s`.
    ///
    /// A supplied `s` that disagrees with the recomputed one is reported as a
    /// warning; the recomputed value is used regardless. Non-finite or
    /// out-of-range components are an error.
    pub fn normalize(self) -> Result<HexCoordinate, HexError> {
        if !(self.q.is_finite() && self.r.is_finite()) {
            return Err(HexError::NotFinite);
        }
        let hex = HexCoordinate::checked(self.q.round() as i64, self.r.round() as i64)?;
        if let Some(stored) = self.s
            && (stored - hex.s() as f32).abs() > f32::EPSILON
        {
            warn!(
                q = self.q,
                r = self.r,
                stored_s = stored,
                computed_s = hex.s(),
                "slot offset normalized, stored s ignored"
            );
        }
        Ok(hex)
    }
}

impl TryFrom<RawOffset> for HexCoordinate {
    type Error = HexError;

    fn try_from(raw: RawOffset) -> Result<Self, HexError> {
        raw.normalize()
    }
}

/// Slot label for a 1-based index.
pub fn slot_label(index: u8) -> String {
    format!("C{index}")
}

/// One catalog position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct CatalogSlot {
    /// 1-based position, `C{index}`.
    pub index: u8,
    /// Offset from the cluster center.
    pub offset: HexCoordinate,
}

impl CatalogSlot {
    /// `C1`..`C10`.
    pub fn label(&self) -> String {
        slot_label(self.index)
    }
}

/// Versioned table of inner-cell positions.
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct SlotCatalog {
    /// Table revision.
    pub version: String,
    slots: Vec<CatalogSlot>,
}

impl SlotCatalog {
    /// The canonical ten-slot table.
    pub fn canonical() -> Self {
        let slots = CANONICAL_OFFSETS
            .iter()
            .enumerate()
            .map(|(i, &(q, r))| CatalogSlot {
                index: i as u8 + 1,
                offset: HexCoordinate::new(q, r),
            })
            .collect();
        Self {
            version: "1.0.0".into(),
            slots,
        }
    }

    /// Builds a table from configuration entries, normalizing every offset.
    pub fn from_raw(
        version: impl Into<String>,
        entries: &[(u8, RawOffset)],
    ) -> Result<Self, SlotError> {
        if entries.len() > MAX_SLOTS {
            return Err(SlotError::TooManySlots {
                cluster: "catalog".into(),
                count: entries.len(),
            });
        }
        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(entries.len());
        for &(index, raw) in entries {
            if !(1..=MAX_SLOTS as u8).contains(&index) {
                return Err(SlotError::IndexOutOfRange { index });
            }
            if !seen.insert(index) {
                return Err(SlotError::DuplicateSlot {
                    cluster: "catalog".into(),
                    id: slot_label(index),
                });
            }
            slots.push(CatalogSlot {
                index,
                offset: raw.normalize()?,
            });
        }
        Ok(Self {
            version: version.into(),
            slots,
        })
    }

    /// Slot at a 1-based index.
    pub fn get(&self, index: u8) -> Option<&CatalogSlot> {
        self.slots.iter().find(|s| s.index == index)
    }

    /// All slots in table order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogSlot> {
        self.slots.iter()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Pixel placement of inner cells inside a cluster hexagon.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct InnerCellPlacement {
    /// Radius of one inner cell.
    pub cell_size: f32,
    /// Scales slot spread independently of cell size (1.0 = tight fit).
    pub spacing_multiplier: f32,
    /// Shift applied to the whole inner group.
    pub group_offset: Vec2,
}

impl Default for InnerCellPlacement {
    fn default() -> Self {
        Self {
            cell_size: 40.0,
            spacing_multiplier: 1.0,
            group_offset: Vec2::ZERO,
        }
    }
}

impl InnerCellPlacement {
    /// Downward shift keeping inner cells clear of the cluster title.
    pub fn title_clearance(&self) -> f32 {
        (self.cell_size * 0.35).round().max(6.0)
    }

    /// Pixel offset of a slot from its cluster anchor.
    pub fn slot_pixel(&self, offset: HexCoordinate) -> Vec2 {
        let spread = HexGeometry {
            spacing: self.cell_size * self.spacing_multiplier,
            hex_size: self.cell_size,
        };
        spread.axial_to_pixel(offset) + self.group_offset + Vec2::new(0.0, self.title_clearance())
    }
}
