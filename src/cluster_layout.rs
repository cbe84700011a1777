//! Cluster anchor placement on the canvas.
//!
//! Clusters are laid out row by row from a list of per-row counts. Every row
//! is centered against the widest row, and the widest row is centered in the
//! canvas (clamped to the left edge when it does not fit), so rows of differing
//! counts stay aligned with each other.

use bevy::math::Vec2;
use bevy::reflect::Reflect;

use crate::hex_math::{HexCoordinate, HexGeometry};

const SQRT_3: f32 = 1.732_050_8;

/// Approximation of `√3 / 2` used for the vertical row step.
const ROW_STEP_FACTOR: f32 = 0.866;

/// Extra padding added under half a hex height before the first row.
const TOP_PADDING_EXTRA: f32 = 20.0;

/// Input to [`generate_layout`].
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct ClusterLayoutConfig {
    /// Cluster hexagon radius.
    pub hex_size: f32,
    /// Horizontal gap between neighbouring clusters in a row.
    pub gap: f32,
    /// Extra vertical gap between rows (negative values interlock rows).
    pub row_gap: f32,
    /// Canvas width the block is centered in.
    pub canvas_width: f32,
    /// Cluster count per row, top to bottom.
    pub rows: Vec<usize>,
    /// Floor for the padding above the first row.
    pub min_top_padding: f32,
}

impl Default for ClusterLayoutConfig {
    fn default() -> Self {
        Self {
            hex_size: 250.0,
            gap: 250.0,
            row_gap: -160.0,
            canvas_width: 2000.0,
            rows: vec![2, 3, 2, 3],
            min_top_padding: 20.0,
        }
    }
}

/// One placed cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAnchor {
    /// `row{r}-hex{i}`.
    pub id: String,
    /// Zero-based row.
    pub row: usize,
    /// Zero-based position within the row.
    pub column: usize,
    /// Center in canvas pixels.
    pub center: Vec2,
    /// Nearest hex to the center under the given geometry.
    pub nearest_hex: HexCoordinate,
}

impl ClusterLayoutConfig {
    /// `√3 * hex_size`.
    pub fn hex_height(&self) -> f32 {
        SQRT_3 * self.hex_size
    }

    /// Distance between consecutive row centers.
    pub fn row_step(&self) -> f32 {
        self.hex_height() * ROW_STEP_FACTOR + self.row_gap
    }

    /// Y of the first row's centers.
    pub fn top_padding(&self) -> f32 {
        (self.hex_height() / 2.0 + TOP_PADDING_EXTRA).max(self.min_top_padding)
    }

    fn row_width(&self, count: usize) -> f32 {
        count as f32 * 2.0 * self.hex_size + count.saturating_sub(1) as f32 * self.gap
    }

    /// Width of the widest row.
    pub fn widest_row(&self) -> f32 {
        self.rows
            .iter()
            .map(|&n| self.row_width(n))
            .fold(0.0, f32::max)
    }
}

/// Places one anchor per cluster in row-major order.
///
/// Output order and ids are stable for identical input.
pub fn generate_layout(cfg: &ClusterLayoutConfig, geometry: &HexGeometry) -> Vec<ClusterAnchor> {
    let widest = cfg.widest_row();
    let block_left = ((cfg.canvas_width - widest) / 2.0).max(0.0);
    let mut anchors = Vec::with_capacity(cfg.rows.iter().sum());
    let mut y = cfg.top_padding();

    for (row, &count) in cfg.rows.iter().enumerate() {
        let start_x = block_left + (widest - cfg.row_width(count)) / 2.0;
        for column in 0..count {
            let center = Vec2::new(
                start_x + column as f32 * (2.0 * cfg.hex_size + cfg.gap) + cfg.hex_size,
                y,
            );
            anchors.push(ClusterAnchor {
                id: format!("row{row}-hex{column}"),
                row,
                column,
                center,
                nearest_hex: geometry.pixel_to_axial(center),
            });
        }
        y += cfg.row_step();
    }

    anchors
}
