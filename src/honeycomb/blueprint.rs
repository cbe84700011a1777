//! The blank master canvas: every cluster anchor with its C1..C10 slots.

use bevy::prelude::*;

use super::entities::BlueprintVisible;
use super::systems::to_world;
use super::{BlueprintSettings, HoneycombConfig};
use crate::cluster_layout::{ClusterAnchor, generate_layout};
use crate::hex_math::{HexGeometry, hex_polygon};
use crate::viewport::{Viewport, viewport_margin};

/// Gizmo lift above the cell plane.
const BLUEPRINT_LIFT: f32 = 0.5;

/// One inner slot on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintSlot {
    /// `C1`..`C10`.
    pub label: String,
    /// Center in canvas pixels.
    pub center: Vec2,
}

/// One cluster on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintCluster {
    /// Placed anchor.
    pub anchor: ClusterAnchor,
    /// Inner slots in catalog order.
    pub slots: Vec<BlueprintSlot>,
}

/// Precomputed blueprint geometry.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct BlueprintCanvas {
    /// Clusters in row-major order.
    pub clusters: Vec<BlueprintCluster>,
    /// Outline radius of each cluster.
    pub cluster_radius: f32,
    /// Outline radius of each inner slot.
    pub cell_size: f32,
    /// Bounds of every cluster outline, margin included.
    pub viewport: Viewport,
}

/// Lays out the blueprint from the layout generator and the slot catalog.
pub fn build_blueprint(settings: &BlueprintSettings, geometry: &HexGeometry) -> BlueprintCanvas {
    let layout = &settings.layout;
    let clusters: Vec<BlueprintCluster> = generate_layout(layout, geometry)
        .into_iter()
        .map(|anchor| {
            let slots = settings
                .slots
                .iter()
                .map(|slot| BlueprintSlot {
                    label: slot.label(),
                    center: anchor.center + settings.placement.slot_pixel(slot.offset),
                })
                .collect();
            BlueprintCluster { anchor, slots }
        })
        .collect();

    let margin = Vec2::splat(viewport_margin(geometry));
    let viewport = clusters
        .iter()
        .flat_map(|c| hex_polygon(c.anchor.center, layout.hex_size))
        .fold(None, |acc: Option<(Vec2, Vec2)>, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })
        .map_or(
            Viewport {
                min: -margin,
                max: margin,
            },
            |(lo, hi)| Viewport {
                min: lo - margin,
                max: hi + margin,
            },
        );

    BlueprintCanvas {
        clusters,
        cluster_radius: layout.hex_size,
        cell_size: settings.placement.cell_size,
        viewport,
    }
}

/// Outlines every blueprint cluster and slot while the blueprint is shown.
pub fn draw_blueprint(
    visible: Res<BlueprintVisible>,
    canvas: Res<BlueprintCanvas>,
    cfg: Res<HoneycombConfig>,
    mut gizmos: Gizmos,
) {
    if !visible.0 {
        return;
    }
    let color = cfg.blueprint.line_color;
    for cluster in &canvas.clusters {
        draw_outline(
            &mut gizmos,
            cluster.anchor.center,
            canvas.cluster_radius,
            BLUEPRINT_LIFT,
            color,
        );
        for slot in &cluster.slots {
            draw_outline(&mut gizmos, slot.center, canvas.cell_size, BLUEPRINT_LIFT, color);
        }
    }
}

/// Closed hexagon outline on the drawing plane.
pub(super) fn draw_outline(gizmos: &mut Gizmos, center: Vec2, radius: f32, lift: f32, color: Color) {
    let verts = hex_polygon(center, radius);
    gizmos.linestrip(
        verts.iter().chain(verts.first()).map(|&v| to_world(v, lift)),
        color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster_layout::ClusterLayoutConfig;
    use crate::slots::{InnerCellPlacement, SlotCatalog};

    fn settings() -> BlueprintSettings {
        BlueprintSettings {
            layout: ClusterLayoutConfig::default(),
            placement: InnerCellPlacement::default(),
            slots: SlotCatalog::canonical(),
            line_color: Color::BLACK,
        }
    }

    #[test]
    fn every_cluster_gets_every_slot() {
        let canvas = build_blueprint(&settings(), &HexGeometry::default());
        assert_eq!(canvas.clusters.len(), 10);
        for cluster in &canvas.clusters {
            let labels: Vec<_> = cluster.slots.iter().map(|s| s.label.as_str()).collect();
            assert_eq!(labels.len(), 10);
            assert_eq!(labels[0], "C1");
            assert_eq!(labels[9], "C10");
        }
    }

    #[test]
    fn center_slot_sits_below_anchor_by_clearance() {
        let s = settings();
        let canvas = build_blueprint(&s, &HexGeometry::default());
        let cluster = &canvas.clusters[0];
        let c7 = cluster.slots.iter().find(|s| s.label == "C7").unwrap();
        assert_eq!(
            c7.center,
            cluster.anchor.center + Vec2::new(0.0, s.placement.title_clearance())
        );
    }

    #[test]
    fn viewport_covers_every_cluster() {
        let canvas = build_blueprint(&settings(), &HexGeometry::default());
        for cluster in &canvas.clusters {
            for v in hex_polygon(cluster.anchor.center, canvas.cluster_radius) {
                assert!(canvas.viewport.contains(v));
            }
        }
    }

    #[test]
    fn no_rows_means_margin_box() {
        let mut s = settings();
        s.layout.rows.clear();
        let canvas = build_blueprint(&s, &HexGeometry::default());
        assert!(canvas.clusters.is_empty());
        assert_eq!(canvas.viewport.center(), Vec2::ZERO);
    }
}
