//! Cluster outlines and the bounding viewport handed to the renderer.

use bevy::math::Vec2;
use serde::Serialize;

use crate::hex_math::{HexGeometry, hex_polygon};
use crate::resolve::RenderCell;
use crate::template::FootprintTemplate;

const MIN_MARGIN: f32 = 40.0;
const MARGIN_HEX_FACTOR: f32 = 1.5;

/// Outer outline of one visible cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBoundary {
    /// Cluster id.
    pub cluster_id: String,
    /// Cluster title.
    pub label: Option<String>,
    /// Center in pixels.
    pub center: Vec2,
    /// Circumradius of the outline.
    pub radius: f32,
}

impl ClusterBoundary {
    /// Outline vertices.
    pub fn vertices(&self) -> [Vec2; 6] {
        hex_polygon(self.center, self.radius)
    }
}

/// Outlines of every visible cluster in `template`.
///
/// The radius reaches the farthest slot center plus one cell radius, whether
/// or not that slot is active for the client.
pub fn cluster_boundaries(template: &FootprintTemplate, geometry: &HexGeometry) -> Vec<ClusterBoundary> {
    template
        .master_template
        .clusters
        .iter()
        .filter(|c| template.map_file.is_cluster_visible(&c.id))
        .map(|cluster| {
            let center = geometry.axial_to_pixel(cluster.center_position);
            let reach = cluster
                .slots
                .iter()
                .map(|s| {
                    geometry
                        .axial_to_pixel(cluster.center_position + s.axial_offset)
                        .distance(center)
                })
                .fold(0.0, f32::max);
            ClusterBoundary {
                cluster_id: cluster.id.clone(),
                label: cluster.label.clone(),
                center,
                radius: reach + geometry.hex_size,
            }
        })
        .collect()
}

/// Axis-aligned pixel bounds, margin included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// Top-left corner.
    pub min: Vec2,
    /// Bottom-right corner.
    pub max: Vec2,
}

impl Viewport {
    /// Horizontal extent.
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Vertical extent.
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Midpoint.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Whether `p` lies inside, edges included.
    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Padding around the drawn content: `max(40, 1.5 * hex_size)`.
pub fn viewport_margin(geometry: &HexGeometry) -> f32 {
    (MARGIN_HEX_FACTOR * geometry.hex_size).max(MIN_MARGIN)
}

/// Bounds containing every cell outline and every cluster outline.
///
/// With nothing to draw, the result is a margin-sized box around the origin.
pub fn compute_viewport(
    cells: &[RenderCell],
    clusters: &[ClusterBoundary],
    geometry: &HexGeometry,
) -> Viewport {
    let margin = Vec2::splat(viewport_margin(geometry));
    let points = cells
        .iter()
        .flat_map(|c| hex_polygon(c.pixel, geometry.hex_size))
        .chain(clusters.iter().flat_map(ClusterBoundary::vertices));

    let bounds = points.fold(None, |acc: Option<(Vec2, Vec2)>, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
    });

    match bounds {
        Some((lo, hi)) => Viewport {
            min: lo - margin,
            max: hi + margin,
        },
        None => Viewport {
            min: -margin,
            max: margin,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalogs, StyleCatalog};
    use crate::compose::compose;
    use crate::resolve::project;
    use crate::template::{default_map_file, default_master_template};

    fn frame_parts(hidden: &[&str]) -> (Vec<RenderCell>, Vec<ClusterBoundary>) {
        let master = default_master_template().publish().unwrap();
        let mut map = default_map_file("acme", &master);
        for id in hidden {
            map.cluster_visibility.insert((*id).to_string(), false);
        }
        let template = compose(&master, &map, &Catalogs::builtin());
        let geometry = HexGeometry::default();
        (
            project(&template, None, &geometry, &StyleCatalog::default()),
            cluster_boundaries(&template, &geometry),
        )
    }

    #[test]
    fn margin_has_floor() {
        assert_eq!(viewport_margin(&HexGeometry::default()), 45.0);
        let small = HexGeometry {
            spacing: 10.0,
            hex_size: 5.0,
        };
        assert_eq!(viewport_margin(&small), 40.0);
    }

    #[test]
    fn viewport_contains_all_outlines_with_margin() {
        let geometry = HexGeometry::default();
        let (cells, clusters) = frame_parts(&[]);
        let vp = compute_viewport(&cells, &clusters, &geometry);
        let margin = viewport_margin(&geometry);
        for c in &cells {
            for v in hex_polygon(c.pixel, geometry.hex_size) {
                assert!(vp.contains(v + Vec2::splat(margin) - Vec2::splat(1e-3)));
                assert!(vp.contains(v - Vec2::splat(margin) + Vec2::splat(1e-3)));
            }
        }
        for b in &clusters {
            for v in b.vertices() {
                assert!(vp.contains(v));
            }
        }
    }

    #[test]
    fn hidden_clusters_have_no_outline() {
        let (_, clusters) = frame_parts(&["consulting-services"]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cluster_id, "core-systems");
    }

    #[test]
    fn boundary_encloses_slots() {
        let geometry = HexGeometry::default();
        let (cells, clusters) = frame_parts(&[]);
        let core = &clusters[0];
        for c in cells.iter().filter(|c| c.cluster_id == "core-systems") {
            assert!(c.pixel.distance(core.center) + geometry.hex_size <= core.radius + 1e-3);
        }
    }

    #[test]
    fn empty_input_is_margin_box() {
        let geometry = HexGeometry::default();
        let vp = compute_viewport(&[], &[], &geometry);
        assert_eq!(vp.center(), Vec2::ZERO);
        assert_eq!(vp.width(), 90.0);
        assert_eq!(vp.height(), 90.0);
    }
}
