//! Bevy rendering surface for composed footprints.
//!
//! Draws the current client's cells as flat hexagons seen from a top-down
//! orthographic camera, with egui labels and a legend. Pointer hover
//! highlights a cell, a click cycles its live engagement state, arrow keys
//! switch client and `B` swaps in the blank master blueprint.

mod blueprint;
mod entities;
mod systems;

pub use blueprint::{BlueprintCanvas, BlueprintCluster, BlueprintSlot, build_blueprint};
pub use entities::{
    BlueprintVisible, CellBorder, ClientRoster, CurrentFrame, FootprintCamera, HexCell,
    HoveredCell, SourceHandle,
};
pub use systems::hit_test;

use bevy::prelude::*;

use crate::cluster_layout::ClusterLayoutConfig;
use crate::hex_math::HexGeometry;
use crate::slots::{InnerCellPlacement, SlotCatalog};

/// Nested configuration for the honeycomb view.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct HoneycombConfig {
    /// Axial → pixel mapping of cells.
    pub geometry: HexGeometry,
    /// Blank-canvas settings.
    pub blueprint: BlueprintSettings,
    /// Background clear color.
    pub clear_color: Color,
    /// Cluster outline color.
    pub outline_color: Color,
    /// Cell label size in points.
    pub label_font_size: f32,
    /// Camera distance above the drawing plane.
    pub camera_height: f32,
}

/// Master blueprint canvas layout.
#[derive(Clone, Debug, Reflect)]
pub struct BlueprintSettings {
    /// Cluster anchor placement.
    pub layout: ClusterLayoutConfig,
    /// Inner-cell placement inside each cluster.
    pub placement: InnerCellPlacement,
    /// Slot table drawn inside every cluster.
    pub slots: SlotCatalog,
    /// Line color of the blueprint.
    pub line_color: Color,
}

impl Default for HoneycombConfig {
    fn default() -> Self {
        Self {
            geometry: HexGeometry::default(),
            blueprint: BlueprintSettings {
                layout: ClusterLayoutConfig::default(),
                placement: InnerCellPlacement::default(),
                slots: SlotCatalog::canonical(),
                line_color: Color::srgb(0.45, 0.55, 0.7),
            },
            clear_color: Color::WHITE,
            outline_color: Color::srgb(0.6, 0.6, 0.6),
            label_font_size: 11.0,
            camera_height: 500.0,
        }
    }
}

/// Honeycomb plugin: camera at startup, cell sync and interaction per frame.
///
/// Expects [`crate::catalog::Catalogs`], [`ClientRoster`] and
/// [`SourceHandle`] to be inserted by the app; a
/// [`crate::store::FootprintStore`] is created if absent.
pub struct HoneycombPlugin(pub HoneycombConfig);

impl Plugin for HoneycombPlugin {
    fn build(&self, app: &mut App) {
        let canvas = build_blueprint(&self.0.blueprint, &self.0.geometry);

        app.register_type::<HoneycombConfig>()
            .register_type::<HexCell>()
            .register_type::<CellBorder>()
            .register_type::<ClientRoster>()
            .register_type::<HoveredCell>()
            .register_type::<BlueprintVisible>()
            .insert_resource(self.0.clone())
            .insert_resource(canvas)
            .insert_resource(ClearColor(self.0.clear_color))
            .init_resource::<crate::store::FootprintStore>()
            .init_resource::<HoveredCell>()
            .init_resource::<BlueprintVisible>()
            .init_resource::<CurrentFrame>()
            .add_systems(Startup, (systems::setup_camera, systems::load_current_client))
            .add_systems(
                Update,
                (
                    systems::switch_client,
                    systems::toggle_blueprint,
                    systems::track_hover,
                    systems::cycle_clicked_cell,
                    systems::refresh_frame,
                    systems::respawn_cells,
                    systems::apply_hover_style,
                    systems::sync_cell_visibility,
                    systems::fit_camera,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    systems::draw_cluster_outlines,
                    blueprint::draw_blueprint,
                    systems::draw_cell_labels,
                    systems::draw_legend,
                )
                    .after(systems::fit_camera),
            );
    }
}
