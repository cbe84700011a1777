//! Merges a master template with a client map file.

use std::sync::Arc;

use chrono::Utc;

use crate::catalog::{Catalogs, ServiceTypeCatalog};
use crate::template::{
    Cell, EngagementState, FootprintTemplate, MapFile, MasterTemplate, Slot, cell_id,
};

/// Label for an active slot.
///
/// Map-file override, then the template's own name, then the service-type
/// abbreviation, then the raw service-area id.
pub fn resolve_display_name(
    cluster_id: &str,
    slot: &Slot,
    map: &MapFile,
    types: &ServiceTypeCatalog,
) -> String {
    map.display_name_for(cluster_id, &slot.id)
        .or(slot.display_name.as_deref())
        .map(str::to_owned)
        .or_else(|| {
            slot.service_type_id
                .as_deref()
                .and_then(|id| types.abbreviation(id))
                .map(str::to_owned)
        })
        .unwrap_or_else(|| slot.service_area.to_string())
}

/// Builds the renderable cell set for `map.client_id`.
///
/// Hidden clusters and inactive slots produce no cells. Every cell starts in
/// [`EngagementState::NotEngaged`] with the catalog's default style.
pub fn compose(
    master: &Arc<MasterTemplate>,
    map: &MapFile,
    catalogs: &Catalogs,
) -> FootprintTemplate {
    let generated_cells = master
        .clusters
        .iter()
        .filter(|cluster| map.is_cluster_visible(&cluster.id))
        .flat_map(|cluster| {
            cluster
                .slots
                .iter()
                .filter(|slot| map.is_slot_active(&cluster.id, &slot.id))
                .map(move |slot| Cell {
                    id: cell_id(&cluster.id, &slot.id),
                    cluster_id: cluster.id.clone(),
                    slot_index: slot.index,
                    service_area_type: slot.service_area.clone(),
                    position: cluster.center_position + slot.axial_offset,
                    display_name: resolve_display_name(
                        &cluster.id,
                        slot,
                        map,
                        &catalogs.service_types,
                    ),
                    is_active: true,
                    engagement_state: EngagementState::NotEngaged,
                    cell_state: slot.cell_state.clone(),
                    visual_properties: catalogs.style.default_visual.clone(),
                })
        })
        .collect();

    FootprintTemplate {
        id: format!("{}-{}", map.client_id, map.version),
        client_id: map.client_id.clone(),
        master_template: Arc::clone(master),
        map_file: map.clone(),
        generated_cells,
        generated_at: Utc::now(),
    }
}

/// Copy of `template` with one cell's engagement state replaced. See
/// [`FootprintTemplate::with_cell_state`] for how the fill follows.
pub fn update_cell_state(
    template: &FootprintTemplate,
    cell_id: &str,
    state: EngagementState,
) -> FootprintTemplate {
    template.with_cell_state(cell_id, state)
}
