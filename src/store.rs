//! Per-client footprint and engagement state.
//!
//! Templates are replaced wholesale on reload. Engagement overlays live in a
//! separate map so a feed update never rewrites a stored template.

use std::collections::HashMap;

use bevy::log::debug;
use bevy::prelude::Resource;

use crate::catalog::StyleCatalog;
use crate::compose::update_cell_state;
use crate::hex_math::HexGeometry;
use crate::resolve::{RenderFrame, build_frame};
use crate::template::{EngagementData, EngagementState, FootprintTemplate};

/// Overlay records of one client, by cell id.
pub type EngagementOverlay = HashMap<String, EngagementData>;

/// Owner of every client's composed template and live overlay.
#[derive(Resource, Debug, Default)]
pub struct FootprintStore {
    templates: HashMap<String, FootprintTemplate>,
    engagement: HashMap<String, EngagementOverlay>,
}

impl FootprintStore {
    /// Stores `template` under its client id, replacing any previous one.
    pub fn set_template(&mut self, template: FootprintTemplate) {
        debug!(client = %template.client_id, template = %template.id, "store.template_replaced");
        self.templates.insert(template.client_id.clone(), template);
    }

    /// Template of `client_id`.
    pub fn template(&self, client_id: &str) -> Option<&FootprintTemplate> {
        self.templates.get(client_id)
    }

    /// Clients with a stored template.
    pub fn clients(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Replaces one cell's state in the stored template.
    ///
    /// Returns false when the client or cell is unknown.
    pub fn update_cell_state(
        &mut self,
        client_id: &str,
        cell_id: &str,
        state: EngagementState,
    ) -> bool {
        let Some(template) = self.templates.get_mut(client_id) else {
            return false;
        };
        if template.cell(cell_id).is_none() {
            return false;
        }
        *template = update_cell_state(template, cell_id, state);
        true
    }

    /// Replaces the whole overlay of `client_id`. Within `records`, the last
    /// record for a cell wins.
    pub fn replace_engagement(
        &mut self,
        client_id: &str,
        records: impl IntoIterator<Item = EngagementData>,
    ) {
        let overlay = records
            .into_iter()
            .map(|r| (r.cell_id.clone(), r))
            .collect();
        self.engagement.insert(client_id.to_owned(), overlay);
    }

    /// Stores one record, replacing any earlier record for the same cell.
    pub fn upsert_engagement(&mut self, client_id: &str, record: EngagementData) {
        self.engagement
            .entry(client_id.to_owned())
            .or_default()
            .insert(record.cell_id.clone(), record);
    }

    /// Forgets every overlay record of `client_id`.
    pub fn clear_engagement(&mut self, client_id: &str) {
        self.engagement.remove(client_id);
    }

    /// Overlay of `client_id`.
    pub fn engagement(&self, client_id: &str) -> Option<&EngagementOverlay> {
        self.engagement.get(client_id)
    }

    /// State a cell currently shows: overlay first, then the stored template.
    pub fn effective_state(&self, client_id: &str, cell_id: &str) -> Option<EngagementState> {
        self.engagement(client_id)
            .and_then(|o| o.get(cell_id))
            .map(|r| r.engagement_state)
            .or_else(|| {
                self.template(client_id)
                    .and_then(|t| t.cell(cell_id))
                    .map(|c| c.engagement_state)
            })
    }

    /// Render frame of `client_id` with its overlay applied.
    pub fn frame(
        &self,
        client_id: &str,
        geometry: &HexGeometry,
        style: &StyleCatalog,
    ) -> Option<RenderFrame> {
        let template = self.template(client_id)?;
        Some(build_frame(
            template,
            self.engagement(client_id),
            geometry,
            style,
        ))
    }
}
