//! Effective style resolution and the render-time overlay projection.
//!
//! The fill color comes from an ordered [`FillChain`]; the first rule that
//! yields a color wins, and the catalog's `NOT_ENGAGED` color is the terminal
//! fallback. Projection never touches the stored [`FootprintTemplate`].

use std::collections::{BTreeMap, HashMap};

use bevy::math::Vec2;
use bevy::reflect::Reflect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{HoverStyle, StyleCatalog};
use crate::hex_math::{HexCoordinate, HexGeometry};
use crate::template::{
    Cell, EngagementData, EngagementState, FootprintTemplate, ServiceAreaId,
};
use crate::viewport::{ClusterBoundary, Viewport, cluster_boundaries, compute_viewport};

/// One source of fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillRule {
    /// Non-empty `visualProperties.backgroundColor`.
    ExplicitOverride,
    /// Catalog style of the cell's state key, after legacy aliasing.
    CellStateKey,
    /// Catalog color of the engagement state.
    EngagementState,
}

impl FillRule {
    /// Color this rule picks for `cell`, if any.
    pub fn apply<'a>(self, cell: &'a Cell, style: &'a StyleCatalog) -> Option<&'a str> {
        match self {
            Self::ExplicitOverride => Some(cell.visual_properties.background_color.as_str())
                .filter(|c| !c.is_empty()),
            Self::CellStateKey => cell
                .cell_state
                .as_deref()
                .and_then(|key| style.cell_state(key))
                .map(|s| s.background_color.as_str()),
            Self::EngagementState => style.engagement_color(cell.engagement_state),
        }
    }
}

/// Ordered fill rules, highest priority first.
#[derive(Debug, Clone, PartialEq)]
pub struct FillChain(Vec<FillRule>);

impl Default for FillChain {
    fn default() -> Self {
        Self(vec![
            FillRule::ExplicitOverride,
            FillRule::CellStateKey,
            FillRule::EngagementState,
        ])
    }
}

impl FillChain {
    /// Chain with a custom order.
    pub fn new(rules: impl Into<Vec<FillRule>>) -> Self {
        Self(rules.into())
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[FillRule] {
        &self.0
    }

    /// First matching rule's color, else the catalog fallback.
    pub fn resolve<'a>(&self, cell: &'a Cell, style: &'a StyleCatalog) -> &'a str {
        self.0
            .iter()
            .find_map(|rule| rule.apply(cell, style))
            .unwrap_or_else(|| style.fallback_fill())
    }
}

/// Final drawing parameters of one cell.
#[derive(Debug, Clone, PartialEq, Reflect, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStyle {
    /// Fill color.
    pub fill: String,
    /// Outline color.
    pub border_color: String,
    /// Outline width.
    pub border_width: f32,
    /// 0.0..=1.0.
    pub opacity: f32,
    /// Label color.
    pub text_color: String,
}

impl ResolvedStyle {
    /// Style while hovered. `self` is left intact, so dropping the result
    /// restores the pre-hover values exactly.
    pub fn with_hover(&self, hover: &HoverStyle) -> Self {
        Self {
            border_color: hover.border_color.clone(),
            border_width: hover.border_width,
            opacity: hover.opacity,
            ..self.clone()
        }
    }
}

/// Resolves `cell` against `style` using the catalog's fill chain.
pub fn resolve_style(cell: &Cell, style: &StyleCatalog) -> ResolvedStyle {
    let text_color = cell
        .cell_state
        .as_deref()
        .and_then(|key| style.cell_state(key))
        .map_or(style.text_color.as_str(), |s| s.text_color.as_str());

    ResolvedStyle {
        fill: style.fill_chain.resolve(cell, style).to_owned(),
        border_color: cell.visual_properties.border_color.clone(),
        border_width: cell.visual_properties.border_thickness,
        opacity: cell.visual_properties.opacity,
        text_color: text_color.to_owned(),
    }
}

/// `cell` as seen through an optional overlay record.
///
/// The record's state replaces the cell's; its partial style is merged over
/// the cell's own style.
pub fn apply_overlay(cell: &Cell, record: Option<&EngagementData>) -> Cell {
    let mut enriched = cell.clone();
    if let Some(record) = record {
        enriched.engagement_state = record.engagement_state;
        if let Some(patch) = &record.visual_properties {
            enriched.visual_properties = patch.apply_to(&cell.visual_properties);
        }
    }
    enriched
}

/// A cell ready for drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderCell {
    /// Cell id.
    pub id: String,
    /// Owning cluster.
    pub cluster_id: String,
    /// Service category.
    pub service_area: ServiceAreaId,
    /// Label text.
    pub label: String,
    /// State after the overlay.
    pub engagement_state: EngagementState,
    /// Axial position.
    pub position: HexCoordinate,
    /// Center in pixels.
    pub pixel: Vec2,
    /// Resolved style.
    pub style: ResolvedStyle,
}

/// Cells of `template` with `overlay` applied, in template order.
///
/// Overlay records for unknown cell ids have no effect.
pub fn project(
    template: &FootprintTemplate,
    overlay: Option<&HashMap<String, EngagementData>>,
    geometry: &HexGeometry,
    style: &StyleCatalog,
) -> Vec<RenderCell> {
    template
        .generated_cells
        .iter()
        .map(|cell| {
            let enriched = apply_overlay(cell, overlay.and_then(|o| o.get(&cell.id)));
            RenderCell {
                id: enriched.id.clone(),
                cluster_id: enriched.cluster_id.clone(),
                service_area: enriched.service_area_type.clone(),
                label: enriched.display_name.clone(),
                engagement_state: enriched.engagement_state,
                position: enriched.position,
                pixel: geometry.axial_to_pixel(enriched.position),
                style: resolve_style(&enriched, style),
            }
        })
        .collect()
}

/// Rendered cell count per engagement state; every state is present.
pub fn summarize(cells: &[RenderCell]) -> BTreeMap<EngagementState, usize> {
    let mut counts: BTreeMap<_, _> = EngagementState::ALL.iter().map(|&s| (s, 0)).collect();
    for cell in cells {
        *counts.entry(cell.engagement_state).or_default() += 1;
    }
    counts
}

/// Everything a rendering surface needs for one client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    /// Client shown.
    pub client_id: String,
    /// Composite template id.
    pub template_id: String,
    /// When the template was composed.
    pub generated_at: DateTime<Utc>,
    /// Cells in template order.
    pub cells: Vec<RenderCell>,
    /// Outer outlines of visible clusters.
    pub clusters: Vec<ClusterBoundary>,
    /// Bounds covering cells and cluster outlines.
    pub viewport: Viewport,
    /// Per-state counts.
    pub summary: BTreeMap<EngagementState, usize>,
}

/// Projects `template` and computes its viewport.
pub fn build_frame(
    template: &FootprintTemplate,
    overlay: Option<&HashMap<String, EngagementData>>,
    geometry: &HexGeometry,
    style: &StyleCatalog,
) -> RenderFrame {
    let cells = project(template, overlay, geometry, style);
    let clusters = cluster_boundaries(template, geometry);
    let viewport = compute_viewport(&cells, &clusters, geometry);
    let summary = summarize(&cells);
    RenderFrame {
        client_id: template.client_id.clone(),
        template_id: template.id.clone(),
        generated_at: template.generated_at,
        cells,
        clusters,
        viewport,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalogs, ENGAGED_CLIENT_AREA};
    use crate::compose::compose;
    use crate::template::{VisualPatch, default_map_file, default_master_template};

    fn composed() -> FootprintTemplate {
        let master = default_master_template().publish().unwrap();
        let map = default_map_file("acme", &master);
        compose(&master, &map, &Catalogs::builtin())
    }

    fn baseline_cell() -> Cell {
        composed().generated_cells[0].clone()
    }

    // ── fill chain ──────────────────────────────────────────────────

    #[test]
    fn explicit_override_beats_state_key() {
        let style = StyleCatalog::default();
        let mut cell = baseline_cell();
        cell.visual_properties.background_color = "#123456".into();
        cell.cell_state = Some(ENGAGED_CLIENT_AREA.into());
        assert_eq!(resolve_style(&cell, &style).fill, "#123456");
    }

    #[test]
    fn state_key_beats_engagement_state() {
        let style = StyleCatalog::default();
        let mut cell = baseline_cell();
        cell.cell_state = Some(ENGAGED_CLIENT_AREA.into());
        cell.engagement_state = EngagementState::ActivelyPursuing;
        assert_eq!(resolve_style(&cell, &style).fill, "#2E7D32");
        assert_eq!(resolve_style(&cell, &style).text_color, "#FFFFFF");
    }

    #[test]
    fn legacy_key_resolves_like_current_key() {
        let style = StyleCatalog::default();
        let mut legacy = baseline_cell();
        legacy.cell_state = Some("ENGAGED".into());
        let mut current = baseline_cell();
        current.cell_state = Some(ENGAGED_CLIENT_AREA.into());
        assert_eq!(resolve_style(&legacy, &style), resolve_style(&current, &style));
    }

    #[test]
    fn unknown_state_key_falls_through() {
        let style = StyleCatalog::default();
        let mut cell = baseline_cell();
        cell.cell_state = Some("RETIRED_LONG_AGO".into());
        cell.engagement_state = EngagementState::CurrentlyEngaged;
        assert_eq!(resolve_style(&cell, &style).fill, "#4A90E2");
    }

    #[test]
    fn empty_chain_uses_not_engaged_color() {
        let style = StyleCatalog {
            fill_chain: FillChain::new(Vec::<FillRule>::new()),
            ..StyleCatalog::default()
        };
        let mut cell = baseline_cell();
        cell.engagement_state = EngagementState::ActivelyPursuing;
        assert_eq!(resolve_style(&cell, &style).fill, "#E5E5E5");
    }

    #[test]
    fn chain_order_is_configurable() {
        let style = StyleCatalog {
            fill_chain: FillChain::new([FillRule::EngagementState, FillRule::ExplicitOverride]),
            ..StyleCatalog::default()
        };
        let mut cell = baseline_cell();
        cell.visual_properties.background_color = "#123456".into();
        cell.engagement_state = EngagementState::CurrentlyEngaged;
        assert_eq!(resolve_style(&cell, &style).fill, "#4A90E2");
        assert_eq!(style.fill_chain.rules().len(), 2);
    }

    // ── hover ───────────────────────────────────────────────────────

    #[test]
    fn hover_overrides_border_and_restores_exactly() {
        let style = StyleCatalog::default();
        let base = resolve_style(&baseline_cell(), &style);
        let hovered = base.with_hover(&style.hover);
        assert_eq!(hovered.border_color, "#007ACC");
        assert_eq!(hovered.border_width, 3.0);
        assert_eq!(hovered.opacity, 0.8);
        assert_eq!(hovered.fill, base.fill);
        assert_eq!(resolve_style(&baseline_cell(), &style), base);
    }

    // ── overlay ─────────────────────────────────────────────────────

    #[test]
    fn overlay_changes_only_its_cell() {
        let template = composed();
        let style = StyleCatalog::default();
        let geometry = HexGeometry::default();
        let target = template.generated_cells[0].id.clone();
        let overlay = HashMap::from([(
            target.clone(),
            EngagementData::state(target.clone(), EngagementState::ActivelyPursuing),
        )]);

        let plain = project(&template, None, &geometry, &style);
        let lit = project(&template, Some(&overlay), &geometry, &style);

        for (a, b) in plain.iter().zip(&lit) {
            if a.id == target {
                assert_eq!(b.style.fill, "#F5A623");
                assert_eq!(b.style.border_color, a.style.border_color);
            } else {
                assert_eq!(a, b);
            }
        }
        assert_eq!(
            template.cell(&target).map(|c| c.engagement_state),
            Some(EngagementState::NotEngaged)
        );
    }

    #[test]
    fn overlay_for_missing_cell_is_inert() {
        let template = composed();
        let style = StyleCatalog::default();
        let geometry = HexGeometry::default();
        let overlay = HashMap::from([(
            "ghost".to_string(),
            EngagementData::state("ghost", EngagementState::CurrentlyEngaged),
        )]);
        assert_eq!(
            project(&template, Some(&overlay), &geometry, &style),
            project(&template, None, &geometry, &style)
        );
    }

    #[test]
    fn overlay_patch_merges_within_record() {
        let cell = baseline_cell();
        let record = EngagementData {
            cell_id: cell.id.clone(),
            engagement_state: EngagementState::CurrentlyEngaged,
            visual_properties: Some(VisualPatch {
                border_color: Some("#FF0000".into()),
                ..VisualPatch::default()
            }),
            last_updated: None,
        };
        let out = apply_overlay(&cell, Some(&record));
        assert_eq!(out.visual_properties.border_color, "#FF0000");
        assert_eq!(
            out.visual_properties.border_thickness,
            cell.visual_properties.border_thickness
        );
        assert_eq!(out.engagement_state, EngagementState::CurrentlyEngaged);
    }

    // ── frame ───────────────────────────────────────────────────────

    #[test]
    fn summary_counts_every_state() {
        let template = composed();
        let target = template.generated_cells[1].id.clone();
        let overlay = HashMap::from([(
            target.clone(),
            EngagementData::state(target, EngagementState::CurrentlyEngaged),
        )]);
        let frame = build_frame(
            &template,
            Some(&overlay),
            &HexGeometry::default(),
            &StyleCatalog::default(),
        );
        assert_eq!(frame.summary[&EngagementState::CurrentlyEngaged], 1);
        assert_eq!(frame.summary[&EngagementState::NotEngaged], 10);
        assert_eq!(frame.summary[&EngagementState::ActivelyPursuing], 0);
        assert_eq!(frame.template_id, "acme-1.0.0");
    }
}
