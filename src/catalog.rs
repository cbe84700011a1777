//! Static lookup tables the composer and resolver are parameterized by.
//!
//! Nothing here is global: a [`Catalogs`] value is built once (usually with
//! [`Catalogs::builtin`]) and handed to whoever needs it, so tests can swap in
//! their own tables.

use std::collections::HashMap;

use bevy::log::debug;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::resolve::FillChain;
use crate::template::{EngagementState, VisualProperties};

/// Cell-state key for a service area the client owns.
pub const CLIENT_AREA: &str = "CLIENT_AREA";
/// Cell-state key for a service area outside the client.
pub const NON_CLIENT_AREA: &str = "NON_CLIENT_AREA";
/// Cell-state key for a client area with an active engagement.
pub const ENGAGED_CLIENT_AREA: &str = "ENGAGED_CLIENT_AREA";

/// Used when the catalog has no entry for `NOT_ENGAGED` either.
const LAST_RESORT_FILL: &str = "#E5E5E5";

/// Legend metadata for one engagement state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStateMeta {
    /// State described.
    pub state: EngagementState,
    /// Legend label.
    pub display_name: String,
    /// Tooltip text.
    pub description: String,
    /// Fill, `#rrggbb`.
    pub color: String,
    /// Higher sorts first in summaries.
    pub priority: u8,
}

/// Style of one cell-state category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStateStyle {
    /// Canonical key.
    pub key: String,
    /// Human label.
    pub label: String,
    /// Fill.
    pub background_color: String,
    /// Label color drawn on top of the fill.
    pub text_color: String,
    /// Outline.
    pub border_color: String,
}

/// Border/opacity applied while the pointer is over a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverStyle {
    /// Outline color.
    pub border_color: String,
    /// Outline width.
    pub border_width: f32,
    /// Opacity.
    pub opacity: f32,
}

impl Default for HoverStyle {
    fn default() -> Self {
        Self {
            border_color: "#007ACC".into(),
            border_width: 3.0,
            opacity: 0.8,
        }
    }
}

/// Colors and styles used by fill resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleCatalog {
    /// One entry per engagement state.
    pub engagement_states: Vec<EngagementStateMeta>,
    /// Canonical cell-state styles.
    pub cell_states: Vec<CellStateStyle>,
    /// Retired key → canonical key.
    pub legacy_aliases: HashMap<String, String>,
    /// Style every composed cell starts with.
    pub default_visual: VisualProperties,
    /// Hover overlay.
    pub hover: HoverStyle,
    /// Default label color.
    pub text_color: String,
    /// Fill resolution order.
    pub fill_chain: FillChain,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        let engagement_states = vec![
            EngagementStateMeta {
                state: EngagementState::NotEngaged,
                display_name: "Not Engaged".into(),
                description: "No current engagement or activity".into(),
                color: "#E5E5E5".into(),
                priority: 0,
            },
            EngagementStateMeta {
                state: EngagementState::CurrentlyEngaged,
                display_name: "Currently Engaged".into(),
                description: "Active engagement in progress".into(),
                color: "#4A90E2".into(),
                priority: 2,
            },
            EngagementStateMeta {
                state: EngagementState::ActivelyPursuing,
                display_name: "Actively Pursuing".into(),
                description: "Pursuing engagement opportunities".into(),
                color: "#F5A623".into(),
                priority: 1,
            },
        ];

        let cell_states = vec![
            CellStateStyle {
                key: CLIENT_AREA.into(),
                label: "Client Area".into(),
                background_color: "#0277BD".into(),
                text_color: "#FFFFFF".into(),
                border_color: "#01579B".into(),
            },
            CellStateStyle {
                key: NON_CLIENT_AREA.into(),
                label: "Non-Client Area".into(),
                background_color: "#E0E0E0".into(),
                text_color: "#000000".into(),
                border_color: "#9E9E9E".into(),
            },
            CellStateStyle {
                key: ENGAGED_CLIENT_AREA.into(),
                label: "Engaged Client Area".into(),
                background_color: "#2E7D32".into(),
                text_color: "#FFFFFF".into(),
                border_color: "#1B5E20".into(),
            },
        ];

        let legacy_aliases = [
            ("ENGAGED", ENGAGED_CLIENT_AREA),
            ("NOT_ENGAGED", NON_CLIENT_AREA),
            ("ACTIVE_PERSUAL", CLIENT_AREA),
        ]
        .into_iter()
        .map(|(old, new)| (old.to_owned(), new.to_owned()))
        .collect();

        Self {
            engagement_states,
            cell_states,
            legacy_aliases,
            default_visual: VisualProperties {
                border_color: "#333".into(),
                background_color: String::new(),
                border_thickness: 2.0,
                opacity: 1.0,
            },
            hover: HoverStyle::default(),
            text_color: "#333".into(),
            fill_chain: FillChain::default(),
        }
    }
}

impl StyleCatalog {
    /// Legend entry for `state`.
    pub fn engagement_meta(&self, state: EngagementState) -> Option<&EngagementStateMeta> {
        self.engagement_states.iter().find(|m| m.state == state)
    }

    /// Fill for `state`, if the table has one.
    pub fn engagement_color(&self, state: EngagementState) -> Option<&str> {
        self.engagement_meta(state).map(|m| m.color.as_str())
    }

    /// Terminal fill: the `NOT_ENGAGED` color.
    pub fn fallback_fill(&self) -> &str {
        self.engagement_color(EngagementState::NotEngaged)
            .unwrap_or(LAST_RESORT_FILL)
    }

    /// Maps a possibly retired key to its canonical form.
    ///
    /// Returns `None` for keys that are neither canonical nor aliased.
    pub fn canonical_cell_state<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        if self.cell_states.iter().any(|s| s.key == key) {
            return Some(key);
        }
        match self.legacy_aliases.get(key) {
            Some(current) => Some(current.as_str()),
            None => {
                debug!(key, "unknown cell-state key");
                None
            }
        }
    }

    /// Style for a canonical or legacy cell-state key.
    pub fn cell_state(&self, key: &str) -> Option<&CellStateStyle> {
        let canonical = self.canonical_cell_state(key)?;
        self.cell_states.iter().find(|s| s.key == canonical)
    }
}

/// One service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceType {
    /// `ST_*` id.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Short label used on cells.
    pub abbreviation: String,
    /// Grouping.
    pub category: String,
}

/// Service types by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceTypeCatalog {
    types: HashMap<String, ServiceType>,
}

const BUILTIN_SERVICE_TYPES: [(&str, &str, &str, &str); 13] = [
    ("ST_ELN", "Electronic Lab Notebook", "ELN", "Data Management"),
    ("ST_LIMS", "Laboratory Information Management System", "LIMS", "Data Management"),
    ("ST_BI", "Business Intelligence", "BI", "Analytics"),
    ("ST_SDMS", "Scientific Data Management System", "SDMS", "Data Management"),
    ("ST_CDS", "Clinical Data Systems", "CDS", "Clinical"),
    ("ST_EDC", "Electronic Data Capture", "EDC", "Clinical"),
    ("ST_CTMS", "Clinical Trial Management System", "CTMS", "Clinical"),
    ("ST_QMS", "Quality Management System", "QMS", "Quality"),
    ("ST_MES", "Manufacturing Execution System", "MES", "Operations"),
    ("ST_ERP", "Enterprise Resource Planning", "ERP", "Operations"),
    ("ST_REGULATORY_SUBMISSION", "Regulatory Submission Platform", "RSP", "Compliance"),
    ("ST_PHARMACOVIGILANCE", "Pharmacovigilance System", "PV", "Safety"),
    ("ST_CM", "Content Management", "CM", "Content"),
];

impl ServiceTypeCatalog {
    /// The thirteen known service types.
    pub fn builtin() -> Self {
        Self::from_types(BUILTIN_SERVICE_TYPES.iter().map(
            |&(id, name, abbreviation, category)| ServiceType {
                id: id.into(),
                name: name.into(),
                abbreviation: abbreviation.into(),
                category: category.into(),
            },
        ))
    }

    /// Catalog from arbitrary entries; later duplicates win.
    pub fn from_types(types: impl IntoIterator<Item = ServiceType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Entry by id.
    pub fn get(&self, id: &str) -> Option<&ServiceType> {
        self.types.get(id)
    }

    /// Abbreviation for `id`, if known.
    pub fn abbreviation(&self, id: &str) -> Option<&str> {
        self.get(id).map(|t| t.abbreviation.as_str())
    }
}

/// Descriptive metadata of a service area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAreaMeta {
    /// Long name.
    pub display_name: String,
    /// One-line description.
    pub description: String,
    /// Grouping.
    pub category: String,
}

/// Service areas by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceAreaCatalog {
    areas: HashMap<String, ServiceAreaMeta>,
}

const BUILTIN_SERVICE_AREAS: [(&str, &str, &str, &str); 11] = [
    ("ELN", "Electronic Lab Notebook", "Digital laboratory data management and documentation", "Laboratory Systems"),
    ("BI", "Business Intelligence", "Data analytics and reporting solutions", "Analytics"),
    ("SDMS", "Scientific Data Management", "Scientific data storage and management systems", "Data Management"),
    ("CDS", "Clinical Data Systems", "Clinical trial data management and analysis", "Clinical Systems"),
    ("LIMS", "Laboratory Information Management", "Laboratory workflow and sample management", "Laboratory Systems"),
    ("ODM", "Operational Data Store", "Operational data integration and management", "Data Management"),
    ("CM", "Content Management", "Document and content management systems", "Content Systems"),
    ("STRATEGIC_CONSULTING", "Strategic Consulting", "Business strategy and transformation consulting", "Consulting"),
    ("DIGITAL_TRANSFORMATION", "Digital Transformation", "Digital modernization and technology adoption", "Consulting"),
    ("REGULATORY_AFFAIRS", "Regulatory Affairs", "Regulatory compliance and submission management", "Compliance"),
    ("QUALITY_ASSURANCE", "Quality Assurance", "Quality management and validation services", "Quality"),
];

impl ServiceAreaCatalog {
    /// The eleven known service areas.
    pub fn builtin() -> Self {
        Self {
            areas: BUILTIN_SERVICE_AREAS
                .iter()
                .map(|&(id, display_name, description, category)| {
                    (
                        id.to_owned(),
                        ServiceAreaMeta {
                            display_name: display_name.into(),
                            description: description.into(),
                            category: category.into(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Metadata for `id`; unknown areas yield `None`.
    pub fn get(&self, id: &str) -> Option<&ServiceAreaMeta> {
        self.areas.get(id)
    }
}

/// Every table the composer and resolver read.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct Catalogs {
    /// Fill and border styles.
    pub style: StyleCatalog,
    /// Service-type abbreviations.
    pub service_types: ServiceTypeCatalog,
    /// Service-area descriptions.
    pub service_areas: ServiceAreaCatalog,
}

impl Catalogs {
    /// Built-in tables.
    pub fn builtin() -> Self {
        Self {
            style: StyleCatalog::default(),
            service_types: ServiceTypeCatalog::builtin(),
            service_areas: ServiceAreaCatalog::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── style catalog ───────────────────────────────────────────────

    #[test]
    fn legacy_keys_resolve_to_current_styles() {
        let style = StyleCatalog::default();
        for (old, new) in [
            ("ENGAGED", ENGAGED_CLIENT_AREA),
            ("NOT_ENGAGED", NON_CLIENT_AREA),
            ("ACTIVE_PERSUAL", CLIENT_AREA),
        ] {
            assert_eq!(style.cell_state(old), style.cell_state(new), "{old}");
            assert!(style.cell_state(old).is_some());
        }
    }

    #[test]
    fn unknown_key_is_no_match() {
        let style = StyleCatalog::default();
        assert_eq!(style.canonical_cell_state("BOGUS"), None);
        assert!(style.cell_state("BOGUS").is_none());
    }

    #[test]
    fn engagement_colors() {
        let style = StyleCatalog::default();
        assert_eq!(
            style.engagement_color(EngagementState::ActivelyPursuing),
            Some("#F5A623")
        );
        assert_eq!(style.fallback_fill(), "#E5E5E5");
    }

    #[test]
    fn fallback_survives_empty_table() {
        let style = StyleCatalog {
            engagement_states: Vec::new(),
            ..StyleCatalog::default()
        };
        assert_eq!(style.fallback_fill(), LAST_RESORT_FILL);
    }

    #[test]
    fn default_visual_leaves_fill_open() {
        assert!(StyleCatalog::default().default_visual.background_color.is_empty());
    }

    // ── service catalogs ────────────────────────────────────────────

    #[test]
    fn abbreviations() {
        let types = ServiceTypeCatalog::builtin();
        assert_eq!(types.abbreviation("ST_ELN"), Some("ELN"));
        assert_eq!(types.abbreviation("ST_REGULATORY_SUBMISSION"), Some("RSP"));
        assert_eq!(types.abbreviation("ST_ODM"), None);
    }

    #[test]
    fn service_area_lookup() {
        let areas = ServiceAreaCatalog::builtin();
        assert_eq!(
            areas.get("LIMS").map(|m| m.category.as_str()),
            Some("Laboratory Systems")
        );
        assert!(areas.get("UNKNOWN").is_none());
    }
}
