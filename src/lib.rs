#![warn(missing_docs)]
//! Hexagonal honeycomb layout and template composition for an engagement
//! footprint.
//!
//! A shared [`template::MasterTemplate`] of clusters and slots is combined
//! with a per-client [`template::MapFile`] into renderable cells
//! ([`compose::compose`]). A live engagement overlay is projected onto those
//! cells at render time ([`resolve::project`]) without touching the stored
//! template. The [`honeycomb`] plugin draws the result with Bevy.

pub mod catalog;
pub mod cluster_layout;
pub mod compose;
pub mod hex_math;
pub mod honeycomb;
pub mod resolve;
pub mod slots;
pub mod source;
pub mod store;
pub mod template;
pub mod viewport;

use bevy::prelude::*;

/// Client shown when none is requested.
pub const DEFAULT_CLIENT_ID: &str = "regeneron";

/// Application-wide view state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum ViewState {
    /// Normal footprint view.
    #[default]
    Footprint,
    /// Inspector overlay active (Tab to toggle).
    Debugging,
}
