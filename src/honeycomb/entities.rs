use std::sync::Arc;

use bevy::prelude::*;

use crate::DEFAULT_CLIENT_ID;
use crate::resolve::{RenderFrame, ResolvedStyle};
use crate::source::TemplateSource;

/// Marker for the top-down orthographic camera.
#[derive(Component, Reflect)]
pub struct FootprintCamera;

/// One drawn cell: the fill entity. Its outline is the [`CellBorder`] child.
#[derive(Component, Reflect)]
pub struct HexCell {
    /// Cell id.
    pub id: String,
    /// Resolved style before hover.
    pub base: ResolvedStyle,
    /// Fill material, owned by this cell.
    pub fill_material: Handle<StandardMaterial>,
    /// Outline material, owned by this cell.
    pub border_material: Handle<StandardMaterial>,
    /// Outline ring at the resolved border width.
    pub base_ring: Handle<Mesh>,
    /// Outline ring at the hover border width.
    pub hover_ring: Handle<Mesh>,
    /// Outline child entity.
    pub border: Entity,
}

/// Marker on outline ring entities.
#[derive(Component, Reflect)]
pub struct CellBorder;

/// Clients the view can switch between.
#[derive(Resource, Debug, Clone, Reflect)]
pub struct ClientRoster {
    clients: Vec<String>,
    current: usize,
}

impl Default for ClientRoster {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl ClientRoster {
    /// Roster over `clients` in order, duplicates dropped. An empty list
    /// yields the default client.
    pub fn new(clients: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for c in clients.into_iter().map(Into::into) {
            if !unique.contains(&c) {
                unique.push(c);
            }
        }
        if unique.is_empty() {
            unique.push(DEFAULT_CLIENT_ID.to_owned());
        }
        Self {
            clients: unique,
            current: 0,
        }
    }

    /// Selected client.
    pub fn current(&self) -> &str {
        &self.clients[self.current]
    }

    /// All clients in order.
    pub fn clients(&self) -> &[String] {
        &self.clients
    }

    /// Moves the selection by `delta`, wrapping at both ends.
    pub fn step(&mut self, delta: isize) {
        let len = self.clients.len() as isize;
        self.current = (self.current as isize + delta).rem_euclid(len) as usize;
    }
}

/// Template source used for every (re)load.
#[derive(Resource, Clone)]
pub struct SourceHandle(pub Arc<dyn TemplateSource + Send + Sync>);

/// Cell under the pointer.
#[derive(Resource, Default, Debug, Clone, PartialEq, Reflect)]
pub struct HoveredCell(pub Option<String>);

/// Whether the blank blueprint replaces the footprint.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct BlueprintVisible(pub bool);

/// Frame of the selected client, rebuilt when the store or selection changes.
#[derive(Resource, Default)]
pub struct CurrentFrame(pub Option<RenderFrame>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_defaults_and_dedupes() {
        assert_eq!(ClientRoster::default().current(), DEFAULT_CLIENT_ID);
        let roster = ClientRoster::new(["a", "b", "a"]);
        assert_eq!(roster.clients(), ["a", "b"]);
    }

    #[test]
    fn roster_wraps_both_ways() {
        let mut roster = ClientRoster::new(["a", "b", "c"]);
        roster.step(-1);
        assert_eq!(roster.current(), "c");
        roster.step(2);
        assert_eq!(roster.current(), "b");
    }
}
