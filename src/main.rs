//! Engagement footprint viewer.
//!
//! Composes each requested client's footprint from a master template and its
//! map file, overlays live engagement data and draws the result as a
//! honeycomb. `--dump` prints the render frames as JSON instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bevy::app::AppExit;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
#[cfg(feature = "native")]
use clap::Parser;

use hex_footprint::ViewState;
use hex_footprint::catalog::Catalogs;
use hex_footprint::honeycomb::{ClientRoster, HoneycombConfig, HoneycombPlugin, SourceHandle};
use hex_footprint::source::{
    BuiltinSource, JsonFileSource, TemplateSource, load_engagement, load_footprint,
};
use hex_footprint::store::FootprintStore;

#[cfg_attr(feature = "native", derive(Parser))]
#[cfg_attr(feature = "native", command(author, version, about = "Engagement footprint honeycomb viewer", long_about = None))]
#[derive(Debug, Default)]
struct Args {
    /// Client to show; repeat to cycle between several with the arrow keys
    #[cfg_attr(feature = "native", arg(long = "client"))]
    clients: Vec<String>,

    /// Master template JSON (built-in default template when omitted)
    #[cfg_attr(feature = "native", arg(long))]
    master: Option<PathBuf>,

    /// Directory holding one `<client>.json` map file per client
    /// (`data/maps` with `--master`; laid over the built-in template without)
    #[cfg_attr(feature = "native", arg(long))]
    maps: Option<PathBuf>,

    /// Engagement feed JSON: client id → list of cell records
    #[cfg_attr(feature = "native", arg(long))]
    engagement: Option<PathBuf>,

    /// Print render frames as JSON and exit without opening a window
    #[cfg_attr(feature = "native", arg(long))]
    dump: bool,
}

#[cfg(feature = "native")]
fn args() -> Args {
    Args::parse()
}

#[cfg(not(feature = "native"))]
fn args() -> Args {
    Args::default()
}

fn main() -> AppExit {
    let args = args();
    let mut app = App::new();

    if args.dump {
        app.add_plugins((MinimalPlugins, LogPlugin::default()));
    } else {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Engagement Footprint".into(),
                ..default()
            }),
            ..default()
        }));
    }

    let source = template_source(args.master.as_deref(), args.maps.as_deref());
    let roster = ClientRoster::new(args.clients.iter().cloned());
    let catalogs = Catalogs::builtin();
    let mut store = FootprintStore::default();
    if let Some(path) = &args.engagement {
        match load_engagement(path) {
            Ok(feed) => {
                for (client, records) in feed {
                    store.replace_engagement(&client, records);
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "engagement.load_failed"),
        }
    }

    if args.dump {
        return dump(source.as_ref(), &roster, store, &catalogs);
    }

    app.register_type::<ViewState>()
        .init_state::<ViewState>()
        .insert_resource(catalogs)
        .insert_resource(roster)
        .insert_resource(store)
        .insert_resource(SourceHandle(source))
        .add_plugins(bevy_egui::EguiPlugin::default())
        .add_plugins(HoneycombPlugin(HoneycombConfig::default()))
        .add_systems(Update, exit_on_esc)
        .add_systems(Update, toggle_inspector)
        .add_plugins(WorldInspectorPlugin::new().run_if(in_state(ViewState::Debugging)));

    app.run()
}

fn template_source(
    master: Option<&Path>,
    maps: Option<&Path>,
) -> Arc<dyn TemplateSource + Send + Sync> {
    match (master, maps) {
        (Some(master), maps) => Arc::new(JsonFileSource::new(
            master,
            maps.unwrap_or(Path::new("data/maps")),
        )),
        (None, Some(maps)) => {
            info!(maps = %maps.display(), "source.builtin_master_with_maps");
            Arc::new(JsonFileSource::with_builtin_master(maps))
        }
        (None, None) => Arc::new(BuiltinSource),
    }
}

/// Composes every roster client and prints their render frames to stdout.
fn dump(
    source: &dyn TemplateSource,
    roster: &ClientRoster,
    mut store: FootprintStore,
    catalogs: &Catalogs,
) -> AppExit {
    let geometry = HoneycombConfig::default().geometry;
    let frames: Vec<_> = roster
        .clients()
        .iter()
        .filter_map(|client| {
            store.set_template(load_footprint(source, client, catalogs));
            store.frame(client, &geometry, &catalogs.style)
        })
        .collect();

    match serde_json::to_string_pretty(&frames) {
        Ok(json) => {
            println!("{json}");
            AppExit::Success
        }
        Err(err) => {
            error!(error = %err, "dump.serialize_failed");
            AppExit::error()
        }
    }
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<ViewState>>,
    mut next: ResMut<NextState<ViewState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            ViewState::Footprint => ViewState::Debugging,
            ViewState::Debugging => ViewState::Footprint,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
