use bevy::asset::RenderAssetUsages;
use bevy::camera::ScalingMode;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::mesh::Indices;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use bevy::window::PrimaryWindow;
use bevy_egui::{EguiContext, egui};

use super::HoneycombConfig;
use super::blueprint::{BlueprintCanvas, draw_outline};
use super::entities::{
    BlueprintVisible, CellBorder, ClientRoster, CurrentFrame, FootprintCamera, HexCell,
    HoveredCell, SourceHandle,
};
use crate::catalog::Catalogs;
use crate::hex_math::{HexGeometry, hex_polygon};
use crate::resolve::RenderFrame;
use crate::source::load_footprint;
use crate::store::FootprintStore;
use crate::template::EngagementData;

/// Outline rings sit this far above their fill.
const BORDER_LIFT: f32 = 0.1;
/// Cluster outlines sit this far above the cells.
const OUTLINE_LIFT: f32 = 0.2;

/// Pixel space (x right, y down) → drawing plane (x right, z down-screen).
pub(super) fn to_world(pixel: Vec2, lift: f32) -> Vec3 {
    Vec3::new(pixel.x, lift, pixel.y)
}

// ── Startup ─────────────────────────────────────────────────────────

/// Spawns the top-down orthographic camera.
pub fn setup_camera(mut commands: Commands, cfg: Res<HoneycombConfig>) {
    commands.spawn((
        Name::new("FootprintCamera"),
        Camera3d::default(),
        Tonemapping::None,
        Projection::from(OrthographicProjection {
            scaling_mode: ScalingMode::AutoMin {
                min_width: 800.0,
                min_height: 600.0,
            },
            ..OrthographicProjection::default_3d()
        }),
        Transform::from_xyz(0.0, cfg.camera_height, 0.0).looking_at(Vec3::ZERO, Vec3::NEG_Z),
        FootprintCamera,
    ));
}

/// Composes the selected client's footprint into the store.
pub fn load_current_client(
    mut store: ResMut<FootprintStore>,
    roster: Res<ClientRoster>,
    source: Res<SourceHandle>,
    catalogs: Res<Catalogs>,
) {
    store.set_template(load_footprint(
        source.0.as_ref(),
        roster.current(),
        &catalogs,
    ));
}

// ── Update: input ───────────────────────────────────────────────────

/// Left/right arrows select the previous/next client and load it afresh.
pub fn switch_client(
    keys: Res<ButtonInput<KeyCode>>,
    mut roster: ResMut<ClientRoster>,
    mut store: ResMut<FootprintStore>,
    mut hovered: ResMut<HoveredCell>,
    source: Res<SourceHandle>,
    catalogs: Res<Catalogs>,
) {
    let delta = if keys.just_pressed(KeyCode::ArrowRight) {
        1
    } else if keys.just_pressed(KeyCode::ArrowLeft) {
        -1
    } else {
        return;
    };
    roster.step(delta);
    hovered.0 = None;
    info!(client = roster.current(), "client.selected");
    store.set_template(load_footprint(
        source.0.as_ref(),
        roster.current(),
        &catalogs,
    ));
}

/// `B` toggles the blank blueprint.
pub fn toggle_blueprint(keys: Res<ButtonInput<KeyCode>>, mut visible: ResMut<BlueprintVisible>) {
    if keys.just_pressed(KeyCode::KeyB) {
        visible.0 = !visible.0;
    }
}

/// Updates [`HoveredCell`] from the cursor position.
pub fn track_hover(
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_q: Query<(&Camera, &GlobalTransform), With<FootprintCamera>>,
    frame: Res<CurrentFrame>,
    blueprint: Res<BlueprintVisible>,
    cfg: Res<HoneycombConfig>,
    mut hovered: ResMut<HoveredCell>,
) {
    let hit = if blueprint.0 {
        None
    } else {
        cursor_on_plane(&windows, &camera_q)
            .zip(frame.0.as_ref())
            .and_then(|(point, frame)| hit_test(frame, &cfg.geometry, point))
            .map(str::to_owned)
    };
    hovered.set_if_neq(HoveredCell(hit));
}

/// Cell a click lands on. Clicks taken by an egui window never reach the
/// honeycomb below it.
fn click_target(pressed: bool, pointer_on_ui: bool, hovered: Option<&str>) -> Option<&str> {
    if !pressed || pointer_on_ui {
        return None;
    }
    hovered
}

/// A left click on the hovered cell advances its live engagement state.
pub fn cycle_clicked_cell(
    mouse: Res<ButtonInput<MouseButton>>,
    mut egui_ctx: Query<&mut EguiContext>,
    hovered: Res<HoveredCell>,
    roster: Res<ClientRoster>,
    mut store: ResMut<FootprintStore>,
) {
    let pressed = mouse.just_pressed(MouseButton::Left);
    let pointer_on_ui = pressed
        && egui_ctx.single_mut().is_ok_and(|mut ctx| {
            let ctx = ctx.get_mut();
            ctx.wants_pointer_input() || ctx.is_pointer_over_area()
        });
    let Some(cell_id) = click_target(pressed, pointer_on_ui, hovered.0.as_deref()) else {
        return;
    };
    let client = roster.current();
    let Some(state) = store.effective_state(client, cell_id) else {
        return;
    };
    let next = state.cycle();
    info!(client, cell = cell_id, state = next.key(), "cell.state_cycled");
    store.upsert_engagement(client, EngagementData::state(cell_id, next));
}

// ── Update: frame sync ──────────────────────────────────────────────

/// Rebuilds [`CurrentFrame`] when the store, selection or catalogs change.
pub fn refresh_frame(
    store: Res<FootprintStore>,
    roster: Res<ClientRoster>,
    catalogs: Res<Catalogs>,
    cfg: Res<HoneycombConfig>,
    mut frame: ResMut<CurrentFrame>,
) {
    if !(store.is_changed() || roster.is_changed() || catalogs.is_changed()) {
        return;
    }
    frame.0 = store.frame(roster.current(), &cfg.geometry, &catalogs.style);
}

/// Replaces every [`HexCell`] entity when the frame changes.
pub fn respawn_cells(
    mut commands: Commands,
    frame: Res<CurrentFrame>,
    existing: Query<Entity, With<HexCell>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    catalogs: Res<Catalogs>,
    cfg: Res<HoneycombConfig>,
) {
    if !frame.is_changed() {
        return;
    }
    for entity in &existing {
        commands.entity(entity).despawn();
    }
    let Some(frame) = &frame.0 else { return };

    let size = cfg.geometry.hex_size;
    let fill_mesh = meshes.add(build_hex_fill_mesh(size));
    let hover_ring = meshes.add(build_hex_ring_mesh(size, catalogs.style.hover.border_width));
    let mut rings: HashMap<u32, Handle<Mesh>> = HashMap::new();

    for cell in &frame.cells {
        let style = &cell.style;
        let base_ring = rings
            .entry(style.border_width.to_bits())
            .or_insert_with(|| meshes.add(build_hex_ring_mesh(size, style.border_width)))
            .clone();
        let fill_material = materials.add(flat_material(parse_color(&style.fill, style.opacity)));
        let border_material = materials.add(flat_material(parse_color(
            &style.border_color,
            style.opacity,
        )));

        let border = commands
            .spawn((
                CellBorder,
                Name::new(format!("{} border", cell.id)),
                Mesh3d(base_ring.clone()),
                MeshMaterial3d(border_material.clone()),
                Transform::from_xyz(0.0, BORDER_LIFT, 0.0),
            ))
            .id();

        commands
            .spawn((
                HexCell {
                    id: cell.id.clone(),
                    base: style.clone(),
                    fill_material: fill_material.clone(),
                    border_material,
                    base_ring,
                    hover_ring: hover_ring.clone(),
                    border,
                },
                Name::new(cell.id.clone()),
                Mesh3d(fill_mesh.clone()),
                MeshMaterial3d(fill_material),
                Transform::from_translation(to_world(cell.pixel, 0.0)),
            ))
            .add_child(border);
    }
}

/// Applies the hover overlay to the hovered cell and the resolved style to
/// every other cell.
pub fn apply_hover_style(
    hovered: Res<HoveredCell>,
    cells: Query<&HexCell>,
    added: Query<(), Added<HexCell>>,
    mut borders: Query<&mut Mesh3d, With<CellBorder>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    catalogs: Res<Catalogs>,
) {
    if !hovered.is_changed() && added.is_empty() {
        return;
    }
    for cell in &cells {
        let is_hovered = hovered.0.as_deref() == Some(cell.id.as_str());
        let style = if is_hovered {
            cell.base.with_hover(&catalogs.style.hover)
        } else {
            cell.base.clone()
        };
        if let Some(mat) = materials.get_mut(&cell.fill_material) {
            mat.base_color = parse_color(&style.fill, style.opacity);
        }
        if let Some(mat) = materials.get_mut(&cell.border_material) {
            mat.base_color = parse_color(&style.border_color, style.opacity);
        }
        if let Ok(mut mesh) = borders.get_mut(cell.border) {
            mesh.0 = if is_hovered {
                cell.hover_ring.clone()
            } else {
                cell.base_ring.clone()
            };
        }
    }
}

/// Hides cells while the blueprint is shown.
pub fn sync_cell_visibility(
    blueprint: Res<BlueprintVisible>,
    added: Query<(), Added<HexCell>>,
    mut cells: Query<&mut Visibility, With<HexCell>>,
) {
    if !blueprint.is_changed() && added.is_empty() {
        return;
    }
    let visibility = if blueprint.0 {
        Visibility::Hidden
    } else {
        Visibility::Inherited
    };
    for mut v in &mut cells {
        *v = visibility;
    }
}

/// Frames the footprint viewport, or the blueprint canvas while it is shown.
pub fn fit_camera(
    frame: Res<CurrentFrame>,
    blueprint: Res<BlueprintVisible>,
    canvas: Res<BlueprintCanvas>,
    cfg: Res<HoneycombConfig>,
    mut camera_q: Query<(&mut Transform, &mut Projection), With<FootprintCamera>>,
) {
    if !(frame.is_changed() || blueprint.is_changed()) {
        return;
    }
    let viewport = if blueprint.0 {
        canvas.viewport
    } else {
        match &frame.0 {
            Some(frame) => frame.viewport,
            None => return,
        }
    };
    let Ok((mut transform, mut projection)) = camera_q.single_mut() else {
        return;
    };

    let center = viewport.center();
    *transform = Transform::from_translation(to_world(center, cfg.camera_height))
        .looking_at(to_world(center, 0.0), Vec3::NEG_Z);
    if let Projection::Orthographic(ortho) = &mut *projection {
        ortho.scaling_mode = ScalingMode::AutoMin {
            min_width: viewport.width(),
            min_height: viewport.height(),
        };
    }
}

// ── Update: overlays ────────────────────────────────────────────────

/// Gizmo outline around each visible cluster.
pub fn draw_cluster_outlines(
    frame: Res<CurrentFrame>,
    blueprint: Res<BlueprintVisible>,
    cfg: Res<HoneycombConfig>,
    mut gizmos: Gizmos,
) {
    if blueprint.0 {
        return;
    }
    let Some(frame) = &frame.0 else { return };
    for boundary in &frame.clusters {
        draw_outline(
            &mut gizmos,
            boundary.center,
            boundary.radius,
            OUTLINE_LIFT,
            cfg.outline_color,
        );
    }
}

/// Draws cell and cluster labels (or blueprint slot labels) as
/// screen-projected egui text.
pub fn draw_cell_labels(
    mut egui_ctx: Query<&mut EguiContext>,
    camera_q: Query<(&Camera, &GlobalTransform), With<FootprintCamera>>,
    frame: Res<CurrentFrame>,
    blueprint: Res<BlueprintVisible>,
    canvas: Res<BlueprintCanvas>,
    cfg: Res<HoneycombConfig>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };

    let painter = ctx.get_mut().layer_painter(egui::LayerId::background());
    let font = egui::FontId::proportional(cfg.label_font_size);
    let label = |pixel: Vec2, text: &str, color: egui::Color32| {
        if let Ok(at) = camera.world_to_viewport(cam_gt, to_world(pixel, 0.0)) {
            painter.text(
                egui::pos2(at.x, at.y),
                egui::Align2::CENTER_CENTER,
                text,
                font.clone(),
                color,
            );
        }
    };

    if blueprint.0 {
        let color = egui_color(&cfg.blueprint.line_color);
        for cluster in &canvas.clusters {
            let title = cluster.anchor.center - Vec2::new(0.0, canvas.cluster_radius * 0.8);
            label(title, &cluster.anchor.id, color);
            for slot in &cluster.slots {
                label(slot.center, &slot.label, color);
            }
        }
        return;
    }

    let Some(frame) = &frame.0 else { return };
    for cell in &frame.cells {
        label(
            cell.pixel,
            &cell.label,
            egui_color(&parse_color(&cell.style.text_color, 1.0)),
        );
    }
    let title_color = egui_color(&cfg.outline_color);
    for boundary in &frame.clusters {
        if let Some(title) = &boundary.label {
            let at = boundary.center - Vec2::new(0.0, boundary.radius * 0.9);
            label(at, title, title_color);
        }
    }
}

/// Legend window: client, state counts, hovered cell details, key hints.
pub fn draw_legend(
    mut egui_ctx: Query<&mut EguiContext>,
    frame: Res<CurrentFrame>,
    roster: Res<ClientRoster>,
    hovered: Res<HoveredCell>,
    catalogs: Res<Catalogs>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };

    let mut states: Vec<_> = catalogs.style.engagement_states.iter().collect();
    states.sort_by(|a, b| b.priority.cmp(&a.priority));

    egui::Window::new("Engagement")
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .resizable(false)
        .collapsible(false)
        .show(ctx.get_mut(), |ui| {
            ui.label(egui::RichText::new(roster.current()).strong());
            let Some(frame) = &frame.0 else {
                ui.label("no footprint loaded");
                return;
            };
            ui.small(format!("template {}", frame.template_id));
            ui.separator();

            for meta in states {
                let count = frame.summary.get(&meta.state).copied().unwrap_or(0);
                ui.horizontal(|ui| {
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                    ui.painter()
                        .rect_filled(rect, 2.0, egui_color(&parse_color(&meta.color, 1.0)));
                    ui.label(format!("{} ({count})", meta.display_name))
                        .on_hover_text(meta.description.as_str());
                });
            }

            if let Some(cell) = hovered
                .0
                .as_deref()
                .and_then(|id| frame.cells.iter().find(|c| c.id == id))
            {
                ui.separator();
                ui.label(egui::RichText::new(cell.label.as_str()).strong());
                match catalogs.service_areas.get(cell.service_area.as_str()) {
                    Some(area) => {
                        ui.label(area.display_name.as_str());
                        ui.small(format!("{} · {}", area.category, area.description));
                    }
                    None => {
                        ui.label(cell.service_area.as_str());
                    }
                }
                if let Some(meta) = catalogs.style.engagement_meta(cell.engagement_state) {
                    ui.small(meta.display_name.as_str());
                }
            }

            ui.separator();
            ui.small("←/→ client · click cycle state · B blueprint · Tab inspect · Esc quit");
        });
}

// ── Pure helpers ───────────────────────────────────────────────────

/// Id of the cell whose outline contains `point`, if any.
pub fn hit_test<'a>(frame: &'a RenderFrame, geometry: &HexGeometry, point: Vec2) -> Option<&'a str> {
    let hex = geometry.pixel_to_axial(point);
    frame
        .cells
        .iter()
        .find(|c| c.position == hex && c.pixel.distance(point) <= geometry.hex_size)
        .map(|c| c.id.as_str())
}

fn cursor_on_plane(
    windows: &Query<&Window, With<PrimaryWindow>>,
    camera_q: &Query<(&Camera, &GlobalTransform), With<FootprintCamera>>,
) -> Option<Vec2> {
    let window = windows.single().ok()?;
    let cursor = window.cursor_position()?;
    let (camera, cam_gt) = camera_q.single().ok()?;
    let ray = camera.viewport_to_world(cam_gt, cursor).ok()?;
    let distance = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))?;
    let hit = ray.get_point(distance);
    Some(Vec2::new(hit.x, hit.z))
}

fn parse_color(hex: &str, alpha: f32) -> Color {
    match Srgba::hex(hex) {
        Ok(c) => Color::Srgba(Srgba { alpha, ..c }),
        Err(err) => {
            debug!(color = hex, error = %err, "unparsable color");
            Color::srgba(1.0, 0.0, 1.0, alpha)
        }
    }
}

fn egui_color(color: &Color) -> egui::Color32 {
    let c = color.to_srgba();
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(byte(c.red), byte(c.green), byte(c.blue), byte(c.alpha))
}

fn flat_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        cull_mode: None,
        ..default()
    }
}

fn build_hex_fill_mesh(size: f32) -> Mesh {
    let rim = hex_polygon(Vec2::ZERO, size);
    let positions: Vec<[f32; 3]> = std::iter::once(Vec3::ZERO)
        .chain(rim.iter().map(|&v| to_world(v, 0.0)))
        .map(|v| v.to_array())
        .collect();
    let uvs: Vec<[f32; 2]> = std::iter::once([0.5, 0.5])
        .chain(rim.iter().map(|v| [0.5 + v.x / (2.0 * size), 0.5 + v.y / (2.0 * size)]))
        .collect();
    let normals = vec![[0.0, 1.0, 0.0]; positions.len()];
    let indices: Vec<u16> = (0..6u16)
        .flat_map(|i| [0, 1 + i, 1 + (i + 1) % 6])
        .collect();

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_indices(Indices::U16(indices))
}

fn build_hex_ring_mesh(size: f32, width: f32) -> Mesh {
    let outer = hex_polygon(Vec2::ZERO, size);
    let inner = hex_polygon(Vec2::ZERO, (size - width).max(0.0));
    let positions: Vec<[f32; 3]> = outer
        .iter()
        .chain(inner.iter())
        .map(|&v| to_world(v, 0.0).to_array())
        .collect();
    let uvs: Vec<[f32; 2]> = (0..12)
        .map(|i| [(i % 6) as f32 / 6.0, if i < 6 { 0.0 } else { 1.0 }])
        .collect();
    let normals = vec![[0.0, 1.0, 0.0]; positions.len()];
    let indices: Vec<u16> = (0..6u16)
        .flat_map(|i| {
            let next = (i + 1) % 6;
            [i, next, 6 + next, i, 6 + next, 6 + i]
        })
        .collect();

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_indices(Indices::U16(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StyleCatalog;
    use crate::source::BuiltinSource;

    fn frame() -> RenderFrame {
        let mut store = FootprintStore::default();
        store.set_template(load_footprint(&BuiltinSource, "acme", &Catalogs::builtin()));
        store
            .frame("acme", &HexGeometry::default(), &StyleCatalog::default())
            .unwrap()
    }

    #[test]
    fn hit_test_finds_cell_at_its_center() {
        let frame = frame();
        let geometry = HexGeometry::default();
        let cell = &frame.cells[3];
        assert_eq!(
            hit_test(&frame, &geometry, cell.pixel + Vec2::new(5.0, -5.0)),
            Some(cell.id.as_str())
        );
    }

    #[test]
    fn hit_test_misses_gap_between_cells() {
        let frame = frame();
        let geometry = HexGeometry::default();
        let cell = &frame.cells[0];
        let gap = cell.pixel + Vec2::new(geometry.hex_size + 5.0, 0.0);
        assert_eq!(hit_test(&frame, &geometry, gap), None);
    }

    #[test]
    fn clicks_over_egui_do_not_reach_cells() {
        assert_eq!(click_target(true, false, Some("H1-C1")), Some("H1-C1"));
        assert_eq!(click_target(true, true, Some("H1-C1")), None);
        assert_eq!(click_target(false, false, Some("H1-C1")), None);
        assert_eq!(click_target(true, false, None), None);
    }

    #[test]
    fn pixel_y_maps_to_world_z() {
        assert_eq!(to_world(Vec2::new(3.0, 4.0), 1.0), Vec3::new(3.0, 1.0, 4.0));
    }

    #[test]
    fn colors_parse_short_and_long_hex() {
        assert_eq!(parse_color("#333", 1.0), Color::Srgba(Srgba::hex("333333").unwrap()));
        let c = parse_color("#F5A623", 0.8).to_srgba();
        assert!((c.alpha - 0.8).abs() < 1e-6);
        assert_eq!(egui_color(&parse_color("#FFFFFF", 1.0)), egui::Color32::WHITE);
    }

    #[test]
    fn bad_color_falls_back_to_magenta() {
        let c = parse_color("not-a-color", 1.0).to_srgba();
        assert_eq!((c.red, c.green, c.blue), (1.0, 0.0, 1.0));
    }
}
