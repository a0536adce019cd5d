use std::collections::HashMap;

use eframe::egui::{self, Color32, DragValue, Slider, TextEdit, Ui};
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoints, Points};
use egui_tiles::{Behavior, SimplificationOptions, TileId, Tiles, UiResponse};

use crate::color::series_colors;
use crate::resource::ResourceRegistry;
use crate::state::AppState;
use crate::view::canvas::{AxisView, MAX_SCALE, MIN_SCALE};
use crate::view::dock::{DockPane, PlotDock};
use crate::view::series::{data_limits, series_from_array, SeriesSet};
use crate::view::{DockId, PlotArgs, PlotDocks, PlotType};

// ---------------------------------------------------------------------------
// Series cache
// ---------------------------------------------------------------------------

struct CachedSeries {
    revision: u64,
    args: PlotArgs,
    max_points: usize,
    /// Names of every column of the source, for the series menu.
    columns: Vec<String>,
    set: SeriesSet,
}

/// Drawable series per dock, rebuilt only when the registry or the plot
/// arguments change.
#[derive(Default)]
pub struct SeriesCache {
    entries: HashMap<DockId, CachedSeries>,
}

impl SeriesCache {
    /// Column names and series for a dock, or `None` if its resource is gone.
    pub fn get(
        &mut self,
        id: DockId,
        args: &PlotArgs,
        registry: &ResourceRegistry,
        max_points: usize,
    ) -> Option<(&[String], &SeriesSet)> {
        let stale = self.entries.get(&id).map_or(true, |c| {
            c.revision != registry.revision() || &c.args != args || c.max_points != max_points
        });
        if stale {
            let Some(resource) = registry.get(&args.resource) else {
                self.entries.remove(&id);
                return None;
            };
            let array = resource.to_array();
            let entry = CachedSeries {
                revision: registry.revision(),
                args: args.clone(),
                max_points,
                columns: (0..array.cols).map(|c| array.column_name(c)).collect(),
                set: series_from_array(&array, args, max_points),
            };
            log::debug!("Built {} series for plot dock {id}", entry.set.series.len());
            self.entries.insert(id, entry);
        }
        self.entries
            .get(&id)
            .map(|c| (c.columns.as_slice(), &c.set))
    }

    /// Forget docks that no longer exist.
    pub fn retain(&mut self, live: impl Fn(DockId) -> bool) {
        self.entries.retain(|id, _| live(*id));
    }
}

// ---------------------------------------------------------------------------
// Dock area (central panel)
// ---------------------------------------------------------------------------

/// Render every plot dock, grouped into tabs, in the central panel.
pub fn dock_area(ui: &mut Ui, state: &mut AppState, cache: &mut SeriesCache) {
    if state.docks.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Right-click a resource and choose Plot to open a plot dock");
        });
        return;
    }

    state.docks.rebuild_tree_if_needed();
    let mut tree = state.docks.take_tree();
    let groups = state.docks.groups();
    let new_group = state.docks.new_group_name();
    let mut behavior = DockBehavior {
        docks: &mut state.docks,
        registry: &state.registry,
        cache: &mut *cache,
        max_points: state.config.max_plot_points,
        groups,
        new_group,
        moves: Vec::new(),
    };
    tree.ui(&mut behavior, ui);
    let moves = std::mem::take(&mut behavior.moves);

    state.docks.put_tree(tree);
    state.docks.sync_from_tree();
    for (id, group) in moves {
        state.docks.move_to_group(id, &group);
    }
    let docks = &state.docks;
    cache.retain(|id| docks.get(id).is_some());
}

struct DockBehavior<'a> {
    docks: &'a mut PlotDocks,
    registry: &'a ResourceRegistry,
    cache: &'a mut SeriesCache,
    max_points: usize,
    groups: Vec<String>,
    new_group: String,
    /// Group changes requested from dock toolbars, applied after drawing.
    moves: Vec<(DockId, String)>,
}

impl Behavior<DockPane> for DockBehavior<'_> {
    fn tab_title_for_pane(&mut self, pane: &DockPane) -> egui::WidgetText {
        match self.docks.get(pane.id) {
            Some(dock) => dock.window_title().into(),
            None => format!("plot {}", pane.id).into(),
        }
    }

    fn pane_ui(&mut self, ui: &mut Ui, _tile_id: TileId, pane: &mut DockPane) -> UiResponse {
        match self.docks.get_mut(pane.id) {
            Some(dock) => {
                let target = plot_dock_ui(
                    ui,
                    dock,
                    self.registry,
                    self.cache,
                    self.max_points,
                    &self.groups,
                    &self.new_group,
                );
                if let Some(group) = target {
                    self.moves.push((pane.id, group));
                }
            }
            None => {
                ui.colored_label(Color32::LIGHT_RED, "Missing plot dock");
            }
        }
        UiResponse::None
    }

    fn is_tab_closable(&self, _tiles: &Tiles<DockPane>, _tile_id: TileId) -> bool {
        true
    }

    fn simplification_options(&self) -> SimplificationOptions {
        SimplificationOptions {
            all_panes_must_have_tabs: true,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// One plot dock
// ---------------------------------------------------------------------------

/// Toolbar, view controls and canvas of one dock. Returns the group the
/// user asked to move the dock to.
fn plot_dock_ui(
    ui: &mut Ui,
    dock: &mut PlotDock,
    registry: &ResourceRegistry,
    cache: &mut SeriesCache,
    max_points: usize,
    groups: &[String],
    new_group: &str,
) -> Option<String> {
    let mut target = None;
    let args_before = dock.state.plot_args.clone();

    let columns = match cache.get(dock.id, &dock.state.plot_args, registry, max_points) {
        Some((columns, _)) => columns.to_vec(),
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.colored_label(
                    Color32::LIGHT_RED,
                    format!("Resource '{}' is no longer open", dock.state.plot_args.resource),
                );
            });
            return None;
        }
    };

    // ---- toolbar ----
    ui.horizontal(|ui: &mut Ui| {
        ui.add(TextEdit::singleline(&mut dock.state.title).desired_width(120.0))
            .on_hover_text("Plot title");
        ui.separator();
        for plot_type in PlotType::ALL {
            ui.selectable_value(&mut dock.state.plot_type, *plot_type, plot_type.label());
        }
        ui.separator();
        series_menu(ui, dock.id, &mut dock.state.plot_args, &columns);
        if ui.button("⟲ Reset").on_hover_text("Back to the full data extent").clicked() {
            dock.state.update_canvas(|c| c.reset());
            dock.needs_apply = true;
        }
        ui.separator();
        egui::ComboBox::from_id_salt(("tab_group", dock.id))
            .selected_text(&dock.tab_group)
            .show_ui(ui, |ui: &mut Ui| {
                for group in groups {
                    if ui.selectable_label(*group == dock.tab_group, group).clicked() {
                        target = Some(group.clone());
                    }
                }
                if ui.selectable_label(false, format!("New group ({new_group})")).clicked() {
                    target = Some(new_group.to_string());
                }
            });
    });

    // ---- axis controls ----
    let mut canvas = dock.state.canvas();
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        changed |= axis_controls(ui, "x", &mut canvas.x);
        ui.separator();
        changed |= axis_controls(ui, "y", &mut canvas.y);
    });
    if changed {
        dock.state.set_canvas(&canvas);
        dock.needs_apply = true;
    }

    let Some((_, set)) = cache.get(dock.id, &dock.state.plot_args, registry, max_points) else {
        return target;
    };

    // Series choice changed: the old view no longer fits the data.
    if dock.state.plot_args != args_before {
        let (xlim, ylim) = data_limits(set);
        dock.state.rehome(xlim, ylim);
        dock.needs_apply = true;
    }

    // ---- canvas ----
    let apply = dock.needs_apply.then(|| dock.state.canvas().visible_bounds());
    let colors = series_colors(set.series.len(), (dock.number as f32 * 47.0).rem_euclid(360.0));
    let plot_type = dock.state.plot_type;

    let response = Plot::new(("plot_dock", dock.id))
        .legend(Legend::default())
        .x_axis_label(set.x_label.clone())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if let Some((min, max)) = apply {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
            }
            for (series, color) in set.series.iter().zip(&colors) {
                let points = PlotPoints::from(series.points.clone());
                match plot_type {
                    PlotType::Line => {
                        plot_ui.line(Line::new(points).name(&series.name).color(*color).width(1.5));
                    }
                    PlotType::Scatter => {
                        plot_ui.points(Points::new(points).name(&series.name).color(*color).radius(2.0));
                    }
                }
            }
        });

    if apply.is_some() {
        dock.needs_apply = false;
    } else {
        let bounds = response.transform.bounds();
        let (min, max) = (bounds.min(), bounds.max());
        let (cur_min, cur_max) = dock.state.canvas().visible_bounds();
        if !nearly_equal(min, cur_min) || !nearly_equal(max, cur_max) {
            dock.state.update_canvas(|c| c.follow_bounds(min, max));
        }
    }

    target
}

fn series_menu(ui: &mut Ui, id: DockId, args: &mut PlotArgs, columns: &[String]) {
    ui.menu_button("Series", |ui: &mut Ui| {
        let mut x_column = args.x_column;
        let x_text = x_column
            .and_then(|c| columns.get(c).cloned())
            .unwrap_or_else(|| "time / index".to_string());
        ui.horizontal(|ui: &mut Ui| {
            ui.label("x axis:");
            egui::ComboBox::from_id_salt(("x_column", id))
                .selected_text(x_text)
                .show_ui(ui, |ui: &mut Ui| {
                    ui.selectable_value(&mut x_column, None, "time / index");
                    for (c, name) in columns.iter().enumerate() {
                        ui.selectable_value(&mut x_column, Some(c), name);
                    }
                });
        });
        if x_column != args.x_column {
            args.x_column = x_column;
            args.columns.retain(|&c| Some(c) != x_column);
        }
        ui.separator();
        egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui: &mut Ui| {
            for (c, name) in columns.iter().enumerate() {
                if Some(c) == args.x_column {
                    continue;
                }
                let mut on = args.shows(c);
                if ui.checkbox(&mut on, name).changed() {
                    args.set_column(c, on, columns.len());
                }
            }
        });
    });
}

fn axis_controls(ui: &mut Ui, name: &str, axis: &mut AxisView) -> bool {
    let zoom = ui
        .add(
            Slider::new(&mut axis.scale, MIN_SCALE..=MAX_SCALE)
                .logarithmic(true)
                .text(format!("{name} zoom")),
        )
        .changed();
    let speed = (axis.half_span / axis.scale * 0.01).max(1e-9);
    let shift = ui
        .add(
            DragValue::new(&mut axis.shift)
                .speed(speed)
                .prefix(format!("{name} shift: ")),
        )
        .changed();
    zoom || shift
}

fn nearly_equal(a: [f64; 2], b: [f64; 2]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| (x - y).abs() <= 1e-9 * (1.0 + x.abs().max(y.abs())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NumericArray;

    fn registry() -> ResourceRegistry {
        let mut reg = ResourceRegistry::new();
        reg.add_array(
            "feat",
            NumericArray::from_columns(&[vec![0.0, 1.0, 2.0], vec![5.0, 6.0, 7.0]])
                .with_labels(vec!["zcr".into(), "energy".into()]),
        );
        reg
    }

    #[test]
    fn cache_rebuilds_on_changes() {
        let mut reg = registry();
        let mut cache = SeriesCache::default();
        let mut args = PlotArgs::all("feat");

        let (columns, set) = cache.get(1, &args, &reg, 100).unwrap();
        assert_eq!(columns, ["zcr", "energy"]);
        assert_eq!(set.series.len(), 2);

        args.x_column = Some(0);
        let (_, set) = cache.get(1, &args, &reg, 100).unwrap();
        assert_eq!(set.series.len(), 1);
        assert_eq!(set.x_label, "zcr");

        reg.remove("feat").unwrap();
        assert!(cache.get(1, &args, &reg, 100).is_none());
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn retain_drops_closed_docks() {
        let reg = registry();
        let mut cache = SeriesCache::default();
        let args = PlotArgs::all("feat");
        cache.get(1, &args, &reg, 100);
        cache.get(2, &args, &reg, 100);
        cache.retain(|id| id == 2);
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.entries.contains_key(&2));
    }

    #[test]
    fn bounds_comparison_is_relative() {
        assert!(nearly_equal([1e6, -2.0], [1e6 + 1e-6, -2.0]));
        assert!(!nearly_equal([0.0, 1.0], [0.0, 1.001]));
    }
}
