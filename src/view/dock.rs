use egui_tiles::{Container, Tile, TileId, Tiles, Tree};

use super::canvas::PlotState;

const TREE_ID: &str = "plot_docks";

/// Tab group used when none is given.
pub const DEFAULT_GROUP: &str = "plots";

pub type DockId = u64;

/// Pane payload stored in the tile tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DockPane {
    pub id: DockId,
}

// ---------------------------------------------------------------------------
// PlotDock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PlotDock {
    pub id: DockId,
    /// Value of the plot counter when the dock was created.
    pub number: usize,
    pub tab_group: String,
    pub state: PlotState,
    /// The canvas must push `state` into the plot on its next frame
    /// (new dock, restored dock, or slider/button change).
    pub needs_apply: bool,
}

impl PlotDock {
    pub fn window_title(&self) -> String {
        format!("{} (plot{:>2})", self.state.title, self.number)
    }
}

// ---------------------------------------------------------------------------
// PlotDocks – open plot views grouped into tab groups
// ---------------------------------------------------------------------------

pub struct PlotDocks {
    docks: Vec<PlotDock>,
    next_id: DockId,
    plot_counter: usize,
    /// Dock area layout: one tabs container per tab group.
    pub tree: Tree<DockPane>,
    layout_dirty: bool,
}

impl Default for PlotDocks {
    fn default() -> Self {
        Self {
            docks: Vec::new(),
            next_id: 1,
            plot_counter: 0,
            tree: Tree::empty(TREE_ID),
            layout_dirty: false,
        }
    }
}

impl PlotDocks {
    pub fn len(&self) -> usize {
        self.docks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlotDock> {
        self.docks.iter()
    }

    pub fn get(&self, id: DockId) -> Option<&PlotDock> {
        self.docks.iter().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: DockId) -> Option<&mut PlotDock> {
        self.docks.iter_mut().find(|d| d.id == id)
    }

    /// Tab groups in order of first appearance.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for dock in &self.docks {
            if !groups.contains(&dock.tab_group) {
                groups.push(dock.tab_group.clone());
            }
        }
        groups
    }

    /// A group name not used by any dock.
    pub fn new_group_name(&self) -> String {
        let groups = self.groups();
        if !groups.iter().any(|g| g == DEFAULT_GROUP) {
            return DEFAULT_GROUP.to_string();
        }
        (2..)
            .map(|n| format!("{DEFAULT_GROUP} {n}"))
            .find(|g| !groups.contains(g))
            .unwrap_or_else(|| DEFAULT_GROUP.to_string())
    }

    /// Open a new plot dock in `tab_group`.
    pub fn add(&mut self, tab_group: &str, state: PlotState) -> DockId {
        let id = self.next_id;
        self.next_id += 1;
        self.plot_counter += 1;
        let tab_group = if tab_group.trim().is_empty() {
            DEFAULT_GROUP.to_string()
        } else {
            tab_group.to_string()
        };
        let dock = PlotDock {
            id,
            number: self.plot_counter,
            tab_group,
            state,
            needs_apply: true,
        };
        log::debug!("Opened plot dock '{}' in group '{}'", dock.window_title(), dock.tab_group);
        self.docks.push(dock);
        self.layout_dirty = true;
        id
    }

    pub fn close(&mut self, id: DockId) -> Option<PlotDock> {
        let idx = self.docks.iter().position(|d| d.id == id)?;
        self.layout_dirty = true;
        Some(self.docks.remove(idx))
    }

    pub fn move_to_group(&mut self, id: DockId, group: &str) -> bool {
        match self.get_mut(id) {
            Some(dock) if dock.tab_group != group => {
                dock.tab_group = group.to_string();
                self.layout_dirty = true;
                true
            }
            _ => false,
        }
    }

    /// `(tab_group, plot state)` of every dock, for the session store.
    pub fn snapshot(&self) -> Vec<(String, PlotState)> {
        self.docks
            .iter()
            .map(|d| (d.tab_group.clone(), d.state.clone()))
            .collect()
    }

    /// Replace all docks with the saved ones.
    pub fn restore(&mut self, snapshot: Vec<(String, PlotState)>) {
        self.docks.clear();
        for (group, state) in snapshot {
            self.add(&group, state);
        }
        self.layout_dirty = true;
    }

    /// Detach the layout so it can be drawn with a behaviour that borrows
    /// the docks; hand it back with [`PlotDocks::put_tree`].
    pub fn take_tree(&mut self) -> Tree<DockPane> {
        std::mem::replace(&mut self.tree, Tree::empty(TREE_ID))
    }

    pub fn put_tree(&mut self, tree: Tree<DockPane>) {
        self.tree = tree;
    }

    /// Rebuild the layout from the group assignment after structural changes.
    pub fn rebuild_tree_if_needed(&mut self) {
        if self.layout_dirty {
            self.tree = self.build_tree();
            self.layout_dirty = false;
        }
    }

    /// Force a fresh side-by-side layout.
    pub fn reset_layout(&mut self) {
        self.layout_dirty = true;
    }

    pub fn build_tree(&self) -> Tree<DockPane> {
        let mut tiles: Tiles<DockPane> = Tiles::default();
        let tab_tiles: Vec<TileId> = self
            .groups()
            .iter()
            .map(|group| {
                let panes: Vec<TileId> = self
                    .docks
                    .iter()
                    .filter(|d| &d.tab_group == group)
                    .map(|d| tiles.insert_pane(DockPane { id: d.id }))
                    .collect();
                tiles.insert_tab_tile(panes)
            })
            .collect();

        match tab_tiles.len() {
            0 => Tree::empty(TREE_ID),
            1 => Tree::new(TREE_ID, tab_tiles[0], tiles),
            _ => {
                let root = tiles.insert_horizontal_tile(tab_tiles);
                Tree::new(TREE_ID, root, tiles)
            }
        }
    }

    /// Bring the group assignment in line with the tree after the user
    /// dragged or closed tabs. Each tabs container is one group; panes
    /// that ended up outside every tabs container get a group of their own.
    /// Docks missing from the tree are dropped.
    pub fn sync_from_tree(&mut self) {
        let mut clusters = Vec::new();
        if let Some(root) = self.tree.root() {
            collect_clusters(&self.tree.tiles, root, &mut clusters);
        }

        let present: Vec<DockId> = clusters.iter().flatten().copied().collect();
        let before = self.docks.len();
        self.docks.retain(|d| present.contains(&d.id));
        if self.docks.len() != before {
            log::debug!("Closed {} plot dock(s) from the dock area", before - self.docks.len());
        }

        let mut claimed: Vec<String> = Vec::new();
        for cluster in clusters.into_iter().filter(|c| !c.is_empty()) {
            let existing = cluster
                .iter()
                .filter_map(|id| self.get(*id))
                .map(|d| d.tab_group.clone())
                .find(|g| !claimed.contains(g));
            let group = match existing {
                Some(g) => g,
                None => {
                    let mut n = claimed.len() + 1;
                    loop {
                        let candidate = format!("{DEFAULT_GROUP} {n}");
                        if !claimed.contains(&candidate) && !self.groups().contains(&candidate) {
                            break candidate;
                        }
                        n += 1;
                    }
                }
            };
            for id in &cluster {
                if let Some(dock) = self.get_mut(*id) {
                    dock.tab_group = group.clone();
                }
            }
            claimed.push(group);
        }
    }
}

/// Group panes by the tabs container holding them, in tree order.
fn collect_clusters(tiles: &Tiles<DockPane>, id: TileId, out: &mut Vec<Vec<DockId>>) {
    match tiles.get(id) {
        Some(Tile::Pane(pane)) => out.push(vec![pane.id]),
        Some(Tile::Container(Container::Tabs(tabs))) => {
            let mut panes = Vec::new();
            for child in &tabs.children {
                match tiles.get(*child) {
                    Some(Tile::Pane(pane)) => panes.push(pane.id),
                    Some(Tile::Container(_)) => collect_clusters(tiles, *child, out),
                    None => {}
                }
            }
            out.push(panes);
        }
        Some(Tile::Container(container)) => {
            for child in container.children() {
                collect_clusters(tiles, *child, out);
            }
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::canvas::{PlotArgs, PlotType};

    fn state(alias: &str) -> PlotState {
        PlotState::new(PlotArgs::all(alias), PlotType::Line, [0.0, 1.0], [-1.0, 1.0])
    }

    #[test]
    fn titles_use_running_counter() {
        let mut docks = PlotDocks::default();
        let a = docks.add("plots", state("rec"));
        let b = docks.add("plots", state("STF"));
        docks.close(a);
        let c = docks.add("", state("rec"));
        assert_eq!(docks.get(b).unwrap().window_title(), "STF (plot 2)");
        assert_eq!(docks.get(c).unwrap().window_title(), "rec (plot 3)");
        assert_eq!(docks.get(c).unwrap().tab_group, DEFAULT_GROUP);
    }

    #[test]
    fn groups_in_first_appearance_order() {
        let mut docks = PlotDocks::default();
        docks.add("left", state("a"));
        docks.add("right", state("b"));
        let c = docks.add("left", state("c"));
        assert_eq!(docks.groups(), vec!["left", "right"]);
        assert!(docks.move_to_group(c, "right"));
        assert!(!docks.move_to_group(c, "right"));
        assert_eq!(docks.new_group_name(), DEFAULT_GROUP);
        docks.add(DEFAULT_GROUP, state("d"));
        assert_eq!(docks.new_group_name(), "plots 2");
    }

    #[test]
    fn snapshot_restores_groups_and_state() {
        let mut docks = PlotDocks::default();
        docks.add("left", state("a"));
        let b = docks.add("right", state("b"));
        docks
            .get_mut(b)
            .unwrap()
            .state
            .update_canvas(|c| c.zoom(3.0, 1.0));
        let snapshot = docks.snapshot();

        let mut restored = PlotDocks::default();
        restored.restore(snapshot.clone());
        assert_eq!(restored.snapshot(), snapshot);
        assert!(restored.iter().all(|d| d.needs_apply));
    }

    #[test]
    fn tree_has_one_tab_container_per_group() {
        let mut docks = PlotDocks::default();
        docks.add("left", state("a"));
        docks.add("right", state("b"));
        docks.add("left", state("c"));
        docks.rebuild_tree_if_needed();

        let mut clusters = Vec::new();
        collect_clusters(&docks.tree.tiles, docks.tree.root().unwrap(), &mut clusters);
        assert_eq!(clusters, vec![vec![1, 3], vec![2]]);
    }

    #[test]
    fn sync_follows_tree_changes() {
        let mut docks = PlotDocks::default();
        docks.add("left", state("a"));
        docks.add("right", state("b"));
        docks.add("left", state("c"));

        // user dragged dock 3 next to dock 2 and closed dock 1
        let mut tiles: Tiles<DockPane> = Tiles::default();
        let p2 = tiles.insert_pane(DockPane { id: 2 });
        let p3 = tiles.insert_pane(DockPane { id: 3 });
        let root = tiles.insert_tab_tile(vec![p2, p3]);
        docks.tree = Tree::new(TREE_ID, root, tiles);
        docks.sync_from_tree();

        assert_eq!(docks.len(), 2);
        assert!(docks.get(1).is_none());
        assert_eq!(docks.groups(), vec!["right"]);
    }
}
