use serde::{Deserialize, Serialize};

/// Zoom factors are kept within this range.
pub const MIN_SCALE: f64 = 0.01;
pub const MAX_SCALE: f64 = 1000.0;

// ---------------------------------------------------------------------------
// AxisView – centre / shift / scale for one axis
// ---------------------------------------------------------------------------

/// View state of one axis.
///
/// `centre` and `half_span` describe the home extent (the data limits);
/// the visible range is `centre + shift ± half_span / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisView {
    pub centre: f64,
    pub half_span: f64,
    pub shift: f64,
    pub scale: f64,
}

impl AxisView {
    /// Non-finite limits fall back to `[0, 1]` and a non-finite shift to 0.
    pub fn new(limits: [f64; 2], shift: f64, scale: f64) -> Self {
        let limits = if limits[0].is_finite() && limits[1].is_finite() {
            limits
        } else {
            [0.0, 1.0]
        };
        let (lo, hi) = if limits[0] <= limits[1] {
            (limits[0], limits[1])
        } else {
            (limits[1], limits[0])
        };
        Self {
            centre: (lo + hi) / 2.0,
            half_span: (hi - lo) / 2.0,
            shift: if shift.is_finite() { shift } else { 0.0 },
            scale: sanitize_scale(scale),
        }
    }

    /// Home extent.
    pub fn limits(&self) -> [f64; 2] {
        [self.centre - self.half_span, self.centre + self.half_span]
    }

    /// Currently visible range.
    pub fn visible(&self) -> [f64; 2] {
        let c = self.centre + self.shift;
        let h = self.half_span / self.scale;
        [c - h, c + h]
    }

    pub fn pan(&mut self, delta: f64) {
        self.shift += delta;
    }

    /// Multiply the zoom factor; `factor > 1` zooms in.
    pub fn zoom(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        }
    }

    pub fn reset(&mut self) {
        self.shift = 0.0;
        self.scale = 1.0;
    }

    /// Adopt a visible range produced by mouse interaction.
    pub fn follow(&mut self, visible: [f64; 2]) {
        let [lo, hi] = visible;
        if !(lo.is_finite() && hi.is_finite()) {
            return;
        }
        let half = (hi - lo).abs() / 2.0;
        if half > 0.0 && self.half_span > 0.0 {
            self.scale = (self.half_span / half).clamp(MIN_SCALE, MAX_SCALE);
        }
        self.shift = (lo + hi) / 2.0 - self.centre;
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// CanvasState – both axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasState {
    pub x: AxisView,
    pub y: AxisView,
}

impl CanvasState {
    /// Home view over the given limits.
    pub fn new(xlim: [f64; 2], ylim: [f64; 2]) -> Self {
        Self {
            x: AxisView::new(xlim, 0.0, 1.0),
            y: AxisView::new(ylim, 0.0, 1.0),
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x.pan(dx);
        self.y.pan(dy);
    }

    pub fn zoom(&mut self, fx: f64, fy: f64) {
        self.x.zoom(fx);
        self.y.zoom(fy);
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    /// `([x_min, y_min], [x_max, y_max])`
    pub fn visible_bounds(&self) -> ([f64; 2], [f64; 2]) {
        let [x0, x1] = self.x.visible();
        let [y0, y1] = self.y.visible();
        ([x0, y0], [x1, y1])
    }

    pub fn follow_bounds(&mut self, min: [f64; 2], max: [f64; 2]) {
        self.x.follow([min[0], max[0]]);
        self.y.follow([min[1], max[1]]);
    }
}

// ---------------------------------------------------------------------------
// PlotState – the persisted plot description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    #[default]
    Line,
    Scatter,
}

impl PlotType {
    pub const ALL: &'static [PlotType] = &[PlotType::Line, PlotType::Scatter];

    pub fn label(&self) -> &'static str {
        match self {
            PlotType::Line => "Line",
            PlotType::Scatter => "Scatter",
        }
    }
}

/// What to draw: a resource alias and the columns to use.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlotArgs {
    pub resource: String,
    /// Series columns; empty means every column except `x_column`.
    #[serde(default)]
    pub columns: Vec<usize>,
    /// Column used as x; `None` means time (if the data has a sample rate)
    /// or row index.
    #[serde(default)]
    pub x_column: Option<usize>,
}

impl PlotArgs {
    pub fn all(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            columns: Vec::new(),
            x_column: None,
        }
    }

    /// Whether column `col` is drawn as a series.
    pub fn shows(&self, col: usize) -> bool {
        Some(col) != self.x_column && (self.columns.is_empty() || self.columns.contains(&col))
    }

    /// Turn one series column on or off. The implicit "every column" choice
    /// becomes explicit on the first toggle, and the last visible series
    /// cannot be switched off.
    pub fn set_column(&mut self, col: usize, on: bool, n_cols: usize) {
        if self.columns.is_empty() {
            self.columns = (0..n_cols).filter(|&c| Some(c) != self.x_column).collect();
        }
        if on {
            if !self.columns.contains(&col) {
                self.columns.push(col);
                self.columns.sort_unstable();
            }
        } else if self.columns.len() > 1 {
            self.columns.retain(|&c| c != col);
        }
    }
}

/// Everything needed to recreate a plot dock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotState {
    pub plot_args: PlotArgs,
    pub plot_type: PlotType,
    pub xlim: [f64; 2],
    pub ylim: [f64; 2],
    /// Pan offset per axis, `[x, y]`.
    pub centre_shift: [f64; 2],
    /// Zoom factor per axis, `[x, y]`.
    pub scale: [f64; 2],
    pub title: String,
}

impl PlotState {
    /// Home view of `args` over the given data limits.
    pub fn new(plot_args: PlotArgs, plot_type: PlotType, xlim: [f64; 2], ylim: [f64; 2]) -> Self {
        let title = plot_args.resource.clone();
        Self {
            plot_args,
            plot_type,
            xlim,
            ylim,
            centre_shift: [0.0, 0.0],
            scale: [1.0, 1.0],
            title,
        }
    }

    pub fn canvas(&self) -> CanvasState {
        CanvasState {
            x: AxisView::new(self.xlim, self.centre_shift[0], self.scale[0]),
            y: AxisView::new(self.ylim, self.centre_shift[1], self.scale[1]),
        }
    }

    /// Write a canvas back. Non-finite values (e.g. `inf` typed into a
    /// shift field) keep the previous setting.
    pub fn set_canvas(&mut self, canvas: &CanvasState) {
        let keep = |new: f64, old: f64| if new.is_finite() { new } else { old };
        let (x, y) = (canvas.x.limits(), canvas.y.limits());
        if x.iter().all(|v| v.is_finite()) {
            self.xlim = x;
        }
        if y.iter().all(|v| v.is_finite()) {
            self.ylim = y;
        }
        self.centre_shift = [
            keep(canvas.x.shift, self.centre_shift[0]),
            keep(canvas.y.shift, self.centre_shift[1]),
        ];
        self.scale = [
            keep(canvas.x.scale, self.scale[0]),
            keep(canvas.y.scale, self.scale[1]),
        ];
    }

    /// New home limits with the view reset onto them.
    pub fn rehome(&mut self, xlim: [f64; 2], ylim: [f64; 2]) {
        self.xlim = xlim;
        self.ylim = ylim;
        self.centre_shift = [0.0, 0.0];
        self.scale = [1.0, 1.0];
    }

    /// Apply a change to the canvas and write it back.
    pub fn update_canvas(&mut self, f: impl FnOnce(&mut CanvasState)) {
        let mut canvas = self.canvas();
        f(&mut canvas);
        self.set_canvas(&canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_range_follows_shift_and_scale() {
        let mut axis = AxisView::new([0.0, 10.0], 0.0, 1.0);
        assert_eq!(axis.visible(), [0.0, 10.0]);
        axis.zoom(2.0);
        assert_eq!(axis.visible(), [2.5, 7.5]);
        axis.pan(1.0);
        assert_eq!(axis.visible(), [3.5, 8.5]);
        axis.reset();
        assert_eq!(axis.visible(), [0.0, 10.0]);
        assert_eq!(axis.limits(), [0.0, 10.0]);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut axis = AxisView::new([0.0, 1.0], 0.0, 1.0);
        axis.zoom(1e9);
        assert_eq!(axis.scale, MAX_SCALE);
        axis.zoom(1e-12);
        assert_eq!(axis.scale, MIN_SCALE);
        axis.zoom(-3.0);
        assert_eq!(axis.scale, MIN_SCALE);
        assert_eq!(AxisView::new([0.0, 1.0], 0.0, f64::NAN).scale, 1.0);
    }

    #[test]
    fn follow_inverts_visible() {
        let mut canvas = CanvasState::new([-1.0, 1.0], [0.0, 100.0]);
        canvas.pan(0.25, -10.0);
        canvas.zoom(4.0, 0.5);
        let (min, max) = canvas.visible_bounds();

        let mut other = CanvasState::new([-1.0, 1.0], [0.0, 100.0]);
        other.follow_bounds(min, max);
        assert!((other.x.scale - 4.0).abs() < 1e-12);
        assert!((other.y.scale - 0.5).abs() < 1e-12);
        assert!((other.x.shift - 0.25).abs() < 1e-12);
        assert!((other.y.shift + 10.0).abs() < 1e-12);
    }

    #[test]
    fn column_toggles_keep_one_series() {
        let mut args = PlotArgs::all("STF");
        args.x_column = Some(0);
        assert!(args.shows(2));
        assert!(!args.shows(0));

        args.set_column(2, false, 4);
        assert_eq!(args.columns, vec![1, 3]);
        args.set_column(1, false, 4);
        args.set_column(3, false, 4);
        assert_eq!(args.columns, vec![3]);
        args.set_column(2, true, 4);
        assert_eq!(args.columns, vec![2, 3]);
    }

    #[test]
    fn non_finite_view_values_are_ignored() {
        let axis = AxisView::new([f64::NEG_INFINITY, 2.0], f64::INFINITY, 1.0);
        assert_eq!(axis.limits(), [0.0, 1.0]);
        assert_eq!(axis.shift, 0.0);

        let mut state = PlotState::new(PlotArgs::all("rec"), PlotType::Line, [0.0, 10.0], [-1.0, 1.0]);
        state.update_canvas(|c| c.pan(2.0, 0.5));
        state.update_canvas(|c| {
            c.x.shift = f64::INFINITY;
            c.y.shift = f64::NAN;
        });
        assert_eq!(state.centre_shift, [2.0, 0.5]);
        assert!(serde_json::to_string(&state).unwrap().find("null").is_none());
    }

    #[test]
    fn plot_state_roundtrips_through_json() {
        let mut state = PlotState::new(
            PlotArgs {
                resource: "STF".into(),
                columns: vec![0, 3],
                x_column: None,
            },
            PlotType::Scatter,
            [0.0, 12.5],
            [-1.0, 1.0],
        );
        state.update_canvas(|c| {
            c.pan(1.5, 0.25);
            c.zoom(2.0, 4.0);
        });
        state.title = "features".into();

        let json = serde_json::to_string(&state).unwrap();
        let back: PlotState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.canvas(), state.canvas());
    }
}
