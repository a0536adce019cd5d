/// View layer: plot canvas state, series building and the plot dock area.
pub mod canvas;
pub mod dock;
pub mod series;

pub use canvas::{CanvasState, PlotArgs, PlotState, PlotType};
pub use dock::{DockId, PlotDocks};
