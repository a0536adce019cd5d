use crate::resource::{NumericArray, Resource};
use crate::view::canvas::PlotArgs;

/// One drawable series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<[f64; 2]>,
}

/// Series plus the axis label to show under them.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSet {
    pub x_label: String,
    pub series: Vec<Series>,
}

/// Build the series described by `args` from a resource.
///
/// Series longer than `max_points` are reduced to a min/max envelope so
/// peaks stay visible.
pub fn build_series(resource: &Resource, args: &PlotArgs, max_points: usize) -> SeriesSet {
    let array = resource.to_array();
    series_from_array(&array, args, max_points)
}

pub fn series_from_array(array: &NumericArray, args: &PlotArgs, max_points: usize) -> SeriesSet {
    let x_column = args.x_column.filter(|&c| c < array.cols);
    let (xs, x_label): (Vec<f64>, String) = match (x_column, array.sample_rate) {
        (Some(c), _) => (array.column_values(c), array.column_name(c)),
        (None, Some(rate)) if rate > 0.0 => (
            (0..array.rows).map(|r| r as f64 / rate).collect(),
            "time [s]".to_string(),
        ),
        _ => ((0..array.rows).map(|r| r as f64).collect(), "index".to_string()),
    };

    let columns: Vec<usize> = if args.columns.is_empty() {
        (0..array.cols).filter(|&c| Some(c) != x_column).collect()
    } else {
        args.columns.iter().copied().filter(|&c| c < array.cols).collect()
    };

    let series = columns
        .into_iter()
        .map(|c| {
            let ys = array.column_values(c);
            Series {
                name: array.column_name(c),
                points: decimate(&xs, &ys, max_points),
            }
        })
        .collect();

    SeriesSet { x_label, series }
}

/// Keep every point when under budget; otherwise emit the min and max of
/// each bucket in their original order.
pub fn decimate(xs: &[f64], ys: &[f64], max_points: usize) -> Vec<[f64; 2]> {
    let n = xs.len().min(ys.len());
    if max_points < 2 || n <= max_points {
        return xs.iter().zip(ys).map(|(&x, &y)| [x, y]).collect();
    }
    let bucket = n.div_ceil(max_points / 2);
    let mut out = Vec::with_capacity(max_points);
    let mut start = 0;
    while start < n {
        let end = (start + bucket).min(n);
        let (mut lo, mut hi) = (start, start);
        for i in start..end {
            if ys[i] < ys[lo] {
                lo = i;
            }
            if ys[i] > ys[hi] {
                hi = i;
            }
        }
        let (first, second) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        out.push([xs[first], ys[first]]);
        if second != first {
            out.push([xs[second], ys[second]]);
        }
        start = end;
    }
    out
}

/// Finite extent of all points: `(xlim, ylim)`. Degenerate or empty
/// ranges are widened so the view has a non-zero span.
pub fn data_limits(set: &SeriesSet) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [f64::INFINITY, f64::NEG_INFINITY];
    for p in set.series.iter().flat_map(|s| &s.points) {
        if p[0].is_finite() && p[1].is_finite() {
            x = [x[0].min(p[0]), x[1].max(p[0])];
            y = [y[0].min(p[1]), y[1].max(p[1])];
        }
    }
    (widen(x), widen(y))
}

fn widen(lim: [f64; 2]) -> [f64; 2] {
    if !(lim[0].is_finite() && lim[1].is_finite()) {
        return [0.0, 1.0];
    }
    if lim[1] - lim[0] > 0.0 {
        return lim;
    }
    let pad = (lim[0].abs() * 0.1).max(0.5);
    [lim[0] - pad, lim[1] + pad]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_axis_from_sample_rate() {
        let arr = NumericArray::from_columns(&[vec![0.0, 1.0, 0.0, -1.0]]).with_sample_rate(Some(2.0));
        let set = series_from_array(&arr, &PlotArgs::all("a"), 1000);
        assert_eq!(set.x_label, "time [s]");
        assert_eq!(set.series.len(), 1);
        assert_eq!(set.series[0].points[3], [1.5, -1.0]);
    }

    #[test]
    fn x_column_is_excluded_from_series() {
        let arr = NumericArray::from_columns(&[vec![10.0, 20.0], vec![1.0, 2.0], vec![3.0, 4.0]])
            .with_labels(vec!["t".into(), "a".into(), "b".into()]);
        let args = PlotArgs {
            resource: "x".into(),
            columns: vec![],
            x_column: Some(0),
        };
        let set = series_from_array(&arr, &args, 1000);
        assert_eq!(set.x_label, "t");
        let names: Vec<&str> = set.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(set.series[1].points, vec![[10.0, 3.0], [20.0, 4.0]]);
    }

    #[test]
    fn decimation_keeps_extremes() {
        let xs: Vec<f64> = (0..10_000).map(|i| i as f64).collect();
        let mut ys = vec![0.0; 10_000];
        ys[1234] = 5.0;
        ys[8765] = -7.0;
        let pts = decimate(&xs, &ys, 100);
        assert!(pts.len() <= 100);
        assert!(pts.contains(&[1234.0, 5.0]));
        assert!(pts.contains(&[8765.0, -7.0]));
        assert!(pts.windows(2).all(|w| w[0][0] <= w[1][0]));
    }

    #[test]
    fn limits_are_widened_when_flat() {
        let set = SeriesSet {
            x_label: "index".into(),
            series: vec![Series {
                name: "c".into(),
                points: vec![[0.0, 2.0], [4.0, 2.0], [f64::NAN, 9.0]],
            }],
        };
        let (x, y) = data_limits(&set);
        assert_eq!(x, [0.0, 4.0]);
        assert_eq!(y, [1.5, 2.5]);
        let empty = SeriesSet {
            x_label: "index".into(),
            series: vec![],
        };
        assert_eq!(data_limits(&empty), ([0.0, 1.0], [0.0, 1.0]));
    }
}
