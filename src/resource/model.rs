use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a CSV table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell, guessed from the CSV text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the cell as an `f64`; booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Guess the type of a raw CSV field.
    pub fn guess(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// NumericArray – the common numeric view of every resource
// ---------------------------------------------------------------------------

/// Dense row-major matrix of `f64`. Columns are the plottable series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericArray {
    pub rows: usize,
    pub cols: usize,
    #[serde(with = "non_finite")]
    pub values: Vec<f64>,
    /// Rows per second, when the rows are a time axis.
    #[serde(default)]
    pub sample_rate: Option<f64>,
    /// Optional per-column names.
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

impl NumericArray {
    /// Build from row-major values. `values.len()` must equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        Self {
            rows,
            cols,
            values,
            sample_rate: None,
            labels: None,
        }
    }

    /// A single-column array.
    pub fn column(values: Vec<f64>) -> Self {
        Self::new(values.len(), 1, values)
    }

    pub fn from_columns(columns: &[Vec<f64>]) -> Self {
        let cols = columns.len();
        let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut values = vec![f64::NAN; rows * cols];
        for (c, column) in columns.iter().enumerate() {
            for (r, v) in column.iter().enumerate() {
                values[r * cols + c] = *v;
            }
        }
        Self::new(rows, cols, values)
    }

    pub fn with_sample_rate(mut self, sample_rate: Option<f64>) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether `values` holds exactly `rows * cols` entries.
    pub fn is_consistent(&self) -> bool {
        self.rows.checked_mul(self.cols) == Some(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    /// Copy out one column.
    pub fn column_values(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    /// Display name of a column: its label, or `col N`.
    pub fn column_name(&self, col: usize) -> String {
        self.labels
            .as_ref()
            .and_then(|l| l.get(col).cloned())
            .unwrap_or_else(|| format!("col {col}"))
    }

    pub fn transpose(&self) -> NumericArray {
        let mut values = Vec::with_capacity(self.values.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                values.push(self.get(r, c));
            }
        }
        NumericArray::new(self.cols, self.rows, values)
    }

    /// Elementwise map keeping shape, sample rate and labels.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> NumericArray {
        NumericArray {
            values: self.values.iter().map(|&v| f(v)).collect(),
            ..self.clone()
        }
    }

    /// Short human summary for the resource dock.
    pub fn summary(&self) -> String {
        match self.sample_rate {
            Some(sr) => format!("{} × {} @ {sr:.2} Hz", self.rows, self.cols),
            None => format!("{} × {}", self.rows, self.cols),
        }
    }
}

/// JSON has no NaN or infinity: those travel as the strings `"nan"`,
/// `"inf"` and `"-inf"`. A bare `null` also reads back as NaN.
mod non_finite {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Number(f64),
        Word(String),
        Missing,
    }

    fn store(v: f64) -> Stored {
        if v.is_finite() {
            Stored::Number(v)
        } else if v.is_nan() {
            Stored::Word("nan".into())
        } else if v > 0.0 {
            Stored::Word("inf".into())
        } else {
            Stored::Word("-inf".into())
        }
    }

    pub fn serialize<S: Serializer>(values: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(|&v| store(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Stored>::deserialize(d)?
            .into_iter()
            .map(|v| match v {
                Stored::Number(n) => Ok(n),
                Stored::Missing => Ok(f64::NAN),
                Stored::Word(w) => match w.as_str() {
                    "nan" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(D::Error::custom(format!("not a number: '{other}'"))),
                },
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CsvTable
// ---------------------------------------------------------------------------

/// A parsed CSV file: header plus typed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl CsvTable {
    /// Numeric view; non-numeric and missing cells become NaN.
    pub fn to_array(&self) -> NumericArray {
        let cols = self.headers.len();
        let mut values = Vec::with_capacity(self.rows.len() * cols);
        for row in &self.rows {
            for c in 0..cols {
                values.push(row.get(c).and_then(CellValue::as_f64).unwrap_or(f64::NAN));
            }
        }
        NumericArray::new(self.rows.len(), cols, values).with_labels(self.headers.clone())
    }
}

// ---------------------------------------------------------------------------
// AudioData
// ---------------------------------------------------------------------------

/// Decoded WAV audio, samples normalised to `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl AudioData {
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frame_count() as f64 / self.sample_rate as f64
        }
    }

    /// Mix down to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f64> {
        let channels = self.channels.max(1) as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64)
            .collect()
    }

    /// `frames × channels` view with the audio sample rate.
    pub fn to_array(&self) -> NumericArray {
        let channels = self.channels.max(1) as usize;
        let frames = self.frame_count();
        let values = self.samples[..frames * channels]
            .iter()
            .map(|&s| s as f64)
            .collect();
        let labels = (0..channels).map(|c| format!("channel {c}")).collect();
        NumericArray::new(frames, channels, values)
            .with_sample_rate(Some(self.sample_rate as f64))
            .with_labels(labels)
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A CSV file resource.
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub path: PathBuf,
    pub table: CsvTable,
}

/// A WAV file resource.
#[derive(Debug, Clone)]
pub struct WavFile {
    pub path: PathBuf,
    pub audio: AudioData,
}

#[derive(Debug, Clone)]
pub enum ResourceKind {
    Csv(CsvFile),
    Wav(WavFile),
    /// Derived in-memory data (transform or feature output).
    Array(NumericArray),
}

/// A named handle over loaded data.
#[derive(Debug, Clone)]
pub struct Resource {
    pub alias: String,
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(alias: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            alias: alias.into(),
            kind,
        }
    }

    /// Type column of the resource dock.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ResourceKind::Csv(_) => "CSV",
            ResourceKind::Wav(_) => "WAV",
            ResourceKind::Array(_) => "Array",
        }
    }

    /// Backing file, for file resources.
    pub fn path(&self) -> Option<&Path> {
        match &self.kind {
            ResourceKind::Csv(f) => Some(&f.path),
            ResourceKind::Wav(f) => Some(&f.path),
            ResourceKind::Array(_) => None,
        }
    }

    /// Rows per second of the numeric view, if it is a time series.
    pub fn sample_rate(&self) -> Option<f64> {
        match &self.kind {
            ResourceKind::Wav(f) => Some(f.audio.sample_rate as f64),
            ResourceKind::Array(a) => a.sample_rate,
            ResourceKind::Csv(_) => None,
        }
    }

    /// Numeric view used for plotting, features and the console.
    pub fn to_array(&self) -> NumericArray {
        match &self.kind {
            ResourceKind::Csv(f) => f.table.to_array(),
            ResourceKind::Wav(f) => f.audio.to_array(),
            ResourceKind::Array(a) => a.clone(),
        }
    }

    /// Whether [`Resource::signal`] has anything to return.
    pub fn has_signal(&self) -> bool {
        match &self.kind {
            ResourceKind::Wav(f) => f.audio.frame_count() > 0,
            ResourceKind::Array(a) => a.cols >= 1 && a.rows > 0,
            ResourceKind::Csv(_) => false,
        }
    }

    /// Mono signal for audio analysis: mixed-down WAV, or the first column
    /// of an array.
    pub fn signal(&self) -> Option<Vec<f64>> {
        match &self.kind {
            ResourceKind::Wav(f) => Some(f.audio.to_mono()),
            ResourceKind::Array(a) if a.cols >= 1 && a.rows > 0 => Some(a.column_values(0)),
            _ => None,
        }
    }

    /// Value column of the resource dock.
    pub fn summary(&self) -> String {
        match &self.kind {
            ResourceKind::Csv(f) => format!(
                "{} rows × {} columns",
                f.table.rows.len(),
                f.table.headers.len()
            ),
            ResourceKind::Wav(f) => format!(
                "{} ch · {} Hz · {}-bit · {:.2} s",
                f.audio.channels,
                f.audio.sample_rate,
                f.audio.bit_depth,
                f.audio.duration_secs()
            ),
            ResourceKind::Array(a) => a.summary(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(p) => write!(f, "{}({}) ({})", self.type_name(), self.alias, p.display()),
            None => write!(f, "{}({})", self.type_name(), self.alias),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_cell_types() {
        assert_eq!(CellValue::guess("42"), CellValue::Integer(42));
        assert_eq!(CellValue::guess(" 1.5 "), CellValue::Float(1.5));
        assert_eq!(CellValue::guess("true"), CellValue::Bool(true));
        assert_eq!(CellValue::guess(""), CellValue::Null);
        assert_eq!(CellValue::guess("bird"), CellValue::String("bird".into()));
    }

    #[test]
    fn csv_numeric_view_fills_nan() {
        let table = CsvTable {
            headers: vec!["t".into(), "label".into()],
            rows: vec![
                vec![CellValue::Integer(1), CellValue::String("a".into())],
                vec![CellValue::Float(2.5)],
            ],
        };
        let arr = table.to_array();
        assert_eq!(arr.shape(), (2, 2));
        assert_eq!(arr.get(1, 0), 2.5);
        assert!(arr.get(0, 1).is_nan());
        assert!(arr.get(1, 1).is_nan());
        assert_eq!(arr.column_name(1), "label");
    }

    #[test]
    fn audio_views() {
        let audio = AudioData {
            samples: vec![0.5, -0.5, 1.0, 0.0, 0.25, 0.25],
            sample_rate: 4,
            channels: 2,
            bit_depth: 16,
        };
        assert_eq!(audio.frame_count(), 3);
        assert_eq!(audio.duration_secs(), 0.75);
        assert_eq!(audio.to_mono(), vec![0.0, 0.5, 0.25]);
        let arr = audio.to_array();
        assert_eq!(arr.shape(), (3, 2));
        assert_eq!(arr.sample_rate, Some(4.0));
        assert_eq!(arr.column_values(0), vec![0.5, 1.0, 0.25]);
    }

    #[test]
    fn nan_survives_json() {
        let arr = NumericArray::column(vec![1.0, f64::NAN]);
        let json = serde_json::to_string(&arr).unwrap();
        let back: NumericArray = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values[0], 1.0);
        assert!(back.values[1].is_nan());

        let legacy: NumericArray =
            serde_json::from_str(r#"{"rows":2,"cols":1,"values":[0.5,null]}"#).unwrap();
        assert_eq!(legacy.values[0], 0.5);
        assert!(legacy.values[1].is_nan());
    }

    #[test]
    fn infinities_survive_json() {
        let arr = NumericArray::column(vec![f64::INFINITY, f64::NEG_INFINITY, f64::NAN, 1.0]);
        let json = serde_json::to_string(&arr).unwrap();
        let back: NumericArray = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values[0], f64::INFINITY);
        assert_eq!(back.values[1], f64::NEG_INFINITY);
        assert!(back.values[2].is_nan());
        assert_eq!(back.values[3], 1.0);

        let bad = r#"{"rows":1,"cols":1,"values":["lots"]}"#;
        assert!(serde_json::from_str::<NumericArray>(bad).is_err());
    }

    #[test]
    fn consistency_check_catches_bad_shapes() {
        assert!(NumericArray::from_columns(&[vec![1.0, 2.0]]).is_consistent());
        let mut arr = NumericArray::column(vec![1.0, 2.0]);
        arr.rows = 3;
        assert!(!arr.is_consistent());
        arr.rows = 2;
        arr.labels = Some(vec!["a".into(), "b".into()]);
        assert!(arr.is_consistent());
    }

    #[test]
    fn transpose_and_columns() {
        let arr = NumericArray::from_columns(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(arr.shape(), (3, 2));
        assert_eq!(arr.values, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let t = arr.transpose();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
