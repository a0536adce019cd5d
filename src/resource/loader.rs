use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::model::{AudioData, CellValue, CsvTable};
use crate::error::ResourceError;

// ---------------------------------------------------------------------------
// File type dispatch
// ---------------------------------------------------------------------------

/// File-backed resource types, keyed by extension mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Wav,
    Csv,
}

impl FileType {
    /// All known types, in the order shown in file dialogs.
    pub const ALL: &'static [FileType] = &[FileType::Wav, FileType::Csv];

    /// Extensions accepted for this type (lower case, without the dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileType::Wav => &["wav", "wave"],
            FileType::Csv => &["csv"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileType::Wav => "WAV audio",
            FileType::Csv => "CSV table",
        }
    }

    /// Detect the type by extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<FileType> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        FileType::ALL
            .iter()
            .copied()
            .find(|t| t.extensions().contains(&ext.as_str()))
    }

    /// Every supported extension, for the file dialog's combined filter.
    pub fn all_extensions() -> Vec<&'static str> {
        FileType::ALL
            .iter()
            .flat_map(|t| t.extensions().iter().copied())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// WAV loader
// ---------------------------------------------------------------------------

/// Decode a WAV file, normalising samples to `f32` in `[-1.0, 1.0]`.
pub fn load_wav(path: &Path) -> Result<AudioData, ResourceError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits) => {
            // hound yields signed values for every integer depth, 8-bit included.
            let scale = (1u64 << (bits.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    log::debug!(
        "Decoded {} samples from {} ({} ch, {} Hz, {}-bit)",
        samples.len(),
        path.display(),
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample
    );

    Ok(AudioData {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bit_depth: spec.bits_per_sample,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
/// Cell types are guessed per field; short rows are allowed.
pub fn load_csv(path: &Path) -> Result<CsvTable, ResourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::guess).collect());
    }

    Ok(CsvTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn detects_types_by_extension() {
        assert_eq!(FileType::from_path(Path::new("a/b.WAV")), Some(FileType::Wav));
        assert_eq!(FileType::from_path(Path::new("x.wave")), Some(FileType::Wav));
        assert_eq!(FileType::from_path(Path::new("t.csv")), Some(FileType::Csv));
        assert_eq!(FileType::from_path(Path::new("notes.txt")), None);
        assert_eq!(FileType::from_path(Path::new("noext")), None);
    }

    #[test]
    fn reads_pcm16_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0i16, 16384, -16384, i16::MIN] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let audio = load_wav(&path).unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples, vec![0.0, 0.5, -0.5, -1.0]);
    }

    #[test]
    fn reads_csv_with_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "time, count,species").unwrap();
        writeln!(f, "0.5,3,wren").unwrap();
        writeln!(f, "1.0,4").unwrap();
        drop(f);

        let table = load_csv(&path).unwrap();
        assert_eq!(table.headers, vec!["time", "count", "species"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], CellValue::String("wren".into()));
        assert_eq!(table.rows[1].len(), 2);
    }
}
