use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::AnalysisError;
use crate::resource::NumericArray;

const EPS: f64 = 1e-8;
const SUB_BLOCKS: usize = 10;
const ROLLOFF: f64 = 0.90;
const N_MFCC: usize = 13;
const N_CHROMA: usize = 12;

/// Number of features per frame.
pub const FEATURE_COUNT: usize = 8 + N_MFCC + N_CHROMA + 1;

/// Column labels of the feature matrix, in order.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = [
        "zcr",
        "energy",
        "energy_entropy",
        "spectral_centroid",
        "spectral_spread",
        "spectral_entropy",
        "spectral_flux",
        "spectral_rolloff",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    names.extend((1..=N_MFCC).map(|i| format!("mfcc_{i}")));
    names.extend((1..=N_CHROMA).map(|i| format!("chroma_{i}")));
    names.push("chroma_std".to_string());
    names
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Short-term feature extraction over a mono signal.
///
/// The signal is cut into windows of `window_secs`, advancing by
/// `step_secs`; each window yields one row of [`FEATURE_COUNT`] features.
/// The result's sample rate is in frames per second.
pub fn short_term_features(
    signal: &[f64],
    sample_rate: f64,
    window_secs: f64,
    step_secs: f64,
) -> Result<NumericArray, AnalysisError> {
    if !(sample_rate > 0.0) {
        return Err(AnalysisError::InvalidSampleRate);
    }
    let window = (window_secs * sample_rate).round();
    let step = (step_secs * sample_rate).round();
    if !(window_secs > 0.0 && step_secs > 0.0) || window < 2.0 || step < 1.0 {
        return Err(AnalysisError::InvalidParameters {
            window: window_secs,
            step: step_secs,
        });
    }
    let window = window as usize;
    let step = step as usize;
    if signal.len() < window {
        return Err(AnalysisError::SignalTooShort {
            samples: signal.len(),
            window,
        });
    }

    let signal = normalise(signal);
    let n_fft = window / 2;
    let filter_bank = mel_filter_bank(sample_rate, n_fft);
    let chroma = ChromaMap::new(n_fft, sample_rate);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(window);
    let mut buffer = vec![Complex::new(0.0, 0.0); window];

    let mut values = Vec::new();
    let mut prev_spectrum: Option<Vec<f64>> = None;
    let mut frames = 0;
    let mut pos = 0;

    while pos + window <= signal.len() {
        let frame = &signal[pos..pos + window];
        pos += step;

        for (slot, &x) in buffer.iter_mut().zip(frame) {
            *slot = Complex::new(x, 0.0);
        }
        fft.process(&mut buffer);
        let spectrum: Vec<f64> = buffer[..n_fft]
            .iter()
            .map(|c| c.norm() / n_fft as f64)
            .collect();
        let prev = prev_spectrum.as_deref().unwrap_or(&spectrum);

        let (centroid, spread) = spectral_centroid_spread(&spectrum, sample_rate);
        values.push(zero_crossing_rate(frame));
        values.push(energy(frame));
        values.push(block_entropy(frame));
        values.push(centroid);
        values.push(spread);
        values.push(block_entropy(&spectrum));
        values.push(spectral_flux(&spectrum, prev));
        values.push(spectral_rolloff(&spectrum, ROLLOFF));
        values.extend(mfcc(&spectrum, &filter_bank, N_MFCC));
        let chroma_vector = chroma.features(&spectrum);
        let std = std_dev(&chroma_vector);
        values.extend(chroma_vector);
        values.push(std);

        prev_spectrum = Some(spectrum);
        frames += 1;
    }

    log::debug!("Extracted {frames} frames (window {window}, step {step}) from {} samples", signal.len());

    Ok(NumericArray::new(frames, FEATURE_COUNT, values)
        .with_sample_rate(Some(sample_rate / step as f64))
        .with_labels(feature_names()))
}

/// Remove DC and scale to unit peak.
fn normalise(signal: &[f64]) -> Vec<f64> {
    let mean = signal.iter().sum::<f64>() / signal.len().max(1) as f64;
    let peak = signal.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    signal.iter().map(|&x| (x - mean) / (peak + EPS)).collect()
}

// ---------------------------------------------------------------------------
// Time-domain features
// ---------------------------------------------------------------------------

pub fn zero_crossing_rate(frame: &[f64]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let sign = |x: f64| -> f64 {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    };
    let crossings: f64 = frame
        .windows(2)
        .map(|w| (sign(w[1]) - sign(w[0])).abs())
        .sum::<f64>()
        / 2.0;
    crossings / (frame.len() - 1) as f64
}

pub fn energy(frame: &[f64]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().map(|x| x * x).sum::<f64>() / frame.len() as f64
}

/// Entropy of the energy distribution over [`SUB_BLOCKS`] equal blocks.
/// Used on both the frame and its magnitude spectrum.
pub fn block_entropy(values: &[f64]) -> f64 {
    let total: f64 = values.iter().map(|x| x * x).sum();
    let block_len = values.len() / SUB_BLOCKS;
    if block_len == 0 {
        return 0.0;
    }
    values[..block_len * SUB_BLOCKS]
        .chunks_exact(block_len)
        .map(|block| {
            let p = block.iter().map(|x| x * x).sum::<f64>() / (total + EPS);
            -p * (p + EPS).log2()
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Spectral features
// ---------------------------------------------------------------------------

/// Centroid and spread, both normalised by the Nyquist frequency.
pub fn spectral_centroid_spread(spectrum: &[f64], sample_rate: f64) -> (f64, f64) {
    let n = spectrum.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let nyquist = sample_rate / 2.0;
    let peak = spectrum.iter().fold(0.0_f64, |m, &x| m.max(x)).max(EPS);
    let freq = |k: usize| (k + 1) as f64 * sample_rate / (2.0 * n as f64);

    let mut num = 0.0;
    let mut den = EPS;
    for (k, &x) in spectrum.iter().enumerate() {
        let w = x / peak;
        num += freq(k) * w;
        den += w;
    }
    let centroid = num / den;
    let var: f64 = spectrum
        .iter()
        .enumerate()
        .map(|(k, &x)| (freq(k) - centroid).powi(2) * x / peak)
        .sum::<f64>()
        / den;
    (centroid / nyquist, var.sqrt() / nyquist)
}

pub fn spectral_flux(spectrum: &[f64], prev: &[f64]) -> f64 {
    let sum = spectrum.iter().map(|x| x + EPS).sum::<f64>();
    let prev_sum = prev.iter().map(|x| x + EPS).sum::<f64>();
    spectrum
        .iter()
        .zip(prev)
        .map(|(x, p)| (x / sum - p / prev_sum).powi(2))
        .sum()
}

/// Fraction of bins below which `c` of the spectral energy lies.
pub fn spectral_rolloff(spectrum: &[f64], c: f64) -> f64 {
    let total: f64 = spectrum.iter().map(|x| x * x).sum();
    let threshold = c * total;
    let mut cumulative = 0.0;
    for (k, x) in spectrum.iter().enumerate() {
        cumulative += x * x;
        if cumulative + EPS > threshold {
            return k as f64 / spectrum.len() as f64;
        }
    }
    0.0
}

// ---------------------------------------------------------------------------
// MFCC
// ---------------------------------------------------------------------------

/// Triangular filter bank: 13 linearly spaced filters from 133.33 Hz, then
/// 27 log-spaced ones. Bin `k` is placed at `k * fs / n_fft`.
pub fn mel_filter_bank(sample_rate: f64, n_fft: usize) -> Vec<Vec<f64>> {
    const LOW_FREQ: f64 = 133.33;
    const LIN_STEP: f64 = 200.0 / 3.0;
    const LOG_STEP: f64 = 1.071_170_3;
    const N_LIN: usize = 13;
    const N_LOG: usize = 27;
    let n_filters = N_LIN + N_LOG;

    let mut edges = Vec::with_capacity(n_filters + 2);
    edges.extend((0..N_LIN).map(|i| LOW_FREQ + i as f64 * LIN_STEP));
    let last_lin = edges[N_LIN - 1];
    edges.extend((1..=N_LOG + 2).map(|i| last_lin * LOG_STEP.powi(i as i32)));

    let bin_freq = |k: usize| k as f64 / n_fft as f64 * sample_rate;
    let bin_of = |f: f64| (f * n_fft as f64 / sample_rate).floor() as usize;

    (0..n_filters)
        .map(|i| {
            let (low, centre, high) = (edges[i], edges[i + 1], edges[i + 2]);
            let height = 2.0 / (high - low);
            let mut filter = vec![0.0; n_fft];
            for k in (bin_of(low) + 1)..=(bin_of(centre)).min(n_fft.saturating_sub(1)) {
                filter[k] = height / (centre - low) * (bin_freq(k) - low);
            }
            for k in (bin_of(centre) + 1)..=(bin_of(high)).min(n_fft.saturating_sub(1)) {
                filter[k] = height / (high - centre) * (high - bin_freq(k));
            }
            filter
        })
        .collect()
}

pub fn mfcc(spectrum: &[f64], filter_bank: &[Vec<f64>], n_ceps: usize) -> Vec<f64> {
    let log_energies: Vec<f64> = filter_bank
        .iter()
        .map(|filter| {
            let e: f64 = filter.iter().zip(spectrum).map(|(w, x)| w * x).sum();
            (e + EPS).log10()
        })
        .collect();
    dct2_ortho(&log_energies).into_iter().take(n_ceps).collect()
}

/// Orthonormal DCT-II.
fn dct2_ortho(x: &[f64]) -> Vec<f64> {
    let n = x.len() as f64;
    (0..x.len())
        .map(|k| {
            let sum: f64 = x
                .iter()
                .enumerate()
                .map(|(i, &v)| v * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Chroma
// ---------------------------------------------------------------------------

/// Mapping of spectrum bins to semitone indices above A0 (27.5 Hz).
struct ChromaMap {
    semitone: Vec<Option<usize>>,
    bins_per_semitone: Vec<usize>,
}

impl ChromaMap {
    fn new(n_fft: usize, sample_rate: f64) -> Self {
        let semitone: Vec<Option<usize>> = (0..n_fft)
            .map(|k| {
                let freq = (k + 1) as f64 * sample_rate / (2.0 * n_fft as f64);
                let idx = (12.0 * (freq / 27.5).log2()).round();
                (idx >= 0.0 && (idx as usize) < n_fft).then_some(idx as usize)
            })
            .collect();
        let mut bins_per_semitone = vec![0; n_fft];
        for idx in semitone.iter().flatten() {
            bins_per_semitone[*idx] += 1;
        }
        Self {
            semitone,
            bins_per_semitone,
        }
    }

    /// 12-bin pitch-class energy, normalised by total spectral energy.
    fn features(&self, spectrum: &[f64]) -> Vec<f64> {
        let mut per_semitone = vec![0.0; self.bins_per_semitone.len()];
        let mut total = 0.0;
        for (x, idx) in spectrum.iter().zip(&self.semitone) {
            let power = x * x;
            total += power;
            if let Some(i) = idx {
                per_semitone[*i] += power;
            }
        }
        let mut chroma = vec![0.0; N_CHROMA];
        for (i, energy) in per_semitone.iter().enumerate() {
            let count = self.bins_per_semitone[i];
            if count > 0 {
                chroma[i % N_CHROMA] += energy / count as f64;
            }
        }
        let total = total.max(EPS);
        chroma.iter_mut().for_each(|c| *c /= total);
        chroma
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, secs: f64) -> Vec<f64> {
        (0..(fs * secs) as usize)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn frame_count_and_shape() {
        let fs = 8000.0;
        let signal = sine(440.0, fs, 1.0);
        let feats = short_term_features(&signal, fs, 0.05, 0.025).unwrap();
        // 400-sample window, 200-sample step over 8000 samples
        assert_eq!(feats.cols, FEATURE_COUNT);
        assert_eq!(feats.cols, 34);
        assert_eq!(feats.rows, (8000 - 400) / 200 + 1);
        assert_eq!(feats.sample_rate, Some(40.0));
        assert_eq!(feats.labels.as_ref().unwrap().len(), 34);
        assert!(feats.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn sine_features_are_sensible() {
        let fs = 8000.0;
        let signal = sine(1000.0, fs, 0.5);
        let feats = short_term_features(&signal, fs, 0.05, 0.05).unwrap();
        let row = 2;
        // 1 kHz crosses zero 2000 times a second
        let zcr = feats.get(row, 0);
        assert!((zcr - 0.25).abs() < 0.01, "zcr {zcr}");
        // centroid is normalised by Nyquist: 1000 / 4000
        let centroid = feats.get(row, 3);
        assert!((centroid - 0.25).abs() < 0.05, "centroid {centroid}");
        // steady tone: no flux between frames
        assert!(feats.get(row, 6) < 1e-6);
        // unit-peak sine: mean energy 0.5
        assert!((feats.get(row, 1) - 0.5).abs() < 0.01);
    }

    #[test]
    fn rejects_bad_parameters() {
        let signal = vec![0.0; 100];
        assert!(matches!(
            short_term_features(&signal, 8000.0, 0.0, 0.05),
            Err(AnalysisError::InvalidParameters { .. })
        ));
        assert_eq!(
            short_term_features(&signal, 0.0, 0.05, 0.05),
            Err(AnalysisError::InvalidSampleRate)
        );
        assert_eq!(
            short_term_features(&signal, 8000.0, 0.05, 0.05),
            Err(AnalysisError::SignalTooShort {
                samples: 100,
                window: 400
            })
        );
    }

    #[test]
    fn zcr_and_entropy_basics() {
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0, 1.0]), 1.0);
        assert_eq!(zero_crossing_rate(&[1.0, 1.0, 1.0]), 0.0);
        // flat energy over 10 blocks: entropy log2(10)
        let flat = vec![1.0; 100];
        assert!((block_entropy(&flat) - 10f64.log2()).abs() < 1e-6);
        // all energy in one block: zero entropy
        let mut spike = vec![0.0; 100];
        spike[0] = 1.0;
        assert!(block_entropy(&spike).abs() < 1e-6);
    }

    #[test]
    fn rolloff_and_dct() {
        assert_eq!(spectral_rolloff(&[1.0, 0.0, 0.0, 0.0], 0.9), 0.0);
        assert_eq!(spectral_rolloff(&[0.0, 0.0, 0.0, 1.0], 0.9), 0.75);
        let c = dct2_ortho(&[1.0, 1.0, 1.0, 1.0]);
        assert!((c[0] - 2.0).abs() < 1e-12);
        assert!(c[1..].iter().all(|v| v.abs() < 1e-12));
    }
}
