use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};

const SAMPLE_RATE: u32 = 22_050;
const DURATION_SECS: f64 = 6.0;

/// One synthetic call: a linear chirp with a raised-cosine envelope.
struct Call {
    onset: f64,
    duration: f64,
    f_start: f64,
    f_end: f64,
    amplitude: f64,
    individual: &'static str,
}

impl Call {
    fn sample(&self, t: f64) -> f64 {
        let local = t - self.onset;
        if !(0.0..self.duration).contains(&local) {
            return 0.0;
        }
        let sweep = (self.f_end - self.f_start) / self.duration;
        let phase = 2.0 * PI * (self.f_start * local + 0.5 * sweep * local * local);
        let envelope = 0.5 * (1.0 - (2.0 * PI * local / self.duration).cos());
        self.amplitude * envelope * phase.sin()
    }

    fn peak_frequency(&self) -> f64 {
        (self.f_start + self.f_end) / 2.0
    }
}

/// Minimal deterministic PRNG (xorshift64*)
struct SimpleRng(u64);

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    fn next_f64(&mut self) -> f64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        let bits = self.0.wrapping_mul(0x2545_F491_4F6C_DD1D);
        (bits >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

fn make_calls(rng: &mut SimpleRng) -> Vec<Call> {
    let individuals = ["F1", "M2", "M3"];
    let mut calls = Vec::new();
    let mut onset = 0.25;
    while onset < DURATION_SECS - 0.5 {
        let individual = individuals[calls.len() % individuals.len()];
        let base = match individual {
            "F1" => 2_500.0,
            "M2" => 1_200.0,
            _ => 4_000.0,
        };
        let duration = rng.uniform(0.08, 0.3);
        calls.push(Call {
            onset,
            duration,
            f_start: base * rng.uniform(0.9, 1.1),
            f_end: base * rng.uniform(1.3, 1.8),
            amplitude: rng.uniform(0.3, 0.8),
            individual,
        });
        onset += duration + rng.uniform(0.15, 0.6);
    }
    calls
}

fn write_wav(path: &PathBuf, calls: &[Call], rng: &mut SimpleRng) -> Result<usize> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    let n = (DURATION_SECS * SAMPLE_RATE as f64) as usize;
    for i in 0..n {
        let t = i as f64 / SAMPLE_RATE as f64;
        let signal: f64 = calls.iter().map(|c| c.sample(t)).sum::<f64>() + rng.gauss(0.01);
        let value = (signal.clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(n)
}

fn write_csv(path: &PathBuf, calls: &[Call]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["onset_s", "duration_s", "peak_hz", "amplitude", "individual"])?;
    for call in calls {
        writer.write_record([
            format!("{:.4}", call.onset),
            format!("{:.4}", call.duration),
            format!("{:.1}", call.peak_frequency()),
            format!("{:.3}", call.amplitude),
            call.individual.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let calls = make_calls(&mut rng);

    let wav_path = PathBuf::from("sample_calls.wav");
    let csv_path = PathBuf::from("sample_calls.csv");
    let samples = write_wav(&wav_path, &calls, &mut rng)?;
    write_csv(&csv_path, &calls)?;

    println!(
        "Wrote {samples} samples at {SAMPLE_RATE} Hz to {} and {} call annotations to {}",
        wav_path.display(),
        calls.len(),
        csv_path.display()
    );
    Ok(())
}
