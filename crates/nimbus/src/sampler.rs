//! Measurement source abstraction.
//!
//! The physical sensor sits behind the [`Sampler`] trait: production agents
//! draw bounded uniform values from an explicitly seeded RNG, tests inject
//! scripted sequences instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nimbus_core::Measurement;

/// The six deployment sectors recognized by the monitor.
pub const SECTORS: [&str; 6] = [
    "sector1", "sector2", "sector3", "sector4", "sector5", "sector6",
];

pub trait Sampler: Send {
    fn sample(&mut self) -> Measurement;
}

/// Per-variable bounds for generated measurements.
#[derive(Debug, Clone, Copy)]
pub struct MeasureRanges {
    pub temperature_c: (f64, f64),
    pub pressure_hpa: (f64, f64),
    pub humidity_pct: (f64, f64),
}

impl Default for MeasureRanges {
    fn default() -> Self {
        Self {
            temperature_c: (-15.0, 30.0),
            pressure_hpa: (930.0, 1030.0),
            humidity_pct: (20.0, 100.0),
        }
    }
}

pub struct UniformSampler {
    rng: StdRng,
    ranges: MeasureRanges,
}

impl UniformSampler {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_ranges(seed, MeasureRanges::default())
    }

    pub fn with_ranges(seed: Option<u64>, ranges: MeasureRanges) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, ranges }
    }
}

impl Sampler for UniformSampler {
    fn sample(&mut self) -> Measurement {
        let (t_lo, t_hi) = self.ranges.temperature_c;
        let (p_lo, p_hi) = self.ranges.pressure_hpa;
        let (h_lo, h_hi) = self.ranges.humidity_pct;

        // Temperature and pressure carry one decimal, humidity is integral.
        let temperature = (self.rng.gen_range(t_lo..t_hi) * 10.0).round() / 10.0;
        let pressure = (self.rng.gen_range(p_lo..p_hi) * 10.0).round() / 10.0;
        let humidity = self.rng.gen_range(h_lo..h_hi).floor();

        Measurement::new(temperature, pressure, humidity)
    }
}

/// Mints an agent identity: `<type>-<ms-suffix>-<nonce>`.
pub fn make_sensor_id(sensor_type: &str) -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let nonce = rand::thread_rng().gen_range(100..1000);
    format!("{}-{}-{}", sensor_type, millis % 100_000, nonce)
}
