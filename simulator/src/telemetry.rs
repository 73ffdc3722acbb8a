use rand::Rng;
use serde::{Deserialize, Serialize};

/// Body the device POSTs to `/update`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Telemetry {
    pub temperature: f64,
    pub humidity: f64,
}

impl Telemetry {
    /// Random office climate, rounded to DHT11 precision
    pub fn random(rng: &mut impl Rng) -> Self {
        let temperature: f64 = if rng.gen_bool(0.05) {
            rng.gen_range(5.0..40.0) // 5% outliers
        } else {
            rng.gen_range(15.0..30.0)
        };
        let humidity: f64 = rng.gen_range(30.0..80.0);

        Self {
            temperature: (temperature * 10.0).round() / 10.0,
            humidity: humidity.round(),
        }
    }
}
