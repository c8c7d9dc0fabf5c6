// WoodEnergy Telemetry - Live power ingestion
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Simulated telemetry for test benches without sensors.
//!
//! Generators produce ordinary [`TelemetryMessage`]s that go through the
//! same store as real sensor traffic.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use woodenergy::MachineProfile;

use crate::message::TelemetryMessage;

/// Source of synthetic power readings
pub trait TelemetryGenerator {
    /// One reading per profile, in profile order
    fn generate(&mut self, profiles: &[MachineProfile]) -> Vec<TelemetryMessage>;
}

/// Noise applied around nominal power
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoiseModel {
    /// nominal × (1 + u), u uniform in [-spread, spread]
    Uniform { spread: f64 },
    /// nominal × (1 + n), n normal(0, std_dev), truncated to ±3σ
    Gaussian { std_dev: f64 },
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Uniform { spread: 0.10 }
    }
}

/// Load variation around nominal power
pub struct LoadVariationSimulator {
    rng: StdRng,
    noise: NoiseModel,
}

impl LoadVariationSimulator {
    /// Reproducible simulator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise: NoiseModel::default(),
        }
    }

    /// Simulator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            noise: NoiseModel::default(),
        }
    }

    pub fn with_noise(mut self, noise: NoiseModel) -> Self {
        self.noise = noise;
        self
    }

    fn factor(&mut self) -> f64 {
        match self.noise {
            NoiseModel::Uniform { spread } => {
                let spread = spread.abs();
                if spread == 0.0 {
                    return 1.0;
                }
                1.0 + self.rng.gen_range(-spread..=spread)
            }
            NoiseModel::Gaussian { std_dev } => {
                let std_dev = std_dev.abs();
                match Normal::new(0.0, std_dev) {
                    Ok(normal) => {
                        let n: f64 = normal.sample(&mut self.rng);
                        1.0 + n.clamp(-3.0 * std_dev, 3.0 * std_dev)
                    }
                    Err(_) => 1.0,
                }
            }
        }
    }
}

impl std::fmt::Debug for LoadVariationSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadVariationSimulator")
            .field("noise", &self.noise)
            .finish()
    }
}

impl TelemetryGenerator for LoadVariationSimulator {
    fn generate(&mut self, profiles: &[MachineProfile]) -> Vec<TelemetryMessage> {
        profiles
            .iter()
            .map(|profile| {
                let power = profile.nominal_power_kw * self.factor();
                TelemetryMessage::new(profile.name.clone(), power)
            })
            .collect()
    }
}

/// Replays nominal power unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NominalGenerator;

impl TelemetryGenerator for NominalGenerator {
    fn generate(&mut self, profiles: &[MachineProfile]) -> Vec<TelemetryMessage> {
        profiles
            .iter()
            .map(|p| TelemetryMessage::new(p.name.clone(), p.nominal_power_kw))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use woodenergy::SawmillLine;

    #[test]
    fn test_seeded_is_reproducible() {
        let profiles = SawmillLine::Standard.profiles();
        let a = LoadVariationSimulator::seeded(7).generate(&profiles);
        let b = LoadVariationSimulator::seeded(7).generate(&profiles);
        assert_eq!(a, b);
    }

    #[test]
    fn test_uniform_stays_within_spread() {
        let profiles = SawmillLine::Extended.profiles();
        let mut sim = LoadVariationSimulator::seeded(1);

        for _ in 0..100 {
            for (profile, msg) in profiles.iter().zip(sim.generate(&profiles)) {
                assert_eq!(msg.machine, profile.name);
                let ratio = msg.power_kw / profile.nominal_power_kw;
                assert!((0.9 - 1e-9..=1.1 + 1e-9).contains(&ratio));
            }
        }
    }

    #[test]
    fn test_gaussian_is_truncated() {
        let profiles = SawmillLine::Standard.profiles();
        let mut sim =
            LoadVariationSimulator::seeded(3).with_noise(NoiseModel::Gaussian { std_dev: 0.05 });

        for _ in 0..100 {
            for (profile, msg) in profiles.iter().zip(sim.generate(&profiles)) {
                let ratio = msg.power_kw / profile.nominal_power_kw;
                assert!((0.85 - 1e-9..=1.15 + 1e-9).contains(&ratio));
            }
        }
    }

    #[test]
    fn test_zero_spread_is_nominal() {
        let profiles = SawmillLine::Standard.profiles();
        let mut sim =
            LoadVariationSimulator::seeded(9).with_noise(NoiseModel::Uniform { spread: 0.0 });
        assert_eq!(sim.generate(&profiles), NominalGenerator.generate(&profiles));
    }
}
