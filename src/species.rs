//! Wood species and their cutting characteristics

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Cutting characteristics of a wood species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoodSpecies {
    /// Unique species key
    pub name: String,
    /// Motor load multiplier, >= 1 (1.0 = softwood baseline)
    pub effort_coefficient: f64,
    /// Throughput multiplier, > 0 (lower = slower cutting)
    pub relative_speed: f64,
}

impl WoodSpecies {
    pub fn new(name: impl Into<String>, effort_coefficient: f64, relative_speed: f64) -> Self {
        Self {
            name: name.into(),
            effort_coefficient,
            relative_speed,
        }
    }

    /// Extra energy relative to the baseline species, in percent
    pub fn surcharge_percent(&self) -> f64 {
        (self.effort_coefficient - 1.0) * 100.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.effort_coefficient >= 1.0) {
            return Err(ConfigError::EffortBelowBaseline {
                species: self.name.clone(),
                value: self.effort_coefficient,
            });
        }
        if !(self.relative_speed > 0.0) {
            return Err(ConfigError::non_positive(
                format!("relative speed of {}", self.name),
                self.relative_speed,
            ));
        }
        Ok(())
    }
}

/// Lookup table of species by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCatalog {
    species: Vec<WoodSpecies>,
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        Self {
            species: vec![
                WoodSpecies::new("Fir/Spruce", 1.0, 1.2),
                WoodSpecies::new("Pine", 1.1, 1.0),
                WoodSpecies::new("Beech", 1.4, 0.7),
                WoodSpecies::new("Oak", 1.6, 0.6),
            ],
        }
    }
}

impl SpeciesCatalog {
    /// Add or replace a species
    pub fn insert(&mut self, species: WoodSpecies) {
        match self.species.iter_mut().find(|s| s.name == species.name) {
            Some(existing) => *existing = species,
            None => self.species.push(species),
        }
    }

    /// Look a species up by name
    pub fn get(&self, name: &str) -> Result<&WoodSpecies, ConfigError> {
        self.species
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownSpecies(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WoodSpecies> {
        self.species.iter()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = SpeciesCatalog::default();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.iter().all(|s| s.validate().is_ok()));

        let oak = catalog.get("Oak").unwrap();
        assert_eq!(oak.effort_coefficient, 1.6);
        assert_eq!(oak.relative_speed, 0.6);
    }

    #[test]
    fn test_unknown_species() {
        let catalog = SpeciesCatalog::default();
        assert_eq!(
            catalog.get("Teak"),
            Err(ConfigError::UnknownSpecies("Teak".to_string()))
        );
    }

    #[test]
    fn test_insert_replaces() {
        let mut catalog = SpeciesCatalog::default();
        catalog.insert(WoodSpecies::new("Oak", 1.7, 0.6));
        catalog.insert(WoodSpecies::new("Douglas", 1.2, 0.9));

        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get("Oak").unwrap().effort_coefficient, 1.7);
    }

    #[test]
    fn test_surcharge() {
        assert_eq!(WoodSpecies::new("Fir/Spruce", 1.0, 1.2).surcharge_percent(), 0.0);
        assert!((WoodSpecies::new("Beech", 1.4, 0.7).surcharge_percent() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            WoodSpecies::new("Balsa", 0.8, 1.5).validate(),
            Err(ConfigError::EffortBelowBaseline { .. })
        ));
        assert!(matches!(
            WoodSpecies::new("Ironwood", 2.0, 0.0).validate(),
            Err(ConfigError::NonPositive { .. })
        ));
    }
}
