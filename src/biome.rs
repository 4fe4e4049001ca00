use std::fmt;

use crate::noise_field::NoiseField;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    Desert,
    Plains,
    Forest,
    Mountains,
    Snowlands,
}

impl Biome {
    pub const ALL: [Biome; 5] = [
        Biome::Desert,
        Biome::Plains,
        Biome::Forest,
        Biome::Mountains,
        Biome::Snowlands,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Biome::Desert => "desert",
            Biome::Plains => "plains",
            Biome::Forest => "forest",
            Biome::Mountains => "mountains",
            Biome::Snowlands => "snowlands",
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks one biome per chunk from two decorrelated noise samples, so biomes
/// form large contiguous regions rather than per-tile speckle.
#[derive(Clone)]
pub struct BiomeClassifier {
    noise: NoiseField,
}

impl BiomeClassifier {
    pub fn new(noise: NoiseField) -> Self {
        Self { noise }
    }

    pub fn classify(&self, chunk_x: i32, chunk_y: i32) -> Biome {
        let (cx, cy) = (chunk_x as f64, chunk_y as f64);
        let variation = self.noise.sample(cx * 0.05, cy * 0.05);
        let temperature = self.noise.sample(cx * 0.03 + 500.0, cy * 0.03 + 500.0);
        select_biome(temperature, variation)
    }
}

pub fn select_biome(temperature: f64, variation: f64) -> Biome {
    if temperature > 0.5 {
        if variation < -0.3 {
            Biome::Desert
        } else {
            Biome::Plains
        }
    } else if temperature > 0.0 {
        if variation > 0.2 {
            Biome::Forest
        } else {
            Biome::Plains
        }
    } else if temperature > -0.5 {
        if variation > 0.1 {
            Biome::Mountains
        } else {
            Biome::Plains
        }
    } else {
        Biome::Snowlands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn classification_is_stable() {
        let classifier = BiomeClassifier::new(NoiseField::new(42));
        for cy in -15..15 {
            for cx in -15..15 {
                assert_eq!(classifier.classify(cx, cy), classifier.classify(cx, cy));
            }
        }
    }

    #[test]
    fn thresholds() {
        assert_eq!(select_biome(0.6, -0.4), Biome::Desert);
        assert_eq!(select_biome(0.6, -0.3), Biome::Plains);
        assert_eq!(select_biome(0.5, 0.3), Biome::Forest);
        assert_eq!(select_biome(0.5, 0.2), Biome::Plains);
        assert_eq!(select_biome(0.0, 0.2), Biome::Mountains);
        assert_eq!(select_biome(-0.4, 0.1), Biome::Plains);
        assert_eq!(select_biome(-0.5, 0.9), Biome::Snowlands);
        assert_eq!(select_biome(-1.0, -1.0), Biome::Snowlands);
    }

    #[test]
    fn neighbouring_chunks_mostly_agree() {
        let classifier = BiomeClassifier::new(NoiseField::new(3));
        let mut same = 0;
        let mut total = 0;
        for cy in -20..20 {
            for cx in -20..20 {
                total += 1;
                if classifier.classify(cx, cy) == classifier.classify(cx + 1, cy) {
                    same += 1;
                }
            }
        }
        assert!(same * 10 > total * 6, "only {same}/{total} neighbours agree");
    }

    #[test]
    fn every_biome_appears_near_spawn() {
        for seed in [1, 7, 42, 2024, 99_999] {
            let classifier = BiomeClassifier::new(NoiseField::new(seed));
            let mut seen = HashSet::new();
            for cy in -48..=48 {
                for cx in -48..=48 {
                    seen.insert(classifier.classify(cx, cy));
                }
            }
            for biome in Biome::ALL {
                assert!(seen.contains(&biome), "seed {seed} has no {biome} near spawn");
            }
        }
    }
}
