//! Friendly room name generation.
//!
//! Names look like `azul-leon-42`: a color, an animal and a number below 100.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const COLORS: [&str; 8] = [
    "azul", "rojo", "verde", "amarillo", "morado", "naranja", "rosa", "gris",
];

const ANIMALS: [&str; 8] = [
    "leon", "tigre", "oso", "lobo", "zorro", "aguila", "delfin", "panda",
];

/// Attempts before falling back to a suffix derived from the room id.
const MAX_ATTEMPTS: usize = 16;

/// Generates friendly names that are unique among a caller-supplied set.
pub struct NameGenerator {
    rng: StdRng,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Every name `candidate` can produce.
    #[cfg(test)]
    pub fn vocabulary() -> impl Iterator<Item = String> {
        COLORS.iter().flat_map(|color| {
            ANIMALS
                .iter()
                .flat_map(move |animal| (0..100u8).map(move |n| format!("{color}-{animal}-{n}")))
        })
    }

    fn candidate(&mut self) -> String {
        let color = COLORS[self.rng.gen_range(0..COLORS.len())];
        let animal = ANIMALS[self.rng.gen_range(0..ANIMALS.len())];
        let number: u8 = self.rng.gen_range(0..100);
        format!("{color}-{animal}-{number}")
    }

    /// Produce a name for `room_id` for which `taken` returns false.
    pub fn generate(&mut self, room_id: &str, taken: impl Fn(&str) -> bool) -> String {
        let mut last = self.candidate();
        for _ in 1..MAX_ATTEMPTS {
            if !taken(&last) {
                return last;
            }
            last = self.candidate();
        }
        if !taken(&last) {
            return last;
        }

        let suffix: String = room_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        let fallback = format!("{last}-{suffix}");
        if !taken(&fallback) {
            return fallback;
        }
        // ids sharing a prefix share a suffix; the taken set is finite
        let mut n = 2u64;
        loop {
            let name = format!("{fallback}-{n}");
            if !taken(&name) {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}
