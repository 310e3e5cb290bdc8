//! Random record workload shared by the bench command and the criterion
//! benchmarks

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};

/// Distinct values of the `group` attribute
pub const GROUPS: u64 = 100;

const TAGS: [&str; 6] = ["red", "green", "blue", "cyan", "magenta", "yellow"];

/// `count` records with attributes `id`, `group`, `score` and `tags`.
///
/// The same seed always yields the same records.
pub fn generate_records(count: usize, seed: u64) -> Vec<Map<String, Value>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let tags: Vec<&str> = TAGS
                .iter()
                .copied()
                .filter(|_| rng.gen_bool(0.3))
                .collect();
            let record = json!({
                "id": id,
                "group": rng.gen_range(0..GROUPS),
                "score": rng.gen_range(0.0..1000.0),
                "tags": tags,
            });
            match record {
                Value::Object(map) => map,
                _ => Map::new(),
            }
        })
        .collect()
}

/// Random `group` values to query for
pub fn generate_groups(count: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    (0..count).map(|_| rng.gen_range(0..GROUPS)).collect()
}
