//! Seeded synthetic training data
//!
//! Encodes known short-form retention patterns: TikTok retains better and
//! YouTube worse, short videos beat long ones, dynamic openings, energetic
//! audio, emotive faces and concise hooks all help. Used to bootstrap a model
//! and to anchor retraining on small production samples.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::features::{platform_one_hot, FEATURE_COUNT};
use super::Platform;

/// Seed used when no other is given.
pub const DEFAULT_SEED: u64 = 42;

/// Feature rows with retention targets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// Row-major features in model order
    pub rows: Vec<Vec<f64>>,
    /// Observed or simulated retention per row
    pub targets: Vec<f64>,
}

impl Dataset {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append another dataset.
    pub fn extend(&mut self, other: Self) {
        self.rows.extend(other.rows);
        self.targets.extend(other.targets);
    }

    /// Shuffle and split off `test_fraction` of the rows as a hold-out set.
    #[must_use]
    pub fn train_test_split(self, test_fraction: f64, seed: u64) -> (Self, Self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let n_test = ((self.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
        let (test_idx, train_idx) = order.split_at(n_test.min(self.len()));
        let pick = |idx: &[usize]| Self {
            rows: idx.iter().map(|&i| self.rows[i].clone()).collect(),
            targets: idx.iter().map(|&i| self.targets[i]).collect(),
        };
        (pick(train_idx), pick(test_idx))
    }
}

/// Generate `n` synthetic rows.
#[must_use]
pub fn generate(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Dataset {
        rows: Vec::with_capacity(n),
        targets: Vec::with_capacity(n),
    };
    for _ in 0..n {
        let (row, target) = sample(&mut rng);
        data.rows.push(row);
        data.targets.push(target);
    }
    data
}

fn sample<R: Rng>(rng: &mut R) -> (Vec<f64>, f64) {
    let duration = f64::from(rng.gen_range(10u32..180));
    let scene_changes = f64::from(poisson(rng, 3.0)) / duration * 5.0;
    let text_overlays = f64::from(poisson(rng, 2.0));
    let music_energy = beta_2_2(rng);
    let has_faces = rng.gen::<f64>() > 0.3;
    let emotion_score = if has_faces { rng.gen::<f64>() } else { 0.0 };
    let hashtags = f64::from(poisson(rng, 5.0));
    let hook_length = f64::from(rng.gen_range(5u32..50));
    let transcript_complexity = rng.gen::<f64>();
    let platform = Platform::ALL[rng.gen_range(0..Platform::ALL.len())];

    let mut row = Vec::with_capacity(FEATURE_COUNT);
    row.extend([
        duration,
        scene_changes,
        text_overlays / duration * 60.0,
        music_energy,
        if has_faces { 1.0 } else { 0.0 },
        emotion_score,
        hashtags / 30.0,
        hook_length,
        transcript_complexity,
    ]);
    row.extend(platform_one_hot(platform));

    let mut retention: f64 = 0.5;
    match platform {
        Platform::TikTok => retention += 0.1,
        Platform::YouTube => retention -= 0.05,
        Platform::Instagram | Platform::Twitter => {}
    }
    if duration < 30.0 {
        retention += 0.15;
    } else if duration > 120.0 {
        retention -= 0.2;
    }
    if scene_changes > 0.5 {
        retention += 0.1;
    }
    if music_energy > 0.7 {
        retention += 0.05;
    }
    if has_faces && emotion_score > 0.7 {
        retention += 0.1;
    }
    if hook_length < 15.0 {
        retention += 0.05;
    }
    retention += 0.1 * standard_normal(rng);

    (row, retention.clamp(0.0, 1.0))
}

/// Knuth's multiplication method; fine for small means.
fn poisson<R: Rng>(rng: &mut R, lambda: f64) -> u32 {
    let limit = (-lambda).exp();
    let mut k = 0;
    let mut p = rng.gen::<f64>();
    while p > limit {
        k += 1;
        p *= rng.gen::<f64>();
    }
    k
}

/// Median of three uniforms is exactly Beta(2, 2).
fn beta_2_2<R: Rng>(rng: &mut R) -> f64 {
    let mut u = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
    u.sort_by(f64::total_cmp);
    u[1]
}

/// Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
