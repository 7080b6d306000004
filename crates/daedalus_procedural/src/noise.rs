//! # Noise Fields
//!
//! Seeded 2D and 3D simplex noise, fractal sums over it, and seed
//! derivation for independent streams.
//!
//! Terrain density and biome climate are pure functions of global
//! coordinates through this module. Equal seeds give bit-identical samples,
//! which keeps chunk corners and region seams in agreement with their
//! neighbours.

/// Root seed of a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Wraps a raw seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Sub-seed for one noise stream, keyed by `purpose`.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0 ^ purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// Hashes integer grid coordinates into a 64-bit stream seed.
    ///
    /// Every component goes through a full avalanche step, so neighbouring
    /// offsets give unrelated streams.
    #[must_use]
    pub fn hash_coords(self, coords: &[i64]) -> u64 {
        let mut hash = self.0;
        for (axis, &c) in coords.iter().enumerate() {
            hash = splitmix64(hash ^ (c as u64).wrapping_add((axis as u64 + 1) << 56));
        }
        hash
    }
}

#[inline]
const fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seeded shuffle of `0..256`, stored twice so lookups never wrap.
struct PermutationTable {
    perm: [u8; 512],
}

/// 2D gradients: the eight compass directions, axes repeated.
const GRAD2: [[i8; 2]; 12] = [
    [1, 0], [1, 1], [0, 1], [-1, 1],
    [-1, 0], [-1, -1], [0, -1], [1, -1],
    [1, 0], [0, 1], [-1, 0], [0, -1],
];

/// 12 gradient vectors for 3D simplex (cube edge midpoints).
const GRAD3: [[i8; 3]; 12] = [
    [1, 1, 0], [-1, 1, 0], [1, -1, 0], [-1, -1, 0],
    [1, 0, 1], [-1, 0, 1], [1, 0, -1], [-1, 0, -1],
    [0, 1, 1], [0, -1, 1], [0, 1, -1], [0, -1, -1],
];

impl PermutationTable {
    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        // Fisher-Yates driven by xorshift64.
        let mut state = splitmix64(seed.value());
        for i in (1..256).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            perm.swap(i, (state as usize) % (i + 1));
        }

        let (low, high) = perm.split_at_mut(256);
        high.copy_from_slice(low);
        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }
}

/// Simplex noise in two and three dimensions, values in `[-1, 1]`.
///
/// # Example
///
/// ```rust,ignore
/// let noise = SimplexNoise::new(WorldSeed::new(42));
///
/// let height = noise.octaved(x, y, 6, 0.5, 2.0);
/// let cave = noise.sample3(x, y, z);
/// ```
pub struct SimplexNoise {
    /// The permutation table.
    perm_table: PermutationTable,
}

impl SimplexNoise {
    /// (sqrt(3) - 1) / 2
    const F2: f64 = 0.366_025_403_784_439;
    /// (3 - sqrt(3)) / 6
    const G2: f64 = 0.211_324_865_405_187;
    const F3: f64 = 1.0 / 3.0;
    const G3: f64 = 1.0 / 6.0;

    /// Builds the permutation table for `seed`.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            perm_table: PermutationTable::new(seed),
        }
    }

    /// 2D sample.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let skew = (x + y) * Self::F2;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);

        let unskew = (i + j) as f64 * Self::G2;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);

        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;

        let p = &self.perm_table;
        let gi0 = p.get(ii + p.get(jj) as usize);
        let gi1 = p.get(ii + i1 + p.get(jj + j1) as usize);
        let gi2 = p.get(ii + 1 + p.get(jj + 1) as usize);

        let n0 = contribution2(x0, y0, gi0);
        let n1 = contribution2(x1, y1, gi1);
        let n2 = contribution2(x2, y2, gi2);

        // Scales the peak contribution to 1.
        70.0 * (n0 + n1 + n2)
    }

    /// 3D sample.
    #[must_use]
    pub fn sample3(&self, x: f64, y: f64, z: f64) -> f64 {
        let skew = (x + y + z) * Self::F3;
        let i = fast_floor(x + skew);
        let j = fast_floor(y + skew);
        let k = fast_floor(z + skew);

        let unskew = (i + j + k) as f64 * Self::G3;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);
        let z0 = z - (k as f64 - unskew);

        // Rank the offsets to pick which of the six tetrahedra we are in.
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f64 + Self::G3;
        let y1 = y0 - j1 as f64 + Self::G3;
        let z1 = z0 - k1 as f64 + Self::G3;
        let x2 = x0 - i2 as f64 + 2.0 * Self::G3;
        let y2 = y0 - j2 as f64 + 2.0 * Self::G3;
        let z2 = z0 - k2 as f64 + 2.0 * Self::G3;
        let x3 = x0 - 1.0 + 3.0 * Self::G3;
        let y3 = y0 - 1.0 + 3.0 * Self::G3;
        let z3 = z0 - 1.0 + 3.0 * Self::G3;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let kk = (k & 255) as usize;

        let p = &self.perm_table;
        let gi0 = p.get(ii + p.get(jj + p.get(kk) as usize) as usize);
        let gi1 = p.get(ii + i1 + p.get(jj + j1 + p.get(kk + k1) as usize) as usize);
        let gi2 = p.get(ii + i2 + p.get(jj + j2 + p.get(kk + k2) as usize) as usize);
        let gi3 = p.get(ii + 1 + p.get(jj + 1 + p.get(kk + 1) as usize) as usize);

        let n0 = contribution3(x0, y0, z0, gi0);
        let n1 = contribution3(x1, y1, z1, gi1);
        let n2 = contribution3(x2, y2, z2, gi2);
        let n3 = contribution3(x3, y3, z3, gi3);

        32.0 * (n0 + n1 + n2 + n3)
    }

    /// Fractal sum of [`Self::sample`]: `octaves` layers, amplitude scaled
    /// by `persistence` and frequency by `lacunarity` per layer, normalized
    /// back to roughly `[-1, 1]`.
    #[must_use]
    pub fn octaved(&self, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        fractal(octaves, persistence, lacunarity, |f| self.sample(x * f, y * f))
    }

    /// Fractal sum of squared inverted `|sample|`, in `[0, 1]`. Peaks
    /// form sharp ridges along the zero lines of the base noise.
    #[must_use]
    pub fn ridged(&self, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        fractal(octaves, persistence, lacunarity, |f| {
            let ridge = 1.0 - self.sample(x * f, y * f).abs();
            ridge * ridge
        })
    }
}

/// Sums `octaves` layers of `layer(frequency)` and normalizes by the
/// total amplitude.
#[inline]
fn fractal(octaves: u32, persistence: f64, lacunarity: f64, layer: impl Fn(f64) -> f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_amplitude = 0.0;

    for _ in 0..octaves.max(1) {
        total += layer(frequency) * amplitude;
        max_amplitude += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_amplitude
}

#[inline]
fn contribution2(x: f64, y: f64, hash: u8) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        0.0
    } else {
        let grad = GRAD2[(hash % 12) as usize];
        let t2 = t * t;
        t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]))
    }
}

#[inline]
fn contribution3(x: f64, y: f64, z: f64, hash: u8) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        0.0
    } else {
        let grad = GRAD3[(hash % 12) as usize];
        let t2 = t * t;
        t2 * t2 * (x * f64::from(grad[0]) + y * f64::from(grad[1]) + z * f64::from(grad[2]))
    }
}

#[inline]
fn fast_floor(x: f64) -> i64 {
    let xi = x as i64;
    if x < xi as f64 {
        xi - 1
    } else {
        xi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let seed = WorldSeed::new(12345);
        let noise1 = SimplexNoise::new(seed);
        let noise2 = SimplexNoise::new(seed);

        for i in 0..100 {
            let x = f64::from(i) * 0.1;
            let y = f64::from(i) * 0.17;
            assert_eq!(noise1.sample(x, y), noise2.sample(x, y), "2D noise should be deterministic");
            assert_eq!(
                noise1.sample3(x, y, -x),
                noise2.sample3(x, y, -x),
                "3D noise should be deterministic"
            );
        }
    }

    #[test]
    fn test_different_seeds_different_results() {
        let noise1 = SimplexNoise::new(WorldSeed::new(1));
        let noise2 = SimplexNoise::new(WorldSeed::new(2));

        assert_ne!(noise1.sample(100.3, 100.7), noise2.sample(100.3, 100.7));
        assert_ne!(noise1.sample3(10.3, 4.1, 7.7), noise2.sample3(10.3, 4.1, 7.7));
    }

    #[test]
    fn test_range() {
        let noise = SimplexNoise::new(WorldSeed::new(42));

        for i in 0..10000 {
            let x = (f64::from(i) * 0.1) - 500.0;
            let y = (f64::from(i) * 0.13) - 650.0;
            let z = (f64::from(i) * 0.07) - 300.0;
            let v2 = noise.sample(x, y);
            let v3 = noise.sample3(x, y, z);

            assert!((-1.0..=1.0).contains(&v2), "2D value {v2} out of range at ({x}, {y})");
            assert!((-1.0..=1.0).contains(&v3), "3D value {v3} out of range at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_continuity() {
        let noise = SimplexNoise::new(WorldSeed::new(42));
        let delta = 0.001;

        let v1 = noise.sample3(10.0, 20.0, 30.0);
        let v2 = noise.sample3(10.0 + delta, 20.0, 30.0);
        let v3 = noise.sample3(10.0, 20.0, 30.0 + delta);

        assert!((v1 - v2).abs() < 0.01, "Noise should be continuous");
        assert!((v1 - v3).abs() < 0.01, "Noise should be continuous");
    }

    #[test]
    fn test_octaved_noise() {
        let noise = SimplexNoise::new(WorldSeed::new(42));

        let value = noise.octaved(100.0, 100.0, 6, 0.5, 2.0);
        assert!((-1.0..=1.0).contains(&value), "Octaved value {value} out of range");

        let ridged = noise.ridged(100.0, 100.0, 3, 0.5, 2.0);
        assert!((0.0..=1.0).contains(&ridged), "Ridged value {ridged} out of range");
    }

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        let derived1 = base.derive(1);
        let derived2 = base.derive(2);

        assert_ne!(derived1, derived2, "Different purposes should give different seeds");
        assert_eq!(derived1, base.derive(1), "Same purpose should give same seed");
        assert_ne!(derived1, base, "Derived seed should differ from base");
    }

    #[test]
    fn test_coordinate_hash_separates_neighbours() {
        let seed = WorldSeed::new(12_345_678);
        let origin = seed.hash_coords(&[0, 0]);

        assert_eq!(origin, seed.hash_coords(&[0, 0]));
        assert_ne!(origin, seed.hash_coords(&[1, 0]));
        assert_ne!(origin, seed.hash_coords(&[0, 1]));
        assert_ne!(
            seed.hash_coords(&[1, 0]),
            seed.hash_coords(&[0, 1]),
            "Axis order must matter"
        );
        assert_ne!(origin, WorldSeed::new(1).hash_coords(&[0, 0]));
    }
}
