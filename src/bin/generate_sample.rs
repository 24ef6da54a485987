use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use npyz::WriterBuilder;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Write `rows x cols` gaussian samples as a 2-D float64 `.npy` file.
fn write_sample(
    path: &Path,
    rows: usize,
    cols: usize,
    mean: f64,
    rng: &mut SimpleRng,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = npyz::WriteOptions::new()
        .default_dtype()
        .shape(&[rows as u64, cols as u64])
        .writer(BufWriter::new(file))
        .begin_nd()?;
    for _ in 0..rows * cols {
        writer.push(&rng.gauss(mean, 1.0))?;
    }
    writer.finish()?;
    Ok(())
}

fn main() -> Result<()> {
    let root = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "sample_data".into()));
    let mut rng = SimpleRng::new(42);

    // (class, number of files, gaussian mean)
    let classes = [("class1", 2, -2.0), ("class2", 1, 0.0), ("class3", 3, 2.0)];

    let mut total = 0;
    for (class, n_files, mean) in classes {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        for i in 0..n_files {
            write_sample(&dir.join(format!("sample_{i:03}.npy")), 64, 2, mean, &mut rng)?;
            total += 1;
        }
    }

    println!(
        "Wrote {total} samples in {} classes to {}",
        classes.len(),
        root.display()
    );
    Ok(())
}
