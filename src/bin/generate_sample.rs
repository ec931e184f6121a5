use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SPEED_OF_LIGHT: f64 = 2.998e5;

/// (ion, short id, rest wavelength, oscillator strength)
const LINES: [(&str, &str, f64, f64); 12] = [
    ("HI", "1215", 1215.6701, 0.41640),
    ("HI", "1025", 1025.7223, 0.07912),
    ("HI", "972", 972.5368, 0.02900),
    ("CIV", "1548", 1548.204, 0.1899),
    ("CIV", "1550", 1550.781, 0.09475),
    ("SiIV", "1393", 1393.7602, 0.5130),
    ("SiIV", "1402", 1402.7729, 0.2550),
    ("OVI", "1031", 1031.9261, 0.1325),
    ("OVI", "1037", 1037.6167, 0.0658),
    ("MgII", "2796", 2796.3543, 0.6155),
    ("MgII", "2803", 2803.5315, 0.3058),
    ("SiII", "1260", 1260.4221, 1.18),
];

/// Metal systems: (redshift, ions present, central optical depth of the
/// strongest transition, Doppler parameter in km/s).
const SYSTEMS: [(f64, &[&str], f64, f64); 3] = [
    (2.0, &["HI", "CIV", "SiIV", "OVI"], 4.0, 25.0),
    (1.85, &["HI", "CIV", "SiII"], 2.5, 18.0),
    (0.55, &["MgII"], 1.5, 10.0),
];

#[derive(Debug, Parser)]
#[command(about = "Write a synthetic quasar spectrum and matching line list")]
struct Args {
    /// Directory to write test.ascii and linelist.lst into.
    #[arg(default_value = ".")]
    out_dir: PathBuf,

    /// Random seed for noise and forest lines.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of random Lyman-alpha forest absorbers.
    #[arg(long, default_value_t = 60)]
    forest: usize,

    /// Signal-to-noise ratio per pixel.
    #[arg(long, default_value_t = 30.0)]
    snr: f64,
}

/// One absorption component at a single transition.
struct Absorber {
    centre: f64,
    tau0: f64,
    b: f64,
}

/// Box-Muller draw from N(mean, sigma).
fn gauss(rng: &mut StdRng, mean: f64, sigma: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-15);
    let u2: f64 = rng.random();
    mean + sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn absorbers(rng: &mut StdRng, forest: usize) -> Vec<Absorber> {
    let mut out = Vec::new();

    for &(z, ions, tau_max, b) in &SYSTEMS {
        let strongest = LINES
            .iter()
            .filter(|l| ions.contains(&l.0))
            .map(|l| l.2 * l.3)
            .fold(0.0_f64, f64::max);
        for &(ion, _, rest, f) in &LINES {
            if ions.contains(&ion) {
                out.push(Absorber {
                    centre: rest * (1.0 + z),
                    tau0: tau_max * rest * f / strongest,
                    b,
                });
            }
        }
    }

    // Forest: Lyman-alpha only, between z = 1.9 and z = 2.4.
    for _ in 0..forest {
        let z = 1.9 + 0.5 * rng.random::<f64>();
        out.push(Absorber {
            centre: LINES[0].2 * (1.0 + z),
            tau0: 0.2 + 3.0 * rng.random::<f64>().powi(2),
            b: 15.0 + 25.0 * rng.random::<f64>(),
        });
    }
    out
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    // 3400 → 4800 Å, 0.05 Å pixels
    let wavelengths: Vec<f64> = (0..28_000).map(|i| 3400.0 + 0.05 * i as f64).collect();
    let lines = absorbers(&mut rng, args.forest);

    let mut spectrum = String::new();
    for &wl in &wavelengths {
        // Gentle power-law continuum.
        let continuum = 1.0e-16 * (wl / 4000.0).powf(-1.5);
        let tau: f64 = lines
            .iter()
            .map(|a| {
                let v = (wl - a.centre) / a.centre * SPEED_OF_LIGHT;
                a.tau0 * (-(v / a.b).powi(2)).exp()
            })
            .sum();
        let flux = continuum * (-tau).exp();
        let noisy = gauss(&mut rng, flux, continuum / args.snr);
        writeln!(spectrum, "{wl:.3} {noisy:.6e}")?;
    }

    let mut line_list = String::new();
    for &(ion, id, rest, f) in &LINES {
        writeln!(line_list, "{rest:.4} {ion} {id} {f}")?;
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let spectrum_path = args.out_dir.join("test.ascii");
    let line_list_path = args.out_dir.join("linelist.lst");
    std::fs::write(&spectrum_path, spectrum)
        .with_context(|| format!("writing {}", spectrum_path.display()))?;
    std::fs::write(&line_list_path, line_list)
        .with_context(|| format!("writing {}", line_list_path.display()))?;

    println!(
        "Wrote {} pixels with {} absorbers to {} and {} lines to {}",
        wavelengths.len(),
        lines.len(),
        spectrum_path.display(),
        LINES.len(),
        line_list_path.display()
    );
    Ok(())
}
