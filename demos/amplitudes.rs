//! Amplitudes of a uniform superposition with phases.
//!
//! Builds the amplitudes `e^{2πik/2^n} / √(2^n)` of an `n`-qubit state (the
//! quantum Fourier transform of `|1⟩`), canonicalizes them, and prints them
//! together with table statistics. The amplitudes are computed twice: once
//! directly and once by repeated in-place multiplication, and both runs
//! end up on the same handles.
//!
//! Run with: `cargo run --example amplitudes`
//! With options: `cargo run --example amplitudes -- -n 4 --plain`

use std::f64::consts::PI;

use clap::Parser;
use log::info;
use qdd_rs::complex::Complex;
use qdd_rs::complex_numbers::ComplexNumbers;
use qdd_rs::config::Config;
use qdd_rs::io::parse_complex;
use qdd_rs::types::{Complex64, Tolerance};

#[derive(Parser, Debug)]
#[command(name = "amplitudes")]
#[command(about = "Canonicalize and print quantum amplitudes")]
struct Args {
    /// Number of qubits
    #[arg(short, long, default_value_t = 3)]
    n: u32,

    /// Tolerance under which reals are merged
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Print decimals instead of recognized fractions
    #[arg(long)]
    plain: bool,

    /// Extra amplitude to canonicalize, as real and imaginary part (e.g. `0.5 -i`)
    #[arg(long, num_args = 2, value_names = ["RE", "IM"], allow_hyphen_values = true)]
    extra: Option<Vec<String>>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Args::parse();
    let dim = 1usize << args.n;

    let mut config = Config::default();
    if let Some(eps) = args.tolerance {
        config = config.with_tolerance(Tolerance::new(eps)?);
    }
    let mut cn = ComplexNumbers::new(config);
    println!("cn = {:?}", cn);

    // Direct evaluation.
    let norm = (dim as f64).sqrt().recip();
    let direct: Vec<Complex> = (0..dim)
        .map(|k| {
            let phase = Complex64::from_polar(norm, 2.0 * PI * k as f64 / dim as f64);
            cn.lookup_value(phase)
        })
        .collect();
    for &c in &direct {
        cn.inc_ref(c);
    }

    // Repeated multiplication by the root of unity.
    let root = cn.lookup_value(Complex64::from_polar(1.0, 2.0 * PI / dim as f64));
    let acc = cn.get_cached_value(Complex64::new(norm, 0.0));
    let tmp = cn.get_cached();
    let mut matches = 0;
    for (k, &expected) in direct.iter().enumerate() {
        let c = cn.lookup(acc);
        if c == expected {
            matches += 1;
        } else {
            info!("amplitude {} drifted: {} vs {}", k, cn.formatted(c), cn.formatted(expected));
        }
        cn.mul(tmp, acc, root);
        cn.set_val(acc, tmp);
    }
    cn.return_to_cache(acc);
    cn.return_to_cache(tmp);

    println!();
    for (k, &c) in direct.iter().enumerate() {
        let text = cn.to_string(c, !args.plain, None);
        println!("|{:0width$b}⟩  {:<20}  {}", k, text, c, width = args.n as usize);
    }
    println!();
    println!("Identical handles: {}/{}", matches, dim);

    if let Some(extra) = &args.extra {
        let value = parse_complex(&extra[0], &extra[1])?;
        let c = cn.lookup_value(value);
        println!("Extra: {} = {} (conjugate {})", c, cn.formatted(c), cn.formatted(c.conj()));
    }

    for &c in &direct {
        cn.dec_ref(c);
    }
    let collected = cn.garbage_collect(true);
    info!("Collected {} entries", collected);
    println!("{}", cn.stats());

    Ok(())
}
