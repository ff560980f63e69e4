// Harmonist CLI: add a chord accompaniment to a MIDI melody.
//
// The pipeline: load config -> read melody -> detect key -> evolve -> write
// MIDI with the melody and the best chord track.
//
// Usage:
//   accompany <input.mid> [output.mid] [--config FILE] [--generations N]
//     [--population N] [--new-members PERCENT] [--rests] [--style 0-5]
//     [--seed N] [--key NAME]
//
// Styles: 0 piano, 1 guitar, 2 orchestra, 3 japanese, 4 xylophone, 5 choir.
// Log verbosity follows RUST_LOG (default `info`).

use anyhow::{Context, Result, anyhow, bail};
use harmonist_music::config::GeneratorConfig;
use harmonist_music::evolution::Evolution;
use harmonist_music::key::Key;
use harmonist_music::melody::Melody;
use harmonist_music::midi::{read_melody, write_midi};
use harmonist_music::style::Style;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 7] = [
    "--config",
    "--generations",
    "--population",
    "--new-members",
    "--style",
    "--seed",
    "--key",
];

/// Generations between progress lines.
const PROGRESS_EVERY: usize = 10;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    setup_tracing()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let positional = positional_args(&args);
    let input = positional
        .first()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: accompany <input.mid> [output.mid] [flags]"))?;

    let mut config = match parse_flag::<PathBuf>(&args, "--config")? {
        Some(path) => GeneratorConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(n) = parse_flag(&args, "--generations")? {
        config.evolution.generations = n;
    }
    if let Some(n) = parse_flag(&args, "--population")? {
        config.evolution.population_size = n;
    }
    if let Some(n) = parse_flag(&args, "--new-members")? {
        config.evolution.new_members_percentage = n;
    }
    if args.iter().any(|a| a == "--rests") {
        config.evolution.allow_rest_chords = true;
    }
    if let Some(style) = parse_flag::<Style>(&args, "--style")? {
        config.style = style;
    }
    if let Some(seed) = parse_flag(&args, "--seed")? {
        config.evolution.seed = Some(seed);
    }
    config.validate().context("invalid configuration")?;
    let key_override: Option<Key> = parse_flag(&args, "--key")?;

    let options = config.import_options();
    let track = read_melody(&input, &options)
        .with_context(|| format!("failed to read melody from {}", input.display()))?;
    let melody = match key_override {
        Some(key) => Melody::new(track.events, key),
        None => Melody::with_detected_key(track.events),
    }
    .with_context(|| format!("unusable melody in {}", input.display()))?;
    info!(
        input = %input.display(),
        key = %melody.key(),
        bars = melody.size_in_bars(),
        style = %config.style,
        "melody loaded"
    );

    let output = positional
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output(&input, melody.key()));

    let mut evolution = Evolution::new(&melody, config.evolution.clone(), config.weights.clone())
        .context("failed to set up the search")?;
    let best = evolution
        .run_with(|stats| {
            if stats.generation % PROGRESS_EVERY == 0 {
                info!(
                    generation = stats.generation,
                    best = stats.best,
                    mean = stats.mean,
                    "progress"
                );
            }
            ControlFlow::Continue(())
        })
        .context("search failed")?;

    write_midi(
        &output,
        &melody,
        &best.accompaniment,
        config.style,
        &options,
        track.tempo,
    )
    .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        output = %output.display(),
        fitness = best.fitness,
        seed = evolution.seed(),
        "accompaniment written"
    );
    println!("{}", best.accompaniment);
    Ok(())
}

fn setup_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!("failed to initialise tracing: {err}"))?;
    Ok(())
}

/// `output-<stem>-<key>.mid` in the working directory.
fn default_output(input: &Path, key: Key) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "melody".to_string());
    PathBuf::from(format!("output-{stem}-{key}.mid"))
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            positional.push(arg.as_str());
        }
    }
    positional
}

fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let Some(value) = args.get(i + 1) else {
        bail!("{flag} needs a value");
    };
    value
        .parse()
        .map(Some)
        .map_err(|err| anyhow!("invalid value '{value}' for {flag}: {err}"))
}
