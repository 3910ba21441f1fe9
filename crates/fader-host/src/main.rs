//! Fader host binary
//!
//! Runs the gain effect against a live audio output with an interactive
//! console, or offline over a WAV file:
//!
//! ```text
//! fader-host [--device <name>] [--gain <value>]
//! fader-host render <input.wav> <output.wav> [--gain <value>]
//! fader-host --list-devices
//! ```

mod config;
mod surface;

use std::path::Path;

use anyhow::{bail, Context, Result};

use fader_core::audio::{self, DeviceId};
use fader_core::processor::{FaderProcessor, GAIN_PARAM};
use fader_core::render::render_wav_file;

use surface::Surface;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    if args.iter().any(|a| a == "--list-devices") {
        return list_devices();
    }
    match args.first().map(String::as_str) {
        Some("render") => run_render(&args[1..]),
        _ => run_live(&args),
    }
}

fn run_live(args: &[String]) -> Result<()> {
    let config_path = config::default_config_path();
    let mut host_config = config::load_config(&config_path);
    if !config_path.exists() {
        if let Err(e) = config::save_config(&host_config, &config_path) {
            log::warn!("Could not write default config: {:#}", e);
        }
    }

    // CLI overrides apply for this run only and are not persisted
    if let Some(name) = flag_value(args, "--device") {
        host_config.audio = host_config.audio.clone().with_device(DeviceId::new(name));
    }

    let processor = FaderProcessor::new().context("Failed to initialize effect")?;
    let store = processor.store();
    if let Some(raw) = flag_value(args, "--gain") {
        let requested: f32 = raw
            .parse()
            .with_context(|| format!("Invalid gain '{}'", raw))?;
        if let Some(committed) = store.set(GAIN_PARAM, requested) {
            log::info!("Startup gain: {}", committed);
        }
    }

    println!("╔════════════════════════════════════╗");
    println!("║            Fader Host              ║");
    println!("╚════════════════════════════════════╝");

    let output = audio::start_live_output(processor, &host_config.audio)
        .context("Failed to start audio output")?;
    println!(
        "Playing on {} ({} ch, {}Hz, ~{:.1}ms latency)",
        output.device_name, output.channels, output.sample_rate, output.latency_ms
    );

    let preset_dir = host_config.presets.directory.clone();
    let mut surface = Surface::new(store, output, preset_dir);
    surface.run()?;
    println!("Fader host stopped.");
    Ok(())
}

fn run_render(args: &[String]) -> Result<()> {
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--gain" {
            i += 2;
            continue;
        }
        if arg.starts_with("--") {
            bail!("Unknown flag '{}'", arg);
        }
        positional.push(arg.as_str());
        i += 1;
    }
    if positional.len() != 2 {
        print_usage();
        bail!("render needs exactly one input and one output file");
    }
    let input = Path::new(positional[0]);
    let output = Path::new(positional[1]);

    let mut processor = FaderProcessor::new().context("Failed to initialize effect")?;
    if let Some(raw) = flag_value(args, "--gain") {
        let requested: f32 = raw
            .parse()
            .with_context(|| format!("Invalid gain '{}'", raw))?;
        if let Some(committed) = processor.store().set(GAIN_PARAM, requested) {
            log::info!("Render gain: {}", committed);
        }
    }

    let stats = render_wav_file(&mut processor, input, output)
        .with_context(|| format!("Failed to render {}", input.display()))?;
    println!(
        "Rendered {} -> {} ({} frames, {} channels, {}Hz, peak {:.3} -> {:.3})",
        input.display(),
        output.display(),
        stats.frames,
        stats.channels,
        stats.sample_rate,
        stats.peak_in,
        stats.peak_out
    );
    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = audio::get_output_devices().context("Failed to enumerate audio devices")?;
    println!("Audio output devices:");
    for device in &devices {
        let default = if device.is_default { " [default]" } else { "" };
        println!("  {}{}", device, default);
        println!(
            "    {} channels max, rates: {:?}",
            device.max_channels, device.sample_rates
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn print_usage() {
    println!("Usage:");
    println!("  fader-host [--device <name>] [--gain <value>]");
    println!("  fader-host render <input.wav> <output.wav> [--gain <value>]");
    println!("  fader-host --list-devices");
    println!();
    println!("Environment:");
    println!("  RUST_LOG   log filter (default 'info')");
}
