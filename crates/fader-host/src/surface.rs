//! Line-based control surface for the live host
//!
//! Reads commands from stdin and applies them to the running effect:
//! parameter writes go straight through the shared store's atomics,
//! source switches travel over the lock-free command queue, and presets
//! are the effect's encoded state written to disk.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use fader_core::audio::{HostCommand, LiveOutput, SourceKind};
use fader_core::param::ParamStore;
use fader_core::state::{self, Restore};

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Empty,
    Help,
    Quit,
    Status,
    Set { id: String, value: f32 },
    Get { id: String },
    Save { name: String },
    Load { name: String },
    Source(SourceKind),
    Invalid(String),
}

/// Parse one line of console input
pub fn parse_line(line: &str) -> SurfaceCommand {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = tokens.first() else {
        return SurfaceCommand::Empty;
    };

    match command {
        "help" | "?" => SurfaceCommand::Help,
        "quit" | "exit" => SurfaceCommand::Quit,
        "status" => SurfaceCommand::Status,
        "set" => match (tokens.get(1), tokens.get(2)) {
            (Some(id), Some(raw)) => match raw.parse::<f32>() {
                Ok(value) => SurfaceCommand::Set {
                    id: id.to_string(),
                    value,
                },
                Err(_) => SurfaceCommand::Invalid(format!("'{}' is not a number", raw)),
            },
            _ => SurfaceCommand::Invalid("Usage: set <param> <value>".to_string()),
        },
        "get" => match tokens.get(1) {
            Some(id) => SurfaceCommand::Get { id: id.to_string() },
            None => SurfaceCommand::Invalid("Usage: get <param>".to_string()),
        },
        "save" => match tokens.get(1) {
            Some(name) => SurfaceCommand::Save {
                name: name.to_string(),
            },
            None => SurfaceCommand::Invalid("Usage: save <name>".to_string()),
        },
        "load" => match tokens.get(1) {
            Some(name) => SurfaceCommand::Load {
                name: name.to_string(),
            },
            None => SurfaceCommand::Invalid("Usage: load <name>".to_string()),
        },
        "source" => match tokens.get(1) {
            Some(&"silence") => SurfaceCommand::Source(SourceKind::Silence),
            Some(&"noise") => SurfaceCommand::Source(SourceKind::Noise),
            Some(&"tone") => match tokens.get(2) {
                None => SurfaceCommand::Source(SourceKind::default()),
                Some(raw) => match raw.parse::<f32>() {
                    Ok(freq) if freq.is_finite() && freq > 0.0 => {
                        SurfaceCommand::Source(SourceKind::Tone { freq })
                    }
                    _ => SurfaceCommand::Invalid(format!("'{}' is not a frequency", raw)),
                },
            },
            _ => SurfaceCommand::Invalid("Usage: source tone [hz] | noise | silence".to_string()),
        },
        other => SurfaceCommand::Invalid(format!("Unknown command '{}' (try 'help')", other)),
    }
}

/// Write the store's state to `<dir>/<name>.json`
pub fn save_preset(store: &ParamStore, dir: &Path, name: &str) -> Result<PathBuf> {
    check_preset_name(name)?;
    let bytes = state::encode(store).context("Failed to encode parameter state")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create preset directory {}", dir.display()))?;
    let path = dir.join(format!("{}.json", name));
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write preset {}", path.display()))?;
    Ok(path)
}

/// Apply `<dir>/<name>.json` to the store
pub fn load_preset(store: &ParamStore, dir: &Path, name: &str) -> Result<Restore> {
    check_preset_name(name)?;
    let path = dir.join(format!("{}.json", name));
    let bytes = std::fs::read(&path)
        .with_context(|| format!("Failed to read preset {}", path.display()))?;
    Ok(state::decode(&bytes, store))
}

fn check_preset_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        bail!("Preset names must be plain file names");
    }
    Ok(())
}

/// The running console session
///
/// Owns the live output; dropping the surface stops the stream.
pub struct Surface {
    store: Arc<ParamStore>,
    output: LiveOutput,
    preset_dir: PathBuf,
}

impl Surface {
    pub fn new(store: Arc<ParamStore>, output: LiveOutput, preset_dir: PathBuf) -> Self {
        Self {
            store,
            output,
            preset_dir,
        }
    }

    /// Read commands until quit or end of input
    pub fn run(&mut self) -> Result<()> {
        println!("Type 'help' for commands.");
        self.prompt();
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.context("Failed to read from stdin")?;
            if !self.apply(parse_line(&line)) {
                return Ok(());
            }
            self.prompt();
        }
        Ok(())
    }

    fn prompt(&self) {
        print!("fader> ");
        io::stdout().flush().ok();
    }

    /// Apply one command; returns false when the session should end
    fn apply(&mut self, command: SurfaceCommand) -> bool {
        match command {
            SurfaceCommand::Empty => {}
            SurfaceCommand::Help => print_help(),
            SurfaceCommand::Quit => return false,
            SurfaceCommand::Status => self.print_status(),
            SurfaceCommand::Set { id, value } => match self.store.set(&id, value) {
                Some(committed) => println!("{} = {}", id, committed),
                None => println!("Unknown parameter '{}'", id),
            },
            SurfaceCommand::Get { id } => match self.store.get(&id) {
                Some(value) => println!("{} = {}", id, value),
                None => println!("Unknown parameter '{}'", id),
            },
            SurfaceCommand::Save { name } => {
                match save_preset(&self.store, &self.preset_dir, &name) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => eprintln!("Save failed: {:#}", e),
                }
            }
            SurfaceCommand::Load { name } => {
                match load_preset(&self.store, &self.preset_dir, &name) {
                    Ok(Restore::Applied(n)) => {
                        println!("Loaded preset '{}' ({} value(s) applied)", name, n)
                    }
                    Ok(Restore::Ignored) => {
                        println!("Preset '{}' was unreadable, values unchanged", name)
                    }
                    Err(e) => eprintln!("Load failed: {:#}", e),
                }
            }
            SurfaceCommand::Source(kind) => {
                match self.output.command_sender.send(HostCommand::SetSource(kind)) {
                    Ok(()) => match kind {
                        SourceKind::Silence => println!("Source: silence"),
                        SourceKind::Tone { freq } => println!("Source: {}Hz tone", freq),
                        SourceKind::Noise => println!("Source: noise"),
                    },
                    Err(_) => {
                        log::warn!("Command queue full, source unchanged");
                        println!("Audio thread busy, try again");
                    }
                }
            }
            SurfaceCommand::Invalid(message) => println!("{}", message),
        }
        true
    }

    fn print_status(&self) {
        println!(
            "Device: {} ({} ch, {}Hz, ~{:.1}ms)",
            self.output.device_name,
            self.output.channels,
            self.output.sample_rate,
            self.output.latency_ms
        );
        for spec in self.store.specs() {
            let value = self.store.get(&spec.id).unwrap_or(spec.default);
            println!(
                "  {:<8} {:>7.3}  [{} .. {}]",
                spec.id, value, spec.min, spec.max
            );
        }
        let (left, right) = self.output.peaks.load();
        println!("  peak     L {:.3}  R {:.3}", left, right);
        let violations = self.output.violations.load(Ordering::Relaxed);
        if violations > 0 {
            println!("  {} real-time contract violation(s) counted", violations);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  set <param> <value>   Set a parameter (clamped to its range)");
    println!("  get <param>           Show a parameter value");
    println!("  status                Show device, parameters, and peaks");
    println!("  save <name>           Save parameter state as a preset");
    println!("  load <name>           Load a saved preset");
    println!("  source tone [hz]      Switch the test source to a sine tone");
    println!("  source noise          Switch the test source to white noise");
    println!("  source silence        Mute the test source");
    println!("  quit                  Stop and exit");
}
