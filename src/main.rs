//! LC-3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `lc3-emu run <image>...` - Run object images until HALT
//! - `lc3-emu debug <image>...` - Interactive debugger
//! - `lc3-emu disasm <image>` - Disassemble an object image

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand};
use lc3::config::parse_address;
use lc3::io::terminal::{RawModeGuard, TerminalDisplay, TerminalKeyboard};
use lc3::{Cpu, CpuError, Image, MachineConfig};

/// Cycles between keyboard pumps, so Ctrl-C is seen even by programs
/// that never poll the keyboard.
const PUMP_INTERVAL: u64 = 4096;

/// Exit code after Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "lc3-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the LC-3 16-bit educational computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run object images until the program halts
    Run {
        /// Object files to load, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        machine: MachineArgs,
        /// Log every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Write registers and memory as JSON when the run ends
        #[arg(long)]
        dump_state: Option<PathBuf>,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Object files to load, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Disassemble an object image
    Disasm {
        /// Path to the object file
        image: PathBuf,
    },
}

#[derive(Args)]
struct MachineArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address of the first instruction (e.g. x3000)
    #[arg(long, value_parser = parse_address)]
    start_pc: Option<u16>,
    /// Jump through the trap vector table for I/O traps instead of servicing them on the host
    #[arg(long)]
    no_native_traps: bool,
    /// Maximum number of instructions to run
    #[arg(short, long)]
    max_cycles: Option<u64>,
}

impl MachineArgs {
    /// Combine the config file (if any) with command-line overrides.
    fn resolve(&self) -> MachineConfig {
        let mut config = match &self.config {
            Some(path) => match MachineConfig::load(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("failed to load config: {}", e);
                    exit(1);
                }
            },
            None => MachineConfig::default(),
        };

        if let Some(pc) = self.start_pc {
            config.start_pc = pc;
        }
        if self.no_native_traps {
            config.native_traps = false;
        }
        if self.max_cycles.is_some() {
            config.max_cycles = self.max_cycles;
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    let trace = matches!(cli.command, Some(Commands::Run { trace: true, .. }));
    init_logging(trace);

    match cli.command {
        Some(Commands::Run { images, machine, trace: _, dump_state }) => {
            run_program(&images, machine.resolve(), dump_state.as_deref());
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { images, machine }) => {
            debug_program(&images, machine.resolve());
        }
        Some(Commands::Disasm { image }) => {
            disassemble_file(&image);
        }
        None => {
            eprintln!("usage: lc3-emu run <image-file> [image-file ...]");
            eprintln!("Use --help for available commands");
            exit(2);
        }
    }
}

fn init_logging(trace: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if trace {
        builder.filter_module("lc3", log::LevelFilter::Trace);
    }
    // The terminal may be in raw mode while we log
    builder.format(|buf, record| {
        writeln!(buf, "[{} {}] {}\r", record.level(), record.target(), record.args())
    });
    builder.init();
}

fn load_images(paths: &[PathBuf]) -> Vec<Image> {
    paths
        .iter()
        .map(|path| match lc3::load_image(path) {
            Ok(image) => {
                log::debug!("{}: {} words at x{:04X}", path.display(), image.len(), image.origin);
                image
            }
            Err(e) => {
                eprintln!("failed to load image: {}: {}", path.display(), e);
                exit(1);
            }
        })
        .collect()
}

/// How a `run` ended.
enum Outcome {
    Halted,
    CycleLimit(u64),
    Interrupted,
    Failed(CpuError),
}

fn run_program(paths: &[PathBuf], config: MachineConfig, dump_state: Option<&Path>) {
    let images = load_images(paths);
    let max_cycles = config.max_cycles;

    let mut cpu = Cpu::with_config(config);
    for image in &images {
        if let Err(e) = cpu.load_image(image) {
            eprintln!("failed to load image: {}", e);
            exit(1);
        }
    }

    let keyboard = TerminalKeyboard::new();
    let watcher = keyboard.clone();
    let interrupt = keyboard.interrupt_handle();
    cpu.attach_keyboard(keyboard);
    cpu.attach_display(TerminalDisplay::new());

    let outcome = {
        let _raw = match RawModeGuard::enable() {
            Ok(guard) => Some(guard),
            Err(e) => {
                log::warn!("could not enable raw terminal mode: {}", e);
                None
            }
        };
        execute(&mut cpu, max_cycles, &watcher, &interrupt)
    };

    if let Some(path) = dump_state {
        let written = cpu
            .snapshot()
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("failed to write state to {}: {}", path.display(), e);
            exit(1);
        }
    }

    match outcome {
        Outcome::Halted => {}
        Outcome::CycleLimit(limit) => {
            eprintln!();
            eprintln!("Reached max cycles limit ({}). Use --max-cycles to increase.", limit);
        }
        Outcome::Interrupted => {
            eprintln!();
            exit(EXIT_INTERRUPTED);
        }
        Outcome::Failed(e) => {
            eprintln!("CPU error at PC=x{:04X}: {}", cpu.regs.pc, e);
            exit(1);
        }
    }
}

fn execute(
    cpu: &mut Cpu,
    max_cycles: Option<u64>,
    keyboard: &TerminalKeyboard,
    interrupt: &AtomicBool,
) -> Outcome {
    while cpu.is_running() {
        if cpu.cycles % PUMP_INTERVAL == 0 {
            keyboard.pump();
        }
        if interrupt.load(Ordering::SeqCst) {
            return Outcome::Interrupted;
        }
        if let Some(limit) = max_cycles {
            if cpu.cycles >= limit {
                log::warn!("stopping after {} cycles", limit);
                return Outcome::CycleLimit(limit);
            }
        }
        if let Err(e) = cpu.step() {
            return Outcome::Failed(e);
        }
    }

    Outcome::Halted
}

#[cfg(feature = "tui")]
fn debug_program(paths: &[PathBuf], config: MachineConfig) {
    let images = load_images(paths);

    if let Err(e) = lc3::run_debugger(images, config) {
        eprintln!("debugger error: {}", e);
        exit(1);
    }
}

fn disassemble_file(path: &Path) {
    let image = match lc3::load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("failed to load image: {}: {}", path.display(), e);
            exit(1);
        }
    };

    print!("{}", lc3::disassemble(&image));
}
