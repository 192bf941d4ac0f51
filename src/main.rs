use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, bail};
use clap::Parser;
use log::{LevelFilter, Metadata, Record};
use plasmips::mips::{BufferedConsole, Machine, MachineConfig, Snapshot, assemble_with};

#[derive(Parser)]
#[command(author, version, about = "Assemble and run a MIPS program", long_about = None)]
struct Args {
    /// Assembly source file.
    source: Option<PathBuf>,

    /// Maximum number of clock pulses.
    #[arg(short, long, default_value_t = 1_000_000)]
    clocks: usize,

    /// Text page (multiples of 0x80000) to load the program at.
    #[arg(short, long, default_value_t = 0)]
    page: u32,

    /// Machine configuration as JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume from a snapshot instead of assembling.
    #[arg(long)]
    load_snapshot: Option<PathBuf>,

    /// Write a snapshot when the run ends.
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLog;

impl log::Log for StderrLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLog = StderrLog;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn boot(args: &Args) -> anyhow::Result<(Machine, BufferedConsole)> {
    let mut console = BufferedConsole::new();
    if let Some(path) = &args.load_snapshot {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let snap = Snapshot::from_json(&text).context("parsing snapshot")?;
        console.feed(snap.input());
        let machine = Machine::from_snapshot(snap).context("restoring snapshot")?;
        return Ok((machine, console));
    }

    let Some(path) = &args.source else {
        bail!("no source file given (or use --load-snapshot)");
    };
    let config = match &args.config {
        Some(cfg) => {
            let text = fs::read_to_string(cfg).with_context(|| format!("reading {}", cfg.display()))?;
            MachineConfig::from_json(&text).context("parsing machine config")?
        }
        None => MachineConfig::default(),
    };
    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut failed = 0;
    let prog = assemble_with(&source, |e| {
        eprintln!("{}:{e}", path.display());
        failed += 1;
    });
    if failed > 0 {
        bail!("{failed} assembly error(s)");
    }

    let mut machine = Machine::new(config);
    let entry = prog.load_in_machine(&mut machine, args.page).context("loading program")?;
    machine.set_pc(entry);
    Ok((machine, console))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let (mut machine, mut console) = boot(&args)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut budget = args.clocks;

    while budget > 0 {
        budget -= machine.run(&mut console, budget);
        stdout.write_all(console.take_output().as_bytes())?;
        stdout.flush()?;
        if !machine.is_paused() {
            break;
        }
        // blocked on a read syscall: hand it one line, or EOT at end of input
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            line.push('\u{4}');
        }
        console.feed(line.as_bytes());
        machine.resume();
    }

    log::info!(
        "halted after {} clocks: pc 0x{:08x}, error mode {}",
        args.clocks - budget,
        machine.pc(),
        machine.error_mode()
    );
    if !machine.is_stopped() && budget == 0 {
        log::warn!("clock budget of {} exhausted", args.clocks);
    }

    if let Some(path) = &args.save_snapshot {
        let json = machine
            .snapshot()
            .with_input(&console.stdin)
            .to_json()
            .context("serializing snapshot")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
