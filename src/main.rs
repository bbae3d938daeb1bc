use anyhow::Result;
use clap::Parser;
use knob::commands::CommandContext;
use knob::engine::{MasterClock, Sequencer};
use knob::repl::Repl;
use knob::session::{LiveSession, SessionConfig, DEFAULT_TEMPO};
use knob_core::types::{AnalyzerConfig, BinderConfig, TransportControl};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Script to load and watch
    script: Option<PathBuf>,

    /// Quiet period before edits are re-analysed
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,

    /// Tempo until the script sets one
    #[arg(long, default_value_t = DEFAULT_TEMPO)]
    tempo: f64,

    /// Run without the clock and sequencer
    #[arg(long)]
    no_playback: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SessionConfig {
        binder: BinderConfig::default().with_debounce(Duration::from_millis(cli.debounce_ms)),
        analyzer: AnalyzerConfig::default(),
        initial_tempo: cli.tempo,
    };

    let (ctx, notes) = if cli.no_playback {
        (CommandContext::new(LiveSession::new(config, None)), None)
    } else {
        let clock = Arc::new(MasterClock::new(cli.tempo));
        let transport: Arc<dyn TransportControl> = clock.clone();
        let session = LiveSession::new(config, Some(transport));
        let sequencer = Sequencer::spawn(session.graph().clone(), clock.subscribe());
        let notes = sequencer.subscribe();
        (CommandContext::with_playback(session, clock, sequencer), Some(notes))
    };

    let mut repl = Repl::new(ctx, notes)?;
    if let Some(script) = &cli.script {
        let report = repl.open_script(script)?;
        log::info!(
            "loaded {}: {} patterns, {} bindings",
            script.display(),
            report.patterns,
            report.bindings
        );
    }
    repl.run()
}
