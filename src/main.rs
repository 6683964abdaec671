//! scalewatch CLI
//!
//! Usage:
//!   scalewatch                               # Interactive: type readings, watch them settle
//!   scalewatch --serve                       # HTTP gateway the scale publishes to
//!   scalewatch --config scalewatch.toml      # Load settings from file
//!   scalewatch --threshold-ms 500 --json     # Override settings, JSON events

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use scalewatch::config::{ScaleConfig, TimerPolicy};
use scalewatch::core::{run_server, Broker, ScaleSession, WeightObserver};
use scalewatch::types::{ReadingOutcome, ScalePhase, SessionStatus, WeightEvent};
use scalewatch::{DecodeError, VERSION};

/// Give the dispatcher a moment to apply a typed reading before re-prompting.
/// Best effort: under load the prompt may still show the previous phase.
const ECHO_DELAY: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
#[command(
    name = "scalewatch",
    version = VERSION,
    about = "Listen to a scale and report the settled weight",
    long_about = "scalewatch subscribes to the weight readings a scale publishes and\n\
                  reports the final weight once consecutive readings have matched\n\
                  (within a tolerance) for long enough.\n\n\
                  Modes:\n  \
                  (default)  Interactive - type readings ({\"weight\": 5.0} or 5.0)\n  \
                  --serve    HTTP gateway - the scale POSTs to /publish/<channel>\n\n\
                  Phases:\n  \
                  WAITING    - No reading yet\n  \
                  UNSETTLED  - Weight still moving\n  \
                  SETTLING   - Readings match, stability timer running\n  \
                  FINALIZED  - Final weight reported"
)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tolerance epsilon in weight units
    #[arg(long)]
    tolerance: Option<f64>,

    /// Stability threshold in milliseconds
    #[arg(long)]
    threshold_ms: Option<u64>,

    /// Channel the scale publishes on
    #[arg(long)]
    channel: Option<String>,

    /// Gateway host (default: this machine's IPv4 address)
    #[arg(long)]
    host: Option<String>,

    /// Gateway port
    #[arg(long)]
    port: Option<u16>,

    /// Restart the stability timer on every match (legacy behavior)
    #[arg(long)]
    legacy_timer: bool,

    /// Run as HTTP gateway
    #[arg(short, long)]
    serve: bool,

    /// Output events as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    scalewatch::logging::init(args.log_json);

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = if args.serve {
        run_serve(&config, &args).await
    } else {
        run_interactive(&config, &args).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// File (or defaults), then command-line overrides
fn load_config(args: &Args) -> Result<ScaleConfig, scalewatch::ConfigError> {
    let mut config = match &args.config {
        Some(path) => ScaleConfig::from_file(path)?,
        None => ScaleConfig::default(),
    };

    if let Some(tolerance) = args.tolerance {
        config.stabilizer.tolerance_epsilon = tolerance;
    }
    if let Some(threshold_ms) = args.threshold_ms {
        config.stabilizer.stability_threshold_ms = threshold_ms;
    }
    if args.legacy_timer {
        config.stabilizer.timer_policy = TimerPolicy::RestartOnMatch;
    }
    if let Some(channel) = &args.channel {
        config.transport.channel = channel.clone();
    }
    if let Some(host) = &args.host {
        config.transport.host = Some(host.clone());
    }
    if let Some(port) = args.port {
        config.transport.port = port;
    }

    config.validate()?;
    Ok(config)
}

/// Prints callbacks to the terminal: one line per engine decision, or the
/// raw events under `--json`
struct TerminalObserver {
    json: bool,
    no_color: bool,
}

impl TerminalObserver {
    fn paint(&self, color: &'static str) -> (&'static str, &'static str) {
        if self.no_color {
            ("", "")
        } else {
            (color, ScalePhase::color_reset())
        }
    }

    fn render_outcome(&self, outcome: &ReadingOutcome) -> String {
        if self.no_color {
            outcome.to_parseable_string()
        } else {
            outcome.to_terminal_string()
        }
    }
}

impl WeightObserver for TerminalObserver {
    fn on_weight_received(&self, weight: f64) {
        if self.json {
            print_json(&WeightEvent::observed(weight));
        }
    }

    fn on_final_weight_received(&self, weight: f64) {
        if self.json {
            print_json(&WeightEvent::finalized(weight));
        }
    }

    fn on_decode_error(&self, error: &DecodeError) {
        if self.json {
            return;
        }
        let (color, reset) = self.paint("\x1b[33m");
        println!("{}  ⚠ payload dropped: {}{}", color, error, reset);
    }

    fn on_outcome(&self, outcome: &ReadingOutcome) {
        if self.json {
            return;
        }
        println!("  {}", self.render_outcome(outcome));
        if outcome.finalized {
            let (color, reset) = self.paint(ScalePhase::Finalized.color_code());
            println!("{}  ✓ FINAL WEIGHT {:.3}{}", color, outcome.weight, reset);
        }
    }
}

fn print_json(event: &WeightEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode event: {}", e),
    }
}

/// Run interactive mode: each stdin line is published as one payload
async fn run_interactive(config: &ScaleConfig, args: &Args) -> scalewatch::Result<()> {
    let broker = Arc::new(Broker::new());
    let observer = Arc::new(TerminalObserver {
        json: args.json,
        no_color: args.no_color,
    });
    let mut session = ScaleSession::new(broker.clone(), config, observer);
    session.start()?;

    if !args.json {
        print_header("Interactive", args.no_color);
        println!("Type a reading and press Enter: {{\"weight\": 5.0}} or just 5.0");
        println!("Commands: 'status', 'restart', 'quit'");
        println!(
            "Goal: readings within ±{} for {:.1}s",
            config.stabilizer.tolerance_epsilon,
            config.stabilizer.stability_threshold().as_secs_f64()
        );
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !args.json {
            print!("{}", format_prompt(session.phase(), args.no_color));
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.to_ascii_lowercase().as_str() {
            "quit" | "exit" => break,
            "restart" => {
                session.start()?;
                if !args.json {
                    println!("New measurement started.");
                }
                continue;
            }
            "status" => {
                print_status(&session.status(), args.json);
                continue;
            }
            _ => {}
        }

        let delivered = broker.publish(session.channel(), to_payload(line))?;
        if delivered == 0 && !args.json {
            println!("Not listening. Type 'restart' to measure again.");
        }
        tokio::time::sleep(ECHO_DELAY).await;
    }

    let status = session.status();
    session.stop();
    broker.close();
    if !args.json {
        println!("\nSession ended. Readings: {}", status.readings);
    }
    Ok(())
}

/// Bare numbers are shorthand for a weight record
fn to_payload(line: &str) -> Vec<u8> {
    match line.parse::<f64>() {
        Ok(weight) => serde_json::json!({ "weight": weight }).to_string().into_bytes(),
        Err(_) => line.as_bytes().to_vec(),
    }
}

/// Run HTTP gateway
async fn run_serve(config: &ScaleConfig, args: &Args) -> scalewatch::Result<()> {
    let observer: Arc<dyn WeightObserver> = Arc::new(TerminalObserver {
        json: args.json,
        no_color: args.no_color,
    });
    if !args.json {
        print_header("Gateway", args.no_color);
    }
    run_server(config, Some(observer)).await
}

/// Print header
fn print_header(mode: &str, no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  scalewatch v{} - {}", VERSION, mode);
        println!("========================================");
    } else {
        println!("\x1b[1m╔════════════════════════════════════════╗\x1b[0m");
        println!("\x1b[1m║  scalewatch v{} - {:<22}║\x1b[0m", VERSION, mode);
        println!("\x1b[1m╚════════════════════════════════════════╝\x1b[0m");
    }
    println!();
}

fn format_prompt(phase: ScalePhase, no_color: bool) -> String {
    if no_color {
        format!("[{}] > ", phase)
    } else {
        format!(
            "{}{} [{}]{} > ",
            phase.color_code(),
            phase.emoji(),
            phase,
            ScalePhase::color_reset()
        )
    }
}

fn print_status(status: &SessionStatus, json: bool) {
    if json {
        match serde_json::to_string(status) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to encode status: {}", e),
        }
        return;
    }
    let fmt_weight = |w: Option<f64>| w.map(|w| format!("{:.3}", w)).unwrap_or_else(|| "-".into());
    println!(
        "phase={} | last={} | final={} | readings={} | stable={:.1}s",
        status.phase,
        fmt_weight(status.last_weight),
        fmt_weight(status.final_weight),
        status.readings,
        status.stable_ms as f64 / 1000.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalewatch::types::ReasonCode;

    #[test]
    fn test_bare_number_becomes_record() {
        let payload = to_payload("5.25");
        let reading = scalewatch::core::decode_payload(&payload).unwrap();
        assert_eq!(reading.map(|r| r.weight), Some(5.25));
    }

    #[test]
    fn test_record_passes_through() {
        assert_eq!(to_payload(r#"{"weight": 1}"#), br#"{"weight": 1}"#.to_vec());
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "scalewatch",
            "--tolerance",
            "0.2",
            "--threshold-ms",
            "750",
            "--channel",
            "lab/scale",
            "--legacy-timer",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.stabilizer.tolerance_epsilon, 0.2);
        assert_eq!(config.stabilizer.stability_threshold_ms, 750);
        assert_eq!(config.stabilizer.timer_policy, TimerPolicy::RestartOnMatch);
        assert_eq!(config.transport.channel, "lab/scale");
    }

    #[test]
    fn test_outcome_line_follows_color_setting() {
        let outcome = ReadingOutcome::new(5.0, ScalePhase::Settling, 1500, ReasonCode::W003_TIMER_RUNNING);
        let plain = TerminalObserver { json: false, no_color: true };
        let colored = TerminalObserver { json: false, no_color: false };

        assert_eq!(
            plain.render_outcome(&outcome),
            "weight=5.000 | phase=SETTLING | stable=1.5s | reason=W003_TIMER_RUNNING"
        );
        let line = colored.render_outcome(&outcome);
        assert!(line.starts_with(ScalePhase::Settling.color_code()));
        assert!(line.contains("W003_TIMER_RUNNING"));
        assert!(line.ends_with(ScalePhase::color_reset()));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["scalewatch", "--tolerance=-1"]);
        assert!(load_config(&args).is_err());
    }
}
