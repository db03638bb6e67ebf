use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hydrovigil::config::Config;
use hydrovigil::detect::SensorMatrix;
use hydrovigil::faults::{FaultLogger, FaultSignature, Outcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hydrovigil",
    about = "Sensor anomaly scoring and fault deduplication for water monitoring",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the fault database path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create the fault database and schema
    InitDb,

    /// Score a JSON sensor window (`[[f1, f2, ...], ...]` or `{"sensor_data": ...}`)
    Score {
        /// Input file
        #[arg(long)]
        input: PathBuf,

        /// Resolve a fault for this sensor when the decision is not NORMAL
        #[arg(long)]
        sensor: Option<String>,
    },

    /// Match a fault signature against the log, logging it if new
    Resolve {
        #[command(flatten)]
        fault: FaultArgs,
    },

    /// Record a fault with a known remediation
    Seed {
        #[command(flatten)]
        fault: FaultArgs,

        /// Remediation text
        #[arg(long)]
        solution: String,

        /// Free-form remarks
        #[arg(long, default_value = "")]
        remarks: String,
    },

    /// Inspect the fault log
    Faults {
        #[command(subcommand)]
        action: FaultsAction,
    },
}

#[derive(clap::Args)]
struct FaultArgs {
    /// Fault type label
    #[arg(long)]
    fault_type: String,

    /// Mean reconstruction error
    #[arg(long, allow_negative_numbers = true)]
    mean_error: f64,

    /// Max reconstruction error
    #[arg(long, allow_negative_numbers = true)]
    max_error: f64,

    /// Affected sensor id
    #[arg(long)]
    sensor: String,

    /// Severity label
    #[arg(long, default_value = "High")]
    severity: String,
}

impl FaultArgs {
    fn signature(&self) -> FaultSignature {
        FaultSignature {
            fault_type: self.fault_type.clone(),
            mean_error: self.mean_error,
            max_error: self.max_error,
            affected_sensor: self.sensor.clone(),
            severity: self.severity.clone(),
        }
    }
}

#[derive(Subcommand)]
enum FaultsAction {
    /// List the most recent faults
    List {
        /// Maximum rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // Logs go to stderr so command output on stdout stays machine-readable
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn logger(config: &Config) -> Result<FaultLogger> {
    let pool = hydrovigil::storage::open_pool(&config.storage.db_path)?;
    Ok(FaultLogger::with_defaults(pool, config.faults.defaults()))
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Known {
            fault_type,
            severity,
            solution,
        } => {
            println!("Known fault found");
            println!("Type:     {}", fault_type);
            println!("Severity: {}", severity);
            println!("Solution: {}", solution);
        }
        Outcome::Logged { fault_id } => {
            println!("New fault logged (fault_id {})", fault_id);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.db_path = db;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting HydroVigil");
            hydrovigil::serve(&config).await?;
        }
        Commands::InitDb => {
            hydrovigil::storage::open_pool(&config.storage.db_path)?;
            println!("Fault database initialized at {}", config.storage.db_path);
        }
        Commands::Score { input, sensor } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", input.display()))?;
            let data = value.get("sensor_data").unwrap_or(&value);
            let raw = SensorMatrix::from_json(data)?;

            let bundle = hydrovigil::load_model(&config)?;
            let analyzer = hydrovigil::pipeline::Analyzer::new(std::sync::Arc::new(bundle));

            let output = match sensor {
                Some(sensor) => {
                    let faults = logger(&config)?;
                    let (analysis, outcome) = analyzer.analyze_and_resolve(&raw, &sensor, &faults)?;
                    let mut v = serde_json::to_value(&analysis.result)?;
                    if let Some(outcome) = outcome {
                        v["fault"] = serde_json::to_value(&outcome)?;
                    }
                    v
                }
                None => serde_json::to_value(&analyzer.analyze(&raw)?.result)?,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Resolve { fault } => {
            let outcome = logger(&config)?.resolve_fault(&fault.signature())?;
            print_outcome(&outcome);
        }
        Commands::Seed {
            fault,
            solution,
            remarks,
        } => {
            let fault_id = logger(&config)?.record_fault(&fault.signature(), &solution, &remarks)?;
            println!("Fault recorded (fault_id {})", fault_id);
        }
        Commands::Faults { action } => match action {
            FaultsAction::List { limit } => {
                let limit = limit.unwrap_or(config.faults.list_limit);
                let faults = logger(&config)?.list_recent(limit)?;
                if faults.is_empty() {
                    println!("No faults recorded.");
                } else {
                    println!(
                        "{:<6} | {:<20} | {:<8} | {:<10} | {:<10} | {:<19} | Solution",
                        "ID", "Type", "Sensor", "Mean err", "Max err", "Detected"
                    );
                    println!(
                        "{:-<6}-|-{:-<20}-|-{:-<8}-|-{:-<10}-|-{:-<10}-|-{:-<19}-|-{:-<20}",
                        "", "", "", "", "", "", ""
                    );
                    for f in faults {
                        println!(
                            "{:<6} | {:<20} | {:<8} | {:<10.4} | {:<10.4} | {:<19} | {}",
                            f.fault_id,
                            f.fault_type,
                            f.affected_sensor,
                            f.mean_error,
                            f.max_error,
                            f.detected_at,
                            f.solution
                        );
                    }
                }
            }
        },
    }

    Ok(())
}
