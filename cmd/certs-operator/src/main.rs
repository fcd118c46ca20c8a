use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pkg_constants::config::{GET_CA_CERTIFICATE_ACTION, TLS_CERTIFICATES_INTEGRATION};
use pkg_constants::paths::{DEFAULT_CONFIG, DEFAULT_DATA_DIR, DEFAULT_UNIT_NAME};
use pkg_constants::state::LEADER_LEASE_TTL_SECS;
use pkg_controllers::actions::get_ca_certificate;
use pkg_controllers::issuance::{HookContext, HookOutcome, IssuanceController};
use pkg_state::client::StateStore;
use pkg_state::leader::LeaderElection;
use pkg_state::relation::StoreRelations;
use pkg_state::secrets::StoreSecrets;
use pkg_state::status::StoreStatus;
use pkg_types::config::{OperatorConfigFile, load_config_file};

#[derive(Parser, Debug)]
#[command(
    name = "certs-operator",
    about = "Root certificate authority issuing certificates to related peers"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Name of this unit, used as the leader lease holder
    #[arg(long)]
    unit: Option<String>,

    /// Integration CSRs are read from
    #[arg(long)]
    integration: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one invocation of the issuance hook
    Hook {
        /// Name of the triggering event (informational)
        #[arg(default_value = "update-status")]
        name: String,
    },
    /// Run a named action
    Action { name: String },
    /// Re-run the issuance hook on a fixed interval
    Watch {
        /// Seconds between invocations; keep below the leader lease TTL
        #[arg(long, default_value_t = 10)]
        interval: u64,
    },
    /// Submit a CSR on a relation, as a requiring peer would
    Request {
        #[arg(long)]
        relation_id: String,
        /// Path to the PEM-encoded CSR
        #[arg(long)]
        csr: String,
    },
    /// Print the certificates published on a relation
    Certificate {
        #[arg(long)]
        relation_id: String,
    },
    /// Show the last status this unit reported
    Status,
}

/// Settings merged from CLI args, the config file and defaults.
struct Settings {
    data_dir: String,
    unit: String,
    integration: String,
    options: BTreeMap<String, String>,
}

impl Settings {
    fn resolve(cli: &Cli, file: OperatorConfigFile) -> Self {
        Self {
            data_dir: cli
                .data_dir
                .clone()
                .or(file.data_dir)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            unit: cli
                .unit
                .clone()
                .or(file.unit_name)
                .unwrap_or_else(|| DEFAULT_UNIT_NAME.to_string()),
            integration: cli
                .integration
                .clone()
                .or(file.integration)
                .unwrap_or_else(|| TLS_CERTIFICATES_INTEGRATION.to_string()),
            options: file.options,
        }
    }

    fn hook_context(&self, store: &StateStore) -> HookContext {
        HookContext {
            config: Arc::new(self.options.clone()),
            secrets: Arc::new(StoreSecrets::new(store.clone())),
            relations: Arc::new(StoreRelations::new(store.clone())),
            leadership: Arc::new(LeaderElection::new(store.clone(), self.unit.clone())),
            status: Arc::new(StoreStatus::new(store.clone(), self.unit.clone())),
            integration: self.integration.clone(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: OperatorConfigFile = load_config_file(&cli.config)?;
    let settings = Settings::resolve(&cli, file_cfg);
    info!("Config file: {}", cli.config);
    info!("  Data dir:    {}", settings.data_dir);
    info!("  Unit:        {}", settings.unit);
    info!("  Integration: {}", settings.integration);

    if let Commands::Watch { interval } = &cli.command {
        return watch(&settings, *interval).await;
    }

    let store = StateStore::new(&settings.data_dir).await?;
    let result = run(&cli.command, &settings, &store).await;
    store.close_after(result).await
}

/// Run the hook every `interval` seconds until interrupted.
///
/// SlateDB fences older writers when a newer client opens the same data dir,
/// so the store is opened and closed around each run rather than held open.
async fn watch(settings: &Settings, interval: u64) -> anyhow::Result<()> {
    if interval >= LEADER_LEASE_TTL_SECS {
        warn!(
            "Interval {}s is not below the {}s leader lease TTL; leadership may lapse between runs",
            interval, LEADER_LEASE_TTL_SECS
        );
    }
    info!("Watching (interval={}s)", interval);

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, stopping");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let store = match StateStore::new(&settings.data_dir).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Could not open state store: {:#}", e);
                continue;
            }
        };
        let result = run_hook(settings, &store, "update-status").await;
        if let Err(e) = store.close_after(result).await {
            warn!("Watch run failed: {:#}", e);
        }
    }
}

async fn run_hook(settings: &Settings, store: &StateStore, name: &str) -> anyhow::Result<()> {
    info!("Hook name: {}", name);
    let controller = IssuanceController::new(settings.hook_context(store));
    match controller.handle_hook().await {
        Ok(outcome) => {
            log_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            error!("Error handling hook {}: {:#}", name, e);
            Err(e)
        }
    }
}

async fn run(command: &Commands, settings: &Settings, store: &StateStore) -> anyhow::Result<()> {
    match command {
        Commands::Hook { name } => run_hook(settings, store, name).await,
        Commands::Action { name } => {
            info!("Action name: {}", name);
            if name != GET_CA_CERTIFICATE_ACTION {
                info!("Action not recognized, exiting");
                return Ok(());
            }
            let secrets = StoreSecrets::new(store.clone());
            let ca_certificate = get_ca_certificate(&secrets).await?;
            println!("{}", ca_certificate.trim_end());
            Ok(())
        }
        Commands::Watch { .. } => bail!("watch manages its own state store"),
        Commands::Request { relation_id, csr } => {
            let csr_pem = std::fs::read_to_string(csr)
                .with_context(|| format!("could not read CSR from {}", csr))?;
            StoreRelations::new(store.clone())
                .submit_request(relation_id, &settings.integration, &csr_pem)
                .await?;
            info!("Submitted CSR on relation {}", relation_id);
            Ok(())
        }
        Commands::Certificate { relation_id } => {
            let certificates = StoreRelations::new(store.clone())
                .published_certificates(relation_id)
                .await?;
            if certificates.is_empty() {
                warn!("No certificates published on relation {}", relation_id);
            }
            println!("{}", serde_json::to_string_pretty(&certificates)?);
            Ok(())
        }
        Commands::Status => {
            match StoreStatus::new(store.clone(), settings.unit.clone())
                .unit_status()
                .await?
            {
                Some(record) => println!(
                    "{}: {} {} (at {})",
                    record.unit, record.status.name, record.status.message, record.updated_at
                ),
                None => println!("{}: unknown", settings.unit),
            }
            Ok(())
        }
    }
}

fn log_outcome(outcome: &HookOutcome) {
    match outcome {
        HookOutcome::NotLeader => info!("Unit is not leader, nothing to do"),
        HookOutcome::InvalidConfig(reason) => warn!("Blocked on invalid config: {}", reason),
        HookOutcome::Active(report) => {
            for failed in report.failed() {
                warn!(
                    "Request on {} ({}) not issued: {:?}",
                    failed.relation_id, failed.common_name, failed.status
                );
            }
            info!(
                "Status set to active ({} issued, {} failed)",
                report.issued().count(),
                report.failed().count()
            );
        }
    }
}
