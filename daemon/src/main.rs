//! PerkPass daemon: runs the node and provides admin commands for
//! provisioning, issuing codes and auditing redemptions.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use perkpass_node::{init_logging, NodeConfig, PerkPassNode};
use perkpass_store::{MembershipStore, RedemptionStore};
use perkpass_store_lmdb::LmdbEnvironment;
use perkpass_types::{
    Benefit, BenefitId, BusinessId, Member, MemberId, MembershipType, RedemptionId, Timestamp,
};

#[derive(Parser)]
#[command(name = "perkpass-daemon", about = "PerkPass membership redemption daemon")]
struct Cli {
    /// Data directory holding the LMDB environment.
    #[arg(long, env = "PERKPASS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable or disable the HTTP API.
    #[arg(long, env = "PERKPASS_ENABLE_RPC")]
    rpc: Option<bool>,

    /// HTTP API port.
    #[arg(long, env = "PERKPASS_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "PERKPASS_ENABLE_METRICS")]
    metrics: bool,

    /// Duplicate window in seconds.
    #[arg(long, env = "PERKPASS_DUPLICATE_WINDOW_SECS")]
    duplicate_window_secs: Option<u64>,

    /// Confirmation timeout in seconds.
    #[arg(long, env = "PERKPASS_CONFIRMATION_TIMEOUT_SECS")]
    confirmation_timeout_secs: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "PERKPASS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "PERKPASS_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "PERKPASS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Provision members.
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
    /// Provision benefits.
    Benefit {
        #[command(subcommand)]
        action: BenefitAction,
    },
    /// Issue and inspect membership codes.
    Code {
        #[command(subcommand)]
        action: CodeAction,
    },
    /// Audit redemption history.
    Redemptions {
        #[command(subcommand)]
        action: RedemptionAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT or SIGTERM.
    Run,
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(clap::Subcommand)]
enum MemberAction {
    /// Create or replace a member; expiry follows the membership type.
    Add {
        /// Member id; a random one is generated when omitted.
        #[arg(long)]
        id: Option<MemberId>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// "tourist" or "resident".
        #[arg(long = "type", default_value = "tourist")]
        membership_type: MembershipType,
    },
    /// Print a member as JSON.
    Show { id: MemberId },
}

#[derive(clap::Subcommand)]
enum BenefitAction {
    /// Create or replace a benefit.
    Add {
        #[arg(long)]
        business: BusinessId,
        #[arg(long)]
        id: BenefitId,
        #[arg(long)]
        description: String,
        #[arg(long, default_value_t = 0)]
        discount: u8,
        #[arg(long, default_value_t = 1)]
        usage_limit: u32,
        /// Unix seconds; open-ended when omitted.
        #[arg(long)]
        valid_from: Option<u64>,
        /// Unix seconds; open-ended when omitted.
        #[arg(long)]
        valid_to: Option<u64>,
        /// Store the benefit switched off.
        #[arg(long)]
        inactive: bool,
    },
}

#[derive(clap::Subcommand)]
enum CodeAction {
    /// Issue a fresh code for a member.
    Issue {
        #[arg(long)]
        member: MemberId,
    },
    /// Decode a code without touching any store.
    Inspect { code: String },
}

#[derive(clap::Subcommand)]
enum RedemptionAction {
    /// List redemptions for a business or a member, newest first.
    List {
        #[arg(long, conflicts_with = "member", required_unless_present = "member")]
        business: Option<BusinessId>,
        #[arg(long)]
        member: Option<MemberId>,
        /// Unix seconds; only redemptions at or after this instant.
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
    /// Void a redemption so it no longer blocks the duplicate window.
    Void { id: RedemptionId },
}

fn resolve_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(rpc) = cli.rpc {
        config.enable_rpc = rpc;
    }
    if let Some(port) = cli.rpc_port {
        config.rpc_port = port;
    }
    config.enable_metrics |= cli.metrics;
    if let Some(window) = cli.duplicate_window_secs {
        config.params.duplicate_window_secs = window;
    }
    if let Some(timeout) = cli.confirmation_timeout_secs {
        config.params.confirmation_timeout_secs = timeout;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_env(config: &NodeConfig) -> anyhow::Result<LmdbEnvironment> {
    LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run => {
                init_logging(config.log_format()?, &config.log_level)?;
                tracing::info!(
                    "Starting PerkPass node (RPC:{}, metrics:{})",
                    if config.enable_rpc {
                        config.rpc_port.to_string()
                    } else {
                        "off".into()
                    },
                    config.enable_metrics,
                );
                let mut node = PerkPassNode::new(config)?;
                node.start().await?;
                node.stop().await?;
            }
            NodeAction::Config => print!("{}", config.to_toml_string()?),
        },

        Command::Member { action } => {
            perkpass_utils::init_tracing("warn");
            let env = open_env(&config)?;
            match action {
                MemberAction::Add {
                    id,
                    email,
                    name,
                    membership_type,
                } => {
                    let member = Member::provision(
                        id.unwrap_or_else(MemberId::random),
                        email,
                        name,
                        membership_type,
                        Timestamp::now(),
                    );
                    env.membership_store().put_member(&member)?;
                    print_json(&member)?;
                }
                MemberAction::Show { id } => match env.membership_store().get_member(&id)? {
                    Some(member) => print_json(&member)?,
                    None => anyhow::bail!("member {id} not found"),
                },
            }
        }

        Command::Benefit { action } => {
            perkpass_utils::init_tracing("warn");
            let env = open_env(&config)?;
            match action {
                BenefitAction::Add {
                    business,
                    id,
                    description,
                    discount,
                    usage_limit,
                    valid_from,
                    valid_to,
                    inactive,
                } => {
                    anyhow::ensure!(discount <= 100, "discount must be 0-100, got {discount}");
                    let benefit = Benefit {
                        id,
                        business_id: business,
                        description,
                        discount_percent: discount,
                        usage_limit,
                        valid_from: valid_from.map(Timestamp::new),
                        valid_to: valid_to.map(Timestamp::new),
                        active: !inactive,
                    };
                    env.benefit_store().put_benefit(&benefit)?;
                    print_json(&benefit)?;
                }
            }
        }

        Command::Code { action } => match action {
            CodeAction::Issue { member } => {
                let token = perkpass_codec::issue(
                    member,
                    Timestamp::now().as_millis(),
                    &mut rand::thread_rng(),
                );
                println!("{}", perkpass_codec::encode(&token));
            }
            CodeAction::Inspect { code } => {
                let token = perkpass_codec::decode(&code)?;
                print_json(&token)?;
            }
        },

        Command::Redemptions { action } => {
            perkpass_utils::init_tracing("warn");
            let env = open_env(&config)?;
            let store = env.redemption_store();
            match action {
                RedemptionAction::List {
                    business,
                    member,
                    since,
                } => {
                    let since = Timestamp::new(since);
                    let records = match (business, member) {
                        (Some(business), _) => {
                            store.list_redemptions_by_business(&business, since)?
                        }
                        (None, Some(member)) => store
                            .list_by_member(&member)?
                            .into_iter()
                            .filter(|r| r.used_at >= since)
                            .collect(),
                        (None, None) => anyhow::bail!("pass --business or --member"),
                    };
                    print_json(&records)?;
                }
                RedemptionAction::Void { id } => {
                    let voided = store.void_redemption(id)?;
                    tracing::info!(redemption = %voided.id, "redemption voided");
                    print_json(&voided)?;
                }
            }
        }
    }

    Ok(())
}
