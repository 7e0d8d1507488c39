//! mlm-dash: read-only view of the opBNB MLM contract
//!
//! Commands:
//! - dashboard: referral tree, level status and earnings of an address
//! - user: raw `users` record of an address
//! - referral: resolve the referrer behind a referral link
//! - chain: chain id reported by the rpc endpoint

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mlm_client::{
    extract_referral_code, Address, ClientConfig, ContractGateway, ContractHandle,
    ContractInterface, ReferralAggregator,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mlm-dash")]
#[command(about = "read-only referral dashboard for the opBNB MLM contract", long_about = None)]
struct Cli {
    /// toml config file (defaults to the opBNB testnet preset)
    #[arg(long, env = "MLM_CONFIG")]
    config: Option<PathBuf>,

    /// use the opBNB mainnet preset
    #[arg(long)]
    mainnet: bool,

    /// override the json-rpc endpoint
    #[arg(long, env = "MLM_RPC")]
    rpc: Option<String>,

    /// contract address, required unless the config file sets it
    #[arg(long, env = "MLM_CONTRACT")]
    contract: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the dashboard of an address
    Dashboard {
        address: String,
    },

    /// Show the contract record of an address
    User {
        address: String,
    },

    /// Resolve the referrer of a referral link
    Referral {
        url: String,
    },

    /// Print the chain id of the endpoint
    Chain,
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if cli.mainnet => ClientConfig::opbnb_mainnet(),
        None => ClientConfig::opbnb_testnet(),
    };
    if let Some(rpc) = &cli.rpc {
        config.rpc_endpoint = rpc.clone();
    }
    if let Some(contract) = &cli.contract {
        config.contract_address = contract.parse::<Address>().context("invalid --contract address")?;
    }
    config.validate()?;
    Ok(config)
}

async fn dashboard(config: &ClientConfig, handle: ContractHandle, address: Address) -> Result<()> {
    let aggregator = ReferralAggregator::new(
        handle,
        config.max_concurrent_lookups,
        config.referral_base_url.clone(),
    );
    let dashboard = aggregator.load(&address).await;
    if !dashboard.user.is_exist {
        warn!("{} is not a registered user", address);
    }

    println!("address:        {}", dashboard.address);
    println!("user id:        {}", dashboard.user.id);
    println!("referral link:  {}", dashboard.referral_link);
    println!("total earnings: {} BNB", dashboard.total_earnings);
    println!("direct:         {}", dashboard.direct.len());
    println!("indirect:       {}", dashboard.indirect_count());

    let levels: Vec<String> = dashboard
        .level_status
        .iter()
        .map(|s| format!("{}{}", s.level, if s.active { "+" } else { "-" }))
        .collect();
    println!("levels:         {}", levels.join(" "));
    let incomes: Vec<String> = dashboard
        .level_incomes
        .iter()
        .map(|i| format!("{}:{}", i.level, i.count))
        .collect();
    println!("level incomes:  {}", incomes.join(" "));

    for member in &dashboard.direct {
        println!("  {:>6}  {}  joined {}", member.id, member.address, member.joined_date());
    }
    println!();
    print!("{}", dashboard.tree.render());

    if let Some(partial) = dashboard.partial() {
        warn!("{}", partial);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlm_dash=info,mlm_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!("rpc endpoint: {}", config.rpc_endpoint);
    info!("contract: {}", config.contract_address);

    let interface = ContractInterface::from_config(&config).context("loading contract abi")?;
    let gateway = ContractGateway::new(&config, interface)?;
    let handle = gateway.read_only();

    match cli.command {
        Commands::Dashboard { address } => {
            let address: Address = address.parse().context("invalid address")?;
            dashboard(&config, handle.with_from(address), address).await?;
        }

        Commands::User { address } => {
            let address: Address = address.parse().context("invalid address")?;
            let user = handle.users(&address).await?;
            println!("registered:  {}", user.is_exist);
            println!("id:          {}", user.id);
            println!("referrer id: {}", user.referrer_id);
            println!("joined:      {}", user.joined);
        }

        Commands::Referral { url } => {
            let code = extract_referral_code(&url)
                .ok_or_else(|| anyhow!("no referral code in {url}"))?;
            let id = code.referrer_id()?;
            let referrer = handle.user_list(id).await?;
            if referrer.is_zero() {
                println!("referral code {code}: no registered referrer");
            } else {
                println!("referral code {code}: {referrer}");
            }
        }

        Commands::Chain => {
            let chain_id = handle.chain_id().await?;
            let permitted = config.chain.is_permitted(chain_id);
            println!("chain id: {chain_id} (permitted: {permitted})");
        }
    }

    Ok(())
}
