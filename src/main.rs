use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use quorum_client::{
    build_multisig_call, decode_extrinsic, decode_signing_payload, other_signatories,
    sign_extrinsic, submit_extrinsic, ExtrinsicBuilder, HttpTransport, SigningConfig,
};
use quorum_codec::{names, CallCodec, OpaqueCall, Schema, Value};
use quorum_crypto::{derive_multisig_account, KeyScheme, LocalSigner, PrivateKey, Signer};
use quorum_log::{info, LogFormat};
use quorum_types::{
    decode_address, sort_addresses, AccountId32, Config, Era, MultiAddress, Timepoint, H256,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "quorum",
    about = "Offline construction, signing and tracking of multisig extrinsics",
    version,
    author
)]
struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Derive a multisig address from its signatories and threshold")]
    Derive {
        #[arg(long, short, value_name = "M", help = "Approvals required")]
        threshold: u16,

        #[arg(long, value_name = "N", help = "SS58 format of the printed addresses")]
        format: Option<u16>,

        #[arg(long, value_name = "ADDRESS", help = "Also print other_signatories for this signer")]
        signer: Option<String>,

        #[arg(required = true, value_name = "ADDRESS", help = "Signatory addresses")]
        signatories: Vec<String>,
    },

    #[command(about = "Encode a balance transfer and print its call data and hash")]
    Call {
        #[command(flatten)]
        transfer: TransferArgs,
    },

    #[command(about = "Decode hex bytes to JSON")]
    Decode {
        #[command(subcommand)]
        command: DecodeCommands,
    },

    #[command(about = "Print the blake2_256 hash of signed extrinsic bytes")]
    TxHash {
        #[arg(value_name = "HEX", help = "Signed extrinsic bytes")]
        extrinsic: String,
    },

    #[command(about = "Build and sign an as_multi transfer offline")]
    Sign(SignArgs),

    #[command(about = "Submit a signed extrinsic to the configured node")]
    Submit {
        #[arg(value_name = "HEX", help = "Signed extrinsic bytes")]
        extrinsic: String,

        #[arg(long, value_name = "URL", help = "Node JSON-RPC endpoint")]
        node_url: Option<String>,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    #[command(about = "Display version information")]
    Version,
}

#[derive(Subcommand)]
enum DecodeCommands {
    #[command(about = "Decode a signed or unsigned extrinsic")]
    Extrinsic {
        #[arg(value_name = "HEX")]
        input: String,
    },

    #[command(about = "Decode call data")]
    Call {
        #[arg(value_name = "HEX")]
        input: String,
    },

    #[command(about = "Decode an unhashed signing payload")]
    Payload {
        #[arg(value_name = "HEX")]
        input: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Validate configuration")]
    Validate {
        #[arg(value_name = "FILE", help = "Configuration file path")]
        file: PathBuf,
    },

    #[command(about = "Set a configuration value and save the file")]
    Set {
        #[arg(value_name = "KEY", help = "Dotted key, e.g. chain.ss58_format")]
        key: String,

        #[arg(value_name = "VALUE")]
        value: String,
    },
}

#[derive(clap::Args)]
struct TransferArgs {
    #[arg(long, value_name = "ADDRESS", help = "Recipient")]
    dest: String,

    #[arg(long, value_name = "PLANCK", help = "Amount in the smallest unit")]
    amount: u128,

    #[arg(long, help = "Use transfer_keep_alive")]
    keep_alive: bool,
}

#[derive(clap::Args)]
struct SignArgs {
    #[arg(long, default_value = "ed25519", help = "Key scheme (ed25519, ecdsa)")]
    scheme: String,

    #[arg(long, value_name = "HEX", help = "32-byte secret seed")]
    seed: String,

    #[arg(long, short, value_name = "M")]
    threshold: u16,

    #[arg(
        long,
        required = true,
        value_delimiter = ',',
        value_name = "ADDRESS",
        help = "All signatories, the signer included"
    )]
    signatories: Vec<String>,

    #[command(flatten)]
    transfer: TransferArgs,

    #[arg(long, value_name = "HEIGHT-INDEX", help = "Timepoint of the pending call; omit to initiate")]
    timepoint: Option<Timepoint>,

    #[arg(long)]
    nonce: u64,

    #[arg(long, default_value_t = 0)]
    tip: u128,

    #[arg(long)]
    spec_version: u32,

    #[arg(long)]
    tx_version: u32,

    #[arg(long, value_name = "HASH")]
    genesis_hash: String,

    #[arg(long, value_name = "HASH", help = "Block the mortal era is anchored at")]
    block_hash: Option<String>,

    #[arg(long, value_name = "NUMBER", help = "Number of the anchor block")]
    block_number: Option<u64>,

    #[arg(long, help = "Sign with an immortal era")]
    immortal: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Derive {
            threshold,
            format,
            signer,
            signatories,
        } => derive_command(&config, threshold, format, signer, &signatories),
        Commands::Call { transfer } => call_command(&config, &transfer),
        Commands::Decode { command } => decode_command(&config, command),
        Commands::TxHash { extrinsic } => {
            println!("{}", H256::hash_of(&parse_hex(&extrinsic)?));
            Ok(())
        }
        Commands::Sign(args) => sign_command(&config, &args),
        Commands::Submit {
            extrinsic,
            node_url,
        } => submit_command(config, &extrinsic, node_url).await,
        Commands::Config { command } => config_command(config, cli.config, command),
        Commands::Version => version_command(),
    }
}

fn version_command() -> Result<()> {
    println!("quorum {}", env!("CARGO_PKG_VERSION"));
    println!("build: {}", env!("CARGO_PKG_NAME"));
    Ok(())
}

#[derive(Serialize)]
struct DeriveOutput {
    address: String,
    threshold: u16,
    signatories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    other_signatories: Option<Vec<String>>,
}

fn derive_command(
    config: &Config,
    threshold: u16,
    format: Option<u16>,
    signer: Option<String>,
    signatories: &[String],
) -> Result<()> {
    let format = format.unwrap_or(config.chain.ss58_format);
    let accounts = parse_accounts(signatories)?;
    let account = derive_multisig_account(&accounts, threshold)?;

    let others = match signer {
        Some(signer) => {
            let (acting, _) = decode_address(&signer)?;
            let mut sorted = accounts.clone();
            sorted.sort();
            let others = other_signatories(&sorted, &acting)?;
            Some(others.iter().map(|a| a.to_ss58(format)).collect::<Vec<_>>())
        }
        None => None,
    };

    let output = DeriveOutput {
        address: account.to_ss58(format),
        threshold,
        signatories: sort_addresses(signatories, format)?,
        other_signatories: others,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn call_command(config: &Config, transfer: &TransferArgs) -> Result<()> {
    let schema = load_schema(config)?;
    let codec = CallCodec::new(&schema);
    let call = transfer_call(transfer)?;
    let call_data = codec.encode(&call)?;

    println!("call_data: 0x{}", hex::encode(&call_data));
    println!("call_hash: {}", H256::hash_of(&call_data));
    Ok(())
}

#[derive(Serialize)]
struct ExtrinsicView<'a> {
    signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheme: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    era: Option<Era>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tip: Option<u128>,
    call: &'a OpaqueCall,
    tx_hash: H256,
}

fn decode_command(config: &Config, command: DecodeCommands) -> Result<()> {
    let schema = load_schema(config)?;
    let json = match command {
        DecodeCommands::Extrinsic { input } => {
            let bytes = parse_hex(&input)?;
            let decoded = decode_extrinsic(&bytes, &schema)?;
            let section = decoded.signature.as_ref();
            let view = ExtrinsicView {
                signed: section.is_some(),
                signer: section.map(|s| match &s.signer {
                    MultiAddress::Id(id) => id.to_ss58(config.chain.ss58_format),
                    other => format!("{other:?}"),
                }),
                scheme: section.map(|s| s.signature.scheme().name()),
                signature: section.map(|s| format!("0x{}", hex::encode(s.signature.as_bytes()))),
                era: section.map(|s| s.era),
                nonce: section.map(|s| s.nonce),
                tip: section.map(|s| s.tip),
                call: &decoded.call,
                tx_hash: H256::hash_of(&bytes),
            };
            serde_json::to_string_pretty(&view)?
        }
        DecodeCommands::Call { input } => {
            let call = CallCodec::new(&schema).decode(&parse_hex(&input)?)?;
            serde_json::to_string_pretty(&call)?
        }
        DecodeCommands::Payload { input } => {
            let payload = decode_signing_payload(&parse_hex(&input)?, &schema)?;
            serde_json::to_string_pretty(&payload)?
        }
    };
    println!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct SignOutput {
    signer: String,
    multisig: String,
    call_hash: H256,
    tx_hash: H256,
    extrinsic: String,
}

fn sign_command(config: &Config, args: &SignArgs) -> Result<()> {
    let schema = load_schema(config)?;
    let codec = CallCodec::new(&schema);
    let scheme: KeyScheme = args.scheme.parse()?;
    let signer = LocalSigner::new(PrivateKey::from_hex(scheme, &args.seed)?);
    let format = config.chain.ss58_format;

    let mut signatories = parse_accounts(&args.signatories)?;
    let multisig = derive_multisig_account(&signatories, args.threshold)?;
    signatories.sort();
    let others = other_signatories(&signatories, &signer.account_id())?;

    let inner = transfer_call(&args.transfer)?;
    let call_hash = codec.call_hash(&inner)?;
    let wrapped = build_multisig_call(
        &codec,
        args.threshold,
        &others,
        args.timepoint,
        inner,
        config.multisig.store_call,
        config.multisig.max_weight,
    )?;

    let era = if args.immortal {
        Era::Immortal
    } else {
        let block_number = args
            .block_number
            .ok_or_else(|| anyhow!("--block-number is required for a mortal era"))?;
        Era::mortal(config.chain.era_period, block_number)
    };

    let mut builder = ExtrinsicBuilder::new(&schema)
        .address(signer.address(format))
        .call(wrapped)
        .nonce(args.nonce)
        .era(era)
        .tip(args.tip)
        .spec_version(args.spec_version)
        .transaction_version(args.tx_version)
        .genesis_hash(H256::from_hex(&args.genesis_hash)?);
    if let Some(block_hash) = &args.block_hash {
        builder = builder.block_hash(H256::from_hex(block_hash)?);
    }
    let unsigned = builder.build()?;

    let signed = sign_extrinsic(
        &unsigned,
        &signer,
        &SigningConfig::from_chain_config(&config.chain),
    )?;
    info!("signed as_multi for {} as {}", call_hash, signer.address(format));

    let output = SignOutput {
        signer: signer.address(format),
        multisig: multisig.to_ss58(format),
        call_hash,
        tx_hash: signed.tx_hash,
        extrinsic: signed.to_hex(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn submit_command(mut config: Config, extrinsic: &str, node_url: Option<String>) -> Result<()> {
    if let Some(node_url) = node_url {
        config.client.node_url = node_url;
    }
    let bytes = parse_hex(extrinsic)?;
    let transport = HttpTransport::new(&config.client)?;
    info!("submitting to {}", config.client.node_url);
    let hash = submit_extrinsic(&transport, &bytes).await?;
    println!("{hash}");
    Ok(())
}

fn config_command(mut config: Config, path: Option<PathBuf>, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Validate { file } => {
            Config::load_from_file(&file)
                .with_context(|| format!("invalid configuration {}", file.display()))?;
            info!("Configuration is valid");
            println!("ok");
        }
        ConfigCommands::Set { key, value } => {
            config.set(&key, &value)?;
            let path = path.unwrap_or_else(Config::default_config_file);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            config.save_to_file(&path)?;
            info!("set {} = {} in {}", key, value, path.display());
        }
    }
    Ok(())
}

// Helper functions

fn setup_logging(log_level: Option<&str>) -> Result<()> {
    let level = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
    };
    quorum_log::init_tracing_with_level(&level, LogFormat::Text).map_err(|e| anyhow!(e))
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) if path.exists() => Config::load_from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        Some(_) => Ok(Config::default()),
        None => Ok(Config::load_or_default()?),
    }
}

fn load_schema(config: &Config) -> Result<Schema> {
    match &config.chain.schema_path {
        Some(path) => Schema::load_from_file(path)
            .with_context(|| format!("failed to load call schema {}", path.display())),
        None => Ok(Schema::polkadot()),
    }
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() {
        bail!("empty hex input");
    }
    hex::decode(digits).with_context(|| format!("invalid hex input {trimmed}"))
}

fn parse_accounts(addresses: &[String]) -> Result<Vec<AccountId32>> {
    addresses
        .iter()
        .map(|address| Ok(decode_address(address)?.0))
        .collect()
}

fn transfer_call(args: &TransferArgs) -> Result<OpaqueCall> {
    let (dest, _) = decode_address(&args.dest)?;
    let method = if args.keep_alive {
        names::TRANSFER_KEEP_ALIVE
    } else {
        names::TRANSFER
    };
    Ok(OpaqueCall::new(
        names::BALANCES,
        method,
        vec![Value::from(MultiAddress::Id(dest)), Value::UInt(args.amount)],
    ))
}
