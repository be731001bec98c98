//! `integrity`: command-line front end for the file integrity registry.
//!
//! Every command first resumes the persisted session (if any), so `login` once and the
//! following commands run authenticated until `logout` or until the token expires.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use file_integrity_registry::domain::workflow::Verdict;
use file_integrity_registry::{
    hash_bytes, ClientConfig, ClientError, ControllerState, FileTokenStore, FileUpload,
    HttpLedgerApi, SessionController, TokenStore,
};

#[derive(Parser)]
#[command(name = "integrity", version, about = "Anchor and verify file fingerprints on the ledger", long_about = None)]
struct Cli {
    /// Ledger service base URL. Overrides LEDGER_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account. Does not log in.
    Signup { email: String, password: String },
    /// Log in and persist the session token.
    Login { email: String, password: String },
    /// Forget the persisted session.
    Logout,
    /// Show the current account and credit balance.
    Whoami,
    /// Register a file's fingerprint (costs one credit).
    Register {
        file: PathBuf,
        /// Free-form note stored alongside the fingerprint.
        #[arg(short, long, default_value = "")]
        metadata: String,
    },
    /// Check a file against the ledger.
    Verify { file: PathBuf },
    /// List previously registered files.
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    let api = Arc::new(HttpLedgerApi::new(&config)?);
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_path.clone()));
    let controller = SessionController::new(api, tokens);

    let state = controller.start().await;
    controller.wait_for_background().await;

    match cli.command {
        Commands::Signup { email, password } => {
            controller.sign_up(&email, &password).await?;
            println!("Account created for {}. Run `integrity login` to sign in.", email);
        }
        Commands::Login { email, password } => {
            let snap = controller.login(&email, &password).await?;
            println!("Logged in as {}", snap.email);
            print_credits(snap.credits);
        }
        Commands::Logout => {
            controller.logout().await;
            println!("Logged out.");
        }
        Commands::Whoami => {
            require_session(state)?;
            let snap = controller.refresh().await?;
            println!("Email:   {}", snap.email);
            print_credits(snap.credits);
            println!("Files:   {}", snap.history.len());
            println!(
                "Can register: {}",
                if snap.can_register { "yes" } else { "no (top up credits)" }
            );
        }
        Commands::Register { file, metadata } => {
            require_session(state)?;
            let upload = FileUpload::from_path(&file)?;
            println!("Local SHA-256: {}", hash_bytes(&upload.bytes));
            let done = match controller.register_file(Some(upload), metadata).await {
                Ok(done) => done,
                Err(ClientError::InsufficientCredits) => {
                    bail!("No credits remaining. Please top up before registering.")
                }
                Err(e) => return Err(e.into()),
            };
            let receipt = &done.receipt;
            println!("=== REGISTRATION CONFIRMED ===");
            println!("File:         {}", receipt.filename);
            println!("SHA-256:      {}", receipt.file_hash);
            println!("Tx hash:      {}", receipt.tx_hash);
            println!("Block number: {}", receipt.block_number);
            print_credits(controller.credits().await);
            if let Some(e) = done.reconcile_error {
                eprintln!("warning: balance and history could not be reconciled ({})", e);
            }
        }
        Commands::Verify { file } => {
            require_session(state)?;
            let upload = FileUpload::from_path(&file)?;
            println!("Local SHA-256: {}", hash_bytes(&upload.bytes));
            let result = controller.verify_file(Some(upload)).await?;
            println!("=== VERIFICATION REPORT ===");
            println!("File:     {}", result.filename);
            println!("SHA-256:  {}", result.file_hash);
            match &result.verdict {
                Verdict::NotFound => println!("Status:   NOT REGISTERED"),
                Verdict::Found { matches, record } => {
                    println!("Status:   REGISTERED");
                    if let Some(record) = record {
                        println!("Owner:    {}", record.owner);
                        println!("Time:     {}", record.timestamp_iso);
                        println!("Metadata: {}", record.metadata.as_deref().unwrap_or(""));
                    }
                    println!(
                        "Match:    {}",
                        if *matches { "YES" } else { "NO (POSSIBLE TAMPER)" }
                    );
                }
            }
        }
        Commands::History => {
            require_session(state)?;
            let records = controller.history().await;
            if records.is_empty() {
                println!("No files registered yet.");
            }
            for r in records {
                println!(
                    "{}  {}  {}  block={}  {}",
                    r.created_at.format("%Y-%m-%d %H:%M:%S"),
                    r.filename,
                    r.file_hash,
                    r.block_number.map(|b| b.to_string()).unwrap_or_else(|| "-".into()),
                    r.metadata.unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

fn require_session(state: ControllerState) -> Result<()> {
    if state != ControllerState::Authenticated {
        bail!("Not logged in. Run `integrity login <email> <password>` first.");
    }
    Ok(())
}

fn print_credits(credits: Option<u32>) {
    match credits {
        Some(n) => println!("Credits: {}", n),
        None => println!("Credits: unknown"),
    }
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        );
    let _ = subscriber.try_init();
}
