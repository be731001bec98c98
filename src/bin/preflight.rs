use std::sync::Arc;

use file_integrity_registry::domain::session::SessionStore;
use file_integrity_registry::{ClientConfig, FileTokenStore, HttpLedgerApi, LedgerApi, TokenStore};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--check-session]\n\
         \n\
         Reads env vars (all optional):\n\
           LEDGER_API_URL, REQUEST_TIMEOUT_SECS, TOKEN_PATH\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let check_session = args.iter().any(|a| a == "--check-session");

    let config = ClientConfig::from_env();
    println!("> Preflight:");
    println!("  LEDGER_API_URL={}", config.base_url);
    println!("  REQUEST_TIMEOUT_SECS={}", config.request_timeout.as_secs());
    println!("  TOKEN_PATH={}", config.token_path.display());

    let api = Arc::new(HttpLedgerApi::new(&config)?);

    // Basic connectivity
    api.health()
        .await
        .map_err(|e| anyhow::anyhow!("Ledger service not healthy at {}: {}", api.base_url(), e))?;
    println!("  Ledger service is reachable + healthy.");

    let tokens = Arc::new(FileTokenStore::new(config.token_path.clone()));
    match tokens.load() {
        Ok(Some(_)) => println!("  Persisted session token found."),
        Ok(None) => println!("  No persisted session token (login required)."),
        Err(e) => eprintln!("  Warning: persisted token unreadable: {}", e),
    }

    if check_session {
        let store = SessionStore::new(Arc::clone(&api), tokens as Arc<dyn TokenStore>);
        match store.restore().await {
            Some(session) => println!(
                "  Session valid for {} ({} credits).",
                session.email(),
                session.identity.credits
            ),
            None => {
                return Err(anyhow::anyhow!(
                    "Persisted session could not be restored. Run `integrity login` again."
                ))
            }
        }
    }

    println!("> Preflight OK.");
    Ok(())
}
