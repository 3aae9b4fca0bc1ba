use std::process::Command;
use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands};
use webnotes_agent::client::ApiClient;
use webnotes_agent::credentials::CredentialStore;
use webnotes_agent::logging::{self, LogTarget};
use webnotes_agent::worker::SyncWorker;
use webnotes_agent::{Result, launchd};

mod cli;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let target = match &args.command {
        Commands::Run {
            log_dir: Some(dir), ..
        } => LogTarget::Directory(dir.clone()),
        _ => LogTarget::Stdout,
    };
    let logger = match logging::init(&target) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        log::error!("{}", e);
        logger.flush();
        std::process::exit(1);
    }
}

fn open_in_browser(url: &str) {
    println!("Open this URL in a browser where you are logged in to Webnotes:\n{url}");
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    if let Err(e) = Command::new(opener).arg(url).spawn() {
        log::debug!("could not launch {opener}: {e}");
    }
}

async fn run(args: Cli) -> Result<()> {
    let credentials = match &args.credentials {
        Some(path) => CredentialStore::new(path),
        None => CredentialStore::default_location()?,
    };
    let client = ApiClient::new(&args.api_url)?;

    match args.command {
        Commands::Authorize { no_browser } => {
            webnotes_agent::authorize(&client, &credentials, |url| {
                if no_browser {
                    println!("Open this URL in a browser where you are logged in to Webnotes:\n{url}");
                } else {
                    open_in_browser(url);
                }
            })
            .await?;
            println!("Authorization complete.");
        }
        Commands::Run {
            source,
            interval_secs,
            ..
        } => {
            let worker = SyncWorker::new(client, credentials.require()?, source.build()?);
            worker.run(Duration::from_secs(interval_secs.max(1))).await?;
        }
        Commands::Sync { source } => {
            let worker = SyncWorker::new(client, credentials.require()?, source.build()?);
            match worker.sync_once().await? {
                Some(report) => println!(
                    "{} notes synced ({} new, {} updated)",
                    report.inserted + report.updated,
                    report.inserted,
                    report.updated
                ),
                None => println!("no notes to sync"),
            }
        }
        Commands::Install {
            source,
            interval_secs,
        } => {
            credentials.require()?;
            let mut run_args = vec![
                "--api-url".to_string(),
                args.api_url.clone(),
                "--credentials".to_string(),
                credentials.path().display().to_string(),
                "run".to_string(),
                "--interval-secs".to_string(),
                interval_secs.to_string(),
                "--log-dir".to_string(),
                logging::default_log_dir().display().to_string(),
            ];
            run_args.extend(source.to_args()?);
            let path = launchd::install(&run_args)?;
            println!("Launch agent installed at {}", path.display());
        }
        Commands::Logout => {
            if credentials.clear()? {
                println!("Session token removed.");
            } else {
                println!("No session token stored.");
            }
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
