mod app;
mod capture;
mod clock;
mod config;
mod error;
mod extract;
mod install;
mod model;
mod pipeline;
mod present;
mod record_store;
mod review;
mod stats;
mod storage;

use app::Session;
use capture::CaptureSource;
use clap::{Args, Parser, Subcommand};
use clock::{Clock, SystemClock};
use config::Config;
use error::AppError;
use install::{InstallPrompt, InstallSignal, TerminalInstallHost};
use pipeline::Pipeline;
use review::{Decision, Field, ReviewForm};
use std::path::PathBuf;
use std::sync::Arc;
use storage::SqliteStorage;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "invoiceflow", version, about = "Capture invoices, confirm the fields, keep a local ledger")]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture an invoice image, review the extracted fields and save it
    Scan(ScanArgs),
    /// Show the most recent invoices
    List {
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,
    },
    /// Show the usage counters
    Stats,
    /// Offer to install the app
    Install,
    /// Remove every stored invoice
    Clear,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Image file(s); only the first one is processed
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Where the image came from
    #[arg(long, value_enum, default_value = "file-picker")]
    source: CaptureSource,

    #[arg(long)]
    vendor: Option<String>,
    #[arg(long)]
    invoice_number: Option<String>,
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    date: Option<String>,

    /// Save without the interactive review
    #[arg(long, short = 'y')]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let storage = SqliteStorage::open(&cfg.db_path)?;
    let mut session = match Session::open(&storage, Arc::clone(&clock), &cfg) {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, db_path = %cfg.db_path, "Failed to load stored state");
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Scan(args) => scan(args, &cfg, clock, &mut session).await?,
        Command::List { limit } => {
            let limit = limit.unwrap_or(cfg.display.recent_limit);
            println!("{}", present::render_recent(session.store().recent(limit), limit));
        }
        Command::Stats => println!("{}", present::render_stats(&session.counters())),
        Command::Install => {
            if cfg.install.installed {
                println!("InvoiceFlow is already installed.");
                return Ok(());
            }
            let mut prompt = InstallPrompt::new(cfg.install.prompt_delay());
            prompt.capture(InstallSignal);
            let host = TerminalInstallHost::new(&cli.config);
            let outcome = prompt.offer(&host).await?;
            if prompt.is_deferred() {
                println!("Maybe later: run `invoiceflow install` again to install.");
            }
            info!(outcome = ?outcome, "Install offer finished");
        }
        Command::Clear => {
            if session.store().is_empty() {
                println!("Nothing to clear.");
                return Ok(());
            }
            let dropped = session.store().len();
            session.clear()?;
            println!("Removed {dropped} invoice(s).");
        }
    }

    Ok(())
}

async fn scan(
    args: ScanArgs,
    cfg: &Config,
    clock: Arc<dyn Clock>,
    session: &mut Session<&SqliteStorage>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = capture::select_first(args.files) else {
        return Ok(());
    };
    let image = capture::read_payload(&path, args.source).await?;

    let mut pipeline = Pipeline::new(extract::provider_from_config(&cfg.extraction, clock));
    let loading = pipeline.loading();
    let job = pipeline.submit(image);
    if *loading.borrow() {
        println!("Processing invoice...");
    }
    let fields = tokio::select! {
        outcome = job.outcome() => outcome?,
        _ = tokio::signal::ctrl_c() => {
            pipeline.cancel();
            println!("Cancelled.");
            return Ok(());
        }
    };

    let mut form = ReviewForm::from_extracted(&fields);
    let overrides = [
        (Field::Vendor, args.vendor),
        (Field::InvoiceNumber, args.invoice_number),
        (Field::Amount, args.amount),
        (Field::Date, args.date),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            form.edit(field, value);
        }
    }

    let (form, decision) = if args.yes {
        (form, Decision::Save)
    } else {
        tokio::task::spawn_blocking(move || {
            let mut form = form;
            let decision = form.prompt_until_valid(std::io::stdin().lock(), std::io::stdout())?;
            Ok::<_, std::io::Error>((form, decision))
        })
        .await??
    };

    if decision == Decision::Cancel {
        form.cancel();
        println!("Discarded.");
        return Ok(());
    }

    let record = match session.confirm(&form) {
        Ok(record) => record,
        Err(AppError::Review(e)) => {
            error!(error = %e, "Invoice not saved, draft rejected");
            eprintln!("Invoice not saved: {e}");
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Invoice not saved");
            return Err(e.into());
        }
    };
    info!(id = record.id, vendor = %record.vendor, amount = record.amount, "Saved");

    for toast in session.toasts() {
        println!("{toast}");
    }
    println!("{}", present::render_stats(&session.counters()));
    let limit = cfg.display.recent_limit;
    println!("{}", present::render_recent(session.store().recent(limit), limit));
    Ok(())
}
