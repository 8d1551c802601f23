mod display;
mod reseed;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use noticewatch_core::config::{DEFAULT_ENDPOINT, DEFAULT_NOTICE_PAGE, FETCH_TIMEOUT};
use noticewatch_core::{
    Config, FetchConfig, MailConfig, Mode, Monitor, MonitorError, NoticeStore, StoreConfig,
};
use noticewatch_store::DuckStore;
use noticewatch_sync::{ErpClient, SmtpNotifier};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "noticewatch", version)]
#[command(about = "Watch a notice board and email new notices to a distribution list")]
struct Cli {
    /// Path of the DuckDB notice store
    #[arg(long, env = "NOTICEWATCH_DB", default_value = "notices.duckdb", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the notice board and email every new notice
    Run(RunArgs),
    /// Insert every currently listed notice that is missing, without emailing
    Reseed(FetchArgs),
    /// Show how many notices are tracked and the most recent ones
    Status {
        /// Number of recent notices to list
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Session cookie for the notice board
    #[arg(long, env = "ERP_COOKIE", hide_env_values = true)]
    cookie: String,

    /// jqGrid data endpoint
    #[arg(long, env = "ERP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Notice page, sent as referer and linked from emails
    #[arg(long, env = "ERP_NOTICE_PAGE", default_value = DEFAULT_NOTICE_PAGE)]
    notice_page: String,

    /// Notices requested per poll
    #[arg(long, env = "ERP_PAGE_SIZE", default_value_t = 100)]
    rows: u32,
}

impl FetchArgs {
    fn config(&self) -> FetchConfig {
        FetchConfig {
            endpoint: self.endpoint.clone(),
            notice_page: self.notice_page.clone(),
            cookie: self.cookie.clone(),
            page_size: self.rows,
            timeout: FETCH_TIMEOUT,
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    fetch: FetchArgs,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    smtp_host: String,

    /// SMTP relay port (STARTTLS)
    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    smtp_port: u16,

    /// SMTP login, also used as the sender address
    #[arg(long, env = "EMAIL_USER")]
    email_user: String,

    /// SMTP password
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true)]
    email_pass: String,

    /// Distribution list that receives notice emails
    #[arg(long, env = "GOOGLE_GROUP_EMAIL")]
    recipient: String,

    /// Seconds between polls
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 300)]
    interval: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl RunArgs {
    fn config(&self, db: PathBuf) -> Config {
        let fetch = self.fetch.config();
        Config {
            mail: MailConfig {
                host: self.smtp_host.clone(),
                port: self.smtp_port,
                username: self.email_user.clone(),
                password: self.email_pass.clone(),
                recipient: self.recipient.clone(),
                notice_page: fetch.notice_page.clone(),
            },
            fetch,
            store: StoreConfig { path: db },
            poll_interval: Duration::from_secs(self.interval),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("noticewatch v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run(args) => {
            let config = args.config(cli.db);
            run(&config, args.once).await
        }
        Command::Reseed(args) => {
            let store = DuckStore::open_persistent(&cli.db).context("opening notice store")?;
            let client = ErpClient::new(&args.config())?;
            let stats = reseed::run_reseed(&store, &client).await?;
            eprintln!("  Notices in store before: {}", stats.before);
            eprintln!("  Fetched {} rows, processed {} notices", stats.fetched, stats.processed);
            eprintln!("  Inserted {} missing notices", stats.inserted);
            eprintln!("  Notices in store now: {}", stats.after);
            if let Some((lo, hi)) = stats.id_range {
                eprintln!("  Notice ID range: {lo} to {hi}");
            }
            Ok(())
        }
        Command::Status { limit } => {
            let store = DuckStore::open_persistent(&cli.db).context("opening notice store")?;
            store.initialize()?;
            display::print_status(store.count()?, &store.recent(limit)?);
            Ok(())
        }
    }
}

/// The monitoring loop. Ctrl-C ends the wait between cycles; a cycle that
/// has started always runs to completion.
async fn run(config: &Config, once: bool) -> anyhow::Result<()> {
    let store = DuckStore::from_config(&config.store).context("opening notice store")?;
    let fetcher = ErpClient::new(&config.fetch).context("building notice board client")?;
    let notifier = SmtpNotifier::new(&config.mail).context("configuring SMTP notifier")?;
    let mut monitor =
        Monitor::start(store, fetcher, notifier).context("initialising notice store")?;

    info!(
        recipient = %config.mail.recipient,
        interval_secs = config.poll_interval.as_secs(),
        db = %config.store.path.display(),
        "monitoring started"
    );

    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    loop {
        let backfilling = monitor.mode() == Mode::Backfill;
        match monitor.run_cycle().await {
            Ok(_) => {}
            Err(e @ MonitorError::Backfill(_)) => {
                return Err(e).context("could not record the initial baseline");
            }
            Err(e @ MonitorError::Storage(_)) => {
                error!(error = %e, "notice store failed, stopping");
                return Err(e).context("notice store is no longer writable");
            }
        }

        if once || *stop_rx.borrow() {
            break;
        }
        // Check right away after the baseline is recorded.
        if backfilling && monitor.mode() == Mode::Incremental {
            continue;
        }

        info!(secs = config.poll_interval.as_secs(), "waiting for next check");
        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            Ok(()) = stop_rx.changed() => {}
        }
        if *stop_rx.borrow() {
            break;
        }
    }

    info!("monitoring stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_build_config() {
        let cli = Cli::try_parse_from([
            "noticewatch",
            "--db",
            "/tmp/n.duckdb",
            "run",
            "--cookie",
            "JSESSIONID=x",
            "--email-user",
            "bot@example.com",
            "--email-pass",
            "pw",
            "--recipient",
            "group@example.com",
            "--interval",
            "60",
            "--rows",
            "50",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.config(cli.db);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.fetch.page_size, 50);
        assert_eq!(config.fetch.cookie, "JSESSIONID=x");
        assert_eq!(config.mail.notice_page, DEFAULT_NOTICE_PAGE);
        assert_eq!(config.store.path, PathBuf::from("/tmp/n.duckdb"));
        assert!(!args.once);
    }

    #[test]
    fn status_limit_defaults_to_ten() {
        let cli = Cli::try_parse_from(["noticewatch", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status { limit: 10 }));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
