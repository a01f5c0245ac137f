use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use webhook_manager::health::check_all_webhooks;
use webhook_manager::state::{AppState, NotifySettings};
use webhook_manager::webhook::WebhookClient;
use webhook_manager::{db, routes};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Database URL (SQLite or PostgreSQL)
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:webhooks.db?mode=rwc")]
    database_url: String,

    /// Display name used for disable announcements
    #[arg(long, env = "NOTIFIER_NAME", default_value = "Webhook Manager")]
    notifier_name: String,

    /// Contact shown in disable announcements (e.g. a Discord handle)
    #[arg(long, env = "SUPPORT_CONTACT")]
    support_contact: Option<String>,

    /// Run one webhook health sweep and exit
    #[arg(long)]
    check_once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let db = match db::init_db(&args.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Database initialization failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let webhooks = match WebhookClient::new() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.check_once {
        return match check_all_webhooks(&db, &webhooks).await {
            Ok(report) => {
                println!(
                    "Checked {} webhooks: {} ok, {} missing, {} error",
                    report.checked, report.ok, report.missing, report.error
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("Health sweep failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let notify = NotifySettings {
        username: args.notifier_name,
        contact: args.support_contact,
    };
    let state = AppState::new(db, webhooks, notify);

    let confirmations = state.confirmations.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            confirmations.cleanup();
        }
    });

    let app = routes::router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Webhook manager listening on http://{addr}");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
