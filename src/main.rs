use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use detailbook::app;
use detailbook::config::AppConfig;
use detailbook::db;
use detailbook::services::admin_auth;
use detailbook::services::email::resend::ResendEmailProvider;
use detailbook::services::messaging::twilio::TwilioSmsProvider;
use detailbook::services::messaging::verify::TwilioVerifyProvider;
use detailbook::services::payments::stripe::StripeGateway;
use detailbook::state::{AppState, Providers};

#[derive(Debug, Parser)]
#[command(name = "detailbook", about = "Booking backend for a mobile detailing business")]
struct Cli {
    /// Create an admin for the configured brand and exit.
    #[arg(long, num_args = 2, value_names = ["EMAIL", "PASSWORD"])]
    create_admin: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let conn = db::init_db(&config.database_url)?;

    if let Some(args) = cli.create_admin {
        let [email, password] = args.as_slice() else {
            anyhow::bail!("--create-admin takes an email and a password");
        };
        let user_id = admin_auth::create_admin_user(&conn, &config.brand_id, email, password)?;
        tracing::info!(%user_id, %email, brand_id = %config.brand_id, "admin user created");
        return Ok(());
    }

    if config.resend_api_key.is_empty() {
        tracing::warn!("RESEND_API_KEY not set, email notifications will fail");
    }
    if config.twilio_account_sid.is_empty() {
        tracing::warn!("Twilio credentials not set, SMS and phone verification will fail");
    }

    let providers = Providers {
        messaging: Arc::new(TwilioSmsProvider::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_phone_number.clone(),
        )),
        email: Arc::new(ResendEmailProvider::new(config.resend_api_key.clone())),
        verifier: Arc::new(TwilioVerifyProvider::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_verify_service_sid.clone(),
        )),
        payments: Arc::new(StripeGateway::new(config.stripe_secret_key.clone())),
    };

    let port = config.port;
    let state = Arc::new(AppState::new(config, conn, providers));
    let router = app::build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
