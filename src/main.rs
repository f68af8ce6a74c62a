use std::sync::Arc;

use clap::Parser;
use poem::{Server, listener::TcpListener};

use rbac_backend::api::routes;
use rbac_backend::app_data::AppData;
use rbac_backend::cli::{Cli, Commands, seed};
use rbac_backend::config::{
    AppSettings, SystemEnvironment, init_database, init_logging, migrate_database,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_logging()?;

    let cli = Cli::parse();
    let settings = AppSettings::from_env()?;

    let db = init_database(&settings).await?;
    migrate_database(&db).await?;

    match cli.command() {
        Commands::Migrate => {
            tracing::info!("Migrations applied");
            Ok(())
        }
        Commands::Seed { password } => {
            let password = seed::resolve_password(password, &SystemEnvironment);
            let app_data = AppData::init(db, settings)?;
            seed::run_seed(&app_data, password).await?;
            Ok(())
        }
        Commands::Serve => {
            let app_data = Arc::new(AppData::init(db, settings)?);
            serve(app_data).await?;
            Ok(())
        }
    }
}

async fn serve(app_data: Arc<AppData>) -> Result<(), std::io::Error> {
    let settings = app_data.settings.clone();
    let address = settings.server_address();
    let app = routes(app_data);

    tracing::info!("Starting server on http://{}", address);
    tracing::info!("Swagger UI available at http://localhost:{}/swagger", settings.server_port);

    Server::new(TcpListener::bind(address)).run(app).await
}
