use std::{env, error::Error, sync::Arc};

use tokio::{fs, net, task};
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use helpdesk::{db, domain, http, Config};

const CONFIG_ENV: &str = "HELPDESK_CONFIG";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path =
        env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".to_owned());
    let config = fs::read_to_string(&config_path).await?;
    let config = toml::from_str::<Config>(&config)?;

    let db: Arc<dyn db::Store> = if config.db.is_memory() {
        tracing::warn!("using in-memory storage, data is lost on exit");
        Arc::new(db::Memory::new())
    } else {
        let (db_client, db_connection) = db::connect(&config.db).await?;

        task::spawn(async move {
            if let Err(e) = db_connection.await {
                panic!("database connection failed: {e}");
            }
        });

        db_client.migrate().await?;
        Arc::new(db_client)
    };

    if config.db.seed {
        let password_hash = db::user::PasswordHash::new(
            db::seed::PASSWORD,
            config.auth.password_hash_cost,
        )?;
        let seeded =
            db::seed::seed(db.as_ref(), &password_hash, domain::now()).await?;
        tracing::info!(
            users = seeded.users,
            assets = seeded.assets,
            "seeded demo data",
        );
    }

    let state = Arc::new(http::AppState::new(&config, db));
    let app = http::router(&config, state)?;

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!(addr = %config.http.server.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
