mod config;
mod front;
mod migration;
pub mod models;
mod session;
mod store;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;
use sqlx::postgres::PgPoolOptions;

use crate::{config::Config, store::postgres::PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init_from_env(Env::default().default_filter_or("billed=debug"))?;

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("cannot connect to database")?;

    migration::migrate(&pool, &config.migrations_dir).await?;
    let store = PostgresStore::new(pool, config.uploads_dir.clone()).await?;
    front::start_web_server(config, Arc::new(store)).await
}
