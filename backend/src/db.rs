use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use log::{error, info};

use crate::config::AppConfig;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

/// Builds the process-wide connection pool and runs a test query on it.
pub fn establish_pool(config: &AppConfig) -> Result<PgPool, PoolError> {
    info!(
        "Connecting to database {} on {}:{} as {}",
        config.db_name, config.db_server, config.db_port, config.db_user
    );
    let manager = ConnectionManager::<PgConnection>::new(config.database_url());
    let pool = Pool::builder().max_size(config.pool_size).build(manager).map_err(|e| {
        error!("Failed to establish database connection: {}", e);
        e
    })?;

    let mut conn = pool.get()?;
    match diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1")).get_result::<i32>(&mut conn) {
        Ok(result) => info!("Database test query result: {}", result),
        Err(e) => error!("Database test query failed: {}", e),
    }
    Ok(pool)
}
