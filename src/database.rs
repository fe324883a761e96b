use mysql::prelude::Queryable;
use mysql::{Opts, Pool};

use crate::error::{Error, Result};

const SCHEMA: &str = include_str!("../migrations/0001_initial.sql");

pub fn connect_to_database(db_url: &str) -> Result<Pool> {
    let connection_opts =
        Opts::from_url(db_url).map_err(|e| Error::Config(format!("invalid DB_URL: {}", e)))?;
    let pool = Pool::new(connection_opts)?;
    tracing::info!("connected to database");
    Ok(pool)
}

fn statements(schema: &str) -> impl Iterator<Item = &str> {
    schema
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

/// Creates missing tables; existing ones are left untouched.
pub fn migrate(pool: &Pool) -> Result<()> {
    let mut conn = pool.get_conn()?;
    for statement in statements(SCHEMA) {
        conn.query_drop(statement)?;
    }
    tracing::info!("schema is up to date");
    Ok(())
}
