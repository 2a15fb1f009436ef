use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Postgres, QueryBuilder};

use crate::config::DbSettings;
use crate::error::{PipelineError, Result};
use crate::exchange_rate::{COLUMNS, ExchangeRateRow};

pub const TABLE_NAME: &str = "exchange_rates";

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS exchange_rates (
        id SERIAL PRIMARY KEY,
        currency VARCHAR(10),
        rate FLOAT,
        reference_date DATE,
        created_at TIMESTAMP WITH TIME ZONE,
        created_at_converted TIMESTAMP WITH TIME ZONE
    );
"#;

/// Opens one short-lived database session per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>>;
}

/// A single connection. Writes are buffered in a transaction until
/// [`Session::commit`]; [`Session::close`] releases the connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Session: Send {
    async fn create_table(&mut self) -> Result<()>;
    async fn insert_rows(&mut self, rows: &[ExchangeRateRow]) -> Result<u64>;
    async fn commit(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing to insert; no connection was opened.
    Skipped,
    Inserted(u64),
    Failed,
}

pub struct Loader {
    connector: Box<dyn Connector>,
}

impl Loader {
    pub fn new(connector: Box<dyn Connector>) -> Loader {
        Loader { connector }
    }

    /// Creates the table if it is missing. Failures are logged and reported
    /// as `false`; a missing table shows up later as an insert failure.
    pub async fn ensure_schema(&self) -> bool {
        let mut session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!("Database connection failed: {}", e);
                return false;
            }
        };

        let result = create_and_commit(session.as_mut()).await;
        close_session(session.as_mut()).await;

        match result {
            Ok(()) => {
                info!("Table '{}' is ready.", TABLE_NAME);
                true
            }
            Err(e) => {
                error!("Error creating table '{}': {}", TABLE_NAME, e);
                false
            }
        }
    }

    /// Inserts all rows in one statement and one transaction. Errors never
    /// escape; the outcome tells the caller what happened.
    pub async fn load(&self, rows: &[ExchangeRateRow]) -> LoadOutcome {
        if rows.is_empty() {
            warn!("No data to insert");
            return LoadOutcome::Skipped;
        }

        let mut session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!("Database connection failed: {}", e);
                return LoadOutcome::Failed;
            }
        };

        let result = insert_and_commit(session.as_mut(), rows).await;
        close_session(session.as_mut()).await;

        match result {
            Ok(count) => {
                info!("Inserted {} records into database.", count);
                LoadOutcome::Inserted(count)
            }
            Err(e) => {
                error!("Error inserting data: {}", e);
                LoadOutcome::Failed
            }
        }
    }
}

async fn create_and_commit(session: &mut dyn Session) -> Result<()> {
    session.create_table().await?;
    session.commit().await
}

async fn insert_and_commit(session: &mut dyn Session, rows: &[ExchangeRateRow]) -> Result<u64> {
    let count = session.insert_rows(rows).await?;
    session.commit().await?;
    Ok(count)
}

async fn close_session(session: &mut dyn Session) {
    if let Err(e) = session.close().await {
        warn!("Error closing database connection: {}", e);
    }
}

pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    pub fn new(settings: &DbSettings) -> PgConnector {
        let mut options = PgConnectOptions::new();
        if let Some(host) = &settings.host {
            options = options.host(host);
        }
        if let Some(port) = settings.port {
            options = options.port(port);
        }
        if let Some(name) = &settings.name {
            options = options.database(name);
        }
        if let Some(user) = &settings.user {
            options = options.username(user);
        }
        if let Some(password) = &settings.password {
            options = options.password(password);
        }

        PgConnector { options }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        let conn = PgConnection::connect_with(&self.options).await?;
        Ok(Box::new(PgSession {
            conn: Some(conn),
            in_transaction: false,
        }))
    }
}

struct PgSession {
    conn: Option<PgConnection>,
    in_transaction: bool,
}

impl PgSession {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn.as_mut().ok_or_else(|| {
            PipelineError::Persistence(sqlx::Error::Protocol(
                "database session already closed".to_string(),
            ))
        })
    }

    async fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            sqlx::query("BEGIN").execute(self.conn()?).await?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

#[async_trait]
impl Session for PgSession {
    async fn create_table(&mut self) -> Result<()> {
        self.begin().await?;
        sqlx::query(CREATE_TABLE_SQL).execute(self.conn()?).await?;
        Ok(())
    }

    async fn insert_rows(&mut self, rows: &[ExchangeRateRow]) -> Result<u64> {
        self.begin().await?;
        let mut builder = insert_statement(rows);
        let done = builder.build().execute(self.conn()?).await?;
        Ok(done.rows_affected())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            sqlx::query("COMMIT").execute(self.conn()?).await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // An open transaction is rolled back by the server on disconnect.
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

fn insert_statement(rows: &[ExchangeRateRow]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        TABLE_NAME,
        COLUMNS.join(", ")
    ));
    builder.push_values(rows, |mut values, row| {
        values
            .push_bind(row.currency.clone())
            .push_bind(row.rate)
            .push_bind(row.reference_date)
            .push_bind(row.created_at.with_timezone(&Utc))
            .push_bind(row.created_at_converted.with_timezone(&Utc));
    });
    builder
}
