/// Connection Management Module
///
/// This module holds the `Adapter`: the connection settings, the lazily
/// opened native connection and the transaction controls.

use crate::core::{AdapterError, Result};
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Host value that selects a private in-memory database.
pub const MEMORY_HOST: &str = ":memory:";

/// Character set requested on every new connection.
pub const CHARSET: &str = "UTF-8";

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// Options applied to each freshly opened connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
    /// Switch file databases to write-ahead logging
    pub wal: bool,
    /// How long the native client waits on a locked database
    pub busy_timeout: Option<Duration>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            foreign_keys: true,
            wal: true,
            busy_timeout: Some(Duration::from_secs(5)),
        }
    }
}

/// Where a connection goes, derived from host and schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub schema: String,
}

impl ConnectTarget {
    pub fn new(host: &str, schema: &str) -> Self {
        ConnectTarget {
            host: host.to_string(),
            schema: schema.to_string(),
        }
    }

    /// Database file for this target, `None` for the in-memory host.
    pub fn path(&self) -> Option<PathBuf> {
        if self.host == MEMORY_HOST {
            None
        } else {
            Some(PathBuf::from(&self.host).join(&self.schema))
        }
    }

    fn open(&self, options: &ConnectOptions) -> rusqlite::Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let path = self.path();
        let conn = match &path {
            Some(path) => Connection::open_with_flags(path, flags)?,
            None => Connection::open_in_memory_with_flags(flags)?,
        };

        conn.pragma_update(None, "encoding", CHARSET)?;
        conn.pragma_update(None, "foreign_keys", options.foreign_keys)?;
        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if options.wal && path.is_some() {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
        }
        Ok(conn)
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sqlite:host={};dbname={};charset={}",
            self.host, self.schema, CHARSET
        )
    }
}

/// A single database connection plus the settings used to open it.
///
/// The connection is opened lazily by the first operation that needs it and
/// is closed when the adapter is dropped or [`Adapter::disconnect`] is called.
/// An adapter is meant for one thread at a time; give each worker its own.
pub struct Adapter {
    pub(crate) host: String,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) schema: String,
    pub(crate) options: ConnectOptions,
    pub(crate) connection: Option<Connection>,
}

impl Adapter {
    /// Creates an adapter, validating host and schema through the setters.
    ///
    /// With `autoconnect` set the connection is opened right away and any
    /// connect failure fails construction.
    pub fn new(
        host: &str,
        schema: &str,
        user: &str,
        password: &str,
        autoconnect: bool,
    ) -> Result<Self> {
        let mut adapter = Adapter {
            host: String::new(),
            user: String::new(),
            password: String::new(),
            schema: String::new(),
            options: ConnectOptions::default(),
            connection: None,
        };
        adapter
            .set_host(host)?
            .set_user(user)
            .set_password(password)
            .set_schema(schema)?;
        if autoconnect {
            adapter.connect()?;
        }
        Ok(adapter)
    }

    /// Replaces the options used by the next connect.
    pub fn with_options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Opens a connection unless one is already live. Connect failures are returned.
    pub fn connect(&mut self) -> Result<&mut Self> {
        self.connect_with(true, false)
    }

    /// Drops the current connection, if any, and opens a new one.
    pub fn reconnect(&mut self) -> Result<&mut Self> {
        self.connect_with(true, true)
    }

    /// Opens a connection if none is live, or always when `reconnect` is set.
    ///
    /// A missing host or schema is a configuration error whatever the flags.
    /// A native connect failure leaves the adapter disconnected and is only
    /// returned when `throw_on_fail` is set.
    pub fn connect_with(&mut self, throw_on_fail: bool, reconnect: bool) -> Result<&mut Self> {
        if self.connection.is_some() && !reconnect {
            return Ok(self);
        }
        if self.host.is_empty() || self.schema.is_empty() {
            return Err(AdapterError::Configuration(
                "The hostname and/or schema were not set".to_string(),
            ));
        }

        let target = self.target();
        debug!(dsn = %target, user = %self.user, reconnect, "opening database connection");
        match target.open(&self.options) {
            Ok(conn) => {
                self.connection = Some(conn);
                info!(dsn = %target, "database connection established");
            }
            Err(e) => {
                self.connection = None;
                if throw_on_fail {
                    return Err(AdapterError::Database(e));
                }
                warn!(dsn = %target, error = %e, "database connection failed");
            }
        }
        Ok(self)
    }

    /// Closes the live connection, reporting any error from the native close.
    pub fn disconnect(&mut self) -> Result<&mut Self> {
        if let Some(conn) = self.connection.take() {
            conn.close().map_err(|(_, e)| AdapterError::Database(e))?;
            info!(dsn = %self.target(), "database connection closed");
        }
        Ok(self)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the live native connection, or `None` when disconnected.
    pub fn get_connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub(crate) fn live_connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or_else(AdapterError::no_connection)
    }

    pub fn target(&self) -> ConnectTarget {
        ConnectTarget::new(&self.host, &self.schema)
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_user(&self) -> &str {
        &self.user
    }

    /// Returns the stored password verbatim.
    pub fn get_password(&self) -> &str {
        &self.password
    }

    pub fn get_schema(&self) -> &str {
        &self.schema
    }

    pub fn set_host(&mut self, host: &str) -> Result<&mut Self> {
        if host.is_empty() {
            return Err(AdapterError::InvalidArgument(
                "Empty database hostname".to_string(),
            ));
        }
        self.host = host.to_string();
        Ok(self)
    }

    pub fn set_user(&mut self, user: &str) -> &mut Self {
        self.user = user.to_string();
        self
    }

    pub fn set_password(&mut self, password: &str) -> &mut Self {
        self.password = password.to_string();
        self
    }

    pub fn set_schema(&mut self, schema: &str) -> Result<&mut Self> {
        if schema.is_empty() {
            return Err(AdapterError::InvalidArgument("Empty schema name".to_string()));
        }
        self.schema = schema.to_string();
        Ok(self)
    }

    /// Begins a transaction, connecting first if needed.
    pub fn transaction_start(&mut self) -> Result<()> {
        self.connect()?;
        self.live_connection()?.execute_batch("BEGIN")?;
        debug!("transaction started");
        Ok(())
    }

    /// Commits the active transaction. Never connects.
    pub fn transaction_commit(&mut self) -> Result<()> {
        self.live_connection()?.execute_batch("COMMIT")?;
        debug!("transaction committed");
        Ok(())
    }

    /// Rolls back the active transaction. Never connects.
    pub fn transaction_rollback(&mut self) -> Result<()> {
        self.live_connection()?.execute_batch("ROLLBACK")?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`. When `f` or the commit fails the
    /// transaction is rolled back and that first error is returned, so the
    /// adapter never leaves this call with a transaction open.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.transaction_start()?;
        let result = f(self).and_then(|value| {
            self.transaction_commit()?;
            Ok(value)
        });
        if result.is_err() && self.transaction_state() == TransactionState::Transaction {
            if let Err(rollback_err) = self.transaction_rollback() {
                warn!(error = %rollback_err, "rollback after failed transaction failed");
            }
        }
        result
    }

    pub fn transaction_state(&self) -> TransactionState {
        match &self.connection {
            Some(conn) if !conn.is_autocommit() => TransactionState::Transaction,
            _ => TransactionState::Autocommit,
        }
    }

    /// Last auto-generated row id on this connection, `0` when disconnected.
    pub fn get_insert_id(&self) -> i64 {
        self.connection
            .as_ref()
            .map_or(0, |conn| conn.last_insert_rowid())
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Adapter {{Host: {}, Schema: {}, User: {}}}",
            self.host, self.schema, self.user
        )
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish()
    }
}
