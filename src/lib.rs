//! A thin synchronous adapter over one SQLite connection.
//!
//! An [`Adapter`] holds the connection settings (host, user, password,
//! schema), opens its connection lazily on first use and exposes a uniform
//! surface for parameterized SQL and transaction control. [`Adapter::create`]
//! builds adapters from partial configuration, filling gaps from the
//! process-wide [`Defaults`].

// Core infrastructure modules
pub mod core;

pub mod config;

pub use crate::config::{
    defaults, get_default, load_config, replace_defaults, reset_defaults, set_default,
    AdapterConfig, Config, ConfigKey, Defaults,
};
pub use crate::core::db::{
    Adapter, ConnectOptions, ConnectTarget, ExecOutcome, Row, TransactionState, Value, MEMORY_HOST,
};
pub use crate::core::{AdapterError, Result};
