//! care-persistence
//!
//! Backend Postgres (Diesel + r2d2) de los contratos de almacenamiento de
//! `care-core`, con paridad 1:1 respecto a `InMemoryCareStore`.
//!
//! Módulos:
//! - `pg`: `PgCareStore` (commit transaccional con chequeo optimista).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas a mano.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, PgCareStore, PgPool, PoolProvider};
