//! Motor del programa: builder y servicio `CareEngine`.

pub mod builder;
pub mod core;

pub use self::builder::EngineBuilder;
pub use self::core::CareEngine;
