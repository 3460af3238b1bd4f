//! Máquina de estados del programa Extra Care.
//!
//! - `evaluator`: historial -> requisitos vigentes (fase, tipos, ventana).
//! - `validator`: lote enviado -> primer error o `Ok`.
//! - `status`: log del ciclo -> estado del participante.

pub mod evaluator;
pub mod status;
pub mod validator;

pub use evaluator::{evaluate, program_start, DateWindow, FlowRequirements};
pub use status::{derive_status, StatusDerivation};
pub use validator::{validate, validate_against};
