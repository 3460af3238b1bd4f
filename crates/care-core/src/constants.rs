//! Constantes del motor de flujo.
//!
//! Son reglas de negocio fijas; el catálogo (inyectable) no las sobrescribe.

/// Si el evento final de intake cae en o antes de este día, el programa
/// arranca ese mismo mes; si no, el mes siguiente.
pub const PROGRAM_START_CUTOFF_DAY: u32 = 7;

/// Tipo del marcador sintetizado al completar el release.
pub const COMPLETED_EVENT_TYPE: &str = "Completed";

/// Tipo del marcador creado por una salida anticipada.
pub const EXITED_EVENT_TYPE: &str = "Exited program early";

/// Intentos ante conflictos de concurrencia al persistir un lote.
pub const COMMIT_ATTEMPTS: u32 = 3;
