//! Configuración del motor desde variables de entorno (.env opcional).
//!
//! - `EXTRACARE_DEBUG`: habilita fechas futuras (carga de datos de prueba).
//! - `EXTRACARE_CATALOG`: ruta a un catálogo JSON; sin ella se usa el catálogo
//!   por defecto.

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use care_domain::EventCatalog;

use crate::errors::CareError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub allow_future_dates: bool,
    pub catalog_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let allow_future_dates = env::var("EXTRACARE_DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);
        let catalog_path = env::var("EXTRACARE_CATALOG").ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        Self { allow_future_dates, catalog_path }
    }

    /// Catálogo configurado, o el de por defecto.
    pub fn load_catalog(&self) -> Result<EventCatalog, CareError> {
        match &self.catalog_path {
            None => Ok(EventCatalog::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| CareError::Config(format!("reading {}: {e}", path.display())))?;
                Ok(EventCatalog::from_json(&raw)?)
            }
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    !(v.is_empty() || v == "0" || v == "false" || v == "no" || v == "off")
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
