//! Catálogo de eventos requeridos por fase.
//!
//! Es configuración inmutable: el motor lo recibe en construcción, de modo que
//! los tests pueden sustituir catálogos alternativos (p. ej. un programa más
//! corto) sin estado global.
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Duración por defecto del programa, en meses calendario.
pub const DEFAULT_PROGRAM_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub event_type: String,
    pub count: u32,
}

impl CatalogEntry {
    pub fn new(event_type: impl Into<String>, count: u32) -> Self {
        Self { event_type: event_type.into(), count }
    }
}

/// Multiconjunto ordenado de tipos de evento.
///
/// Conserva el orden del catálogo; `remove_one` quita la primera instancia.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMultiset(Vec<String>);

impl EventMultiset {
    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        Self(entries.iter()
                    .flat_map(|e| std::iter::repeat(e.event_type.clone()).take(e.count as usize))
                    .collect())
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.0.iter().any(|t| t == event_type)
    }

    /// Quita una instancia; devuelve `false` si el tipo no estaba.
    pub fn remove_one(&mut self, event_type: &str) -> bool {
        match self.0.iter().position(|t| t == event_type) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.0.iter().filter(|t| *t == event_type).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCatalog {
    /// Orden libre salvo la última entrada (evento final de intake).
    pub intake: Vec<CatalogEntry>,
    /// Requeridos por cada mes calendario del programa.
    pub program: Vec<CatalogEntry>,
    pub release: Vec<CatalogEntry>,
    #[serde(default = "default_program_months")]
    pub program_months: u32,
}

fn default_program_months() -> u32 {
    DEFAULT_PROGRAM_MONTHS
}

impl EventCatalog {
    pub fn new(intake: Vec<CatalogEntry>,
               program: Vec<CatalogEntry>,
               release: Vec<CatalogEntry>,
               program_months: u32)
               -> Result<Self, ValidationError> {
        let catalog = Self { intake, program, release, program_months };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Atajo para tests y configuración: `(tipo, cantidad)` por fase.
    pub fn from_pairs(intake: &[(&str, u32)],
                      program: &[(&str, u32)],
                      release: &[(&str, u32)],
                      program_months: u32)
                      -> Result<Self, ValidationError> {
        let conv = |pairs: &[(&str, u32)]| pairs.iter().map(|(t, c)| CatalogEntry::new(*t, *c)).collect::<Vec<_>>();
        Self::new(conv(intake), conv(program), conv(release), program_months)
    }

    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        let catalog: Self = serde_json::from_str(raw).map_err(|e| ValidationError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.intake.is_empty() {
            return Err(ValidationError::Catalog("intake phase needs at least one event type".into()));
        }
        if self.program_months == 0 {
            return Err(ValidationError::Catalog("program must last at least one month".into()));
        }
        let all = self.intake.iter().chain(self.program.iter()).chain(self.release.iter());
        for entry in all {
            if entry.event_type.trim().is_empty() {
                return Err(ValidationError::Catalog("empty event type".into()));
            }
            if entry.count == 0 {
                return Err(ValidationError::Catalog(format!("event type {} has a zero count", entry.event_type)));
            }
        }
        Ok(())
    }

    /// Tipo cuyo cumplimiento cierra el intake.
    pub fn final_intake_event(&self) -> &str {
        self.intake.last().map(|e| e.event_type.as_str()).unwrap_or_default()
    }

    pub fn intake_required(&self) -> EventMultiset {
        EventMultiset::from_entries(&self.intake)
    }

    pub fn program_required(&self) -> EventMultiset {
        EventMultiset::from_entries(&self.program)
    }

    pub fn release_required(&self) -> EventMultiset {
        EventMultiset::from_entries(&self.release)
    }

    pub fn intake_types(&self) -> Vec<&str> {
        distinct(&self.intake)
    }

    pub fn release_types(&self) -> Vec<&str> {
        distinct(&self.release)
    }
}

fn distinct(entries: &[CatalogEntry]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(entries.len());
    for e in entries {
        if !out.contains(&e.event_type.as_str()) {
            out.push(e.event_type.as_str());
        }
    }
    out
}

impl Default for EventCatalog {
    fn default() -> Self {
        Self { intake: vec![CatalogEntry::new("Intake call", 1),
                            CatalogEntry::new("Clinical assessment", 1),
                            CatalogEntry::new("Peer partner introduction", 1),
                            CatalogEntry::new("Intake session", 1)],
               program: vec![CatalogEntry::new("Individual session", 2),
                             CatalogEntry::new("Group session", 1)],
               release: vec![CatalogEntry::new("Release assessment", 1),
                             CatalogEntry::new("Exit interview", 1)],
               program_months: DEFAULT_PROGRAM_MONTHS }
    }
}
