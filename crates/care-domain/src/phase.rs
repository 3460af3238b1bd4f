//! Fases del programa y estado derivado del participante.
//!
//! Transiciones válidas del estado dentro de un ciclo (`program_flow`):
//! - `Inactive` -> `Active` (primer evento registrado)
//! - `Active` -> `Complete` (todos los eventos de release completos)
//! - `Active` -> `Inactive` (sólo vía salida anticipada, que abre un ciclo nuevo)
//!
//! `Complete` es terminal para el ciclo.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Intake,
    Program,
    Release,
    /// Marcador terminal de salida anticipada.
    Exited,
    /// Marcador terminal sintetizado al completar el release.
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Intake => "intake",
            Phase::Program => "program",
            Phase::Release => "release",
            Phase::Exited => "exited",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intake" => Ok(Phase::Intake),
            "program" => Ok(Phase::Program),
            "release" => Ok(Phase::Release),
            "exited" => Ok(Phase::Exited),
            "completed" => Ok(Phase::Completed),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Inactive,
    Active,
    Complete,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Inactive => "inactive",
            ParticipantStatus::Active => "active",
            ParticipantStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(ParticipantStatus::Inactive),
            "active" => Ok(ParticipantStatus::Active),
            "complete" => Ok(ParticipantStatus::Complete),
            other => Err(format!("unknown status: {other}")),
        }
    }
}
