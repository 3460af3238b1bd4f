//! Beneficios entregados a participantes (transporte, comidas, etc.).
//!
//! Los importes se manejan en centavos enteros.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitType {
    pub id: Uuid,
    pub name: String,
    pub default_cost_cents: Option<i64>,
}

impl BenefitType {
    pub fn new(name: impl Into<String>, default_cost_cents: Option<i64>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               default_cost_cents }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub benefit_type_id: Uuid,
    pub cost_cents: i64,
    pub date: NaiveDate,
}

impl Benefit {
    pub fn new(participant_id: Uuid, benefit_type_id: Uuid, cost_cents: i64, date: NaiveDate) -> Self {
        Self { id: Uuid::new_v4(),
               participant_id,
               benefit_type_id,
               cost_cents,
               date }
    }
}

/// Formatea centavos como `12.34`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
