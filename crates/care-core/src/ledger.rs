//! Reporte de beneficios entregados (mes en curso, año en curso, histórico).
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use care_domain::{Benefit, BenefitType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitStats {
    pub used: usize,
    pub total_cents: i64,
    pub average_cents: Option<i64>,
}

impl BenefitStats {
    fn from_costs<'a>(costs: impl Iterator<Item = &'a i64>) -> Self {
        let (used, total_cents) = costs.fold((0usize, 0i64), |(n, t), c| (n + 1, t + c));
        let average_cents = (used > 0).then(|| total_cents / used as i64);
        Self { used, total_cents, average_cents }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitTypeReport {
    pub benefit_type: BenefitType,
    pub this_month: BenefitStats,
    pub this_year: BenefitStats,
    pub all_time: BenefitStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSpend {
    pub participant_id: Uuid,
    pub used: usize,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitReport {
    pub today: NaiveDate,
    /// Ordenado por nombre del tipo.
    pub by_type: Vec<BenefitTypeReport>,
    pub participants_this_month: usize,
    pub total_spent_this_month_cents: i64,
    pub average_per_participant_cents: i64,
    /// Participantes con beneficios este mes, por cantidad y luego por total.
    pub cost_per_participant: Vec<ParticipantSpend>,
}

/// Totales de un participante.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantTotals {
    pub this_month_cents: i64,
    pub all_time_cents: i64,
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn benefit_report(today: NaiveDate, types: &[BenefitType], benefits: &[Benefit]) -> BenefitReport {
    let mut sorted_types = types.to_vec();
    sorted_types.sort_by(|a, b| a.name.cmp(&b.name));

    let by_type = sorted_types.into_iter()
                              .map(|bt| {
                                  let type_id = bt.id;
                                  let of_type = || benefits.iter().filter(move |b| b.benefit_type_id == type_id);
                                  BenefitTypeReport { this_month: BenefitStats::from_costs(of_type().filter(|b| same_month(b.date, today))
                                                                                                   .map(|b| &b.cost_cents)),
                                                      this_year: BenefitStats::from_costs(of_type().filter(|b| b.date.year() == today.year())
                                                                                                  .map(|b| &b.cost_cents)),
                                                      all_time: BenefitStats::from_costs(of_type().map(|b| &b.cost_cents)),
                                                      benefit_type: bt }
                              })
                              .collect();

    let mut per_participant: IndexMap<Uuid, ParticipantSpend> = IndexMap::new();
    for b in benefits.iter().filter(|b| same_month(b.date, today)) {
        let entry = per_participant.entry(b.participant_id).or_insert(ParticipantSpend { participant_id: b.participant_id,
                                                                                         used: 0,
                                                                                         total_cents: 0 });
        entry.used += 1;
        entry.total_cents += b.cost_cents;
    }
    let total_spent_this_month_cents: i64 = per_participant.values().map(|p| p.total_cents).sum();
    let participants_this_month = per_participant.len();
    let average_per_participant_cents = if participants_this_month > 0 {
        total_spent_this_month_cents / participants_this_month as i64
    } else {
        0
    };
    let mut cost_per_participant: Vec<ParticipantSpend> = per_participant.into_values().collect();
    cost_per_participant.sort_by(|a, b| b.used.cmp(&a.used).then(b.total_cents.cmp(&a.total_cents)));

    BenefitReport { today,
                    by_type,
                    participants_this_month,
                    total_spent_this_month_cents,
                    average_per_participant_cents,
                    cost_per_participant }
}

pub fn participant_totals(today: NaiveDate, benefits: &[Benefit]) -> ParticipantTotals {
    ParticipantTotals { this_month_cents: benefits.iter().filter(|b| same_month(b.date, today)).map(|b| b.cost_cents).sum(),
                        all_time_cents: benefits.iter().map(|b| b.cost_cents).sum() }
}
