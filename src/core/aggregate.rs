//! Trip totals in the trip's preferred currency.

use crate::core::converter::RateConverter;
use crate::core::currency::CurrencyCode;
use crate::core::error::{BudgetError, Result};
use crate::core::model::{ComponentId, CostComponent, ParticipantKey, Trip};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeSet;
use tracing::debug;

/// Rounds a money amount half away from zero to two decimal places.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Adds up `amounts`, failing instead of wrapping past the `Decimal` range.
pub fn checked_sum<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or_else(|| BudgetError::AmountOverflow(format!("{total} + {amount}")))
    })
}

/// Which components of a trip count towards a total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostFilter {
    pub active_only: bool,
    /// Empty means every participant, shared components included.
    pub participants: BTreeSet<ParticipantKey>,
    pub include_zero_cost: bool,
}

impl Default for CostFilter {
    fn default() -> Self {
        Self {
            active_only: true,
            participants: BTreeSet::new(),
            include_zero_cost: true,
        }
    }
}

impl CostFilter {
    pub fn matches(&self, component: &CostComponent) -> bool {
        if self.active_only && !component.is_active {
            return false;
        }
        if !self.participants.is_empty() && !self.participants.contains(&component.participant_key()) {
            return false;
        }
        self.include_zero_cost || !component.is_free()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostLine {
    pub component_id: ComponentId,
    pub name: String,
    pub participant: ParticipantKey,
    pub base_cost: Decimal,
    pub currency: CurrencyCode,
    /// `base_cost` in the trip's preferred currency, not rounded.
    pub converted: Decimal,
    /// Share of the total in percent, rounded to two places.
    pub share: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostBreakdown {
    pub currency: CurrencyCode,
    pub lines: Vec<CostLine>,
    pub total: Decimal,
}

pub struct CostAggregator {
    converter: RateConverter,
}

impl CostAggregator {
    pub fn new(converter: RateConverter) -> Self {
        Self { converter }
    }

    /// Sum of the matching components, rounded once at the end.
    ///
    /// Fails with `CurrencyUnavailable` naming every unresolvable currency
    /// rather than returning a partial sum, and with `AmountOverflow` when the
    /// total does not fit in a `Decimal`.
    pub fn total_cost(&self, trip: &Trip, filter: &CostFilter) -> Result<Decimal> {
        let converted = self.convert_matching(trip, filter)?;
        let total = checked_sum(converted.iter().map(|(_, amount)| *amount))?;
        debug!("Total cost of trip {}: {total} {}", trip.id, trip.preferred_currency);
        Ok(round_money(total))
    }

    pub fn breakdown(&self, trip: &Trip, filter: &CostFilter) -> Result<CostBreakdown> {
        let converted = self.convert_matching(trip, filter)?;
        let exact_total = checked_sum(converted.iter().map(|(_, amount)| *amount))?;

        let lines = converted
            .into_iter()
            .map(|(component, amount)| -> Result<CostLine> {
                let share = if exact_total.is_zero() {
                    Decimal::ZERO
                } else {
                    amount
                        .checked_div(exact_total)
                        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                        .map(round_money)
                        .ok_or_else(|| {
                            let what = format!("share of component {}", component.id);
                            BudgetError::AmountOverflow(what)
                        })?
                };
                Ok(CostLine {
                    component_id: component.id,
                    name: component.name.clone(),
                    participant: component.participant_key(),
                    base_cost: component.base_cost,
                    currency: component.currency.clone(),
                    converted: amount,
                    share,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CostBreakdown {
            currency: trip.preferred_currency.clone(),
            lines,
            total: round_money(exact_total),
        })
    }

    fn convert_matching<'a>(
        &self,
        trip: &'a Trip,
        filter: &CostFilter,
    ) -> Result<Vec<(&'a CostComponent, Decimal)>> {
        let mut converted = Vec::new();
        let mut missing = BTreeSet::new();

        for component in trip.components.iter().filter(|c| filter.matches(c)) {
            match self
                .converter
                .convert(component.base_cost, &component.currency, &trip.preferred_currency)
            {
                Ok(amount) => converted.push((component, amount)),
                Err(BudgetError::CurrencyUnavailable(codes)) => missing.extend(codes),
                Err(e) => return Err(e),
            }
        }

        if !missing.is_empty() {
            return Err(BudgetError::CurrencyUnavailable(missing.into_iter().collect()));
        }
        Ok(converted)
    }
}
