//! Filtered, currency-adjusted component records for bar and pie charts.

use crate::core::aggregate::checked_sum;
use crate::core::catalog::{Catalog, UNKNOWN_CATEGORY, UNKNOWN_TYPE};
use crate::core::converter::RateConverter;
use crate::core::currency::CurrencyCode;
use crate::core::error::{BudgetError, Result};
use crate::core::model::{ComponentId, CostComponent, ParticipantId, ParticipantKey, Trip};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Chart selections.
///
/// Filters run in a fixed order: participants, then free items, then
/// categories. An empty participant set keeps everyone, while an empty
/// category set keeps nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartFilters {
    pub participants: BTreeSet<ParticipantKey>,
    pub include_free: bool,
    pub categories: BTreeSet<String>,
}

impl ChartFilters {
    /// Every category selected and free items shown.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self {
            participants: BTreeSet::new(),
            include_free: true,
            categories: catalog.category_names().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartRecord {
    pub component_id: ComponentId,
    pub component_name: String,
    pub category_name: String,
    pub type_name: String,
    pub base_cost: Decimal,
    /// `base_cost` in the trip's preferred currency.
    pub adjusted_cost: Decimal,
    pub currency: CurrencyCode,
    pub participant_id: Option<ParticipantId>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ChartRecord {
    pub fn participant_key(&self) -> ParticipantKey {
        self.participant_id
            .map_or(ParticipantKey::Shared, ParticipantKey::Id)
    }
}

pub struct ChartDataPipeline<'a> {
    catalog: &'a Catalog,
    converter: RateConverter,
}

impl<'a> ChartDataPipeline<'a> {
    pub fn new(catalog: &'a Catalog, converter: RateConverter) -> Self {
        Self { catalog, converter }
    }

    pub fn prepare(&self, trip: &Trip, filters: &ChartFilters) -> Result<Vec<ChartRecord>> {
        let mut selected: Vec<(&CostComponent, &str)> = trip
            .components
            .iter()
            .filter(|c| filters.participants.is_empty() || filters.participants.contains(&c.participant_key()))
            .filter(|c| filters.include_free || !c.is_free())
            .map(|c| (c, self.category_name(c.category_id)))
            .filter(|(_, category)| filters.categories.contains(*category))
            .collect();
        selected.sort_by_key(|(c, _)| c.id);

        let mut records = Vec::with_capacity(selected.len());
        let mut missing = BTreeSet::new();
        for (component, category_name) in selected {
            let adjusted_cost = match self.converter.convert(
                component.base_cost,
                &component.currency,
                &trip.preferred_currency,
            ) {
                Ok(amount) => amount,
                Err(BudgetError::CurrencyUnavailable(codes)) => {
                    missing.extend(codes);
                    continue;
                }
                Err(e) => return Err(e),
            };
            records.push(ChartRecord {
                component_id: component.id,
                component_name: component.name.clone(),
                category_name: category_name.to_string(),
                type_name: self
                    .catalog
                    .type_name(component.type_id)
                    .unwrap_or(UNKNOWN_TYPE)
                    .to_string(),
                base_cost: component.base_cost,
                adjusted_cost,
                currency: component.currency.clone(),
                participant_id: component.participant_id,
                description: component.description.clone(),
                link: component.link.clone(),
                start_date: component.start_date,
                end_date: component.end_date,
            });
        }

        if !missing.is_empty() {
            return Err(BudgetError::CurrencyUnavailable(missing.into_iter().collect()));
        }
        debug!("Prepared {} chart records for trip {}", records.len(), trip.id);
        Ok(records)
    }

    fn category_name(&self, id: u64) -> &'a str {
        self.catalog.category_name(id).unwrap_or(UNKNOWN_CATEGORY)
    }
}

fn sum_by<K, F>(records: &[ChartRecord], key: F) -> Result<Vec<(K, Decimal)>>
where
    K: Eq + std::hash::Hash + Clone,
    F: Fn(&ChartRecord) -> K,
{
    let mut order = Vec::new();
    let mut totals: HashMap<K, Decimal> = HashMap::new();
    for record in records {
        let k = key(record);
        let total = totals.entry(k.clone()).or_insert_with(|| {
            order.push(k);
            Decimal::ZERO
        });
        *total = checked_sum([*total, record.adjusted_cost])?;
    }
    Ok(order
        .into_iter()
        .map(|k| {
            let total = totals.get(&k).copied().unwrap_or_default();
            (k, total)
        })
        .collect())
}

/// Adjusted cost per category, in order of first appearance.
pub fn category_series(records: &[ChartRecord]) -> Result<Vec<(String, Decimal)>> {
    sum_by(records, |r| r.category_name.clone())
}

/// Adjusted cost per participant, in order of first appearance.
pub fn participant_series(records: &[ChartRecord]) -> Result<Vec<(ParticipantKey, Decimal)>> {
    sum_by(records, ChartRecord::participant_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::test_support::{component, participant, trip};
    use crate::core::rates::RateTable;
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn converter() -> RateConverter {
        let table = RateTable::in_memory(CurrencyCode::new("PLN").unwrap());
        table
            .upsert(CurrencyCode::new("EUR").unwrap(), dec("0.2"), Utc::now())
            .unwrap();
        RateConverter::from_table(&table)
    }

    fn in_category(id: ComponentId, cost: &str, currency: &str, category_id: u64) -> CostComponent {
        let mut c = component(id, cost, currency);
        c.category_id = category_id;
        c
    }

    fn sample_trip() -> Trip {
        let mut flight = in_category(3, "400", "PLN", 3);
        flight.type_id = 11;
        flight.participant_id = Some(1);
        let mut museum = in_category(2, "0", "PLN", 4);
        museum.participant_id = Some(2);
        let mut dinner = in_category(4, "50", "EUR", 2);
        dinner.participant_id = Some(1);
        trip(
            "EUR",
            vec![participant(1, "Ana"), participant(2, "Bo")],
            vec![flight, museum, in_category(1, "100", "PLN", 1), dinner],
        )
    }

    #[test]
    fn test_adjusted_cost_uses_preferred_currency() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let t = trip("EUR", vec![], vec![component(1, "100", "PLN")]);

        let records = pipeline.prepare(&t, &ChartFilters::for_catalog(&catalog)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].adjusted_cost, dec("20.00"));
        assert_eq!(records[0].base_cost, dec("100"));
        assert_eq!(records[0].category_name, "Accommodation");
        assert_eq!(records[0].type_name, "Hotel");
    }

    #[test]
    fn test_all_categories_returns_components_in_id_order() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());

        let records = pipeline
            .prepare(&sample_trip(), &ChartFilters::for_catalog(&catalog))
            .unwrap();
        let ids: Vec<ComponentId> = records.iter().map(|r| r.component_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(records[2].type_name, "Plane");
    }

    #[test]
    fn test_empty_category_selection_returns_nothing() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let filters = ChartFilters {
            categories: BTreeSet::new(),
            ..ChartFilters::for_catalog(&catalog)
        };
        assert!(pipeline.prepare(&sample_trip(), &filters).unwrap().is_empty());
    }

    #[test]
    fn test_free_items_and_participants_are_filtered() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());

        let mut filters = ChartFilters::for_catalog(&catalog);
        filters.include_free = false;
        let ids: Vec<ComponentId> = pipeline
            .prepare(&sample_trip(), &filters)
            .unwrap()
            .iter()
            .map(|r| r.component_id)
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);

        filters.participants = [ParticipantKey::Id(1)].into();
        filters.categories = ["Food".to_string()].into();
        let records = pipeline.prepare(&sample_trip(), &filters).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].component_id, 4);
        assert_eq!(records[0].adjusted_cost, dec("50"));

        filters.participants = [ParticipantKey::Shared].into();
        filters.categories = ChartFilters::for_catalog(&catalog).categories;
        let ids: Vec<ComponentId> = pipeline
            .prepare(&sample_trip(), &filters)
            .unwrap()
            .iter()
            .map(|r| r.component_id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_unknown_catalog_ids_get_placeholder_names() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let mut odd = component(1, "10", "PLN");
        odd.category_id = 99;
        odd.type_id = 999;
        let t = trip("PLN", vec![], vec![odd]);

        let mut filters = ChartFilters::for_catalog(&catalog);
        let records = pipeline.prepare(&t, &filters).unwrap();
        assert!(records.is_empty());

        filters.categories.insert(UNKNOWN_CATEGORY.to_string());
        let records = pipeline.prepare(&t, &filters).unwrap();
        assert_eq!(records[0].category_name, UNKNOWN_CATEGORY);
        assert_eq!(records[0].type_name, UNKNOWN_TYPE);
    }

    #[test]
    fn test_unresolvable_currency_fails() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let t = trip(
            "PLN",
            vec![],
            vec![component(1, "10", "PLN"), component(2, "10", "JPY")],
        );
        assert_eq!(
            pipeline.prepare(&t, &ChartFilters::for_catalog(&catalog)),
            Err(BudgetError::CurrencyUnavailable(vec!["JPY".to_string()]))
        );
    }

    #[test]
    fn test_trip_without_matches_is_empty() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let t = trip("PLN", vec![], vec![]);
        assert!(pipeline
            .prepare(&t, &ChartFilters::for_catalog(&catalog))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_series() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let mut t = sample_trip();
        let mut extra = in_category(5, "25", "EUR", 2);
        extra.participant_id = Some(2);
        t.components.push(extra);

        let records = pipeline
            .prepare(&t, &ChartFilters::for_catalog(&catalog))
            .unwrap();

        assert_eq!(
            category_series(&records).unwrap(),
            vec![
                ("Accommodation".to_string(), dec("20")),
                ("Entertainment".to_string(), dec("0")),
                ("Transport".to_string(), dec("80")),
                ("Food".to_string(), dec("75")),
            ]
        );
        assert_eq!(
            participant_series(&records).unwrap(),
            vec![
                (ParticipantKey::Shared, dec("20")),
                (ParticipantKey::Id(2), dec("25")),
                (ParticipantKey::Id(1), dec("130")),
            ]
        );
    }

    #[test]
    fn test_adjusted_cost_beyond_decimal_range_is_an_error() {
        let catalog = Catalog::default();
        let table = RateTable::in_memory(CurrencyCode::new("PLN").unwrap());
        table
            .upsert(CurrencyCode::new("JPY").unwrap(), dec("37.59"), Utc::now())
            .unwrap();
        let pipeline = ChartDataPipeline::new(&catalog, RateConverter::from_table(&table));
        let t = trip("JPY", vec![], vec![component(1, "10000000000000000000000000000", "PLN")]);

        let result = pipeline.prepare(&t, &ChartFilters::for_catalog(&catalog));
        assert!(matches!(result, Err(BudgetError::AmountOverflow(_))), "{result:?}");
    }

    #[test]
    fn test_series_beyond_decimal_range_is_an_error() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let t = trip(
            "PLN",
            vec![],
            vec![
                component(1, "50000000000000000000000000000", "PLN"),
                component(2, "50000000000000000000000000000", "PLN"),
            ],
        );

        let records = pipeline
            .prepare(&t, &ChartFilters::for_catalog(&catalog))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(category_series(&records), Err(BudgetError::AmountOverflow(_))));
        assert!(matches!(participant_series(&records), Err(BudgetError::AmountOverflow(_))));
    }

    #[test]
    fn test_record_serializes_for_renderers() {
        let catalog = Catalog::default();
        let pipeline = ChartDataPipeline::new(&catalog, converter());
        let t = trip("PLN", vec![], vec![component(7, "12.50", "PLN")]);
        let records = pipeline
            .prepare(&t, &ChartFilters::for_catalog(&catalog))
            .unwrap();

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["component_id"], 7);
        assert_eq!(json["currency"], "PLN");
        assert_eq!(json["category_name"], "Accommodation");
        assert!(json["participant_id"].is_null());
    }
}
