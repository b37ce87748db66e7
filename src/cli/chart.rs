use super::{explain, ui};
use crate::core::aggregate::checked_sum;
use crate::core::catalog::Catalog;
use crate::core::chart::{
    ChartDataPipeline, ChartFilters, ChartRecord, category_series, participant_series,
};
use crate::core::config::AppConfig;
use crate::core::converter::RateConverter;
use crate::core::model::{ParticipantKey, Trip, TripId};
use crate::core::rates::RateTable;
use anyhow::{Context, Result, bail};
use comfy_table::Cell;
use rust_decimal::Decimal;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArgs {
    pub trip: TripId,
    /// Empty selects every category in the catalog.
    pub categories: Vec<String>,
    pub participants: Vec<ParticipantKey>,
    pub include_free: bool,
    pub json: bool,
}

impl ChartArgs {
    pub fn filters(&self, catalog: &Catalog) -> Result<ChartFilters> {
        let mut filters = ChartFilters::for_catalog(catalog);
        filters.include_free = self.include_free;
        filters.participants = self.participants.iter().copied().collect();

        if !self.categories.is_empty() {
            let known = catalog.category_names();
            let mut chosen = std::collections::BTreeSet::new();
            for wanted in &self.categories {
                match known.iter().find(|name| name.eq_ignore_ascii_case(wanted)) {
                    Some(name) => chosen.insert(name.clone()),
                    None => bail!(
                        "Unknown category \"{wanted}\"; expected one of: {}",
                        known.join(", ")
                    ),
                };
            }
            filters.categories = chosen;
        }
        Ok(filters)
    }
}

fn render_series<L: AsRef<str>>(
    title: &str,
    series: &[(L, Decimal)],
    currency: &str,
) -> Result<String> {
    let total = checked_sum(series.iter().map(|(_, v)| *v)).map_err(explain)?;
    let max = series.iter().map(|(_, v)| *v).max().unwrap_or_default();
    let label_width = series
        .iter()
        .map(|(l, _)| l.as_ref().chars().count())
        .max()
        .unwrap_or(0);

    let bar_width = BAR_WIDTH;

    let mut output = ui::style_text(title, ui::StyleType::TotalLabel);
    for (label, value) in series {
        let share = if total.is_zero() {
            Decimal::ZERO
        } else {
            value
                .checked_div(total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or_default()
                .round_dp(1)
        };
        output.push_str(&format!(
            "\n  {:<label_width$}  {:<bar_width$}  {:.2} {currency} ({share:.1}%)",
            label.as_ref(),
            ui::bar(*value, max, BAR_WIDTH),
            value,
        ));
    }
    Ok(output)
}

pub fn display_chart(trip: &Trip, records: &[ChartRecord]) -> Result<String> {
    let currency = trip.preferred_currency.as_str();
    let mut output = format!(
        "Trip: {}\n\n",
        ui::style_text(&trip.name, ui::StyleType::Title)
    );

    if records.is_empty() {
        output.push_str(&ui::style_text(
            "No components match the selected filters",
            ui::StyleType::Subtle,
        ));
        return Ok(output);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Component"),
        ui::header_cell("Category"),
        ui::header_cell("Type"),
        ui::header_cell("Cost"),
        ui::header_cell(&format!("Cost ({currency})")),
        ui::header_cell("Dates"),
    ]);
    for record in records {
        let dates = match (record.start_date, record.end_date) {
            (Some(start), Some(end)) => Some(format!("{start} - {end}")),
            (Some(start), None) => Some(start.to_string()),
            (None, Some(end)) => Some(format!("until {end}")),
            (None, None) => None,
        };
        table.add_row(vec![
            Cell::new(&record.component_name),
            Cell::new(&record.category_name),
            Cell::new(&record.type_name),
            Cell::new(format!("{:.2} {}", record.base_cost, record.currency)),
            ui::money_cell(record.adjusted_cost),
            ui::format_optional_cell(dates, |d| d),
        ]);
    }
    output.push_str(&table.to_string());

    let by_participant: Vec<(String, Decimal)> = participant_series(records)
        .map_err(explain)?
        .into_iter()
        .map(|(key, value)| (trip.participant_label(key), value))
        .collect();

    output.push_str("\n\n");
    let by_category = category_series(records).map_err(explain)?;
    output.push_str(&render_series("By category", &by_category, currency)?);
    output.push_str("\n\n");
    output.push_str(&render_series("By participant", &by_participant, currency)?);
    Ok(output)
}

pub fn run(config: &AppConfig, table: &RateTable, args: &ChartArgs) -> Result<()> {
    let trip = config.trip(args.trip)?;
    let catalog = config.catalog();
    let filters = args.filters(&catalog)?;

    let pipeline = ChartDataPipeline::new(&catalog, RateConverter::from_table(table));
    let records = pipeline.prepare(&trip, &filters).map_err(explain)?;

    if args.json {
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize chart records")?;
        println!("{json}");
    } else {
        println!("{}", display_chart(&trip, &records)?);
    }
    Ok(())
}
