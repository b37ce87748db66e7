use super::{explain, ui};
use crate::core::aggregate::{CostAggregator, CostBreakdown, CostFilter};
use crate::core::config::AppConfig;
use crate::core::converter::RateConverter;
use crate::core::model::{ParticipantKey, Trip, TripId};
use crate::core::rates::RateTable;
use anyhow::Result;
use comfy_table::Cell;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryArgs {
    pub trip: Option<TripId>,
    pub include_inactive: bool,
    pub participants: Vec<ParticipantKey>,
    pub exclude_free: bool,
}

impl SummaryArgs {
    pub fn filter(&self) -> CostFilter {
        CostFilter {
            active_only: !self.include_inactive,
            participants: self.participants.iter().copied().collect(),
            include_zero_cost: !self.exclude_free,
        }
    }
}

pub fn display_breakdown(trip: &Trip, breakdown: &CostBreakdown) -> String {
    let currency = breakdown.currency.as_str();
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Component"),
        ui::header_cell("Paid by"),
        ui::header_cell("Cost"),
        ui::header_cell(&format!("Cost ({currency})")),
        ui::header_cell("Share (%)"),
    ]);

    for line in &breakdown.lines {
        table.add_row(vec![
            Cell::new(&line.name),
            Cell::new(trip.participant_label(line.participant)),
            Cell::new(format!("{:.2} {}", line.base_cost, line.currency)),
            ui::money_cell(line.converted),
            ui::money_cell(line.share),
        ]);
    }

    let mut output = format!(
        "Trip: {}\n\n",
        ui::style_text(&trip.name, ui::StyleType::Title)
    );

    if breakdown.lines.is_empty() {
        output.push_str(&ui::style_text("No matching components", ui::StyleType::Subtle));
    } else {
        output.push_str(&table.to_string());
    }

    output.push_str(&format!(
        "\n\nTotal Cost ({}): {}",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(&breakdown.total.to_string(), ui::StyleType::TotalValue)
    ));
    output
}

pub fn run(config: &AppConfig, table: &RateTable, args: &SummaryArgs) -> Result<()> {
    let trips = match args.trip {
        Some(id) => vec![config.trip(id)?],
        None => config.trips()?,
    };
    if trips.is_empty() {
        println!("No trips configured. Add one to the `trips` section of your config.");
        return Ok(());
    }

    let aggregator = CostAggregator::new(RateConverter::from_table(table));
    let filter = args.filter();

    let num_trips = trips.len();
    for (i, trip) in trips.iter().enumerate() {
        let breakdown = aggregator.breakdown(trip, &filter).map_err(explain)?;
        println!("{}", display_breakdown(trip, &breakdown));
        if i < num_trips - 1 {
            ui::print_separator();
        }
    }
    Ok(())
}
