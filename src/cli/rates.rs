use super::{explain, ui};
use crate::core::aggregate::round_money;
use crate::core::converter::RateConverter;
use crate::core::currency::{CurrencyCode, RateSupplier};
use crate::core::rates::RateSnapshot;
use crate::core::refresh::{RateRefreshPolicy, RefreshOutcome, RefreshReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use rust_decimal::Decimal;
use tracing::warn;

/// Refreshes stale rates before a conversion.
///
/// When the refresh fails but the table already holds rates, the stale rates
/// are kept and a warning is printed.
pub async fn ensure_fresh(
    policy: &RateRefreshPolicy,
    supplier: &(dyn RateSupplier + Send + Sync),
) -> Result<()> {
    let now = Utc::now();
    if !policy.needs_refresh(now) {
        return Ok(());
    }

    let pb = ui::new_spinner("Fetching exchange rates...");
    let result = policy.refresh(now, supplier).await;
    pb.finish_and_clear();

    match result {
        Ok(RefreshOutcome::Updated(report)) => {
            for rejected in &report.rejected {
                warn!("Skipped rate for {}: {}", rejected.code, rejected.reason);
            }
            Ok(())
        }
        Ok(RefreshOutcome::AlreadyFresh { .. }) => Ok(()),
        Err(e) if !policy.table().is_empty() => {
            warn!("Using stale exchange rates: {e}");
            let message = format!(
                "Warning: could not refresh exchange rates ({e}); using rates from {}",
                describe_age(policy.table().last_refreshed(), now)
            );
            eprintln!("{}", ui::style_text(&message, ui::StyleType::Warning));
            Ok(())
        }
        Err(e) => Err(e).context("No exchange rates available"),
    }
}

fn describe_age(last_refreshed: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last_refreshed {
        None => "never".to_string(),
        Some(ts) => {
            let hours = (now - ts).num_hours();
            format!("{} ({hours}h ago)", ts.format("%Y-%m-%d %H:%M UTC"))
        }
    }
}

pub fn render_rates(snapshot: &RateSnapshot, stale: bool, now: DateTime<Utc>) -> String {
    let base = snapshot.base_currency();
    let mut output = format!(
        "Exchange rates: {}\n\n",
        ui::style_text(&format!("1 {base} ="), ui::StyleType::Title)
    );

    if snapshot.is_empty() {
        output.push_str(&ui::style_text(
            "No rates stored yet. Run `tripcost rates refresh` to fetch them.",
            ui::StyleType::Subtle,
        ));
        return output;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Rate"),
        ui::header_cell("Updated"),
    ]);
    for row in snapshot.rows() {
        table.add_row(vec![
            Cell::new(row.code.as_str()),
            Cell::new(row.rate.normalize().to_string())
                .set_alignment(comfy_table::CellAlignment::Right),
            Cell::new(row.updated_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    output.push_str(&table.to_string());

    let status = if stale {
        ui::style_text("stale", ui::StyleType::Warning)
    } else {
        ui::style_text("fresh", ui::StyleType::TotalValue)
    };
    output.push_str(&format!(
        "\n\nRates stored: {}\nLast refreshed: {} [{status}]",
        snapshot.len(),
        describe_age(snapshot.last_refreshed(), now)
    ));
    output
}

pub fn show(policy: &RateRefreshPolicy) -> Result<()> {
    let now = Utc::now();
    let snapshot = policy.table().snapshot();
    println!("{}", render_rates(&snapshot, policy.needs_refresh(now), now));
    Ok(())
}

pub fn render_report(report: &RefreshReport) -> String {
    let mut output = format!(
        "Exchange rates updated: {} new, {} changed",
        ui::style_text(&report.inserted.len().to_string(), ui::StyleType::TotalValue),
        ui::style_text(&report.updated.len().to_string(), ui::StyleType::TotalValue),
    );
    if !report.rejected.is_empty() {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("Skipped {} invalid rates:", report.rejected.len()),
                ui::StyleType::Warning
            )
        ));
        for rejected in &report.rejected {
            output.push_str(&format!("\n  {}: {}", rejected.code, rejected.reason));
        }
    }
    output
}

pub async fn refresh(
    policy: &RateRefreshPolicy,
    supplier: &(dyn RateSupplier + Send + Sync),
    force: bool,
) -> Result<()> {
    let now = Utc::now();
    let pb = ui::new_spinner("Fetching exchange rates...");
    let result = if force {
        policy.force_refresh(now, supplier).await.map(RefreshOutcome::Updated)
    } else {
        policy.refresh(now, supplier).await
    };
    pb.finish_and_clear();

    match result.context("Failed to refresh exchange rates")? {
        RefreshOutcome::Updated(report) => println!("{}", render_report(&report)),
        RefreshOutcome::AlreadyFresh { last_refreshed } => println!(
            "Exchange rates are already up to date (last refresh {}). Use --force to fetch anyway.",
            last_refreshed.format("%Y-%m-%d %H:%M UTC")
        ),
    }
    Ok(())
}

pub fn render_conversion(
    converter: &RateConverter,
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<String> {
    let rate = converter.rate(from, to).map_err(explain)?;
    let converted = round_money(converter.convert(amount, from, to).map_err(explain)?);
    Ok(format!(
        "{amount:.2} {from} = {} {to} {}",
        ui::style_text(&converted.to_string(), ui::StyleType::TotalValue),
        ui::style_text(
            &format!("(1 {from} = {} {to})", rate.round_dp(6).normalize()),
            ui::StyleType::Subtle
        )
    ))
}

pub fn convert(
    policy: &RateRefreshPolicy,
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
) -> Result<()> {
    let converter = RateConverter::from_table(policy.table());
    println!("{}", render_conversion(&converter, amount, from, to)?);
    Ok(())
}
