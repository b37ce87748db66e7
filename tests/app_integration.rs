use chrono::{Duration, Utc};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;
use tripcost::cli::chart::ChartArgs;
use tripcost::cli::summary::SummaryArgs;
use tripcost::core::currency::CurrencyCode;
use tripcost::core::rates::{CurrencyRate, RateTable};
use tripcost::store::RateStore;
use tripcost::store::disk::DiskRateStore;
use tripcost::{AppCommand, run_command};

// Mock rate API
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const RATES_RESPONSE: &str = r#"{
        "success": true,
        "base": "PLN",
        "rates": { "PLN": 1, "EUR": 0.25, "USD": 0.2, "XYZ": -1 }
    }"#;

    pub async fn create_rates_server(status: u16, body: &str, expected_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "PLN"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(expected_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }
}

struct TestEnv {
    data_dir: TempDir,
    config_file: tempfile::NamedTempFile,
}

impl TestEnv {
    fn new(server_uri: &str, freshness_hours: i64) -> Self {
        let data_dir = TempDir::new().expect("Failed to create data dir");
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
currency: "PLN"
data_path: "{}"
rates:
  base_currency: "PLN"
  freshness_hours: {freshness_hours}
providers:
  fxrates:
    base_url: "{server_uri}"
trips:
  - id: 1
    name: "Lisbon"
    currency: "EUR"
    participants:
      - id: 1
        name: "Ana"
    components:
      - id: 1
        name: "Hotel"
        category_id: 1
        type_id: 1
        base_cost: "400"
        currency: "PLN"
      - id: 2
        name: "Flight"
        category_id: 3
        type_id: 11
        participant_id: 1
        base_cost: "50"
        currency: "USD"
      - id: 3
        name: "Tram"
        category_id: 3
        type_id: 15
        base_cost: "0"
        currency: "EUR"
  - id: 2
    name: "Tokyo"
    components:
      - id: 1
        name: "Ryokan"
        category_id: 1
        type_id: 1
        base_cost: "30000"
        currency: "JPY"
"#,
            data_dir.path().display().to_string().replace('\\', "/"),
        );
        fs::write(config_file.path(), config_content).expect("Failed to write config file");
        TestEnv {
            data_dir,
            config_file,
        }
    }

    fn config_path(&self) -> &str {
        self.config_file.path().to_str().unwrap()
    }

    fn stored_rates(&self) -> Vec<CurrencyRate> {
        let store = DiskRateStore::open(self.data_dir.path()).unwrap();
        let table = RateTable::open(CurrencyCode::new("PLN").unwrap(), Arc::new(store)).unwrap();
        table.rates()
    }
}

fn lisbon_summary() -> AppCommand {
    AppCommand::Summary(SummaryArgs {
        trip: Some(1),
        ..SummaryArgs::default()
    })
}

#[test_log::test(tokio::test)]
async fn test_summary_fetches_rates_once_and_persists_them() {
    let server = test_utils::create_rates_server(200, test_utils::RATES_RESPONSE, 1).await;
    let env = TestEnv::new(&server.uri(), 24);

    let result = run_command(lisbon_summary(), Some(env.config_path())).await;
    assert!(result.is_ok(), "Summary failed with: {:?}", result.err());

    // Rates are fresh now, so the second command must not hit the API again.
    let result = run_command(AppCommand::RatesShow, Some(env.config_path())).await;
    assert!(result.is_ok(), "Rates show failed with: {:?}", result.err());

    let rates = env.stored_rates();
    let codes: Vec<&str> = rates.iter().map(|r| r.code.as_str()).collect();
    info!(?codes, "Stored rates");
    assert_eq!(codes, vec!["EUR", "PLN", "USD"]);
}

#[test_log::test(tokio::test)]
async fn test_convert_command() {
    let server = test_utils::create_rates_server(200, test_utils::RATES_RESPONSE, 1).await;
    let env = TestEnv::new(&server.uri(), 24);

    let result = run_command(
        AppCommand::RatesConvert {
            amount: "100".parse().unwrap(),
            from: CurrencyCode::new("USD").unwrap(),
            to: CurrencyCode::new("EUR").unwrap(),
        },
        Some(env.config_path()),
    )
    .await;
    assert!(result.is_ok(), "Convert failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_stale_rates_are_served_when_refresh_fails() {
    let server = test_utils::create_rates_server(500, "unavailable", 1).await;
    let env = TestEnv::new(&server.uri(), 1);

    {
        let store = DiskRateStore::open(env.data_dir.path()).unwrap();
        let old = Utc::now() - Duration::days(3);
        store
            .save_batch(&[
                CurrencyRate::new(CurrencyCode::new("EUR").unwrap(), "0.24".parse().unwrap(), old)
                    .unwrap(),
                CurrencyRate::new(CurrencyCode::new("USD").unwrap(), "0.21".parse().unwrap(), old)
                    .unwrap(),
            ])
            .unwrap();
    }

    let result = run_command(lisbon_summary(), Some(env.config_path())).await;
    assert!(result.is_ok(), "Summary failed with: {:?}", result.err());

    let rates = env.stored_rates();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].rate, "0.24".parse::<rust_decimal::Decimal>().unwrap());
}

#[test_log::test(tokio::test)]
async fn test_failed_refresh_without_rates_is_an_error() {
    let server = test_utils::create_rates_server(500, "unavailable", 1).await;
    let env = TestEnv::new(&server.uri(), 24);

    let result = run_command(lisbon_summary(), Some(env.config_path())).await;
    let err = result.expect_err("Summary should fail without any rates");
    let message = format!("{err:#}");
    assert!(message.contains("No exchange rates available"), "{message}");
    assert!(message.contains("HTTP error: 500"), "{message}");
}

#[test_log::test(tokio::test)]
async fn test_chart_with_unknown_currency_names_it() {
    let server = test_utils::create_rates_server(200, test_utils::RATES_RESPONSE, 1).await;
    let env = TestEnv::new(&server.uri(), 24);

    let result = run_command(
        AppCommand::Chart(ChartArgs {
            trip: 2,
            categories: vec![],
            participants: vec![],
            include_free: true,
            json: true,
        }),
        Some(env.config_path()),
    )
    .await;
    let message = format!("{:#}", result.expect_err("JPY has no rate"));
    assert!(message.contains("Currency unavailable: JPY"), "{message}");
    assert!(message.contains("tripcost rates refresh"), "{message}");
}

#[test_log::test(tokio::test)]
async fn test_chart_and_forced_refresh() {
    let server = test_utils::create_rates_server(200, test_utils::RATES_RESPONSE, 2).await;
    let env = TestEnv::new(&server.uri(), 24);

    let result = run_command(
        AppCommand::Chart(ChartArgs {
            trip: 1,
            categories: vec!["transport".to_string()],
            participants: vec![],
            include_free: false,
            json: false,
        }),
        Some(env.config_path()),
    )
    .await;
    assert!(result.is_ok(), "Chart failed with: {:?}", result.err());

    let result = run_command(
        AppCommand::RatesRefresh { force: true },
        Some(env.config_path()),
    )
    .await;
    assert!(result.is_ok(), "Refresh failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_missing_trip_is_reported() {
    let server = test_utils::create_rates_server(200, test_utils::RATES_RESPONSE, 1).await;
    let env = TestEnv::new(&server.uri(), 24);

    let result = run_command(
        AppCommand::Summary(SummaryArgs {
            trip: Some(42),
            ..SummaryArgs::default()
        }),
        Some(env.config_path()),
    )
    .await;
    let message = format!("{:#}", result.expect_err("trip 42 does not exist"));
    assert!(message.contains("Trip 42 not found"), "{message}");
}
