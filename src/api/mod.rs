use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    CarryoverPath, ConversionPoint, ConversionSweepConfig, EstimateInputs, FederalResult,
    FilerAges, IncomeSnapshot, StateResult, TaxYearTable, run_estimate, sweep_roth_conversions,
    validate_inputs,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCarryoverPath {
    Gains,
    OrdinaryIncome,
}

impl From<CliCarryoverPath> for CarryoverPath {
    fn from(value: CliCarryoverPath) -> Self {
        match value {
            CliCarryoverPath::Gains => CarryoverPath::Gains,
            CliCarryoverPath::OrdinaryIncome => CarryoverPath::OrdinaryIncome,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCarryoverPath {
    Gains,
    #[serde(alias = "ordinaryIncome", alias = "ordinary_income")]
    OrdinaryIncome,
}

impl From<ApiCarryoverPath> for CliCarryoverPath {
    fn from(value: ApiCarryoverPath) -> Self {
        match value {
            ApiCarryoverPath::Gains => CliCarryoverPath::Gains,
            ApiCarryoverPath::OrdinaryIncome => CliCarryoverPath::OrdinaryIncome,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EstimatePayload {
    #[serde(alias = "age1", alias = "age_1")]
    age_one: Option<u32>,
    #[serde(alias = "age2", alias = "age_2")]
    age_two: Option<u32>,

    #[serde(alias = "IRA Withdrawals")]
    ira_withdrawals: Option<f64>,
    #[serde(alias = "Roth Conversions")]
    roth_conversions: Option<f64>,
    #[serde(alias = "Pension")]
    pension: Option<f64>,
    #[serde(alias = "TSP")]
    tsp: Option<f64>,
    #[serde(alias = "Annuity")]
    annuity: Option<f64>,
    #[serde(alias = "Interest")]
    interest: Option<f64>,
    #[serde(alias = "Ordinary Dividends")]
    ordinary_dividends: Option<f64>,
    #[serde(alias = "Qualified Dividends")]
    qualified_dividends: Option<f64>,
    #[serde(alias = "Capital Gains")]
    capital_gains: Option<f64>,
    #[serde(alias = "Social Security")]
    social_security: Option<f64>,

    #[serde(alias = "Capital Loss Carryover")]
    capital_loss_carryover: Option<f64>,
    pso_eligible: Option<bool>,
    #[serde(alias = "Resident Tax Credit")]
    resident_tax_credit: Option<f64>,
    carryover_path: Option<ApiCarryoverPath>,

    tax_year: Option<u16>,
    include_state: Option<bool>,
    include_conversion_curve: Option<bool>,
    max_conversion: Option<f64>,
    conversion_step: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "taxcast",
    about = "Married-filing-jointly federal + state income tax estimator with a Roth conversion sweep"
)]
struct Cli {
    #[arg(long, default_value_t = 64)]
    age_one: u32,
    #[arg(long, default_value_t = 60)]
    age_two: u32,
    #[arg(long, default_value_t = 0.0)]
    ira_withdrawals: f64,
    #[arg(long, default_value_t = 0.0)]
    roth_conversions: f64,
    #[arg(long, default_value_t = 0.0)]
    pension: f64,
    #[arg(long, default_value_t = 0.0)]
    tsp: f64,
    #[arg(long, default_value_t = 0.0)]
    annuity: f64,
    #[arg(long, default_value_t = 0.0)]
    interest: f64,
    #[arg(long, default_value_t = 0.0)]
    ordinary_dividends: f64,
    #[arg(long, default_value_t = 0.0)]
    qualified_dividends: f64,
    #[arg(long, default_value_t = 0.0)]
    capital_gains: f64,
    #[arg(long, default_value_t = 0.0)]
    social_security: f64,
    #[arg(long, default_value_t = 0.0)]
    capital_loss_carryover: f64,
    #[arg(long, help = "Apply the public-safety-officer pension/annuity exclusion")]
    pso_eligible: bool,
    #[arg(long, default_value_t = 0.0)]
    resident_tax_credit: f64,
    #[arg(long, value_enum, default_value_t = CliCarryoverPath::Gains)]
    carryover_path: CliCarryoverPath,
    #[arg(long, default_value_t = 2025, help = "Bracket-table tax year")]
    tax_year: u16,
    #[arg(long, help = "Omit the state tax summary from the output")]
    skip_state: bool,
    #[arg(long, help = "Omit the Roth conversion curve from the output")]
    skip_conversion_curve: bool,
    #[arg(long, default_value_t = 100_000.0, help = "Conversion sweep ceiling")]
    max_conversion: f64,
    #[arg(long, default_value_t = 5_000.0, help = "Conversion sweep increment")]
    conversion_step: f64,
}

#[derive(Copy, Clone, Debug)]
struct ApiOptions {
    include_state: bool,
    include_conversion_curve: bool,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: EstimateInputs,
    table: TaxYearTable,
    sweep: ConversionSweepConfig,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResponse {
    tax_year: u16,
    federal: FederalResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<StateResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversion_curve: Option<Vec<ConversionPoint>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    let inputs = EstimateInputs {
        income: IncomeSnapshot {
            ira_withdrawals: cli.ira_withdrawals,
            roth_conversions: cli.roth_conversions,
            pension: cli.pension,
            tsp: cli.tsp,
            annuity: cli.annuity,
            interest: cli.interest,
            ordinary_dividends: cli.ordinary_dividends,
            qualified_dividends: cli.qualified_dividends,
            capital_gains: cli.capital_gains,
            social_security: cli.social_security,
        },
        ages: FilerAges {
            filer_one: cli.age_one,
            filer_two: cli.age_two,
        },
        capital_loss_carryover: cli.capital_loss_carryover,
        pso_eligible: cli.pso_eligible,
        resident_tax_credit: cli.resident_tax_credit,
        carryover_path: cli.carryover_path.into(),
    };
    validate_inputs(&inputs)?;
    let table = TaxYearTable::for_year(cli.tax_year)?;

    Ok(ApiRequest {
        inputs,
        table,
        sweep: ConversionSweepConfig {
            max_conversion: cli.max_conversion,
            step: cli.conversion_step,
        },
        options: ApiOptions {
            include_state: !cli.skip_state,
            include_conversion_curve: !cli.skip_conversion_curve,
        },
    })
}

fn build_response(request: &ApiRequest) -> Result<EstimateResponse, String> {
    let outcome = run_estimate(&request.inputs, &request.table)?;
    let conversion_curve = if request.options.include_conversion_curve {
        Some(sweep_roth_conversions(
            &request.inputs,
            request.sweep,
            &request.table,
        )?)
    } else {
        None
    };

    Ok(EstimateResponse {
        tax_year: request.table.year,
        federal: outcome.federal,
        state: request.options.include_state.then_some(outcome.state),
        conversion_curve,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/estimate",
            get(estimate_get_handler).post(estimate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("taxcast HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/estimate");

    axum::serve(listener, app).await
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };
    let request = build_request(cli)?;
    let response = build_response(&request)?;
    serde_json::to_string_pretty(&response)
        .map_err(|e| format!("Failed to serialize response: {e}"))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn estimate_get_handler(Query(payload): Query<EstimatePayload>) -> Response {
    estimate_handler_impl(payload).await
}

async fn estimate_post_handler(Json(payload): Json<EstimatePayload>) -> Response {
    estimate_handler_impl(payload).await
}

async fn estimate_handler_impl(payload: EstimatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match build_response(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<EstimatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: EstimatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.age_one {
        cli.age_one = v;
    }
    if let Some(v) = payload.age_two {
        cli.age_two = v;
    }

    if let Some(v) = payload.ira_withdrawals {
        cli.ira_withdrawals = v;
    }
    if let Some(v) = payload.roth_conversions {
        cli.roth_conversions = v;
    }
    if let Some(v) = payload.pension {
        cli.pension = v;
    }
    if let Some(v) = payload.tsp {
        cli.tsp = v;
    }
    if let Some(v) = payload.annuity {
        cli.annuity = v;
    }
    if let Some(v) = payload.interest {
        cli.interest = v;
    }
    if let Some(v) = payload.ordinary_dividends {
        cli.ordinary_dividends = v;
    }
    if let Some(v) = payload.qualified_dividends {
        cli.qualified_dividends = v;
    }
    if let Some(v) = payload.capital_gains {
        cli.capital_gains = v;
    }
    if let Some(v) = payload.social_security {
        cli.social_security = v;
    }

    if let Some(v) = payload.capital_loss_carryover {
        cli.capital_loss_carryover = v;
    }
    if let Some(v) = payload.pso_eligible {
        cli.pso_eligible = v;
    }
    if let Some(v) = payload.resident_tax_credit {
        cli.resident_tax_credit = v;
    }
    if let Some(v) = payload.carryover_path {
        cli.carryover_path = v.into();
    }
    if let Some(v) = payload.tax_year {
        cli.tax_year = v;
    }

    if let Some(v) = payload.include_state {
        cli.skip_state = !v;
    }
    if let Some(v) = payload.include_conversion_curve {
        cli.skip_conversion_curve = !v;
    }
    if let Some(v) = payload.max_conversion {
        cli.max_conversion = v;
    }
    if let Some(v) = payload.conversion_step {
        cli.conversion_step = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        age_one: 64,
        age_two: 60,
        ira_withdrawals: 0.0,
        roth_conversions: 0.0,
        pension: 0.0,
        tsp: 0.0,
        annuity: 0.0,
        interest: 0.0,
        ordinary_dividends: 0.0,
        qualified_dividends: 0.0,
        capital_gains: 0.0,
        social_security: 0.0,
        capital_loss_carryover: 0.0,
        pso_eligible: false,
        resident_tax_credit: 0.0,
        carryover_path: CliCarryoverPath::Gains,
        tax_year: 2025,
        skip_state: false,
        skip_conversion_curve: false,
        max_conversion: 100_000.0,
        conversion_step: 5_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_request_accepts_sparse_defaults() {
        let request = build_request(sample_cli()).expect("defaults must be valid");
        assert_approx(request.inputs.income.total(), 0.0);
        assert_eq!(request.inputs.ages.filer_one, 64);
        assert!(request.options.include_state);
        assert!(request.options.include_conversion_curve);
    }

    #[test]
    fn build_request_rejects_negative_income() {
        let mut cli = sample_cli();
        cli.interest = -1.0;
        let err = build_request(cli).expect_err("must reject negative interest");
        assert!(err.contains("Interest"));
    }

    #[test]
    fn api_request_from_json_parses_camel_case_keys() {
        let json = r#"{
          "age1": 65,
          "age2": 66,
          "iraWithdrawals": 30000,
          "qualifiedDividends": 5000,
          "capitalGains": 10000,
          "socialSecurity": 40000,
          "capitalLossCarryover": 2500,
          "psoEligible": true,
          "carryoverPath": "ordinary-income",
          "includeState": false,
          "maxConversion": 20000,
          "conversionStep": 4000
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_eq!(request.inputs.ages.filer_one, 65);
        assert_eq!(request.inputs.ages.filer_two, 66);
        assert_approx(request.inputs.income.ira_withdrawals, 30_000.0);
        assert_approx(request.inputs.income.qualified_dividends, 5_000.0);
        assert_approx(request.inputs.income.capital_gains, 10_000.0);
        assert_approx(request.inputs.income.social_security, 40_000.0);
        assert_approx(request.inputs.capital_loss_carryover, 2_500.0);
        assert!(request.inputs.pso_eligible);
        assert_eq!(request.inputs.carryover_path, CarryoverPath::OrdinaryIncome);
        assert!(!request.options.include_state);
        assert_approx(request.sweep.max_conversion, 20_000.0);
        assert_approx(request.sweep.step, 4_000.0);
    }

    #[test]
    fn api_request_from_json_parses_legacy_display_names() {
        let json = r#"{
          "IRA Withdrawals": 1000,
          "Roth Conversions": 2000,
          "TSP": 3000,
          "Social Security": 4000,
          "Capital Loss Carryover": 500
        }"#;
        let request = api_request_from_json(json).expect("json should parse");

        assert_approx(request.inputs.income.ira_withdrawals, 1_000.0);
        assert_approx(request.inputs.income.roth_conversions, 2_000.0);
        assert_approx(request.inputs.income.tsp, 3_000.0);
        assert_approx(request.inputs.income.social_security, 4_000.0);
        assert_approx(request.inputs.capital_loss_carryover, 500.0);
    }

    #[test]
    fn api_request_from_json_defaults_missing_categories_to_zero() {
        let request = api_request_from_json("{}").expect("empty payload is valid");
        assert_approx(request.inputs.income.total(), 0.0);
        assert!(request.options.include_conversion_curve);
    }

    #[test]
    fn api_request_from_json_ignores_unknown_categories() {
        let json = r#"{ "Lottery Winnings": 99999, "interest": 100 }"#;
        let request = api_request_from_json(json).expect("unknown keys are ignored");
        assert_approx(request.inputs.income.interest, 100.0);
        assert_approx(request.inputs.income.total(), 100.0);
    }

    #[test]
    fn api_request_from_json_rejects_unsupported_tax_year() {
        let err = api_request_from_json(r#"{ "taxYear": 1999 }"#)
            .expect_err("must reject unshipped tax year");
        assert!(err.contains("tax year 1999"));
    }

    #[test]
    fn api_request_from_json_rejects_negative_amounts() {
        let err = api_request_from_json(r#"{ "pension": -50 }"#)
            .expect_err("must reject negative pension");
        assert!(err.contains("Pension"));
    }

    #[test]
    fn response_serialization_uses_camel_case_fields() {
        let mut cli = sample_cli();
        cli.interest = 60_050.0;
        let request = build_request(cli).expect("valid inputs");
        let response = build_response(&request).expect("estimate must succeed");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"taxYear\":2025"));
        assert!(json.contains("\"totalTax\""));
        assert!(json.contains("\"bracketBreakdown\""));
        assert!(json.contains("\"capitalGainsBreakdown\""));
        assert!(json.contains("\"taxedSocialSecurity\""));
        assert!(json.contains("\"lossCarryoverRemaining\""));
        assert!(json.contains("\"taxDue\""));
        assert!(json.contains("\"conversionCurve\""));
    }

    #[test]
    fn response_omits_sections_when_toggled_off() {
        let mut cli = sample_cli();
        cli.interest = 10_000.0;
        cli.skip_state = true;
        cli.skip_conversion_curve = true;
        let request = build_request(cli).expect("valid inputs");
        let response = build_response(&request).expect("estimate must succeed");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(!json.contains("\"state\""));
        assert!(!json.contains("\"conversionCurve\""));
    }

    #[test]
    fn response_curve_respects_sweep_bounds() {
        let mut cli = sample_cli();
        cli.interest = 10_000.0;
        cli.max_conversion = 10_000.0;
        cli.conversion_step = 2_500.0;
        let request = build_request(cli).expect("valid inputs");
        let response = build_response(&request).expect("estimate must succeed");

        let curve = response.conversion_curve.expect("curve requested");
        assert_eq!(curve.len(), 5);
        assert_approx(curve[4].conversion, 10_000.0);
    }
}
