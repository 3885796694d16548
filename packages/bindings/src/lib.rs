use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use fair_value_core::scenarios::sensitivity;
use fair_value_core::valuation::{comps, dcf, growth, wacc};
use fair_value_core::FairValueResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// JSON in, JSON out: parse the input, run the calculator, serialise the envelope.
fn run_json<I, O>(
    input_json: &str,
    calc: impl FnOnce(&I) -> FairValueResult<O>,
) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = calc(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_dcf(input_json: String) -> NapiResult<String> {
    run_json(&input_json, dcf::calculate_dcf)
}

#[napi]
pub fn comps_analysis(input_json: String) -> NapiResult<String> {
    run_json(&input_json, comps::calculate_comps)
}

#[napi]
pub fn estimate_growth(input_json: String) -> NapiResult<String> {
    run_json(&input_json, growth::estimate_growth_rate)
}

#[napi]
pub fn calculate_wacc(input_json: String) -> NapiResult<String> {
    run_json(&input_json, wacc::calculate_wacc)
}

#[napi]
pub fn dcf_sensitivity(input_json: String) -> NapiResult<String> {
    run_json(&input_json, sensitivity::dcf_sensitivity)
}
