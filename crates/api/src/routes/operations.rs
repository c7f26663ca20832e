//! Operation history routes.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::SecondsFormat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use wallets_core::ledger::{LedgerEntry, LedgerStore, OperationType, OperationsFilter};
use wallets_shared::AppError;
use wallets_shared::types::from_minor_units;

use crate::{AppState, error::ApiError};

const CSV_HEADER: [&str; 5] = ["wallet", "amount", "type", "other_wallet", "timestamp"];

/// Creates the history routes.
pub fn routes<S: LedgerStore + 'static>() -> Router<AppState<S>> {
    Router::new().route("/wallets/operations", get(list_operations::<S>))
}

/// Query parameters for the operation history.
///
/// Numbers arrive as strings so an empty value can mean "not set".
#[derive(Debug, Default, Deserialize)]
pub struct OperationsParams {
    /// Wallet name.
    pub wallet: Option<String>,
    /// `deposit` or `withdrawal`.
    #[serde(rename = "type")]
    pub operation_type: Option<String>,
    /// Inclusive lower bound, epoch seconds.
    pub start_date: Option<String>,
    /// Inclusive upper bound, epoch seconds.
    pub end_date: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Entries to skip.
    pub offset: Option<String>,
    /// `json` (default) or `csv`.
    pub format: Option<String>,
}

/// Output encoding of the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// `{"operations": [...]}`
    Json,
    /// `text/csv` with a header row.
    Csv,
}

/// Response for one operation.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    /// Wallet whose balance changed.
    pub wallet: String,
    /// Amount as a decimal string.
    pub amount: Decimal,
    /// `deposit` or `withdrawal`.
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    /// The other wallet involved.
    pub other_wallet: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

impl From<LedgerEntry> for OperationResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            wallet: entry.wallet,
            amount: from_minor_units(entry.amount),
            operation_type: entry.operation_type,
            other_wallet: entry.counterparty,
            timestamp: entry.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: Option<String>) -> Result<Option<i64>, ApiError> {
    non_empty(value)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| ApiError::bad_request(format!("failed to parse {name}")))
        })
        .transpose()
}

impl OperationsParams {
    /// Splits the parameters into a ledger filter and an output format.
    ///
    /// # Errors
    ///
    /// Returns `400` for a malformed number or an unknown format.
    pub fn into_filter(self) -> Result<(OperationsFilter, ExportFormat), ApiError> {
        let format = match non_empty(self.format).as_deref() {
            None | Some("json") => ExportFormat::Json,
            Some("csv") => ExportFormat::Csv,
            Some(other) => {
                return Err(ApiError::bad_request(format!("unsupported format: {other}")));
            }
        };

        let filter = OperationsFilter {
            wallet: self.wallet.unwrap_or_default(),
            operation_type: non_empty(self.operation_type),
            start_date: parse_number("start_date", self.start_date)?,
            end_date: parse_number("end_date", self.end_date)?,
            limit: parse_number("limit", self.limit)?,
            offset: parse_number("offset", self.offset)?,
        };

        Ok((filter, format))
    }
}

/// Encodes operations as CSV. The header row is always present.
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn to_csv(operations: &[OperationResponse]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for op in operations {
        let amount = op.amount.to_string();
        writer.write_record([
            op.wallet.as_str(),
            amount.as_str(),
            op.operation_type.as_str(),
            op.other_wallet.as_str(),
            op.timestamp.as_str(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// GET `/wallets/operations` - A wallet's operation history.
async fn list_operations<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    params: Result<Query<OperationsParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let (filter, format) = params.into_filter()?;

    let operations: Vec<OperationResponse> = state
        .queries
        .get_operations(&filter)
        .await?
        .into_iter()
        .map(OperationResponse::from)
        .collect();

    match format {
        ExportFormat::Json => {
            Ok((StatusCode::OK, Json(json!({ "operations": operations }))).into_response())
        }
        ExportFormat::Csv => {
            let body = to_csv(&operations).map_err(|e| {
                error!(error = %e, "Failed to encode operations as CSV");
                ApiError(AppError::Internal("An error occurred".to_string()))
            })?;
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response())
        }
    }
}
