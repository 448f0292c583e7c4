//! JSON request and response bodies of the HTTP server
use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::field::{Field, FieldType};
use crate::filter::{EvalContext, FilterGroup, FilterOperator};
use crate::row::Row;
use crate::summary::{get_available_metrics, SummaryMetric};
use crate::view::ViewConfig;

/// Body of `POST /views/compute`
#[derive(Debug, Deserialize)]
pub struct ComputeRequest {
    pub rows: Vec<Row>,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub config: ViewConfig,
    /// Defaults to today on the server clock with nobody signed in
    #[serde(default)]
    pub context: EvalContext,
}

/// Body of `POST /filters/parse`
#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub query: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub filter: FilterGroup,
    pub rule_count: usize,
}

/// What a field type supports, for building filter and footer menus.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub field_type: FieldType,
    pub operators: &'static [FilterOperator],
    pub metrics: &'static [SummaryMetric],
}

impl Capabilities {
    pub fn of(field_type: FieldType) -> Self {
        Capabilities {
            field_type,
            operators: FilterOperator::operators_for(field_type),
            metrics: get_available_metrics(field_type),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            position: None,
        }
    }
}

impl From<&ViewError> for ErrorResponse {
    fn from(err: &ViewError) -> Self {
        let position = match err {
            ViewError::Query { position, .. } => Some(*position),
            _ => None,
        };
        ErrorResponse {
            error: err.to_string(),
            position,
        }
    }
}
