use crate::errors::AppError;
use crate::models::{ProbabilityDistribution, RiskLabel, ScoringResponse};
use crate::payload::SchemaVariant;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the predicted tier in a tabular response row.
pub const PREDICTED_LABEL_FIELD: &str = "predictedLabel";

/// Field carrying the `[high, medium, low]` probability vector in a tabular response row.
pub const PROBABILITY_FIELD: &str = "probability";

/// Flat schema response: `{"result": {"predictions": ["High", ...]}}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlatScoringResponse {
    pub result: FlatResult,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlatResult {
    pub predictions: Vec<Value>,
}

/// Tabular schema response: `{"predictions": [{"fields": [...], "values": [[...]]}]}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TabularScoringResponse {
    pub predictions: Vec<TabularPrediction>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TabularPrediction {
    pub fields: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

impl TabularPrediction {
    /// Zips `fields` with the first `values` row.
    ///
    /// A length mismatch would silently shift every column, so it is rejected.
    pub fn first_row(&self) -> Result<Map<String, Value>, AppError> {
        let row = self.values.first().ok_or_else(|| {
            AppError::MalformedResponseError("tabular prediction has no value rows".to_string())
        })?;

        if row.len() != self.fields.len() {
            return Err(AppError::MalformedResponseError(format!(
                "tabular prediction has {} fields but {} values",
                self.fields.len(),
                row.len()
            )));
        }

        Ok(self
            .fields
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect())
    }
}

/// Interprets a raw scoring response according to the schema variant in use.
pub fn parse_response(raw: &Value, variant: SchemaVariant) -> Result<ScoringResponse, AppError> {
    match variant {
        SchemaVariant::Flat => parse_flat(raw),
        SchemaVariant::Tabular => parse_tabular(raw),
    }
}

fn parse_flat(raw: &Value) -> Result<ScoringResponse, AppError> {
    let response: FlatScoringResponse = serde_json::from_value(raw.clone()).map_err(|e| {
        AppError::MalformedResponseError(format!("unexpected flat response shape: {}", e))
    })?;

    let first = response.result.predictions.first().ok_or_else(|| {
        AppError::MalformedResponseError("flat response has no predictions".to_string())
    })?;

    Ok(ScoringResponse {
        risk_label: parse_label(first)?,
        probability_distribution: None,
    })
}

fn parse_tabular(raw: &Value) -> Result<ScoringResponse, AppError> {
    let response: TabularScoringResponse = serde_json::from_value(raw.clone()).map_err(|e| {
        AppError::MalformedResponseError(format!("unexpected tabular response shape: {}", e))
    })?;

    let prediction = response.predictions.first().ok_or_else(|| {
        AppError::MalformedResponseError("tabular response has no predictions".to_string())
    })?;

    let row = prediction.first_row()?;

    let label = row.get(PREDICTED_LABEL_FIELD).ok_or_else(|| {
        AppError::MalformedResponseError(format!("missing '{}' field", PREDICTED_LABEL_FIELD))
    })?;
    let probability = row.get(PROBABILITY_FIELD).ok_or_else(|| {
        AppError::MalformedResponseError(format!("missing '{}' field", PROBABILITY_FIELD))
    })?;

    Ok(ScoringResponse {
        risk_label: parse_label(label)?,
        probability_distribution: Some(ProbabilityDistribution::from_positional(
            parse_probability(probability)?,
        )),
    })
}

fn parse_label(value: &Value) -> Result<RiskLabel, AppError> {
    let text = value.as_str().ok_or_else(|| {
        AppError::MalformedResponseError(format!("risk label is not a string: {}", value))
    })?;

    RiskLabel::parse(text).ok_or_else(|| {
        AppError::MalformedResponseError(format!("unknown risk label '{}'", text))
    })
}

fn parse_probability(value: &Value) -> Result<[f64; 3], AppError> {
    let items = value.as_array().ok_or_else(|| {
        AppError::MalformedResponseError(format!(
            "'{}' is not an array: {}",
            PROBABILITY_FIELD, value
        ))
    })?;

    if items.len() != 3 {
        return Err(AppError::MalformedResponseError(format!(
            "'{}' has {} elements, expected 3",
            PROBABILITY_FIELD,
            items.len()
        )));
    }

    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        let p = item.as_f64().ok_or_else(|| {
            AppError::MalformedResponseError(format!(
                "'{}' element is not a number: {}",
                PROBABILITY_FIELD, item
            ))
        })?;
        if !(0.0..=1.0).contains(&p) {
            return Err(AppError::MalformedResponseError(format!(
                "'{}' element {} is outside [0, 1]",
                PROBABILITY_FIELD, p
            )));
        }
        *slot = p;
    }

    Ok(out)
}
