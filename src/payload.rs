//! Wire payload construction for the scoring endpoint.
//!
//! Every wire key the model expects, and the record attribute it is read from,
//! lives in [`FIELDS`]. Both schema variants are generated from that one table,
//! which is what keeps tabular `fields` and `values` positionally aligned.

use crate::errors::AppError;
use crate::models::CustomerRecord;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which request/response shape the scoring endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// `{"args": {"input_json": [record]}}`, answered with a single label.
    Flat,
    /// `{"input_data": [{"fields": [...], "values": [[...]]}]}`, answered with label and probabilities.
    #[default]
    Tabular,
}

impl FromStr for SchemaVariant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(SchemaVariant::Flat),
            "tabular" => Ok(SchemaVariant::Tabular),
            other => Err(AppError::ConfigurationError(format!(
                "unknown scoring schema '{}', expected 'flat' or 'tabular'",
                other
            ))),
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::Flat => f.write_str("flat"),
            SchemaVariant::Tabular => f.write_str("tabular"),
        }
    }
}

/// One row of the renaming table.
pub struct FieldSpec {
    /// Key the remote model expects.
    pub wire_key: &'static str,
    extract: fn(&CustomerRecord) -> Value,
}

impl FieldSpec {
    /// Reads this field from a record as a JSON value.
    pub fn value(&self, record: &CustomerRecord) -> Value {
        (self.extract)(record)
    }
}

/// Renaming table, in the order the model was trained with.
pub static FIELDS: [FieldSpec; 16] = [
    FieldSpec {
        wire_key: "ID",
        extract: |r| Value::from(r.id),
    },
    FieldSpec {
        wire_key: "GENDER",
        extract: |r| Value::from(r.gender.as_str()),
    },
    FieldSpec {
        wire_key: "STATUS",
        extract: |r| Value::from(r.marital_status.as_str()),
    },
    FieldSpec {
        wire_key: "CHILDREN",
        extract: |r| Value::from(r.num_children),
    },
    FieldSpec {
        wire_key: "ESTINCOME",
        extract: |r| Value::from(r.estimated_income),
    },
    FieldSpec {
        wire_key: "HOMEOWNER",
        extract: |r| Value::from(r.is_home_owner.as_str()),
    },
    FieldSpec {
        wire_key: "AGE",
        extract: |r| Value::from(r.age),
    },
    FieldSpec {
        wire_key: "TOTALDOLLARVALUETRADED",
        extract: |r| Value::from(r.total_dollar_value_traded),
    },
    FieldSpec {
        wire_key: "TOTALUNITSTRADED",
        extract: |r| Value::from(r.total_units_traded),
    },
    FieldSpec {
        wire_key: "LARGESTSINGLETRANSACTION",
        extract: |r| Value::from(r.largest_single_transaction),
    },
    FieldSpec {
        wire_key: "SMALLESTSINGLETRANSACTION",
        extract: |r| Value::from(r.smallest_single_transaction),
    },
    FieldSpec {
        wire_key: "PERCENTCHANGECALCULATION",
        extract: |r| Value::from(r.percentage_change_calculation),
    },
    FieldSpec {
        wire_key: "DAYSSINCELASTLOGIN",
        extract: |r| Value::from(r.days_since_last_login),
    },
    FieldSpec {
        wire_key: "DAYSSINCELASTTRADE",
        extract: |r| Value::from(r.days_since_last_trade),
    },
    FieldSpec {
        wire_key: "NETREALIZEDGAINS_YTD",
        extract: |r| Value::from(r.net_realized_gains_ytd),
    },
    FieldSpec {
        wire_key: "NETREALIZEDLOSSES_YTD",
        extract: |r| Value::from(r.net_realized_losses_ytd),
    },
];

/// Builds the JSON body for the configured schema variant.
pub fn build_payload(record: &CustomerRecord, variant: SchemaVariant) -> Value {
    match variant {
        SchemaVariant::Flat => {
            let row: Map<String, Value> = FIELDS
                .iter()
                .map(|spec| (spec.wire_key.to_string(), spec.value(record)))
                .collect();

            json!({
                "args": {
                    "input_json": [row]
                }
            })
        }
        SchemaVariant::Tabular => {
            let (fields, values): (Vec<Value>, Vec<Value>) = FIELDS
                .iter()
                .map(|spec| (Value::from(spec.wire_key), spec.value(record)))
                .unzip();

            json!({
                "input_data": [{
                    "fields": fields,
                    "values": [values]
                }]
            })
        }
    }
}
