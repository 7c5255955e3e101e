use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel sent as `ID`; submissions are anonymous so this is never a real customer key.
pub const CUSTOMER_ID_SENTINEL: i64 = 999;

/// Longest accepted code value (gender, marital status, home owner).
const MAX_CODE_LEN: usize = 32;

/// Upper bound for the age sanity check.
const MAX_AGE: u32 = 120;

/// Names of the HTML form inputs, as posted by the input page.
pub mod form_fields {
    pub const AGE: &str = "Age";
    pub const GENDER: &str = "Gender";
    pub const STATUS: &str = "Status";
    pub const CHILDREN: &str = "Children";
    pub const HOME_OWNER: &str = "Homeowner";
    pub const INCOME: &str = "Income";
    pub const NET_REALIZED_GAINS_YTD: &str = "Netrealizedgainsytd";
    pub const NET_REALIZED_LOSSES_YTD: &str = "Netrealizedlossesytd";
    pub const SMALLEST_SINGLE_TRANSACTION: &str = "Smallestsingletransaction";
    pub const LARGEST_SINGLE_TRANSACTION: &str = "Largestsingletransaction";
    pub const TOTAL_DOLLAR_VALUE_TRADED: &str = "Totaldollarvaluetraded";
    pub const TOTAL_UNITS_TRADED: &str = "Totalunitstraded";
    pub const DAYS_SINCE_LAST_LOGIN: &str = "Dayssincelastlogin";
    pub const DAYS_SINCE_LAST_TRADE: &str = "Dayssincelasttrade";
    pub const PERCENTAGE_CHANGE_CALCULATION: &str = "Percentagechangecalculation";
}

/// Customer attributes, as received from the JSON API or parsed from the form.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub age: u32,
    pub gender: String,
    pub marital_status: String,
    pub num_children: u32,
    pub is_home_owner: String,
    pub estimated_income: f64,
    #[serde(rename = "netRealizedGainsYTD")]
    pub net_realized_gains_ytd: f64,
    #[serde(rename = "netRealizedLossesYTD")]
    pub net_realized_losses_ytd: f64,
    pub smallest_single_transaction: f64,
    pub largest_single_transaction: f64,
    pub total_dollar_value_traded: f64,
    pub total_units_traded: u64,
    pub days_since_last_login: u32,
    pub days_since_last_trade: u32,
    pub percentage_change_calculation: f64,
}

impl CustomerInput {
    /// Parses the raw form submission and applies the record sanity bounds.
    ///
    /// Every missing, unparsable or out-of-range field is reported, not just the
    /// first one, so the user can fix the whole form in one go.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, AppError> {
        use form_fields::*;

        let mut problems = Vec::new();

        let age = take::<u32>(form, AGE, "a whole number", &mut problems);
        if let Some(age) = age {
            check_age(age, &mut problems);
        }
        let gender = take_code(form, GENDER, &mut problems);
        let marital_status = take_code(form, STATUS, &mut problems);
        let num_children = take::<u32>(form, CHILDREN, "a non-negative whole number", &mut problems);
        let is_home_owner = take_code(form, HOME_OWNER, &mut problems);
        let estimated_income = take_amount(form, INCOME, &mut problems);
        let net_realized_gains_ytd = take_amount(form, NET_REALIZED_GAINS_YTD, &mut problems);
        let net_realized_losses_ytd = take_amount(form, NET_REALIZED_LOSSES_YTD, &mut problems);
        let smallest_single_transaction =
            take_amount(form, SMALLEST_SINGLE_TRANSACTION, &mut problems);
        let largest_single_transaction =
            take_amount(form, LARGEST_SINGLE_TRANSACTION, &mut problems);
        let total_dollar_value_traded =
            take_amount(form, TOTAL_DOLLAR_VALUE_TRADED, &mut problems);
        let total_units_traded = take::<u64>(
            form,
            TOTAL_UNITS_TRADED,
            "a non-negative whole number",
            &mut problems,
        );
        let days_since_last_login = take::<u32>(
            form,
            DAYS_SINCE_LAST_LOGIN,
            "a non-negative whole number",
            &mut problems,
        );
        let days_since_last_trade = take::<u32>(
            form,
            DAYS_SINCE_LAST_TRADE,
            "a non-negative whole number",
            &mut problems,
        );
        let percentage_change_calculation =
            take::<f64>(form, PERCENTAGE_CHANGE_CALCULATION, "a number", &mut problems);
        if let Some(change) = percentage_change_calculation {
            check_percentage(change, &mut problems);
        }
        if let (Some(smallest), Some(largest)) =
            (smallest_single_transaction, largest_single_transaction)
        {
            check_transaction_span(smallest, largest, &mut problems);
        }

        match (
            age,
            gender,
            marital_status,
            num_children,
            is_home_owner,
            estimated_income,
            net_realized_gains_ytd,
            net_realized_losses_ytd,
            smallest_single_transaction,
            largest_single_transaction,
            total_dollar_value_traded,
            total_units_traded,
            days_since_last_login,
            days_since_last_trade,
            percentage_change_calculation,
        ) {
            (
                Some(age),
                Some(gender),
                Some(marital_status),
                Some(num_children),
                Some(is_home_owner),
                Some(estimated_income),
                Some(net_realized_gains_ytd),
                Some(net_realized_losses_ytd),
                Some(smallest_single_transaction),
                Some(largest_single_transaction),
                Some(total_dollar_value_traded),
                Some(total_units_traded),
                Some(days_since_last_login),
                Some(days_since_last_trade),
                Some(percentage_change_calculation),
            ) if problems.is_empty() => Ok(Self {
                age,
                gender,
                marital_status,
                num_children,
                is_home_owner,
                estimated_income,
                net_realized_gains_ytd,
                net_realized_losses_ytd,
                smallest_single_transaction,
                largest_single_transaction,
                total_dollar_value_traded,
                total_units_traded,
                days_since_last_login,
                days_since_last_trade,
                percentage_change_calculation,
            }),
            _ => Err(AppError::ValidationError(problems)),
        }
    }
}

fn take_raw<'a>(
    form: &'a HashMap<String, String>,
    name: &str,
    problems: &mut Vec<String>,
) -> Option<&'a str> {
    match form.get(name).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            problems.push(format!("{} is required", name));
            None
        }
    }
}

fn take<T: FromStr>(
    form: &HashMap<String, String>,
    name: &str,
    expected: &str,
    problems: &mut Vec<String>,
) -> Option<T> {
    let raw = take_raw(form, name, problems)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            problems.push(format!("{} must be {}", name, expected));
            None
        }
    }
}

fn take_code(
    form: &HashMap<String, String>,
    name: &str,
    problems: &mut Vec<String>,
) -> Option<String> {
    let raw = take_raw(form, name, problems)?;
    Some(check_code(name, raw, problems))
}

fn take_amount(
    form: &HashMap<String, String>,
    name: &str,
    problems: &mut Vec<String>,
) -> Option<f64> {
    let value = take::<f64>(form, name, "a number", problems)?;
    check_amount(name, value, problems);
    Some(value)
}

/// A validated customer record, built from exactly one submission.
///
/// Fields are only reachable inside the crate so a record can never exist without
/// having gone through [`CustomerRecord::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub(crate) id: i64,
    pub(crate) age: u32,
    pub(crate) gender: String,
    pub(crate) marital_status: String,
    pub(crate) num_children: u32,
    pub(crate) is_home_owner: String,
    pub(crate) estimated_income: f64,
    pub(crate) net_realized_gains_ytd: f64,
    pub(crate) net_realized_losses_ytd: f64,
    pub(crate) smallest_single_transaction: f64,
    pub(crate) largest_single_transaction: f64,
    pub(crate) total_dollar_value_traded: f64,
    pub(crate) total_units_traded: u64,
    pub(crate) days_since_last_login: u32,
    pub(crate) days_since_last_trade: u32,
    pub(crate) percentage_change_calculation: f64,
}

impl CustomerRecord {
    /// Applies the sanity bounds and freezes the input into a record.
    pub fn new(input: CustomerInput) -> Result<Self, AppError> {
        use form_fields::*;

        let mut problems = Vec::new();

        check_age(input.age, &mut problems);

        let gender = check_code(GENDER, &input.gender, &mut problems);
        let marital_status = check_code(STATUS, &input.marital_status, &mut problems);
        let is_home_owner = check_code(HOME_OWNER, &input.is_home_owner, &mut problems);

        for (name, value) in [
            (INCOME, input.estimated_income),
            (NET_REALIZED_GAINS_YTD, input.net_realized_gains_ytd),
            (NET_REALIZED_LOSSES_YTD, input.net_realized_losses_ytd),
            (SMALLEST_SINGLE_TRANSACTION, input.smallest_single_transaction),
            (LARGEST_SINGLE_TRANSACTION, input.largest_single_transaction),
            (TOTAL_DOLLAR_VALUE_TRADED, input.total_dollar_value_traded),
        ] {
            check_amount(name, value, &mut problems);
        }

        check_percentage(input.percentage_change_calculation, &mut problems);
        check_transaction_span(
            input.smallest_single_transaction,
            input.largest_single_transaction,
            &mut problems,
        );

        if !problems.is_empty() {
            return Err(AppError::ValidationError(problems));
        }

        Ok(Self {
            id: CUSTOMER_ID_SENTINEL,
            age: input.age,
            gender,
            marital_status,
            num_children: input.num_children,
            is_home_owner,
            estimated_income: input.estimated_income,
            net_realized_gains_ytd: input.net_realized_gains_ytd,
            net_realized_losses_ytd: input.net_realized_losses_ytd,
            smallest_single_transaction: input.smallest_single_transaction,
            largest_single_transaction: input.largest_single_transaction,
            total_dollar_value_traded: input.total_dollar_value_traded,
            total_units_traded: input.total_units_traded,
            days_since_last_login: input.days_since_last_login,
            days_since_last_trade: input.days_since_last_trade,
            percentage_change_calculation: input.percentage_change_calculation,
        })
    }

    /// Parses and validates a raw form submission in one step.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, AppError> {
        Self::new(CustomerInput::from_form(form)?)
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

impl TryFrom<CustomerInput> for CustomerRecord {
    type Error = AppError;

    fn try_from(input: CustomerInput) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

fn check_age(age: u32, problems: &mut Vec<String>) {
    if age > MAX_AGE {
        problems.push(format!("{} must be at most {}", form_fields::AGE, MAX_AGE));
    }
}

fn check_amount(name: &str, value: f64, problems: &mut Vec<String>) {
    if !value.is_finite() {
        problems.push(format!("{} must be a finite number", name));
    } else if value < 0.0 {
        problems.push(format!("{} must not be negative", name));
    }
}

fn check_percentage(value: f64, problems: &mut Vec<String>) {
    if !value.is_finite() {
        problems.push(format!(
            "{} must be a finite number",
            form_fields::PERCENTAGE_CHANGE_CALCULATION
        ));
    }
}

fn check_transaction_span(smallest: f64, largest: f64, problems: &mut Vec<String>) {
    if largest < smallest {
        problems.push(format!(
            "{} must not be smaller than {}",
            form_fields::LARGEST_SINGLE_TRANSACTION,
            form_fields::SMALLEST_SINGLE_TRANSACTION
        ));
    }
}

fn check_code(name: &str, value: &str, problems: &mut Vec<String>) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        problems.push(format!("{} is required", name));
    } else if trimmed.chars().count() > MAX_CODE_LEN {
        problems.push(format!("{} must be at most {} characters", name, MAX_CODE_LEN));
    }
    trimmed.to_string()
}

/// Churn-risk tier returned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    High,
    Medium,
    Low,
}

impl RiskLabel {
    /// Case-insensitive lookup in the closed label set.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" => Some(RiskLabel::High),
            "medium" => Some(RiskLabel::Medium),
            "low" => Some(RiskLabel::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::High => "high",
            RiskLabel::Medium => "medium",
            RiskLabel::Low => "low",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RiskLabel::High => "High",
            RiskLabel::Medium => "Medium",
            RiskLabel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier percentages (0–100) reported by the tabular schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Medium")]
    pub medium: f64,
    #[serde(rename = "Low")]
    pub low: f64,
}

impl ProbabilityDistribution {
    /// Builds percentages from the model's positional probability vector.
    ///
    /// Index 0 is High, 1 is Medium, 2 is Low. Nothing in the response labels the
    /// positions, so this ordering must not change without the model provider.
    pub fn from_positional(probabilities: [f64; 3]) -> Self {
        let [high, medium, low] = probabilities;
        Self {
            high: high * 100.0,
            medium: medium * 100.0,
            low: low * 100.0,
        }
    }

    pub fn get(&self, label: RiskLabel) -> f64 {
        match label {
            RiskLabel::High => self.high,
            RiskLabel::Medium => self.medium,
            RiskLabel::Low => self.low,
        }
    }
}

/// Normalized outcome of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResponse {
    pub risk_label: RiskLabel,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub probability_distribution: Option<ProbabilityDistribution>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_input() -> CustomerInput {
        CustomerInput {
            age: 42,
            gender: "F".to_string(),
            marital_status: "M".to_string(),
            num_children: 2,
            is_home_owner: "Y".to_string(),
            estimated_income: 85_000.0,
            net_realized_gains_ytd: 1_200.5,
            net_realized_losses_ytd: 300.0,
            smallest_single_transaction: 50.0,
            largest_single_transaction: 9_500.0,
            total_dollar_value_traded: 120_000.0,
            total_units_traded: 640,
            days_since_last_login: 3,
            days_since_last_trade: 12,
            percentage_change_calculation: -4.5,
        }
    }

    pub(crate) fn sample_form() -> HashMap<String, String> {
        use form_fields::*;
        [
            (AGE, "42"),
            (GENDER, "F"),
            (STATUS, "M"),
            (CHILDREN, "2"),
            (HOME_OWNER, "Y"),
            (INCOME, "85000"),
            (NET_REALIZED_GAINS_YTD, "1200.5"),
            (NET_REALIZED_LOSSES_YTD, "300"),
            (SMALLEST_SINGLE_TRANSACTION, "50"),
            (LARGEST_SINGLE_TRANSACTION, "9500"),
            (TOTAL_DOLLAR_VALUE_TRADED, "120000"),
            (TOTAL_UNITS_TRADED, "640"),
            (DAYS_SINCE_LAST_LOGIN, "3"),
            (DAYS_SINCE_LAST_TRADE, "12"),
            (PERCENTAGE_CHANGE_CALCULATION, "-4.5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_form_parses_into_record() {
        let record = CustomerRecord::from_form(&sample_form()).unwrap();
        let expected = CustomerRecord::new(sample_input()).unwrap();
        assert_eq!(record, expected);
        assert_eq!(record.id(), CUSTOMER_ID_SENTINEL);
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut form = sample_form();
        form.remove(form_fields::AGE);
        form.remove(form_fields::INCOME);

        match CustomerRecord::from_form(&form) {
            Err(AppError::ValidationError(problems)) => {
                assert_eq!(problems.len(), 2);
                assert!(problems.contains(&"Age is required".to_string()));
                assert!(problems.contains(&"Income is required".to_string()));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_and_range_problems_reported_together() {
        let mut form = sample_form();
        form.remove(form_fields::AGE);
        form.insert(form_fields::INCOME.to_string(), "-5".to_string());
        form.insert(form_fields::SMALLEST_SINGLE_TRANSACTION.to_string(), "100".to_string());
        form.insert(form_fields::LARGEST_SINGLE_TRANSACTION.to_string(), "10".to_string());

        match CustomerRecord::from_form(&form) {
            Err(AppError::ValidationError(problems)) => {
                assert_eq!(
                    problems,
                    vec![
                        "Age is required".to_string(),
                        "Income must not be negative".to_string(),
                        "Largestsingletransaction must not be smaller than Smallestsingletransaction"
                            .to_string(),
                    ]
                );
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_form_applies_age_and_code_bounds() {
        let mut form = sample_form();
        form.insert(form_fields::AGE.to_string(), "121".to_string());
        form.insert(form_fields::GENDER.to_string(), "X".repeat(MAX_CODE_LEN + 1));
        form.remove(form_fields::CHILDREN);

        match CustomerRecord::from_form(&form) {
            Err(AppError::ValidationError(problems)) => {
                assert_eq!(problems.len(), 3, "{:?}", problems);
                assert!(problems.contains(&"Age must be at most 120".to_string()));
                assert!(problems.contains(&"Gender must be at most 32 characters".to_string()));
                assert!(problems.contains(&"Children is required".to_string()));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_and_negative_counts_rejected() {
        let mut form = sample_form();
        form.insert(form_fields::CHILDREN.to_string(), "-1".to_string());
        form.insert(form_fields::INCOME.to_string(), "lots".to_string());

        match CustomerRecord::from_form(&form) {
            Err(AppError::ValidationError(problems)) => {
                assert_eq!(
                    problems,
                    vec![
                        "Children must be a non-negative whole number".to_string(),
                        "Income must be a number".to_string(),
                    ]
                );
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_sanity_bounds() {
        let mut input = sample_input();
        input.age = 300;
        input.estimated_income = -1.0;
        input.smallest_single_transaction = 10_000.0;
        input.gender = "   ".to_string();

        match CustomerRecord::new(input) {
            Err(AppError::ValidationError(problems)) => {
                assert_eq!(problems.len(), 4, "{:?}", problems);
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        let mut form = sample_form();
        form.insert(
            form_fields::PERCENTAGE_CHANGE_CALCULATION.to_string(),
            "NaN".to_string(),
        );
        assert!(matches!(
            CustomerRecord::from_form(&form),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_codes_are_trimmed() {
        let mut input = sample_input();
        input.gender = "  M ".to_string();
        let record = CustomerRecord::new(input).unwrap();
        assert_eq!(record.gender, "M");
    }

    #[test]
    fn test_json_input_uses_camel_case_keys() {
        let input: CustomerInput = serde_json::from_value(serde_json::json!({
            "age": 42,
            "gender": "F",
            "maritalStatus": "M",
            "numChildren": 2,
            "isHomeOwner": "Y",
            "estimatedIncome": 85000.0,
            "netRealizedGainsYTD": 1200.5,
            "netRealizedLossesYTD": 300.0,
            "smallestSingleTransaction": 50.0,
            "largestSingleTransaction": 9500.0,
            "totalDollarValueTraded": 120000.0,
            "totalUnitsTraded": 640,
            "daysSinceLastLogin": 3,
            "daysSinceLastTrade": 12,
            "percentageChangeCalculation": -4.5
        }))
        .unwrap();
        assert_eq!(input, sample_input());
    }

    #[test]
    fn test_risk_label_parse_is_case_insensitive() {
        assert_eq!(RiskLabel::parse("High"), Some(RiskLabel::High));
        assert_eq!(RiskLabel::parse("MEDIUM"), Some(RiskLabel::Medium));
        assert_eq!(RiskLabel::parse(" low "), Some(RiskLabel::Low));
        assert_eq!(RiskLabel::parse("unknown"), None);
    }

    #[test]
    fn test_positional_probabilities() {
        let dist = ProbabilityDistribution::from_positional([0.7, 0.2, 0.1]);
        assert!((dist.get(RiskLabel::High) - 70.0).abs() < 1e-9);
        assert!((dist.get(RiskLabel::Medium) - 20.0).abs() < 1e-9);
        assert!((dist.get(RiskLabel::Low) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_scoring_response_serialization() {
        let response = ScoringResponse {
            risk_label: RiskLabel::Low,
            probability_distribution: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"riskLabel": "low"})
        );
    }
}
