//! Server-rendered pages for the input form and the prediction result.

use crate::models::{form_fields, RiskLabel, ScoringResponse};
use std::collections::HashMap;
use std::fmt::Write;

/// Form inputs in display order with their labels.
const FORM_LAYOUT: [(&str, &str); 15] = [
    (form_fields::AGE, "Age"),
    (form_fields::GENDER, "Gender (M/F)"),
    (form_fields::STATUS, "Marital status (S/M/D)"),
    (form_fields::CHILDREN, "Number of children"),
    (form_fields::HOME_OWNER, "Home owner (Y/N)"),
    (form_fields::INCOME, "Estimated income ($)"),
    (form_fields::NET_REALIZED_GAINS_YTD, "Net realized gains YTD ($)"),
    (form_fields::NET_REALIZED_LOSSES_YTD, "Net realized losses YTD ($)"),
    (form_fields::SMALLEST_SINGLE_TRANSACTION, "Smallest single transaction ($)"),
    (form_fields::LARGEST_SINGLE_TRANSACTION, "Largest single transaction ($)"),
    (form_fields::TOTAL_DOLLAR_VALUE_TRADED, "Total dollar value traded ($)"),
    (form_fields::TOTAL_UNITS_TRADED, "Total units traded"),
    (form_fields::DAYS_SINCE_LAST_LOGIN, "Days since last login"),
    (form_fields::DAYS_SINCE_LAST_TRADE, "Days since last trade"),
    (form_fields::PERCENTAGE_CHANGE_CALCULATION, "Percentage change"),
];

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

/// Renders the input form, pre-filled with `values` and listing `messages` above it.
pub fn render_form(values: &HashMap<String, String>, messages: &[String]) -> String {
    let mut body = String::from("<h1>Stock Trader Churn Prediction</h1>\n");

    if !messages.is_empty() {
        body.push_str("<ul class=\"errors\">\n");
        for message in messages {
            let _ = writeln!(body, "  <li>{}</li>", escape_html(message));
        }
        body.push_str("</ul>\n");
    }

    body.push_str("<form method=\"post\" action=\"/\">\n");
    for (name, label) in FORM_LAYOUT {
        let value = values.get(name).map(String::as_str).unwrap_or("");
        let _ = writeln!(
            body,
            "  <label for=\"{name}\">{label}</label>\n  <input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{value}\" required><br>",
            name = name,
            label = escape_html(label),
            value = escape_html(value),
        );
    }
    body.push_str("  <button type=\"submit\">Predict</button>\n</form>");

    page("Stock Trader Churn Prediction", &body)
}

/// Renders the prediction result.
pub fn render_score(response: &ScoringResponse) -> String {
    let mut body = String::from("<p class=\"flash\">Successful Prediction</p>\n");
    let _ = writeln!(
        body,
        "<h1>Churn risk: <span class=\"risk-{}\">{}</span></h1>",
        response.risk_label.as_str(),
        response.risk_label.display_name()
    );

    if let Some(distribution) = &response.probability_distribution {
        body.push_str("<table>\n  <tr><th>Risk</th><th>Probability</th></tr>\n");
        for label in [RiskLabel::High, RiskLabel::Medium, RiskLabel::Low] {
            let _ = writeln!(
                body,
                "  <tr><td>{}</td><td>{:.1}%</td></tr>",
                label.display_name(),
                distribution.get(label)
            );
        }
        body.push_str("</table>\n");
    }

    body.push_str("<a href=\"/\">Score another customer</a>");
    page("Churn Prediction Result", &body)
}
