//! Kind-specific payload shaping.
//!
//! Every function here is pure and total: missing, empty, `"None"`,
//! `"-"`, or malformed fields in the raw upstream response become `None`
//! in the shaped payload, never an error.

use dashboard_core::{BalanceReport, CompanyOverview, FinancialStatements, IncomeReport};
use serde_json::Value;

/// Quarterly reports kept per statement (two years of filings).
const MAX_REPORTS: usize = 8;

/// Shape a raw Alpha Vantage OVERVIEW response into the dashboard
/// overview payload.
pub fn shape_overview(symbol: &str, raw: &Value) -> CompanyOverview {
    CompanyOverview {
        symbol: text_field(raw, "Symbol").unwrap_or_else(|| symbol.to_string()),
        name: text_field(raw, "Name"),
        description: text_field(raw, "Description"),
        sector: text_field(raw, "Sector"),
        industry: text_field(raw, "Industry"),
        exchange: text_field(raw, "Exchange"),
        market_cap: numeric_field(raw, "MarketCapitalization").map(abbreviate_market_cap),
        pe_ratio: numeric_field(raw, "PERatio"),
        dividend_yield: numeric_field(raw, "DividendYield").map(format_percentage),
        week_high_52: numeric_field(raw, "52WeekHigh"),
        week_low_52: numeric_field(raw, "52WeekLow"),
    }
}

/// Shape the combined raw statements (as produced by the upstream
/// adapter) into the `{incomeStatement, balanceSheet}` payload the
/// dashboard charts consume.
pub fn shape_financials(raw: &Value) -> FinancialStatements {
    let income_statement = reports(raw.get("income_statement"))
        .iter()
        .filter_map(|report| {
            let (fiscal_year, fiscal_quarter) = fiscal_period(report)?;
            Some(IncomeReport {
                fiscal_year,
                fiscal_quarter,
                total_revenue: numeric_field(report, "totalRevenue"),
                net_income: numeric_field(report, "netIncome"),
            })
        })
        .take(MAX_REPORTS)
        .collect();

    let balance_sheet = reports(raw.get("balance_sheet"))
        .iter()
        .filter_map(|report| {
            let (fiscal_year, fiscal_quarter) = fiscal_period(report)?;
            Some(BalanceReport {
                fiscal_year,
                fiscal_quarter,
                total_assets: numeric_field(report, "totalAssets"),
                total_liabilities: numeric_field(report, "totalLiabilities"),
            })
        })
        .take(MAX_REPORTS)
        .collect();

    FinancialStatements {
        income_statement,
        balance_sheet,
    }
}

/// Abbreviate a market capitalization with a T/B/M suffix, two decimals.
pub fn abbreviate_market_cap(value: f64) -> String {
    let value = value.abs();
    if value >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a fractional yield as a percentage string ("0.0215" -> "2.15%").
pub fn format_percentage(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Quarterly reports when present, annual otherwise.
fn reports(statement: Option<&Value>) -> &[Value] {
    statement
        .and_then(|s| {
            s.get("quarterlyReports")
                .or_else(|| s.get("annualReports"))
        })
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// (fiscal_year, fiscal_quarter) from a report's `fiscalDateEnding`.
fn fiscal_period(report: &Value) -> Option<(i32, u32)> {
    let date = report.get("fiscalDateEnding")?.as_str()?;
    let mut parts = date.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, (month + 2) / 3))
}

/// A text field, with Alpha Vantage's placeholder values mapped to None.
fn text_field(raw: &Value, name: &str) -> Option<String> {
    let text = raw.get(name)?.as_str()?.trim();
    if text.is_empty() || text == "None" || text == "-" {
        return None;
    }
    Some(text.to_string())
}

/// A numeric field that may arrive as a number or a numeric string.
fn numeric_field(raw: &Value, name: &str) -> Option<f64> {
    let field = raw.get(name)?;
    let value = match field {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
