//! Fee, margin and VAT derivation for quotes and quotations.
//!
//! Margin and VAT are rounded to cents (half away from zero) as they are
//! computed, so `vat == round((subtotal + margin) * 10%)` and
//! `final_total == subtotal + margin + vat - discount` hold exactly on the
//! stored values.

use crate::{entities::quotation::LineItem, errors::ServiceError};
use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_MARGIN_RATE: Decimal = dec!(0.15);
pub const VAT_RATE: Decimal = dec!(0.10);
pub const DEFAULT_VALID_DAYS: i64 = 30;
pub const MAX_VALID_DAYS: i64 = 365;
/// Largest amount the money columns hold (`numeric(16, 4)`).
pub const MAX_AMOUNT: Decimal = dec!(999999999999);

const MONEY_SCALE: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Raw pricing inputs as captured from the quote form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeeInputs {
    pub session_fee: Option<Decimal>,
    pub transport_fee: Option<Decimal>,
    pub material_cost: Option<Decimal>,
    pub assistant_fee: Option<Decimal>,
    pub overhead: Option<Decimal>,
    /// Fraction in `[0, 1]`; defaults to `0.15`.
    pub margin_rate: Option<Decimal>,
    pub discount: Option<Decimal>,
    /// Days the quote stays valid; defaults to 30.
    pub valid_days: Option<i64>,
}

/// Fully derived figures for a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuoteBreakdown {
    pub session_fee: Decimal,
    pub transport_fee: Decimal,
    pub material_cost: Decimal,
    pub assistant_fee: Decimal,
    pub overhead: Decimal,
    pub subtotal: Decimal,
    pub margin_rate: Decimal,
    pub margin_amount: Decimal,
    pub vat: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub final_total: Decimal,
    pub valid_until: NaiveDate,
}

fn non_negative(field: &str, value: Option<Decimal>) -> Result<Decimal, ServiceError> {
    let value = value.unwrap_or(Decimal::ZERO);
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not be negative"
        )));
    }
    within_limit(field, Some(value))
}

/// Rejects an overflowed (`None`) or oversized intermediate result.
fn within_limit(field: &str, value: Option<Decimal>) -> Result<Decimal, ServiceError> {
    value.filter(|v| *v <= MAX_AMOUNT).ok_or_else(|| {
        ServiceError::ValidationError(format!("{field} must not exceed {MAX_AMOUNT}"))
    })
}

fn checked_sum(field: &str, values: &[Decimal]) -> Result<Decimal, ServiceError> {
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v));
    within_limit(field, sum)
}

/// Derives every quote figure from `inputs`, as of `today`.
pub fn derive_quote(inputs: &FeeInputs, today: NaiveDate) -> Result<QuoteBreakdown, ServiceError> {
    let session_fee = non_negative("session_fee", inputs.session_fee)?;
    let transport_fee = non_negative("transport_fee", inputs.transport_fee)?;
    let material_cost = non_negative("material_cost", inputs.material_cost)?;
    let assistant_fee = non_negative("assistant_fee", inputs.assistant_fee)?;
    let overhead = non_negative("overhead", inputs.overhead)?;
    let discount = non_negative("discount", inputs.discount)?;

    let margin_rate = inputs.margin_rate.unwrap_or(DEFAULT_MARGIN_RATE);
    if margin_rate < Decimal::ZERO || margin_rate > Decimal::ONE {
        return Err(ServiceError::ValidationError(
            "margin_rate must be between 0 and 1".to_string(),
        ));
    }

    let valid_days = inputs.valid_days.unwrap_or(DEFAULT_VALID_DAYS);
    if !(1..=MAX_VALID_DAYS).contains(&valid_days) {
        return Err(ServiceError::ValidationError(format!(
            "valid_days must be between 1 and {MAX_VALID_DAYS}"
        )));
    }

    let subtotal = checked_sum(
        "subtotal",
        &[session_fee, transport_fee, material_cost, assistant_fee, overhead],
    )?;
    let margin_amount = round_money(within_limit(
        "margin_amount",
        subtotal.checked_mul(margin_rate),
    )?);
    let taxable = checked_sum("subtotal + margin_amount", &[subtotal, margin_amount])?;
    let vat = round_money(within_limit("vat", taxable.checked_mul(VAT_RATE))?);
    let total = checked_sum("total", &[taxable, vat])?;

    if discount > total {
        return Err(ServiceError::ValidationError(
            "discount must not exceed the quote total".to_string(),
        ));
    }

    let final_total = total - discount;
    let valid_until = today
        .checked_add_signed(Duration::days(valid_days))
        .ok_or_else(|| ServiceError::ValidationError("valid_days out of range".to_string()))?;

    Ok(QuoteBreakdown {
        session_fee,
        transport_fee,
        material_cost,
        assistant_fee,
        overhead,
        subtotal,
        margin_rate,
        margin_amount,
        vat,
        discount,
        total,
        final_total,
        valid_until,
    })
}

/// One requested line before pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineInput {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotationTotals {
    pub items: Vec<LineItem>,
    pub supply_amount: Decimal,
    pub vat: Decimal,
    pub total_amount: Decimal,
}

/// Prices quotation lines: `amount = quantity * unit_price`, VAT on the sum.
pub fn derive_quotation(lines: &[LineInput]) -> Result<QuotationTotals, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "a quotation needs at least one line item".to_string(),
        ));
    }

    let mut items = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if line.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "items[{idx}].description must not be empty"
            )));
        }
        if line.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "items[{idx}].quantity must be at least 1"
            )));
        }
        let unit_price = non_negative(&format!("items[{idx}].unit_price"), Some(line.unit_price))?;
        let amount = within_limit(
            &format!("items[{idx}].amount"),
            Decimal::from(line.quantity).checked_mul(unit_price),
        )?;

        items.push(LineItem {
            description: line.description.trim().to_string(),
            quantity: line.quantity,
            unit_price,
            amount: round_money(amount),
        });
    }

    let amounts: Vec<Decimal> = items.iter().map(|i| i.amount).collect();
    let supply_amount = checked_sum("supply_amount", &amounts)?;
    let vat = round_money(within_limit("vat", supply_amount.checked_mul(VAT_RATE))?);
    let total_amount = checked_sum("total_amount", &[supply_amount, vat])?;

    Ok(QuotationTotals {
        items,
        supply_amount,
        vat,
        total_amount,
    })
}
