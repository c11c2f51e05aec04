//! Money rules for orders and refunds.
use std::str::FromStr;

use panel_common::{Amount, Quantity};
use rust_decimal::Decimal;

use crate::{
    db_types::{Order, OrderPricing, Service, User},
    traits::FulfillmentError,
};

/// Service rates are quoted per this many units.
const RATE_UNIT: u32 = 1000;

/// Prices an order for the user. The service rate is in US dollars per 1,000 units; the price the user pays is
/// converted into their currency at their dollar rate. Accounts without a rate pay the dollar price.
pub fn price_order(service: &Service, user: &User, quantity: Quantity) -> Result<OrderPricing, FulfillmentError> {
    let units = Decimal::from_str(&quantity.to_string())
        .map_err(|e| FulfillmentError::PricingError(format!("Quantity {quantity} is too large: {e}")))?;
    let usd = service
        .rate
        .value()
        .checked_mul(units)
        .and_then(|v| v.checked_div(Decimal::from(RATE_UNIT)))
        .ok_or_else(|| FulfillmentError::PricingError(format!("{quantity} units at {} overflows", service.rate)))?;
    let usd_price = Amount::from(usd.normalize());
    let price = match user.dollar_rate {
        Some(rate) => usd_price
            .checked_convert(rate.value())
            .ok_or_else(|| FulfillmentError::PricingError(format!("{usd_price} USD at a rate of {rate} overflows")))?,
        None => usd_price,
    };
    Ok(OrderPricing { price, usd_price, currency: user.currency.clone() })
}

/// The amount to credit back to the user when an order is cancelled, in the user's currency.
///
/// If the order was priced in the user's current currency, the full order price comes back. Otherwise the dollar price
/// is converted at the user's current rate (or refunded as-is if they have none).
pub fn refund_amount(order: &Order, user: &User) -> Result<Amount, FulfillmentError> {
    if order.currency == user.currency {
        return Ok(order.price);
    }
    match user.dollar_rate {
        Some(rate) => order.usd_price.checked_convert(rate.value()).ok_or_else(|| {
            FulfillmentError::PricingError(format!("Refund of {} USD at a rate of {rate} overflows", order.usd_price))
        }),
        None => Ok(order.usd_price),
    }
}

/// How much to take off the user's lifetime spend when an order is refunded. Nothing, if the order's spend was never
/// recorded; otherwise the refund, but never more than the order added to the spend, nor more than the user has spent.
pub fn spend_reversal(order: &Order, user: &User, refund: Amount) -> Amount {
    if !order.spend_recorded || user.total_spent.is_negative() {
        return Amount::zero();
    }
    refund.min(order.price).min(user.total_spent).max(Amount::zero())
}
