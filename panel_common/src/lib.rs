mod amount;
mod order_status;
mod quantity;

pub mod helpers;
pub mod op;
mod secret;

pub use amount::{Amount, AmountConversionError, DEFAULT_CURRENCY_CODE};
pub use order_status::{OrderStatus, OrderStatusConversionError};
pub use quantity::{Quantity, QuantityConversionError};
pub use secret::Secret;
