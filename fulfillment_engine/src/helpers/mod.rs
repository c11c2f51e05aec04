mod pricing;

pub use pricing::{price_order, refund_amount, spend_reversal};
