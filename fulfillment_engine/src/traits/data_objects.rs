use panel_common::Amount;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, User};

/// The result of applying an upstream cancellation to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    pub order: Order,
    /// The amount credited back to the user, in the user's currency. `None` if the refund had already been applied.
    pub refunded: Option<Amount>,
    /// How much was taken off the user's lifetime spend.
    pub spend_reversed: Amount,
    /// The user record after the refund, if one was applied.
    pub user: Option<User>,
}

impl CancellationOutcome {
    pub fn was_refunded(&self) -> bool {
        self.refunded.is_some()
    }
}
