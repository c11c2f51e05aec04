use log::*;
use panel_common::OrderStatus;

/// Maps an upstream status string onto the local order lifecycle.
///
/// Matching ignores case, surrounding whitespace, and treats `_` and `-` as spaces. Strings that are not recognised
/// map to [`OrderStatus::Pending`] so that an order is never moved into a terminal state on a guess.
pub fn map_provider_status(raw: &str) -> OrderStatus {
    let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalized.as_str() {
        "pending" => OrderStatus::Pending,
        "in progress" | "inprogress" | "processing" => OrderStatus::Processing,
        "complete" | "completed" => OrderStatus::Completed,
        "partial" => OrderStatus::Partial,
        "canceled" | "cancelled" => OrderStatus::Cancelled,
        "refunded" => OrderStatus::Refunded,
        "fail" | "failed" | "error" => OrderStatus::Failed,
        _ => {
            warn!("🔌️ Unknown provider status '{raw}'. Treating it as pending");
            OrderStatus::Pending
        },
    }
}
