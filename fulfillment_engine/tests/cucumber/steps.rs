use std::str::FromStr;

use cucumber::{then, when};
use fulfillment_engine::{
    db_types::{Amount, LogStatus, NewOrder, OrderStatus, Quantity},
    test_utils::scripted_transport::Script,
    OrderManagement,
    SyncRequest,
    SyncTrigger,
};
use provider_tools::ProviderApiError;

use crate::cucumber::PanelWorld;

#[when(expr = "the provider reports order {string} as {string}")]
async fn provider_reports(world: &mut PanelWorld, provider_order_id: String, body: String) {
    world.system().transport.script(&provider_order_id, Script::ok(&body));
}

#[when(expr = "the provider times out on order {string}")]
async fn provider_times_out(world: &mut PanelWorld, provider_order_id: String) {
    world.system().transport.script(&provider_order_id, Script::Fail(ProviderApiError::Timeout { seconds: 30 }));
}

#[when(expr = "the provider accepts new orders as {string}")]
async fn provider_accepts(world: &mut PanelWorld, provider_order_id: String) {
    let body = format!(r#"{{"order": "{provider_order_id}"}}"#);
    world.system().transport.script_new_orders(Script::ok(&body));
}

#[when(expr = "{word} places an order for {int} units")]
async fn place_order(world: &mut PanelWorld, username: String, quantity: u64) {
    let system = world.system();
    let user = system.users.get(&username).expect("Unknown user").clone();
    let (_, service) = system.catalog.clone().expect("No provider has been set up");
    let order = NewOrder::new(user.id, service.id, "https://example.com/someone", Quantity::from(quantity));
    let order = system.flow_api.place_order(order).await.expect("Error placing order");
    let provider_order_id = order.provider_order_id.expect("Order was not forwarded");
    system.orders.insert(provider_order_id, order.id);
}

#[when(expr = "a {word} sync runs")]
async fn sync_runs(world: &mut PanelWorld, trigger: String) {
    let trigger = match trigger.as_str() {
        "cron" => SyncTrigger::Cron,
        _ => SyncTrigger::Manual,
    };
    let system = world.system();
    let result = system.sync_api.run_provider_sync(SyncRequest::all(trigger)).await.expect("Sync run failed");
    system.last_run = Some(result);
}

#[then(expr = "order {string} has status {string}")]
async fn order_has_status(world: &mut PanelWorld, provider_order_id: String, status: String) {
    let system = world.system();
    let id = system.order_id(&provider_order_id);
    let order = system.db.fetch_order(id).await.expect("Error fetching order").expect("Order not found");
    let expected = OrderStatus::from_str(&status).expect("Not a valid order status");
    assert_eq!(order.status, expected);
}

#[then(expr = "order {string} has {int} audit entry with status {string}")]
async fn order_audit_entries(world: &mut PanelWorld, provider_order_id: String, count: usize, status: String) {
    let system = world.system();
    let id = system.order_id(&provider_order_id);
    let logs = system.db.fetch_provider_logs(id).await.expect("Error fetching logs");
    let expected = LogStatus::from_str(&status).expect("Not a valid log status");
    assert_eq!(logs.len(), count);
    assert!(logs.iter().all(|l| l.status == expected), "Audit entries: {logs:?}");
}

#[then(expr = "{word} has a balance of {int} and has spent {int}")]
async fn user_balances(world: &mut PanelWorld, username: String, balance: i64, spent: i64) {
    let system = world.system();
    let id = system.users.get(&username).expect("Unknown user").id;
    let user = system.db.fetch_user(id).await.expect("Error fetching user").expect("User not found");
    assert_eq!(user.balance, Amount::from(balance));
    assert_eq!(user.total_spent, Amount::from(spent));
}

#[then(expr = "the sync run processed {int} orders with {int} failure(s)")]
async fn run_totals(world: &mut PanelWorld, processed: usize, failed: usize) {
    let result = world.system().last_run.clone().expect("No sync has run");
    assert_eq!(result.processed, processed);
    assert_eq!(result.failed, failed);
}
