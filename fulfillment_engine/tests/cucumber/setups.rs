use cucumber::given;
use fulfillment_engine::test_utils::seed::{seed_catalog, seed_forwarded_order, seed_user};

use crate::cucumber::{panel_world::PanelSystem, PanelWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut PanelWorld) {
    let system = PanelSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a provider at {string}")]
async fn a_provider(world: &mut PanelWorld, host: String) {
    let system = world.system();
    let catalog = seed_catalog(&system.db, &host).await;
    system.catalog = Some((catalog.provider, catalog.service));
}

#[given(expr = "user {string} with a balance of {int}")]
async fn a_user(world: &mut PanelWorld, username: String, balance: i64) {
    let system = world.system();
    let user = seed_user(&system.db, &username, balance).await;
    system.users.insert(username, user);
}

#[given(expr = "{word} has a forwarded order {string} for {int} units")]
async fn a_forwarded_order(world: &mut PanelWorld, username: String, provider_order_id: String, quantity: u64) {
    let system = world.system();
    let user = system.users.get(&username).expect("Unknown user").clone();
    let (_, service) = system.catalog.clone().expect("No provider has been set up");
    let order = seed_forwarded_order(&system.db, &user, &service, quantity, &provider_order_id).await;
    system.orders.insert(provider_order_id, order.id);
}
