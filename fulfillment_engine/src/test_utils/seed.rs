//! Shortcuts for setting up a catalogue, users and forwarded orders in a test database.
use panel_common::{Amount, Quantity};

use crate::{
    db_types::{NewOrder, NewProvider, NewService, NewUser, Order, Provider, Service, User},
    helpers::price_order,
    traits::FulfillmentDatabase,
    SqliteDatabase,
};

pub struct Catalog {
    pub provider: Provider,
    pub service: Service,
}

/// An active provider at `https://{host}/api/v2` with one refillable, cancellable service priced at 10 per 1000.
pub async fn seed_catalog(db: &SqliteDatabase, host: &str) -> Catalog {
    let url = format!("https://{host}/api/v2");
    let provider = db.create_provider(NewProvider::new(host, &url, "test-key")).await.expect("Error creating provider");
    let service = NewService::new(&format!("{host} followers"), Amount::from(10))
        .with_provider(provider.id, "101")
        .with_category("Followers")
        .with_limits(10, 100_000)
        .with_refill(Some(30))
        .with_cancel();
    let service = db.create_service(service).await.expect("Error creating service");
    Catalog { provider, service }
}

pub async fn seed_user(db: &SqliteDatabase, username: &str, balance: i64) -> User {
    db.create_user(NewUser::new(username, Amount::from(balance))).await.expect("Error creating user")
}

/// Places an order directly in the database (debiting the user) and records it as accepted upstream under
/// `provider_order_id`, without talking to any provider.
pub async fn seed_forwarded_order(
    db: &SqliteDatabase,
    user: &User,
    service: &Service,
    quantity: u64,
    provider_order_id: &str,
) -> Order {
    let pricing = price_order(service, user, Quantity::from(quantity)).expect("Error pricing order");
    let order = NewOrder::new(user.id, service.id, "https://example.com/someone", Quantity::from(quantity));
    let order = db.insert_order_and_debit(order, pricing).await.expect("Error inserting order");
    db.record_forward_success(order.id, provider_order_id, None).await.expect("Error recording forward")
}
