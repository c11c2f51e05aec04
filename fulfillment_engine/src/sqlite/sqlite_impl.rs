//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! Money is stored as exact decimal text, so balance arithmetic happens in Rust. Every transaction that changes a
//! balance writes to the database *before* it reads the user, which takes SQLite's write lock and serializes
//! concurrent balance changes.
use std::fmt::Debug;

use log::*;
use panel_common::{Amount, OrderStatus};
use sqlx::{
    migrate::{MigrateError, Migrator},
    SqlitePool,
};

use super::db::{commissions, db_url, new_pool, orders, provider_logs, providers, requests, services, users};
use crate::{
    db_types::{
        AffiliateCommission,
        NewOrder,
        NewProvider,
        NewProviderOrderLog,
        NewService,
        NewUser,
        Order,
        OrderDetails,
        OrderPricing,
        OrderRequest,
        OrderSyncUpdate,
        Provider,
        ProviderOrderLog,
        RequestKind,
        RequestStatus,
        Service,
        SyncCandidate,
        User,
    },
    helpers::{refund_amount, spend_reversal},
    traits::{AuditLog, CancellationOutcome, FulfillmentDatabase, FulfillmentError, OrderManagement, SyncDatabase},
};

static MIGRATOR: Migrator = sqlx::migrate!("./src/sqlite/migrations");

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_details(&self, id: i64) -> Result<Option<OrderDetails>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let details = orders::fetch_order_details(id, &mut conn).await?;
        Ok(details)
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_service(&self, id: i64) -> Result<Option<Service>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let service = services::fetch_service(id, &mut conn).await?;
        Ok(service)
    }

    async fn fetch_provider(&self, id: i64) -> Result<Option<Provider>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let provider = providers::fetch_provider(id, &mut conn).await?;
        Ok(provider)
    }

    async fn fetch_providers(&self, ids: &[i64]) -> Result<Vec<Provider>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let providers = providers::fetch_providers(ids, &mut conn).await?;
        Ok(providers)
    }

    async fn fetch_provider_logs(&self, order_id: i64) -> Result<Vec<ProviderOrderLog>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let logs = provider_logs::fetch_logs_for_order(order_id, &mut conn).await?;
        Ok(logs)
    }

    async fn fetch_requests(&self, kind: RequestKind, order_id: i64) -> Result<Vec<OrderRequest>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let requests = requests::fetch_requests_for_order(kind, order_id, &mut conn).await?;
        Ok(requests)
    }

    async fn fetch_commissions(&self, order_id: i64) -> Result<Vec<AffiliateCommission>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let commissions = commissions::fetch_commissions_for_order(order_id, &mut conn).await?;
        Ok(commissions)
    }
}

impl AuditLog for SqliteDatabase {
    async fn insert_provider_log(&self, log: NewProviderOrderLog) -> Result<ProviderOrderLog, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let entry = provider_logs::insert_log(log, &mut conn).await?;
        Ok(entry)
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_and_debit(&self, order: NewOrder, pricing: OrderPricing) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, pricing, &mut tx).await?;
        let user = users::fetch_user(order.user_id, &mut tx).await?.ok_or(FulfillmentError::UserNotFound(order.user_id))?;
        if user.balance < order.price {
            debug!("👤️ User #{} cannot afford {} with a balance of {}", user.id, order.price, user.balance);
            tx.rollback().await?;
            return Err(FulfillmentError::InsufficientBalance { balance: user.balance, price: order.price });
        }
        let balance = checked(user.balance.checked_sub(order.price), "debiting", order.id)?;
        users::set_balances(user.id, balance, user.total_spent, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved and {} {} debited from user #{}", order.id, order.price, order.currency, user.id);
        Ok(order)
    }

    async fn record_forward_success(
        &self,
        order_id: i64,
        provider_order_id: &str,
        charge: Option<Amount>,
    ) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::mark_forwarded(order_id, provider_order_id, charge, &mut tx).await? else {
            let exists = orders::fetch_order(order_id, &mut tx).await?.is_some();
            tx.rollback().await?;
            return Err(if exists {
                FulfillmentError::OrderAlreadyForwarded(order_id)
            } else {
                FulfillmentError::OrderNotFound(order_id)
            });
        };
        let user = users::fetch_user(order.user_id, &mut tx).await?.ok_or(FulfillmentError::UserNotFound(order.user_id))?;
        let total_spent = checked(user.total_spent.checked_add(order.price), "recording spend for", order_id)?;
        users::set_balances(user.id, user.balance, total_spent, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} is now upstream order {provider_order_id}. Spend recorded for user #{}", user.id);
        Ok(order)
    }

    async fn record_forward_failure(&self, order_id: i64) -> Result<Order, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_forward_failed(order_id, &mut conn).await
    }

    async fn create_request(
        &self,
        kind: RequestKind,
        order_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<OrderRequest, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        requests::insert_request(kind, order_id, user_id, reason, &mut conn).await
    }

    async fn resolve_request(
        &self,
        kind: RequestKind,
        id: i64,
        status: RequestStatus,
        provider_refill_id: Option<String>,
    ) -> Result<OrderRequest, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        requests::resolve_request(kind, id, status, provider_refill_id, &mut conn).await
    }
}

impl SyncDatabase for SqliteDatabase {
    async fn fetch_sync_candidates(
        &self,
        provider_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SyncCandidate>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let candidates = orders::fetch_sync_candidates(provider_id, limit, &mut conn).await?;
        Ok(candidates)
    }

    async fn fetch_sync_candidates_by_ids(&self, ids: &[i64]) -> Result<Vec<SyncCandidate>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let candidates = orders::fetch_sync_candidates_by_ids(ids, &mut conn).await?;
        Ok(candidates)
    }

    async fn latest_provider_for_order(&self, order_id: i64) -> Result<Option<i64>, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let provider_id = provider_logs::latest_provider_for_order(order_id, &mut conn).await?;
        Ok(provider_id)
    }

    async fn apply_sync_update(&self, order_id: i64, update: OrderSyncUpdate) -> Result<Order, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::apply_sync_update(order_id, &update, &mut tx).await?;
        if update.status == Some(OrderStatus::Completed) {
            let n = commissions::approve_commissions(order_id, &mut tx).await?;
            if n > 0 {
                debug!("🤝️ {n} commissions approved for completed order #{order_id}");
            }
        }
        tx.commit().await?;
        Ok(order)
    }

    async fn apply_cancellation(
        &self,
        order_id: i64,
        update: OrderSyncUpdate,
    ) -> Result<CancellationOutcome, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let claimed = orders::claim_refund(order_id, &mut tx).await?;
        let (refunded, spend_reversed, user) = if claimed {
            let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(FulfillmentError::OrderNotFound(order_id))?;
            let user =
                users::fetch_user(order.user_id, &mut tx).await?.ok_or(FulfillmentError::UserNotFound(order.user_id))?;
            let refund = refund_amount(&order, &user)?;
            let reversal = spend_reversal(&order, &user, refund);
            let balance = checked(user.balance.checked_add(refund), "refunding", order_id)?;
            let total_spent = checked(user.total_spent.checked_sub(reversal), "reversing spend for", order_id)?;
            let user = users::set_balances(user.id, balance, total_spent, &mut tx).await?;
            debug!("🗃️ Refunded {refund} to user #{} for order #{order_id}. Spend reduced by {reversal}", user.id);
            (Some(refund), reversal, Some(user))
        } else {
            debug!("🗃️ Order #{order_id} has already been refunded. Only its fields will be updated");
            (None, Amount::zero(), None)
        };
        let order = orders::apply_sync_update(order_id, &update, &mut tx).await?;
        let n = commissions::cancel_commissions(order_id, &mut tx).await?;
        if n > 0 {
            debug!("🤝️ {n} commissions cancelled for order #{order_id}");
        }
        tx.commit().await?;
        Ok(CancellationOutcome { order, refunded, spend_reversed, user })
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Migrations that have already been applied are skipped.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        MIGRATOR.run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn create_provider(&self, provider: NewProvider) -> Result<Provider, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let provider = providers::insert_provider(provider, &mut conn).await?;
        Ok(provider)
    }

    pub async fn create_service(&self, service: NewService) -> Result<Service, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let service = services::insert_service(service, &mut conn).await?;
        Ok(service)
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        Ok(user)
    }

    /// Records a pending affiliate commission on an order.
    pub async fn create_commission(
        &self,
        order_id: i64,
        affiliate_user_id: i64,
        amount: Amount,
    ) -> Result<AffiliateCommission, FulfillmentError> {
        let mut conn = self.pool.acquire().await?;
        let commission = commissions::insert_commission(order_id, affiliate_user_id, amount, &mut conn).await?;
        Ok(commission)
    }
}

fn checked(value: Option<Amount>, what: &str, order_id: i64) -> Result<Amount, FulfillmentError> {
    value.ok_or_else(|| FulfillmentError::PricingError(format!("Balance overflow while {what} order #{order_id}")))
}
