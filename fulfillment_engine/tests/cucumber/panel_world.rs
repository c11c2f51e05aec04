use std::collections::HashMap;

use cucumber::World;
use fulfillment_engine::{
    db_types::{Provider, Service, User},
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        scripted_transport::ScriptedTransport,
    },
    OrderFlowApi,
    ProviderSyncApi,
    SqliteDatabase,
    SyncRunResult,
};
use log::*;
use provider_tools::ForwardingFacade;

#[derive(Default, Debug, World)]
pub struct PanelWorld {
    pub system: Option<PanelSystem>,
}

pub struct PanelSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub transport: ScriptedTransport,
    pub sync_api: ProviderSyncApi<SqliteDatabase, ScriptedTransport>,
    pub flow_api: OrderFlowApi<SqliteDatabase, ScriptedTransport>,
    pub catalog: Option<(Provider, Service)>,
    pub users: HashMap<String, User>,
    /// Local order ids, by upstream order id
    pub orders: HashMap<String, i64>,
    pub last_run: Option<SyncRunResult>,
}

impl std::fmt::Debug for PanelSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PanelSystem ({})", self.db_path)
    }
}

impl PanelWorld {
    pub fn system(&mut self) -> &mut PanelSystem {
        self.system.as_mut().expect("Panel not initialised")
    }
}

impl PanelSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let transport = ScriptedTransport::new();
        let sync_api = ProviderSyncApi::new(db.clone(), ForwardingFacade::new(transport.clone()));
        let flow_api = OrderFlowApi::new(db.clone(), ForwardingFacade::new(transport.clone()));
        Self {
            db_path: url,
            db,
            transport,
            sync_api,
            flow_api,
            catalog: None,
            users: HashMap::new(),
            orders: HashMap::new(),
            last_run: None,
        }
    }

    pub fn order_id(&self, provider_order_id: &str) -> i64 {
        *self.orders.get(provider_order_id).expect("Unknown upstream order id")
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
