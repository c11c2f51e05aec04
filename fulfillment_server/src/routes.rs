//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. A sync run spends most of its time waiting on providers, so it is
//! awaited, never blocked on.
use actix_web::{get, web, HttpResponse, Responder};
use fulfillment_engine::{ProviderSyncApi, SyncDatabase};
use log::*;
use provider_tools::ProviderTransport;

use crate::{data_objects::ManualSyncParams, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Sync  ----------------------------------------------------
route!(manual_sync => Post "/sync" impl SyncDatabase, ProviderTransport);
/// Route handler for the manual sync endpoint
///
/// Runs one reconciliation pass and returns its totals. The body selects what to sync (see [`ManualSyncParams`]).
/// Callers must supply the admin token in the `panel_admin_token` header; the route is expected to be mounted behind
/// [`crate::middleware::AdminTokenMiddlewareFactory`].
///
/// A failure to sync an individual order does not fail the request. It is counted in the result and recorded in the
/// order's audit trail. Only a failure to select the orders to sync gives an error response.
pub async fn manual_sync<B, T>(
    body: web::Json<ManualSyncParams>,
    api: web::Data<ProviderSyncApi<B, T>>,
) -> Result<HttpResponse, ServerError>
where
    B: SyncDatabase,
    T: ProviderTransport,
{
    let request = body.into_inner().into_sync_request();
    debug!("💻️ POST manual sync for {:?}", request.scope);
    let result = api.run_provider_sync(request).await.map_err(|e| {
        warn!("💻️ Manual sync could not run. {e}");
        ServerError::from(e)
    })?;
    info!(
        "💻️ Manual sync complete. {} processed, {} synced, {} failed, {} skipped{}",
        result.processed,
        result.synced,
        result.failed,
        result.skipped,
        if result.timed_out { " (ran out of time)" } else { "" }
    );
    Ok(HttpResponse::Ok().json(result))
}
