//! Admin token middleware for the fulfillment panel server.
//! This middleware can be placed on any route or scope.
//!
//! It compares the `panel_admin_token` header of the incoming request with the configured admin token. If they match,
//! the request is allowed to continue. Otherwise, a 401 Unauthorized response is returned and the wrapped service is
//! never called. An empty configured token refuses every request.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use panel_common::Secret;

use crate::errors::ServerError;

pub const ADMIN_TOKEN_HEADER: &str = "panel_admin_token";

pub struct AdminTokenMiddlewareFactory {
    token: Secret<String>,
}

impl AdminTokenMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdminTokenMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) })
    }
}

pub struct AdminTokenMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authorised = is_authorised(&req, &self.token);
        Box::pin(async move {
            if authorised {
                service.call(req).await.map(ServiceResponse::map_into_left_body)
            } else {
                let err = ServerError::Unauthorized("A valid admin token is required".into());
                Ok(req.error_response(err).map_into_right_body())
            }
        })
    }
}

fn is_authorised(req: &ServiceRequest, token: &Secret<String>) -> bool {
    if token.reveal().is_empty() {
        warn!("💻️ Admin request to {} refused. No admin token has been configured.", req.path());
        return false;
    }
    match req.headers().get(ADMIN_TOKEN_HEADER).map(|v| v.to_str()) {
        Some(Ok(presented)) if presented == token.reveal().as_str() => true,
        Some(_) => {
            info!("💻️ Admin request to {} refused. The admin token does not match.", req.path());
            false
        },
        None => {
            debug!("💻️ Admin request to {} refused. No {ADMIN_TOKEN_HEADER} header.", req.path());
            false
        },
    }
}
