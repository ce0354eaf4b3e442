use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    serve, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::auth::{require_admin, require_identity};
use super::handlers::{self, parcels, payments, riders, users};
use crate::application::parcel_service::ParcelService;
use crate::application::payment_service::PaymentService;
use crate::application::rider_service::RiderService;
use crate::application::user_service::UserService;
use courier_types::ports::checkout::CheckoutGateway;
use courier_types::ports::identity::IdentityVerifier;
use courier_types::ports::store::CourierStore;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

/// Services shared by every handler.
pub struct AppState<S: CourierStore> {
    pub users: UserService<S>,
    pub riders: RiderService<S>,
    pub parcels: ParcelService<S>,
    pub payments: PaymentService<S>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl<S: CourierStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        identity: Arc<dyn IdentityVerifier>,
        checkout: Arc<dyn CheckoutGateway>,
        site_domain: String,
    ) -> Self {
        Self {
            users: UserService::new(store.clone()),
            riders: RiderService::new(store.clone()),
            parcels: ParcelService::new(store.clone()),
            payments: PaymentService::new(store, checkout, site_domain),
            identity,
        }
    }
}

#[derive(Clone)]
pub struct HttpServer<S: CourierStore> {
    pub state: Arc<AppState<S>>,
    pub config: HttpServerConfig,
}

impl<S: CourierStore> HttpServer<S> {
    pub async fn new(state: AppState<S>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(state),
            config,
        })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let state = self.state.clone();
        let identity = from_fn_with_state(state.clone(), require_identity::<S>);
        let admin = from_fn_with_state(state.clone(), require_admin::<S>);

        // Admin routes run the identity check first; the last layer added is outermost.
        Router::new()
            .route("/", get(handlers::root))
            .route("/health", get(handlers::health))
            .route(
                "/parcelTracing/{tracking_id}",
                get(parcels::tracking_history::<S>),
            )
            .route(
                "/users",
                post(users::login::<S>).route_layer(identity.clone()),
            )
            .route(
                "/users",
                get(users::list_users::<S>)
                    .route_layer(admin.clone())
                    .route_layer(identity.clone()),
            )
            .route(
                "/users/{user}/role",
                patch(users::review_role::<S>)
                    .route_layer(admin.clone())
                    .route_layer(identity.clone()),
            )
            .route(
                "/users/{user}/role",
                get(users::role_of::<S>).route_layer(identity.clone()),
            )
            .route(
                "/riders",
                post(riders::apply::<S>).route_layer(identity.clone()),
            )
            .route(
                "/riders",
                get(riders::list_riders::<S>)
                    .route_layer(admin.clone())
                    .route_layer(identity.clone()),
            )
            .route(
                "/riders/{id}",
                patch(riders::review::<S>)
                    .route_layer(admin.clone())
                    .route_layer(identity.clone()),
            )
            .route(
                "/parcels",
                post(parcels::create_parcel::<S>)
                    .get(parcels::list_parcels::<S>)
                    .route_layer(identity.clone()),
            )
            .route(
                "/parcels",
                patch(parcels::assign_rider::<S>)
                    .route_layer(admin.clone())
                    .route_layer(identity.clone()),
            )
            .route(
                "/parcels/rider",
                get(parcels::rider_parcels::<S>).route_layer(identity.clone()),
            )
            .route(
                "/parcels/{id}",
                get(parcels::get_parcel::<S>)
                    .delete(parcels::delete_parcel::<S>)
                    .route_layer(identity.clone()),
            )
            .route(
                "/parcel/{id}/status",
                patch(parcels::update_delivery_status::<S>).route_layer(identity.clone()),
            )
            .route(
                "/create-checkout-session",
                post(payments::begin_checkout::<S>).route_layer(identity.clone()),
            )
            .route(
                "/payment-success",
                patch(payments::complete_checkout::<S>).route_layer(identity.clone()),
            )
            .route(
                "/payments",
                get(payments::payment_history::<S>).route_layer(identity),
            )
            .layer(trace_layer)
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
