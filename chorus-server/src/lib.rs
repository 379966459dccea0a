mod context;
mod docs;
mod errors;
mod gateway;
mod rooms;
mod schemas;
mod serialized;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::{http::HeaderValue, routing::get};
use chorus_collab::Collab;
use chorus_core::Config;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::context::ServerContext;

pub use errors::{ServerError, ServerResult};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 4000;

pub type Router = axum::Router<ServerContext>;

/// Where and for whom the server listens.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub port: u16,
    /// The only origin browsers may call from, or any if absent.
    pub frontend_origin: Option<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            frontend_origin: None,
        }
    }
}

/// Starts the chorus server
pub async fn run_server(config: &Config, options: ServerOptions) -> ServerResult<()> {
    let context = ServerContext {
        collab: Arc::new(Collab::new(config)),
    };

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin(options.frontend_origin.as_deref())?)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .route("/health", get(rooms::health))
        .route("/gateway", get(gateway::gateway))
        .route("/api.json", get(docs::docs))
        .nest("/rooms", rooms::router());

    let root_router: axum::Router = Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(context);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, options.port).into();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Bind {
            port: options.port,
            reason: e.to_string(),
        })?;

    info!("Listening on port {}", options.port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .map_err(|e| ServerError::Unknown(e.to_string()))
}

fn allowed_origin(origin: Option<&str>) -> ServerResult<AllowOrigin> {
    match origin {
        Some(origin) => origin
            .parse::<HeaderValue>()
            .map(AllowOrigin::exact)
            .map_err(|_| ServerError::InvalidOrigin(origin.to_string())),
        None => Ok(AllowOrigin::any()),
    }
}
