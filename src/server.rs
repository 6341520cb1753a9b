use std::{future::Future, net::SocketAddr, time::Instant};

use anyhow::Result;
use axum::{
    body::Body,
    extract::Extension,
    http::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::post,
    Router,
    Server,
};
use log::{debug, info};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    store::{rpc_handler, StoreCommand},
    util::*,
};

pub async fn start_server(listen: SocketAddr, store_tx: UnboundedSender<StoreCommand>) -> Result<()> {
    let (addr, server) = bind_server(listen, store_tx)?;
    info!("Listening on {addr}. ");
    server.await
}

/// Binds the peer's RPC surface. Returns the bound address and the future serving it.
pub fn bind_server(
    listen: SocketAddr,
    store_tx: UnboundedSender<StoreCommand>,
) -> Result<(SocketAddr, impl Future<Output = Result<()>>)> {
    let app = Router::new()
        .route("/rpc", post(rpc_handler))
        .layer(Extension(store_tx))
        .layer(middleware::from_fn(request_logger));

    let server = Server::try_bind(&listen)?.serve(app.into_make_service());
    let addr = server.local_addr();

    let serve = async move {
        server.await?;
        Ok::<(), anyhow::Error>(())
    };

    Ok((addr, serve))
}

async fn request_logger(request: Request<Body>, next: Next<Body>) -> impl IntoResponse {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    debug!(
        "{method} {uri} -> {} in {:.3}ms. ",
        response.status().as_u16(),
        as_millis_f64(start.elapsed()),
    );

    response
}
