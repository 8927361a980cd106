use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{
    body::{self, Bytes},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use mediavault_sdk::{
    credentials::{EncryptionKey, InitVector},
    crypto::Cipher,
    Storage, StoredFileName,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod images;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub storage_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub encryption_key: EncryptionKey,
    pub init_vector: InitVector,
}

#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub(crate) storage: Arc<Storage>,
    pub(crate) cipher: Arc<Cipher>,
}

pub async fn run(config: Config) -> Result<()> {
    let ctx = Context {
        storage: Arc::new(Storage::new(config.storage_path)?),
        cipher: Arc::new(Cipher::new(&config.encryption_key, &config.init_vector)),
    };

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on: {}", config.bind_addr);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(err) = http1::Builder::new()
                        .keep_alive(true)
                        .serve_connection(
                            TokioIo::new(stream),
                            service_fn(move |req| handle_request(ctx.clone(), req)),
                        )
                        .await
                    {
                        warn!(?err, "error while serving HTTP connection");
                    }
                });
            }
            Err(err) => warn!(?err, "failed to accept"),
        }
    }
}

async fn handle_request(
    ctx: Context,
    request: Request<body::Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
    try_handle_request(ctx, request).await.or_else(|code| {
        Ok(Response::builder()
            .status(code)
            .body(Full::new(Bytes::from(code.as_str().to_owned())).boxed())
            .expect("response builder failed"))
    })
}

async fn try_handle_request(
    ctx: Context,
    request: Request<body::Incoming>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, StatusCode> {
    let path = request.uri().path();
    let Some(rest) = path.strip_prefix("/images/") else {
        return Err(StatusCode::NOT_FOUND);
    };
    if request.method() == Method::POST {
        let original_name = rest.to_owned();
        images::upload(ctx, request, &original_name).await
    } else if request.method() == Method::GET {
        let name = parse_name(rest)?;
        images::serve(&ctx, &name)
    } else if request.method() == Method::DELETE {
        let name = parse_name(rest)?;
        images::remove(&ctx, &name)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

// Validates before any filesystem access; a name with path separators or
// dot-segments never reaches the storage layer.
fn parse_name(value: &str) -> Result<StoredFileName, StatusCode> {
    value.parse().map_err(|err| {
        warn!(%err, "invalid file name in request path");
        StatusCode::BAD_REQUEST
    })
}
