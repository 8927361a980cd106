use std::{convert::Infallible, io::Write};

use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::{
    body::{self, Bytes},
    header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    Request, Response, StatusCode,
};
use mediavault_sdk::{Error, StoredFileName};
use tokio::task::block_in_place;
use tracing::warn;

use crate::Context;

/// Streams the raw request body through the encryptor into storage and
/// responds with the generated stored name.
pub async fn upload(
    ctx: Context,
    mut request: Request<body::Incoming>,
    original_name: &str,
) -> Result<Response<BoxBody<Bytes, Infallible>>, StatusCode> {
    let content_length: u64 = request
        .headers()
        .get(CONTENT_LENGTH)
        .ok_or_else(|| {
            warn!("missing content length in request");
            StatusCode::BAD_REQUEST
        })?
        .to_str()
        .map_err(|err| {
            warn!(%err, "invalid content length in request");
            StatusCode::BAD_REQUEST
        })?
        .parse()
        .map_err(|err| {
            warn!(%err, "invalid content length in request");
            StatusCode::BAD_REQUEST
        })?;

    let name = StoredFileName::generate(original_name).map_err(|err| {
        warn!(%err, "rejected upload file name");
        status_code(&err)
    })?;

    let file = block_in_place(|| ctx.storage.create_file()).map_err(|err| {
        warn!(%err, "failed to create content file");
        status_code(&err)
    })?;
    let mut writer = ctx.cipher.encrypt_writer(file);

    let mut received_length = 0;
    while let Some(frame) = request.body_mut().frame().await {
        let frame = frame.map_err(|err| {
            warn!(%err, "failed to read request frame");
            StatusCode::BAD_REQUEST
        })?;
        let data = frame.data_ref().ok_or_else(|| {
            warn!("unexpected trailer frame in request");
            StatusCode::BAD_REQUEST
        })?;
        received_length += data.len() as u64;
        block_in_place(|| writer.write_all(data)).map_err(|err| {
            warn!(%err, "failed to write to content file");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    }

    if content_length != received_length {
        warn!(content_length, received_length, "content length mismatch");
        return Err(StatusCode::BAD_REQUEST);
    }

    let file = block_in_place(|| writer.finish()).map_err(|err| {
        warn!(%err, "failed to finish content file");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    block_in_place(|| ctx.storage.commit_file(file, &name)).map_err(|err| {
        warn!(%err, "failed to commit content file");
        status_code(&err)
    })?;

    let body = serde_json::json!({ "filename": name.as_str() }).to_string();
    Ok(Response::builder()
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)).boxed())
        .expect("response builder failed"))
}

/// Decrypts a stored file and serves the plaintext with a content type
/// derived from the original extension.
pub fn serve(
    ctx: &Context,
    name: &StoredFileName,
) -> Result<Response<BoxBody<Bytes, Infallible>>, StatusCode> {
    let plaintext = block_in_place(|| ctx.storage.load_decrypted(&ctx.cipher, name)).map_err(
        |err| {
            warn!(%err, "failed to load image");
            status_code(&err)
        },
    )?;
    Ok(Response::builder()
        .header(CONTENT_TYPE, content_type_for(name))
        .header(CONTENT_DISPOSITION, format!("inline; filename=\"{name}\""))
        .header(CACHE_CONTROL, "no-cache")
        .header(CONTENT_LENGTH, plaintext.len())
        .body(Full::new(Bytes::from(plaintext)).boxed())
        .expect("response builder failed"))
}

/// Best-effort removal: the owning record is already being deleted or
/// replaced, so a missing or stuck file must not fail the request.
pub fn remove(
    ctx: &Context,
    name: &StoredFileName,
) -> Result<Response<BoxBody<Bytes, Infallible>>, StatusCode> {
    if let Err(err) = block_in_place(|| ctx.storage.remove(name)) {
        warn!(%err, "failed to remove stored file");
    }
    Ok(Response::new(BodyExt::boxed(Empty::new())))
}

fn status_code(err: &Error) -> StatusCode {
    match err {
        Error::InvalidFileName(_) | Error::SourceRead(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::StorageWrite(_) | Error::StorageRead(_) | Error::Decrypt => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn content_type_for(name: &StoredFileName) -> &'static str {
    match name.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "image/jpeg"
        }
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        Some(ext) if ext.eq_ignore_ascii_case("webp") => "image/webp",
        Some(_) | None => "application/octet-stream",
    }
}
