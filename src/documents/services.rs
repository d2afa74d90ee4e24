use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{multipart, Method, Url};
use tracing::{error, info, instrument, warn};

use crate::{
    api::{decode, ApiClient, AuthMode},
    documents::{
        dto::DocumentPayload,
        model::Document,
        poller::DocumentSource,
        upload::UploadFile,
    },
    error::ClientError,
    navigation::Navigation,
    render,
};

#[instrument(skip(api))]
pub async fn list_documents(api: &ApiClient) -> Result<Vec<Document>, ClientError> {
    let rows: Vec<serde_json::Value> = api.get_json("/documents/", AuthMode::Required).await?;
    let total = rows.len();
    let mut docs = Vec::with_capacity(total);
    for row in rows {
        let id = row.get("id").and_then(|v| v.as_i64());
        let parsed = serde_json::from_value::<DocumentPayload>(row)
            .map_err(|e| ClientError::InvalidPayload(e.to_string()))
            .and_then(Document::try_from);
        match parsed {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!(?id, error = %e, "skipping unreadable document row"),
        }
    }
    info!(count = docs.len(), skipped = total - docs.len(), "documents loaded");
    Ok(docs)
}

#[instrument(skip(api))]
pub async fn get_document(api: &ApiClient, id: i64) -> Result<Document, ClientError> {
    let endpoint = format!("/documents/{}/", id);
    let payload: DocumentPayload = api.get_json(&endpoint, AuthMode::Required).await?;
    Document::try_from(payload)
}

#[instrument(skip(api))]
pub async fn delete_document(api: &ApiClient, id: i64) -> Result<Navigation, ClientError> {
    let endpoint = format!("/documents/{}/", id);
    let resp = api
        .send(Method::DELETE, &endpoint, AuthMode::Required, |r| r)
        .await?;
    decode::read_empty(&endpoint, resp).await?;
    info!(id, "document deleted");
    Ok(Navigation::Dashboard)
}

/// Saves the stored contract, or its improved version, to disk.
///
/// `dest` may be a file or an existing directory; by default the file keeps
/// the server-side name in the working directory. The token only travels to
/// links on the API host.
#[instrument(skip(api))]
pub async fn download(
    api: &ApiClient,
    id: i64,
    improved: bool,
    dest: Option<&Path>,
) -> Result<PathBuf, ClientError> {
    let doc = get_document(api, id).await?;
    let link = if improved {
        doc.improved_file.as_deref().ok_or_else(|| {
            ClientError::Validation("No improved version of this document yet".into())
        })?
    } else {
        doc.file
            .as_deref()
            .ok_or_else(|| ClientError::Validation("This document has no stored file".into()))?
    };

    let url = render::file_link(api.base_url(), link);
    let auth = if same_host(api.base_url(), &url) {
        AuthMode::Optional
    } else {
        warn!(%url, "file hosted elsewhere, fetching without token");
        AuthMode::Anonymous
    };
    let body = api.get_bytes(&url, auth).await?;

    let name = file_name(&url).unwrap_or_else(|| format!("document-{}", id));
    let path = match dest {
        Some(d) if d.is_dir() => d.join(name),
        Some(d) => d.to_path_buf(),
        None => PathBuf::from(name),
    };
    std::fs::write(&path, &body).map_err(|e| ClientError::io(&path, e))?;
    info!(id, improved, path = %path.display(), bytes = body.len(), "document downloaded");
    Ok(path)
}

fn same_host(base_url: &str, url: &str) -> bool {
    match (Url::parse(base_url), Url::parse(url)) {
        (Ok(a), Ok(b)) => a.origin() == b.origin(),
        _ => false,
    }
}

fn file_name(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.path_segments()?
        .last()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Submits a contract to `/analyze/`.
///
/// Signed-in users land on the dashboard, guests get the results inline.
#[instrument(skip(api, file), fields(file = %file.file_name, bytes = file.body.len()))]
pub async fn analyze(api: &ApiClient, file: UploadFile) -> Result<Navigation, ClientError> {
    let authenticated = api.sessions().is_authenticated();
    let part = multipart::Part::bytes(file.body.to_vec())
        .file_name(file.file_name)
        .mime_str(&file.content_type)
        .map_err(|e| ClientError::Validation(format!("content type: {}", e)))?;
    let form = multipart::Form::new().part("file", part);

    let endpoint = "/analyze/";
    let resp = api
        .send(Method::POST, endpoint, AuthMode::Optional, |r| {
            r.multipart(form)
        })
        .await?;
    let payload: DocumentPayload = match decode::read_json(endpoint, resp).await {
        Ok(p) => p,
        Err(e) => {
            match &e {
                ClientError::Unauthorized { .. } | ClientError::Forbidden { .. } => {
                    warn!(error = %e, "upload not allowed, sending to login")
                }
                _ => error!(error = %e, retryable = e.is_retryable(), "upload failed"),
            }
            return Err(e);
        }
    };
    let doc = Document::try_from(payload)?;
    info!(id = ?doc.id, score = ?doc.score, "upload analysed");

    if authenticated {
        Ok(Navigation::Dashboard)
    } else {
        Ok(Navigation::Results(Box::new(doc)))
    }
}

#[async_trait]
impl DocumentSource for ApiClient {
    async fn fetch_document(&self, id: i64) -> Result<Document, ClientError> {
        get_document(self, id).await
    }
}
