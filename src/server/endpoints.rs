//! HTTP endpoints: schema, liveness, and the slice operation itself.

use std::sync::Arc;

use dropshot::{endpoint, HttpError, HttpResponseOk, MultipartBody, RequestContext};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::context::Context;
use crate::{
    report::SliceReport,
    workspace::{SliceParameters, Workspace},
};

/// Return the OpenAPI schema in JSON format.
#[endpoint {
    method = GET,
    path = "/",
    tags = ["meta"],
}]
pub async fn api_get_schema(
    rqctx: RequestContext<Arc<Context>>,
) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
    Ok(HttpResponseOk(rqctx.context().schema.clone()))
}

/// The response from the `/ping` endpoint.
#[derive(Deserialize, Debug, JsonSchema, Serialize)]
pub struct Pong {
    /// The pong response.
    pub message: String,
}

/** Return pong. */
#[endpoint {
    method = GET,
    path = "/ping",
    tags = ["meta"],
}]
pub async fn ping(_rqctx: RequestContext<Arc<Context>>) -> Result<HttpResponseOk<Pong>, HttpError> {
    Ok(HttpResponseOk(Pong {
        message: "pong".to_string(),
    }))
}

/// An uploaded model file.
#[derive(Debug)]
pub(crate) struct FileAttachment {
    pub(crate) file_name: Option<String>,
    pub(crate) content: bytes::Bytes,
}

/// Possible errors returned by the slice endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Some error occurred when processing the multipart upload.
    #[error(transparent)]
    Multer(#[from] multer::Error),

    /// Some error occurred when (de)serializing the parameters.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Missing attachment or parameter data.
    #[error("Missing file attachment or slice parameters.")]
    MissingFileOrParams,

    /// Parameters outside their documented domain.
    #[error("{0}")]
    InvalidParams(String),
}

impl From<Error> for HttpError {
    fn from(err: Error) -> Self {
        Self::for_bad_request(None, err.to_string())
    }
}

/// Parses multipart data into the model attachment and slice parameters:
/// a `file` field carrying the model bytes and a `params` field carrying
/// JSON-encoded [SliceParameters].
pub(crate) async fn parse_multipart_slice_request(
    multipart: &mut multer::Multipart<'_>,
) -> Result<(FileAttachment, SliceParameters), Error> {
    let mut file = None;
    let mut params = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_owned);
                file = Some(FileAttachment {
                    file_name,
                    content: field.bytes().await?,
                });
            }
            Some("params") => {
                params = Some(field.json::<SliceParameters>().await?);
            }
            _ => continue,
        }
    }

    file.zip(params).ok_or(Error::MissingFileOrParams)
}

fn validate(params: &SliceParameters) -> Result<(), Error> {
    if !(0.0..=1.0).contains(&params.infill) {
        return Err(Error::InvalidParams(format!(
            "infill must be a fraction in 0.0..=1.0, got {}",
            params.infill
        )));
    }
    if !params.layer_height.is_finite() || params.layer_height <= 0.0 {
        return Err(Error::InvalidParams(format!(
            "layer_height must be positive, got {}",
            params.layer_height
        )));
    }
    if !params.nozzle_diameter.is_finite() || params.nozzle_diameter <= 0.0 {
        return Err(Error::InvalidParams(format!(
            "nozzle_diameter must be positive, got {}",
            params.nozzle_diameter
        )));
    }
    Ok(())
}

/** Slice an uploaded model. The file must be a 3D model the engine
understands; it is forwarded byte-for-byte. */
#[endpoint {
    method = POST,
    path = "/slice",
    tags = ["slicing"],
}]
pub(crate) async fn slice_model(
    rqctx: RequestContext<Arc<Context>>,
    body: MultipartBody,
) -> Result<HttpResponseOk<SliceReport>, HttpError> {
    let ctx = rqctx.context();
    let mut multipart = body.content;
    let (file, params) = parse_multipart_slice_request(&mut multipart).await?;
    validate(&params)?;

    let file_name = file
        .file_name
        .clone()
        .unwrap_or_else(|| "input.stl".to_string());
    tracing::info!(
        file = file_name,
        material = params.material,
        "slicing uploaded model"
    );

    let mut workspace = Workspace::build(
        &ctx.config.profiles_root,
        &params,
        &file.content,
        &file_name,
    )
    .await
    .map_err(|e| {
        tracing::warn!(error = format!("{:?}", e), "workspace construction failed");
        HttpError::for_internal_error(format!("{}", e))
    })?;
    if ctx.config.keep_workspaces {
        workspace.persist();
    }

    let outcome = ctx.slicer.slice(&workspace).await.map_err(|e| {
        tracing::warn!(error = format!("{:?}", e), "engine invocation failed");
        HttpError::for_internal_error(format!("{}", e))
    })?;

    let report = SliceReport::new(&workspace, outcome, &file_name, &params);
    if report.success {
        Ok(HttpResponseOk(report))
    } else {
        // Non-2xx, but the caller still gets the full report for diagnosis.
        let payload = serde_json::to_string(&report)
            .map_err(|e| HttpError::for_internal_error(format!("{}", e)))?;
        Err(HttpError::for_client_error(
            Some("engine_failure".to_string()),
            http::StatusCode::UNPROCESSABLE_ENTITY,
            payload,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &str)]) -> Bytes {
        let mut body = String::new();
        for (name, file_name, contents) in parts {
            body.push_str(&format!("--{}\r\n", boundary));
            match file_name {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                    name, f
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(contents);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", boundary));
        Bytes::from(body)
    }

    fn multipart(boundary: &'static str, body: Bytes) -> multer::Multipart<'static> {
        let stream = futures::stream::once(async move {
            Ok::<Bytes, std::convert::Infallible>(body)
        });
        multer::Multipart::new(stream, boundary)
    }

    #[tokio::test]
    async fn test_parse_multipart_slice_request() {
        let body = multipart_body(
            "X-BOUNDARY",
            &[
                ("file", Some("cube.stl"), "solid cube"),
                (
                    "params",
                    None,
                    r#"{"material":"PLA","infill":0.2,"layer_height":0.2,"nozzle_diameter":0.4}"#,
                ),
            ],
        );
        let mut multipart = multipart("X-BOUNDARY", body);
        let (file, params) = parse_multipart_slice_request(&mut multipart).await.unwrap();
        assert_eq!(file.file_name.as_deref(), Some("cube.stl"));
        assert_eq!(&file.content[..], b"solid cube");
        assert_eq!(params.material, "PLA");
        assert_eq!(params.infill, 0.2);
        assert_eq!(params.unit, crate::workspace::Unit::Mm);
    }

    #[tokio::test]
    async fn test_parse_multipart_missing_params() {
        let body = multipart_body("X-BOUNDARY", &[("file", Some("cube.stl"), "solid cube")]);
        let mut multipart = multipart("X-BOUNDARY", body);
        let err = parse_multipart_slice_request(&mut multipart).await.unwrap_err();
        assert!(matches!(err, Error::MissingFileOrParams));
    }

    #[test]
    fn test_validate() {
        let mut params = SliceParameters {
            material: "PLA".to_string(),
            infill: 0.2,
            layer_height: 0.2,
            nozzle_diameter: 0.4,
            unit: crate::workspace::Unit::Mm,
        };
        assert!(validate(&params).is_ok());
        params.infill = 1.5;
        assert!(validate(&params).is_err());
        params.infill = 0.2;
        params.layer_height = 0.0;
        assert!(validate(&params).is_err());
    }
}
