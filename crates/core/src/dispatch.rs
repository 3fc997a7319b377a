//! One proxied HTTP exchange, end to end.
//!
//! Every exchange reads its whole body up front, optionally rewrites it,
//! forwards it to the upstream core exactly once, then optionally rewrites
//! the upstream body on the way back. Whenever a body is replaced the
//! response headers are rebuilt around it: `Content-Length` always reflects
//! the emitted bytes and `Content-Type` the emitted representation.
//!
//! Builtin routes:
//! - DELETE /interactions              - reset the registry, then forward
//! - GET    /interactions/verification - forward
//! - POST   /interactions              - register, then forward
//! - POST   /pact                      - forward, merge encodings, persist
//!
//! Everything else goes through [`Dispatcher::dispatch`].

use std::sync::Arc;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{request, Method, Request, Response, Uri};
use tracing::{debug, info};
use wirepact_contract::{Interaction, InteractionSignature, ProtobufDescription};

use crate::assemble::assemble;
use crate::config::{ProxyConfig, ProxyMode};
use crate::error::{DispatchError, SchemaError, UpstreamError};
use crate::persist::ContractWriter;
use crate::registry::InteractionRegistry;
use crate::schema::{ResolvedSchema, SchemaResolver};
use crate::transcode::{binary_to_json, json_to_binary};
use crate::upstream::UpstreamClient;

pub const APPLICATION_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Headers describing a single connection rather than the payload. Never
/// copied in either direction, since bodies are re-emitted in full.
const HOP_BY_HOP: [HeaderName; 3] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    HeaderName::from_static("keep-alive"),
];

pub type DispatchResult = Result<Response<Bytes>, DispatchError>;

/// Representation of the body handed back to the real caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emitted {
    /// Upstream's body, untouched.
    Upstream,
    /// JSON encoded to the binary wire form.
    Binary,
    /// Binary decoded to JSON.
    Json,
}

pub struct Dispatcher {
    config: ProxyConfig,
    registry: Arc<InteractionRegistry>,
    resolver: SchemaResolver,
    upstream: Arc<dyn UpstreamClient>,
    writer: Arc<dyn ContractWriter>,
}

impl Dispatcher {
    pub fn new(
        config: ProxyConfig,
        registry: Arc<InteractionRegistry>,
        upstream: Arc<dyn UpstreamClient>,
        writer: Arc<dyn ContractWriter>,
    ) -> Self {
        let resolver = if config.cache_schemas {
            SchemaResolver::cached()
        } else {
            SchemaResolver::uncached()
        };
        Dispatcher {
            config,
            registry,
            resolver,
            upstream,
            writer,
        }
    }

    pub fn registry(&self) -> &Arc<InteractionRegistry> {
        &self.registry
    }

    /// Route `request` to a builtin operation or to dynamic dispatch.
    pub async fn handle(&self, request: Request<Bytes>) -> DispatchResult {
        match (request.method(), request.uri().path()) {
            (&Method::DELETE, "/interactions") => self.reset_interactions(request).await,
            (&Method::GET, "/interactions/verification") => {
                self.verification_status(request).await
            }
            (&Method::POST, "/interactions") => self.register_interaction(request).await,
            (&Method::POST, "/pact") => self.write_contract(request).await,
            _ => self.dispatch(request).await,
        }
    }

    // ── Builtin routes ───────────────────────────────────────────────

    /// DELETE /interactions
    pub async fn reset_interactions(&self, request: Request<Bytes>) -> DispatchResult {
        self.registry.reset();
        info!("cleared registered interactions");
        self.passthrough(request).await
    }

    /// GET /interactions/verification
    pub async fn verification_status(&self, request: Request<Bytes>) -> DispatchResult {
        self.passthrough(request).await
    }

    /// POST /interactions
    ///
    /// The body is parsed and registered before anything is forwarded: a
    /// body that is not an interaction, or one whose signature is already
    /// registered, never reaches the upstream core. The registration is
    /// withdrawn again unless the upstream core accepts it with a 2xx.
    pub async fn register_interaction(&self, request: Request<Bytes>) -> DispatchResult {
        let interaction =
            Interaction::from_slice(request.body()).map_err(DispatchError::InvalidRegistration)?;
        let signature = interaction.signature();
        let request_encoding = encoding_label(interaction.request.encoding.as_protobuf());
        let response_encoding = encoding_label(interaction.response.encoding.as_protobuf());

        self.registry.set(signature.clone(), interaction)?;

        let result = self.passthrough(request).await;
        match &result {
            Ok(response) if response.status().is_success() => info!(
                %signature,
                %request_encoding,
                %response_encoding,
                "registered interaction"
            ),
            Ok(response) => {
                self.registry.remove(&signature);
                info!(
                    %signature,
                    status = response.status().as_u16(),
                    "upstream rejected interaction, registration withdrawn"
                );
            }
            Err(_) => {
                self.registry.remove(&signature);
                debug!(%signature, "forward failed, registration withdrawn");
            }
        }
        result
    }

    /// POST /pact
    ///
    /// A non-2xx answer from the upstream core is passed through untouched
    /// and nothing is written.
    pub async fn write_contract(&self, request: Request<Bytes>) -> DispatchResult {
        let (parts, body) = request.into_parts();
        let query = parts.uri.query().unwrap_or("").to_string();
        let response = self
            .forward(&parts, parts.uri.path(), &query, body, false)
            .await?;
        if !response.status().is_success() {
            info!(status = response.status().as_u16(), "upstream refused to write contract");
            return Ok(rebuild(response, None, Emitted::Upstream, &parts.method));
        }

        let assembled = assemble(response.body(), &self.registry)?;
        let path = self.config.pact_dir.join(&assembled.file_name);
        self.writer.write(&path, &assembled.bytes).await?;
        info!(
            path = %path.display(),
            interactions = assembled.document.interactions.len(),
            "wrote contract"
        );

        Ok(rebuild(
            response,
            Some(Bytes::from(assembled.bytes)),
            Emitted::Json,
            &parts.method,
        ))
    }

    // ── Dynamic routes ───────────────────────────────────────────────

    /// Proxy a request for a registered interaction, transcoding bodies in
    /// the direction the configured mode calls for.
    ///
    /// The registry is consulted before anything is sent: an unregistered
    /// signature fails without contacting the upstream core.
    pub async fn dispatch(&self, request: Request<Bytes>) -> DispatchResult {
        let (parts, body) = request.into_parts();
        let signature = InteractionSignature::new(
            parts.method.as_str(),
            parts.uri.path(),
            parts.uri.query().unwrap_or(""),
        );
        let interaction = self
            .registry
            .get(&signature)
            .ok_or_else(|| DispatchError::LookupMiss {
                signature: signature.clone(),
            })?;

        let mode = self.config.mode;
        let (body, request_transcoded) = match interaction.request.encoding.as_protobuf() {
            Some(description) if mode == ProxyMode::Verification && !body.is_empty() => {
                let schema = self.schema(description, signature.path())?;
                (Bytes::from(binary_to_json(&body, &schema)?), true)
            }
            _ => (body, false),
        };

        let response = self
            .forward(
                &parts,
                signature.path(),
                signature.query(),
                body,
                request_transcoded,
            )
            .await?;

        let emitted = match interaction.response.encoding.as_protobuf() {
            Some(description) if !response.body().is_empty() => match mode {
                ProxyMode::Recording
                    if response.status().as_u16() == interaction.response.status =>
                {
                    Some((description, Emitted::Binary))
                }
                ProxyMode::Verification if is_octet_stream(response.headers()) => {
                    Some((description, Emitted::Json))
                }
                _ => None,
            },
            _ => None,
        };

        let response = match emitted {
            Some((description, emitted)) => {
                let schema = self.schema(description, signature.path())?;
                let body = match emitted {
                    Emitted::Binary => json_to_binary(response.body(), &schema)?,
                    _ => binary_to_json(response.body(), &schema)?,
                };
                rebuild(response, Some(Bytes::from(body)), emitted, &parts.method)
            }
            None => rebuild(response, None, Emitted::Upstream, &parts.method),
        };

        info!(
            %signature,
            status = response.status().as_u16(),
            request_transcoded,
            response_transcoded = emitted.is_some(),
            body_len = response.body().len(),
            "proxied request"
        );
        Ok(response)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn schema(
        &self,
        description: &ProtobufDescription,
        request_path: &str,
    ) -> Result<ResolvedSchema, SchemaError> {
        self.resolver
            .resolve(description)
            .map_err(|e| e.for_path(request_path))
    }

    async fn passthrough(&self, request: Request<Bytes>) -> DispatchResult {
        let (parts, body) = request.into_parts();
        let query = parts.uri.query().unwrap_or("");
        let response = self
            .forward(&parts, parts.uri.path(), query, body, false)
            .await?;
        Ok(rebuild(response, None, Emitted::Upstream, &parts.method))
    }

    /// Send `body` to the upstream core under `path` and `query`, with the
    /// caller's method and headers.
    async fn forward(
        &self,
        parts: &request::Parts,
        path: &str,
        query: &str,
        body: Bytes,
        json_body: bool,
    ) -> DispatchResult {
        let url = self.config.upstream_uri(path, query);
        let uri = Uri::try_from(url.as_str()).map_err(|e| UpstreamError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let mut headers = HeaderMap::with_capacity(parts.headers.len());
        for (name, value) in &parts.headers {
            if name == header::HOST || name == header::CONTENT_LENGTH || HOP_BY_HOP.contains(name)
            {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        if json_body {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_JSON),
            );
        }

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        debug!(method = %parts.method, %url, "forwarding to upstream");
        Ok(self.upstream.send(outbound).await?)
    }
}

fn encoding_label(description: Option<&ProtobufDescription>) -> String {
    description.map_or_else(|| "plain".to_string(), |d| d.message_name.clone())
}

fn is_octet_stream(headers: &HeaderMap) -> bool {
    headers.get_all(header::CONTENT_TYPE).iter().any(|value| {
        value
            .to_str()
            .ok()
            .and_then(|v| v.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case(OCTET_STREAM))
    })
}

/// Content-Type for an untouched upstream body: every declared value joined
/// with `"; "`, or JSON when upstream declared none.
fn joined_content_type(headers: &HeaderMap) -> HeaderValue {
    let values: Vec<&HeaderValue> = headers.get_all(header::CONTENT_TYPE).iter().collect();
    match values.as_slice() {
        [] => HeaderValue::from_static(APPLICATION_JSON),
        [single] => (*single).clone(),
        many => {
            let joined = many
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join("; ");
            HeaderValue::from_str(&joined)
                .unwrap_or_else(|_| HeaderValue::from_static(APPLICATION_JSON))
        }
    }
}

/// The response handed back to the real caller: upstream's status and
/// headers around `body` (upstream's own body when `None`).
///
/// An untouched answer to HEAD keeps upstream's `Content-Length`, which
/// describes the body a GET would have returned.
fn rebuild(
    upstream: Response<Bytes>,
    body: Option<Bytes>,
    emitted: Emitted,
    method: &Method,
) -> Response<Bytes> {
    let (parts, upstream_body) = upstream.into_parts();
    let advertised_length = match (&body, parts.headers.get(header::CONTENT_LENGTH)) {
        (None, Some(length)) if *method == Method::HEAD => Some(length.clone()),
        _ => None,
    };
    let body = body.unwrap_or(upstream_body);

    let mut headers = HeaderMap::with_capacity(parts.headers.len());
    for (name, value) in &parts.headers {
        if name == header::CONTENT_LENGTH
            || name == header::CONTENT_TYPE
            || HOP_BY_HOP.contains(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    let content_type = match emitted {
        Emitted::Binary => HeaderValue::from_static(OCTET_STREAM),
        Emitted::Json => HeaderValue::from_static(APPLICATION_JSON),
        Emitted::Upstream => joined_content_type(&parts.headers),
    };
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CONTENT_LENGTH,
        advertised_length.unwrap_or_else(|| HeaderValue::from(body.len())),
    );

    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    *response.headers_mut() = headers;
    response
}
