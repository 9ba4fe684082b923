//! Signed URL generation and verification.
//!
//! `UrlGenerator` composes template substitution, canonical query
//! serialization, URL assembly, and HMAC signing into the two public
//! pipelines: issuing (optionally signed, optionally expiring) URLs and
//! re-deriving the signature from an inbound request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::SignedUrlError;
use crate::models::AppConfig;
use crate::services::query_string::{
    encode_pairs, stringify_query, QueryMap,
};
use crate::services::route_template::{append_query, join_routes, replace_params, ParamMap};
use crate::services::url_signer::{signature_has_expired, UrlSigner};

/// Query keys reserved for signature metadata. Caller-supplied query data
/// must not use these.
pub const RESERVED_QUERY_PARAM_NAMES: [&str; 2] = ["signed", "expirationDate"];

const SIGNED_KEY: &str = "signed";
const EXPIRATION_KEY: &str = "expirationDate";

/// A resolved route target: the template to substitute into, and whether
/// the endpoint declares itself guarded by signed-url verification.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub template: String,
    pub guarded: bool,
}

/// Capability for turning an endpoint name into its route template.
///
/// The host framework knows how routes are declared; the generator only
/// needs `resolve` and the guarded flag, so that stays behind this trait.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, route: &str) -> Option<RouteDescriptor>;

    fn is_guarded(&self, route: &str) -> bool {
        self.resolve(route).map(|d| d.guarded).unwrap_or(false)
    }
}

/// Name to template registry for services that declare their routes up
/// front, which is how the demo server and tests wire things together.
#[derive(Debug, Default)]
pub struct StaticRouteResolver {
    routes: HashMap<String, RouteDescriptor>,
}

impl StaticRouteResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &str, template: &str, guarded: bool) -> Self {
        self.routes.insert(
            name.to_string(),
            RouteDescriptor {
                template: template.to_string(),
                guarded,
            },
        );
        self
    }
}

impl RouteResolver for StaticRouteResolver {
    fn resolve(&self, route: &str) -> Option<RouteDescriptor> {
        self.routes.get(route).cloned()
    }
}

/// Stateless generator/verifier for signed URLs. Construct once at
/// startup; all methods take `&self` and touch no shared mutable state.
pub struct UrlGenerator {
    config: Arc<AppConfig>,
    signer: UrlSigner,
    resolver: Option<Arc<dyn RouteResolver>>,
}

impl UrlGenerator {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, SignedUrlError> {
        if config.secret.len() < 32 {
            tracing::warn!("A min key length of 256-bit or 32 bytes is recommended");
        }
        let signer = UrlSigner::new(&config.secret)?;
        Ok(Self {
            config,
            signer,
            resolver: None,
        })
    }

    /// Attach the route resolver used by the route-targeted operations.
    pub fn with_resolver(mut self, resolver: Arc<dyn RouteResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Scheme of the configured app url (`http` or `https`). The guard
    /// uses this as the protocol of reconstructed inbound URLs, since the
    /// server may sit behind TLS termination.
    pub fn protocol(&self) -> &str {
        self.config
            .app_url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("https")
    }

    /// Build an unsigned URL from a route template, params, and query.
    pub fn generate_url_from_path(
        &self,
        relative_path: &str,
        query: &QueryMap,
        params: &ParamMap,
    ) -> Result<String, SignedUrlError> {
        let path = replace_params(relative_path, params)?;
        Ok(self.assemble(&path, query))
    }

    /// Build an unsigned URL for a named route.
    pub fn generate_url_from_route(
        &self,
        route: &str,
        query: &QueryMap,
        params: &ParamMap,
    ) -> Result<String, SignedUrlError> {
        let descriptor = self.resolve(route)?;
        self.generate_url_from_path(&descriptor.template, query, params)
    }

    /// Build a signed URL, optionally expiring at `expiration_date`.
    ///
    /// The caller's query map is never mutated: the `expirationDate` and
    /// `signed` keys go into a clone. A caller query that already uses a
    /// reserved key is rejected before anything is produced.
    pub fn signed_url(
        &self,
        relative_path: &str,
        expiration_date: Option<DateTime<Utc>>,
        query: &QueryMap,
        params: &ParamMap,
    ) -> Result<String, SignedUrlError> {
        for reserved in RESERVED_QUERY_PARAM_NAMES {
            if query.contains_key(reserved) {
                return Err(SignedUrlError::ReservedKeyConflict(reserved.to_string()));
            }
        }

        let path = replace_params(relative_path, params)?;

        let mut query = query.clone();
        if let Some(expiration_date) = expiration_date {
            query.insert(EXPIRATION_KEY, expiration_date);
        }

        let unsigned_url = self.assemble(&path, &query);
        let signature = self.signer.sign(&unsigned_url);
        query.insert(SIGNED_KEY, signature);

        let signed_url = self.assemble(&path, &query);
        tracing::debug!(url = %signed_url, "Issued signed url");
        Ok(signed_url)
    }

    /// Build a signed URL for a named route. The route must declare itself
    /// guarded; issuing a signed link to an endpoint that never verifies
    /// signatures is a wiring mistake, caught here rather than in traffic.
    pub fn signed_route_url(
        &self,
        route: &str,
        expiration_date: Option<DateTime<Utc>>,
        query: &QueryMap,
        params: &ParamMap,
    ) -> Result<String, SignedUrlError> {
        let descriptor = self.resolve(route)?;
        if !descriptor.guarded {
            return Err(SignedUrlError::UnguardedRoute(route.to_string()));
        }
        self.signed_url(&descriptor.template, expiration_date, query, params)
    }

    /// Verify an inbound request against its embedded signature.
    ///
    /// Structural problems (missing host, path, or `signed` key) and a
    /// signature mismatch are errors; a valid signature past its expiry is
    /// `Ok(false)`. Callers branch on that asymmetry: a forged link is
    /// refused outright, an expired one gets the soft "link expired" path.
    pub fn is_signature_valid(
        &self,
        protocol: &str,
        host: &str,
        route_path: &str,
        query: &[(String, String)],
    ) -> Result<bool, SignedUrlError> {
        self.is_signature_valid_at(protocol, host, route_path, query, Utc::now())
    }

    /// Deterministic variant of [`is_signature_valid`] taking the current
    /// instant explicitly.
    ///
    /// [`is_signature_valid`]: UrlGenerator::is_signature_valid
    pub fn is_signature_valid_at(
        &self,
        protocol: &str,
        host: &str,
        route_path: &str,
        query: &[(String, String)],
        now: DateTime<Utc>,
    ) -> Result<bool, SignedUrlError> {
        if protocol.is_empty() {
            return Err(SignedUrlError::MalformedRequest("protocol"));
        }
        if host.is_empty() {
            return Err(SignedUrlError::MalformedRequest("host"));
        }
        if route_path.is_empty() {
            return Err(SignedUrlError::MalformedRequest("path"));
        }

        let mut supplied = None;
        let mut rest: Vec<(String, String)> = Vec::with_capacity(query.len());
        for (key, value) in query {
            if key == SIGNED_KEY {
                supplied = Some(value.clone());
            } else {
                rest.push((key.clone(), value.clone()));
            }
        }
        let supplied = supplied.ok_or(SignedUrlError::MalformedRequest("signature"))?;

        // Reassemble the exact URL shape generation signed, keeping the
        // remaining keys in the order they arrived on the wire.
        let authority = format!("{protocol}://{host}");
        let url = append_query(&join_routes(&[&authority, route_path]), &encode_pairs(&rest));

        if !self.signer.verify(&url, &supplied) {
            tracing::debug!(url = %url, "Signature mismatch");
            return Err(SignedUrlError::SignatureMismatch);
        }

        if let Some((_, raw)) = rest.iter().find(|(key, _)| key == EXPIRATION_KEY) {
            let expires_at = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| SignedUrlError::MalformedExpiration(raw.clone()))?
                .with_timezone(&Utc);
            if signature_has_expired(expires_at, now) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn assemble(&self, path: &str, query: &QueryMap) -> String {
        let url = join_routes(&[&self.config.app_url, &self.config.global_prefix, path]);
        append_query(&url, &stringify_query(query))
    }

    fn resolve(&self, route: &str) -> Result<RouteDescriptor, SignedUrlError> {
        let resolver = self
            .resolver
            .as_ref()
            .ok_or(SignedUrlError::MissingResolver)?;
        resolver
            .resolve(route)
            .ok_or_else(|| SignedUrlError::UnknownRoute(route.to_string()))
    }
}
