//! Request builder and executor for the InvoiceXpress API.
//!
//! # Design
//! `InvoiceXpressClient` keeps the host-does-IO split: `build_request`
//! resolves a method token into a `RequestPlan`, `build_http_request` turns a
//! plan plus arguments into an `HttpRequest`, and `parse_response` classifies
//! an `HttpResponse`. `send` is the only method that performs I/O, and it
//! does so through the client's `Transport` exactly once per call.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::args::Arguments;
use crate::config::{self, Credentials, DEFAULT_TIMEOUT};
use crate::dispatch::{self, MethodToken, RequestPlan};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::outcome::RequestOutcome;

const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const ACCEPT: &str = "application/json";

/// Client for one InvoiceXpress account.
///
/// Credentials may be supplied later with `init`; until then every attempt
/// to build or send a request fails with `ApiError::Configuration`.
#[derive(Debug, Clone)]
pub struct InvoiceXpressClient<T: Transport = UreqTransport> {
    credentials: Option<Credentials>,
    base_url: Option<String>,
    timeout: Duration,
    transport: T,
}

impl InvoiceXpressClient<UreqTransport> {
    /// Build a client from `INVOICEXPRESS_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        let client = Self::with_credentials(UreqTransport::new(), Credentials::from_env()?);
        Ok(match std::env::var(config::ENV_BASE_URL) {
            Ok(base) if !base.trim().is_empty() => client.with_base_url(&base),
            _ => client,
        })
    }
}

impl<T: Transport> InvoiceXpressClient<T> {
    /// A client with no credentials yet.
    pub fn new(transport: T) -> Self {
        Self {
            credentials: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            transport,
        }
    }

    pub fn with_credentials(transport: T, credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::new(transport)
        }
    }

    /// Replace `https://{subdomain}.app.invoicexpress.com` with another base.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the account credentials, replacing any previous ones.
    pub fn init(&mut self, subdomain: &str, api_token: &str) -> Result<(), ApiError> {
        self.credentials = Some(Credentials::new(subdomain, api_token)?);
        Ok(())
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `entity.action` into a plan. Pure: no credentials, no I/O.
    pub fn build_request(
        &self,
        method_token: &str,
        resource_id: Option<u64>,
        extra_query_value: Option<&str>,
    ) -> Result<RequestPlan, ApiError> {
        let token = MethodToken::parse(method_token)?;
        dispatch::resolve(token, resource_id, extra_query_value)
    }

    /// Render a plan and caller arguments into a concrete request.
    ///
    /// GET requests carry the merged arguments in the query string after
    /// `api_key`; every other verb sends them as a JSON body.
    pub fn build_http_request(
        &self,
        plan: &RequestPlan,
        args: &Arguments,
    ) -> Result<HttpRequest, ApiError> {
        let credentials = self.require_credentials()?;
        let merged = Arguments::merged(&plan.default_args, args);
        let url = self.request_url(credentials, credentials.api_token(), plan, &merged)?;
        let body = match plan.method {
            HttpMethod::Get => None,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Delete => Some(merged.to_json()?),
        };

        let request = HttpRequest {
            method: plan.method,
            url,
            headers: vec![
                ("content-type".to_string(), CONTENT_TYPE.to_string()),
                ("accept".to_string(), ACCEPT.to_string()),
            ],
            body,
            timeout: self.timeout,
        };
        let logged_url = self.redacted_url(plan, &merged)?;
        debug!(
            method = %request.method,
            url = %logged_url,
            body = request.body.as_deref().unwrap_or(""),
            "built request"
        );
        Ok(request)
    }

    /// The request URL with the API key replaced by its masked form, for logs.
    fn redacted_url(&self, plan: &RequestPlan, merged: &Arguments) -> Result<String, ApiError> {
        let credentials = self.require_credentials()?;
        let masked = config::mask(credentials.api_token());
        self.request_url(credentials, &masked, plan, merged)
    }

    /// `{base}/{path}.json?{plan query}&api_key={key}[&{GET arguments}]`
    fn request_url(
        &self,
        credentials: &Credentials,
        api_key: &str,
        plan: &RequestPlan,
        merged: &Arguments,
    ) -> Result<String, ApiError> {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| credentials.api_base_url());
        let raw = format!("{base}/{}.json", plan.path);
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(&plan.query);
            query.append_pair("api_key", api_key);
            if plan.method == HttpMethod::Get {
                query.extend_pairs(merged.to_query_pairs());
            }
        }
        Ok(url.into())
    }

    pub fn parse_response(&self, response: HttpResponse) -> RequestOutcome {
        RequestOutcome::from_response(response)
    }

    /// Execute a plan once and classify the result.
    ///
    /// `Err` is returned only when the request cannot be built; anything that
    /// goes wrong afterwards is reported in the `RequestOutcome`.
    pub fn send(&self, plan: &RequestPlan, args: &Arguments) -> Result<RequestOutcome, ApiError> {
        let request = self.build_http_request(plan, args)?;
        let outcome = match self.transport.execute(&request) {
            Ok(response) => self.parse_response(response),
            Err(err) => RequestOutcome::transport_failure(&err),
        };
        if !outcome.success {
            warn!(
                method = %plan.method,
                path = %plan.path,
                status = outcome.http_status,
                error = outcome.error_message.as_deref().unwrap_or(""),
                "request failed"
            );
        }
        Ok(outcome)
    }

    /// `build_request` followed by `send`.
    pub fn request(
        &self,
        method_token: &str,
        resource_id: Option<u64>,
        extra_query_value: Option<&str>,
        args: &Arguments,
    ) -> Result<RequestOutcome, ApiError> {
        self.require_credentials()?;
        let plan = self.build_request(method_token, resource_id, extra_query_value)?;
        self.send(&plan, args)
    }

    fn require_credentials(&self) -> Result<&Credentials, ApiError> {
        self.credentials.as_ref().ok_or_else(|| {
            ApiError::Configuration(
                "no credentials: call init(subdomain, api_token) before sending requests".to_string(),
            )
        })
    }
}
