//! The public entry point: a builder-configured [`Client`] that wires
//! sources, request parsing, variable resolution, and the HTTP transport
//! together behind [`Client::execute`] and [`Client::validate`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::error::HttexError;
use crate::headers::HeaderMap;
use crate::hresp;
use crate::http::HttpClient;
use crate::request::{self, ExternalFileRef, ParseInputs, Request};
use crate::results::ResponseRecord;
use crate::sources::{dotenv, environment, EnvGetter, ProcessEnv};
use crate::vars::{resolve, RequestScope, ResolveContext};

/// Builder for [`Client`].
pub struct ClientBuilder {
    transport: Option<HttpClient>,
    base_url: Option<String>,
    default_headers: HeaderMap,
    programmatic: HashMap<String, String>,
    environment: Option<String>,
    os_env: Arc<dyn EnvGetter>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            base_url: None,
            default_headers: HeaderMap::new(),
            programmatic: HashMap::new(),
            environment: None,
            os_env: Arc::new(ProcessEnv),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies a pre-built HTTP transport, e.g. for tests that point at a
    /// mock server with non-default TLS settings.
    pub fn http_transport(mut self, transport: HttpClient) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.default_headers.insert(name, value);
        }
        self
    }

    pub fn vars(mut self, vars: HashMap<String, String>) -> Self {
        self.programmatic.extend(vars);
        self
    }

    pub fn set_programmatic_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.programmatic.insert(name.into(), value.into());
        self
    }

    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environment = Some(name.into());
        self
    }

    pub fn os_env(mut self, getter: Arc<dyn EnvGetter>) -> Self {
        self.os_env = getter;
        self
    }

    pub fn build(self) -> Result<Client, HttexError> {
        let transport = match self.transport {
            Some(t) => t,
            None => HttpClient::builder().build()?,
        };
        Ok(Client {
            transport,
            base_url: self.base_url,
            default_headers: self.default_headers,
            programmatic: self.programmatic,
            environment: self.environment,
            os_env: self.os_env,
        })
    }
}

pub struct Client {
    transport: HttpClient,
    base_url: Option<String>,
    default_headers: HeaderMap,
    programmatic: HashMap<String, String>,
    environment: Option<String>,
    os_env: Arc<dyn EnvGetter>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Reads and parses `file_path`, resolves every request in file order,
    /// and sends each through the configured transport. A cancelled token
    /// stops further requests from being sent; already-completed responses
    /// are still returned.
    #[instrument(skip(self, cancel), fields(file = %file_path.display()))]
    pub async fn execute(&self, file_path: &Path, cancel: &CancellationToken) -> Result<Vec<ResponseRecord>, HttexError> {
        let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        let dotenv_vars = dotenv::load(dir).await;
        let environment_overlay = match &self.environment {
            Some(name) => environment::load(dir, name).await?,
            None => HashMap::new(),
        };

        let content = tokio::fs::read_to_string(file_path).await?;
        let inputs = ParseInputs {
            programmatic: &self.programmatic,
            environment_overlay: &environment_overlay,
            os_env: self.os_env.as_ref(),
            dotenv: &dotenv_vars,
        };
        let parsed = request::parse(&content, file_path, &inputs)?;
        debug!(count = parsed.requests.len(), "parsed request file");

        let mut records = Vec::with_capacity(parsed.requests.len());
        for request in &parsed.requests {
            if cancel.is_cancelled() {
                records.push(ResponseRecord::errored(request.clone(), "request cancelled"));
                continue;
            }
            let (materialized, body) = self.materialize(request, dir, &environment_overlay, &dotenv_vars).await?;
            let record = self.transport.send(&materialized, body, cancel).await;
            records.push(record);
        }
        Ok(records)
    }

    /// Substitutes every placeholder in `request`'s URL, headers, and body
    /// using a fresh request-scoped system-variable cache, joins a relative
    /// URL against `base_url`, merges in the client's default headers, and
    /// resolves any external file reference.
    async fn materialize(
        &self,
        request: &Request,
        dir: &Path,
        environment_overlay: &HashMap<String, String>,
        dotenv_vars: &HashMap<String, String>,
    ) -> Result<(Request, Vec<u8>), HttexError> {
        let scope = RequestScope::new();
        let ctx = ResolveContext {
            programmatic: &self.programmatic,
            file_scoped: &request.active_variables,
            environment_overlay,
            os_env: self.os_env.as_ref(),
            dotenv: dotenv_vars,
            system: &scope,
        };

        let raw_url = resolve(&request.raw_url, &ctx);
        let raw_url = self.join_base_url(&raw_url);

        // Request headers take precedence for single-value lookups; a
        // default header is only added when the request doesn't already
        // name it, so `get_first` resolves to the request's own value.
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers.iter() {
            headers.insert(name, resolve(value, &ctx));
        }
        for (name, value) in self.default_headers.iter() {
            if !headers.contains(name) {
                headers.insert(name, value);
            }
        }

        let raw_body = resolve(&request.raw_body, &ctx);
        let body = match &request.external_file_ref {
            Some(external) => self.load_external_body(dir, external, &ctx).await?,
            None => raw_body.clone().into_bytes(),
        };

        let materialized = Request {
            name: request.name.clone(),
            method: request.method,
            raw_url,
            http_version: request.http_version.clone(),
            headers,
            raw_body,
            external_file_ref: request.external_file_ref.clone(),
            active_variables: request.active_variables.clone(),
            no_redirect: request.no_redirect,
            file_path: request.file_path.clone(),
            line_number: request.line_number,
        };
        Ok((materialized, body))
    }

    async fn load_external_body(
        &self,
        dir: &Path,
        external: &ExternalFileRef,
        ctx: &ResolveContext<'_>,
    ) -> Result<Vec<u8>, HttexError> {
        let path = dir.join(&external.path);
        let bytes = tokio::fs::read(&path).await?;
        let encoding = external.encoding.unwrap_or(crate::request::Encoding::Utf8);
        let text = encoding.decode(&bytes);
        let text = if external.expand_variables { resolve(&text, ctx) } else { text };
        Ok(text.into_bytes())
    }

    fn join_base_url(&self, url: &str) -> String {
        if url.contains("://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), url),
            None => url.to_string(),
        }
    }

    /// Reads and parses an `.hresp` file, resolves its placeholders, and
    /// validates `actuals` against the resulting expected responses. An
    /// empty expected file paired with non-empty actuals is a usage error,
    /// not a silent pass.
    #[instrument(skip(self, actuals, cancel), fields(file = %file_path.display()))]
    pub async fn validate(
        &self,
        file_path: &Path,
        actuals: &[ResponseRecord],
        cancel: &CancellationToken,
    ) -> Result<(), HttexError> {
        if cancel.is_cancelled() {
            return Err(HttexError::Usage("validation cancelled".to_string()));
        }

        let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        let dotenv_vars = dotenv::load(dir).await;
        let environment_overlay = match &self.environment {
            Some(name) => environment::load(dir, name).await?,
            None => HashMap::new(),
        };

        let content = tokio::fs::read_to_string(file_path).await?;
        let (definitions, remaining) = hresp::extract_definitions(&content);

        let scope = RequestScope::new();
        let ctx = ResolveContext {
            programmatic: &self.programmatic,
            file_scoped: &definitions,
            environment_overlay: &environment_overlay,
            os_env: self.os_env.as_ref(),
            dotenv: &dotenv_vars,
            system: &scope,
        };
        let resolved = resolve(&remaining, &ctx);

        let expected = hresp::parse_responses(&resolved, file_path)?;
        if expected.is_empty() && !actuals.is_empty() {
            return Err(HttexError::Usage(format!(
                "expected-response file '{}' is empty but {} actual response(s) were supplied",
                file_path.display(),
                actuals.len()
            )));
        }

        let source_file = file_path.display().to_string();
        let errors = hresp::validate(&expected, actuals, &source_file);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HttexError::Validation(errors))
        }
    }
}
