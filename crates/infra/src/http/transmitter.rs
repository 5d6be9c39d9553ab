use std::error::Error as StdError;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deferq_core::{SendRequest, Transmitter};
use deferq_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use deferq_domain::{
    DeferqError, Result, SendAttempt, SendOutcome, SenderStatus, TracedRequest, TransportConfig,
    TransportError,
};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use tracing::debug;

use crate::errors::InfraError;

const PAYLOAD_CONTENT_TYPE: &str = "application/x-proto-binary";
const DEFAULT_ROUTE: &str = "default";

/// One client per local interface.
#[derive(Clone)]
struct Route {
    interface: String,
    client: ReqwestClient,
}

/// [`Transmitter`] that POSTs payloads over one or more local interfaces.
///
/// Each attempt starts on interface `iteration % n` and moves on to the next
/// interface until one succeeds. A 4xx/5xx answer ends the attempt at once
/// when the request asks to bail on HTTP errors.
#[derive(Clone)]
pub struct HttpTransmitter {
    routes: Vec<Route>,
    timeout: Duration,
}

impl HttpTransmitter {
    /// Start building a new transmitter.
    pub fn builder() -> HttpTransmitterBuilder {
        HttpTransmitterBuilder::default()
    }

    /// Build a transmitter from transport settings.
    ///
    /// # Errors
    /// Returns `DeferqError::Config` if an interface is not an IP address.
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let mut builder =
            Self::builder().timeout(config.request_timeout()).user_agent(&config.user_agent);
        for entry in &config.interfaces {
            let address: IpAddr = entry.trim().parse().map_err(|e| {
                DeferqError::Config(format!("invalid interface address '{entry}': {e}"))
            })?;
            builder = builder.interface(address);
        }
        builder.build()
    }

    /// Interface labels in rotation order.
    pub fn interfaces(&self) -> Vec<&str> {
        self.routes.iter().map(|route| route.interface.as_str()).collect()
    }

    fn first_route(&self, iteration: u64) -> usize {
        let count = self.routes.len() as u64;
        usize::try_from(iteration % count).unwrap_or(0)
    }
}

#[async_trait]
impl Transmitter for HttpTransmitter {
    async fn send(&self, request: SendRequest<'_>) -> SendAttempt {
        let count = self.routes.len();
        if count == 0 {
            return SendAttempt::failed(TransportError::NoInterfaces);
        }

        let first = self.first_route(request.iteration);
        let mut outcome = SendOutcome::default();
        let mut traces = Vec::new();
        let mut last_error = None;

        for offset in 0..count {
            let route = &self.routes[(first + offset) % count];
            let started_at = Utc::now();
            let result = route
                .client
                .post(request.destination)
                .header(CONTENT_TYPE, PAYLOAD_CONTENT_TYPE)
                .header(CONTENT_LENGTH, request.size)
                .body(request.payload.to_vec())
                .send()
                .await;
            let finished_at = Utc::now();

            match result {
                Ok(response) => {
                    let code = response.status().as_u16();
                    if request.with_net_tracing {
                        traces.push(trace(route, &request, started_at, finished_at, Some(code), None));
                    }
                    outcome.http_status = Some(code);

                    if response.status().is_success() {
                        debug!(
                            destination = request.destination,
                            interface = %route.interface,
                            status = code,
                            "payload delivered"
                        );
                        outcome.status = SenderStatus::None;
                        outcome.traces = traces;
                        return SendAttempt { outcome, error: None };
                    }

                    outcome.status = SenderStatus::from_http_status(code);
                    let error = TransportError::Request(format!(
                        "{} answered HTTP {code}",
                        request.destination
                    ));
                    debug!(
                        destination = request.destination,
                        interface = %route.interface,
                        status = code,
                        bail = request.bail_on_http_error,
                        "controller rejected payload"
                    );
                    if request.bail_on_http_error {
                        outcome.traces = traces;
                        return SendAttempt { outcome, error: Some(error) };
                    }
                    last_error = Some(error);
                }
                Err(err) => {
                    let error = transport_error(&err, self.timeout);
                    debug!(
                        destination = request.destination,
                        interface = %route.interface,
                        error = %error,
                        "request failed"
                    );
                    if request.with_net_tracing {
                        traces.push(trace(
                            route,
                            &request,
                            started_at,
                            finished_at,
                            None,
                            Some(error.to_string()),
                        ));
                    }
                    if outcome.http_status.is_none() {
                        outcome.status = SenderStatus::Failed;
                    }
                    last_error = Some(error);
                }
            }
        }

        outcome.traces = traces;
        let error = match last_error {
            Some(error) if count == 1 => error,
            Some(error) => TransportError::AllInterfacesFailed {
                destination: request.destination.to_string(),
                attempts: count,
                last: error.to_string(),
            },
            None => TransportError::NoInterfaces,
        };
        SendAttempt { outcome, error: Some(error) }
    }
}

fn trace(
    route: &Route,
    request: &SendRequest<'_>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    http_status: Option<u16>,
    error: Option<String>,
) -> TracedRequest {
    TracedRequest {
        interface: route.interface.clone(),
        destination: request.destination.to_string(),
        started_at,
        finished_at,
        http_status,
        error,
    }
}

fn transport_error(err: &reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout);
    }
    if err.is_connect() {
        return TransportError::Connect(describe(err));
    }
    TransportError::Request(describe(err))
}

/// Error message including its source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Builder for [`HttpTransmitter`].
#[derive(Debug)]
pub struct HttpTransmitterBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    interfaces: Vec<IpAddr>,
}

impl Default for HttpTransmitterBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            interfaces: Vec::new(),
        }
    }
}

impl HttpTransmitterBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Add a local address to bind requests to. Without any, a single client
    /// uses the default route.
    pub fn interface(mut self, address: IpAddr) -> Self {
        self.interfaces.push(address);
        self
    }

    pub fn build(self) -> Result<HttpTransmitter> {
        let mut routes = Vec::with_capacity(self.interfaces.len().max(1));
        if self.interfaces.is_empty() {
            routes.push(Route { interface: DEFAULT_ROUTE.to_string(), client: self.client(None)? });
        }
        for address in &self.interfaces {
            routes.push(Route { interface: address.to_string(), client: self.client(Some(*address))? });
        }

        Ok(HttpTransmitter { routes, timeout: self.timeout })
    }

    fn client(&self, local_address: Option<IpAddr>) -> Result<ReqwestClient> {
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).no_proxy().local_address(local_address);

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.as_str());
        }

        builder.build().map_err(|err| InfraError::from(err).into())
    }
}
