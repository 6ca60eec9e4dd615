//! Tower integration.
//!
//! [`IsolationLayer`] wraps any [`Service`] so every request runs as a
//! [`Command`] through a [`CommandInvoker`]: bulkhead, breaker and timeout
//! included.

use crate::command::{Command, CommandBuilder};
use crate::error::CommandError;
use crate::invoker::{CommandInvoker, InvokeOptions};
use bulwark_core::{BoxError, GroupKey};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};

/// A Tower layer that isolates the wrapped service behind a command.
///
/// # Example
///
/// ```rust
/// use bulwark_command::{CommandInvoker, IsolationLayer};
/// use bulwark_core::MemoryConfig;
/// use tower::{service_fn, Layer, ServiceExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let invoker = CommandInvoker::builder(MemoryConfig::shared([
///     ("command.Geo.Lookup.Timeout", "250"),
/// ]))
/// .build();
///
/// let service = IsolationLayer::new(invoker, "Geo", "Lookup").layer(service_fn(
///     |city: &'static str| async move { Ok::<_, std::io::Error>(city.len()) },
/// ));
///
/// assert_eq!(service.oneshot("Lisbon").await.unwrap(), 6);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IsolationLayer {
    invoker: CommandInvoker,
    template: CommandBuilder,
}

impl IsolationLayer {
    /// Runs requests as commands named `<group>.<name>`.
    pub fn new(invoker: CommandInvoker, group: impl Into<GroupKey>, name: &str) -> Self {
        Self {
            invoker,
            template: Command::builder(group, name),
        }
    }

    /// Uses the breaker named `key` instead of the group's.
    pub fn breaker(mut self, key: impl Into<GroupKey>) -> Self {
        self.template = self.template.breaker(key);
        self
    }

    /// Uses the bulkhead named `key` instead of the group's.
    pub fn bulkhead(mut self, key: impl Into<GroupKey>) -> Self {
        self.template = self.template.bulkhead(key);
        self
    }

    /// Sets the default timeout of every command this layer creates.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.template = self.template.timeout(timeout);
        self
    }
}

impl<S> Layer<S> for IsolationLayer {
    type Service = IsolatedService<S>;

    fn layer(&self, service: S) -> Self::Service {
        IsolatedService {
            inner: service,
            invoker: self.invoker.clone(),
            template: self.template.clone(),
        }
    }
}

/// A service whose calls run through the isolation pipeline.
#[derive(Debug, Clone)]
pub struct IsolatedService<S> {
    inner: S,
    invoker: CommandInvoker,
    template: CommandBuilder,
}

impl<S> IsolatedService<S> {
    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the wrapper, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, Request> Service<Request> for IsolatedService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<BoxError> + 'static,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = CommandError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited inside the command, so
        // a busy service counts against the timeout like any other work.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let inner = self.inner.clone();
        let invoker = self.invoker.clone();
        let command = self
            .template
            .clone()
            .build(move |_token| inner.oneshot(request));

        Box::pin(async move { invoker.invoke_throw(&command, InvokeOptions::new()).await })
    }
}
