//! Actor boundary
//!
//! Every backend call goes through an [`ActorTransport`]: a method name plus
//! positional JSON arguments in, a JSON value out. The [`ActorHandle`] builds
//! its transport lazily on first use.

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use serde_json::{json, Value};
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::IrisConfig;
use crate::errors::{IrisError, IrisResult};

#[async_trait(?Send)]
pub trait ActorTransport {
    /// Invoke `method` on the backend actor. Errors are transport failures;
    /// backend-level `Err` results arrive as `Ok` values.
    async fn call(&self, method: &str, args: Value) -> Result<Value, String>;
}

// =============================================================================
// HTTP gateway transport
// =============================================================================

/// Posts `{canister_id, method, args}` to a JSON gateway in front of the actor
pub struct GatewayTransport {
    client: reqwest::Client,
    endpoint: String,
    canister_id: String,
}

impl GatewayTransport {
    pub fn new(config: &IrisConfig) -> Result<Self, String> {
        let endpoint = config.gateway_endpoint();
        url::Url::parse(&endpoint).map_err(|e| format!("Invalid gateway endpoint {}: {}", endpoint, e))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            canister_id: config.canister_id.clone(),
        })
    }
}

#[async_trait(?Send)]
impl ActorTransport for GatewayTransport {
    async fn call(&self, method: &str, args: Value) -> Result<Value, String> {
        let body = json!({
            "canister_id": self.canister_id,
            "method": method,
            "args": args,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Request to {} failed: {}", method, e))?;

        let response = response
            .error_for_status()
            .map_err(|e| format!("Gateway rejected {}: {}", method, e))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("Invalid gateway response for {}: {}", method, e))
    }
}

// =============================================================================
// Lazy actor handle
// =============================================================================

pub type TransportFactory =
    Box<dyn Fn() -> LocalBoxFuture<'static, Result<Rc<dyn ActorTransport>, String>>>;

/// Lazily initialized actor.
///
/// The first caller builds the transport; concurrent callers await that same
/// initialization. A failed initialization leaves the handle empty so the
/// next call retries.
pub struct ActorHandle {
    transport: OnceCell<Rc<dyn ActorTransport>>,
    factory: TransportFactory,
    init_attempts: Cell<u32>,
}

impl ActorHandle {
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<Rc<dyn ActorTransport>, String>> + 'static,
    {
        Self {
            transport: OnceCell::new(),
            factory: Box::new(
                move || -> LocalBoxFuture<'static, Result<Rc<dyn ActorTransport>, String>> {
                    Box::pin(factory())
                },
            ),
            init_attempts: Cell::new(0),
        }
    }

    /// Handle backed by the HTTP gateway described by `config`
    pub fn gateway(config: IrisConfig) -> Self {
        Self::new(move || {
            let config = config.clone();
            async move {
                log::info!("Creating Iris actor for canister {}", config.canister_id);
                GatewayTransport::new(&config).map(|t| Rc::new(t) as Rc<dyn ActorTransport>)
            }
        })
    }

    /// Handle around an already built transport
    pub fn with_transport(transport: Rc<dyn ActorTransport>) -> Self {
        Self {
            transport: OnceCell::new_with(Some(transport)),
            factory: Box::new(
                || -> LocalBoxFuture<'static, Result<Rc<dyn ActorTransport>, String>> {
                    Box::pin(async {
                        Err::<Rc<dyn ActorTransport>, String>("transport already provided".to_string())
                    })
                },
            ),
            init_attempts: Cell::new(0),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.initialized()
    }

    /// Number of times the factory has run
    pub fn init_attempts(&self) -> u32 {
        self.init_attempts.get()
    }

    pub async fn transport(&self) -> IrisResult<Rc<dyn ActorTransport>> {
        self.transport
            .get_or_try_init(|| async {
                self.init_attempts.set(self.init_attempts.get() + 1);
                (self.factory)().await
            })
            .await
            .cloned()
            .map_err(|e| {
                log::error!("Failed to initialize Iris actor: {}", e);
                IrisError::Transport(e)
            })
    }

    pub async fn call(&self, method: &str, args: Value) -> IrisResult<Value> {
        let transport = self.transport().await?;
        log::debug!("Calling Iris actor method {}", method);
        transport
            .call(method, args)
            .await
            .map_err(IrisError::Transport)
    }
}

// =============================================================================
// Timeouts
// =============================================================================

/// Fail with a backend timeout error if `fut` does not finish in time
pub async fn with_timeout<T, F>(fut: F, timeout: Duration, operation: &str) -> IrisResult<T>
where
    F: Future<Output = IrisResult<T>>,
{
    #[cfg(target_arch = "wasm32")]
    {
        use futures::future::{select, Either};
        use futures::pin_mut;
        use gloo_timers::future::TimeoutFuture;

        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let timeout_fut = TimeoutFuture::new(millis);
        pin_mut!(fut);
        pin_mut!(timeout_fut);

        match select(fut, timeout_fut).await {
            Either::Left((result, _)) => result,
            Either::Right((_, _)) => Err(IrisError::timeout(operation, timeout.as_secs())),
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(IrisError::timeout(operation, timeout.as_secs())),
        }
    }
}

// =============================================================================
// Test transport
// =============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    #[derive(Clone)]
    struct Scripted {
        result: Result<Value, String>,
        delay: Option<Duration>,
    }

    /// Scripted in-memory actor that records every call
    #[derive(Default)]
    pub struct MockTransport {
        queued: RefCell<HashMap<String, VecDeque<Scripted>>>,
        standing: RefCell<HashMap<String, Scripted>>,
        calls: RefCell<Vec<(String, Value)>>,
    }

    impl MockTransport {
        pub fn new() -> Rc<Self> {
            Rc::new(Self::default())
        }

        /// Answer every call to `method` with `value`
        pub fn respond(&self, method: &str, value: Value) {
            self.standing.borrow_mut().insert(
                method.to_string(),
                Scripted { result: Ok(value), delay: None },
            );
        }

        /// Answer the next call to `method`, optionally after a delay
        pub fn respond_once(&self, method: &str, value: Value, delay: Option<Duration>) {
            self.queued
                .borrow_mut()
                .entry(method.to_string())
                .or_default()
                .push_back(Scripted { result: Ok(value), delay });
        }

        /// Fail every call to `method` at the transport level
        pub fn fail(&self, method: &str, error: &str) {
            self.standing.borrow_mut().insert(
                method.to_string(),
                Scripted { result: Err(error.to_string()), delay: None },
            );
        }

        /// Answer every call to `method` after `delay`
        pub fn respond_slowly(&self, method: &str, value: Value, delay: Duration) {
            self.standing.borrow_mut().insert(
                method.to_string(),
                Scripted { result: Ok(value), delay: Some(delay) },
            );
        }

        pub fn call_count(&self, method: &str) -> usize {
            self.calls.borrow().iter().filter(|(m, _)| m == method).count()
        }

        pub fn total_calls(&self) -> usize {
            self.calls.borrow().len()
        }

        pub fn last_args(&self, method: &str) -> Option<Value> {
            self.calls
                .borrow()
                .iter()
                .rev()
                .find(|(m, _)| m == method)
                .map(|(_, args)| args.clone())
        }
    }

    #[async_trait(?Send)]
    impl ActorTransport for MockTransport {
        async fn call(&self, method: &str, args: Value) -> Result<Value, String> {
            self.calls.borrow_mut().push((method.to_string(), args));

            let scripted = {
                let queued = self
                    .queued
                    .borrow_mut()
                    .get_mut(method)
                    .and_then(VecDeque::pop_front);
                queued.or_else(|| self.standing.borrow().get(method).cloned())
            };

            let Some(scripted) = scripted else {
                return Err(format!("no response scripted for {}", method));
            };
            if let Some(delay) = scripted.delay {
                tokio::time::sleep(delay).await;
            }
            scripted.result
        }
    }

    /// Actor handle over a fresh mock
    pub fn mock_actor() -> (Rc<MockTransport>, Rc<ActorHandle>) {
        let mock = MockTransport::new();
        let handle = ActorHandle::with_transport(mock.clone());
        (mock, Rc::new(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    fn counting_handle(fail_first: bool) -> ActorHandle {
        let attempts = Rc::new(Cell::new(0u32));
        ActorHandle::new(move || {
            let attempts = attempts.clone();
            async move {
                attempts.set(attempts.get() + 1);
                tokio::time::sleep(Duration::from_millis(10)).await;
                if fail_first && attempts.get() == 1 {
                    return Err("replica unreachable".to_string());
                }
                let mock = MockTransport::new();
                mock.respond("whoami", json!("2vxsx-fae"));
                Ok(mock as Rc<dyn ActorTransport>)
            }
        })
    }

    #[tokio::test]
    async fn test_concurrent_init_runs_factory_once() {
        let handle = counting_handle(false);
        let (a, b) = futures::join!(handle.call("whoami", json!([])), handle.call("whoami", json!([])));
        assert_eq!(a.unwrap(), json!("2vxsx-fae"));
        assert_eq!(b.unwrap(), json!("2vxsx-fae"));
        assert_eq!(handle.init_attempts(), 1);
        assert!(handle.is_initialized());
    }

    #[tokio::test]
    async fn test_failed_init_is_retried() {
        let handle = counting_handle(true);
        let first = handle.call("whoami", json!([])).await;
        assert!(matches!(first, Err(IrisError::Transport(_))));
        assert!(!handle.is_initialized());

        let second = handle.call("whoami", json!([])).await;
        assert!(second.is_ok());
        assert_eq!(handle.init_attempts(), 2);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_backend_error() {
        let result: IrisResult<()> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            Duration::from_millis(20),
            "simulate_plug_wallet_payment",
        )
        .await;
        match result {
            Err(IrisError::Backend(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
