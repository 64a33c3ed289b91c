//! Main runtime orchestration.
//!
//! [`WhoDatRuntime`] ties the pieces together:
//!
//! 1. **init**: asks the Bot API who we are (`getMe`) and, when a public
//!    base URL is configured, registers `base_url + secret` as the webhook.
//!    Any failure here aborts startup.
//! 2. **serve**: starts the dispatcher loop, then the webhook server on the
//!    configured address.
//! 3. **shutdown** (Ctrl+C, SIGTERM or a caller-supplied future): the server
//!    stops accepting and finishes in-flight requests, the shutdown sentinel
//!    is queued, and the dispatcher drains everything queued before it.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use whodat_runtime::WhoDatRuntime;
//!
//! let runtime = WhoDatRuntime::builder()
//!     .config_file("whodat.toml")
//!     .set("webhook.port", 8080)
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use whodat_core::{UpdateDispatcher, UpdateQueue, UpdateTypeRegistry};
use whodat_transport::{ApiError, BotApiClient, UrlTemplate, WebhookServer, normalize_secret};

use crate::config::{ConfigLoader, WhoDatConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// The whodat runtime: Bot API client, dispatcher and webhook server.
pub struct WhoDatRuntime {
    /// The configuration.
    config: WhoDatConfig,
    /// Outbound Bot API client.
    client: BotApiClient,
    /// Update dispatcher shared with its consumer task.
    dispatcher: Arc<UpdateDispatcher>,
    /// Whether `serve` is in progress.
    running: AtomicBool,
}

impl WhoDatRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration with the built-in handlers.
    ///
    /// This also initializes logging from `config.logging`.
    pub fn from_config(config: WhoDatConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        Self::with_registry(config, UpdateTypeRegistry::with_defaults())
    }

    /// Creates a runtime routing updates through `registry`.
    ///
    /// Logging is left untouched.
    pub fn with_registry(config: WhoDatConfig, registry: UpdateTypeRegistry) -> RuntimeResult<Self> {
        validate_config(&config)?;

        let template = UrlTemplate::parse(&config.bot.api_url_template).map_err(ApiError::from)?;
        let client = BotApiClient::with_timeout(
            &config.bot.token,
            template,
            Duration::from_secs(config.bot.timeout_secs),
        )?;
        let dispatcher = Arc::new(UpdateDispatcher::new(registry));

        info!(
            log_level = %config.logging.level,
            host = %config.webhook.host,
            port = config.webhook.port,
            update_types = ?dispatcher.registry().update_types(),
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            client,
            dispatcher,
            running: AtomicBool::new(false),
        })
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &WhoDatConfig {
        &self.config
    }

    /// Returns the Bot API client.
    pub fn client(&self) -> &BotApiClient {
        &self.client
    }

    /// Returns the update dispatcher.
    pub fn dispatcher(&self) -> &Arc<UpdateDispatcher> {
        &self.dispatcher
    }

    /// Returns whether the runtime is currently serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns the public webhook URL, if a base URL is configured.
    ///
    /// The secret is resolved against the base URL the way a relative link
    /// would be: `https://example.com/hooks/` gives
    /// `https://example.com/hooks/<secret>`, while `https://example.com/hooks`
    /// gives `https://example.com/<secret>`.
    pub fn webhook_url(&self) -> RuntimeResult<Option<Url>> {
        let Some(base_url) = &self.config.webhook.base_url else {
            return Ok(None);
        };
        let invalid = |reason: String| RuntimeError::WebhookUrl {
            base_url: base_url.clone(),
            reason,
        };

        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        base.join(normalize_secret(&self.config.webhook.secret))
            .map(Some)
            .map_err(|e| invalid(e.to_string()))
    }

    /// Performs the startup Bot API calls and returns the bot's username.
    pub async fn init(&self) -> RuntimeResult<String> {
        let username = self.client.get_username().await?;
        info!(username = %username, "Bot identity confirmed");

        if let Some(url) = self.webhook_url()? {
            self.client.set_webhook(url.as_str()).await?;
            // The URL carries the secret.
            info!(host = url.host_str().unwrap_or_default(), "Webhook registered");
        }

        Ok(username)
    }

    /// Binds the configured listener address.
    pub async fn bind(&self) -> RuntimeResult<TcpListener> {
        let addr = format!("{}:{}", self.config.webhook.host, self.config.webhook.port);
        let result = TcpListener::bind(&addr).await;
        result.map_err(|source| RuntimeError::Bind { addr, source })
    }

    /// Runs the runtime until a shutdown signal is received.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs the runtime with a custom shutdown future.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.init().await?;
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves webhook traffic on `listener` until `shutdown` resolves.
    ///
    /// Skips [`init`](Self::init). Returns immediately if already serving.
    /// Dropping the returned future before it completes still stops the
    /// server and queues the shutdown sentinel, but does not wait for either.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Runtime is already running");
            return Ok(());
        }
        let _running = RunningGuard(&self.running);

        let dispatcher_task = tokio::spawn({
            let dispatcher = Arc::clone(&self.dispatcher);
            async move { dispatcher.run().await }
        });

        let token = CancellationToken::new();
        let server = WebhookServer::new(&self.config.webhook.secret, self.dispatcher.queue());
        let mut server_task = tokio::spawn({
            let token = token.clone();
            async move { server.serve(listener, token).await }
        });

        let mut stop_on_drop = StopOnDrop {
            token: token.clone(),
            queue: self.dispatcher.queue(),
            armed: true,
        };

        info!("whodat is now running. Press Ctrl+C to stop.");

        let finished_early = tokio::select! {
            () = shutdown => None,
            result = &mut server_task => Some(result),
        };

        token.cancel();
        let server_result = match finished_early {
            Some(result) => result,
            None => self.stop_server(server_task).await,
        };
        let server_result = match server_result {
            Ok(result) => result.map_err(RuntimeError::Server),
            Err(err) => join_outcome("webhook server", err),
        };

        self.dispatcher.shutdown();
        stop_on_drop.armed = false;
        let dispatcher_result = match dispatcher_task.await {
            Ok(()) => Ok(()),
            Err(err) => join_outcome("dispatcher", err),
        };

        info!(stats = %self.dispatcher.stats(), "whodat stopped");

        server_result.and(dispatcher_result)
    }

    /// Waits for the cancelled server to finish, aborting it after the grace period.
    async fn stop_server(
        &self,
        mut server_task: JoinHandle<std::io::Result<()>>,
    ) -> Result<std::io::Result<()>, JoinError> {
        let grace = Duration::from_secs(self.config.webhook.shutdown_grace_secs);

        match tokio::time::timeout(grace, &mut server_task).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "In-flight requests did not finish in time, aborting"
                );
                server_task.abort();
                server_task.await
            }
        }
    }
}

/// Maps a failed join: cancellation is an expected part of shutdown.
fn join_outcome(task: &'static str, err: JoinError) -> RuntimeResult<()> {
    if err.is_cancelled() {
        debug!(task, "Task cancelled during shutdown");
        Ok(())
    } else {
        error!(task, "Task panicked");
        Err(RuntimeError::TaskPanicked { task })
    }
}

/// Clears the running flag when serving ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Stops the server and the dispatcher loop if `serve` is dropped midway.
struct StopOnDrop {
    token: CancellationToken,
    queue: UpdateQueue,
    armed: bool,
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if self.armed {
            warn!("Serving was cancelled before shutdown, stopping background tasks");
            self.token.cancel();
            self.queue.shutdown();
        }
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!(error = %err, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            () = wait_for_ctrl_c() => {}
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `WhoDatRuntime` with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    registry: Option<UpdateTypeRegistry>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory, then
    /// the user config directory, for `whodat.toml`.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir().with_user_config_dir(),
            registry: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides a single configuration value by its dotted key path.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Like [`set`](Self::set), skipping `None`.
    pub fn set_opt<T: serde::Serialize>(mut self, key: &str, value: Option<T>) -> Self {
        self.config_loader = self.config_loader.set_opt(key, value);
        self
    }

    /// Routes updates through a custom registry instead of the built-in one.
    pub fn registry(mut self, registry: UpdateTypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Loads the configuration, initializes logging and builds the runtime.
    pub fn build(self) -> RuntimeResult<WhoDatRuntime> {
        let config = self.config_loader.load()?;
        logging::init_from_config(&config.logging);

        let registry = self
            .registry
            .unwrap_or_else(UpdateTypeRegistry::with_defaults);
        WhoDatRuntime::with_registry(config, registry)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
