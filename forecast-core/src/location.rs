//! Best-effort "where am I" resolution on top of a callback-style platform
//! location capability.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{error::LocationError, model::Coordinate};

pub mod diagnostics;
pub mod fixed;
pub mod ip;
mod settle;

pub use diagnostics::{Diagnostics, diagnose};
pub use fixed::FixedGeolocation;
pub use ip::IpGeolocation;

use settle::Settle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Answer to a permission query. `changes` yields later state transitions
/// when the platform can report them.
#[derive(Debug)]
pub struct PermissionStatus {
    pub state: PermissionState,
    pub changes: Option<watch::Receiver<PermissionState>>,
}

impl PermissionStatus {
    pub fn fixed(state: PermissionState) -> Self {
        Self {
            state,
            changes: None,
        }
    }

    pub fn watching(state: PermissionState, changes: watch::Receiver<PermissionState>) -> Self {
        Self {
            state,
            changes: Some(changes),
        }
    }
}

/// Options handed to the platform with every position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Per-request bound the platform should enforce itself.
    pub timeout: Duration,
    /// A cached fix no older than this may be returned.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(20),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

/// Platform-reported failure codes (`1`, `2`, `3` in the W3C numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Other(u16),
}

impl PositionErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => PositionErrorCode::PermissionDenied,
            2 => PositionErrorCode::PositionUnavailable,
            3 => PositionErrorCode::Timeout,
            other => PositionErrorCode::Other(other),
        }
    }
}

impl From<PositionErrorCode> for LocationError {
    fn from(code: PositionErrorCode) -> Self {
        match code {
            PositionErrorCode::PermissionDenied => LocationError::PermissionDenied,
            PositionErrorCode::PositionUnavailable => LocationError::PositionUnavailable,
            PositionErrorCode::Timeout => LocationError::Timeout,
            PositionErrorCode::Other(_) => LocationError::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coords: Coordinate,
    pub accuracy_meters: Option<f64>,
}

impl From<Coordinate> for Position {
    fn from(coords: Coordinate) -> Self {
        Self {
            coords,
            accuracy_meters: None,
        }
    }
}

/// Callback handle given to [`Geolocation::request_position`].
///
/// May be cloned, stored and called late; once the resolution has settled
/// every call is a no-op returning `false`.
#[derive(Clone)]
pub struct PositionSink {
    cell: Settle<Result<Coordinate, LocationError>>,
}

impl fmt::Debug for PositionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionSink")
            .field("settled", &self.cell.is_settled())
            .finish()
    }
}

impl PositionSink {
    fn new(cell: Settle<Result<Coordinate, LocationError>>) -> Self {
        Self { cell }
    }

    pub fn success(&self, position: Position) -> bool {
        let accepted = self.cell.settle(Ok(position.coords));
        if accepted {
            tracing::info!(
                latitude = position.coords.latitude(),
                longitude = position.coords.longitude(),
                accuracy = ?position.accuracy_meters,
                "location obtained"
            );
        } else {
            tracing::debug!("ignoring position reported after settling");
        }
        accepted
    }

    pub fn failure(&self, code: PositionErrorCode) -> bool {
        let accepted = self.cell.settle(Err(code.into()));
        if accepted {
            tracing::warn!(?code, "location request failed");
        } else {
            tracing::debug!(?code, "ignoring position error reported after settling");
        }
        accepted
    }
}

/// A platform location capability.
#[async_trait]
pub trait Geolocation: Send + Sync + fmt::Debug {
    fn is_supported(&self) -> bool;

    /// Whether the platform considers the current context safe for location
    /// access (HTTPS or a local host).
    fn is_secure_context(&self) -> bool;

    fn supports_permission_query(&self) -> bool {
        false
    }

    async fn query_permission(&self) -> anyhow::Result<PermissionStatus> {
        Err(anyhow::anyhow!("permission query is not supported"))
    }

    /// Start one position request. The outcome is reported through `sink`,
    /// possibly from another task, possibly never.
    fn request_position(&self, options: PositionOptions, sink: PositionSink);
}

/// Timing knobs for [`LocationResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub position: PositionOptions,
    /// Hard bound on each position request, independent of the platform.
    pub outer_timeout: Duration,
    /// How long to wait for a permission prompt answer before requesting
    /// anyway.
    pub prompt_fallback_delay: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            position: PositionOptions::default(),
            outer_timeout: Duration::from_secs(25),
            prompt_fallback_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    platform: Arc<dyn Geolocation>,
    options: ResolverOptions,
}

impl LocationResolver {
    pub fn new(platform: Arc<dyn Geolocation>) -> Self {
        Self {
            platform,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn platform(&self) -> &dyn Geolocation {
        self.platform.as_ref()
    }

    /// Resolve the current position.
    ///
    /// Must be called from within a tokio runtime. Settles exactly once: the
    /// first of platform success, platform failure, outer timeout or a
    /// permission change to denied decides the result.
    pub async fn resolve(&self) -> Result<Coordinate, LocationError> {
        if !self.platform.is_supported() {
            tracing::warn!("location capability is not available");
            return Err(LocationError::Unsupported);
        }

        if !self.platform.is_secure_context() {
            tracing::warn!("refusing location lookup outside a secure context");
            return Err(LocationError::InsecureContext);
        }

        let (cell, settled) = Settle::new();
        let token = CancellationToken::new();
        // Stops listeners and timers once we return.
        let _guard = token.clone().drop_guard();

        let attempt = Attempt {
            platform: Arc::clone(&self.platform),
            options: self.options,
            cell,
            token,
        };

        if self.platform.supports_permission_query() {
            match self.platform.query_permission().await {
                Ok(status) => {
                    tracing::debug!(state = ?status.state, "permission state");
                    match status.state {
                        PermissionState::Denied => return Err(LocationError::PermissionDenied),
                        PermissionState::Granted => attempt.request_position(),
                        PermissionState::Prompt => attempt.await_prompt(status.changes),
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "permission query failed, requesting anyway");
                    attempt.request_position();
                }
            }
        } else {
            attempt.request_position();
        }

        // `attempt` keeps the cell's sender alive, so the receiver only errors
        // if the runtime is shutting down.
        settled.await.unwrap_or(Err(LocationError::Unknown))
    }
}

/// State shared by every task spawned for one `resolve` call.
struct Attempt {
    platform: Arc<dyn Geolocation>,
    options: ResolverOptions,
    cell: Settle<Result<Coordinate, LocationError>>,
    token: CancellationToken,
}

impl Clone for Attempt {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            options: self.options,
            cell: self.cell.clone(),
            token: self.token.clone(),
        }
    }
}

impl Attempt {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task => {}
            }
        });
    }

    fn request_position(&self) {
        let cell = self.cell.clone();
        let outer = self.options.outer_timeout;
        self.spawn(async move {
            tokio::time::sleep(outer).await;
            if cell.settle(Err(LocationError::Timeout)) {
                tracing::warn!(?outer, "location request timed out");
            }
        });

        tracing::debug!(options = ?self.options.position, "requesting position");
        self.platform
            .request_position(self.options.position, PositionSink::new(self.cell.clone()));
    }

    /// Wait for the user to answer a permission prompt, but request after
    /// the fallback delay regardless since not every platform reports
    /// changes.
    fn await_prompt(&self, changes: Option<watch::Receiver<PermissionState>>) {
        tracing::debug!("permission prompt pending, waiting for an answer");

        if let Some(mut changes) = changes {
            let attempt = self.clone();
            self.spawn(async move {
                while changes.changed().await.is_ok() {
                    let state = *changes.borrow_and_update();
                    tracing::debug!(?state, "permission state changed");
                    match state {
                        PermissionState::Granted => {
                            attempt.request_position();
                            break;
                        }
                        PermissionState::Denied => {
                            attempt.cell.settle(Err(LocationError::PermissionDenied));
                            break;
                        }
                        PermissionState::Prompt => {}
                    }
                }
            });
        }

        let attempt = self.clone();
        let delay = self.options.prompt_fallback_delay;
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            if !attempt.cell.is_settled() {
                attempt.request_position();
            }
        });
    }
}
