//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{MAX_CODE_TTL_SECS, StorefrontConfig};
use crate::services::{
    EmailError, LogMailer, Mailer, OrderService, SmtpMailer, VerificationService,
};
use crate::store::{MemoryStore, VerificationStore};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email transport: {0}")]
    Mailer(#[from] EmailError),
    #[error("code TTL out of range")]
    InvalidTtl,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared services and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    verification: VerificationService,
    orders: OrderService,
}

impl AppState {
    /// Create the production state: SMTP (or log-only) mail, in-memory
    /// code store, wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP configuration is unusable.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp, &config.from_name)?),
            None => {
                tracing::warn!("SMTP not configured - emails will be logged instead of sent");
                Arc::new(LogMailer)
            }
        };

        Self::with_parts(
            config,
            mailer,
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Create state from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured code TTL is zero or longer than
    /// [`MAX_CODE_TTL_SECS`].
    pub fn with_parts(
        config: StorefrontConfig,
        mailer: Arc<dyn Mailer>,
        store: Arc<dyn VerificationStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StateError> {
        if config.code_ttl.is_zero() || config.code_ttl.as_secs() > MAX_CODE_TTL_SECS {
            return Err(StateError::InvalidTtl);
        }
        let ttl = Duration::from_std(config.code_ttl).map_err(|_| StateError::InvalidTtl)?;

        let verification = VerificationService::new(
            store,
            Arc::clone(&mailer),
            clock,
            ttl,
            config.from_name.clone(),
        );
        let orders = OrderService::new(
            mailer,
            config.owner_email.clone(),
            config.from_name.clone(),
            config.delivery_policy,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                verification,
                orders,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the verification code service.
    #[must_use]
    pub fn verification(&self) -> &VerificationService {
        &self.inner.verification
    }

    /// Get a reference to the order notification service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Start purging stale verification codes in the background.
    ///
    /// Runs until the runtime shuts down.
    pub fn start_verification_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let verification = self.inner.verification.clone();
        let period: StdDuration = self.inner.config.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                verification.purge_stale();
            }
        })
    }
}
