//! Cart Session Controller.
//!
//! Owns the shopper's working cart and moves it between three modes:
//!
//! ```text
//!             complete_login / sync                  merge or fetch done
//! Anonymous ─────────────────────────▶ Authenticating ───────────────────▶ Authenticated
//!     ▲                                                                       │
//!     └──────────────── logout, or 401 on any authenticated call ◀────────────┘
//! ```
//!
//! While anonymous the cart lives in the local store. Once a bearer token is
//! known the account cart held by the remote store is authoritative: every
//! mutation goes to the server and the working cart is replaced by the
//! server's answer.
//!
//! Signing in stages the guest lines, consumes the staging key, and merges the
//! staged lines into the account cart in one request. Lines the server never
//! confirmed stay in `localCartItems` as unsynced lines and are shown merged
//! into the account cart until a later [`CartSession::sync`] lands them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use boutique_core::cart;
use boutique_core::{LineItem, Order, Price, ProductId, ValidationError, merge};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::local::{CartStorage, LocalStore, StoreError, StoredState};
use crate::remote::{RemoteCartStore, RemoteError};

/// Where the session is in the sign-in lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Anonymous,
    Authenticating,
    Authenticated,
}

impl SessionMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal report that a sign-in merge did not reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
    /// Identifies the sign-in attempt in logs.
    pub correlation_id: Uuid,
    /// Lines kept locally because the server did not confirm them.
    pub unsynced_lines: usize,
    /// What went wrong.
    pub message: String,
}

/// Result of a sign-in or sync transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The account cart was fetched, or the staged lines were merged into it.
    Synced {
        correlation_id: Uuid,
        merged_lines: usize,
    },
    /// Signed in, but the account cart could not be reached. The working cart
    /// is a local best effort.
    Degraded(SyncWarning),
    /// Another transition was already running; this attempt did nothing.
    AlreadyInFlight,
}

/// Result of [`CartSession::logout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// Unsynced lines offered to the server before signing out.
    pub unsynced_lines: usize,
    /// Whether those lines were confirmed. Always true when there were none.
    pub saved: bool,
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("already signed in")]
    AlreadyAuthenticated,

    #[error("session expired, signed out")]
    Expired,

    #[error("a sign-in is in progress")]
    Busy,

    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error("cart change was not confirmed: {0}")]
    Remote(#[source] RemoteError),

    #[error("account cart has unsynced lines: {}", .0.message)]
    Unsynced(SyncWarning),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// In-memory mirror of the session.
#[derive(Debug)]
struct SessionState {
    mode: SessionMode,
    token: Option<SecretString>,
    /// Last list the server returned. Empty until the first response.
    server_items: Vec<LineItem>,
    /// Mirror of `localCartItems`.
    local_items: Vec<LineItem>,
    /// Mirror of `pendingMergeCartItems`, or the in-flight staged buffer.
    staged_items: Vec<LineItem>,
}

impl SessionState {
    fn anonymous(local_items: Vec<LineItem>, staged_items: Vec<LineItem>) -> Self {
        Self {
            mode: SessionMode::Anonymous,
            token: None,
            server_items: Vec::new(),
            local_items,
            staged_items,
        }
    }

    fn view(&self) -> Vec<LineItem> {
        let with_local = merge(&self.server_items, &self.local_items);
        merge(&with_local, &self.staged_items)
    }

    fn mirror(&mut self, stored: StoredState) {
        self.local_items = stored.local_cart_items;
        self.staged_items = stored.pending_merge_cart_items;
    }
}

/// Releases the single-flight flag when dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Authenticated request context after unsynced lines are handled.
enum Target {
    Local,
    Remote(SecretString),
}

/// A shopper's cart session.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct CartSession {
    remote: Arc<dyn RemoteCartStore>,
    storage: CartStorage,
    state: Mutex<SessionState>,
    transition_in_flight: AtomicBool,
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("transition_in_flight", &self.transition_in_flight)
            .finish_non_exhaustive()
    }
}

impl CartSession {
    /// Start a session from whatever the local store remembers.
    ///
    /// With a stored token the session is Authenticated and the working cart
    /// is the unsynced lines until [`refresh`](Self::refresh) loads the
    /// account cart. Without one it is Anonymous, and lines left in the
    /// staging key by an interrupted sign-in are folded back into the guest
    /// cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the local store cannot be read or written.
    pub async fn restore(
        remote: Arc<dyn RemoteCartStore>,
        store: Arc<dyn LocalStore>,
    ) -> Result<Self, StoreError> {
        let storage = CartStorage::new(store);
        let stored = storage.load().await?;

        let state = match stored.auth_token {
            Some(token) => {
                info!(
                    unsynced = stored.local_cart_items.len(),
                    staged = stored.pending_merge_cart_items.len(),
                    "Restored signed-in cart session"
                );
                SessionState {
                    mode: SessionMode::Authenticated,
                    token: Some(SecretString::from(token)),
                    server_items: Vec::new(),
                    local_items: stored.local_cart_items,
                    staged_items: stored.pending_merge_cart_items,
                }
            }
            None if !stored.pending_merge_cart_items.is_empty() => {
                info!(
                    staged = stored.pending_merge_cart_items.len(),
                    "Returning staged lines from an interrupted sign-in to the guest cart"
                );
                SessionState::anonymous(storage.unstage_items().await?, Vec::new())
            }
            None => SessionState::anonymous(stored.local_cart_items, Vec::new()),
        };

        Ok(Self {
            remote,
            storage,
            state: Mutex::new(state),
            transition_in_flight: AtomicBool::new(false),
        })
    }

    /// Current mode.
    pub async fn mode(&self) -> SessionMode {
        self.state.lock().await.mode
    }

    /// The working cart.
    pub async fn items(&self) -> Vec<LineItem> {
        self.state.lock().await.view()
    }

    /// Bearer token of the signed-in account.
    pub async fn token(&self) -> Option<SecretString> {
        self.state.lock().await.token.clone()
    }

    // =========================================================================
    // Sign-in transitions
    // =========================================================================

    /// Stage the guest cart before leaving for a redirect-based sign-in.
    ///
    /// The lines move from `localCartItems` to `pendingMergeCartItems` in one
    /// write and are consumed by [`complete_login`](Self::complete_login).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyAuthenticated`] outside Anonymous mode,
    /// or [`SessionError::Store`] if the local store fails.
    pub async fn begin_oauth(&self) -> Result<Vec<LineItem>, SessionError> {
        let mut state = self.state.lock().await;
        if state.mode != SessionMode::Anonymous {
            return Err(SessionError::AlreadyAuthenticated);
        }

        let staged = self.storage.stage_items().await?;
        debug!(staged = staged.len(), "Staged guest cart for OAuth redirect");
        state.local_items.clear();
        state.staged_items.clone_from(&staged);
        Ok(staged)
    }

    /// Undo [`begin_oauth`](Self::begin_oauth) when the redirect was abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyAuthenticated`] outside Anonymous mode,
    /// or [`SessionError::Store`] if the local store fails.
    pub async fn cancel_oauth(&self) -> Result<Vec<LineItem>, SessionError> {
        let mut state = self.state.lock().await;
        if state.mode != SessionMode::Anonymous {
            return Err(SessionError::AlreadyAuthenticated);
        }

        let local = self.storage.unstage_items().await?;
        state.local_items.clone_from(&local);
        state.staged_items.clear();
        Ok(local)
    }

    /// Sign in with a freshly issued bearer token and reconcile carts.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyAuthenticated`] if a token is already in use
    /// - [`SessionError::Expired`] if the server rejects the token
    /// - [`SessionError::Remote`] if the server refuses the merge for a reason
    ///   retrying will not fix; the lines stay in the local cart
    /// - [`SessionError::Store`] if the local store fails
    pub async fn complete_login(&self, token: SecretString) -> Result<LoginOutcome, SessionError> {
        if self.mode().await == SessionMode::Authenticated {
            return Err(SessionError::AlreadyAuthenticated);
        }
        self.reconcile(token).await
    }

    /// Re-run the sign-in merge for lines the server has not confirmed yet.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when signed out, otherwise as
    /// [`complete_login`](Self::complete_login).
    pub async fn sync(&self) -> Result<LoginOutcome, SessionError> {
        let token = {
            let state = self.state.lock().await;
            match (state.mode, &state.token) {
                (SessionMode::Anonymous, _) | (_, None) => {
                    return Err(SessionError::NotAuthenticated);
                }
                (_, Some(token)) => token.clone(),
            }
        };
        self.reconcile(token).await
    }

    /// Finish a sign-in that was interrupted after staging, if there is one.
    ///
    /// # Errors
    ///
    /// As [`sync`](Self::sync).
    pub async fn resume_pending(&self) -> Result<Option<LoginOutcome>, SessionError> {
        let pending = {
            let state = self.state.lock().await;
            state.mode == SessionMode::Authenticated && !state.staged_items.is_empty()
        };
        if !pending {
            return Ok(None);
        }
        info!("Resuming interrupted cart merge");
        self.sync().await.map(Some)
    }

    async fn reconcile(&self, token: SecretString) -> Result<LoginOutcome, SessionError> {
        let Some(_guard) = FlightGuard::acquire(&self.transition_in_flight) else {
            info!("Cart merge already in flight, dropping duplicate attempt");
            return Ok(LoginOutcome::AlreadyInFlight);
        };

        let correlation_id = Uuid::new_v4();
        self.run_transition(token, correlation_id)
            .instrument(info_span!("cart_login", %correlation_id))
            .await
    }

    async fn run_transition(
        &self,
        token: SecretString,
        correlation_id: Uuid,
    ) -> Result<LoginOutcome, SessionError> {
        // Persist the token and stage the local-only lines together.
        let token_value = token.expose_secret().to_owned();
        self.storage
            .update(move |stored| {
                stored.auth_token = Some(token_value);
                let local = std::mem::take(&mut stored.local_cart_items);
                stored.pending_merge_cart_items = merge(&stored.pending_merge_cart_items, &local);
            })
            .await?;

        // Consume the staging key before the request goes out.
        let staged = self.storage.take_staged().await?;
        {
            let mut state = self.state.lock().await;
            state.mode = SessionMode::Authenticating;
            state.token = Some(token.clone());
            state.local_items.clear();
            state.staged_items.clone_from(&staged);
        }
        info!(staged = staged.len(), "Reconciling account cart");

        let result = if staged.is_empty() {
            self.remote.fetch(&token).await
        } else {
            self.remote.merge(&token, &staged).await
        };

        match result {
            Ok(items) => {
                let mut state = self.state.lock().await;
                state.mode = SessionMode::Authenticated;
                state.server_items = items;
                state.staged_items.clear();
                info!(
                    lines = state.server_items.len(),
                    merged = staged.len(),
                    "Account cart synced"
                );
                Ok(LoginOutcome::Synced {
                    correlation_id,
                    merged_lines: staged.len(),
                })
            }
            Err(RemoteError::Unauthorized) => Err(self.expire(&staged).await),
            Err(error) if error.is_transient() => {
                warn!(%error, unsynced = staged.len(), "Account cart merge failed, keeping lines locally");
                let unsynced_lines = self.keep_locally(staged).await?;
                Ok(LoginOutcome::Degraded(SyncWarning {
                    correlation_id,
                    unsynced_lines,
                    message: error.to_string(),
                }))
            }
            Err(error) => {
                error!(%error, unsynced = staged.len(), "Account cart rejected the merge, keeping lines locally");
                self.keep_locally(staged).await?;
                Err(SessionError::Remote(error))
            }
        }
    }

    /// Signed in, with `staged` moved back to the local-only list. Returns
    /// the number of local-only lines.
    async fn keep_locally(&self, staged: Vec<LineItem>) -> Result<usize, SessionError> {
        {
            let mut state = self.state.lock().await;
            state.mode = SessionMode::Authenticated;
            state.local_items = merge(&state.local_items, &staged);
            state.staged_items.clear();
        }
        let (stored, ()) = self
            .storage
            .update(move |stored| {
                stored.local_cart_items = merge(&stored.local_cart_items, &staged);
            })
            .await?;
        let unsynced_lines = stored.local_cart_items.len();
        self.state.lock().await.mirror(stored);
        Ok(unsynced_lines)
    }

    /// Sign out.
    ///
    /// Unsynced lines are offered to the server once. The token and both
    /// cart keys are cleared whether or not that succeeds.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotAuthenticated`] when already signed out
    /// - [`SessionError::Busy`] while a sign-in is running
    /// - [`SessionError::Store`] if clearing the local store fails; the
    ///   in-memory session is signed out regardless
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<LogoutOutcome, SessionError> {
        let Some(_guard) = FlightGuard::acquire(&self.transition_in_flight) else {
            return Err(SessionError::Busy);
        };

        let (token, unsynced) = {
            let state = self.state.lock().await;
            let Some(token) = state.token.clone() else {
                return Err(SessionError::NotAuthenticated);
            };
            (token, merge(&state.local_items, &state.staged_items))
        };

        let saved = if unsynced.is_empty() {
            true
        } else {
            match self.remote.merge(&token, &unsynced).await {
                Ok(_) => true,
                Err(error) => {
                    warn!(%error, lines = unsynced.len(), "Could not save unsynced lines before sign-out");
                    false
                }
            }
        };

        *self.state.lock().await = SessionState::anonymous(Vec::new(), Vec::new());
        self.storage.clear_all().await?;
        info!(saved, "Signed out");

        Ok(LogoutOutcome {
            unsynced_lines: unsynced.len(),
            saved,
        })
    }

    /// Drop to Anonymous after the server rejected the token. `returning`
    /// lines go back into the guest cart.
    async fn expire(&self, returning: &[LineItem]) -> SessionError {
        warn!("Bearer token rejected, signing out");
        let local = {
            let mut state = self.state.lock().await;
            let local = merge(&state.local_items, returning);
            *state = SessionState::anonymous(local.clone(), Vec::new());
            local
        };

        let result = self
            .storage
            .update(move |stored| {
                stored.auth_token = None;
                stored.pending_merge_cart_items.clear();
                stored.local_cart_items = local;
            })
            .await;

        match result {
            Ok(_) => SessionError::Expired,
            Err(error) => SessionError::Store(error),
        }
    }

    // =========================================================================
    // Cart operations
    // =========================================================================

    /// Add a product, incrementing its line if already present.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] for a blank id or name, or quantity 0
    /// - [`SessionError::Remote`] if the server did not confirm the change
    /// - [`SessionError::Expired`] if the token was rejected
    #[instrument(skip(self, name, price, image))]
    pub async fn add_item(
        &self,
        product_id: &str,
        name: &str,
        price: Price,
        quantity: u32,
        image: Option<String>,
    ) -> Result<Vec<LineItem>, SessionError> {
        let item = LineItem::new(product_id, name, price, quantity, image)?;

        match self.target(true).await? {
            Target::Local => {
                let (items, ()) = self
                    .update_local(move |stored| cart::add_item(&mut stored.local_cart_items, item))
                    .await?;
                Ok(items)
            }
            Target::Remote(token) => {
                let result = self.remote.add_item(&token, &item).await;
                self.adopt(result).await
            }
        }
    }

    /// Overwrite a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotInCart`] if the product has no line
    /// - otherwise as [`add_item`](Self::add_item)
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        product_id: &str,
        quantity: u32,
    ) -> Result<Vec<LineItem>, SessionError> {
        let product_id = ProductId::parse(product_id).map_err(ValidationError::from)?;

        match self.target(true).await? {
            Target::Local => {
                let id = product_id.clone();
                let (items, found) = self
                    .update_local(move |stored| {
                        cart::set_quantity(&mut stored.local_cart_items, &id, quantity)
                            || cart::set_quantity(&mut stored.pending_merge_cart_items, &id, quantity)
                    })
                    .await?;
                if found {
                    Ok(items)
                } else {
                    Err(SessionError::NotInCart(product_id))
                }
            }
            Target::Remote(token) => {
                match self.remote.set_quantity(&token, &product_id, quantity).await {
                    Err(RemoteError::NotFound(_)) => Err(SessionError::NotInCart(product_id)),
                    result => self.adopt(result).await,
                }
            }
        }
    }

    /// Remove a line. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// As [`add_item`](Self::add_item).
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: &str) -> Result<Vec<LineItem>, SessionError> {
        let product_id = ProductId::parse(product_id).map_err(ValidationError::from)?;

        match self.target(true).await? {
            Target::Local => {
                let (items, _) = self
                    .update_local(move |stored| {
                        let local = cart::remove_item(&mut stored.local_cart_items, &product_id);
                        let staged =
                            cart::remove_item(&mut stored.pending_merge_cart_items, &product_id);
                        local || staged
                    })
                    .await?;
                Ok(items)
            }
            Target::Remote(token) => {
                let result = self.remote.remove_item(&token, &product_id).await;
                self.adopt(result).await
            }
        }
    }

    /// Empty the cart, including any unsynced lines.
    ///
    /// # Errors
    ///
    /// As [`add_item`](Self::add_item).
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Vec<LineItem>, SessionError> {
        match self.target(false).await? {
            Target::Local => {}
            Target::Remote(token) => {
                self.adopt(self.remote.clear(&token).await).await?;
            }
        }

        let (items, ()) = self
            .update_local(|stored| {
                stored.local_cart_items.clear();
                stored.pending_merge_cart_items.clear();
            })
            .await?;
        Ok(items)
    }

    /// Reload the working cart from its source of truth.
    ///
    /// # Errors
    ///
    /// As [`add_item`](Self::add_item).
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<LineItem>, SessionError> {
        match self.target(false).await? {
            Target::Local => Ok(self.update_local(|_| ()).await?.0),
            Target::Remote(token) => {
                let result = self.remote.fetch(&token).await;
                self.adopt(result).await
            }
        }
    }

    /// Place an order for the account cart, which the server then empties.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotAuthenticated`] for guests
    /// - otherwise as [`add_item`](Self::add_item)
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> Result<Order, SessionError> {
        let Target::Remote(token) = self.target(true).await? else {
            return Err(SessionError::NotAuthenticated);
        };

        match self.remote.checkout(&token).await {
            Ok(order) => {
                self.state.lock().await.server_items.clear();
                info!(order_id = %order.id, total = %order.total, "Order placed");
                Ok(order)
            }
            Err(RemoteError::Unauthorized) => Err(self.expire(&[]).await),
            Err(error) => Err(SessionError::Remote(error)),
        }
    }

    /// Where the next cart operation goes.
    ///
    /// With `flush`, unsynced lines are merged into the account cart first so
    /// a server-side edit sees every line the shopper sees.
    async fn target(&self, flush: bool) -> Result<Target, SessionError> {
        let (token, unsynced) = {
            let state = self.state.lock().await;
            match (state.mode, &state.token) {
                (SessionMode::Anonymous, _) => return Ok(Target::Local),
                (SessionMode::Authenticating, _) => return Err(SessionError::Busy),
                (SessionMode::Authenticated, None) => return Err(SessionError::NotAuthenticated),
                (SessionMode::Authenticated, Some(token)) => (
                    token.clone(),
                    !state.local_items.is_empty() || !state.staged_items.is_empty(),
                ),
            }
        };

        if flush && unsynced {
            match self.reconcile(token.clone()).await? {
                LoginOutcome::Synced { .. } => {}
                LoginOutcome::Degraded(warning) => return Err(SessionError::Unsynced(warning)),
                LoginOutcome::AlreadyInFlight => return Err(SessionError::Busy),
            }
        }

        Ok(Target::Remote(token))
    }

    /// Apply `change` to the stored document and mirror the result.
    async fn update_local<T: Send>(
        &self,
        change: impl FnOnce(&mut StoredState) -> T + Send,
    ) -> Result<(Vec<LineItem>, T), SessionError> {
        let mut state = self.state.lock().await;
        let (stored, output) = self.storage.update(change).await?;
        state.mirror(stored);
        Ok((state.view(), output))
    }

    /// Replace the working cart with the server's answer.
    async fn adopt(
        &self,
        result: Result<Vec<LineItem>, RemoteError>,
    ) -> Result<Vec<LineItem>, SessionError> {
        match result {
            Ok(items) => {
                let mut state = self.state.lock().await;
                state.server_items = items;
                Ok(state.view())
            }
            Err(RemoteError::Unauthorized) => Err(self.expire(&[]).await),
            Err(error) => {
                warn!(%error, "Cart change not confirmed");
                Err(SessionError::Remote(error))
            }
        }
    }
}
