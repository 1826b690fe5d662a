use crate::backend::{BackendError, RoleStore};
use crate::event::AppEvent;
use crate::role::RoleName;
use crate::session::{normalize_address, AccountStatus, Session, SessionStatus};
use crate::wallet::{WalletError, WalletProvider};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, PoisonError, RwLock, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no wallet available: {0}")]
    WalletUnavailable(String),
    #[error("wallet connection was rejected")]
    UserRejected,
    #[error("select a role to register this wallet")]
    MissingRole,
    #[error("this wallet is already registered as a {registered}, not a {requested}")]
    RoleMismatch {
        registered: RoleName,
        requested: RoleName,
    },
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<WalletError> for SessionError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => Self::UserRejected,
            other => Self::WalletUnavailable(other.to_string()),
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(Session),
    /// A wallet prompt is already pending; nothing was issued.
    AlreadyConnecting,
    /// A disconnect or abandon happened while suspended; the result was dropped.
    Superseded,
}

/// Resolves the active wallet, its role, and therefore the reachable
/// dashboard. The only writer of [`Session`].
#[derive(Clone)]
pub struct SessionCoordinator {
    wallet: Arc<dyn WalletProvider>,
    roles: Arc<dyn RoleStore>,
    session: Arc<RwLock<Session>>,
    epoch: Arc<AtomicU64>,
    listener_started: Arc<AtomicBool>,
    tx: Option<mpsc::Sender<AppEvent>>,
}

impl SessionCoordinator {
    pub fn new(wallet: Arc<dyn WalletProvider>, roles: Arc<dyn RoleStore>) -> Self {
        Self {
            wallet,
            roles,
            session: Arc::new(RwLock::new(Session::default())),
            epoch: Arc::new(AtomicU64::new(0)),
            listener_started: Arc::new(AtomicBool::new(false)),
            tx: None,
        }
    }

    pub fn with_events(mut self, tx: mpsc::Sender<AppEvent>) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn session(&self) -> Session {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: Session) {
        debug_assert!(snapshot.is_consistent());
        if let Some(tx) = &self.tx {
            let _ = tx.send(AppEvent::SessionChanged(snapshot));
        }
    }

    pub async fn connect(
        &self,
        requested_role: Option<RoleName>,
    ) -> Result<ConnectOutcome, SessionError> {
        let (epoch, snapshot) = {
            let mut session = self.write_session();
            if session.status == SessionStatus::Connecting {
                debug!("connect ignored, a wallet prompt is already pending");
                return Ok(ConnectOutcome::AlreadyConnecting);
            }
            session.status = SessionStatus::Connecting;
            session.last_error = None;
            (self.epoch.load(Ordering::SeqCst), session.clone())
        };
        self.publish(snapshot);

        let resolved = self.resolve(requested_role).await;

        let (outcome, snapshot) = {
            let mut session = self.write_session();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("connect result discarded, session was superseded");
                return Ok(ConnectOutcome::Superseded);
            }

            match resolved {
                Ok((address, role)) => {
                    info!("wallet {address} connected as {role}");
                    session.address = Some(address);
                    session.role = Some(role);
                    session.status = SessionStatus::Idle;
                    (Ok(ConnectOutcome::Connected(session.clone())), session.clone())
                }
                Err(err) => {
                    warn!("wallet connect failed: {err}");
                    session.status = SessionStatus::Error;
                    session.last_error = Some(err.to_string());
                    (Err(err), session.clone())
                }
            }
        };
        self.publish(snapshot);

        if outcome.is_ok() {
            self.spawn_account_listener();
        }
        outcome
    }

    async fn resolve(
        &self,
        requested_role: Option<RoleName>,
    ) -> Result<(String, RoleName), SessionError> {
        let account = self.wallet.request_accounts().await?;
        let address = normalize_address(&account)
            .ok_or_else(|| SessionError::WalletUnavailable("wallet returned an empty account".to_string()))?;

        match self.roles.get_role_record(&address).await? {
            Some(record) => match requested_role {
                Some(requested) if requested != record.role => Err(SessionError::RoleMismatch {
                    registered: record.role,
                    requested,
                }),
                _ => Ok((address, record.role)),
            },
            None => {
                let role = requested_role.ok_or(SessionError::MissingRole)?;
                let status = AccountStatus::initial_for(role);
                info!("registering {address} as {role} ({})", status.as_str());
                self.roles.create_role_record(&address, role, status).await?;
                Ok((address, role))
            }
        }
    }

    /// Clears local state only; wallet permissions are left alone.
    pub fn disconnect(&self) {
        let snapshot = {
            let mut session = self.write_session();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *session = Session::default();
            session.clone()
        };
        self.publish(snapshot);
    }

    /// Drops an in-flight connect whose view has gone away.
    pub fn abandon_pending(&self) {
        let snapshot = {
            let mut session = self.write_session();
            if session.status != SessionStatus::Connecting {
                return;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            session.status = SessionStatus::Idle;
            session.clone()
        };
        debug!("pending connect abandoned");
        self.publish(snapshot);
    }

    pub async fn on_external_account_change(&self, new_address: Option<String>) {
        let Some(address) = new_address.as_deref().and_then(normalize_address) else {
            info!("wallet exposes no account, disconnecting");
            self.disconnect();
            return;
        };

        let epoch = {
            let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
            if session.address.is_none() {
                debug!("account change ignored, no wallet connected");
                return;
            }
            self.epoch.load(Ordering::SeqCst)
        };

        let (role, lookup_error) = match self.roles.get_role_record(&address).await {
            Ok(record) => (record.map(|record| record.role), None),
            Err(err) => {
                warn!("role lookup for switched account {address} failed: {err}");
                (None, Some(SessionError::from(err).to_string()))
            }
        };

        let snapshot = {
            let mut session = self.write_session();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!("account change discarded, session was superseded");
                return;
            }
            info!("active account switched to {address}");
            session.address = Some(address);
            session.role = role;
            if lookup_error.is_some() {
                session.last_error = lookup_error;
            }
            session.clone()
        };
        self.publish(snapshot);
    }

    fn spawn_account_listener(&self) {
        if self
            .listener_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let mut changes = self.wallet.subscribe_account_changes();
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(account) => coordinator.on_external_account_change(account).await,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("account listener skipped {skipped} stale events");
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        coordinator.listener_started.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });
    }
}
