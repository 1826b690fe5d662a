use crate::backend::{Product, Verification};
use crate::session::{AccountStatus, RoleRecord, Session};

#[derive(Debug, Clone)]
pub enum AppEvent {
    SessionChanged(Session),
    ProductsLoaded(Vec<Product>),
    PendingVerifiersLoaded(Vec<RoleRecord>),
    ActiveVerifiersLoaded(Vec<RoleRecord>),
    AccountStatusLoaded {
        address: String,
        result: Result<Option<AccountStatus>, String>,
    },
    VerifierModerated {
        address: String,
        status: AccountStatus,
    },
    VerifierWorkLoaded {
        unverified: Vec<Product>,
        history: Vec<Verification>,
    },
    ProductVerified(i64),
    ProductAdded(String),
    VerificationRequested(i64),
    BackendError(String),
}
