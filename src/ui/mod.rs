use crate::backend::{NewProduct, NewVerificationRequest};
use crate::role::{RoleName, Route};
use crate::session::AccountStatus;

pub mod auth;
pub mod dashboard;
pub mod marketplace;

/// What a view asks the app to do. Views never touch the coordinator or the
/// backend themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Navigate(Route),
    SelectRole(RoleName),
    Connect(Option<RoleName>),
    Disconnect,
    RefreshProducts,
    RefreshPendingVerifiers,
    RefreshAccountStatus,
    RefreshActiveVerifiers,
    RefreshVerifierWork,
    Moderate {
        address: String,
        status: AccountStatus,
    },
    AddProduct(NewProduct),
    RequestVerification(NewVerificationRequest),
    VerifyProduct(i64),
}

impl UiAction {
    pub fn to_log_line(&self) -> String {
        match self {
            Self::Navigate(route) => format!("navigate path={}", route.path()),
            Self::SelectRole(role) => format!("select_role role={role}"),
            Self::Connect(Some(role)) => format!("connect requested_role={role}"),
            Self::Connect(None) => "connect requested_role=none".to_string(),
            Self::Disconnect => "disconnect".to_string(),
            Self::RefreshProducts => "refresh products".to_string(),
            Self::RefreshPendingVerifiers => "refresh pending_verifiers".to_string(),
            Self::RefreshAccountStatus => "refresh account_status".to_string(),
            Self::RefreshActiveVerifiers => "refresh active_verifiers".to_string(),
            Self::RefreshVerifierWork => "refresh verifier_work".to_string(),
            Self::Moderate { address, status } => {
                format!("moderate address={address} status={}", status.as_str())
            }
            Self::AddProduct(product) => format!("add_product name={}", product.name),
            Self::RequestVerification(request) => format!(
                "request_verification product={} verifier={}",
                request.product_id, request.verifier_address
            ),
            Self::VerifyProduct(product_id) => format!("verify_product product={product_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UiAction;
    use crate::role::{RoleName, Route};
    use crate::session::AccountStatus;

    #[test]
    fn log_lines_name_the_target() {
        assert_eq!(
            UiAction::Navigate(Route::Dashboard(RoleName::Verifier)).to_log_line(),
            "navigate path=/verifier/dashboard"
        );
        assert_eq!(
            UiAction::Connect(None).to_log_line(),
            "connect requested_role=none"
        );
        assert_eq!(
            UiAction::Moderate {
                address: "0xcc".to_string(),
                status: AccountStatus::Rejected,
            }
            .to_log_line(),
            "moderate address=0xcc status=rejected"
        );
        assert_eq!(
            UiAction::VerifyProduct(12).to_log_line(),
            "verify_product product=12"
        );
    }
}
