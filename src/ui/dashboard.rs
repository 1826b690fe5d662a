use crate::backend::{NewProduct, NewVerificationRequest, Product, Verification, PRODUCT_PENDING};
use crate::role::RoleName;
use crate::session::{short_address, AccountStatus, RoleRecord, Session};
use crate::theme::Theme;
use crate::ui::marketplace::{inventory_summary, render_products};
use crate::ui::UiAction;
use eframe::egui::{self, RichText};

pub const PRODUCT_TYPES: [&str; 5] = ["apple", "banana", "blueberry", "grapes", "pineapple"];

/// Where the verifier dashboard is with its account status lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccountStatusState {
    #[default]
    NotLoaded,
    Loading,
    /// `None` means the backend holds no record for the wallet.
    Loaded(Option<AccountStatus>),
    Failed(String),
}

impl AccountStatusState {
    pub fn from_lookup(result: Result<Option<AccountStatus>, String>) -> Self {
        match result {
            Ok(status) => Self::Loaded(status),
            Err(message) => Self::Failed(message),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loaded(Some(AccountStatus::Active)))
    }
}

/// Text fields of the farmer's "Add Product" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub kind: String,
    pub price: String,
    pub inventory: String,
    pub description: String,
    pub image_url: String,
    pub error: Option<String>,
}

impl ProductDraft {
    pub fn to_new_product(&self, farmer: &str) -> Result<NewProduct, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Product name is required".to_string());
        }
        let kind = self.kind.trim();
        if kind.is_empty() {
            return Err("Choose a product type".to_string());
        }
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite() && *price >= 0.0)
            .ok_or_else(|| "Price must be a non-negative number".to_string())?;
        let inventory = self
            .inventory
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|units| *units >= 0)
            .ok_or_else(|| "Inventory must be a whole number of units".to_string())?;
        let image_url = Some(self.image_url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(NewProduct {
            name: name.to_string(),
            kind: kind.to_string(),
            price,
            inventory,
            description: self.description.trim().to_string(),
            image_url,
            farmer: farmer.to_string(),
            status: PRODUCT_PENDING,
        })
    }
}

/// The farmer's "Request Verification" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationRequestDraft {
    pub product_id: Option<i64>,
    pub verifier: Option<String>,
}

impl VerificationRequestDraft {
    pub fn to_request(&self, farmer: &str, now: &str) -> Option<NewVerificationRequest> {
        let product_id = self.product_id?;
        let verifier = self.verifier.clone()?;
        Some(NewVerificationRequest {
            product_id,
            farmer_address: farmer.to_string(),
            verifier_address: verifier,
            status: PRODUCT_PENDING,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DashboardForms {
    pub product: ProductDraft,
    pub request: VerificationRequestDraft,
    pub notice: Option<String>,
}

pub struct DashboardView<'a> {
    pub session: &'a Session,
    pub products: &'a [Product],
    pub products_loading: bool,
    pub pending_verifiers: &'a [RoleRecord],
    pub active_verifiers: &'a [RoleRecord],
    pub account_status: &'a AccountStatusState,
    pub unverified_products: &'a [Product],
    pub verification_history: &'a [Verification],
}

pub fn render_dashboard(
    ui: &mut egui::Ui,
    theme: &Theme,
    role: RoleName,
    view: &DashboardView<'_>,
    forms: &mut DashboardForms,
    emit: &mut dyn FnMut(UiAction),
) {
    ui.label(
        RichText::new(format!("{} Dashboard", role.title()))
            .size(22.0)
            .strong()
            .color(theme.role_color(role)),
    );
    if let Some(address) = &view.session.address {
        ui.monospace(short_address(address));
    }
    ui.separator();

    match role {
        RoleName::Farmer => render_farmer(ui, theme, view, forms, emit),
        RoleName::Consumer => {
            render_products(ui, theme, "Marketplace", view.products, view.products_loading, emit);
        }
        RoleName::Verifier => render_verifier(ui, theme, view, emit),
        RoleName::Financial => render_financial(ui, theme, view, emit),
        RoleName::Admin => render_admin(ui, theme, view, emit),
    }
}

fn render_farmer(
    ui: &mut egui::Ui,
    theme: &Theme,
    view: &DashboardView<'_>,
    forms: &mut DashboardForms,
    emit: &mut dyn FnMut(UiAction),
) {
    let Some(address) = view.session.address.as_deref() else {
        return;
    };
    let own: Vec<Product> = view
        .products
        .iter()
        .filter(|product| product.listed_by(address))
        .cloned()
        .collect();

    if let Some(notice) = &forms.notice {
        theme.notice_frame(theme.success).show(ui, |ui| {
            ui.label(notice.as_str());
        });
    }

    egui::CollapsingHeader::new("Add Product")
        .default_open(false)
        .show(ui, |ui| render_product_form(ui, theme, address, &mut forms.product, emit));

    egui::CollapsingHeader::new("Request Verification")
        .default_open(false)
        .show(ui, |ui| {
            render_request_form(ui, theme, address, &own, view.active_verifiers, &mut forms.request, emit)
        });

    ui.add_space(theme.spacing_8);
    render_products(ui, theme, "My Products", &own, view.products_loading, emit);
}

fn render_product_form(
    ui: &mut egui::Ui,
    theme: &Theme,
    farmer: &str,
    draft: &mut ProductDraft,
    emit: &mut dyn FnMut(UiAction),
) {
    egui::Grid::new("add_product_form")
        .num_columns(2)
        .show(ui, |ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut draft.name);
            ui.end_row();
            ui.label("Type");
            egui::ComboBox::from_id_salt("product_type")
                .selected_text(if draft.kind.is_empty() { "Select" } else { draft.kind.as_str() })
                .show_ui(ui, |ui| {
                    for kind in PRODUCT_TYPES {
                        ui.selectable_value(&mut draft.kind, kind.to_string(), kind);
                    }
                });
            ui.end_row();
            ui.label("Price");
            ui.text_edit_singleline(&mut draft.price);
            ui.end_row();
            ui.label("Inventory");
            ui.text_edit_singleline(&mut draft.inventory);
            ui.end_row();
            ui.label("Description");
            ui.text_edit_multiline(&mut draft.description);
            ui.end_row();
            ui.label("Image url");
            ui.text_edit_singleline(&mut draft.image_url);
            ui.end_row();
        });

    if let Some(error) = &draft.error {
        ui.label(RichText::new(error).color(theme.danger));
    }
    if ui.button("Add Product").clicked() {
        match draft.to_new_product(farmer) {
            Ok(product) => {
                draft.error = None;
                emit(UiAction::AddProduct(product));
            }
            Err(message) => draft.error = Some(message),
        }
    }
}

fn render_request_form(
    ui: &mut egui::Ui,
    theme: &Theme,
    farmer: &str,
    own: &[Product],
    verifiers: &[RoleRecord],
    draft: &mut VerificationRequestDraft,
    emit: &mut dyn FnMut(UiAction),
) {
    let unverified: Vec<&Product> = own.iter().filter(|product| !product.is_verified()).collect();
    if unverified.is_empty() {
        ui.label(RichText::new("All of your products are verified").color(theme.text_muted));
        return;
    }
    if verifiers.is_empty() {
        ui.horizontal(|ui| {
            ui.label(RichText::new("No active verifiers yet").color(theme.text_muted));
            if ui.button("Reload").clicked() {
                emit(UiAction::RefreshActiveVerifiers);
            }
        });
        return;
    }

    let selected_product = draft
        .product_id
        .and_then(|id| unverified.iter().find(|product| product.id == id))
        .map(|product| product.name.clone())
        .unwrap_or_else(|| "Select a product".to_string());
    egui::ComboBox::from_id_salt("request_product")
        .selected_text(selected_product)
        .show_ui(ui, |ui| {
            for product in &unverified {
                ui.selectable_value(&mut draft.product_id, Some(product.id), product.name.as_str());
            }
        });

    let selected_verifier = draft
        .verifier
        .as_deref()
        .map(short_address)
        .unwrap_or_else(|| "Select a verifier".to_string());
    egui::ComboBox::from_id_salt("request_verifier")
        .selected_text(selected_verifier)
        .show_ui(ui, |ui| {
            for record in verifiers {
                ui.selectable_value(
                    &mut draft.verifier,
                    Some(record.address.clone()),
                    record.address.as_str(),
                );
            }
        });

    let now = chrono::Utc::now().to_rfc3339();
    let request = draft.to_request(farmer, &now);
    if ui
        .add_enabled(request.is_some(), egui::Button::new("Send Request"))
        .clicked()
    {
        if let Some(request) = request {
            emit(UiAction::RequestVerification(request));
        }
    }
}

fn render_verifier(
    ui: &mut egui::Ui,
    theme: &Theme,
    view: &DashboardView<'_>,
    emit: &mut dyn FnMut(UiAction),
) {
    match view.account_status {
        AccountStatusState::Loaded(Some(AccountStatus::Active)) => {
            theme.notice_frame(theme.success).show(ui, |ui| {
                ui.label("Your verifier account is active.");
            });
            render_verification_queue(ui, theme, view, emit);
            ui.add_space(theme.spacing_8);
            render_verification_history(ui, theme, view.verification_history);
        }
        AccountStatusState::Loaded(Some(AccountStatus::Pending)) => {
            theme.notice_frame(theme.warning).show(ui, |ui| {
                ui.label("Your verifier account is awaiting admin approval.");
            });
            if ui.button("Check again").clicked() {
                emit(UiAction::RefreshAccountStatus);
            }
        }
        AccountStatusState::Loaded(Some(AccountStatus::Rejected)) => {
            theme.notice_frame(theme.danger).show(ui, |ui| {
                ui.label("Your verifier application was rejected.");
            });
        }
        AccountStatusState::Loaded(None) => {
            theme.notice_frame(theme.warning).show(ui, |ui| {
                ui.label("No verifier record was found for this wallet.");
            });
            if ui.button("Check again").clicked() {
                emit(UiAction::RefreshAccountStatus);
            }
        }
        AccountStatusState::Failed(message) => {
            theme.notice_frame(theme.danger).show(ui, |ui| {
                ui.label(RichText::new(message).color(theme.danger));
            });
            if ui.button("Check again").clicked() {
                emit(UiAction::RefreshAccountStatus);
            }
        }
        AccountStatusState::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading account status");
            });
        }
        AccountStatusState::NotLoaded => {
            if ui.button("Load account status").clicked() {
                emit(UiAction::RefreshAccountStatus);
            }
        }
    }
}

fn render_verification_queue(
    ui: &mut egui::Ui,
    theme: &Theme,
    view: &DashboardView<'_>,
    emit: &mut dyn FnMut(UiAction),
) {
    ui.horizontal(|ui| {
        ui.strong("Products Awaiting Verification");
        if ui.button("Refresh").clicked() {
            emit(UiAction::RefreshVerifierWork);
        }
    });

    if view.unverified_products.is_empty() {
        ui.label(RichText::new("Nothing to verify right now").color(theme.text_muted));
        return;
    }

    for product in view.unverified_products {
        theme.card_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new(&product.name).strong());
                if let Some(farmer) = &product.farmer {
                    ui.monospace(short_address(farmer));
                }
                if ui.button("Verify").clicked() {
                    emit(UiAction::VerifyProduct(product.id));
                }
            });
        });
    }
}

fn render_verification_history(ui: &mut egui::Ui, theme: &Theme, history: &[Verification]) {
    ui.strong("Recent Verifications");
    if history.is_empty() {
        ui.label(RichText::new("No verifications yet").color(theme.text_muted));
        return;
    }
    egui::Grid::new("verification_history")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui| {
            for record in history {
                ui.label(format!("Product #{}", record.product_id));
                ui.label(record.created_at.as_deref().unwrap_or("unknown time"));
                ui.end_row();
            }
        });
}

fn render_financial(
    ui: &mut egui::Ui,
    theme: &Theme,
    view: &DashboardView<'_>,
    emit: &mut dyn FnMut(UiAction),
) {
    let summary = inventory_summary(view.products);
    theme.card_frame().show(ui, |ui| {
        egui::Grid::new("financial_summary")
            .num_columns(2)
            .show(ui, |ui| {
                ui.label("Listed products");
                ui.strong(summary.listed.to_string());
                ui.end_row();
                ui.label("Verified products");
                ui.strong(summary.verified.to_string());
                ui.end_row();
                ui.label("Units in stock");
                ui.strong(summary.units.to_string());
                ui.end_row();
                ui.label("Inventory value");
                ui.strong(format!("{:.2}", summary.value));
                ui.end_row();
            });
    });
    ui.add_space(theme.spacing_8);
    render_products(ui, theme, "Marketplace", view.products, view.products_loading, emit);
}

fn render_admin(
    ui: &mut egui::Ui,
    theme: &Theme,
    view: &DashboardView<'_>,
    emit: &mut dyn FnMut(UiAction),
) {
    ui.horizontal(|ui| {
        ui.strong("Pending Verifiers");
        if ui.button("Refresh").clicked() {
            emit(UiAction::RefreshPendingVerifiers);
        }
    });

    if view.pending_verifiers.is_empty() {
        ui.label(RichText::new("No verifiers awaiting approval").color(theme.text_muted));
        return;
    }

    for record in view.pending_verifiers {
        theme.card_frame().show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.monospace(&record.address);
                if ui.button("Approve").clicked() {
                    emit(UiAction::Moderate {
                        address: record.address.clone(),
                        status: AccountStatus::Active,
                    });
                }
                if ui.button("Reject").clicked() {
                    emit(UiAction::Moderate {
                        address: record.address.clone(),
                        status: AccountStatus::Rejected,
                    });
                }
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{AccountStatusState, ProductDraft, VerificationRequestDraft};
    use crate::session::AccountStatus;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: " Maize ".to_string(),
            kind: "banana".to_string(),
            price: "1.25".to_string(),
            inventory: "80".to_string(),
            description: "Fresh".to_string(),
            image_url: "  ".to_string(),
            error: None,
        }
    }

    #[test]
    fn account_lookup_without_record_is_loaded_not_loading() {
        let state = AccountStatusState::from_lookup(Ok(None));
        assert_eq!(state, AccountStatusState::Loaded(None));
        assert!(!state.is_loading());
        assert!(!state.is_active());
    }

    #[test]
    fn failed_account_lookup_keeps_the_message() {
        let state = AccountStatusState::from_lookup(Err("web3_users request failed".to_string()));
        assert_eq!(
            state,
            AccountStatusState::Failed("web3_users request failed".to_string())
        );
        assert!(!state.is_loading());
    }

    #[test]
    fn active_lookup_unlocks_verifier_work() {
        let state = AccountStatusState::from_lookup(Ok(Some(AccountStatus::Active)));
        assert!(state.is_active());
        assert!(!AccountStatusState::Loading.is_active());
    }

    #[test]
    fn product_draft_builds_a_pending_listing() {
        let product = draft().to_new_product("0xaa").expect("draft should be valid");
        assert_eq!(product.name, "Maize");
        assert_eq!(product.price, 1.25);
        assert_eq!(product.inventory, 80);
        assert_eq!(product.image_url, None);
        assert_eq!(product.farmer, "0xaa");
        assert_eq!(product.status, "pending");
    }

    #[test]
    fn product_draft_rejects_bad_numbers() {
        let mut negative = draft();
        negative.price = "-2".to_string();
        assert!(negative.to_new_product("0xaa").is_err());

        let mut fractional = draft();
        fractional.inventory = "2.5".to_string();
        assert!(fractional.to_new_product("0xaa").is_err());

        let mut unnamed = draft();
        unnamed.name = "  ".to_string();
        assert_eq!(
            unnamed.to_new_product("0xaa"),
            Err("Product name is required".to_string())
        );
    }

    #[test]
    fn verification_request_needs_product_and_verifier() {
        let mut request = VerificationRequestDraft {
            product_id: Some(3),
            verifier: None,
        };
        assert!(request.to_request("0xaa", "2024-03-01T10:00:00+00:00").is_none());

        request.verifier = Some("0xcc".to_string());
        let row = request
            .to_request("0xaa", "2024-03-01T10:00:00+00:00")
            .expect("complete draft should build");
        assert_eq!(row.product_id, 3);
        assert_eq!(row.farmer_address, "0xaa");
        assert_eq!(row.verifier_address, "0xcc");
        assert_eq!(row.status, "pending");
    }
}
