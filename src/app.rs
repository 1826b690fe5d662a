use crate::backend::rest::RestBackend;
use crate::backend::{Product, RoleStore, Verification};
use crate::event::AppEvent;
use crate::role::{guard, RoleName, Route};
use crate::session::coordinator::SessionCoordinator;
use crate::session::{short_address, AccountStatus, RoleRecord, Session, SessionStatus};
use crate::theme::Theme;
use crate::ui::auth::{render_connect, render_role_select};
use crate::ui::dashboard::{render_dashboard, AccountStatusState, DashboardForms, DashboardView};
use crate::ui::marketplace::render_products;
use crate::ui::UiAction;
use eframe::egui::{self, RichText, ScrollArea};
use log::{debug, warn};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::Duration;
use tokio::runtime::Handle;

pub struct AgriApp {
    rx: Receiver<AppEvent>,
    tx: Sender<AppEvent>,
    coordinator: SessionCoordinator,
    backend: RestBackend,
    runtime: Handle,
    theme: Theme,
    theme_applied: bool,
    started: bool,
    route: Route,
    products: Vec<Product>,
    products_loading: bool,
    pending_verifiers: Vec<RoleRecord>,
    active_verifiers: Vec<RoleRecord>,
    account_status: AccountStatusState,
    unverified_products: Vec<Product>,
    verification_history: Vec<Verification>,
    forms: DashboardForms,
    backend_error: Option<String>,
    diagnostics_log: Vec<String>,
}

impl AgriApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        tx: Sender<AppEvent>,
        coordinator: SessionCoordinator,
        backend: RestBackend,
        runtime: Handle,
        start_route: Route,
    ) -> Self {
        Self {
            rx,
            tx,
            coordinator,
            backend,
            runtime,
            theme: Theme::default(),
            theme_applied: false,
            started: false,
            route: start_route,
            products: Vec::new(),
            products_loading: false,
            pending_verifiers: Vec::new(),
            active_verifiers: Vec::new(),
            account_status: AccountStatusState::default(),
            unverified_products: Vec::new(),
            verification_history: Vec::new(),
            forms: DashboardForms::default(),
            backend_error: None,
            diagnostics_log: Vec::new(),
        }
    }

    /// Runs the start route's loads on the first frame.
    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.navigate(self.route);
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.apply_event(event);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionChanged(session) => {
                self.log_diagnostic(format!(
                    "session status={} role={}",
                    session.status.as_str(),
                    session.role.map(RoleName::as_str).unwrap_or("none")
                ));
                if let Some(error) = &session.last_error {
                    self.log_diagnostic(format!("session error: {error}"));
                }
                if session.status == SessionStatus::Idle {
                    self.account_status = AccountStatusState::NotLoaded;
                    self.unverified_products.clear();
                    self.verification_history.clear();
                }
                self.follow_session(&session);
            }
            AppEvent::ProductsLoaded(products) => {
                self.log_diagnostic(format!("loaded {} products", products.len()));
                self.products = products;
                self.products_loading = false;
            }
            AppEvent::PendingVerifiersLoaded(records) => {
                self.log_diagnostic(format!("{} verifiers awaiting approval", records.len()));
                self.pending_verifiers = records;
            }
            AppEvent::ActiveVerifiersLoaded(records) => {
                self.log_diagnostic(format!("{} active verifiers", records.len()));
                self.active_verifiers = records;
            }
            AppEvent::AccountStatusLoaded { address, result } => {
                if self.coordinator.session().address.as_deref() != Some(address.as_str()) {
                    return;
                }
                if let Err(message) = &result {
                    self.log_diagnostic(format!("account status lookup failed: {message}"));
                }
                self.account_status = AccountStatusState::from_lookup(result);
                if self.account_status.is_active() {
                    self.load_verifier_work();
                }
            }
            AppEvent::VerifierModerated { address, status } => {
                self.log_diagnostic(format!("verifier {address} marked {}", status.as_str()));
                self.load_pending_verifiers();
            }
            AppEvent::VerifierWorkLoaded {
                unverified,
                history,
            } => {
                self.unverified_products = unverified;
                self.verification_history = history;
            }
            AppEvent::ProductVerified(product_id) => {
                self.log_diagnostic(format!("product {product_id} verified"));
                self.load_verifier_work();
            }
            AppEvent::ProductAdded(name) => {
                self.log_diagnostic(format!("product {name} listed"));
                self.forms.product = Default::default();
                self.forms.notice = Some(format!("{name} was added to the marketplace."));
                self.load_products();
            }
            AppEvent::VerificationRequested(product_id) => {
                self.log_diagnostic(format!("verification requested for product {product_id}"));
                self.forms.request = Default::default();
                self.forms.notice = Some("Your verification request has been sent.".to_string());
            }
            AppEvent::BackendError(message) => {
                self.log_diagnostic(format!("backend error: {message}"));
                self.products_loading = false;
                self.backend_error = Some(message);
            }
        }
    }

    /// Moves off the auth view once a role is resolved, and refreshes data
    /// that depends on who is signed in.
    fn follow_session(&mut self, session: &Session) {
        if session.status != SessionStatus::Idle {
            return;
        }
        match (self.route, session.role) {
            (Route::Connect(_), Some(role)) => self.navigate(role.dashboard_route()),
            (Route::Dashboard(_), _) => {
                let reachable = guard(self.route, session);
                self.navigate(reachable);
            }
            _ => {}
        }
    }

    fn navigate(&mut self, route: Route) {
        if matches!(self.route, Route::Connect(_)) && !matches!(route, Route::Connect(_)) {
            self.coordinator.abandon_pending();
        }
        debug!("navigating to {}", route.path());
        self.route = route;
        self.backend_error = None;
        self.forms.notice = None;

        match route {
            Route::Marketplace => self.load_products(),
            Route::Dashboard(RoleName::Admin) => self.load_pending_verifiers(),
            Route::Dashboard(RoleName::Verifier) => self.load_account_status(),
            Route::Dashboard(RoleName::Farmer) => {
                self.load_products();
                self.load_active_verifiers();
            }
            Route::Dashboard(_) => self.load_products(),
            _ => {}
        }
    }

    fn handle_action(&mut self, action: UiAction) {
        self.log_diagnostic(action.to_log_line());
        match action {
            UiAction::Navigate(route) => self.navigate(route),
            UiAction::SelectRole(role) => self.navigate(Route::Connect(Some(role))),
            UiAction::Connect(requested_role) => self.spawn_connect(requested_role),
            UiAction::Disconnect => {
                self.coordinator.disconnect();
                self.pending_verifiers.clear();
                self.forms = DashboardForms::default();
                self.navigate(Route::Home);
            }
            UiAction::RefreshProducts => self.load_products(),
            UiAction::RefreshPendingVerifiers => self.load_pending_verifiers(),
            UiAction::RefreshAccountStatus => self.load_account_status(),
            UiAction::RefreshActiveVerifiers => self.load_active_verifiers(),
            UiAction::RefreshVerifierWork => self.load_verifier_work(),
            UiAction::Moderate { address, status } => self.moderate(address, status),
            UiAction::AddProduct(product) => {
                self.forms.notice = None;
                let backend = self.backend.clone();
                self.spawn_backend(async move {
                    match backend.add_product(&product).await {
                        Ok(()) => AppEvent::ProductAdded(product.name),
                        Err(err) => AppEvent::BackendError(format!("failed to add product: {err}")),
                    }
                });
            }
            UiAction::RequestVerification(request) => {
                self.forms.notice = None;
                let backend = self.backend.clone();
                self.spawn_backend(async move {
                    match backend.request_verification(&request).await {
                        Ok(()) => AppEvent::VerificationRequested(request.product_id),
                        Err(err) => {
                            AppEvent::BackendError(format!("failed to request verification: {err}"))
                        }
                    }
                });
            }
            UiAction::VerifyProduct(product_id) => {
                let Some(verifier) = self.coordinator.session().address else {
                    return;
                };
                let backend = self.backend.clone();
                self.spawn_backend(async move {
                    match backend.verify_product(product_id, &verifier).await {
                        Ok(()) => AppEvent::ProductVerified(product_id),
                        Err(err) => AppEvent::BackendError(format!(
                            "failed to verify product {product_id}: {err}"
                        )),
                    }
                });
            }
        }
    }

    /// Runs `task` on the runtime and hands its event back to the UI thread.
    fn spawn_backend<F>(&self, task: F)
    where
        F: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    fn spawn_connect(&self, requested_role: Option<RoleName>) {
        let coordinator = self.coordinator.clone();
        self.runtime.spawn(async move {
            if let Err(err) = coordinator.connect(requested_role).await {
                debug!("connect finished with error: {err}");
            }
        });
    }

    fn load_products(&mut self) {
        if self.products_loading {
            return;
        }
        self.products_loading = true;
        let backend = self.backend.clone();
        self.spawn_backend(async move {
            match backend.list_products().await {
                Ok(products) => AppEvent::ProductsLoaded(products),
                Err(err) => AppEvent::BackendError(format!("failed to load products: {err}")),
            }
        });
    }

    fn load_pending_verifiers(&self) {
        let backend = self.backend.clone();
        self.spawn_backend(async move {
            match backend.list_pending_verifiers().await {
                Ok(records) => AppEvent::PendingVerifiersLoaded(records),
                Err(err) => AppEvent::BackendError(format!("failed to load pending verifiers: {err}")),
            }
        });
    }

    fn load_active_verifiers(&self) {
        let backend = self.backend.clone();
        self.spawn_backend(async move {
            match backend.list_active_verifiers().await {
                Ok(records) => AppEvent::ActiveVerifiersLoaded(records),
                Err(err) => AppEvent::BackendError(format!("failed to load verifiers: {err}")),
            }
        });
    }

    fn load_account_status(&mut self) {
        let Some(address) = self.coordinator.session().address else {
            return;
        };
        if self.account_status.is_loading() {
            return;
        }
        self.account_status = AccountStatusState::Loading;
        let backend = self.backend.clone();
        self.spawn_backend(async move {
            let result = backend
                .get_role_record(&address)
                .await
                .map(|record| record.map(|record| record.status))
                .map_err(|err| format!("failed to load account status: {err}"));
            AppEvent::AccountStatusLoaded { address, result }
        });
    }

    fn load_verifier_work(&self) {
        let Some(verifier) = self.coordinator.session().address else {
            return;
        };
        let backend = self.backend.clone();
        self.spawn_backend(async move {
            let unverified = backend.list_unverified_products().await;
            let history = backend.list_verification_history(&verifier).await;
            match (unverified, history) {
                (Ok(unverified), Ok(history)) => AppEvent::VerifierWorkLoaded {
                    unverified,
                    history,
                },
                (Err(err), _) | (_, Err(err)) => {
                    AppEvent::BackendError(format!("failed to load verification work: {err}"))
                }
            }
        });
    }

    fn moderate(&self, address: String, status: AccountStatus) {
        let backend = self.backend.clone();
        self.spawn_backend(async move {
            match backend.set_account_status(&address, status).await {
                Ok(()) => AppEvent::VerifierModerated { address, status },
                Err(err) => {
                    warn!("moderation of {address} failed: {err}");
                    AppEvent::BackendError(format!("failed to update {address}: {err}"))
                }
            }
        });
    }

    fn render_top_bar(&self, ctx: &egui::Context, session: &Session, actions: &mut Vec<UiAction>) {
        let theme = &self.theme;
        egui::TopBottomPanel::top("navbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("AgriMarket").strong().color(theme.accent_primary));
                ui.separator();
                if ui.button("Home").clicked() {
                    actions.push(UiAction::Navigate(Route::Home));
                }
                if ui.button("Marketplace").clicked() {
                    actions.push(UiAction::Navigate(Route::Marketplace));
                }
                if let Some(role) = session.role {
                    if ui.button("Dashboard").clicked() {
                        actions.push(UiAction::Navigate(role.dashboard_route()));
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match &session.address {
                        Some(address) => {
                            if ui.button("Disconnect").clicked() {
                                actions.push(UiAction::Disconnect);
                            }
                            ui.monospace(short_address(address));
                            let (badge, color) = match session.role {
                                Some(role) => (role.as_str(), theme.role_color(role)),
                                None => ("No Role", theme.text_muted),
                            };
                            ui.label(RichText::new(badge).color(color).strong());
                        }
                        None => {
                            if ui.button("Connect Wallet").clicked() {
                                actions.push(UiAction::Navigate(Route::RoleSelect));
                            }
                        }
                    }
                    ui.label(
                        RichText::new(session.status.as_str())
                            .color(theme.status_color(session.status)),
                    );
                });
            });
        });
    }

    fn render_diagnostics(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("diagnostics").show(ctx, |ui| {
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(120.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });
        });
    }

    fn render_center_panel(
        &mut self,
        ctx: &egui::Context,
        session: &Session,
        actions: &mut Vec<UiAction>,
    ) {
        let route = guard(self.route, session);
        if route != self.route {
            actions.push(UiAction::Navigate(route));
        }

        let theme = &self.theme;
        let backend_error = self.backend_error.as_deref();
        let forms = &mut self.forms;
        let view = DashboardView {
            session,
            products: &self.products,
            products_loading: self.products_loading,
            pending_verifiers: &self.pending_verifiers,
            active_verifiers: &self.active_verifiers,
            account_status: &self.account_status,
            unverified_products: &self.unverified_products,
            verification_history: &self.verification_history,
        };

        egui::CentralPanel::default().show(ctx, |ui| {
            for error in [session.visible_error(), backend_error].into_iter().flatten() {
                theme.notice_frame(theme.danger).show(ui, |ui| {
                    ui.label(RichText::new(error).color(theme.danger));
                });
                ui.add_space(theme.spacing_4);
            }

            let mut emit = |action: UiAction| actions.push(action);
            match route {
                Route::Home => render_home(ui, theme, &mut emit),
                Route::Marketplace => render_products(
                    ui,
                    theme,
                    "Marketplace",
                    view.products,
                    view.products_loading,
                    &mut emit,
                ),
                Route::RoleSelect => render_role_select(ui, theme, &mut emit),
                Route::Connect(requested_role) => {
                    render_connect(ui, theme, session, requested_role, &mut emit)
                }
                Route::Dashboard(role) => render_dashboard(ui, theme, role, &view, forms, &mut emit),
            }
        });
    }
}

fn render_home(ui: &mut egui::Ui, theme: &Theme, emit: &mut dyn FnMut(UiAction)) {
    ui.heading("Farm to table, verified on chain");
    ui.label(
        RichText::new("Farmers list produce, verifiers certify it, and buyers and lenders trade with confidence.")
            .color(theme.text_muted),
    );
    ui.add_space(theme.spacing_12);
    ui.horizontal(|ui| {
        if ui.button("Explore the marketplace").clicked() {
            emit(UiAction::Navigate(Route::Marketplace));
        }
        if ui.button("Get started").clicked() {
            emit(UiAction::Navigate(Route::RoleSelect));
        }
    });
}

impl eframe::App for AgriApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }
        self.start();
        self.drain_events(ctx);

        let session = self.coordinator.session();
        let mut actions = Vec::new();
        self.render_top_bar(ctx, &session, &mut actions);
        self.render_diagnostics(ctx);
        self.render_center_panel(ctx, &session, &mut actions);

        for action in actions {
            self.handle_action(action);
        }

        if session.status == SessionStatus::Connecting {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AgriApp;
    use crate::backend::rest::RestBackend;
    use crate::event::AppEvent;
    use crate::role::Route;
    use crate::session::coordinator::SessionCoordinator;
    use crate::wallet::rpc::JsonRpcWallet;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;
    use tokio::runtime::Runtime;

    // The current-thread runtime is never driven, so spawned loads stay queued.
    fn app(start: Route) -> (AgriApp, Runtime) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        let backend = RestBackend::new("http://127.0.0.1:9", String::new(), Duration::from_millis(200))
            .expect("backend should build");
        let wallet = JsonRpcWallet::new(
            "http://127.0.0.1:9".to_string(),
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .expect("wallet should build");
        let (tx, rx) = mpsc::channel();
        let coordinator =
            SessionCoordinator::new(Arc::new(wallet), Arc::new(backend.clone())).with_events(tx.clone());
        let app = AgriApp::new(rx, tx, coordinator, backend, runtime.handle().clone(), start);
        (app, runtime)
    }

    #[test]
    fn start_route_loads_its_data_on_first_frame() {
        let (mut app, _runtime) = app(Route::Marketplace);
        assert!(!app.products_loading);

        app.start();
        assert_eq!(app.route, Route::Marketplace);
        assert!(app.products_loading);
        assert!(app.started);
    }

    #[test]
    fn backend_failure_ends_loading_and_is_shown() {
        let (mut app, _runtime) = app(Route::Marketplace);
        app.start();

        app.apply_event(AppEvent::BackendError("products request failed".to_string()));
        assert!(!app.products_loading);
        assert_eq!(app.backend_error.as_deref(), Some("products request failed"));

        app.navigate(Route::Home);
        assert_eq!(app.backend_error, None);
    }

    #[test]
    fn account_status_for_another_wallet_is_ignored() {
        let (mut app, _runtime) = app(Route::Home);
        app.apply_event(AppEvent::AccountStatusLoaded {
            address: "0xcc".to_string(),
            result: Err("web3_users request failed".to_string()),
        });
        assert_eq!(app.account_status, Default::default());
    }
}
