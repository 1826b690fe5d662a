use crate::role::{RoleName, Route};
use crate::session::{short_address, Session, SessionStatus};
use crate::theme::Theme;
use crate::ui::UiAction;
use eframe::egui::{self, RichText};

pub fn render_role_select(ui: &mut egui::Ui, theme: &Theme, emit: &mut dyn FnMut(UiAction)) {
    ui.heading("Choose Your Role");
    ui.add_space(theme.spacing_8);

    egui::Grid::new("role_cards")
        .num_columns(2)
        .spacing([theme.spacing_16, theme.spacing_16])
        .show(ui, |ui| {
            for (index, role) in RoleName::SELF_REGISTERABLE.into_iter().enumerate() {
                theme.card_frame().show(ui, |ui| {
                    ui.set_min_width(260.0);
                    ui.label(
                        RichText::new(role.title())
                            .strong()
                            .size(16.0)
                            .color(theme.role_color(role)),
                    );
                    ui.label(RichText::new(role.tagline()).color(theme.text_muted));
                    if ui.button("Enter").clicked() {
                        emit(UiAction::SelectRole(role));
                    }
                });
                if index % 2 == 1 {
                    ui.end_row();
                }
            }
        });

    ui.add_space(theme.spacing_12);
    if ui.link("Already registered? Connect your wallet").clicked() {
        emit(UiAction::Navigate(Route::Connect(None)));
    }
}

pub fn render_connect(
    ui: &mut egui::Ui,
    theme: &Theme,
    session: &Session,
    requested_role: Option<RoleName>,
    emit: &mut dyn FnMut(UiAction),
) {
    theme.card_frame().show(ui, |ui| {
        ui.set_max_width(420.0);
        ui.heading("Welcome Back");
        match requested_role {
            Some(role) => {
                ui.label(format!("Selected as: {}", role.title()));
            }
            None => {
                ui.label(
                    RichText::new("No role selected. Registered wallets sign in with their existing role.")
                        .color(theme.text_muted),
                );
                if ui.link("Go to role selection").clicked() {
                    emit(UiAction::Navigate(Route::RoleSelect));
                }
            }
        }
        ui.add_space(theme.spacing_8);

        if let Some(address) = &session.address {
            theme.notice_frame(theme.success).show(ui, |ui| {
                ui.label(RichText::new("Wallet Connected").color(theme.success));
                ui.monospace(short_address(address));
            });
            if session.role.is_none() {
                ui.label("This account has no role yet. Pick a role and connect again.");
            }
        }

        let connecting = session.status == SessionStatus::Connecting;
        ui.horizontal(|ui| {
            let label = if connecting {
                "Connecting..."
            } else {
                "Connect Web3 Wallet"
            };
            if ui
                .add_enabled(!connecting, egui::Button::new(label))
                .clicked()
            {
                emit(UiAction::Connect(requested_role));
            }
            if connecting {
                ui.spinner();
                ui.label(RichText::new("Approve the request in your wallet").color(theme.text_muted));
            }
        });
    });
}
