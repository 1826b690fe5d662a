use crate::role::RoleName;
use crate::session::SessionStatus;
use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};

#[derive(Debug, Clone)]
pub struct Theme {
    pub surface_0: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub accent_primary: Color32,
    pub accent_muted: Color32,
    pub success: Color32,
    pub warning: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub border_subtle: Color32,
    pub spacing_4: f32,
    pub spacing_8: f32,
    pub spacing_12: f32,
    pub spacing_16: f32,
    pub radius_8: u8,
    pub radius_12: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            surface_0: Color32::from_rgb(0xF6, 0xF8, 0xF4),
            surface_1: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            surface_2: Color32::from_rgb(0xEE, 0xF2, 0xEA),
            accent_primary: Color32::from_rgb(0x16, 0xA3, 0x4A),
            accent_muted: Color32::from_rgb(0x86, 0xEF, 0xAC),
            success: Color32::from_rgb(0x15, 0x80, 0x3D),
            warning: Color32::from_rgb(0xD9, 0x77, 0x06),
            danger: Color32::from_rgb(0xDC, 0x26, 0x26),
            text_primary: Color32::from_rgb(0x1F, 0x29, 0x37),
            text_muted: Color32::from_rgb(0x6B, 0x72, 0x80),
            border_subtle: Color32::from_rgba_premultiplied(0, 0, 0, 20),
            spacing_4: 4.0,
            spacing_8: 8.0,
            spacing_12: 12.0,
            spacing_16: 16.0,
            radius_8: 8,
            radius_12: 12,
        }
    }
}

impl Theme {
    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::light();
        visuals.panel_fill = self.surface_0;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.noninteractive.bg_fill = self.surface_1;
        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, self.border_subtle);
        visuals.widgets.inactive.bg_fill = self.surface_2;
        visuals.widgets.inactive.weak_bg_fill = self.surface_2;
        visuals.widgets.hovered.bg_fill = self.accent_muted;
        visuals.widgets.hovered.weak_bg_fill = self.accent_muted;
        visuals.widgets.active.bg_fill = self.accent_primary;
        visuals.selection.bg_fill = self.accent_muted;
        visuals.hyperlink_color = self.accent_primary;
        visuals.window_fill = self.surface_1;
        visuals.window_corner_radius = CornerRadius::same(self.radius_12);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(20.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn card_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_1)
            .inner_margin(Margin::same(self.spacing_12 as i8))
            .corner_radius(CornerRadius::same(self.radius_12))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }

    pub fn notice_frame(&self, tint: Color32) -> Frame {
        Frame::new()
            .fill(tint.gamma_multiply(0.12))
            .inner_margin(Margin::same(self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius_8))
            .stroke(Stroke::new(1.0, tint))
    }

    /// Badge color per role, matching the role selection cards.
    pub fn role_color(&self, role: RoleName) -> Color32 {
        match role {
            RoleName::Farmer => Color32::from_rgb(0x22, 0xC5, 0x5E),
            RoleName::Consumer => Color32::from_rgb(0x60, 0xA5, 0xFA),
            RoleName::Verifier => Color32::from_rgb(0x81, 0x8C, 0xF8),
            RoleName::Financial => Color32::from_rgb(0x57, 0x53, 0x4E),
            RoleName::Admin => Color32::from_rgb(0xE1, 0x1D, 0x48),
        }
    }

    pub fn status_color(&self, status: SessionStatus) -> Color32 {
        match status {
            SessionStatus::Idle => self.success,
            SessionStatus::Connecting => self.warning,
            SessionStatus::Error => self.danger,
        }
    }
}
