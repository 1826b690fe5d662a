use crate::backend::Product;
use crate::session::short_address;
use crate::theme::Theme;
use crate::ui::UiAction;
use eframe::egui::{self, RichText, ScrollArea};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InventorySummary {
    pub listed: usize,
    pub units: i64,
    pub value: f64,
    pub verified: usize,
}

pub fn inventory_summary(products: &[Product]) -> InventorySummary {
    InventorySummary {
        listed: products.len(),
        units: products.iter().map(Product::units_in_stock).sum(),
        value: products.iter().map(Product::stock_value).sum(),
        verified: products.iter().filter(|product| product.is_verified()).count(),
    }
}

pub fn render_products(
    ui: &mut egui::Ui,
    theme: &Theme,
    title: &str,
    products: &[Product],
    loading: bool,
    emit: &mut dyn FnMut(UiAction),
) {
    ui.horizontal(|ui| {
        ui.heading(title);
        if loading {
            ui.spinner();
        } else if ui.button("Reload").clicked() {
            emit(UiAction::RefreshProducts);
        }
    });

    if products.is_empty() && !loading {
        ui.label(RichText::new("No products listed yet").color(theme.text_muted));
        return;
    }

    ScrollArea::vertical()
        .id_salt(("product_listing", title))
        .show(ui, |ui| {
            for product in products {
                render_product_card(ui, theme, product);
                ui.add_space(theme.spacing_4);
            }
        });
}

fn render_product_card(ui: &mut egui::Ui, theme: &Theme, product: &Product) {
    theme.card_frame().show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("#{}", product.id)).color(theme.text_muted));
            ui.label(RichText::new(&product.name).strong());
            if let Some(kind) = &product.kind {
                ui.label(RichText::new(kind).color(theme.text_muted));
            }
            if let Some(status) = &product.status {
                let color = if product.is_verified() {
                    theme.success
                } else {
                    theme.warning
                };
                ui.label(RichText::new(status).color(color));
            }
        });
        if let Some(description) = &product.description {
            ui.label(description);
        }
        ui.horizontal(|ui| {
            match product.price {
                Some(price) => ui.label(format!("Price: {price:.2}")),
                None => ui.label(RichText::new("Price not set").color(theme.text_muted)),
            };
            ui.separator();
            ui.label(format!("In stock: {}", product.units_in_stock()));
            if let Some(farmer) = &product.farmer {
                ui.separator();
                ui.monospace(short_address(farmer));
            }
            if let Some(image_url) = &product.image_url {
                ui.separator();
                ui.hyperlink_to("Image", image_url);
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::inventory_summary;
    use crate::backend::Product;

    fn product(id: i64, price: Option<f64>, inventory: Option<i64>, status: Option<&str>) -> Product {
        Product {
            id,
            name: format!("product-{id}"),
            kind: None,
            price,
            inventory,
            description: None,
            image_url: None,
            status: status.map(str::to_string),
            farmer: None,
            verified_by: None,
            verified_at: None,
        }
    }

    #[test]
    fn inventory_summary_totals_value_and_ignores_negative_stock() {
        let summary = inventory_summary(&[
            product(1, Some(2.0), Some(10), Some("verified")),
            product(2, Some(5.0), Some(-3), Some("pending")),
            product(3, Some(1.5), Some(4), None),
        ]);
        assert_eq!(summary.listed, 3);
        assert_eq!(summary.units, 14);
        assert_eq!(summary.value, 26.0);
        assert_eq!(summary.verified, 1);
    }

    #[test]
    fn inventory_summary_counts_unpriced_stock_at_zero() {
        let summary = inventory_summary(&[
            product(1, None, Some(12), Some("pending")),
            product(2, Some(4.0), None, None),
            product(3, Some(2.0), Some(3), Some("verified")),
        ]);
        assert_eq!(summary.listed, 3);
        assert_eq!(summary.units, 15);
        assert_eq!(summary.value, 6.0);
    }

    #[test]
    fn inventory_summary_of_empty_listing_is_zero() {
        let summary = inventory_summary(&[]);
        assert_eq!(summary.listed, 0);
        assert_eq!(summary.value, 0.0);
    }
}
