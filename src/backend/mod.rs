use crate::role::RoleName;
use crate::session::{AccountStatus, RoleRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod rest;

pub const PRODUCT_PENDING: &str = "pending";
pub const PRODUCT_VERIFIED: &str = "verified";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Role bindings as the coordinator needs them.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get_role_record(&self, address: &str) -> Result<Option<RoleRecord>, BackendError>;

    async fn create_role_record(
        &self,
        address: &str,
        role: RoleName,
        status: AccountStatus,
    ) -> Result<(), BackendError>;
}

/// A `products` row. Every column except the key may come back `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub inventory: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub farmer: Option<String>,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub verified_at: Option<String>,
}

impl Product {
    pub fn units_in_stock(&self) -> i64 {
        self.inventory.unwrap_or(0).max(0)
    }

    pub fn stock_value(&self) -> f64 {
        self.price.unwrap_or(0.0) * self.units_in_stock() as f64
    }

    pub fn is_verified(&self) -> bool {
        self.status.as_deref() == Some(PRODUCT_VERIFIED)
    }

    pub fn listed_by(&self, address: &str) -> bool {
        self.farmer
            .as_deref()
            .is_some_and(|farmer| farmer.eq_ignore_ascii_case(address))
    }
}

/// Insert body for a farmer's new listing. Listings start unverified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub inventory: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub farmer: String,
    pub status: &'static str,
}

/// A `verifications` row written when a verifier certifies a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    pub product_id: i64,
    pub verifier_address: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A `verification_requests` row sent by a farmer to a chosen verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVerificationRequest {
    pub product_id: i64,
    pub farmer_address: String,
    pub verifier_address: String,
    pub status: &'static str,
    pub created_at: String,
    pub updated_at: String,
}
