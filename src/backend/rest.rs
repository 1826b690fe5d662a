use crate::backend::{
    BackendError, NewProduct, NewVerificationRequest, Product, RoleStore, Verification,
    PRODUCT_PENDING, PRODUCT_VERIFIED,
};
use crate::role::RoleName;
use crate::session::{AccountStatus, RoleRecord};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

const ROLE_TABLE: &str = "web3_users";
const PRODUCT_TABLE: &str = "products";
const VERIFICATION_TABLE: &str = "verifications";
const REQUEST_TABLE: &str = "verification_requests";
const ROLE_COLUMNS: &str = "wallet_address,role,status";
const VERIFIER_QUEUE_LIMIT: usize = 5;
const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
struct NewRoleRow<'a> {
    wallet_address: &'a str,
    role: RoleName,
    status: AccountStatus,
    auth_type: &'static str,
    last_connected: String,
}

/// PostgREST client for the marketplace tables.
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        table_url(&self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| BackendError(format!("{table} request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(BackendError(format!(
            "{table} request failed with {status}: {}",
            body.trim()
        )))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let request = self.client.get(self.table_url(table)).query(query);
        let response = self.send(table, request).await?;
        response
            .json()
            .await
            .map_err(|err| BackendError(format!("failed to decode {table} rows: {err}")))
    }

    async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(row);
        self.send(table, request).await?;
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        self.select(PRODUCT_TABLE, &[("select", "*".to_string())])
            .await
    }

    pub async fn list_pending_verifiers(&self) -> Result<Vec<RoleRecord>, BackendError> {
        self.select(ROLE_TABLE, &verifiers_query(AccountStatus::Pending))
            .await
    }

    /// Verifiers a farmer may address a verification request to.
    pub async fn list_active_verifiers(&self) -> Result<Vec<RoleRecord>, BackendError> {
        self.select(ROLE_TABLE, &verifiers_query(AccountStatus::Active))
            .await
    }

    pub async fn list_unverified_products(&self) -> Result<Vec<Product>, BackendError> {
        self.select(PRODUCT_TABLE, &unverified_products_query())
            .await
    }

    pub async fn list_verification_history(
        &self,
        verifier: &str,
    ) -> Result<Vec<Verification>, BackendError> {
        self.select(VERIFICATION_TABLE, &history_query(verifier))
            .await
    }

    pub async fn add_product(&self, product: &NewProduct) -> Result<(), BackendError> {
        debug!("listing {} for {}", product.name, product.farmer);
        self.insert(PRODUCT_TABLE, product).await
    }

    /// Marks the product verified, then records the verification.
    pub async fn verify_product(&self, product_id: i64, verifier: &str) -> Result<(), BackendError> {
        let now = chrono::Utc::now().to_rfc3339();
        debug!("verifying product {product_id} as {verifier}");
        let request = self
            .client
            .patch(self.table_url(PRODUCT_TABLE))
            .query(&[("id", eq_filter(&product_id.to_string()))])
            .header("Prefer", "return=minimal")
            .json(&verified_patch(verifier, &now));
        self.send(PRODUCT_TABLE, request).await?;

        let record = Verification {
            id: None,
            product_id,
            verifier_address: verifier.to_string(),
            created_at: Some(now),
        };
        self.insert(VERIFICATION_TABLE, &record).await
    }

    pub async fn request_verification(
        &self,
        request: &NewVerificationRequest,
    ) -> Result<(), BackendError> {
        debug!(
            "requesting verification of product {} from {}",
            request.product_id, request.verifier_address
        );
        self.insert(REQUEST_TABLE, request).await
    }

    pub async fn set_account_status(
        &self,
        address: &str,
        status: AccountStatus,
    ) -> Result<(), BackendError> {
        debug!("setting {address} to {}", status.as_str());
        let request = self
            .client
            .patch(self.table_url(ROLE_TABLE))
            .query(&[("wallet_address", eq_filter(address))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "status": status }));
        self.send(ROLE_TABLE, request).await?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for RestBackend {
    async fn get_role_record(&self, address: &str) -> Result<Option<RoleRecord>, BackendError> {
        let rows: Vec<RoleRecord> = self
            .select(
                ROLE_TABLE,
                &[
                    ("select", ROLE_COLUMNS.to_string()),
                    ("wallet_address", eq_filter(address)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_role_record(
        &self,
        address: &str,
        role: RoleName,
        status: AccountStatus,
    ) -> Result<(), BackendError> {
        let row = NewRoleRow {
            wallet_address: address,
            role,
            status,
            auth_type: "web3",
            last_connected: chrono::Utc::now().to_rfc3339(),
        };
        self.insert(ROLE_TABLE, &row).await
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{table}", base_url.trim_end_matches('/'))
}

fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

fn verifiers_query(status: AccountStatus) -> Vec<(&'static str, String)> {
    vec![
        ("select", ROLE_COLUMNS.to_string()),
        ("role", eq_filter(RoleName::Verifier.as_str())),
        ("status", eq_filter(status.as_str())),
    ]
}

fn unverified_products_query() -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("status", eq_filter(PRODUCT_PENDING)),
        ("limit", VERIFIER_QUEUE_LIMIT.to_string()),
    ]
}

fn history_query(verifier: &str) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("verifier_address", eq_filter(verifier)),
        ("order", "created_at.desc".to_string()),
        ("limit", HISTORY_LIMIT.to_string()),
    ]
}

fn verified_patch(verifier: &str, now: &str) -> Value {
    json!({
        "status": PRODUCT_VERIFIED,
        "verified_by": verifier,
        "verified_at": now,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        eq_filter, history_query, table_url, unverified_products_query, verified_patch,
        verifiers_query, NewRoleRow,
    };
    use crate::backend::{NewProduct, NewVerificationRequest, Product, Verification};
    use crate::role::RoleName;
    use crate::session::AccountStatus;

    #[test]
    fn table_url_tolerates_trailing_slash() {
        assert_eq!(
            table_url("https://example.supabase.co/", "web3_users"),
            "https://example.supabase.co/rest/v1/web3_users"
        );
    }

    #[test]
    fn eq_filter_uses_postgrest_operator() {
        assert_eq!(eq_filter("0xaa"), "eq.0xaa");
    }

    #[test]
    fn new_role_row_serializes_lowercase_enums() {
        let row = NewRoleRow {
            wallet_address: "0xcc",
            role: RoleName::Verifier,
            status: AccountStatus::Pending,
            auth_type: "web3",
            last_connected: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let value = serde_json::to_value(&row).expect("row should serialize");
        assert_eq!(value["role"], "verifier");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["auth_type"], "web3");
    }

    #[test]
    fn product_rows_tolerate_missing_columns() {
        let rows = r#"[
  {"id": 1, "name": "Basmati Rice", "type": "grain", "price": 2.5, "inventory": 40},
  {"id": 2, "name": "Turmeric"}
]"#;
        let products: Vec<Product> = serde_json::from_str(rows).expect("rows should decode");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].kind.as_deref(), Some("grain"));
        assert_eq!(products[0].stock_value(), 100.0);
        assert_eq!(products[1].inventory, None);
        assert_eq!(products[1].units_in_stock(), 0);
    }

    #[test]
    fn product_rows_tolerate_null_columns() {
        let rows = r#"[
  {"id": 1, "name": "Maize", "type": null, "price": null, "inventory": null,
   "description": null, "image_url": null, "status": null, "farmer": null,
   "verified_by": null, "verified_at": null},
  {"id": 2, "name": "Millet", "type": "grain", "price": 3.0, "inventory": null,
   "description": "dry", "image_url": null, "status": "verified", "farmer": "0xAA",
   "verified_by": "0xcc", "verified_at": "2024-03-01T10:00:00+00:00"}
]"#;
        let products: Vec<Product> = serde_json::from_str(rows).expect("null columns should decode");
        assert_eq!(products[0].price, None);
        assert_eq!(products[0].stock_value(), 0.0);
        assert_eq!(products[1].stock_value(), 0.0);
        assert!(products[1].is_verified());
        assert!(products[1].listed_by("0xaa"));
    }

    #[test]
    fn verifier_queries_filter_by_role_and_status() {
        assert_eq!(
            verifiers_query(AccountStatus::Active),
            vec![
                ("select", "wallet_address,role,status".to_string()),
                ("role", "eq.verifier".to_string()),
                ("status", "eq.active".to_string()),
            ]
        );
        assert_eq!(verifiers_query(AccountStatus::Pending)[2].1, "eq.pending");
    }

    #[test]
    fn verifier_work_queries_are_bounded() {
        assert_eq!(
            unverified_products_query(),
            vec![
                ("select", "*".to_string()),
                ("status", "eq.pending".to_string()),
                ("limit", "5".to_string()),
            ]
        );
        assert_eq!(
            history_query("0xcc"),
            vec![
                ("select", "*".to_string()),
                ("verifier_address", "eq.0xcc".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", "5".to_string()),
            ]
        );
    }

    #[test]
    fn verification_writes_carry_verifier_and_time() {
        let patch = verified_patch("0xcc", "2024-03-01T10:00:00+00:00");
        assert_eq!(patch["status"], "verified");
        assert_eq!(patch["verified_by"], "0xcc");
        assert_eq!(patch["verified_at"], "2024-03-01T10:00:00+00:00");

        let record = Verification {
            id: Some(7),
            product_id: 3,
            verifier_address: "0xcc".to_string(),
            created_at: Some("2024-03-01T10:00:00+00:00".to_string()),
        };
        let value = serde_json::to_value(&record).expect("verification should serialize");
        assert!(value.get("id").is_none());
        assert_eq!(value["product_id"], 3);
    }

    #[test]
    fn new_rows_use_backend_column_names() {
        let product = NewProduct {
            name: "Maize".to_string(),
            kind: "grain".to_string(),
            price: 1.25,
            inventory: 80,
            description: "Yellow dent".to_string(),
            image_url: None,
            farmer: "0xaa".to_string(),
            status: "pending",
        };
        let value = serde_json::to_value(&product).expect("product should serialize");
        assert_eq!(value["type"], "grain");
        assert_eq!(value["status"], "pending");
        assert!(value.get("image_url").is_none());

        let request = NewVerificationRequest {
            product_id: 3,
            farmer_address: "0xaa".to_string(),
            verifier_address: "0xcc".to_string(),
            status: "pending",
            created_at: "2024-03-01T10:00:00+00:00".to_string(),
            updated_at: "2024-03-01T10:00:00+00:00".to_string(),
        };
        let value = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(value["verifier_address"], "0xcc");
        assert_eq!(value["status"], "pending");
    }
}
