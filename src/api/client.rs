//! HTTP client for the policy API.

use super::types::{AnalyticsRange, AnalyticsReport, Cart, CartMutation, Policy};
use super::ApiError;
use crate::promotion::{CustomFilter, CustomFilterDef, PolicyDraft, PromotionRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Default API location used by the site.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Thin typed wrapper over the API's JSON endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("policytrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /track - event ingestion. The response body is ignored.
    pub async fn track(&self, payload: &Value) -> Result<(), ApiError> {
        let response = self.http.post(self.url("/track")).json(payload).send().await?;
        check_status("/track", response).await?;
        Ok(())
    }

    /// GET /recommend_policies - ranked recommendations for a customer.
    pub async fn recommend_policies(
        &self,
        customer_id: &str,
        top_n: Option<u32>,
    ) -> Result<Vec<Policy>, ApiError> {
        let mut query = vec![("customer_id", customer_id.to_string())];
        if let Some(n) = top_n {
            query.push(("top_n", n.to_string()));
        }
        self.get_json("/recommend_policies", &query).await
    }

    /// GET /search_policies - free-text search. An empty query returns the catalog.
    pub async fn search_policies(&self, query: &str) -> Result<Vec<Policy>, ApiError> {
        self.get_json("/search_policies", &[("q", query)]).await
    }

    /// Looks a single policy up by exact id via the search endpoint.
    pub async fn find_policy(&self, policy_id: &str) -> Result<Option<Policy>, ApiError> {
        let results = self.search_policies(policy_id).await?;
        Ok(results.into_iter().find(|p| p.policy_id == policy_id))
    }

    /// GET /cart
    pub async fn get_cart(&self, customer_id: &str) -> Result<Cart, ApiError> {
        self.get_json("/cart", &[("customer_id", customer_id)]).await
    }

    /// POST /cart/add
    pub async fn add_to_cart(&self, customer_id: &str, policy_id: &str) -> Result<Value, ApiError> {
        let body = CartMutation {
            customer_id,
            policy_id: Some(policy_id),
        };
        self.post_json("/cart/add", &body).await
    }

    /// POST /cart/remove
    pub async fn remove_from_cart(
        &self,
        customer_id: &str,
        policy_id: &str,
    ) -> Result<Value, ApiError> {
        let body = CartMutation {
            customer_id,
            policy_id: Some(policy_id),
        };
        self.post_json("/cart/remove", &body).await
    }

    /// POST /cart/checkout
    pub async fn checkout(&self, customer_id: &str) -> Result<Value, ApiError> {
        let body = CartMutation {
            customer_id,
            policy_id: None,
        };
        self.post_json("/cart/checkout", &body).await
    }

    /// GET /analytics - dashboard aggregates.
    pub async fn analytics(&self, range: AnalyticsRange) -> Result<AnalyticsReport, ApiError> {
        self.get_json("/analytics", &[("range", range.as_str())]).await
    }

    /// GET /custom_filters
    pub async fn list_custom_filters(&self) -> Result<Vec<CustomFilter>, ApiError> {
        let no_query: &[(&str, &str)] = &[];
        self.get_json("/custom_filters", no_query).await
    }

    /// POST /custom_filters
    pub async fn create_custom_filter(
        &self,
        filter: &CustomFilterDef,
    ) -> Result<CustomFilter, ApiError> {
        self.post_json("/custom_filters", filter).await
    }

    /// DELETE /custom_filters/:id
    pub async fn delete_custom_filter(&self, id: &str) -> Result<(), ApiError> {
        let endpoint = format!("/custom_filters/{id}");
        let response = self.http.delete(self.url(&endpoint)).send().await?;
        check_status(&endpoint, response).await?;
        Ok(())
    }

    /// POST /promote_policies
    pub async fn promote_policies(&self, request: &PromotionRequest) -> Result<Value, ApiError> {
        self.post_json("/promote_policies", request).await
    }

    /// POST /policies - admin policy creation.
    pub async fn create_policy(&self, draft: &PolicyDraft) -> Result<Value, ApiError> {
        self.post_json("/policies", draft).await
    }

    async fn get_json<T, Q>(&self, endpoint: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .http
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await?;
        let response = check_status(endpoint, response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.http.post(self.url(endpoint)).json(body).send().await?;
        let response = check_status(endpoint, response).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(endpoint, status = status.as_u16(), %body, "API request failed");
    Err(ApiError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/cart"), "http://localhost:5000/cart");
    }

    #[test]
    fn test_cart_mutation_body_shape() {
        let add = CartMutation {
            customer_id: "C1",
            policy_id: Some("P1"),
        };
        let checkout = CartMutation {
            customer_id: "C1",
            policy_id: None,
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            serde_json::json!({ "customer_id": "C1", "policy_id": "P1" })
        );
        assert_eq!(
            serde_json::to_value(&checkout).unwrap(),
            serde_json::json!({ "customer_id": "C1" })
        );
    }
}
