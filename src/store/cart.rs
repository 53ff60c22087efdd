//! Cart operations that keep the server cart and the local mirror in step.

use super::{LocalStore, StoreError, CART_KEY};
use crate::api::{ApiClient, Cart, CartItem};
use std::sync::Arc;

/// Server cart plus the local `cart` mirror.
///
/// The server is always called first; the mirror is only touched after the
/// server accepted the change.
#[derive(Clone)]
pub struct CartService {
    api: ApiClient,
    store: Arc<LocalStore>,
}

impl CartService {
    pub fn new(api: ApiClient, store: Arc<LocalStore>) -> Self {
        Self { api, store }
    }

    /// The cart as the server holds it.
    pub async fn server_cart(&self, customer_id: &str) -> Result<Cart, StoreError> {
        Ok(self.api.get_cart(customer_id).await?)
    }

    /// Adds a policy, then mirrors it locally.
    ///
    /// Returns the mirrored item, or `None` when the policy could not be
    /// found by id (the server add still happened).
    pub async fn add(&self, customer_id: &str, policy_id: &str) -> Result<Option<CartItem>, StoreError> {
        self.api.add_to_cart(customer_id, policy_id).await?;

        let Some(policy) = self.api.find_policy(policy_id).await? else {
            tracing::warn!(policy_id, "Added policy not found in search, local cart unchanged");
            return Ok(None);
        };

        let item = CartItem::from_policy(&policy);
        let mut items = self.local_items()?;
        if !items.iter().any(|i| i.policy_id == item.policy_id) {
            items.push(item.clone());
            self.store.set_json(CART_KEY, &items)?;
        }

        tracing::info!(customer_id, policy_id, "Policy added to cart");
        Ok(Some(item))
    }

    /// Removes a policy from the server cart and the mirror.
    pub async fn remove(&self, customer_id: &str, policy_id: &str) -> Result<(), StoreError> {
        self.api.remove_from_cart(customer_id, policy_id).await?;

        let mut items = self.local_items()?;
        let before = items.len();
        items.retain(|i| i.policy_id != policy_id);
        if items.len() != before {
            self.store.set_json(CART_KEY, &items)?;
        }

        tracing::info!(customer_id, policy_id, "Policy removed from cart");
        Ok(())
    }

    /// Checks the server cart out and clears the mirror.
    pub async fn checkout(&self, customer_id: &str) -> Result<serde_json::Value, StoreError> {
        let response = self.api.checkout(customer_id).await?;
        self.store.remove(CART_KEY)?;

        tracing::info!(customer_id, "Cart checked out");
        Ok(response)
    }

    /// The locally mirrored cart; empty if nothing was saved.
    pub fn local_items(&self) -> Result<Vec<CartItem>, StoreError> {
        Ok(self
            .store
            .get_json::<Vec<CartItem>>(CART_KEY)?
            .unwrap_or_default())
    }
}
