//! In-memory remote cart store for session tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use boutique_core::cart;
use boutique_core::{LineItem, Order, OrderId, ProductId, UserId, merge};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use crate::remote::{RemoteCartStore, RemoteError};

pub const TOKEN: &str = "valid-token";

/// One account cart, guarded by a lock so every call is an atomic
/// read-modify-write like the real backend.
#[derive(Default)]
pub struct FakeRemote {
    cart: Mutex<Vec<LineItem>>,
    pub fail_merge: AtomicBool,
    pub reject_merge: AtomicBool,
    pub offline: AtomicBool,
    pub yield_on_merge: AtomicBool,
    pub merge_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn with_cart(items: Vec<LineItem>) -> Self {
        Self {
            cart: Mutex::new(items),
            ..Self::default()
        }
    }

    #[allow(clippy::unwrap_used)]
    pub fn items(&self) -> Vec<LineItem> {
        self.cart.lock().unwrap().clone()
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check(&self, token: &SecretString) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Timeout);
        }
        if token.expose_secret() != TOKEN {
            return Err(RemoteError::Unauthorized);
        }
        Ok(())
    }

    #[allow(clippy::unwrap_used)]
    fn edit<T>(&self, change: impl FnOnce(&mut Vec<LineItem>) -> T) -> (Vec<LineItem>, T) {
        let mut cart = self.cart.lock().unwrap();
        let output = change(&mut *cart);
        (cart.clone(), output)
    }
}

#[async_trait]
impl RemoteCartStore for FakeRemote {
    async fn fetch(&self, token: &SecretString) -> Result<Vec<LineItem>, RemoteError> {
        self.check(token)?;
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items())
    }

    async fn add_item(
        &self,
        token: &SecretString,
        item: &LineItem,
    ) -> Result<Vec<LineItem>, RemoteError> {
        self.check(token)?;
        Ok(self.edit(|items| cart::add_item(items, item.clone())).0)
    }

    async fn set_quantity(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<LineItem>, RemoteError> {
        self.check(token)?;
        match self.edit(|items| cart::set_quantity(items, product_id, quantity)) {
            (items, true) => Ok(items),
            (_, false) => Err(RemoteError::NotFound("Item not found in cart".to_string())),
        }
    }

    async fn remove_item(
        &self,
        token: &SecretString,
        product_id: &ProductId,
    ) -> Result<Vec<LineItem>, RemoteError> {
        self.check(token)?;
        Ok(self.edit(|items| cart::remove_item(items, product_id)).0)
    }

    async fn clear(&self, token: &SecretString) -> Result<Vec<LineItem>, RemoteError> {
        self.check(token)?;
        Ok(self.edit(Vec::clear).0)
    }

    async fn merge(
        &self,
        token: &SecretString,
        items: &[LineItem],
    ) -> Result<Vec<LineItem>, RemoteError> {
        if self.yield_on_merge.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.check(token)?;
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_merge.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                message: "Server error".to_string(),
            });
        }
        if self.reject_merge.load(Ordering::SeqCst) {
            return Err(RemoteError::Validation("Invalid items format".to_string()));
        }
        Ok(self
            .edit(|cart| {
                let merged = merge(cart, items);
                *cart = merged;
            })
            .0)
    }

    async fn checkout(&self, token: &SecretString) -> Result<Order, RemoteError> {
        self.check(token)?;
        let (_, items) = self.edit(std::mem::take);
        if items.is_empty() {
            return Err(RemoteError::Validation("Cart is empty".to_string()));
        }
        let total =
            Order::total_of(&items).map_err(|e| RemoteError::Validation(e.to_string()))?;
        Ok(Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            total,
            items,
            date: Utc::now(),
        })
    }
}
