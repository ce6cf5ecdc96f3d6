//! SQLite adapters: the collaborator traits over `aisle_db::Database`.

use async_trait::async_trait;

use aisle_core::{Cart, CustomerProfile, Order, Product, PurchaseRecord};
use aisle_db::Database;

use super::{CartStore, CatalogSource, CustomerStore, OrderStore, SequenceStore};
use crate::error::{SyncError, SyncResult};

#[async_trait]
impl CatalogSource for Database {
    async fn product_by_id(&self, id: &str) -> SyncResult<Option<Product>> {
        Ok(self.products().get_by_id(id).await?)
    }

    async fn product_by_title(&self, title: &str) -> SyncResult<Option<Product>> {
        Ok(self.products().find_by_title(title).await?)
    }
}

#[async_trait]
impl CartStore for Database {
    async fn save_cart(&self, customer_uid: &str, cart: &Cart) -> SyncResult<()> {
        Ok(self.carts().save(customer_uid, cart).await?)
    }

    async fn load_cart(&self, customer_uid: &str) -> SyncResult<Option<Cart>> {
        Ok(self.carts().load(customer_uid).await?)
    }
}

#[async_trait]
impl OrderStore for Database {
    async fn insert_order(&self, order: &Order, customer_uid: &str) -> SyncResult<()> {
        match self.orders().insert(order, customer_uid).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unique_violation() => {
                Err(SyncError::DuplicateOrder(order.order_number.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn order(&self, order_number: &str) -> SyncResult<Option<Order>> {
        Ok(self.orders().get(order_number).await?)
    }

    async fn purchases(&self, customer_uid: &str) -> SyncResult<Vec<PurchaseRecord>> {
        Ok(self.orders().purchases_for(customer_uid).await?)
    }
}

#[async_trait]
impl CustomerStore for Database {
    async fn insert_customer(&self, profile: &CustomerProfile) -> SyncResult<()> {
        Ok(self.customers().insert(profile).await?)
    }

    async fn customer(&self, uid: &str) -> SyncResult<Option<CustomerProfile>> {
        Ok(self.customers().get(uid).await?)
    }

    async fn assign_customer_id(&self, uid: &str, customer_id: &str) -> SyncResult<bool> {
        Ok(self.customers().assign_customer_id(uid, customer_id).await?)
    }
}

#[async_trait]
impl SequenceStore for Database {
    async fn current(&self, name: &str) -> SyncResult<Option<u64>> {
        Ok(self.counters().current(name).await?)
    }

    async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<u64>,
        next: u64,
    ) -> SyncResult<bool> {
        Ok(self.counters().compare_and_swap(name, expected, next).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aisle_core::{PaymentReceipt, WeightValidation};
    use crate::allocator::{AllocatorPolicy, OrderAllocator};
    use crate::store::Stores;
    use aisle_core::ORDER_NUMBER_COUNTER;
    use aisle_db::DbConfig;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::TempDir;

    fn order(number: &str) -> Order {
        Order {
            order_number: number.to_string(),
            customer_id: "CUST0001".into(),
            customer_name: "Ada".into(),
            customer_email: "ada@example.com".into(),
            items: vec![],
            subtotal_cents: 1000,
            tax_cents: 50,
            total_cents: 1050,
            payment_method: PaymentReceipt::cash().method,
            payment_id: PaymentReceipt::cash().payment_id,
            payment_status: PaymentReceipt::cash().status,
            weight_validation: WeightValidation {
                cart_weight: 0.0,
                actual_weight: 0.0,
                difference: 0.0,
                is_valid: true,
            },
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_order_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.insert_order(&order("ORD-000001"), "u1").await.unwrap();
        let err = db.insert_order(&order("ORD-000001"), "u1").await.unwrap_err();

        assert!(matches!(err, SyncError::DuplicateOrder(n) if n == "ORD-000001"));
        assert_eq!(db.purchases("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_customer_assignment_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.assign_customer_id("nobody", "CUST0001").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_order_numbers_on_shared_file_are_unique() {
        const N: u64 = 24;
        let dir = TempDir::new().unwrap();
        let config = DbConfig::new(dir.path().join("aisle.db")).with_max_connections(4);
        let db = Database::new(config).await.unwrap();
        let policy = AllocatorPolicy {
            max_attempts: 10_000,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        };
        let allocator = OrderAllocator::new(&Stores::sqlite(db.clone()), policy);

        let tasks: Vec<_> = (0..N)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move { allocator.next(ORDER_NUMBER_COUNTER).await })
            })
            .collect();

        let mut values = HashSet::new();
        for task in tasks {
            let value = task.await.unwrap().unwrap();
            assert!(values.insert(value), "duplicate value {value}");
        }

        assert_eq!(values, (1..=N).collect::<HashSet<_>>());
        assert_eq!(db.current(ORDER_NUMBER_COUNTER).await.unwrap(), Some(N));
        db.close().await;
    }
}
