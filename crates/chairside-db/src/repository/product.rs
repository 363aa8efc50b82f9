//! # Product & Product Sale Repositories
//!
//! Retail products sold over the counter. A sale freezes the unit price and
//! the seller's product commission rate at the moment it is recorded, so
//! later price or rate changes never rewrite history.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::user::{find_client, find_user};
use chairside_core::lifecycle::ensure_can_be_barber;
use chairside_core::validation::{validate_positive_amount, validate_quantity, validate_text};
use chairside_core::{CoreError, Money, Product, ProductSale};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, is_active, created_at";

const SALE_COLUMNS: &str = r#"
    id, product_id, staff_id, client_id, quantity,
    unit_price_cents, total_price_cents, commission_rate_bps, commission_amount_cents,
    created_at
"#;

// =============================================================================
// Products
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_product(&mut conn, id).await
    }

    /// Every product, active or retired; reports need names of both.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn create(&self, name: &str, price: Money) -> DbResult<Product> {
        let name = validate_text("name", name, 120)?;
        validate_positive_amount("price", price)?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO products (name, price_cents, is_active, created_at) VALUES (?1, ?2, 1, ?3)",
        )
        .bind(&name)
        .bind(price.cents())
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(name = %name, price_cents = price.cents(), "Product created");

        Ok(Product {
            id: result.last_insert_rowid(),
            name,
            price_cents: price.cents(),
            is_active: true,
            created_at: now,
        })
    }

    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

// =============================================================================
// Product Sales
// =============================================================================

/// Repository for recording and listing product sales.
#[derive(Debug, Clone)]
pub struct ProductSaleRepository {
    pool: SqlitePool,
}

impl ProductSaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductSaleRepository { pool }
    }

    /// Records a sale.
    ///
    /// ## Frozen Values
    /// ```text
    /// unit_price        = product.price            (now)
    /// total_price       = unit_price × quantity
    /// commission_rate   = staff.product_commission_rate (now)
    /// commission_amount = total_price × rate, rounded half-up
    /// ```
    ///
    /// ## Errors
    /// - `NotFound` for an unknown product, staff member or client
    /// - `Validation` for a retired product, a seller who is not active
    ///   Boss/Staff, or a quantity outside 1..=999
    pub async fn record(
        &self,
        product_id: i64,
        staff_id: i64,
        client_id: Option<i64>,
        quantity: i64,
    ) -> DbResult<ProductSale> {
        validate_quantity(quantity)?;

        let mut tx = begin_write(&self.pool).await?;

        let product = find_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;
        if !product.is_active {
            return Err(chairside_core::ValidationError::NotAllowed {
                field: "productId".to_string(),
                allowed: vec!["active products".to_string()],
            }
            .into());
        }

        let staff = find_user(&mut tx, staff_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", staff_id))?;
        ensure_can_be_barber(&staff)?;

        if let Some(client_id) = client_id {
            if find_client(&mut tx, client_id).await?.is_none() {
                return Err(CoreError::not_found("Client", client_id).into());
            }
        }

        let unit_price = product.price();
        let total_price = unit_price.multiply_quantity(quantity);
        let rate = staff.product_commission_rate();
        let commission = total_price.percentage(rate);
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO product_sales (
                product_id, staff_id, client_id, quantity,
                unit_price_cents, total_price_cents, commission_rate_bps, commission_amount_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(product_id)
        .bind(staff_id)
        .bind(client_id)
        .bind(quantity)
        .bind(unit_price.cents())
        .bind(total_price.cents())
        .bind(rate.bps() as i64)
        .bind(commission.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let sale = ProductSale {
            id: result.last_insert_rowid(),
            product_id,
            staff_id,
            client_id,
            quantity,
            unit_price_cents: unit_price.cents(),
            total_price_cents: total_price.cents(),
            commission_rate_bps: rate.bps() as i64,
            commission_amount_cents: commission.cents(),
            created_at: now,
        };

        info!(
            sale_id = sale.id,
            product_id,
            staff_id,
            quantity,
            total_cents = sale.total_price_cents,
            commission_cents = sale.commission_amount_cents,
            "Product sale recorded"
        );
        Ok(sale)
    }

    pub async fn list_all(&self) -> DbResult<Vec<ProductSale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sales(&mut conn).await
    }
}

// =============================================================================
// Connection-Scoped Queries
// =============================================================================

pub(crate) async fn find_product(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = ?1",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

pub(crate) async fn fetch_products(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products ORDER BY id",
        PRODUCT_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

pub(crate) async fn fetch_sales(conn: &mut SqliteConnection) -> DbResult<Vec<ProductSale>> {
    let sales = sqlx::query_as::<_, ProductSale>(&format!(
        "SELECT {} FROM product_sales ORDER BY created_at, id",
        SALE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(sales)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Shop;
    use chairside_core::{Percent, Role};

    #[tokio::test]
    async fn test_sale_freezes_price_and_commission() {
        let shop = Shop::open().await;
        let pomade = shop
            .db
            .products()
            .create("Pomade", Money::from_cents(3990))
            .await
            .unwrap();

        let sale = shop
            .db
            .product_sales()
            .record(pomade.id, shop.staff.id, Some(shop.client_id), 3)
            .await
            .unwrap();

        assert_eq!(sale.unit_price_cents, 3990);
        assert_eq!(sale.total_price_cents, 11_970);
        assert_eq!(sale.commission_rate_bps, 500);
        // 5% of 119.70 = 5.985, rounded half-up
        assert_eq!(sale.commission_amount_cents, 599);

        let sales = shop.db.product_sales().list_all().await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].commission_amount_cents, 599);
    }

    #[tokio::test]
    async fn test_seller_rate_is_used() {
        let shop = Shop::open().await;
        let seller = shop
            .db
            .users()
            .create("Hafiz", Role::Staff, None, Some(Percent::from_percentage(10.0)))
            .await
            .unwrap();
        let wax = shop
            .db
            .products()
            .create("Wax", Money::from_cents(2500))
            .await
            .unwrap();

        let sale = shop
            .db
            .product_sales()
            .record(wax.id, seller.id, None, 2)
            .await
            .unwrap();
        assert_eq!(sale.commission_amount_cents, 500);
    }

    #[tokio::test]
    async fn test_rejects_invalid_sales() {
        let shop = Shop::open().await;
        let products = shop.db.products();
        let sales = shop.db.product_sales();
        let wax = products.create("Wax", Money::from_cents(2500)).await.unwrap();

        assert!(matches!(
            sales.record(404, shop.staff.id, None, 1).await,
            Err(DbError::Domain(CoreError::NotFound { entity: "Product", .. }))
        ));
        assert!(matches!(
            sales.record(wax.id, shop.staff.id, None, 0).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        let client_user = shop
            .db
            .users()
            .create("Customer", Role::Client, None, None)
            .await
            .unwrap();
        assert!(matches!(
            sales.record(wax.id, client_user.id, None, 1).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));

        products.set_active(wax.id, false).await.unwrap();
        assert!(matches!(
            sales.record(wax.id, shop.staff.id, None, 1).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(sales.list_all().await.unwrap().is_empty());
    }
}
