//! Cart persistence in `storefront.cart`.
//!
//! Each user owns at most one row. Line items are stored as a JSONB array;
//! the total columns are written for reporting but never trusted on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use shopcart_core::{Cart, CartId, CartLineItem, UserId};

use super::RepositoryError;
use crate::store::{CartStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: String,
    items: Json<Vec<CartLineItem>>,
    total_amount: Decimal,
    total_items: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(&row.user_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid user id in cart {}: {e}", row.id))
        })?;
        let cart = Self::from_lines(user_id, row.items.0).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid items in cart {}: {e}", row.id))
        })?;

        let stored_items = u64::try_from(row.total_items).ok();
        if row.total_amount != cart.total_amount() || stored_items != Some(cart.total_items()) {
            tracing::warn!(
                cart_id = %row.id,
                stored_amount = %row.total_amount,
                stored_items = row.total_items,
                amount = %cart.total_amount(),
                items = cart.total_items(),
                "Stored cart totals drifted from items; using recomputed totals"
            );
        }

        Ok(cart.persisted(row.id, row.created_at, row.updated_at))
    }
}

/// `PostgreSQL` implementation of [`CartStore`].
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a cart store backed by `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, items, total_amount, total_items, created_at, updated_at
            FROM storefront.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(Cart::try_from).transpose()?)
    }

    #[instrument(skip(self, cart), fields(user_id = %cart.user_id(), items = cart.items().len()))]
    async fn save(&self, cart: &Cart) -> Result<Cart, StoreError> {
        let id = cart.id().unwrap_or_else(CartId::generate);
        let total_items = i64::try_from(cart.total_items()).map_err(|e| {
            StoreError::DataCorruption(format!("cart item count out of range: {e}"))
        })?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart
                (id, user_id, items, total_amount, total_items, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (user_id) DO UPDATE
                SET items = EXCLUDED.items,
                    total_amount = EXCLUDED.total_amount,
                    total_items = EXCLUDED.total_items,
                    updated_at = NOW()
            RETURNING id, user_id, items, total_amount, total_items, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(cart.user_id().as_str())
        .bind(Json(cart.items()))
        .bind(cart.total_amount())
        .bind(total_items)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(Cart::try_from(row)?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}
