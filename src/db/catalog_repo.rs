// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{CatalogItem, Product, ProductKit},
    models::ledger::ItemType,
};

// Catálogo de produtos e kits, consumido na forma comum CatalogItem.
#[derive(Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_item<'e, E>(
        &self,
        executor: E,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Option<CatalogItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = match item_type {
            ItemType::Product => sqlx::query_as::<_, Product>(
                "SELECT id, name, unit_price, is_active, created_at
                 FROM products WHERE id = $1",
            )
            .bind(item_id)
            .fetch_optional(executor)
            .await?
            .map(CatalogItem::from),
            ItemType::Kit => sqlx::query_as::<_, ProductKit>(
                "SELECT id, name, price, is_active, created_at
                 FROM product_kits WHERE id = $1",
            )
            .bind(item_id)
            .fetch_optional(executor)
            .await?
            .map(CatalogItem::from),
        };
        Ok(item)
    }
}
