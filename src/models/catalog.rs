// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Catálogo (consumo somente leitura) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "Cuve inox 500L")]
    pub name: String,
    #[schema(example = "1250.00")]
    pub unit_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductKit {
    pub id: Uuid,
    #[schema(example = "Kit embouteillage complet")]
    pub name: String,
    #[schema(example = "3400.00")]
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// Forma comum que o razão de linhas consome, seja produto ou kit.
// O preço é congelado no momento da adição da linha.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub is_active: bool,
}

impl From<Product> for CatalogItem {
    fn from(p: Product) -> Self {
        CatalogItem {
            id: p.id,
            name: p.name,
            unit_price: p.unit_price,
            is_active: p.is_active,
        }
    }
}

impl From<ProductKit> for CatalogItem {
    fn from(k: ProductKit) -> Self {
        CatalogItem {
            id: k.id,
            name: k.name,
            unit_price: k.price,
            is_active: k.is_active,
        }
    }
}
