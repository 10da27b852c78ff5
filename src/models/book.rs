//! Book catalog model and inventory

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Cover type of a catalogued book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoverType {
    Hard,
    Soft,
}

/// Book model with per-title inventory.
///
/// `inventory` is the number of copies currently available for borrowing.
/// It is mutated exclusively by the borrowing lifecycle (decremented on
/// borrow, incremented on return).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub cover: CoverType,
    pub inventory: u32,
    /// Fee charged per borrowed day
    pub daily_fee: Decimal,
}

impl Book {
    /// Check if at least one copy is available for borrowing
    pub fn is_available(&self) -> bool {
        self.inventory > 0
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    #[serde(default = "default_cover")]
    pub cover: CoverType,
    pub inventory: u32,
    pub daily_fee: Decimal,
}

fn default_cover() -> CoverType {
    CoverType::Hard
}

/// Update book request; inventory changes only through the borrowing lifecycle
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover: Option<CoverType>,
    pub daily_fee: Option<Decimal>,
}
