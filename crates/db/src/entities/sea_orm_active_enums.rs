//! `SeaORM` active enums mirroring the PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use torque_core::inventory::{
    HeaderKind, MovementKind as CoreMovementKind, ProductStatus as CoreProductStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "product_status")]
pub enum ProductStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "movement_kind")]
pub enum MovementKind {
    #[sea_orm(string_value = "in")]
    In,
    #[sea_orm(string_value = "out")]
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "stock_source")]
pub enum StockSource {
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "movement")]
    Movement,
}

impl From<ProductStatus> for CoreProductStatus {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Active => Self::Active,
            ProductStatus::Inactive => Self::Inactive,
        }
    }
}

impl From<CoreProductStatus> for ProductStatus {
    fn from(status: CoreProductStatus) -> Self {
        match status {
            CoreProductStatus::Active => Self::Active,
            CoreProductStatus::Inactive => Self::Inactive,
        }
    }
}

impl From<CoreMovementKind> for MovementKind {
    fn from(kind: CoreMovementKind) -> Self {
        match kind {
            CoreMovementKind::In => Self::In,
            CoreMovementKind::Out => Self::Out,
        }
    }
}

impl From<MovementKind> for CoreMovementKind {
    fn from(kind: MovementKind) -> Self {
        match kind {
            MovementKind::In => Self::In,
            MovementKind::Out => Self::Out,
        }
    }
}

impl From<HeaderKind> for StockSource {
    fn from(kind: HeaderKind) -> Self {
        match kind {
            HeaderKind::Sale => Self::Sale,
            HeaderKind::Purchase => Self::Purchase,
            HeaderKind::Movement => Self::Movement,
        }
    }
}

impl From<StockSource> for HeaderKind {
    fn from(source: StockSource) -> Self {
        match source {
            StockSource::Sale => Self::Sale,
            StockSource::Purchase => Self::Purchase,
            StockSource::Movement => Self::Movement,
        }
    }
}
