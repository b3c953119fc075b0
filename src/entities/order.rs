use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Closed set of order statuses. Transitions are validated against
/// [`OrderStatus::can_transition_to`]; there is no free-text comparison
/// anywhere in the workflow.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "validated")]
    Validated,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses that hold a stock reservation. Cancelling out of one of
    /// these must restore the decremented stock.
    pub fn holds_stock(self) -> bool {
        matches!(self, OrderStatus::Validated | OrderStatus::Preparing)
    }

    /// The directed transition table. Everything not listed here is an
    /// invalid transition, including any move out of a terminal status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Validated)
                | (Pending, Preparing)
                | (Pending, Cancelled)
                | (Validated, Preparing)
                | (Validated, Shipped)
                | (Validated, Delivered)
                | (Validated, Cancelled)
                | (Preparing, Shipped)
                | (Preparing, Delivered)
                | (Preparing, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

/// The `orders` table. One order always belongs to exactly one vendor;
/// multi-vendor carts are split into one order per vendor at creation time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub client_id: Uuid,
    pub vendor_id: Uuid,
    pub status: OrderStatus,
    pub article_count: i32,
    pub total_amount: Decimal,
    pub ordered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id"
    )]
    Vendor,
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLines,
    #[sea_orm(has_one = "super::delivery::Entity")]
    Delivery,
    #[sea_orm(has_one = "super::sale::Entity")]
    Sale,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl Related<super::sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use test_case::test_case;

    #[test_case(Pending, Validated, true)]
    #[test_case(Pending, Preparing, true)]
    #[test_case(Pending, Cancelled, true)]
    #[test_case(Pending, Shipped, false)]
    #[test_case(Pending, Delivered, false)]
    #[test_case(Validated, Preparing, true)]
    #[test_case(Validated, Shipped, true)]
    #[test_case(Validated, Delivered, true)]
    #[test_case(Validated, Cancelled, true)]
    #[test_case(Preparing, Shipped, true)]
    #[test_case(Preparing, Delivered, true)]
    #[test_case(Preparing, Cancelled, true)]
    #[test_case(Preparing, Validated, false)]
    #[test_case(Shipped, Delivered, true)]
    #[test_case(Shipped, Cancelled, false)]
    fn transition_table(from: super::OrderStatus, to: super::OrderStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_statuses_accept_no_transitions() {
        for from in [Delivered, Cancelled] {
            assert!(from.is_terminal());
            for to in [Pending, Validated, Preparing, Shipped, Delivered, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn stock_holding_statuses() {
        assert!(Validated.holds_stock());
        assert!(Preparing.holds_stock());
        assert!(!Pending.holds_stock());
        assert!(!Shipped.holds_stock());
        assert!(!Delivered.holds_stock());
        assert!(!Cancelled.holds_stock());
    }
}
