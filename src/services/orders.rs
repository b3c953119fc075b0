//! Order creation and queries.
//!
//! Creation takes the authenticated client's raw line list, resolves each
//! product, and splits the lines into one order per owning vendor. All
//! sub-orders, their lines, the client balance debit, and the outbox events
//! are written in a single transaction: a failure in any sub-order rolls
//! back every one of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionError,
    TransactionTrait,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_line::{self, Entity as OrderLineEntity};
use crate::entities::{client, product};
use crate::errors::ServiceError;
use crate::events::{outbox, Event};
use crate::services::accounts::{client_profile_for, vendor_profile_for};

lazy_static! {
    static ref ORDER_CREATIONS: IntCounter =
        IntCounter::new("order_creations_total", "Total number of orders created")
            .expect("metric can be created");
    static ref ORDER_CREATION_FAILURES: IntCounter = IntCounter::new(
        "order_creation_failures_total",
        "Total number of failed order creations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Optional price assertion; must match the catalog price when present.
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
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
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListPage {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates one order per vendor represented in the line list.
    #[instrument(skip(self, actor, lines), fields(user_id = %actor.id, line_count = lines.len()))]
    pub async fn create_orders(
        &self,
        actor: &AuthUser,
        lines: Vec<CreateOrderLine>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        if lines.is_empty() {
            ORDER_CREATION_FAILURES.inc();
            return Err(ServiceError::ValidationError(
                "order must contain at least one line".to_string(),
            ));
        }
        for line in &lines {
            line.validate()?;
        }

        let client = client_profile_for(self.db.as_ref(), actor).await?;

        let created = self
            .db
            .transaction::<_, Vec<order::Model>, ServiceError>(move |txn| {
                Box::pin(async move {
                    // Resolve every product and group lines per owning vendor.
                    let mut groups: BTreeMap<Uuid, Vec<(product::Model, CreateOrderLine)>> =
                        BTreeMap::new();
                    for line in lines {
                        let product = product::Entity::find_by_id(line.product_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::from_db)?
                            .ok_or_else(|| {
                                ServiceError::ValidationError(format!(
                                    "product {} does not exist",
                                    line.product_id
                                ))
                            })?;

                        if let Some(asserted) = line.unit_price {
                            if asserted != product.price {
                                return Err(ServiceError::ValidationError(format!(
                                    "unit_price {} does not match catalog price {} for '{}'",
                                    asserted, product.price, product.name
                                )));
                            }
                        }

                        groups.entry(product.vendor_id).or_default().push((product, line));
                    }

                    let now = Utc::now();
                    let mut grand_total = Decimal::ZERO;
                    let mut created = Vec::with_capacity(groups.len());

                    for (vendor_id, group) in groups {
                        let total: Decimal = group
                            .iter()
                            .map(|(p, l)| p.price * Decimal::from(l.quantity))
                            .sum();
                        let article_count: i32 =
                            group.iter().map(|(_, l)| l.quantity).sum();

                        let saved_order = order::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            order_number: Set(next_order_number()),
                            client_id: Set(client.id),
                            vendor_id: Set(vendor_id),
                            status: Set(OrderStatus::Pending),
                            article_count: Set(article_count),
                            total_amount: Set(total),
                            ordered_at: Set(now),
                            created_at: Set(now),
                            updated_at: Set(None),
                            version: Set(1),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::from_db)?;

                        for (product, line) in &group {
                            order_line::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                order_id: Set(saved_order.id),
                                product_id: Set(product.id),
                                quantity: Set(line.quantity),
                                unit_price: Set(product.price),
                                line_total: Set(product.price * Decimal::from(line.quantity)),
                                created_at: Set(now),
                            }
                            .insert(txn)
                            .await
                            .map_err(ServiceError::from_db)?;
                        }

                        outbox::enqueue(
                            txn,
                            &Event::OrderPlaced {
                                order_id: saved_order.id,
                                order_number: saved_order.order_number.clone(),
                                client_id: saved_order.client_id,
                                vendor_id: saved_order.vendor_id,
                                total_amount: saved_order.total_amount,
                            },
                        )
                        .await?;

                        grand_total += total;
                        created.push(saved_order);
                    }

                    // Debit the client's running balance once, for the
                    // combined total of every sub-order.
                    let mut client_active: client::ActiveModel = client.into();
                    let balance = client_active.balance.take().unwrap_or(Decimal::ZERO);
                    client_active.balance = Set(balance - grand_total);
                    client_active.updated_at = Set(Some(now));
                    client_active
                        .update(txn)
                        .await
                        .map_err(ServiceError::from_db)?;

                    Ok(created)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => {
                    ORDER_CREATION_FAILURES.inc();
                    ServiceError::from_db(db_err)
                }
                TransactionError::Transaction(service_err) => {
                    ORDER_CREATION_FAILURES.inc();
                    service_err
                }
            })?;

        ORDER_CREATIONS.inc_by(created.len() as u64);
        info!(
            user_id = %actor.id,
            orders = created.len(),
            "orders created"
        );

        Ok(created.into_iter().map(model_to_response).collect())
    }

    /// Fetches a single order, enforcing view rights for the actor.
    #[instrument(skip(self, actor), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        actor: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.load_authorized(actor, order_id).await?;
        Ok(model_to_response(order))
    }

    /// Fetches the lines of an order the actor may view.
    #[instrument(skip(self, actor), fields(order_id = %order_id))]
    pub async fn get_order_lines(
        &self,
        actor: &AuthUser,
        order_id: Uuid,
    ) -> Result<Vec<OrderLineResponse>, ServiceError> {
        let order = self.load_authorized(actor, order_id).await?;
        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order.id))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?;

        Ok(lines
            .into_iter()
            .map(|line| OrderLineResponse {
                id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total,
            })
            .collect())
    }

    /// Lists the actor's own orders: a client sees the orders they placed, a
    /// vendor the orders placed against their catalog.
    #[instrument(skip(self, actor))]
    pub async fn list_mine(
        &self,
        actor: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<OrderListPage, ServiceError> {
        use crate::entities::user::UserRole;

        let mut query = OrderEntity::find();
        match actor.role {
            UserRole::Client => {
                let client = client_profile_for(self.db.as_ref(), actor).await?;
                query = query.filter(order::Column::ClientId.eq(client.id));
            }
            UserRole::Vendor => {
                let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;
                query = query.filter(order::Column::VendorId.eq(vendor.id));
            }
            UserRole::Admin => {}
        }

        self.paginate(query, page, limit).await
    }

    /// Lists every order, optionally filtered by status and by product
    /// category. Admin-only at the routing layer.
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        category_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<OrderListPage, ServiceError> {
        let mut query = OrderEntity::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(category_id) = category_id {
            query = query
                .join(JoinType::InnerJoin, order::Relation::OrderLines.def())
                .join(JoinType::InnerJoin, order_line::Relation::Product.def())
                .filter(product::Column::CategoryId.eq(category_id))
                .distinct();
        }

        self.paginate(query, page, limit).await
    }

    async fn paginate(
        &self,
        query: sea_orm::Select<OrderEntity>,
        page: u64,
        limit: u64,
    ) -> Result<OrderListPage, ServiceError> {
        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);

        let total = paginator.num_items().await.map_err(ServiceError::from_db)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::from_db)?;

        Ok(OrderListPage {
            orders: orders.into_iter().map(model_to_response).collect(),
            total,
        })
    }

    async fn load_authorized(
        &self,
        actor: &AuthUser,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        use crate::entities::user::UserRole;

        let order = OrderEntity::find_by_id(order_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::from_db)?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        match actor.role {
            UserRole::Admin => Ok(order),
            UserRole::Vendor => {
                let vendor = vendor_profile_for(self.db.as_ref(), actor).await?;
                if order.vendor_id == vendor.id {
                    Ok(order)
                } else {
                    Err(ServiceError::Forbidden(
                        "order belongs to another vendor".to_string(),
                    ))
                }
            }
            UserRole::Client => {
                let client = client_profile_for(self.db.as_ref(), actor).await?;
                if order.client_id == client.id {
                    Ok(order)
                } else {
                    Err(ServiceError::Forbidden(
                        "order belongs to another client".to_string(),
                    ))
                }
            }
        }
    }
}

fn next_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("ORD-{}", suffix)
}

pub(crate) fn model_to_response(model: order::Model) -> OrderResponse {
    OrderResponse {
        id: model.id,
        order_number: model.order_number,
        client_id: model.client_id,
        vendor_id: model.vendor_id,
        status: model.status,
        article_count: model.article_count,
        total_amount: model.total_amount,
        ordered_at: model.ordered_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_numbers_are_prefixed_and_unique() {
        let first = next_order_number();
        let second = next_order_number();
        assert!(first.starts_with("ORD-"));
        assert_eq!(first.len(), "ORD-".len() + 12);
        assert_ne!(first, second);
    }

    #[test]
    fn model_to_response_maps_every_field() {
        let now = Utc::now();
        let model = order::Model {
            id: Uuid::new_v4(),
            order_number: "ORD-ABCDEF123456".to_string(),
            client_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            article_count: 5,
            total_amount: dec!(29.00),
            ordered_at: now,
            created_at: now,
            updated_at: None,
            version: 1,
        };
        let id = model.id;

        let response = model_to_response(model);
        assert_eq!(response.id, id);
        assert_eq!(response.status, OrderStatus::Pending);
        assert_eq!(response.article_count, 5);
        assert_eq!(response.total_amount, dec!(29.00));
    }
}
