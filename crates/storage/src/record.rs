use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::status::{
    AccountStatus, OrderStatus, PaymentStatus, RequestStatus, RequestType, Role,
};

/// A marketplace account, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    /// Present iff `role == Chef`. Format `chef-NNNN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chef_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Profile fields written by an account sync. Role and status are never part
/// of a sync; they are defaulted on insert only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A user's petition to be granted the chef or admin role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationRequest {
    pub id: String,
    pub user_email: String,
    pub request_type: RequestType,
    pub request_status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub request_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub decided_at: Option<OffsetDateTime>,
    /// Set once the account mutation for an approval has been written.
    /// An approved request with `applied == false` is awaiting reconciliation.
    #[serde(default)]
    pub applied: bool,
}

impl ElevationRequest {
    pub fn awaiting_reconciliation(&self) -> bool {
        self.request_status == RequestStatus::Approved && !self.applied
    }
}

/// A buyer's order for a chef's meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_email: String,
    /// Weak reference: never checked against the account store.
    pub chef_id: String,
    pub meal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub order_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
}

impl Order {
    /// `price * quantity`, or `None` if the product overflows `Decimal`.
    pub fn total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Indexed lookup filter for [`OrderStore::list_orders`](crate::OrderStore::list_orders).
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_email: Option<String>,
    pub chef_id: Option<String>,
}

impl OrderFilter {
    pub fn buyer(email: impl Into<String>) -> Self {
        Self {
            user_email: Some(email.into()),
            chef_id: None,
        }
    }

    pub fn chef(chef_id: impl Into<String>) -> Self {
        Self {
            user_email: None,
            chef_id: Some(chef_id.into()),
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.user_email
            .as_deref()
            .map_or(true, |e| e == order.user_email)
            && self.chef_id.as_deref().map_or(true, |c| c == order.chef_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn order(user: &str, chef: &str) -> Order {
        Order {
            id: "o-1".to_string(),
            user_email: user.to_string(),
            chef_id: chef.to_string(),
            meal_id: "meal-1".to_string(),
            meal_name: None,
            delivery_address: None,
            price: Decimal::new(1050, 2),
            quantity: 3,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            order_time: datetime!(2025-01-01 0:00 UTC),
            paid_at: None,
        }
    }

    #[test]
    fn total_multiplies_price_by_quantity() {
        assert_eq!(
            order("b@x.com", "chef-1234").total(),
            Some(Decimal::new(3150, 2))
        );
    }

    #[test]
    fn total_is_none_when_the_product_overflows() {
        let o = Order {
            price: Decimal::MAX,
            quantity: 2,
            ..order("b@x.com", "chef-1234")
        };
        assert_eq!(o.total(), None);
    }

    #[test]
    fn filter_matches_on_set_fields_only() {
        let o = order("b@x.com", "chef-1234");
        assert!(OrderFilter::default().matches(&o));
        assert!(OrderFilter::buyer("b@x.com").matches(&o));
        assert!(!OrderFilter::buyer("c@x.com").matches(&o));
        assert!(OrderFilter::chef("chef-1234").matches(&o));
        assert!(!OrderFilter::chef("chef-9999").matches(&o));
    }

    #[test]
    fn order_serializes_with_camel_case_wire_names() {
        let json = serde_json::to_value(order("b@x.com", "chef-1234")).unwrap();
        assert_eq!(json["userEmail"], "b@x.com");
        assert_eq!(json["orderStatus"], "pending");
        assert_eq!(json["paymentStatus"], "Pending");
        assert_eq!(json["orderTime"], "2025-01-01T00:00:00Z");
        assert!(json.get("mealName").is_none());
    }
}
