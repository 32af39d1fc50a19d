//! Business ("pro") records: organizations, catalogue, orders and bookings.

use serde::{Deserialize, Serialize};

use super::plain_entity;

/// A business registered by a pro member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    #[serde(default)]
    pub place_ids: Vec<String>,
    #[serde(default)]
    pub siret: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub created_at: String,
}

/// Request body for editing the organization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl OrganizationUpdate {
    pub fn apply(&self, org: &Organization) -> Organization {
        Organization {
            name: self.name.clone().unwrap_or_else(|| org.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| org.description.clone()),
            phone: self.phone.clone().unwrap_or_else(|| org.phone.clone()),
            website: self.website.clone().unwrap_or_else(|| org.website.clone()),
            ..org.clone()
        }
    }
}

/// A product sold by an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// A bookable service offered by an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Request body shared by product and service creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub duration_minutes: u32,
}

/// Request body shared by product and service edits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CatalogueUpdate {
    pub fn apply_product(&self, product: &Product) -> Product {
        Product {
            name: self.name.clone().unwrap_or_else(|| product.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| product.description.clone()),
            price: self.price.unwrap_or(product.price),
            stock: self.stock.unwrap_or(product.stock),
            is_active: self.is_active.unwrap_or(product.is_active),
            ..product.clone()
        }
    }

    pub fn apply_service(&self, service: &Service) -> Service {
        Service {
            name: self.name.clone().unwrap_or_else(|| service.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| service.description.clone()),
            price: self.price.unwrap_or(service.price),
            duration_minutes: self.duration_minutes.unwrap_or(service.duration_minutes),
            is_active: self.is_active.unwrap_or(service.is_active),
            ..service.clone()
        }
    }
}

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

/// One line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A customer order placed with an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub created_at: String,
}

/// Request body for placing an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub organization_id: String,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.unit_price * f64::from(item.quantity))
            .sum()
    }
}

/// Lifecycle of a booking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// A customer booking of a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    pub service_id: String,
    pub date: String,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: String,
}

/// Request body for booking a service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub service_id: String,
    pub date: String,
    #[serde(default)]
    pub notes: String,
}

plain_entity!(Organization, Product, Service, Order, Booking);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_total_from_items() {
        let draft = OrderDraft {
            organization_id: "org1".to_string(),
            items: vec![
                OrderItem {
                    product_id: "reblochon".to_string(),
                    quantity: 2,
                    unit_price: 8.5,
                },
                OrderItem {
                    product_id: "tomme".to_string(),
                    quantity: 1,
                    unit_price: 12.0,
                },
            ],
        };
        assert!((draft.total() - 29.0).abs() < f64::EPSILON);
    }
}
