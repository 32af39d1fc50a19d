//! Pro space and customer commerce: organization, catalogue, orders, bookings.

use std::sync::Arc;

use super::{new_id, now_rfc3339, App};
use crate::models::{
    Booking, BookingDraft, BookingStatus, CatalogueDraft, CatalogueUpdate, Order, OrderDraft,
    OrderStatus, Organization, OrganizationUpdate, Product, Service,
};

impl App {
    /// The organization owned by the current user, if any.
    pub fn owned_organization(&self) -> Option<Arc<Organization>> {
        let user = self.current_user()?;
        self.mirror.organizations.find(|org| org.owner_id == user.id)
    }

    fn require_organization(&self, action: &str) -> Option<Arc<Organization>> {
        self.require_user(action)?;
        let org = self.owned_organization();
        if org.is_none() {
            tracing::debug!(action, "Ignored: current user owns no organization");
        }
        org
    }

    pub fn update_organization(&self, update: &OrganizationUpdate) -> Option<Arc<Organization>> {
        let org = self.require_organization("update_organization")?;
        self.mirror
            .organizations
            .update(&org.id, |org| update.apply(org))
    }

    // ==================== CATALOGUE ====================

    pub fn add_product(&self, draft: &CatalogueDraft) -> Option<Arc<Product>> {
        let org = self.require_organization("add_product")?;
        if draft.name.trim().is_empty() || draft.price < 0.0 {
            return None;
        }

        Some(self.mirror.products.append(Product {
            id: new_id(),
            organization_id: org.id.clone(),
            name: draft.name.trim().to_string(),
            description: draft.description.clone(),
            price: draft.price,
            stock: draft.stock,
            is_active: true,
        }))
    }

    pub fn update_product(&self, product_id: &str, update: &CatalogueUpdate) -> Option<Arc<Product>> {
        let org = self.require_organization("update_product")?;
        let product = self.mirror.products.get_by_id(product_id)?;
        if product.organization_id != org.id {
            return None;
        }
        self.mirror
            .products
            .update(product_id, |product| update.apply_product(product))
    }

    pub fn remove_product(&self, product_id: &str) -> bool {
        let Some(org) = self.require_organization("remove_product") else {
            return false;
        };
        let owned = self
            .mirror
            .products
            .get_by_id(product_id)
            .is_some_and(|p| p.organization_id == org.id);
        owned && self.mirror.products.remove(product_id)
    }

    pub fn add_service(&self, draft: &CatalogueDraft) -> Option<Arc<Service>> {
        let org = self.require_organization("add_service")?;
        if draft.name.trim().is_empty() || draft.price < 0.0 {
            return None;
        }

        Some(self.mirror.services.append(Service {
            id: new_id(),
            organization_id: org.id.clone(),
            name: draft.name.trim().to_string(),
            description: draft.description.clone(),
            price: draft.price,
            duration_minutes: draft.duration_minutes,
            is_active: true,
        }))
    }

    pub fn update_service(&self, service_id: &str, update: &CatalogueUpdate) -> Option<Arc<Service>> {
        let org = self.require_organization("update_service")?;
        let service = self.mirror.services.get_by_id(service_id)?;
        if service.organization_id != org.id {
            return None;
        }
        self.mirror
            .services
            .update(service_id, |service| update.apply_service(service))
    }

    pub fn remove_service(&self, service_id: &str) -> bool {
        let Some(org) = self.require_organization("remove_service") else {
            return false;
        };
        let owned = self
            .mirror
            .services
            .get_by_id(service_id)
            .is_some_and(|s| s.organization_id == org.id);
        owned && self.mirror.services.remove(service_id)
    }

    // ==================== ORDERS & BOOKINGS ====================

    /// Place an order; the total is computed from the items.
    pub fn place_order(&self, draft: &OrderDraft) -> Option<Arc<Order>> {
        let user = self.require_user("place_order")?;
        if draft.items.is_empty() || draft.items.iter().any(|item| item.quantity == 0) {
            return None;
        }
        self.mirror.organizations.get_by_id(&draft.organization_id)?;

        let order = self.mirror.orders.append(Order {
            id: new_id(),
            user_id: user.id,
            organization_id: draft.organization_id.clone(),
            items: draft.items.clone(),
            total: draft.total(),
            status: OrderStatus::Pending,
            created_at: now_rfc3339(),
        });
        tracing::info!(order_id = %order.id, total = order.total, "Order placed");
        Some(order)
    }

    /// Book a service; the organization is the service's.
    pub fn create_booking(&self, draft: &BookingDraft) -> Option<Arc<Booking>> {
        let user = self.require_user("create_booking")?;
        if draft.date.trim().is_empty() {
            return None;
        }
        let service = self.mirror.services.get_by_id(&draft.service_id)?;
        if !service.is_active {
            return None;
        }

        Some(self.mirror.bookings.append(Booking {
            id: new_id(),
            user_id: user.id,
            organization_id: service.organization_id.clone(),
            service_id: service.id.clone(),
            date: draft.date.trim().to_string(),
            status: BookingStatus::Pending,
            notes: draft.notes.clone(),
            created_at: now_rfc3339(),
        }))
    }

    /// Move an order received by the current user's organization.
    pub fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Option<Arc<Order>> {
        let org = self.require_organization("update_order_status")?;
        let order = self.mirror.orders.get_by_id(order_id)?;
        if order.organization_id != org.id {
            return None;
        }
        self.mirror.orders.update(order_id, |order| Order {
            status,
            ..order.clone()
        })
    }

    /// Move a booking received by the current user's organization.
    pub fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Option<Arc<Booking>> {
        let org = self.require_organization("update_booking_status")?;
        let booking = self.mirror.bookings.get_by_id(booking_id)?;
        if booking.organization_id != org.id {
            return None;
        }
        self.mirror.bookings.update(booking_id, |booking| Booking {
            status,
            ..booking.clone()
        })
    }
}
