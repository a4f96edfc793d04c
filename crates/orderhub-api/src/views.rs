//! Row-to-response conversions shared by the handlers.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use orderhub_db::Database;
use orderhub_db::models::{
    CategoryRow, ContactRow, OrderItemRow, OrderRow, ParameterRow, ProductInfoRow, ShopRow, UserRow,
};
use orderhub_db::orders::OrderScope;
use orderhub_types::models::{
    Category, Contact, Order, OrderItem, OrderStatus, Product, ProductInfo, ProductParameter, Shop,
    User, UserType,
};

pub fn contact(row: ContactRow) -> Contact {
    Contact {
        id: row.id,
        city: row.city,
        street: row.street,
        house: row.house,
        structure: row.structure,
        building: row.building,
        apartment: row.apartment,
        phone: row.phone,
    }
}

pub fn user(row: UserRow, contacts: Vec<ContactRow>) -> User {
    let user_type = row.user_type.parse().unwrap_or_else(|e| {
        warn!("Corrupt user_type on user {}: {}", row.id, e);
        UserType::Buyer
    });

    User {
        id: row.id,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        company: row.company,
        position: row.position,
        user_type,
        is_active: row.is_active,
        contacts: contacts.into_iter().map(contact).collect(),
    }
}

pub fn shop(row: ShopRow) -> Shop {
    Shop {
        id: row.id,
        name: row.name,
        url: row.url,
        status: row.status,
    }
}

pub fn category(row: CategoryRow) -> Category {
    Category {
        id: row.id,
        name: row.name,
    }
}

/// Group parameters by listing id, preserving their order.
fn parameter_map(params: Vec<ParameterRow>) -> HashMap<i64, Vec<ProductParameter>> {
    let mut map: HashMap<i64, Vec<ProductParameter>> = HashMap::new();
    for p in params {
        map.entry(p.product_info_id).or_default().push(ProductParameter {
            parameter: p.name,
            value: p.value,
        });
    }
    map
}

fn product_info(row: ProductInfoRow, params: &HashMap<i64, Vec<ProductParameter>>) -> ProductInfo {
    ProductInfo {
        id: row.id,
        model: row.model,
        external_id: row.external_id,
        product: Product {
            name: row.product_name,
            category: row.category_name,
        },
        shop: row.shop_id,
        quantity: row.quantity,
        price: row.price,
        price_rrc: row.price_rrc,
        // A listing can appear in several orders
        product_parameters: params.get(&row.id).cloned().unwrap_or_default(),
    }
}

pub fn product_infos(rows: Vec<ProductInfoRow>, params: Vec<ParameterRow>) -> Vec<ProductInfo> {
    let params = parameter_map(params);
    rows.into_iter().map(|row| product_info(row, &params)).collect()
}

pub fn orders(rows: Vec<OrderRow>, items: Vec<OrderItemRow>, params: Vec<ParameterRow>) -> Vec<Order> {
    let params = parameter_map(params);

    let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
        items_by_order.entry(item.order_id).or_default().push(OrderItem {
            id: item.id,
            product_info: product_info(item.product_info, &params),
            quantity: item.quantity,
        });
    }

    rows.into_iter()
        .map(|row| {
            let ordered_items = items_by_order.remove(&row.id).unwrap_or_default();
            let total_sum = total_sum(row.id, &ordered_items);
            let status = row.status.parse().unwrap_or_else(|e| {
                warn!("Corrupt status on order {}: {}", row.id, e);
                OrderStatus::New
            });

            Order {
                id: row.id,
                status,
                dt: parse_timestamp(&row.dt, row.id),
                total_sum,
                contact: row.contact.map(contact),
                ordered_items,
            }
        })
        .collect()
}

/// Sum of quantity times price; saturates instead of overflowing.
fn total_sum(order_id: i64, items: &[OrderItem]) -> i64 {
    let exact: i128 = items
        .iter()
        .map(|item| i128::from(item.quantity) * i128::from(item.product_info.price))
        .sum();
    i64::try_from(exact).unwrap_or_else(|_| {
        warn!("Total of order {} does not fit in i64: {}", order_id, exact);
        if exact < 0 { i64::MIN } else { i64::MAX }
    })
}

/// Orders in scope with their lines, listing details and parameters.
pub fn load_orders(db: &Database, scope: OrderScope) -> anyhow::Result<Vec<Order>> {
    let rows = db.list_orders(scope)?;
    let order_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let items = db.list_order_items(&order_ids)?;

    let mut info_ids: Vec<i64> = items.iter().map(|i| i.product_info.id).collect();
    info_ids.sort_unstable();
    info_ids.dedup();
    let params = db.get_parameters(&info_ids)?;

    Ok(orders(rows, items, params))
}

fn parse_timestamp(raw: &str, order_id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; it is UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt dt '{}' on order {}: {}", raw, order_id, e);
            DateTime::default()
        })
}
