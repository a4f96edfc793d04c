use anyhow::Result;
use rusqlite::Row;

use crate::catalog::product_info_from_row;
use crate::models::{OrderItemRow, OrderRow};
use crate::queries::contact_from_row;
use crate::{Database, OptionalExt, placeholders};

/// Which orders a listing returns.
#[derive(Debug, Clone, Copy)]
pub enum OrderScope {
    /// The user's open basket (zero or one order)
    Basket { user_id: i64 },
    /// Orders the user has placed
    PlacedBy { user_id: i64 },
    /// Placed orders containing at least one listing of the partner's shop
    ForShopOwner { user_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Placed,
    OrderNotFound,
    NotInBasket,
    ContactNotFound,
    EmptyBasket,
}

const ORDER_SELECT: &str = "
    SELECT o.id, o.dt, o.status,
           c.id, c.city, c.street, c.house, c.structure, c.building, c.apartment, c.phone
    FROM orders o
    LEFT JOIN contacts c ON c.id = o.contact_id";

impl Database {
    // -- Basket --

    pub fn find_basket(&self, user_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM orders WHERE user_id = ?1 AND status = 'basket'",
                [user_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// The user's basket id, creating the basket on first use.
    pub fn get_or_create_basket(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO orders (user_id, status)
                 SELECT ?1, 'basket'
                 WHERE NOT EXISTS (SELECT 1 FROM orders WHERE user_id = ?1 AND status = 'basket')",
                [user_id],
            )?;
            let id = conn.query_row(
                "SELECT id FROM orders WHERE user_id = ?1 AND status = 'basket'",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    /// Inserts all lines or none. A listing already in the basket, an unknown
    /// listing or a non-positive quantity is a constraint violation.
    pub fn add_basket_items(&self, basket_id: i64, items: &[(i64, i64)]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for (product_info_id, quantity) in items {
                tx.execute(
                    "INSERT INTO order_items (order_id, product_info_id, quantity) VALUES (?1, ?2, ?3)",
                    [basket_id, *product_info_id, *quantity],
                )?;
            }
            tx.commit()?;
            Ok(items.len())
        })
    }

    /// Overwrites quantities of lines in the basket; unknown ids are skipped.
    pub fn update_basket_quantities(&self, basket_id: i64, updates: &[(i64, i64)]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;
            for (item_id, quantity) in updates {
                updated += tx.execute(
                    "UPDATE order_items SET quantity = ?3 WHERE id = ?2 AND order_id = ?1",
                    [basket_id, *item_id, *quantity],
                )?;
            }
            tx.commit()?;
            Ok(updated)
        })
    }

    pub fn delete_basket_items(&self, basket_id: i64, item_ids: &[i64]) -> Result<usize> {
        if item_ids.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "DELETE FROM order_items WHERE order_id = ?1 AND id IN ({})",
                placeholders(1, item_ids.len())
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&basket_id];
            params.extend(item_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));
            Ok(conn.execute(&sql, params.as_slice())?)
        })
    }

    // -- Orders --

    /// Moves a basket to `new` with a delivery contact attached.
    pub fn place_order(&self, user_id: i64, order_id: i64, contact_id: i64) -> Result<PlaceOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM orders WHERE id = ?1 AND user_id = ?2",
                    [order_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            match status.as_deref() {
                None => return Ok(PlaceOutcome::OrderNotFound),
                Some("basket") => {}
                Some(_) => return Ok(PlaceOutcome::NotInBasket),
            }

            let contact_owned: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM contacts WHERE id = ?1 AND user_id = ?2)",
                [contact_id, user_id],
                |row| row.get(0),
            )?;
            if !contact_owned {
                return Ok(PlaceOutcome::ContactNotFound);
            }

            let lines: i64 = tx.query_row(
                "SELECT COUNT(*) FROM order_items WHERE order_id = ?1",
                [order_id],
                |row| row.get(0),
            )?;
            if lines == 0 {
                return Ok(PlaceOutcome::EmptyBasket);
            }

            tx.execute(
                "UPDATE orders SET status = 'new', contact_id = ?2, dt = datetime('now') WHERE id = ?1",
                [order_id, contact_id],
            )?;
            tx.commit()?;
            Ok(PlaceOutcome::Placed)
        })
    }

    /// Orders in scope, newest first.
    pub fn list_orders(&self, scope: OrderScope) -> Result<Vec<OrderRow>> {
        let (filter, user_id) = match scope {
            OrderScope::Basket { user_id } => ("o.user_id = ?1 AND o.status = 'basket'", user_id),
            OrderScope::PlacedBy { user_id } => ("o.user_id = ?1 AND o.status <> 'basket'", user_id),
            OrderScope::ForShopOwner { user_id } => (
                "o.status <> 'basket' AND EXISTS (
                    SELECT 1 FROM order_items oi
                    JOIN product_infos pi ON pi.id = oi.product_info_id
                    JOIN shops s ON s.id = pi.shop_id
                    WHERE oi.order_id = o.id AND s.user_id = ?1)",
                user_id,
            ),
        };

        self.with_conn(|conn| {
            let sql = format!("{} WHERE {} ORDER BY o.dt DESC, o.id DESC", ORDER_SELECT, filter);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], order_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch lines for a set of orders, with listing details.
    pub fn list_order_items(&self, order_ids: &[i64]) -> Result<Vec<OrderItemRow>> {
        if order_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT oi.id, oi.order_id, oi.quantity,
                        pi.id, pi.model, pi.external_id, p.name, c.name, pi.shop_id, pi.quantity, pi.price, pi.price_rrc
                 FROM order_items oi
                 JOIN product_infos pi ON pi.id = oi.product_info_id
                 JOIN products p ON p.id = pi.product_id
                 JOIN categories c ON c.id = p.category_id
                 WHERE oi.order_id IN ({})
                 ORDER BY oi.id",
                placeholders(0, order_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = order_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(OrderItemRow {
                        id: row.get(0)?,
                        order_id: row.get(1)?,
                        quantity: row.get(2)?,
                        product_info: product_info_from_row(row, 3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<OrderRow> {
    let contact_id: Option<i64> = row.get(3)?;
    let contact = match contact_id {
        Some(_) => Some(contact_from_row(row, 3)?),
        None => None,
    };

    Ok(OrderRow {
        id: row.get(0)?,
        dt: row.get(1)?,
        status: row.get(2)?,
        contact,
    })
}
