use anyhow::Result;
use orderhub_types::catalog::CatalogDocument;
use rusqlite::{Row, Transaction};
use tracing::{debug, info};

use crate::models::{CategoryRow, ImportSummary, ParameterRow, ProductInfoRow, ShopRow};
use crate::{Database, OptionalExt, placeholders};

const PRODUCT_INFO_SELECT: &str = "
    SELECT pi.id, pi.model, pi.external_id, p.name, c.name, pi.shop_id, pi.quantity, pi.price, pi.price_rrc
    FROM product_infos pi
    JOIN products p ON p.id = pi.product_id
    JOIN categories c ON c.id = p.category_id
    JOIN shops s ON s.id = pi.shop_id";

/// Filters for the public product listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProductFilter {
    pub shop_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl Database {
    // -- Partner import --

    /// Replaces the partner's whole catalog with `doc` in one transaction.
    /// On error nothing is changed.
    pub fn import_catalog(&self, user_id: i64, doc: &CatalogDocument) -> Result<ImportSummary> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let shop_id = upsert_shop(&tx, user_id, &doc.shop)?;
            let mut summary = ImportSummary {
                shop_id,
                ..Default::default()
            };

            for category in &doc.categories {
                tx.execute(
                    "INSERT INTO categories (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
                    rusqlite::params![category.id, category.name],
                )?;
                tx.execute(
                    "INSERT OR IGNORE INTO category_shops (category_id, shop_id) VALUES (?1, ?2)",
                    [category.id, shop_id],
                )?;
                summary.categories += 1;
            }

            let removed = tx.execute("DELETE FROM product_infos WHERE shop_id = ?1", [shop_id])?;
            debug!("Removed {} previous listings of shop {}", removed, shop_id);

            for good in &doc.goods {
                let product_id = get_or_create_product(&tx, &good.name, good.category)?;
                tx.execute(
                    "INSERT INTO product_infos (product_id, external_id, model, price, price_rrc, quantity, shop_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        product_id,
                        good.id,
                        good.model,
                        good.price,
                        good.price_rrc,
                        good.quantity,
                        shop_id,
                    ],
                )?;
                let product_info_id = tx.last_insert_rowid();

                for (name, value) in &good.parameters {
                    let parameter_id = get_or_create_parameter(&tx, name)?;
                    tx.execute(
                        "INSERT INTO product_parameters (product_info_id, parameter_id, value) VALUES (?1, ?2, ?3)",
                        rusqlite::params![product_info_id, parameter_id, value.to_string()],
                    )?;
                    summary.parameters += 1;
                }
                summary.goods += 1;
            }

            tx.commit()?;
            info!(
                "Imported catalog of shop {} ({} categories, {} goods)",
                shop_id, summary.categories, summary.goods
            );
            Ok(summary)
        })
    }

    // -- Shops --

    pub fn get_shop_by_user(&self, user_id: i64) -> Result<Option<ShopRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, url, status FROM shops WHERE user_id = ?1",
                [user_id],
                shop_from_row,
            )
            .optional()
        })
    }

    /// Returns false when the user has no shop yet.
    pub fn set_shop_status(&self, user_id: i64, open: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE shops SET status = ?2 WHERE user_id = ?1",
                rusqlite::params![user_id, open],
            )?;
            Ok(updated > 0)
        })
    }

    /// Shops currently accepting orders.
    pub fn list_open_shops(&self) -> Result<Vec<ShopRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, url, status FROM shops WHERE status = 1 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], shop_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Product listings --

    /// Listings of open shops, optionally narrowed to one shop or category.
    pub fn list_product_infos(&self, filter: ProductFilter) -> Result<Vec<ProductInfoRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE s.status = 1
                   AND (?1 IS NULL OR pi.shop_id = ?1)
                   AND (?2 IS NULL OR p.category_id = ?2)
                 ORDER BY pi.id",
                PRODUCT_INFO_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![filter.shop_id, filter.category_id], |row| {
                    product_info_from_row(row, 0)
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The listing's shop status, or None if the listing does not exist.
    pub fn product_info_shop_open(&self, product_info_id: i64) -> Result<Option<bool>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT s.status FROM product_infos pi JOIN shops s ON s.id = pi.shop_id WHERE pi.id = ?1",
                [product_info_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Batch-fetch parameters for a set of listings.
    pub fn get_parameters(&self, product_info_ids: &[i64]) -> Result<Vec<ParameterRow>> {
        if product_info_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT pp.product_info_id, p.name, pp.value
                 FROM product_parameters pp
                 JOIN parameters p ON p.id = pp.parameter_id
                 WHERE pp.product_info_id IN ({})
                 ORDER BY pp.id",
                placeholders(0, product_info_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = product_info_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ParameterRow {
                        product_info_id: row.get(0)?,
                        name: row.get(1)?,
                        value: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

/// The partner's shop, created on first import and renamed on later ones.
fn upsert_shop(tx: &Transaction<'_>, user_id: i64, name: &str) -> Result<i64> {
    let existing: Option<(i64, String)> = tx
        .query_row(
            "SELECT id, name FROM shops WHERE user_id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match existing {
        Some((id, current)) => {
            if current != name {
                tx.execute(
                    "UPDATE shops SET name = ?2 WHERE id = ?1",
                    rusqlite::params![id, name],
                )?;
            }
            Ok(id)
        }
        None => {
            tx.execute(
                "INSERT INTO shops (name, user_id) VALUES (?1, ?2)",
                rusqlite::params![name, user_id],
            )?;
            Ok(tx.last_insert_rowid())
        }
    }
}

fn get_or_create_product(tx: &Transaction<'_>, name: &str, category_id: i64) -> Result<i64> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM products WHERE name = ?1 AND category_id = ?2",
            rusqlite::params![name, category_id],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO products (name, category_id) VALUES (?1, ?2)",
        rusqlite::params![name, category_id],
    )?;
    Ok(tx.last_insert_rowid())
}

fn get_or_create_parameter(tx: &Transaction<'_>, name: &str) -> Result<i64> {
    tx.execute("INSERT OR IGNORE INTO parameters (name) VALUES (?1)", [name])?;
    let id = tx.query_row("SELECT id FROM parameters WHERE name = ?1", [name], |row| row.get(0))?;
    Ok(id)
}

fn shop_from_row(row: &Row<'_>) -> rusqlite::Result<ShopRow> {
    Ok(ShopRow {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        status: row.get(3)?,
    })
}

/// Reads `PRODUCT_INFO_SELECT` columns starting at `start`.
pub(crate) fn product_info_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<ProductInfoRow> {
    Ok(ProductInfoRow {
        id: row.get(start)?,
        model: row.get(start + 1)?,
        external_id: row.get(start + 2)?,
        product_name: row.get(start + 3)?,
        category_name: row.get(start + 4)?,
        shop_id: row.get(start + 5)?,
        quantity: row.get(start + 6)?,
        price: row.get(start + 7)?,
        price_rrc: row.get(start + 8)?,
    })
}
