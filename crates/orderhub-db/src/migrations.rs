use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                first_name  TEXT NOT NULL DEFAULT '',
                last_name   TEXT NOT NULL DEFAULT '',
                company     TEXT NOT NULL DEFAULT '',
                position    TEXT NOT NULL DEFAULT '',
                user_type   TEXT NOT NULL CHECK (user_type IN ('buyer', 'shop')),
                is_active   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE shops (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                url         TEXT,
                user_id     INTEGER UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                status      INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL
            );

            CREATE TABLE category_shops (
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                shop_id     INTEGER NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
                PRIMARY KEY (category_id, shop_id)
            );

            CREATE TABLE products (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_products_name_category ON products(name, category_id);

            CREATE TABLE product_infos (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                model       TEXT NOT NULL DEFAULT '',
                external_id INTEGER NOT NULL CHECK (external_id >= 0),
                product_id  INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                shop_id     INTEGER NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
                quantity    INTEGER NOT NULL CHECK (quantity >= 0),
                price       INTEGER NOT NULL CHECK (price >= 0),
                price_rrc   INTEGER NOT NULL CHECK (price_rrc >= 0),
                UNIQUE (product_id, shop_id, external_id)
            );

            CREATE INDEX idx_product_infos_shop ON product_infos(shop_id);

            CREATE TABLE parameters (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE
            );

            CREATE TABLE product_parameters (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                product_info_id INTEGER NOT NULL REFERENCES product_infos(id) ON DELETE CASCADE,
                parameter_id    INTEGER NOT NULL REFERENCES parameters(id) ON DELETE CASCADE,
                value           TEXT NOT NULL
            );

            CREATE INDEX idx_product_parameters_info ON product_parameters(product_info_id);

            CREATE TABLE contacts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                city        TEXT NOT NULL,
                street      TEXT NOT NULL,
                house       TEXT NOT NULL DEFAULT '',
                structure   TEXT NOT NULL DEFAULT '',
                building    TEXT NOT NULL DEFAULT '',
                apartment   TEXT NOT NULL DEFAULT '',
                phone       TEXT NOT NULL
            );

            CREATE TABLE orders (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                dt          TEXT NOT NULL DEFAULT (datetime('now')),
                status      TEXT NOT NULL CHECK (status IN
                                ('basket', 'new', 'confirmed', 'assembled', 'sent', 'delivered', 'canceled')),
                contact_id  INTEGER REFERENCES contacts(id) ON DELETE SET NULL
            );

            -- One open basket per user
            CREATE UNIQUE INDEX idx_orders_one_basket ON orders(user_id) WHERE status = 'basket';

            CREATE TABLE order_items (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id        INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                product_info_id INTEGER NOT NULL REFERENCES product_infos(id) ON DELETE CASCADE,
                quantity        INTEGER NOT NULL CHECK (quantity > 0),
                UNIQUE (order_id, product_info_id)
            );

            CREATE TABLE email_confirm_tokens (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                key_digest  TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE password_reset_tokens (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                key_digest  TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
