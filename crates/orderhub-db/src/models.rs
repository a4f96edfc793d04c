/// SQLite row types, kept separate from the orderhub-types API models.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    pub user_type: String,
    pub is_active: bool,
}

pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
    pub user_type: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
}

pub struct ContactRow {
    pub id: i64,
    pub city: String,
    pub street: String,
    pub house: String,
    pub structure: String,
    pub building: String,
    pub apartment: String,
    pub phone: String,
}

pub struct NewContact {
    pub city: String,
    pub street: String,
    pub house: String,
    pub structure: String,
    pub building: String,
    pub apartment: String,
    pub phone: String,
}

#[derive(Default)]
pub struct ContactChanges {
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: Option<String>,
}

pub struct ShopRow {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub status: bool,
}

pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

/// A product listing joined with its product, category and shop.
pub struct ProductInfoRow {
    pub id: i64,
    pub model: String,
    pub external_id: i64,
    pub product_name: String,
    pub category_name: String,
    pub shop_id: i64,
    pub quantity: i64,
    pub price: i64,
    pub price_rrc: i64,
}

pub struct ParameterRow {
    pub product_info_id: i64,
    pub name: String,
    pub value: String,
}

pub struct OrderRow {
    pub id: i64,
    pub dt: String,
    pub status: String,
    pub contact: Option<ContactRow>,
}

pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub quantity: i64,
    pub product_info: ProductInfoRow,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub shop_id: i64,
    pub categories: usize,
    pub goods: usize,
    pub parameters: usize,
}
