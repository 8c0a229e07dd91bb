use std::collections::HashSet;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// Empty optional text is stored as NULL, so it reads back as absent
// whichever file or database it came from.
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "nazwa")]
    pub name: String,
    #[serde(rename = "opis", default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(rename = "nazwa")]
    pub name: String,
    #[serde(rename = "opis", default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(rename = "cena")]
    pub price: f64,
    #[serde(rename = "stan_magazynowy")]
    pub stock_quantity: u32,
    #[serde(rename = "kategoria_id")]
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    #[serde(rename = "imie")]
    pub first_name: String,
    #[serde(rename = "nazwisko")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "telefon", default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(rename = "adres", default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "nowe")]
    New,
    #[serde(rename = "w_realizacji")]
    InProgress,
    #[serde(rename = "zrealizowane")]
    Fulfilled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Fulfilled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "nowe",
            OrderStatus::InProgress => "w_realizacji",
            OrderStatus::Fulfilled => "zrealizowane",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(rename = "klient_id")]
    pub customer_id: i64,
    #[serde(rename = "data_zamowienia")]
    pub order_date: NaiveDate,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "przelew")]
    BankTransfer,
    #[serde(rename = "karta")]
    Card,
    #[serde(rename = "gotowka")]
    Cash,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::BankTransfer,
        PaymentMethod::Card,
        PaymentMethod::Cash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "przelew",
            PaymentMethod::Card => "karta",
            PaymentMethod::Cash => "gotowka",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    #[serde(rename = "zamowienie_id")]
    pub order_id: i64,
    #[serde(rename = "kwota")]
    pub amount: f64,
    #[serde(rename = "metoda_platnosci")]
    pub payment_method: PaymentMethod,
    #[serde(rename = "data_platnosci")]
    pub payment_date: NaiveDate,
}

/// The hand-authored part of the dataset. This is exactly what the JSON
/// interchange document carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "kategorie")]
    pub categories: Vec<Category>,
    #[serde(rename = "produkty")]
    pub products: Vec<Product>,
    #[serde(rename = "klienci")]
    pub customers: Vec<Customer>,
}

/// Randomised orders and their payments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub orders: Vec<Order>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub catalog: Catalog,
    pub activity: Activity,
}

impl Dataset {
    pub fn row_count(&self, table: Table) -> usize {
        match table {
            Table::Categories => self.catalog.categories.len(),
            Table::Products => self.catalog.products.len(),
            Table::Customers => self.catalog.customers.len(),
            Table::Orders => self.activity.orders.len(),
            Table::Payments => self.activity.payments.len(),
        }
    }

    /// Checks the invariants the schema relies on, including that every
    /// foreign key points at a record of the same dataset.
    pub fn validate(&self) -> Result<()> {
        let Catalog {
            categories,
            products,
            customers,
        } = &self.catalog;
        let Activity { orders, payments } = &self.activity;

        let mut category_ids = HashSet::new();
        for c in categories {
            if c.name.trim().is_empty() {
                bail!("category {} has an empty name", c.id);
            }
            if !category_ids.insert(c.id) {
                bail!("duplicate category id {}", c.id);
            }
        }

        let mut product_ids = HashSet::new();
        for p in products {
            if p.name.trim().is_empty() {
                bail!("product {} has an empty name", p.id);
            }
            if !(p.price >= 0.0) {
                bail!("product {} has a negative price {}", p.id, p.price);
            }
            if let Some(category_id) = p.category_id {
                if !category_ids.contains(&category_id) {
                    bail!("product {} references unknown category {}", p.id, category_id);
                }
            }
            if !product_ids.insert(p.id) {
                bail!("duplicate product id {}", p.id);
            }
        }

        let mut customer_ids = HashSet::new();
        let mut emails = HashSet::new();
        for c in customers {
            if c.email.trim().is_empty() {
                bail!("customer {} has an empty email", c.id);
            }
            if !emails.insert(c.email.as_str()) {
                bail!("duplicate customer email {}", c.email);
            }
            if !customer_ids.insert(c.id) {
                bail!("duplicate customer id {}", c.id);
            }
        }

        let mut order_dates = std::collections::HashMap::new();
        for o in orders {
            if !customer_ids.contains(&o.customer_id) {
                bail!("order {} references unknown customer {}", o.id, o.customer_id);
            }
            if order_dates.insert(o.id, o.order_date).is_some() {
                bail!("duplicate order id {}", o.id);
            }
        }

        let mut payment_ids = HashSet::new();
        for p in payments {
            let Some(order_date) = order_dates.get(&p.order_id) else {
                bail!("payment {} references unknown order {}", p.id, p.order_id);
            };
            if !(p.amount > 0.0) {
                bail!("payment {} has a non-positive amount {}", p.id, p.amount);
            }
            if p.payment_date < *order_date {
                bail!(
                    "payment {} is dated {} before its order date {}",
                    p.id,
                    p.payment_date,
                    order_date
                );
            }
            if !payment_ids.insert(p.id) {
                bail!("duplicate payment id {}", p.id);
            }
        }

        Ok(())
    }
}

/// The five seeded tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Categories,
    Products,
    Customers,
    Orders,
    Payments,
}

impl Table {
    /// Parents before children.
    pub const INSERT_ORDER: [Table; 5] = [
        Table::Categories,
        Table::Customers,
        Table::Products,
        Table::Orders,
        Table::Payments,
    ];

    /// Children before parents.
    pub const DELETE_ORDER: [Table; 5] = [
        Table::Payments,
        Table::Orders,
        Table::Products,
        Table::Customers,
        Table::Categories,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Categories => "kategorie",
            Table::Products => "produkty",
            Table::Customers => "klienci",
            Table::Orders => "zamowienia",
            Table::Payments => "platnosci",
        }
    }

    /// Column names in declaration order. CSV headers and COPY column lists
    /// both follow this order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Categories => &["id", "nazwa", "opis"],
            Table::Products => &[
                "id",
                "nazwa",
                "opis",
                "cena",
                "stan_magazynowy",
                "kategoria_id",
            ],
            Table::Customers => &["id", "imie", "nazwisko", "email", "telefon", "adres"],
            Table::Orders => &["id", "klient_id", "data_zamowienia", "status"],
            Table::Payments => &[
                "id",
                "zamowienie_id",
                "kwota",
                "metoda_platnosci",
                "data_platnosci",
            ],
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Table::Categories => "kategorie.csv",
            Table::Products => "produkty.csv",
            Table::Customers => "klienci.csv",
            Table::Orders => "zamowienia.csv",
            Table::Payments => "platnosci.csv",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
