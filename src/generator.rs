//! Sample data for the tackle shop.
//!
//! The catalog and customer list are fixed; orders and payments are drawn
//! from the supplied RNG, so a seeded RNG reproduces a run exactly.

use std::ops::RangeInclusive;

use chrono::{Duration, NaiveDate};
use clap::ValueEnum;
use rand::Rng;

use crate::model::{
    Activity, Catalog, Category, Customer, Dataset, Order, OrderStatus, Payment, PaymentMethod,
    Product,
};

const CATEGORIES: [(&str, &str); 7] = [
    ("Wędki", "Wędki wędkarskie"),
    ("Przynęty", "Przynęty i zanęty"),
    ("Akcesoria", "Akcesoria wędkarskie"),
    ("Odzież", "Odzież wędkarska i obuwie"),
    ("Elektronika", "Echosondy i GPS"),
    ("Łodzie", "Łodzie i pontony wędkarskie"),
    ("Narzędzia", "Narzędzia i sprzęt do konserwacji"),
];

// name, description, price, stock, category id
const PRODUCTS: [(&str, &str, f64, u32, i64); 12] = [
    ("Wędka muchowa Master", "Profesjonalna wędka do muchowania", 299.99, 15, 1),
    ("Kołowrotek spinningowy", "Kołowrotek do spinningu", 149.90, 20, 1),
    ("Mocny sznurek wędkarski", "Nieprzemakalny sznurek wędkarski", 29.99, 30, 3),
    ("Żyłka fluorowa", "Żyłka fluorowa o wysokiej jakości", 39.99, 25, 3),
    ("Mucha dry", "Ręcznie wykonana mucha dry", 14.99, 40, 2),
    ("Woblery zestaw", "Zestaw woblerów na drapieżniki", 79.99, 50, 2),
    ("Podbierak teleskopowy", "Lekki podbierak z długą rączką", 89.00, 10, 3),
    ("Kurtka przeciwdeszczowa", "Wodoodporna kurtka dla wędkarzy", 199.00, 12, 4),
    ("Echosonda Deeper", "Inteligentna echosonda do smartfona", 499.00, 5, 5),
    ("Plecak wędkarski", "Pojemny plecak na akcesoria", 120.00, 18, 3),
    ("Ponton Explorer 200", "Dwuosobowy ponton z wiosłami", 750.00, 3, 6),
    ("Zestaw naprawczy wędki", "Kompletny zestaw do naprawy wędek", 45.00, 25, 7),
];

// first name, last name, email, phone, address
const CUSTOMERS: [(&str, &str, &str, &str, &str); 7] = [
    ("Jan", "Kowalski", "jan.kowalski@email.pl", "123456789", "ul. Gdańska 1"),
    ("Anna", "Wiśniewska", "anna.wisniewska@email.pl", "987654321", "ul. Krakowska 2"),
    ("Piotr", "Nowak", "piotr.nowak@email.pl", "555666777", "ul. Warszawska 3"),
    ("Maria", "Zając", "maria.zajac@email.pl", "111222333", "ul. Poznańska 4"),
    ("Krzysztof", "Lewandowski", "krzysztof.l@email.pl", "444555666", "ul. Wrocławska 5"),
    ("Ewa", "Dąbrowska", "ewa.d@email.pl", "777888999", "ul. Łódzka 6"),
    ("Tomasz", "Wójcik", "tomasz.w@email.pl", "222333444", "ul. Katowicka 7"),
];

/// Generation presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Full catalog, 2-4 orders per customer spread over the past year
    Full,
    /// Reduced catalog, 3-5 orders per customer placed today
    Compact,
}

impl Profile {
    pub fn category_count(&self) -> usize {
        match self {
            Profile::Full => 7,
            Profile::Compact => 5,
        }
    }

    pub fn product_count(&self) -> usize {
        match self {
            Profile::Full => 12,
            Profile::Compact => 10,
        }
    }

    pub fn customer_count(&self) -> usize {
        match self {
            Profile::Full => 7,
            Profile::Compact => 5,
        }
    }

    pub fn orders_per_customer(&self) -> RangeInclusive<u32> {
        match self {
            Profile::Full => 2..=4,
            Profile::Compact => 3..=5,
        }
    }

    /// How many days before `today` an order may be placed.
    pub fn order_age_days(&self) -> RangeInclusive<i64> {
        match self {
            Profile::Full => 1..=365,
            Profile::Compact => 0..=0,
        }
    }

    /// How many days after its order a payment may arrive.
    pub fn payment_delay_days(&self) -> RangeInclusive<i64> {
        match self {
            Profile::Full => 0..=7,
            Profile::Compact => 0..=0,
        }
    }

    pub fn amount_cents(&self) -> RangeInclusive<u32> {
        match self {
            Profile::Full => 5_000..=100_000,
            Profile::Compact => 5_000..=50_000,
        }
    }
}

pub fn generate<R: Rng>(profile: Profile, today: NaiveDate, rng: &mut R) -> Dataset {
    let catalog = catalog(profile);
    let activity = activity(profile, &catalog.customers, today, rng);
    Dataset { catalog, activity }
}

fn catalog(profile: Profile) -> Catalog {
    let categories = CATEGORIES
        .iter()
        .take(profile.category_count())
        .zip(1..)
        .map(|(&(name, description), id)| Category {
            id,
            name: name.to_string(),
            description: Some(description.to_string()),
        })
        .collect::<Vec<_>>();

    // Every product's category is part of the reduced catalog as well.
    let products = PRODUCTS
        .iter()
        .take(profile.product_count())
        .zip(1..)
        .map(
            |(&(name, description, price, stock_quantity, category_id), id)| Product {
                id,
                name: name.to_string(),
                description: Some(description.to_string()),
                price,
                stock_quantity,
                category_id: Some(category_id),
            },
        )
        .collect();

    let customers = CUSTOMERS
        .iter()
        .take(profile.customer_count())
        .zip(1..)
        .map(
            |(&(first_name, last_name, email, phone, address), id)| Customer {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                phone: Some(phone.to_string()),
                address: Some(address.to_string()),
            },
        )
        .collect();

    Catalog {
        categories,
        products,
        customers,
    }
}

fn activity<R: Rng>(
    profile: Profile,
    customers: &[Customer],
    today: NaiveDate,
    rng: &mut R,
) -> Activity {
    let mut orders = Vec::new();
    let mut payments = Vec::new();
    let mut next_id = 1;

    for customer in customers {
        let count = rng.random_range(profile.orders_per_customer());
        for _ in 0..count {
            let order_date = today - Duration::days(rng.random_range(profile.order_age_days()));
            let status = OrderStatus::ALL[rng.random_range(0..OrderStatus::ALL.len())];
            orders.push(Order {
                id: next_id,
                customer_id: customer.id,
                order_date,
                status,
            });

            let cents = rng.random_range(profile.amount_cents());
            let payment_method = PaymentMethod::ALL[rng.random_range(0..PaymentMethod::ALL.len())];
            let payment_date =
                order_date + Duration::days(rng.random_range(profile.payment_delay_days()));
            payments.push(Payment {
                id: next_id,
                order_id: next_id,
                amount: f64::from(cents) / 100.0,
                payment_method,
                payment_date,
            });
            next_id += 1;
        }
    }

    Activity { orders, payments }
}
