// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture records seeded into a fresh local store.

use std::collections::BTreeMap;

use leadflow_core::{Branch, Product, Role, User};

/// A fixture account together with its initial plaintext password.
pub struct FixtureUser {
    pub user: User,
    pub password: &'static str,
}

fn user(
    id: &str,
    username: &str,
    role: Role,
    name: &str,
    branch_id: Option<&str>,
    password: &'static str,
) -> FixtureUser {
    FixtureUser {
        user: User {
            id: id.into(),
            username: username.into(),
            role,
            name: name.into(),
            branch_id: branch_id.map(Into::into),
            password: None,
            password_last_changed: None,
        },
        password,
    }
}

pub fn users() -> Vec<FixtureUser> {
    vec![
        user("u1", "owner", Role::Owner, "Store Owner", None, "owner123"),
        user("u2", "krishnagiri.admin", Role::BranchAdmin, "Meena K", Some("b1"), "admin123"),
        user("u3", "krishnagiri.caller", Role::Caller, "Arun S", Some("b1"), "caller123"),
        user("u4", "hosur.admin", Role::BranchAdmin, "Divya R", Some("b4"), "admin123"),
        user("u5", "hosur.caller", Role::Caller, "Karthik P", Some("b4"), "caller123"),
    ]
}

fn branch(id: &str, name: &str, location: &str, contact_number: &str) -> Branch {
    Branch {
        id: id.into(),
        name: name.into(),
        location: location.into(),
        contact_number: contact_number.into(),
        active: true,
    }
}

pub fn branches() -> Vec<Branch> {
    vec![
        branch("b1", "Krishnagiri", "Bengaluru Road, Krishnagiri", "04343-220011"),
        branch("b2", "Dharmapuri", "Salem Main Road, Dharmapuri", "04342-230022"),
        branch("b3", "Salem", "Omalur Road, Salem", "0427-2440033"),
        branch("b4", "Hosur", "Bagalur Road, Hosur", "04344-250044"),
    ]
}

fn tamil(text: &str) -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from([("ta".to_string(), text.to_string())]))
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: &str,
    sku: &str,
    name: &str,
    name_ta: &str,
    category: &str,
    description: &str,
    price_min: f64,
    price_max: f64,
    specifications: &[(&str, &str)],
) -> Product {
    Product {
        id: id.into(),
        sku: sku.into(),
        name: name.into(),
        category: category.into(),
        description: description.into(),
        name_localized: tamil(name_ta),
        category_localized: None,
        description_localized: None,
        price_min,
        price_max,
        active: true,
        branch_id: None,
        specifications: (!specifications.is_empty()).then(|| {
            specifications
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }),
    }
}

pub fn products() -> Vec<Product> {
    vec![
        product(
            "p1",
            "PW-P-001",
            "Power Weeder 7HP",
            "பவர் வீடர் 7HP",
            "Power Weeder",
            "Petrol power weeder for inter-row cultivation",
            42_000.0,
            48_000.0,
            &[("engine", "7 HP petrol"), ("tilling_width", "36 in")],
        ),
        product(
            "p2",
            "PW-P-002",
            "Power Weeder 9HP Diesel",
            "பவர் வீடர் 9HP டீசல்",
            "Power Weeder",
            "Diesel power weeder for heavy soil",
            58_000.0,
            65_000.0,
            &[("engine", "9 HP diesel")],
        ),
        product(
            "p3",
            "BC-P-010",
            "Brush Cutter 2-Stroke",
            "பிரஷ் கட்டர்",
            "Brush Cutter",
            "Side-pack brush cutter for grass and weeds",
            12_500.0,
            16_000.0,
            &[],
        ),
        product(
            "p4",
            "SP-P-020",
            "Battery Sprayer 16L",
            "பேட்டரி ஸ்ப்ரேயர்",
            "Sprayer",
            "Rechargeable knapsack sprayer",
            3_800.0,
            4_600.0,
            &[("tank", "16 L"), ("battery", "12V 8Ah")],
        ),
    ]
}

/// Whether `id` names a fixture product.
pub fn is_fixture_product(id: &str) -> bool {
    products().iter().any(|p| p.id == id)
}
