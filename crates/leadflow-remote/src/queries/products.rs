// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product insert with duplicate-SKU auto-resolution.

use leadflow_core::{LeadflowError, Product};
use tracing::info;

use crate::database::Database;
use crate::mapping::PRODUCTS;
use crate::queries;

/// SKU rewritten for a branch-scoped product whose SKU is already taken.
pub fn branch_sku(sku: &str, branch_id: &str) -> String {
    format!("{sku}-{branch_id}")
}

/// Insert a product, rewriting a colliding SKU once when the product is branch scoped.
///
/// An id collision is always a [`LeadflowError::DuplicateKey`] and is never
/// retried. A second SKU collision after the rewrite is also final.
pub async fn insert(db: &Database, product: &Product) -> Result<Product, LeadflowError> {
    let existing: Option<Product> = queries::find(db, &PRODUCTS, &product.id).await?;
    if existing.is_some() {
        return Err(LeadflowError::DuplicateKey {
            entity: PRODUCTS.entity,
            key: product.id.clone(),
        });
    }

    let conflict = match queries::try_insert(db, &PRODUCTS, product).await? {
        Ok(()) => return Ok(product.clone()),
        Err(conflict) => conflict,
    };

    let branch_id = match product.branch_id.as_deref() {
        Some(branch_id) if conflict.column == "sku" => branch_id,
        _ => return Err(conflict.into_error(&PRODUCTS)),
    };

    let renamed = Product {
        sku: branch_sku(&product.sku, branch_id),
        ..product.clone()
    };
    queries::try_insert(db, &PRODUCTS, &renamed)
        .await?
        .map_err(|conflict| conflict.into_error(&PRODUCTS))?;

    info!(
        product_id = %renamed.id,
        requested_sku = %product.sku,
        stored_sku = %renamed.sku,
        "duplicate sku resolved with branch suffix"
    );
    Ok(renamed)
}
