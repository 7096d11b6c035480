//! Presentation pipeline over raw snapshot rows.
//!
//! enrich -> filter -> rollup -> sort. Pagination is applied by the caller
//! on the sorted list. None of these stages know whether the rows came from
//! a frozen snapshot or a live computation.

use std::collections::{BTreeMap, HashMap};

use warpline_shared::types::{ProductId, SkuId};

use super::types::{
    Breakdown, Rollup, SkuMetadata, SnapshotFilter, SnapshotRow, SnapshotSummary, StockSnapshot,
};

/// Size label used on product rollup rows.
pub const ALL_SIZES: &str = "All";

/// Adds every entry of `from` into `into`, summing matching reasons.
pub fn merge_breakdown(into: &mut Breakdown, from: &Breakdown) {
    for (reason, qty) in from {
        *into.entry(reason.clone()).or_insert(0) += qty;
    }
}

/// Joins raw rows with the current catalogue metadata of their SKUs.
///
/// Metadata is whatever the catalogue says today, even for historical
/// months. A SKU with no catalogue entry keeps its row, labelled with its id.
#[must_use]
pub fn enrich(
    raw: Vec<StockSnapshot>,
    metadata: &HashMap<SkuId, SkuMetadata>,
) -> Vec<SnapshotRow> {
    raw.into_iter()
        .map(|row| {
            let meta = metadata.get(&row.sku_id);
            SnapshotRow {
                sku_id: Some(row.sku_id),
                product_id: meta.map(|m| m.product_id),
                sku_code: meta.map_or_else(|| row.sku_id.to_string(), |m| m.sku_code.clone()),
                product_name: meta.map(|m| m.product_name.clone()).unwrap_or_default(),
                color_name: meta.map(|m| m.color_name.clone()).unwrap_or_default(),
                size: meta.map(|m| m.size.clone()).unwrap_or_default(),
                category: meta.and_then(|m| m.category.clone()),
                opening_stock: row.opening_stock,
                total_inward: row.total_inward,
                total_outward: row.total_outward,
                closing_stock: row.closing_stock,
                inward_breakdown: row.inward_breakdown,
                outward_breakdown: row.outward_breakdown,
            }
        })
        .collect()
}

impl SnapshotFilter {
    /// Returns the trimmed search term, or `None` if there is nothing to search for.
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Returns true if the row passes both the search and the category filter.
    #[must_use]
    pub fn matches(&self, row: &SnapshotRow) -> bool {
        if let Some(category) = self.category.as_deref()
            && row.category.as_deref() != Some(category)
        {
            return false;
        }

        match self.search_term() {
            None => true,
            Some(term) => [&row.sku_code, &row.product_name, &row.color_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&term)),
        }
    }

    /// Keeps only the rows that match.
    #[must_use]
    pub fn apply(&self, rows: Vec<SnapshotRow>) -> Vec<SnapshotRow> {
        rows.into_iter().filter(|row| self.matches(row)).collect()
    }
}

/// Merges SKU rows into one row per product.
///
/// Quantities and breakdowns are summed. The merged row takes its colour
/// and category from the product's first SKU by code, shows `"All"` as size
/// and the product name as code. Rows without a product pass through.
#[must_use]
pub fn rollup_by_product(mut rows: Vec<SnapshotRow>) -> Vec<SnapshotRow> {
    rows.sort_by(|a, b| a.sku_code.cmp(&b.sku_code).then(a.sku_id.cmp(&b.sku_id)));

    let mut products: BTreeMap<ProductId, SnapshotRow> = BTreeMap::new();
    let mut orphans = Vec::new();

    for row in rows {
        let Some(product_id) = row.product_id else {
            orphans.push(row);
            continue;
        };

        match products.get_mut(&product_id) {
            Some(merged) => {
                merged.opening_stock += row.opening_stock;
                merged.total_inward += row.total_inward;
                merged.total_outward += row.total_outward;
                merged.closing_stock += row.closing_stock;
                merge_breakdown(&mut merged.inward_breakdown, &row.inward_breakdown);
                merge_breakdown(&mut merged.outward_breakdown, &row.outward_breakdown);
            }
            None => {
                let merged = SnapshotRow {
                    sku_id: None,
                    sku_code: row.product_name.clone(),
                    size: ALL_SIZES.to_string(),
                    ..row
                };
                products.insert(product_id, merged);
            }
        }
    }

    products.into_values().chain(orphans).collect()
}

/// Applies the requested aggregation level.
#[must_use]
pub fn apply_rollup(rows: Vec<SnapshotRow>, rollup: Rollup) -> Vec<SnapshotRow> {
    match rollup {
        Rollup::Sku => rows,
        Rollup::Product => rollup_by_product(rows),
    }
}

/// Sorts by closing stock descending, then code ascending, then id.
pub fn sort_rows(rows: &mut [SnapshotRow]) {
    rows.sort_by(|a, b| {
        b.closing_stock
            .cmp(&a.closing_stock)
            .then_with(|| a.sku_code.cmp(&b.sku_code))
            .then_with(|| a.sku_id.cmp(&b.sku_id))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
}

/// Sums a month's raw rows into one summary.
#[must_use]
pub fn summarize(rows: &[StockSnapshot], is_live: bool) -> SnapshotSummary {
    let mut summary = SnapshotSummary {
        is_live,
        ..SnapshotSummary::default()
    };

    for row in rows {
        summary.total_opening += row.opening_stock;
        summary.total_inward += row.total_inward;
        summary.total_outward += row.total_outward;
        summary.total_closing += row.closing_stock;
        summary.sku_count += 1;
        merge_breakdown(&mut summary.top_inward_reasons, &row.inward_breakdown);
        merge_breakdown(&mut summary.top_outward_reasons, &row.outward_breakdown);
    }

    summary
}
