// Repair-category analytics over a filtered set of works
//
// Every (work, repair type) pair counts once towards its category, so a
// work with two repair types in one category adds 2 to the count and twice
// its cost to the revenue. Category sums can therefore exceed the total
// revenue when works carry several repair types.

use crate::models::WorkRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

/// Count and revenue of one repair type inside a category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairTypeBreakdown {
    pub repair_type_id: Uuid,
    pub name: String,
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

/// Statistics of one repair category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category_id: Uuid,
    pub name: String,
    pub color: String,
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    /// Revenue per counted repair, rounded to 2 digits
    #[serde(with = "rust_decimal::serde::float")]
    pub average: Decimal,
    /// Percentage of the total revenue, rounded to 2 digits
    #[serde(with = "rust_decimal::serde::float")]
    pub share: Decimal,
    pub repair_types: Vec<RepairTypeBreakdown>,
}

/// Aggregated view of a set of works
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkSummary {
    pub total_works: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_revenue_per_work: Decimal,
    /// Categories in order of first appearance
    pub categories: Vec<CategorySummary>,
    pub by_count: Vec<CategorySummary>,
    pub by_revenue: Vec<CategorySummary>,
    pub by_average: Vec<CategorySummary>,
}

/// Build the category summary for `works`
///
/// Empty input yields zeros and empty lists.
pub fn summarize(works: &[WorkRecord]) -> WorkSummary {
    let total_works = works.len() as u64;
    let total_revenue: Decimal = works.iter().map(|work| work.cost).sum();
    let avg_revenue_per_work = if total_works == 0 {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(total_works)).round_dp(2)
    };

    let mut categories: Vec<CategorySummary> = Vec::new();
    for work in works {
        for detail in &work.repair_types {
            let existing = categories
                .iter()
                .position(|c| c.category_id == detail.category.id);
            let index = match existing {
                Some(index) => index,
                None => {
                    categories.push(CategorySummary {
                        category_id: detail.category.id,
                        name: detail.category.name.clone(),
                        color: detail.category.color.clone(),
                        count: 0,
                        revenue: Decimal::ZERO,
                        average: Decimal::ZERO,
                        share: Decimal::ZERO,
                        repair_types: Vec::new(),
                    });
                    categories.len() - 1
                }
            };

            let category = &mut categories[index];
            category.count += 1;
            category.revenue += work.cost;

            let repair_type = &detail.repair_type;
            match category
                .repair_types
                .iter_mut()
                .find(|b| b.repair_type_id == repair_type.id)
            {
                Some(breakdown) => {
                    breakdown.count += 1;
                    breakdown.revenue += work.cost;
                }
                None => category.repair_types.push(RepairTypeBreakdown {
                    repair_type_id: repair_type.id,
                    name: repair_type.name.clone(),
                    count: 1,
                    revenue: work.cost,
                }),
            }
        }
    }

    for category in &mut categories {
        category.average = (category.revenue / Decimal::from(category.count)).round_dp(2);
        category.share = if total_revenue.is_zero() {
            Decimal::ZERO
        } else {
            (category.revenue / total_revenue * Decimal::ONE_HUNDRED).round_dp(2)
        };
    }

    WorkSummary {
        total_works,
        total_revenue,
        avg_revenue_per_work,
        by_count: ranked(&categories, |a, b| b.count.cmp(&a.count)),
        by_revenue: ranked(&categories, |a, b| b.revenue.cmp(&a.revenue)),
        by_average: ranked(&categories, |a, b| b.average.cmp(&a.average)),
        categories,
    }
}

/// Stable sort of a copy, so ties keep first-seen order
fn ranked<F>(categories: &[CategorySummary], compare: F) -> Vec<CategorySummary>
where
    F: FnMut(&CategorySummary, &CategorySummary) -> Ordering,
{
    let mut sorted = categories.to_vec();
    sorted.sort_by(compare);
    sorted
}
