// Fixtures shared by the property tests

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use common::models::{
    CarBrand, CarModel, RepairCategory, RepairType, RepairTypeDetail, UserSummary, WorkRecord,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn category(name: &str) -> RepairCategory {
    RepairCategory {
        id: Uuid::new_v4(),
        name: name.to_string(),
        color: "#6c757d".to_string(),
        description: String::new(),
        created_at: Utc::now(),
    }
}

pub fn repair(category: &RepairCategory, name: &str) -> RepairTypeDetail {
    RepairTypeDetail {
        repair_type: RepairType {
            id: Uuid::new_v4(),
            category_id: category.id,
            name: name.to_string(),
            description: String::new(),
            typical_duration: String::new(),
            complexity: String::new(),
            owner_id: None,
            created_at: Utc::now(),
        },
        category: category.clone(),
    }
}

pub fn work(
    brand: &str,
    model: &str,
    work_date: NaiveDate,
    cost: Decimal,
    repair_types: Vec<RepairTypeDetail>,
) -> WorkRecord {
    let brand_id = Uuid::new_v4();
    WorkRecord {
        id: Uuid::new_v4(),
        slug: common::slug::work_slug(brand, model, work_date),
        work_date,
        car_brand: CarBrand {
            id: brand_id,
            name: brand.to_string(),
            description: String::new(),
            created_at: Utc::now(),
        },
        car_model: CarModel {
            id: Uuid::new_v4(),
            brand_id,
            name: model.to_string(),
            production_years: String::new(),
            engine_options: String::new(),
            notes: String::new(),
            created_at: Utc::now(),
        },
        repair_types,
        cost,
        notes: String::new(),
        parts_used: String::new(),
        user: UserSummary {
            id: Uuid::new_v4(),
            username: "mechanic".to_string(),
            email: None,
        },
        created_at: Utc::now(),
    }
}
