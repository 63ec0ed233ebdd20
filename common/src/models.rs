use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Display tag given to categories created without an explicit color
pub const DEFAULT_CATEGORY_COLOR: &str = "#6c757d";

// ============================================================================
// Reference Models
// ============================================================================

/// CarBrand is a shared manufacturer record, unique by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CarBrand {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// CarModel belongs to exactly one brand and is unique by name within it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CarModel {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub name: String,
    pub production_years: String,
    pub engine_options: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// RepairCategory groups repair types for analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RepairCategory {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// RepairType is a kind of job performed on a car
///
/// `owner_id` is `None` for shared types and set for types a user created
/// through the API or an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RepairType {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub typical_duration: String,
    pub complexity: String,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// RepairType with its category resolved, as rendered in work listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairTypeDetail {
    #[serde(flatten)]
    pub repair_type: RepairType,
    pub category: RepairCategory,
}

// ============================================================================
// Work Models
// ============================================================================

/// CompletedWork is the stored row of a finished repair job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CompletedWork {
    pub id: Uuid,
    pub slug: String,
    pub work_date: NaiveDate,
    pub car_brand_id: Uuid,
    pub car_model_id: Uuid,
    pub cost: Decimal,
    pub notes: String,
    pub parts_used: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// WorkRecord is a completed work with every reference resolved
///
/// This is the shape consumed by analytics and export, and the JSON shape
/// returned by the API. Repair types keep the order they were attached in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: Uuid,
    pub slug: String,
    pub work_date: NaiveDate,
    pub car_brand: CarBrand,
    pub car_model: CarModel,
    pub repair_types: Vec<RepairTypeDetail>,
    #[serde(with = "rust_decimal::serde::str")]
    pub cost: Decimal,
    pub notes: String,
    pub parts_used: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a work record through the API
#[derive(Debug, Clone, Deserialize)]
pub struct NewCompletedWork {
    pub car_brand_id: Uuid,
    pub car_model_id: Uuid,
    pub repair_type_ids: Vec<Uuid>,
    pub work_date: NaiveDate,
    pub cost: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub parts_used: String,
}

/// Sort order accepted by work listings and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkOrdering {
    #[serde(rename = "work_date")]
    WorkDateAsc,
    #[default]
    #[serde(rename = "-work_date")]
    WorkDateDesc,
    #[serde(rename = "cost")]
    CostAsc,
    #[serde(rename = "-cost")]
    CostDesc,
}

impl WorkOrdering {
    /// ORDER BY clause for the `completed_works w` alias
    pub fn as_sql(&self) -> &'static str {
        match self {
            WorkOrdering::WorkDateAsc => "w.work_date ASC, w.created_at ASC",
            WorkOrdering::WorkDateDesc => "w.work_date DESC, w.created_at DESC",
            WorkOrdering::CostAsc => "w.cost ASC, w.created_at ASC",
            WorkOrdering::CostDesc => "w.cost DESC, w.created_at DESC",
        }
    }
}

impl FromStr for WorkOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work_date" => Ok(WorkOrdering::WorkDateAsc),
            "-work_date" => Ok(WorkOrdering::WorkDateDesc),
            "cost" => Ok(WorkOrdering::CostAsc),
            "-cost" => Ok(WorkOrdering::CostDesc),
            other => Err(format!("unknown ordering: {}", other)),
        }
    }
}

/// Query parameter that treats a blank value (`?date_from=`) as absent
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn empty_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    Ok(empty_as_none(deserializer)?.unwrap_or_default())
}

/// Filters applied to an owner's works before listing, totals, analytics or export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub work_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub car_brand_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub car_model_id: Option<Uuid>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_to: Option<NaiveDate>,
    /// Substring matched against notes and parts used
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_default")]
    pub ordering: WorkOrdering,
}

impl WorkFilter {
    /// Date range filter, used by analytics and the dashboard
    pub fn between(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Self {
        Self {
            date_from,
            date_to,
            ..Self::default()
        }
    }

    /// Search term with surrounding whitespace removed, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl Pagination {
    /// Clamp page to at least 1 and page size to 1..=100
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// One page of results with the total match count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub results: Vec<T>,
}

/// Count and cost sum of a filtered set of works
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkTotals {
    pub count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
}

// ============================================================================
// Reference Inputs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewCarBrand {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCarModel {
    pub brand_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub production_years: String,
    #[serde(default)]
    pub engine_options: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRepairCategory {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

/// Input for creating or replacing a user's repair type
#[derive(Debug, Clone, Deserialize)]
pub struct RepairTypeInput {
    pub category_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub typical_duration: String,
    #[serde(default)]
    pub complexity: String,
}

// ============================================================================
// Directory & Dashboard Views
// ============================================================================

/// A brand with its models, sorted by name
#[derive(Debug, Clone, Serialize)]
pub struct BrandWithModels {
    #[serde(flatten)]
    pub brand: CarBrand,
    pub models: Vec<CarModel>,
}

/// A category with the repair types visible to a user
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithRepairTypes {
    #[serde(flatten)]
    pub category: RepairCategory,
    pub repair_types: Vec<RepairType>,
}

/// Home page summary for one user
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub works_last_30_days: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue_last_30_days: Decimal,
    pub brand_count: i64,
    pub model_count: i64,
    pub repair_type_count: i64,
    pub recent_works: Vec<WorkRecord>,
}

// ============================================================================
// User and Authentication Models
// ============================================================================

/// User represents a login account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub is_superuser: bool,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner as embedded in work records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// UserClaims represents JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,              // Subject (user ID)
    pub username: String,         // Username
    pub permissions: Vec<String>, // User permissions
    pub exp: i64,                 // Expiration time (Unix timestamp)
    pub iat: i64,                 // Issued at (Unix timestamp)
}

impl UserClaims {
    /// Parse the subject back into the user id
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
