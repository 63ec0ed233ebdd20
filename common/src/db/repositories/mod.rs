// Repository layer for database operations

pub mod brand;
pub mod car_model;
pub mod category;
pub mod queries;
pub mod repair_type;
pub mod user;
pub mod work;

pub use brand::CarBrandRepository;
pub use car_model::CarModelRepository;
pub use category::RepairCategoryRepository;
pub use repair_type::RepairTypeRepository;
pub use user::UserRepository;
pub use work::WorkRepository;
