//! Repository traits for datastore operations.

pub mod carts;
pub mod items;
pub mod orders;
pub mod products;
pub mod sessions;
pub mod users;

pub use carts::CartRepo;
pub use items::ItemRepo;
pub use orders::OrderRepo;
pub use products::ProductRepo;
pub use sessions::SessionRepo;
pub use users::UserRepo;
