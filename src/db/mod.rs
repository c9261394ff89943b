pub mod products;
pub mod roles;
pub mod sales;
pub mod users;
