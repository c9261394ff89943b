mod product;
mod role;
mod sale;
mod user;

pub use product::Product;
pub use role::Role;
pub use sale::{ProductSale, Sale, SaleDetail};
pub use user::User;
