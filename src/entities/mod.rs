pub mod address;
pub mod order;
pub mod product;
pub mod storefront_user;

pub use address::Entity as Address;
pub use order::Entity as Order;
pub use product::Entity as Product;
pub use storefront_user::Entity as StorefrontUser;
