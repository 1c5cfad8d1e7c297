pub mod conversation;
pub mod inventory;
pub mod order;
pub mod product;
