//! Shared domain model, configuration, and error taxonomy for shopdesk.
//!
//! The crate performs no I/O: persistence lives in `shopdesk-db`,
//! the grounded-response pipeline in `shopdesk-agent`, and transport in
//! `shopdesk-server`.

pub mod config;
pub mod domain;
pub mod errors;

pub use domain::conversation::{
    Conversation, ConversationId, ConversationTurn, Message, MessageId, User, UserId,
};
pub use domain::inventory::{InventoryItem, InventoryItemId, StockLevel};
pub use domain::order::{Order, OrderId};
pub use domain::product::{Product, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
