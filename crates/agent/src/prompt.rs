use chrono::{DateTime, Utc};

use shopdesk_core::domain::conversation::ConversationTurn;

use crate::intent::IntentTag;
use crate::resolver::{InventorySnapshot, OrderSnapshot, ResolvedData};

/// Only this many trailing turns reach the model, however long the history is.
pub const HISTORY_WINDOW: usize = 5;

const BASE_PERSONA: &str = "You are a helpful customer support assistant for an e-commerce clothing store.\n\
You have access to product information, order status, and inventory data.\n\
Be friendly, professional, and provide accurate information based on the available data.";

const CONTEXT_HEADER: &str = "Previous conversation:\n";

const CLOSING_INSTRUCTION: &str = "Please provide a helpful and informative response.";

pub(crate) const CAPABILITIES: [&str; 3] = [
    "Product information and top sellers",
    "Order status and tracking (provide order ID)",
    "Inventory and stock levels (specify product name)",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    /// Rendered history window; empty when there is no history.
    pub context: String,
    pub user: String,
}

impl Prompt {
    /// Content of the single user-role message sent to the model.
    pub fn user_content(&self) -> String {
        format!("{}\n\n{}", self.context, self.user)
    }
}

#[derive(Clone, Debug, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        intent: IntentTag,
        data: &ResolvedData,
        history: &[ConversationTurn],
        message: &str,
    ) -> Prompt {
        Prompt {
            system: system_prompt(intent, data),
            context: context_block(history),
            user: format!("User message: {message}\n\n{CLOSING_INSTRUCTION}"),
        }
    }
}

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn context_block(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let window = &history[history.len().saturating_sub(HISTORY_WINDOW)..];
    let mut context = String::from(CONTEXT_HEADER);
    for turn in window {
        let role = if turn.is_user_message { "User" } else { "Assistant" };
        context.push_str(&format!("{role}: {}\n", turn.content));
    }
    context
}

fn system_prompt(intent: IntentTag, data: &ResolvedData) -> String {
    match (intent, data) {
        (IntentTag::TopProducts, ResolvedData::TopProducts { entries }) if !entries.is_empty() => {
            let ranked = entries
                .iter()
                .enumerate()
                .map(|(index, entry)| format!("{}. {}: {} units", index + 1, entry.name, entry.count))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{BASE_PERSONA}\n\nTop selling products data:\n{ranked}\n\n\
                 Provide a clear list of the top products with their sales numbers."
            )
        }
        (IntentTag::OrderStatus, ResolvedData::OrderStatus(order)) => format!(
            "{BASE_PERSONA}\n\nOrder information:\n{}\n\
             Provide a clear status update for this order.",
            order_facts(order)
        ),
        (IntentTag::OrderStatus, ResolvedData::NotFound { reason }) => format!(
            "{BASE_PERSONA}\n\nError: {reason}\n\nAsk the user to provide a valid order ID."
        ),
        (IntentTag::Inventory, ResolvedData::Inventory(stock)) => format!(
            "{BASE_PERSONA}\n\nInventory information:\n{}\n\
             Provide a clear inventory status for this product.",
            inventory_facts(stock)
        ),
        (IntentTag::Inventory, ResolvedData::NotFound { reason }) => format!(
            "{BASE_PERSONA}\n\nError: {reason}\n\nAsk the user to specify a product name."
        ),
        (IntentTag::Help, _) => {
            let capabilities = CAPABILITIES
                .iter()
                .enumerate()
                .map(|(index, capability)| format!("{}. {capability}", index + 1))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{BASE_PERSONA}\n\nYou can help with:\n{capabilities}\n\n\
                 Ask clarifying questions if you need more information from the user."
            )
        }
        _ => BASE_PERSONA.to_string(),
    }
}

fn order_facts(order: &OrderSnapshot) -> String {
    let mut facts = format!(
        "Order ID: {}\nStatus: {}\nCreated: {}\nItems: {}\n",
        order.order_id,
        order.status,
        format_timestamp(&order.created_at),
        order.item_count
    );
    if let Some(shipped_at) = &order.shipped_at {
        facts.push_str(&format!("Shipped: {}\n", format_timestamp(shipped_at)));
    }
    if let Some(delivered_at) = &order.delivered_at {
        facts.push_str(&format!("Delivered: {}\n", format_timestamp(delivered_at)));
    }
    facts
}

fn inventory_facts(stock: &InventorySnapshot) -> String {
    format!(
        "Product: {}\nTotal items: {}\nAvailable in stock: {}\nSold items: {}\n",
        stock.product_name, stock.total_items, stock.available_items, stock.sold_items
    )
}
