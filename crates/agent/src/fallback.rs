use crate::intent::IntentTag;
use crate::prompt::{format_timestamp, CAPABILITIES};
use crate::resolver::ResolvedData;

/// Deterministic reply used when generation fails. Renders the same facts the
/// prompt builder hands to the model, as user-facing text.
pub fn fallback_reply(intent: IntentTag, data: &ResolvedData) -> String {
    match (intent, data) {
        (IntentTag::TopProducts, ResolvedData::TopProducts { entries }) if !entries.is_empty() => {
            let mut reply = String::from("Here are the top 5 most sold products:\n");
            for (index, entry) in entries.iter().enumerate() {
                reply.push_str(&format!("{}. {}: {} units sold\n", index + 1, entry.name, entry.count));
            }
            reply
        }
        (IntentTag::TopProducts, _) => "I can help you find information about our top selling \
                                         products. Please try asking again."
            .to_string(),
        (IntentTag::OrderStatus, ResolvedData::OrderStatus(order)) => {
            let mut reply = format!(
                "Order ID {} status: {}\nCreated: {}\nItems: {}\n",
                order.order_id,
                order.status,
                format_timestamp(&order.created_at),
                order.item_count
            );
            if let Some(shipped_at) = &order.shipped_at {
                reply.push_str(&format!("Shipped: {}\n", format_timestamp(shipped_at)));
            }
            if let Some(delivered_at) = &order.delivered_at {
                reply.push_str(&format!("Delivered: {}\n", format_timestamp(delivered_at)));
            }
            reply
        }
        (IntentTag::OrderStatus, _) => {
            "I can help you check order status. Please provide an order ID.".to_string()
        }
        (IntentTag::Inventory, ResolvedData::Inventory(stock)) => format!(
            "Inventory status for {}:\nAvailable in stock: {} items\nTotal items: {}\nSold items: {}\n",
            stock.product_name, stock.available_items, stock.total_items, stock.sold_items
        ),
        (IntentTag::Inventory, _) => {
            "I can help you check inventory levels. Please specify a product name.".to_string()
        }
        (IntentTag::Help, _) => {
            let bullets = CAPABILITIES
                .iter()
                .map(|capability| format!("• {capability}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "I'm your e-commerce customer support assistant! I can help you with:\n\n\
                 {bullets}\n\nHow can I assist you today?"
            )
        }
        (IntentTag::General, _) => "I'm here to help! I can provide information about products, \
                                    orders, and inventory. What would you like to know?"
            .to_string(),
    }
}
