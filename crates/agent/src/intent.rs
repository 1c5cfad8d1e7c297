use serde::{Deserialize, Serialize};

/// Coarse category of an inbound message. Drives which lookup runs and which
/// prompt addendum applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    TopProducts,
    OrderStatus,
    Inventory,
    Help,
    General,
}

impl IntentTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopProducts => "top_products",
            Self::OrderStatus => "order_status",
            Self::Inventory => "inventory",
            Self::Help => "help",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for IntentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluated top to bottom; the first rule with any keyword contained in the
/// lowercased message wins. Messages often hit several rules ("order status
/// of my top item"), so the order here is the tie-break.
const INTENT_RULES: &[(IntentTag, &[&str])] = &[
    (IntentTag::TopProducts, &["top", "popular", "best", "most sold"]),
    (IntentTag::OrderStatus, &["order", "status", "tracking"]),
    (IntentTag::Inventory, &["stock", "inventory", "available", "left"]),
    (IntentTag::Help, &["help", "what can you do", "capabilities"]),
];

pub fn classify(message: &str) -> IntentTag {
    let lowered = message.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(intent, _)| *intent)
        .unwrap_or(IntentTag::General)
}

#[cfg(test)]
mod tests {
    use super::{classify, IntentTag};

    #[test]
    fn classifies_each_keyword_family() {
        assert_eq!(classify("What are the top products?"), IntentTag::TopProducts);
        assert_eq!(classify("Which items are MOST SOLD this week"), IntentTag::TopProducts);
        assert_eq!(classify("tracking for 4521 please"), IntentTag::OrderStatus);
        assert_eq!(classify("how many beanies are in inventory"), IntentTag::Inventory);
        assert_eq!(classify("What can you do?"), IntentTag::Help);
        assert_eq!(classify("hello there"), IntentTag::General);
        assert_eq!(classify(""), IntentTag::General);
    }

    #[test]
    fn earlier_rules_win_when_several_match() {
        assert_eq!(classify("What's the status of my top order?"), IntentTag::TopProducts);
        assert_eq!(classify("order status: is it in stock"), IntentTag::OrderStatus);
        assert_eq!(classify("help, anything left in stock?"), IntentTag::Inventory);
    }

    #[test]
    fn keywords_match_inside_longer_words() {
        // "stop" contains "top", "bordering" contains "order"
        assert_eq!(classify("please stop"), IntentTag::TopProducts);
        assert_eq!(classify("bordering towns"), IntentTag::OrderStatus);
    }

    #[test]
    fn classification_is_deterministic() {
        let message = "Is the Wool Beanie available?";
        let first = classify(message);
        assert!((0..10).all(|_| classify(message) == first));
        assert_eq!(first, IntentTag::Inventory);
    }

    #[test]
    fn tags_serialize_as_snake_case() {
        assert_eq!(serde_json::to_string(&IntentTag::TopProducts).unwrap(), "\"top_products\"");
        assert_eq!(IntentTag::OrderStatus.to_string(), "order_status");
    }
}
