use std::collections::HashMap;

use super::payment::{PaymentId, PaymentStatus};

/// Topic value the gateway uses for payment notifications.
pub const PAYMENT_TOPIC: &str = "payment";

/// A gateway notification, reduced to the two fields the relay acts on.
///
/// The gateway delivers the same information either in the query string
/// (`?topic=payment&id=123` or `?type=payment&data.id=123`) or in the JSON
/// body (`{"type": "payment", "data": {"id": "123"}}`). When both are
/// present the query string wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookNotification {
    pub topic: Option<String>,
    pub payment_id: Option<PaymentId>,
}

impl WebhookNotification {
    /// Extracts topic and payment id. A malformed body is treated as absent.
    pub fn from_parts(query: &HashMap<String, String>, body: Option<&serde_json::Value>) -> Self {
        let query_value = |key: &str| {
            query
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let body_str = |key: &str| {
            body.and_then(|b| b.get(key))
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let topic = query_value("topic")
            .or_else(|| query_value("type"))
            .or_else(|| body_str("type"))
            .or_else(|| body_str("topic"));

        let payment_id = query_value("data.id")
            .or_else(|| query_value("id"))
            .or_else(|| body.and_then(|b| b.pointer("/data/id")).and_then(id_from_json))
            .map(PaymentId::from);

        Self { topic, payment_id }
    }

    /// Returns the payment id when this notification asks for a payment lookup.
    pub fn payment_lookup(&self) -> Option<&PaymentId> {
        match self.topic.as_deref() {
            Some(PAYMENT_TOPIC) => self.payment_id.as_ref(),
            _ => None,
        }
    }
}

/// What the relay did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Topic was not `payment` or no id was present.
    Ignored,
    /// The signature header was missing or did not verify.
    Unauthenticated,
    /// The payment was fetched but is not approved yet.
    NotApproved(PaymentStatus),
    /// The payment was approved and handed to the fulfillment hook.
    Fulfilled(PaymentId),
}

fn id_from_json(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_body_only() {
        let body = json!({ "type": "payment", "data": { "id": "123" } });
        let n = WebhookNotification::from_parts(&HashMap::new(), Some(&body));

        assert_eq!(n.topic.as_deref(), Some("payment"));
        assert_eq!(n.payment_lookup().map(PaymentId::as_str), Some("123"));
    }

    #[test]
    fn test_numeric_body_id() {
        let body = json!({ "type": "payment", "data": { "id": 98765 } });
        let n = WebhookNotification::from_parts(&HashMap::new(), Some(&body));
        assert_eq!(n.payment_id, Some(PaymentId::new("98765")));
    }

    #[test]
    fn test_query_topic_wins_over_body() {
        let body = json!({ "type": "merchant_order", "data": { "id": "123" } });
        let n = WebhookNotification::from_parts(&query(&[("topic", "payment")]), Some(&body));

        assert_eq!(n.topic.as_deref(), Some("payment"));
        assert!(n.payment_lookup().is_some());
    }

    #[test]
    fn test_query_id_wins_over_body() {
        let body = json!({ "type": "payment", "data": { "id": "from-body" } });
        let n = WebhookNotification::from_parts(
            &query(&[("type", "payment"), ("data.id", "from-query")]),
            Some(&body),
        );
        assert_eq!(n.payment_id, Some(PaymentId::new("from-query")));
    }

    #[test]
    fn test_legacy_ipn_query() {
        let n = WebhookNotification::from_parts(
            &query(&[("topic", "payment"), ("id", "555")]),
            None,
        );
        assert_eq!(n.payment_lookup().map(PaymentId::as_str), Some("555"));
    }

    #[test]
    fn test_missing_topic_means_no_lookup() {
        let body = json!({ "data": { "id": "123" } });
        let n = WebhookNotification::from_parts(&HashMap::new(), Some(&body));
        assert!(n.topic.is_none());
        assert!(n.payment_lookup().is_none());
    }

    #[test]
    fn test_other_topic_means_no_lookup() {
        let body = json!({ "type": "merchant_order", "data": { "id": "123" } });
        let n = WebhookNotification::from_parts(&HashMap::new(), Some(&body));
        assert!(n.payment_lookup().is_none());
    }

    #[test]
    fn test_empty_everything() {
        let n = WebhookNotification::from_parts(&HashMap::new(), None);
        assert_eq!(n, WebhookNotification::default());
    }
}
