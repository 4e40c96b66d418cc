//! RelayService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use relay_types::{
        AmountInput, AppError, CreatePaymentRequest, FulfillmentError, FulfillmentHook,
        GatewayError, GatewayPaymentRequest, PaymentGateway, PaymentId, PaymentRecord,
        PaymentStatus, WebhookError, WebhookNotification, WebhookOutcome,
    };

    use crate::{RelayConfig, RelayService};

    /// Gateway fake that records every call.
    #[derive(Default)]
    pub struct MockGateway {
        records: Mutex<HashMap<PaymentId, PaymentRecord>>,
        pub created: Mutex<Vec<(GatewayPaymentRequest, String)>>,
        pub fetched: Mutex<Vec<PaymentId>>,
        pub fail_create: Mutex<Option<GatewayError>>,
    }

    impl MockGateway {
        pub fn with_payment(id: &str, status: PaymentStatus) -> Self {
            let gateway = Self::default();
            gateway
                .records
                .lock()
                .unwrap()
                .insert(PaymentId::new(id), PaymentRecord::new(id, status));
            gateway
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_payment(
            &self,
            req: &GatewayPaymentRequest,
            idempotency_key: &str,
        ) -> Result<PaymentRecord, GatewayError> {
            self.created
                .lock()
                .unwrap()
                .push((req.clone(), idempotency_key.to_string()));
            if let Some(err) = self.fail_create.lock().unwrap().take() {
                return Err(err);
            }
            let mut record = PaymentRecord::new("pay_1", PaymentStatus::Pending);
            record.transaction_amount = Some(req.transaction_amount);
            self.records
                .lock()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Ok(record)
        }

        async fn get_payment(&self, id: &PaymentId) -> Result<PaymentRecord, GatewayError> {
            self.fetched.lock().unwrap().push(id.clone());
            self.records
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or(GatewayError::NotFound)
        }
    }

    /// Hook fake that counts invocations.
    #[derive(Default)]
    pub struct MockHook {
        pub calls: AtomicU32,
        pub fulfilled: Mutex<Vec<PaymentId>>,
        pub fail: bool,
    }

    #[async_trait]
    impl FulfillmentHook for MockHook {
        async fn fulfill(&self, payment: &PaymentRecord) -> Result<(), FulfillmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fulfilled.lock().unwrap().push(payment.id.clone());
            if self.fail {
                Err(FulfillmentError::Failed("order service down".into()))
            } else {
                Ok(())
            }
        }
    }

    fn create_request(amount: serde_json::Value) -> CreatePaymentRequest {
        CreatePaymentRequest {
            amount: Some(serde_json::from_value::<AmountInput>(amount).unwrap()),
            description: "SoundGuard Premium".to_string(),
            user_email: None,
            external_reference: None,
        }
    }

    fn payment_notification(id: &str) -> WebhookNotification {
        WebhookNotification {
            topic: Some("payment".to_string()),
            payment_id: Some(PaymentId::new(id)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_payment_forwards_parsed_amount() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());

        let record = service
            .create_payment(create_request(serde_json::json!("123.45")))
            .await
            .unwrap();

        let created = service.gateway().created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let (body, key) = &created[0];
        assert_eq!(body.transaction_amount.to_string(), "123.45");
        assert_eq!(body.payment_method_id, "pix");
        assert_eq!(body.payer.email, "usuario@soundguard.com");
        assert!(!key.is_empty());
        assert_eq!(record.transaction_amount, Some(body.transaction_amount));
    }

    #[tokio::test]
    async fn test_create_payment_non_numeric_amount_makes_no_call() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());

        let result = service
            .create_payment(create_request(serde_json::json!("abc")))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(service.gateway().created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_payment_negative_amount_fails() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());

        let result = service
            .create_payment(create_request(serde_json::json!(-10)))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(service.gateway().created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_payment_uses_configured_defaults() {
        let config = RelayConfig {
            payer_defaults: relay_types::PayerDefaults {
                email: "fallback@shop.test".into(),
                first_name: "Ana".into(),
                last_name: "Silva".into(),
            },
            notification_url: Some("https://relay.test/webhook/mercadopago".into()),
            webhook_secret: None,
        };
        let service =
            RelayService::with_config(MockGateway::default(), MockHook::default(), config);

        service
            .create_payment(create_request(serde_json::json!(10)))
            .await
            .unwrap();

        let created = service.gateway().created.lock().unwrap();
        let (body, _) = &created[0];
        assert_eq!(body.payer.email, "fallback@shop.test");
        assert_eq!(body.payer.first_name, "Ana");
        assert_eq!(
            body.notification_url.as_deref(),
            Some("https://relay.test/webhook/mercadopago")
        );
    }

    #[tokio::test]
    async fn test_create_payment_gateway_rejection() {
        let gateway = MockGateway::default();
        *gateway.fail_create.lock().unwrap() = Some(GatewayError::Rejected {
            status: 400,
            message: "invalid_payer".into(),
        });
        let service = RelayService::new(gateway, MockHook::default());

        let result = service
            .create_payment(create_request(serde_json::json!(10)))
            .await;

        match result {
            Err(AppError::Upstream { message, details }) => {
                assert_eq!(message, "Failed to create payment");
                assert!(details.unwrap().contains("invalid_payer"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_payment_gateway_timeout() {
        let gateway = MockGateway::default();
        *gateway.fail_create.lock().unwrap() = Some(GatewayError::Timeout);
        let service = RelayService::new(gateway, MockHook::default());

        let result = service
            .create_payment(create_request(serde_json::json!(10)))
            .await;

        assert!(matches!(result, Err(AppError::GatewayTimeout(_))));
    }

    #[tokio::test]
    async fn test_create_pix_payment_normalizes() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());

        let pix = service
            .create_pix_payment(create_request(serde_json::json!(5)))
            .await
            .unwrap();

        assert_eq!(pix.id, "pay_1");
        assert_eq!(pix.status, "pending");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status lookup
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_payment_found() {
        let service = RelayService::new(
            MockGateway::with_payment("42", PaymentStatus::Approved),
            MockHook::default(),
        );

        let record = service.get_payment("42").await.unwrap();
        assert_eq!(record.id.as_str(), "42");
    }

    #[tokio::test]
    async fn test_get_payment_not_found() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());
        let result = service.get_payment("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_payment_rejects_bad_id_without_call() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());

        let result = service.get_payment("../users/me").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(service.gateway().fetched.lock().unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Webhooks
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_approved_payment_is_fulfilled_once() {
        let service = RelayService::new(
            MockGateway::with_payment("123", PaymentStatus::Approved),
            MockHook::default(),
        );

        let outcome = service
            .handle_notification(&payment_notification("123"))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Fulfilled(PaymentId::new("123")));
        assert_eq!(
            service.gateway().fetched.lock().unwrap().as_slice(),
            [PaymentId::new("123")]
        );
        assert_eq!(service.fulfillment().calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            service.fulfillment().fulfilled.lock().unwrap().as_slice(),
            [PaymentId::new("123")]
        );
    }

    #[tokio::test]
    async fn test_pending_and_rejected_are_not_fulfilled() {
        for status in [PaymentStatus::Pending, PaymentStatus::Rejected] {
            let service = RelayService::new(
                MockGateway::with_payment("123", status),
                MockHook::default(),
            );

            let outcome = service
                .handle_notification(&payment_notification("123"))
                .await
                .unwrap();

            assert_eq!(outcome, WebhookOutcome::NotApproved(status));
            assert_eq!(service.fulfillment().calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_non_payment_topic_is_ignored() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());
        let notification = WebhookNotification {
            topic: Some("merchant_order".to_string()),
            payment_id: Some(PaymentId::new("1")),
        };

        let outcome = service.handle_notification(&notification).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(service.gateway().fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_reported() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());

        let result = service
            .handle_notification(&payment_notification("404"))
            .await;

        assert!(matches!(
            result,
            Err(WebhookError::Lookup(GatewayError::NotFound))
        ));
        assert_eq!(service.fulfillment().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fulfillment_failure_is_reported() {
        let service = RelayService::new(
            MockGateway::with_payment("7", PaymentStatus::Approved),
            MockHook {
                fail: true,
                ..MockHook::default()
            },
        );

        let result = service.handle_notification(&payment_notification("7")).await;

        assert!(matches!(result, Err(WebhookError::Fulfillment(_))));
    }

    #[tokio::test]
    async fn test_not_implemented_hook_surfaces_marker() {
        let service = RelayService::new(
            MockGateway::with_payment("8", PaymentStatus::Approved),
            relay_gateway::NotImplementedFulfillment,
        );

        let result = service.handle_notification(&payment_notification("8")).await;

        assert!(matches!(
            result,
            Err(WebhookError::Fulfillment(FulfillmentError::NotImplemented))
        ));
    }

    #[test]
    fn test_signature_not_required_without_secret() {
        let service = RelayService::new(MockGateway::default(), MockHook::default());
        assert!(service.verify_webhook_signature(None, None, Some("1")));
    }

    #[test]
    fn test_signature_required_with_secret() {
        let config = RelayConfig {
            webhook_secret: Some("whsec".into()),
            ..RelayConfig::default()
        };
        let service =
            RelayService::with_config(MockGateway::default(), MockHook::default(), config);

        assert!(!service.verify_webhook_signature(None, None, Some("1")));

        let manifest = relay_gateway::security::mercadopago_manifest(Some("1"), Some("r"), "10");
        let v1 = relay_gateway::security::sign_payload(manifest.as_bytes(), "whsec");
        let header = format!("ts=10,v1={v1}");
        assert!(service.verify_webhook_signature(Some(&header), Some("r"), Some("1")));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = RelayConfig {
            webhook_secret: Some("super-secret".into()),
            ..RelayConfig::default()
        };
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
