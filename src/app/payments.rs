//! Payment initiation and reconciliation.
//!
//! Every path that learns something from a gateway (client polling, PayPal
//! capture, webhooks) ends in [`PaymentService::settle`]. Settlement applies the
//! status transition with a compare-and-set, so a webhook racing a poll for the
//! same payment settles it exactly once and the loser sees a no-op.

use crate::app::{find_artist, optional_text};
use crate::crypto::signing::verify_webhook_signature;
use crate::domain::model::{
    Donation, Payment, Plan, RevenueTransaction, Subscription, SubscriptionStatus,
};
use crate::domain::money::Money;
use crate::domain::payment::{transition, PaymentStatus, Provider, Purpose, RemoteStatus, Transition};
use crate::error::{AppError, Result};
use crate::infra::config::BillingConfig;
use crate::infra::payments::mobile_money::RequestToPayResult;
use crate::infra::payments::paypal::parse_webhook;
use crate::infra::payments::{
    MobileMoneyGateway, PaypalGateway, PaypalWebhook, PaypalWebhookHeaders, RemoteReport,
    RequestToPay,
};
use crate::storage::{PaymentUpdate, Store};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const MOBILE_MONEY: &str = "mobile money";
const PAYPAL: &str = "PayPal";

/// Provider reference of a PayPal payment whose order has not been created yet.
const UNASSIGNED_ORDER_PREFIX: &str = "unassigned:";

const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DonationRequest {
    pub artist_id: Uuid,
    /// Decimal amount, e.g. `"5.00"`, or `"5000"` for zero-decimal currencies.
    pub amount: String,
    pub currency: String,
    pub provider: Provider,
    /// Payer phone number; required for mobile money.
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub artist_id: Uuid,
    pub plan: Plan,
    pub provider: Provider,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Checkout {
    pub payment: Payment,
    /// PayPal approval page the payer is redirected to.
    pub approval_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionCheckout {
    pub subscription: Subscription,
    pub payment: Payment,
    pub approval_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub event: String,
    pub payment_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

impl WebhookAck {
    fn ignored(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payment_id: None,
            status: None,
        }
    }

    fn settled(event: impl Into<String>, payment: &Payment) -> Self {
        Self {
            event: event.into(),
            payment_id: Some(payment.id),
            status: Some(payment.status),
        }
    }
}

pub struct PaymentService {
    store: Arc<dyn Store>,
    mobile_money: Option<Arc<dyn MobileMoneyGateway>>,
    paypal: Option<Arc<dyn PaypalGateway>>,
    billing: BillingConfig,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        mobile_money: Option<Arc<dyn MobileMoneyGateway>>,
        paypal: Option<Arc<dyn PaypalGateway>>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            store,
            mobile_money,
            paypal,
            billing,
        }
    }

    fn mobile_money(&self) -> Result<&dyn MobileMoneyGateway> {
        self.mobile_money
            .as_deref()
            .ok_or(AppError::GatewayNotConfigured(MOBILE_MONEY))
    }

    fn paypal(&self) -> Result<&dyn PaypalGateway> {
        self.paypal
            .as_deref()
            .ok_or(AppError::GatewayNotConfigured(PAYPAL))
    }

    pub fn plan_price(&self, plan: Plan) -> &Money {
        match plan {
            Plan::Monthly => &self.billing.monthly_price,
            Plan::Yearly => &self.billing.yearly_price,
        }
    }

    /// Checks the provider is usable and returns the payer MSISDN for mobile money.
    fn payer_for(&self, provider: Provider, phone_number: Option<&str>) -> Result<Option<String>> {
        match provider {
            Provider::MobileMoney => {
                self.mobile_money()?;
                let phone = phone_number.ok_or_else(|| {
                    AppError::Validation("phone_number is required for mobile money".to_string())
                })?;
                normalize_msisdn(phone).map(Some)
            }
            Provider::Paypal => {
                self.paypal()?;
                Ok(None)
            }
        }
    }

    pub async fn initiate_donation(&self, donor_id: Uuid, req: DonationRequest) -> Result<Checkout> {
        let amount = Money::parse_decimal(&req.amount, &req.currency)?;
        if amount.minor == 0 {
            return Err(AppError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if donor_id == req.artist_id {
            return Err(AppError::Validation(
                "you cannot donate to yourself".to_string(),
            ));
        }
        let message = optional_text("message", req.message, MAX_MESSAGE_CHARS)?;
        let artist = find_artist(self.store.as_ref(), req.artist_id).await?;
        let payer = self.payer_for(req.provider, req.phone_number.as_deref())?;

        let payment = new_payment(donor_id, artist.id, req.provider, Purpose::Donation, &amount);
        self.store.insert_payment(&payment).await?;
        let donation = Donation {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            donor_id,
            artist_id: artist.id,
            amount_minor: amount.minor,
            currency: amount.currency.clone(),
            message,
            status: PaymentStatus::Pending,
            created_at: payment.created_at,
        };
        self.store.insert_donation(&donation).await?;

        tracing::info!(
            payment_id = %payment.id,
            provider = %payment.provider,
            amount = payment.amount_minor,
            currency = %payment.currency,
            "donation initiated"
        );
        let description = format!("Donation to {}", artist.display_name);
        self.start_checkout(payment, payer, &description).await
    }

    pub async fn initiate_subscription(
        &self,
        subscriber_id: Uuid,
        req: SubscribeRequest,
    ) -> Result<SubscriptionCheckout> {
        if subscriber_id == req.artist_id {
            return Err(AppError::Validation(
                "you cannot subscribe to yourself".to_string(),
            ));
        }
        let artist = find_artist(self.store.as_ref(), req.artist_id).await?;
        let payer = self.payer_for(req.provider, req.phone_number.as_deref())?;

        let now = Utc::now();
        let existing = self.store.find_subscription(subscriber_id, artist.id).await?;
        if let Some(sub) = &existing {
            if sub.status == SubscriptionStatus::Active && sub.is_entitled(now) {
                return Err(AppError::Conflict(format!(
                    "already subscribed until {}",
                    sub.current_period_end
                        .map(|end| end.to_rfc3339())
                        .unwrap_or_default()
                )));
            }
        }

        let price = self.plan_price(req.plan).clone();
        let payment = new_payment(
            subscriber_id,
            artist.id,
            req.provider,
            Purpose::Subscription,
            &price,
        );
        self.store.insert_payment(&payment).await?;

        let subscription = match existing {
            Some(mut sub) => {
                sub.plan = req.plan;
                sub.payment_id = Some(payment.id);
                // a cancelled subscription keeps its access while the renewal is pending
                if !sub.is_entitled(now) {
                    sub.status = SubscriptionStatus::Pending;
                }
                sub.updated_at = now;
                self.store.update_subscription(&sub).await?;
                sub
            }
            None => {
                let sub = Subscription {
                    id: Uuid::new_v4(),
                    subscriber_id,
                    artist_id: artist.id,
                    plan: req.plan,
                    status: SubscriptionStatus::Pending,
                    payment_id: Some(payment.id),
                    current_period_end: None,
                    created_at: now,
                    updated_at: now,
                };
                self.store.insert_subscription(&sub).await?;
                sub
            }
        };

        tracing::info!(
            payment_id = %payment.id,
            subscription_id = %subscription.id,
            plan = %subscription.plan,
            provider = %payment.provider,
            "subscription initiated"
        );
        let description = format!("{} subscription to {}", subscription.plan, artist.display_name);
        let checkout = self.start_checkout(payment, payer, &description).await?;
        Ok(SubscriptionCheckout {
            subscription,
            payment: checkout.payment,
            approval_url: checkout.approval_url,
        })
    }

    /// Hands a freshly stored payment to its gateway. If the gateway refuses,
    /// the payment is marked failed and the gateway's error is returned.
    async fn start_checkout(
        &self,
        payment: Payment,
        payer: Option<String>,
        description: &str,
    ) -> Result<Checkout> {
        match payment.provider {
            Provider::MobileMoney => {
                let request = RequestToPay {
                    reference: payment.provider_reference.clone(),
                    amount: payment.money(),
                    payer_msisdn: payer.unwrap_or_default(),
                    external_id: payment.id.to_string(),
                    payer_message: description.to_string(),
                    payee_note: format!("payment {}", payment.id),
                };
                if let Err(err) = self.mobile_money()?.request_to_pay(&request).await {
                    self.abandon(&payment, &err).await;
                    return Err(err);
                }
                Ok(Checkout {
                    payment,
                    approval_url: None,
                })
            }
            Provider::Paypal => {
                let created = self
                    .paypal()?
                    .create_order(payment.id, &payment.money(), description)
                    .await;
                match created {
                    Ok(order) => {
                        self.store
                            .set_payment_reference(payment.id, &order.order_id)
                            .await?;
                        tracing::info!(payment_id = %payment.id, order_id = %order.order_id, "paypal order created");
                        Ok(Checkout {
                            payment: Payment {
                                provider_reference: order.order_id,
                                ..payment
                            },
                            approval_url: order.approval_url,
                        })
                    }
                    Err(err) => {
                        self.abandon(&payment, &err).await;
                        Err(err)
                    }
                }
            }
        }
    }

    async fn abandon(&self, payment: &Payment, err: &AppError) {
        tracing::warn!(payment_id = %payment.id, provider = %payment.provider, error = %err, "gateway refused payment");
        let report = RemoteReport {
            status: RemoteStatus::Failed,
            provider_transaction_id: None,
            amount: None,
            reason: Some(err.to_string()),
            external_id: None,
        };
        if let Err(e) = self.settle(payment.clone(), report).await {
            tracing::error!(payment_id = %payment.id, error = %e, "could not mark payment failed");
        }
    }

    /// The caller's payment; polls the gateway once while it is pending.
    pub async fn payment_status(&self, user_id: Uuid, payment_id: Uuid) -> Result<Payment> {
        let payment = self
            .store
            .get_payment(payment_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("payment {}", payment_id)))?;
        if payment.status != PaymentStatus::Pending {
            return Ok(payment);
        }

        let polled = match payment.provider {
            Provider::MobileMoney => match &self.mobile_money {
                Some(gateway) => gateway.request_status(&payment.provider_reference).await,
                None => return Ok(payment),
            },
            Provider::Paypal => match &self.paypal {
                Some(_) if payment.provider_reference.starts_with(UNASSIGNED_ORDER_PREFIX) => {
                    return Ok(payment)
                }
                Some(gateway) => gateway.get_order(&payment.provider_reference).await,
                None => return Ok(payment),
            },
        };
        match polled {
            Ok(report) => self.settle(payment, report).await,
            Err(err) => {
                tracing::warn!(payment_id = %payment.id, error = %err, "status poll failed");
                Ok(payment)
            }
        }
    }

    /// Captures an approved PayPal order on behalf of its payer.
    pub async fn capture_paypal(&self, user_id: Uuid, order_id: &str) -> Result<Payment> {
        let (payment, _) = self.payment_for_order(order_id).await?;
        ensure_owner(&payment, user_id, order_id)?;
        if payment.status == PaymentStatus::Completed {
            return Ok(payment);
        }
        let report = self.paypal()?.capture_order(order_id).await?;
        self.settle(payment, report).await
    }

    /// Reads a PayPal order and reconciles the payment with it.
    pub async fn paypal_status(&self, user_id: Uuid, order_id: &str) -> Result<Payment> {
        let (payment, fetched) = self.payment_for_order(order_id).await?;
        ensure_owner(&payment, user_id, order_id)?;
        if payment.status == PaymentStatus::Completed {
            return Ok(payment);
        }
        let report = match fetched {
            Some(report) => report,
            None => self.paypal()?.get_order(order_id).await?,
        };
        self.settle(payment, report).await
    }

    /// Looks a payment up by order id, falling back to the order's `custom_id`.
    /// Returns the order report too when the fallback had to fetch it.
    async fn payment_for_order(&self, order_id: &str) -> Result<(Payment, Option<RemoteReport>)> {
        if let Some(payment) = self
            .store
            .find_payment_by_reference(Provider::Paypal, order_id)
            .await?
        {
            return Ok((payment, None));
        }
        let report = self.paypal()?.get_order(order_id).await?;
        let payment = self
            .by_external_id(Provider::Paypal, report.external_payment_id(), Some(order_id))
            .await?;
        Ok((payment, Some(report)))
    }

    async fn by_external_id(
        &self,
        provider: Provider,
        payment_id: Option<Uuid>,
        reference: Option<&str>,
    ) -> Result<Payment> {
        let not_found = || {
            AppError::NotFound(format!(
                "no {} payment for reference {}",
                provider,
                reference.unwrap_or("-")
            ))
        };
        let id = payment_id.ok_or_else(not_found)?;
        let mut payment = self
            .store
            .get_payment(id)
            .await?
            .filter(|p| p.provider == provider)
            .ok_or_else(not_found)?;
        tracing::info!(payment_id = %payment.id, %provider, reference = ?reference, "payment matched by external id");

        if let Some(reference) = reference {
            if payment.provider_reference.starts_with(UNASSIGNED_ORDER_PREFIX) {
                self.store.set_payment_reference(payment.id, reference).await?;
                payment.provider_reference = reference.to_string();
            }
        }
        Ok(payment)
    }

    pub async fn handle_mobile_money_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookAck> {
        let gateway = self.mobile_money()?;
        if let Some(secret) = gateway.webhook_secret() {
            let valid = signature
                .map(|sig| verify_webhook_signature(secret, body, sig))
                .unwrap_or(false);
            if !valid {
                tracing::warn!("mobile money callback rejected: bad signature");
                return Err(AppError::InvalidSignature);
            }
        }

        let callback: RequestToPayResult = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("malformed callback: {}", e)))?;
        let reference = callback.reference_id.clone();
        let report = callback.into_report();

        let found = match reference.as_deref() {
            Some(r) => {
                self.store
                    .find_payment_by_reference(Provider::MobileMoney, r)
                    .await?
            }
            None => None,
        };
        let payment = match found {
            Some(p) => p,
            None => {
                self.by_external_id(
                    Provider::MobileMoney,
                    report.external_payment_id(),
                    reference.as_deref(),
                )
                .await?
            }
        };
        let settled = self.settle(payment, report).await?;
        Ok(WebhookAck::settled("requesttopay", &settled))
    }

    pub async fn handle_paypal_webhook(
        &self,
        headers: &PaypalWebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookAck> {
        let gateway = self.paypal()?;
        let event: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("malformed paypal event: {}", e)))?;
        if !gateway.verify_webhook(headers, &event).await? {
            tracing::warn!("paypal webhook rejected: verification failed");
            return Err(AppError::InvalidSignature);
        }
        let event_type = event
            .get("event_type")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        match parse_webhook(&event)? {
            PaypalWebhook::Capture { order_id, report } => {
                let found = match order_id.as_deref() {
                    Some(o) => self.store.find_payment_by_reference(Provider::Paypal, o).await?,
                    None => None,
                };
                let payment = match found {
                    Some(p) => p,
                    None => {
                        self.by_external_id(
                            Provider::Paypal,
                            report.external_payment_id(),
                            order_id.as_deref(),
                        )
                        .await?
                    }
                };
                let settled = self.settle(payment, report).await?;
                Ok(WebhookAck::settled(event_type, &settled))
            }
            PaypalWebhook::OrderApproved {
                order_id,
                custom_id,
            } => {
                let found = self
                    .store
                    .find_payment_by_reference(Provider::Paypal, &order_id)
                    .await?;
                let payment = match found {
                    Some(p) => p,
                    None => {
                        let id = custom_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
                        self.by_external_id(Provider::Paypal, id, Some(&order_id))
                            .await?
                    }
                };
                if payment.status == PaymentStatus::Completed {
                    return Ok(WebhookAck::settled(event_type, &payment));
                }
                tracing::info!(payment_id = %payment.id, order_id = %order_id, "capturing approved order");
                let report = gateway.capture_order(&order_id).await?;
                let settled = self.settle(payment, report).await?;
                Ok(WebhookAck::settled(event_type, &settled))
            }
            PaypalWebhook::CaptureRefunded { capture_id } => {
                tracing::info!(capture_id = %capture_id, "refund received; revenue is not reversed");
                Ok(WebhookAck::ignored(event_type))
            }
            PaypalWebhook::Other(kind) => {
                tracing::debug!(event_type = %kind, "paypal event acknowledged");
                Ok(WebhookAck::ignored(kind))
            }
        }
    }

    /// Applies a gateway report to a payment and its donation or subscription.
    ///
    /// Returns the payment as stored afterwards.
    pub async fn settle(&self, payment: Payment, report: RemoteReport) -> Result<Payment> {
        let next = match transition(payment.status, report.status) {
            Transition::Noop => {
                tracing::debug!(payment_id = %payment.id, status = %payment.status, "gateway report changes nothing");
                if payment.status == PaymentStatus::Completed
                    && !self.store.has_revenue_transaction(payment.id).await?
                {
                    // revenue is written last, so its absence means the completion
                    // side effects were interrupted; all of them are idempotent
                    tracing::info!(payment_id = %payment.id, "repairing completion side effects");
                    self.on_completed(&payment).await?;
                }
                return Ok(payment);
            }
            Transition::Ignored => {
                tracing::warn!(
                    payment_id = %payment.id,
                    remote = ?report.status,
                    "ignoring failure report for a completed payment"
                );
                return Ok(payment);
            }
            Transition::Apply(next) => next,
        };

        if next == PaymentStatus::Completed {
            if let Some(reported) = &report.amount {
                if *reported != payment.money() {
                    tracing::error!(
                        payment_id = %payment.id,
                        expected = %format!("{} {}", payment.money().to_decimal_string(), payment.currency),
                        reported = %format!("{} {}", reported.to_decimal_string(), reported.currency),
                        "gateway amount does not match payment; left pending for review"
                    );
                    return Err(AppError::Conflict(format!(
                        "payment {} amount mismatch",
                        payment.id
                    )));
                }
            }
        }

        let update = PaymentUpdate {
            status: next,
            provider_transaction_id: report.provider_transaction_id.clone(),
            failure_reason: match next {
                PaymentStatus::Failed => report
                    .reason
                    .clone()
                    .or_else(|| Some("declined by gateway".to_string())),
                _ => None,
            },
        };
        let applied = self
            .store
            .compare_and_set_payment_status(payment.id, payment.status, &update)
            .await?;
        if !applied {
            tracing::debug!(payment_id = %payment.id, "payment settled concurrently");
            return self.reload(payment.id).await;
        }

        tracing::info!(
            payment_id = %payment.id,
            provider = %payment.provider,
            purpose = %payment.purpose,
            from = %payment.status,
            to = %next,
            "payment settled"
        );
        match next {
            PaymentStatus::Completed => self.on_completed(&payment).await?,
            PaymentStatus::Failed => self.on_failed(&payment).await?,
            PaymentStatus::Pending => {}
        }
        self.reload(payment.id).await
    }

    async fn reload(&self, payment_id: Uuid) -> Result<Payment> {
        self.store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("payment {} vanished", payment_id)))
    }

    async fn on_completed(&self, payment: &Payment) -> Result<()> {
        match payment.purpose {
            Purpose::Donation => {
                self.store
                    .set_donation_status(payment.id, PaymentStatus::Completed)
                    .await?
            }
            Purpose::Subscription => self.activate_subscription(payment).await?,
        }
        self.record_revenue(payment).await
    }

    async fn on_failed(&self, payment: &Payment) -> Result<()> {
        match payment.purpose {
            Purpose::Donation => {
                self.store
                    .set_donation_status(payment.id, PaymentStatus::Failed)
                    .await
            }
            Purpose::Subscription => {
                let Some(mut sub) = self.store.find_subscription_by_payment(payment.id).await?
                else {
                    return Ok(());
                };
                let now = Utc::now();
                // a failed renewal does not take away time already paid for
                if !sub.is_entitled(now) {
                    sub.status = SubscriptionStatus::Failed;
                    sub.updated_at = now;
                    self.store.update_subscription(&sub).await?;
                }
                Ok(())
            }
        }
    }

    async fn activate_subscription(&self, payment: &Payment) -> Result<()> {
        let sub = match self.store.find_subscription_by_payment(payment.id).await? {
            Some(sub) => Some(sub),
            // superseded by a newer attempt, but the money still arrived
            None => {
                self.store
                    .find_subscription(payment.user_id, payment.artist_id)
                    .await?
            }
        };
        let Some(mut sub) = sub else {
            tracing::warn!(payment_id = %payment.id, "completed subscription payment has no subscription");
            return Ok(());
        };
        if sub.status == SubscriptionStatus::Active && sub.payment_id == Some(payment.id) {
            tracing::debug!(subscription_id = %sub.id, "subscription already activated by this payment");
            return Ok(());
        }

        let now = Utc::now();
        let base = sub.current_period_end.map_or(now, |end| end.max(now));
        let period_end = sub.plan.period_end(base);
        sub.status = SubscriptionStatus::Active;
        sub.current_period_end = Some(period_end);
        sub.payment_id = Some(payment.id);
        sub.updated_at = now;
        self.store.update_subscription(&sub).await?;
        tracing::info!(subscription_id = %sub.id, until = %period_end, "subscription active");
        Ok(())
    }

    async fn record_revenue(&self, payment: &Payment) -> Result<()> {
        let split = self.billing.fees.split(payment.amount_minor)?;
        let txn = RevenueTransaction {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            artist_id: payment.artist_id,
            kind: payment.purpose,
            gross_minor: payment.amount_minor,
            platform_fee_minor: split.platform_fee_minor,
            artist_share_minor: split.artist_share_minor,
            currency: payment.currency.clone(),
            created_at: Utc::now(),
        };
        if self.store.insert_revenue_transaction(&txn).await? {
            tracing::info!(
                payment_id = %payment.id,
                artist_id = %payment.artist_id,
                gross = txn.gross_minor,
                platform_fee = txn.platform_fee_minor,
                artist_share = txn.artist_share_minor,
                currency = %txn.currency,
                "revenue recorded"
            );
        } else {
            tracing::debug!(payment_id = %payment.id, "revenue already recorded");
        }
        Ok(())
    }
}

fn new_payment(
    user_id: Uuid,
    artist_id: Uuid,
    provider: Provider,
    purpose: Purpose,
    amount: &Money,
) -> Payment {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let provider_reference = match provider {
        Provider::MobileMoney => Uuid::new_v4().to_string(),
        Provider::Paypal => format!("{}{}", UNASSIGNED_ORDER_PREFIX, id),
    };
    Payment {
        id,
        user_id,
        artist_id,
        provider,
        purpose,
        provider_reference,
        amount_minor: amount.minor,
        currency: amount.currency.clone(),
        status: PaymentStatus::Pending,
        provider_transaction_id: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    }
}

fn ensure_owner(payment: &Payment, user_id: Uuid, order_id: &str) -> Result<()> {
    if payment.user_id != user_id {
        return Err(AppError::NotFound(format!("paypal order {}", order_id)));
    }
    Ok(())
}

/// Digits only, international format without the leading `+`.
fn normalize_msisdn(raw: &str) -> Result<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid phone number",
            raw.trim()
        )));
    }
    Ok(digits.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msisdn_is_normalized() {
        assert_eq!(normalize_msisdn("+256 774-290781").unwrap(), "256774290781");
        assert_eq!(normalize_msisdn("46733123453").unwrap(), "46733123453");
        assert!(normalize_msisdn("12345").is_err());
        assert!(normalize_msisdn("+256abc290781").is_err());
    }

    #[test]
    fn paypal_payments_start_without_an_order() {
        let amount = Money::new(500, "usd").unwrap();
        let p = new_payment(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Provider::Paypal,
            Purpose::Donation,
            &amount,
        );
        assert!(p.provider_reference.starts_with(UNASSIGNED_ORDER_PREFIX));
        assert_eq!(p.currency, "USD");
        assert_eq!(p.status, PaymentStatus::Pending);

        let m = new_payment(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Provider::MobileMoney,
            Purpose::Donation,
            &amount,
        );
        assert!(Uuid::parse_str(&m.provider_reference).is_ok());
    }
}
