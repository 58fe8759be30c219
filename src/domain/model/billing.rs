use crate::domain::money::Money;
use crate::domain::payment::{PaymentStatus, Provider, Purpose};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    /// Paying user.
    pub user_id: Uuid,
    /// Artist who receives the artist share once completed.
    pub artist_id: Uuid,
    pub provider: Provider,
    pub purpose: Purpose,
    /// Mobile money `X-Reference-Id`, or PayPal order id.
    pub provider_reference: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn money(&self) -> Money {
        Money {
            minor: self.amount_minor,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Donation {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub donor_id: Uuid,
    pub artist_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub message: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Monthly,
    Yearly,
}

text_enum!(Plan {
    Monthly => "monthly",
    Yearly => "yearly",
});

impl Plan {
    /// End of one billing period starting at `from`.
    pub fn period_end(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            Plan::Monthly => Months::new(1),
            Plan::Yearly => Months::new(12),
        };
        from.checked_add_months(months).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
    Expired,
    Failed,
}

text_enum!(SubscriptionStatus {
    Pending => "pending",
    Active => "active",
    Cancelled => "cancelled",
    Expired => "expired",
    Failed => "failed",
});

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub artist_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    /// Payment that most recently paid for this subscription.
    pub payment_id: Option<Uuid>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Active or cancelled subscriptions keep access until the paid period ends.
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Cancelled
        ) && self.current_period_end.is_some_and(|end| end > now)
    }

    /// Status as seen at `now`; paid periods that ran out read as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        match self.status {
            SubscriptionStatus::Active | SubscriptionStatus::Cancelled
                if !self.is_entitled(now) =>
            {
                SubscriptionStatus::Expired
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevenueTransaction {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub artist_id: Uuid,
    pub kind: Purpose,
    pub gross_minor: i64,
    pub platform_fee_minor: i64,
    pub artist_share_minor: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Per-currency totals of an artist's revenue transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RevenueSummary {
    pub currency: String,
    pub transactions: i64,
    pub gross_minor: i64,
    pub platform_fee_minor: i64,
    pub artist_share_minor: i64,
}

impl RevenueSummary {
    pub fn from_transactions(txns: &[RevenueTransaction]) -> Vec<RevenueSummary> {
        let mut out: Vec<RevenueSummary> = Vec::new();
        for t in txns {
            let entry = match out.iter_mut().position(|s| s.currency == t.currency) {
                Some(i) => &mut out[i],
                None => {
                    out.push(RevenueSummary {
                        currency: t.currency.clone(),
                        transactions: 0,
                        gross_minor: 0,
                        platform_fee_minor: 0,
                        artist_share_minor: 0,
                    });
                    let last = out.len() - 1;
                    &mut out[last]
                }
            };
            entry.transactions += 1;
            entry.gross_minor += t.gross_minor;
            entry.platform_fee_minor += t.platform_fee_minor;
            entry.artist_share_minor += t.artist_share_minor;
        }
        out.sort_by(|a, b| a.currency.cmp(&b.currency));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(status: SubscriptionStatus, end: Option<DateTime<Utc>>) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            subscriber_id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
            plan: Plan::Monthly,
            status,
            payment_id: None,
            current_period_end: end,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn monthly_period_clamps_to_month_end() {
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let end = Plan::Monthly.period_end(jan31);
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());
        let yearly = Plan::Yearly.period_end(jan31);
        assert_eq!(yearly, Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn cancelled_subscription_keeps_access_until_period_end() {
        let now = Utc::now();
        let sub = subscription(
            SubscriptionStatus::Cancelled,
            Some(now + chrono::Duration::days(3)),
        );
        assert!(sub.is_entitled(now));
        assert_eq!(sub.effective_status(now), SubscriptionStatus::Cancelled);
        let later = now + chrono::Duration::days(4);
        assert!(!sub.is_entitled(later));
        assert_eq!(sub.effective_status(later), SubscriptionStatus::Expired);
    }

    #[test]
    fn pending_subscription_is_not_entitled() {
        let sub = subscription(SubscriptionStatus::Pending, None);
        assert!(!sub.is_entitled(Utc::now()));
        assert_eq!(sub.effective_status(Utc::now()), SubscriptionStatus::Pending);
    }

    #[test]
    fn summary_groups_by_currency() {
        let now = Utc::now();
        let txn = |gross: i64, fee: i64, currency: &str| RevenueTransaction {
            id: Uuid::new_v4(),
            payment_id: Uuid::new_v4(),
            artist_id: Uuid::nil(),
            kind: Purpose::Donation,
            gross_minor: gross,
            platform_fee_minor: fee,
            artist_share_minor: gross - fee,
            currency: currency.to_string(),
            created_at: now,
        };
        let summary = RevenueSummary::from_transactions(&[
            txn(1000, 100, "USD"),
            txn(5000, 500, "UGX"),
            txn(250, 25, "USD"),
        ]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].currency, "UGX");
        assert_eq!(summary[1].transactions, 2);
        assert_eq!(summary[1].gross_minor, 1250);
        assert_eq!(summary[1].artist_share_minor, 1125);
    }
}
