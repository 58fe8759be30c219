//! Payment lifecycle: local statuses, gateway statuses, and the settlement transition.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    MobileMoney,
    Paypal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Donation,
    Subscription,
}

/// Status as reported by a gateway, collapsed to what settlement cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply(PaymentStatus),
    /// Nothing to do (already in that state, or the gateway is still pending).
    Noop,
    /// Gateway reported something that would regress a terminal state.
    Ignored,
}

/// Decides what a gateway report does to a local payment.
///
/// Completed is terminal. A failed payment may still complete, since the gateway
/// can report success after we gave up waiting.
pub fn transition(current: PaymentStatus, remote: RemoteStatus) -> Transition {
    match (current, remote) {
        (_, RemoteStatus::Pending) => Transition::Noop,
        (PaymentStatus::Pending, RemoteStatus::Completed) => {
            Transition::Apply(PaymentStatus::Completed)
        }
        (PaymentStatus::Pending, RemoteStatus::Failed) => Transition::Apply(PaymentStatus::Failed),
        (PaymentStatus::Failed, RemoteStatus::Completed) => {
            Transition::Apply(PaymentStatus::Completed)
        }
        (PaymentStatus::Completed, RemoteStatus::Completed)
        | (PaymentStatus::Failed, RemoteStatus::Failed) => Transition::Noop,
        (PaymentStatus::Completed, RemoteStatus::Failed) => Transition::Ignored,
    }
}

impl RemoteStatus {
    /// Mobile money request-to-pay status.
    pub fn from_mobile_money(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "SUCCESSFUL" => RemoteStatus::Completed,
            "FAILED" | "REJECTED" | "TIMEOUT" | "EXPIRED" => RemoteStatus::Failed,
            _ => RemoteStatus::Pending,
        }
    }

    /// PayPal order status. An approved order still needs a capture.
    pub fn from_paypal_order(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => RemoteStatus::Completed,
            "VOIDED" => RemoteStatus::Failed,
            _ => RemoteStatus::Pending,
        }
    }

    /// PayPal capture status.
    pub fn from_paypal_capture(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => RemoteStatus::Completed,
            "DECLINED" | "FAILED" => RemoteStatus::Failed,
            _ => RemoteStatus::Pending,
        }
    }
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

text_enum!(Provider {
    MobileMoney => "mobile_money",
    Paypal => "paypal",
});

text_enum!(Purpose {
    Donation => "donation",
    Subscription => "subscription",
});
