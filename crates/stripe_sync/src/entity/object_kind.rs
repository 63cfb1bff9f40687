//! Object kind enum - the single source of truth for supported Stripe resources.
//!
//! Every mirrored resource type is a variant here. The backfill order, the
//! REST paths, the mirror table names, and the webhook routing all derive
//! from this enum, so adding a kind means adding a variant plus its entity,
//! projector, and migration columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A top-level Stripe resource type mirrored into its own table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Product,
    Price,
    Plan,
    Customer,
    PaymentMethod,
    Subscription,
    /// Line items of a subscription. Populated by single-hop expansion of
    /// subscription payloads, never backfilled on its own.
    SubscriptionItem,
    SubscriptionSchedule,
    CheckoutSession,
    Invoice,
    Charge,
    PaymentIntent,
    SetupIntent,
    Refund,
    Dispute,
    CreditNote,
    EarlyFraudWarning,
    TaxId,
}

/// Fixed backfill order for `object = all`: parents before children, so that
/// most rows land after the objects they reference and stub writes stay rare.
pub const BACKFILL_ORDER: &[ObjectKind] = &[
    ObjectKind::Product,
    ObjectKind::Price,
    ObjectKind::Plan,
    ObjectKind::Customer,
    ObjectKind::PaymentMethod,
    ObjectKind::Subscription,
    ObjectKind::SubscriptionSchedule,
    ObjectKind::CheckoutSession,
    ObjectKind::Invoice,
    ObjectKind::PaymentIntent,
    ObjectKind::Charge,
    ObjectKind::SetupIntent,
    ObjectKind::Refund,
    ObjectKind::Dispute,
    ObjectKind::CreditNote,
    ObjectKind::EarlyFraudWarning,
    ObjectKind::TaxId,
];

impl ObjectKind {
    /// The `object` discriminator Stripe uses in payloads (singular form).
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Product => "product",
            ObjectKind::Price => "price",
            ObjectKind::Plan => "plan",
            ObjectKind::Customer => "customer",
            ObjectKind::PaymentMethod => "payment_method",
            ObjectKind::Subscription => "subscription",
            ObjectKind::SubscriptionItem => "subscription_item",
            ObjectKind::SubscriptionSchedule => "subscription_schedule",
            ObjectKind::CheckoutSession => "checkout_session",
            ObjectKind::Invoice => "invoice",
            ObjectKind::Charge => "charge",
            ObjectKind::PaymentIntent => "payment_intent",
            ObjectKind::SetupIntent => "setup_intent",
            ObjectKind::Refund => "refund",
            ObjectKind::Dispute => "dispute",
            ObjectKind::CreditNote => "credit_note",
            ObjectKind::EarlyFraudWarning => "early_fraud_warning",
            ObjectKind::TaxId => "tax_id",
        }
    }

    /// Name of the mirror table holding rows of this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            ObjectKind::Product => "products",
            ObjectKind::Price => "prices",
            ObjectKind::Plan => "plans",
            ObjectKind::Customer => "customers",
            ObjectKind::PaymentMethod => "payment_methods",
            ObjectKind::Subscription => "subscriptions",
            ObjectKind::SubscriptionItem => "subscription_items",
            ObjectKind::SubscriptionSchedule => "subscription_schedules",
            ObjectKind::CheckoutSession => "checkout_sessions",
            ObjectKind::Invoice => "invoices",
            ObjectKind::Charge => "charges",
            ObjectKind::PaymentIntent => "payment_intents",
            ObjectKind::SetupIntent => "setup_intents",
            ObjectKind::Refund => "refunds",
            ObjectKind::Dispute => "disputes",
            ObjectKind::CreditNote => "credit_notes",
            ObjectKind::EarlyFraudWarning => "early_fraud_warnings",
            ObjectKind::TaxId => "tax_ids",
        }
    }

    /// REST collection path under `/v1/` used for paginated list calls.
    pub fn api_path(self) -> &'static str {
        match self {
            ObjectKind::Product => "products",
            ObjectKind::Price => "prices",
            ObjectKind::Plan => "plans",
            ObjectKind::Customer => "customers",
            ObjectKind::PaymentMethod => "payment_methods",
            ObjectKind::Subscription => "subscriptions",
            ObjectKind::SubscriptionItem => "subscription_items",
            ObjectKind::SubscriptionSchedule => "subscription_schedules",
            ObjectKind::CheckoutSession => "checkout/sessions",
            ObjectKind::Invoice => "invoices",
            ObjectKind::Charge => "charges",
            ObjectKind::PaymentIntent => "payment_intents",
            ObjectKind::SetupIntent => "setup_intents",
            ObjectKind::Refund => "refunds",
            ObjectKind::Dispute => "disputes",
            ObjectKind::CreditNote => "credit_notes",
            ObjectKind::EarlyFraudWarning => "radar/early_fraud_warnings",
            ObjectKind::TaxId => "tax_ids",
        }
    }

    /// Whether this kind participates in `process_until_done` backfills.
    pub fn is_backfilled(self) -> bool {
        !matches!(self, ObjectKind::SubscriptionItem)
    }

    /// Kinds this kind references by id. Used when
    /// `backfill_related_entities` pulls in parents that were never synced.
    pub fn related_kinds(self) -> &'static [ObjectKind] {
        match self {
            ObjectKind::Price | ObjectKind::Plan => &[ObjectKind::Product],
            ObjectKind::PaymentMethod | ObjectKind::TaxId => &[ObjectKind::Customer],
            ObjectKind::Subscription => &[ObjectKind::Customer, ObjectKind::Price],
            ObjectKind::SubscriptionSchedule | ObjectKind::CheckoutSession => {
                &[ObjectKind::Customer, ObjectKind::Subscription]
            }
            ObjectKind::Invoice => &[ObjectKind::Customer, ObjectKind::Subscription],
            ObjectKind::Charge => &[
                ObjectKind::Customer,
                ObjectKind::Invoice,
                ObjectKind::PaymentIntent,
            ],
            ObjectKind::PaymentIntent => &[ObjectKind::Customer, ObjectKind::Invoice],
            ObjectKind::SetupIntent => &[ObjectKind::Customer, ObjectKind::PaymentMethod],
            ObjectKind::Refund => &[ObjectKind::Charge, ObjectKind::PaymentIntent],
            ObjectKind::Dispute | ObjectKind::EarlyFraudWarning => &[ObjectKind::Charge],
            ObjectKind::CreditNote => &[ObjectKind::Customer, ObjectKind::Invoice],
            _ => &[],
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BACKFILL_ORDER
            .iter()
            .chain([ObjectKind::SubscriptionItem].iter())
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown object kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_order_covers_every_backfilled_kind_once() {
        let mut seen = std::collections::BTreeSet::new();
        for kind in BACKFILL_ORDER {
            assert!(kind.is_backfilled(), "{kind} should not be in the order");
            assert!(seen.insert(*kind), "{kind} appears twice");
        }
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn parents_precede_children_in_backfill_order() {
        let position = |k: ObjectKind| {
            BACKFILL_ORDER
                .iter()
                .position(|c| *c == k)
                .expect("kind in order")
        };
        for kind in BACKFILL_ORDER {
            for parent in kind.related_kinds() {
                assert!(
                    position(*parent) < position(*kind),
                    "{parent} should come before {kind}"
                );
            }
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for kind in BACKFILL_ORDER {
            assert_eq!(kind.as_str().parse::<ObjectKind>().unwrap(), *kind);
        }
        assert_eq!(
            "subscription_item".parse::<ObjectKind>().unwrap(),
            ObjectKind::SubscriptionItem
        );
        assert!("gift_card".parse::<ObjectKind>().is_err());
    }
}
