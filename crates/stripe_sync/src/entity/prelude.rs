//! Common re-exports for convenient entity usage.

pub use super::account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as Account,
    Model as AccountModel,
};
pub use super::charge::{
    ActiveModel as ChargeActiveModel, Column as ChargeColumn, Entity as Charge,
    Model as ChargeModel,
};
pub use super::checkout_session::{
    ActiveModel as CheckoutSessionActiveModel, Column as CheckoutSessionColumn,
    Entity as CheckoutSession, Model as CheckoutSessionModel,
};
pub use super::credit_note::{
    ActiveModel as CreditNoteActiveModel, Column as CreditNoteColumn, Entity as CreditNote,
    Model as CreditNoteModel,
};
pub use super::customer::{
    ActiveModel as CustomerActiveModel, Column as CustomerColumn, Entity as Customer,
    Model as CustomerModel,
};
pub use super::dispute::{
    ActiveModel as DisputeActiveModel, Column as DisputeColumn, Entity as Dispute,
    Model as DisputeModel,
};
pub use super::early_fraud_warning::{
    ActiveModel as EarlyFraudWarningActiveModel, Column as EarlyFraudWarningColumn,
    Entity as EarlyFraudWarning, Model as EarlyFraudWarningModel,
};
pub use super::invoice::{
    ActiveModel as InvoiceActiveModel, Column as InvoiceColumn, Entity as Invoice,
    Model as InvoiceModel,
};
pub use super::managed_webhook::{
    ActiveModel as ManagedWebhookActiveModel, Column as ManagedWebhookColumn,
    Entity as ManagedWebhook, Model as ManagedWebhookModel,
};
pub use super::object_kind::{BACKFILL_ORDER, ObjectKind};
pub use super::payment_intent::{
    ActiveModel as PaymentIntentActiveModel, Column as PaymentIntentColumn,
    Entity as PaymentIntent, Model as PaymentIntentModel,
};
pub use super::payment_method::{
    ActiveModel as PaymentMethodActiveModel, Column as PaymentMethodColumn,
    Entity as PaymentMethod, Model as PaymentMethodModel,
};
pub use super::plan::{
    ActiveModel as PlanActiveModel, Column as PlanColumn, Entity as Plan, Model as PlanModel,
};
pub use super::price::{
    ActiveModel as PriceActiveModel, Column as PriceColumn, Entity as Price, Model as PriceModel,
};
pub use super::product::{
    ActiveModel as ProductActiveModel, Column as ProductColumn, Entity as Product,
    Model as ProductModel,
};
pub use super::refund::{
    ActiveModel as RefundActiveModel, Column as RefundColumn, Entity as Refund,
    Model as RefundModel,
};
pub use super::setup_intent::{
    ActiveModel as SetupIntentActiveModel, Column as SetupIntentColumn, Entity as SetupIntent,
    Model as SetupIntentModel,
};
pub use super::subscription::{
    ActiveModel as SubscriptionActiveModel, Column as SubscriptionColumn, Entity as Subscription,
    Model as SubscriptionModel,
};
pub use super::subscription_item::{
    ActiveModel as SubscriptionItemActiveModel, Column as SubscriptionItemColumn,
    Entity as SubscriptionItem, Model as SubscriptionItemModel,
};
pub use super::subscription_schedule::{
    ActiveModel as SubscriptionScheduleActiveModel, Column as SubscriptionScheduleColumn,
    Entity as SubscriptionSchedule, Model as SubscriptionScheduleModel,
};
pub use super::sync_obj_run::{
    ActiveModel as SyncObjRunActiveModel, Column as SyncObjRunColumn, Entity as SyncObjRun,
    Model as SyncObjRunModel, ObjRunStatus,
};
pub use super::sync_run::{
    ActiveModel as SyncRunActiveModel, Column as SyncRunColumn, Entity as SyncRun,
    Model as SyncRunModel,
};
pub use super::sync_status::{
    ActiveModel as SyncStatusActiveModel, Column as SyncStatusColumn, Entity as SyncStatus,
    Model as SyncStatusModel,
};
pub use super::tax_id::{
    ActiveModel as TaxIdActiveModel, Column as TaxIdColumn, Entity as TaxId, Model as TaxIdModel,
};
