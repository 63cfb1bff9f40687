//! SeaORM entity definitions for the mirror schema.

pub mod account;
pub mod charge;
pub mod checkout_session;
pub mod credit_note;
pub mod customer;
pub mod dispute;
pub mod early_fraud_warning;
pub mod invoice;
pub mod managed_webhook;
pub mod object_kind;
pub mod payment_intent;
pub mod payment_method;
pub mod plan;
pub mod prelude;
pub mod price;
pub mod product;
pub mod refund;
pub mod setup_intent;
pub mod subscription;
pub mod subscription_item;
pub mod subscription_schedule;
pub mod sync_obj_run;
pub mod sync_run;
pub mod sync_status;
pub mod tax_id;
