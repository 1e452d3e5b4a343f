//! Onboarding engine — context-aware form-schema resolution and flow
//! progress for embedded-finance onboarding.

pub mod context;
pub mod error;
pub mod flow;
pub mod mapping;
pub mod registry;
pub mod rules;
pub mod schema;
