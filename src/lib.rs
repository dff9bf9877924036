pub mod config;
pub mod constant;
pub mod expression;
pub mod filter;
pub mod model;
pub mod predicate;
pub mod query;
pub mod registry;
pub mod subscription;
