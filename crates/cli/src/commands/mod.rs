//! Command handlers, one module per resource

pub mod account;
pub mod admin;
pub mod customer;
pub mod document;
