//! gatehouse web server.
//!
//! A small session gateway: visitors sign in through an OpenID Connect
//! provider, their identity claims are kept in a signed cookie, and access
//! to the protected resource is written to the audit log.

pub mod app;
pub mod auth;
pub mod config;
pub mod pages;
pub mod redirect;

#[cfg(test)]
mod test_support;
