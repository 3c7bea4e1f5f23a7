// src/proxy/mod.rs

//! Runtime side of system-auto nodes.
//!
//! Proxy nodes and automation steps are approval nodes whose only approver
//! is `sys_auto`. When one starts, the engine creates its task a little
//! later; [`ProxyAutoPass`] waits for that task and passes it.

pub mod autopass;

pub use autopass::{AutoPassHandle, AutoPassStatus, ProxyAutoPass};
