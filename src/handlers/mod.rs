// handlers/mod.rs - HTTP handlers by security tier
//
// Public (no auth): root, health
// Protected (JWT auth): auth, sync, roles. Capabilities are resolved from the
// primary store inside each handler; the token only proves identity.
pub mod auth;
pub mod roles;
pub mod root;
pub mod sync;
