//! Router Module Index
//!
//! Splits the HTTP surface in two. Navigable view routes are mounted straight from the route
//! table and always pass through the `route_guard` middleware; API routes carry their own
//! per-handler checks.

/// Routes generated from the route table (`/`, `/login`, `/register`, role homes).
/// Every one of them is wrapped by `route_guard`, so no table path can skip its guard.
pub mod views;

/// JSON endpoints: health, route listing, session inspection and the developer role switch.
pub mod api;
