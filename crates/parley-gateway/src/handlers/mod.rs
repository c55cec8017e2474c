//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway API.

pub mod friends;
pub mod health;
pub mod messages;
pub mod users;
pub mod ws;
