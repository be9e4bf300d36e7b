//! Outward-facing services: the remote adapter, notifications, logging and
//! date helpers.

pub mod api;
pub mod date_utils;
pub mod logging;
pub mod notifications;

pub use api::{ApiClient, Collection, RemoteStore};
pub use notifications::{Notification, NotificationLevel, Notifier};
