//! # Event Bus Module
//!
//! Change notifications emitted after waypoint and membership mutations, for
//! the rendering layer to redraw.
//!
//! ## Overview
//!
//! - Publishers emit typed [`DiagramEvent`]s without knowing subscribers
//! - Subscribers filter by [`EventCategory`] and receive events synchronously
//! - Async consumers can poll a broadcast receiver instead
//!
//! ## Usage
//!
//! ```rust,ignore
//! use erkit_core::event_bus::{DiagramEvent, EventBus, EventCategory, EventFilter};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Routing]),
//!     |event| {
//!         if let DiagramEvent::WaypointsChanged { connection, .. } = event {
//!             println!("redraw {connection}");
//!         }
//!     },
//! );
//!
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
