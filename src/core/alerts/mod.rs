// Real-time alert distribution for new disaster reports.
//
// Architecture:
// - model.rs: Event, notification and delivery types
// - filter.rs: Per-client filter deciding which events surface as notifications
// - hub.rs: Server-side fan-out to connected client sessions
// - wire.rs: JSON frame encoding shared with existing producers
// - listener.rs: Client-side consumption of sessions and raw frames

pub mod filter;
pub mod hub;
pub mod listener;
pub mod model;
pub mod wire;
