//! Discord Integration - gateway bot interface
//!
//! This crate provides the Discord interface for rollcall:
//! - **Gateway** (`gateway`) - connection loop with reconnect/backoff
//! - **Slash Commands** (`commands`) - `/attendance` parsing and routing
//! - **Interactions** (`interactions`) - button clicks, event dispatch
//! - **Payloads** (`payloads`) - typed wire shapes (embeds, buttons, replies)
//! - **Service** (`service`) - bridges inbound requests to the core engine
//!
//! # Getting Started
//!
//! 1. Create a Discord app at https://discord.com/developers/applications
//! 2. Register the `/attendance` guild command (`command_definitions()`)
//! 3. Set env vars: `ROLLCALL_DISCORD_BOT_TOKEN`, `ROLLCALL_DISCORD_APPLICATION_ID`
//!
//! # Architecture
//!
//! ```text
//! Gateway Events → EventDispatcher → Handlers → AttendanceService → Core
//!                      ↓
//!              Roster embed + buttons ← RosterView
//! ```
//!
//! # Key Types
//!
//! - `GatewayRunner` - event loop with reconnection logic
//! - `EventDispatcher` - routes envelopes to appropriate handlers
//! - `AttendanceService` - serialized bridge to the attendance engine
//! - `AttendanceCommandService` / `ComponentActionService` - handler traits

pub mod commands;
pub mod gateway;
pub mod interactions;
pub mod payloads;
pub mod service;
