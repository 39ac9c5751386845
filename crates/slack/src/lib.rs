//! Slack Integration - Socket Mode karma bot interface
//!
//! This crate connects the karma core to Slack:
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Frames** (`frames`) - Socket Mode wire format and envelope parsing
//! - **Events** (`events`) - Message events routed to handlers
//! - **Web API** (`web`) - `chat.postMessage`, `users.info`, `apps.connections.open`
//! - **Replies** (`replies`) - Flavor-text rendering of karma replies
//! - **Karma** (`karma`) - Glue between message events and `KarmaService`
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to `message.channels` (and friends)
//! 3. Grant the bot `chat:write` and `users:read`
//! 4. Set env vars: `PLUSPLUS_SLACK_APP_TOKEN`, `PLUSPLUS_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Socket Mode → EventDispatcher → KarmaMessageService → KarmaService → PointStore
//!                                        ↓
//!                 chat.postMessage ← ReplyFormatter
//! ```

pub mod events;
pub mod frames;
pub mod karma;
pub mod replies;
pub mod socket;
pub mod web;
