//! zufall-signaling – Matchmaking und Signaling-Relay
//!
//! Dieser Crate paart anonyme Browser-Clients zu 1:1-Sessions und leitet
//! die Handshake-Daten weiter, die fuer eine direkte Peer-Verbindung noetig
//! sind. Zusaetzlich: Chat-Relay zwischen Partnern, Moderator-Login,
//! Origin-Bans und periodische Presence-Snapshots.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (SignalingServer, axum)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- SessionHandler    (join_queue, next, signal, send_message)
//!     +-- ModerationHandler (admin_login, admin_ban_user)
//!     |
//!     v
//! SignalingState
//!     +-- Mutex<Matchmaker>
//!     |       +-- ConnectionRegistry  (ClientId -> Origin, Zustand)
//!     |       +-- WaitQueue           (FIFO, Paarung)
//!     |       +-- BanStore            (gesperrte Origins)
//!     +-- EventBroadcaster            (Send-Queues, Moderatoren)
//!     +-- ModeratorAuth
//!
//! Snapshot-Task – sendet alle N Sekunden stats_update an Moderatoren
//! ```

pub mod ban_store;
pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod moderation;
pub mod queue;
pub mod registry;
pub mod relay;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::{Ausgehend, EventBroadcaster};
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use lifecycle::{Ausgang, Matchmaker};
pub use moderation::{snapshot_task_starten, ModeratorAuth, PresenceSnapshot};
pub use registry::{ConnectionRegistry, PresenceState};
pub use server_state::{SignalingConfig, SignalingState};
pub use ws::{NetzwerkKonfig, SignalingServer};
