//! Handler fuer alle Client-Events
//!
//! Jeder Handler ist fuer eine Gruppe von Events zustaendig und arbeitet
//! ausschliesslich ueber die Operationen des `SignalingState`.

pub mod moderation_handler;
pub mod session_handler;
