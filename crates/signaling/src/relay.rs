//! Signal-Relay – Weiterleitung von Handshake-Daten und Chat-Text
//!
//! Fire-and-forget: ist der Empfaenger nicht (mehr) verbunden, wird die
//! Nachricht stillschweigend verworfen. Der Absender erfaehrt davon nichts.
//! Absender ohne Registry-Eintrag (z.B. gebannt) werden ebenfalls verworfen.

use serde_json::value::RawValue;
use zufall_core::types::ClientId;
use zufall_protocol::control::ServerMessage;

use crate::lifecycle::Ausgang;
use crate::registry::ConnectionRegistry;

/// Leitet einen opaken Signal-Payload an `an` weiter
///
/// Der Payload wird nicht interpretiert und bleibt byteweise unveraendert.
pub fn signal_weiterleiten(
    registry: &ConnectionRegistry,
    von: ClientId,
    an: ClientId,
    signal: Box<RawValue>,
) -> Option<Ausgang> {
    if !registry.ist_online(&von) {
        tracing::debug!(von = %von, "Signal verworfen: Absender nicht registriert");
        return None;
    }
    if !registry.ist_online(&an) {
        tracing::debug!(von = %von, an = %an, "Signal verworfen: Empfaenger nicht verbunden");
        return None;
    }

    Some(Ausgang::Senden {
        an,
        nachricht: ServerMessage::Signal { from: von, signal },
    })
}

/// Leitet Chat-Text an den aktuellen Partner von `von` weiter
///
/// Der Empfaenger sieht nur das anonyme Label, nie die ClientId.
pub fn chat_weiterleiten(
    registry: &ConnectionRegistry,
    von: ClientId,
    text: String,
) -> Option<Ausgang> {
    let partner = registry.nachschlagen(&von).ok()?.partner()?;
    if !registry.ist_online(&partner) {
        return None;
    }

    Some(Ausgang::Senden {
        an: partner,
        nachricht: ServerMessage::chat(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zufall_protocol::control::STRANGER_LABEL;

    fn roh(text: &str) -> Box<RawValue> {
        RawValue::from_string(text.to_string()).unwrap()
    }

    #[test]
    fn signal_an_lebenden_empfaenger() {
        let mut registry = ConnectionRegistry::neu();
        let a = ClientId::new();
        let b = ClientId::new();
        registry.aufnehmen(a, "1.1.1.1").unwrap();
        registry.aufnehmen(b, "2.2.2.2").unwrap();

        let payload = r#"{"type":"offer","sdp":"v=0"}"#;
        match signal_weiterleiten(&registry, a, b, roh(payload)) {
            Some(Ausgang::Senden {
                an,
                nachricht: ServerMessage::Signal { from, signal },
            }) => {
                assert_eq!(an, b);
                assert_eq!(from, a);
                assert_eq!(signal.get(), payload);
            }
            andere => panic!("Unerwartetes Ergebnis: {:?}", andere),
        }
    }

    #[test]
    fn signal_an_unbekannten_wird_verworfen() {
        let mut registry = ConnectionRegistry::neu();
        let a = ClientId::new();
        registry.aufnehmen(a, "1.1.1.1").unwrap();

        assert!(signal_weiterleiten(&registry, a, ClientId::new(), roh("{}")).is_none());
    }

    #[test]
    fn signal_von_unbekanntem_absender_wird_verworfen() {
        let mut registry = ConnectionRegistry::neu();
        let b = ClientId::new();
        registry.aufnehmen(b, "2.2.2.2").unwrap();

        assert!(signal_weiterleiten(&registry, ClientId::new(), b, roh("{}")).is_none());
    }

    #[test]
    fn chat_geht_nur_an_partner() {
        let mut registry = ConnectionRegistry::neu();
        let a = ClientId::new();
        let b = ClientId::new();
        registry.aufnehmen(a, "1.1.1.1").unwrap();
        registry.aufnehmen(b, "2.2.2.2").unwrap();

        // Ungepaart: nichts
        assert!(chat_weiterleiten(&registry, a, "hi".into()).is_none());

        registry.partner_setzen(&a, Some((b, true))).unwrap();
        registry.partner_setzen(&b, Some((a, false))).unwrap();

        match chat_weiterleiten(&registry, a, "hi".into()) {
            Some(Ausgang::Senden {
                an,
                nachricht: ServerMessage::Message { from, text },
            }) => {
                assert_eq!(an, b);
                assert_eq!(from, STRANGER_LABEL);
                assert_eq!(text, "hi");
            }
            andere => panic!("Unerwartetes Ergebnis: {:?}", andere),
        }
    }
}
