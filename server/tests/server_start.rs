//! Startet den Server auf einem freien Port und prueft die HTTP-Endpunkte

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use zufall_server::{config::ServerConfig, Server};

async fn http_get(adresse: std::net::SocketAddr, pfad: &str) -> String {
    let mut stream = TcpStream::connect(adresse).await.unwrap();
    let anfrage = format!("GET {pfad} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(anfrage.as_bytes()).await.unwrap();

    let mut antwort = String::new();
    stream.read_to_string(&mut antwort).await.unwrap();
    antwort
}

#[tokio::test]
async fn health_und_metrics_erreichbar() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let adresse = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = Server::neu(ServerConfig::default());
    let handle = tokio::spawn(server.mit_listener(listener, async move {
        let _ = stop_rx.await;
    }));

    let health = http_get(adresse, "/health").await;
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");
    assert!(health.contains(r#""status":"healthy""#));
    assert!(health.contains(r#""version":""#));

    let metriken = http_get(adresse, "/metrics").await;
    assert!(metriken.starts_with("HTTP/1.1 200"), "{metriken}");
    assert!(metriken.contains("zufall_online_clients 0"));
    assert!(metriken.contains("zufall_http_requests_total"));

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn ungueltige_konfiguration_startet_nicht() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = ServerConfig::default();
    config.moderation.snapshot_intervall_sek = 0;

    let ergebnis = Server::neu(config)
        .mit_listener(listener, std::future::pending())
        .await;
    assert!(ergebnis.is_err());
}
