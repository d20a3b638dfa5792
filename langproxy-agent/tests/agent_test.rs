use langproxy_agent::{run_agent, Args};
use std::time::Duration;
use tokio::net::TcpStream;

#[tokio::test]
async fn test_agent_starts_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        "force_lang: true\ninterception_rules:\n  - pattern: ^/assets/lang.*\n    host: figma.com\n",
    )
    .unwrap();

    let args = Args {
        config: config_path,
        listen_port: Some(19290),
        admin_port: Some(19291),
        ca_dir: Some(dir.path().join("certs")),
        log_level: "info".to_string(),
        ..Default::default()
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(run_agent(args, async {
        let _ = shutdown_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(500)).await;

    TcpStream::connect("127.0.0.1:19290")
        .await
        .expect("proxy should be listening");
    assert!(dir.path().join("certs").join("ca.pem").exists());

    let stats: serde_json::Value = reqwest::get("http://127.0.0.1:19291/stats")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["rules_count"], 1);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("agent did not stop")
        .unwrap()
        .unwrap();
}
