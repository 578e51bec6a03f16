//! End-to-end tests of the reqwest transport against a mock receiver.

use std::sync::Arc;
use std::time::{Duration, Instant};

use denonavr_core::protocol_constants::STATUS_REQUEST;
use denonavr_core::{AvrClient, AvrError, Config, ErrorCode, ReceiverMonitor, ReceiverMonitorConfig};
use denonavr_core::{NoopEventEmitter, ReconcilePhase};
use mockito::Server;

const STATUS_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<rx>
  <cmd>
    <zone1>ON</zone1>
    <zone2>OFF</zone2>
    <zone3>ON</zone3>
  </cmd>
  <cmd>
    <value>1</value>
    <zones>01</zones>
  </cmd>
</rx>"#;

fn client_for(server: &Server) -> Arc<AvrClient> {
    let addr = server.socket_address();
    Arc::new(AvrClient::new(addr.ip().to_string(), addr.port(), &Config::default()).unwrap())
}

#[tokio::test]
async fn update_posts_xml_and_applies_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/goform/AppCommand.xml")
        .match_header("content-type", "application/xml")
        .match_body(STATUS_REQUEST)
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(STATUS_BODY)
        .create_async()
        .await;

    let client = client_for(&server);
    client.update().await.unwrap();

    mock.assert_async().await;
    let snapshot = client.snapshot();
    let power: Vec<bool> = snapshot.zones.iter().map(|z| z.power_on).collect();
    assert_eq!(power, vec![true, false, true]);
    assert!(snapshot.stereo_group.enabled);
    assert_eq!(
        snapshot.stereo_group.member_zones.into_iter().collect::<Vec<_>>(),
        vec![3]
    );
}

#[tokio::test]
async fn zone_power_command_hits_zone_path() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/goform/AppCommand.xml")
        .with_status(200)
        .with_body(STATUS_BODY)
        .create_async()
        .await;
    let command = server
        .mock("GET", "/goform/formiPhoneAppPower.xml?2+PowerOn")
        .with_status(200)
        .with_body("<item/>")
        .create_async()
        .await;

    let client = client_for(&server);
    client.update().await.unwrap();

    let zone2 = client.zone(2).unwrap();
    assert_eq!(zone2.set_power_state(true).await.unwrap(), 200);
    command.assert_async().await;
    assert!(!zone2.is_on());
}

#[tokio::test]
async fn main_power_command_hits_direct_path() {
    let mut server = Server::new_async().await;
    let command = server
        .mock("GET", "/goform/formiPhoneAppDirect.xml?PWSTANDBY")
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    assert_eq!(client.set_main_power(false).await.unwrap(), 200);
    command.assert_async().await;
}

#[tokio::test]
async fn non_200_responses_are_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/goform/AppCommand.xml")
        .with_status(500)
        .with_body(STATUS_BODY)
        .create_async()
        .await;
    server
        .mock("GET", "/goform/formiPhoneAppPower.xml?1+PowerStandby")
        .with_status(404)
        .create_async()
        .await;

    let client = client_for(&server);

    let err = client.update().await.unwrap_err();
    assert!(matches!(err, AvrError::HttpStatus(500)));
    assert_eq!(client.zone_count(), 0);

    let err = client
        .issue_command("/goform/formiPhoneAppPower.xml?1+PowerStandby")
        .await
        .unwrap_err();
    assert!(matches!(err, AvrError::CommandRejected(404)));
}

#[tokio::test]
async fn unreachable_receiver_fails_and_keeps_state() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = Config {
        request_timeout_secs: 1,
        ..Default::default()
    };
    let client = AvrClient::new("127.0.0.1", port, &config).unwrap();

    let err = client.update().await.unwrap_err();
    assert!(matches!(err, AvrError::Http(_)));
    assert!(err.is_recoverable());
    assert!(matches!(
        err.code(),
        "http_request_failed" | "http_timeout"
    ));
    assert_eq!(client.zone_count(), 0);

    // The client stays usable.
    assert!(client.update().await.is_err());
}

#[tokio::test]
async fn silent_receiver_times_out() {
    // Accepts connections (via the backlog) but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = Config {
        request_timeout_secs: 1,
        ..Default::default()
    };
    let client = AvrClient::new("127.0.0.1", port, &config).unwrap();

    let started = Instant::now();
    let err = client.update().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, AvrError::Http(_)));
    assert!(err.is_timeout());
    assert_eq!(err.code(), "http_timeout");
    assert!(elapsed >= Duration::from_millis(900), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(4), "elapsed {:?}", elapsed);
    assert_eq!(client.zone_count(), 0);

    let err = client
        .issue_command("/goform/formiPhoneAppPower.xml?1+PowerOn")
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    drop(listener);
}

#[tokio::test]
async fn monitor_confirms_command_against_receiver() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/goform/AppCommand.xml")
        .with_status(200)
        .with_body(STATUS_BODY)
        .create_async()
        .await;
    let command = server
        .mock("GET", "/goform/formiPhoneAppPower.xml?3+PowerOn")
        .with_status(200)
        .create_async()
        .await;

    let client = client_for(&server);
    let monitor = ReceiverMonitor::new(
        "den",
        Arc::clone(&client),
        Arc::new(NoopEventEmitter),
        ReceiverMonitorConfig {
            settle_delay: Duration::from_millis(20),
            ..Default::default()
        },
    )
    .unwrap();
    monitor.poll().await.unwrap();

    let zone = monitor.set_zone_power_confirmed(3, true).await.unwrap();
    command.assert_async().await;
    assert!(zone.power_on);
    assert_eq!(monitor.zone_phase(3), ReconcilePhase::Stable);
}
