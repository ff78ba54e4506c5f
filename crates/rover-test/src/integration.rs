//! End-to-end Integration Test Suite
//!
//! Tests that run both node roles over loopback TCP:
//! - First record becomes the origin
//! - Commands steer the platform and show up in later telemetry
//! - Line framing delivers every record
//! - Reconnect starts a fresh session with a fresh origin

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    use rover_core::{Direction, DEFAULT_LATITUDE, DEFAULT_TEMPERATURE};
    use rover_runtime::ServerConfig;
    use rover_transport::{CloseReason, SessionPhase};
    use rover_wire::Framing;

    use crate::harness::LoopbackHarness;

    const WAIT: Duration = Duration::from_secs(5);

    fn accept_once() -> ServerConfig {
        ServerConfig::default()
    }

    // ========================================================================
    // FIRST CONTACT
    // ========================================================================

    #[tokio::test]
    async fn test_first_record_sets_origin() {
        let harness = LoopbackHarness::start(accept_once()).await.unwrap();
        assert!(!harness.store().origin_set());

        let mut platform = TcpStream::connect(harness.addr()).await.unwrap();
        platform
            .write_all(b"LAT:34.0522;LON:-118.2437;TEMP:25.0;")
            .await
            .unwrap();

        let snap = harness
            .wait_for(WAIT, |s| s.origin_set)
            .await
            .expect("record never arrived");
        assert_eq!(snap.current.latitude, 34.0522);
        assert_eq!(snap.current.longitude, -118.2437);
        assert_eq!(snap.current.temperature, 25.0);
        assert_eq!(snap.origin, snap.current);

        drop(platform);
        let reports = harness.finish().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].records, 1);
        assert_eq!(reports[0].reason, CloseReason::PeerClosed);
    }

    #[tokio::test]
    async fn test_aggregator_streams_into_store() {
        let harness = LoopbackHarness::start(accept_once()).await.unwrap();
        let platform = harness.spawn_aggregator(harness.client_config(Some(20)));

        let snap = harness
            .wait_for(WAIT, |s| s.origin_set && s.current.temperature > s.origin.temperature)
            .await
            .expect("telemetry never advanced");
        // Stationary platform: position holds at the default origin
        assert_eq!(snap.origin.latitude, DEFAULT_LATITUDE);
        assert_eq!(snap.current.latitude, DEFAULT_LATITUDE);
        assert!(snap.origin.temperature > DEFAULT_TEMPERATURE);

        let sent = platform.await.unwrap().unwrap();
        assert_eq!(sent.records_sent, 20);
        assert_eq!(sent.closed, None);

        let reports = harness.finish().await.unwrap();
        assert!(reports[0].records >= 1);
        assert!(reports[0].records <= 20);
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    #[tokio::test]
    async fn test_command_moves_platform() {
        let harness = LoopbackHarness::start(accept_once()).await.unwrap();
        let platform = harness.spawn_aggregator(harness.client_config(Some(400)));

        harness
            .wait_for(WAIT, |s| s.origin_set)
            .await
            .expect("no telemetry");
        assert!(harness.dispatcher().send(Direction::North));

        let snap = harness
            .wait_for(WAIT, |s| s.current.latitude > s.origin.latitude + 5e-5)
            .await
            .expect("command had no effect");
        assert_eq!(snap.current.longitude, snap.origin.longitude);

        assert!(harness.dispatcher().send(Direction::West));
        harness
            .wait_for(WAIT, |s| s.current.longitude < s.origin.longitude - 5e-5)
            .await
            .expect("second command had no effect");

        let sent = platform.await.unwrap().unwrap();
        assert_eq!(sent.commands_applied, 2);

        let reports = harness.finish().await.unwrap();
        assert_eq!(reports[0].commands_sent, 2);
    }

    #[tokio::test]
    async fn test_command_before_connect_is_dropped() {
        let harness = LoopbackHarness::start(accept_once()).await.unwrap();
        let dispatcher = harness.dispatcher().clone();
        assert_eq!(dispatcher.phase(), SessionPhase::Idle);
        assert!(!dispatcher.send(Direction::South));

        let platform = harness.spawn_aggregator(harness.client_config(Some(5)));
        let sent = platform.await.unwrap().unwrap();
        assert_eq!(sent.commands_applied, 0);

        let reports = harness.finish().await.unwrap();
        assert_eq!(reports[0].commands_sent, 0);
        assert_eq!(dispatcher.phase(), SessionPhase::Closed);
        assert!(!dispatcher.send(Direction::South));
    }

    // ========================================================================
    // FRAMING
    // ========================================================================

    #[tokio::test]
    async fn test_line_framing_delivers_every_record() {
        let harness = LoopbackHarness::start(ServerConfig {
            framing: Framing::Line,
            ..accept_once()
        })
        .await
        .unwrap();

        let mut config = harness.client_config(Some(10));
        config.framing = Framing::Line;
        let sent = harness.spawn_aggregator(config).await.unwrap().unwrap();
        assert_eq!(sent.records_sent, 10);

        let reports = harness.finish().await.unwrap();
        assert_eq!(reports[0].records, 10);
        assert_eq!(reports[0].rejected, 0);
        assert_eq!(reports[0].skipped_fields, 0);
    }

    #[tokio::test]
    async fn test_line_framing_store_tracks_last_record() {
        let harness = LoopbackHarness::start(ServerConfig {
            framing: Framing::Line,
            ..accept_once()
        })
        .await
        .unwrap();

        let mut platform = TcpStream::connect(harness.addr()).await.unwrap();
        platform
            .write_all(b"LAT:1.0;LON:2.0;TEMP:30.0;\nLAT:1.5;")
            .await
            .unwrap();
        platform.write_all(b"TEMP:31.0;\n").await.unwrap();

        // The second record overlays the first: LON carries over
        let snap = harness
            .wait_for(WAIT, |s| s.current.temperature == 31.0)
            .await
            .expect("split record never completed");
        assert_eq!(snap.current.latitude, 1.5);
        assert_eq!(snap.current.longitude, 2.0);
        assert_eq!(snap.origin.latitude, 1.0);
        assert_eq!(snap.origin.temperature, 30.0);

        drop(platform);
        let reports = harness.finish().await.unwrap();
        assert_eq!(reports[0].records, 2);
    }

    // ========================================================================
    // RECONNECT
    // ========================================================================

    #[tokio::test]
    async fn test_reconnect_starts_fresh_origin() {
        let harness = LoopbackHarness::start(ServerConfig {
            reconnect: true,
            ..accept_once()
        })
        .await
        .unwrap();

        let mut first = TcpStream::connect(harness.addr()).await.unwrap();
        first.write_all(b"LAT:1.0;LON:1.0;TEMP:10.0;").await.unwrap();
        harness
            .wait_for(WAIT, |s| s.origin_set && s.origin.latitude == 1.0)
            .await
            .expect("first session never delivered");
        drop(first);

        let mut second = TcpStream::connect(harness.addr()).await.unwrap();
        second.write_all(b"LAT:2.0;LON:2.0;TEMP:20.0;").await.unwrap();
        let snap = harness
            .wait_for(WAIT, |s| s.origin_set && s.origin.latitude == 2.0)
            .await
            .expect("second session kept the old origin");
        assert_eq!(snap.current.temperature, 20.0);
        assert!(harness.dispatcher().is_connected());

        drop(second);
        harness.abort();
    }
}
