//! Tests for the relay engine

use std::io;
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_test::io::Builder;
use tunnelproxy::relay::{DirectionEnd, RelayEngine};
use tunnelproxy::ErrorKind;

#[tokio::test]
async fn test_large_transfer_preserves_order() {
    let engine = RelayEngine::with_buffer_size(1024);
    let (mut client, client_side) = duplex(4096);
    let (target_side, mut target) = duplex(4096);

    let relay = tokio::spawn(async move {
        engine.relay(client_side, target_side, "client", "target").await
    });

    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let writer = tokio::spawn(async move {
        client.write_all(&payload).await.unwrap();
        client.shutdown().await.unwrap();
        client
    });

    let mut received = Vec::new();
    timeout(Duration::from_secs(5), target.read_to_end(&mut received))
        .await
        .expect("transfer should complete")
        .unwrap();
    assert_eq!(received, expected);

    let _client = writer.await.unwrap();
    let stats = timeout(Duration::from_secs(5), relay).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.bytes_up, 100_000);
    assert_eq!(stats.bytes_down, 0);
    assert_eq!(stats.upstream_end, DirectionEnd::Eof);
    assert_eq!(stats.downstream_end, DirectionEnd::Closed);
}

#[tokio::test]
async fn test_both_directions_flow_concurrently() {
    let engine = RelayEngine::new();
    let (mut client, client_side) = duplex(1024);
    let (target_side, mut target) = duplex(1024);

    let relay = tokio::spawn(async move {
        engine.relay(client_side, target_side, "client", "target").await
    });

    client.write_all(b"ping").await.unwrap();
    target.write_all(b"pong").await.unwrap();

    let mut buf = [0u8; 4];
    target.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    drop(target);
    let stats = timeout(Duration::from_secs(2), relay).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.bytes_up, 4);
    assert_eq!(stats.bytes_down, 4);
    assert_eq!(stats.downstream_end, DirectionEnd::Eof);
}

#[tokio::test]
async fn test_unexpected_io_error_is_relay_error() {
    let engine = RelayEngine::new();
    let client = Builder::new()
        .read_error(io::Error::new(io::ErrorKind::Other, "tunnel channel corrupted"))
        .build();
    let (target_side, mut target) = duplex(1024);

    let result = timeout(
        Duration::from_secs(2),
        engine.relay(client, target_side, "client", "target"),
    )
    .await
    .expect("relay should stop after the error");

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Relay);

    // The destination was closed as part of tearing down the pair
    let mut rest = Vec::new();
    target.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_connection_reset_is_not_an_error() {
    let engine = RelayEngine::new();
    let client = Builder::new()
        .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
        .build();
    let (target_side, _target) = duplex(1024);

    let stats = timeout(
        Duration::from_secs(2),
        engine.relay(client, target_side, "client", "target"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.upstream_end, DirectionEnd::Failed);
    assert_eq!(stats.downstream_end, DirectionEnd::Closed);
}

#[tokio::test]
async fn test_cancelled_relay_closes_streams() {
    let engine = RelayEngine::new();
    let (_client, client_side) = duplex(1024);
    let (target_side, mut target) = duplex(1024);

    let relay = tokio::spawn(async move {
        engine.relay(client_side, target_side, "client", "target").await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    relay.abort();

    let mut rest = Vec::new();
    timeout(Duration::from_secs(2), target.read_to_end(&mut rest))
        .await
        .expect("aborting the relay should release the destination")
        .unwrap();
}
