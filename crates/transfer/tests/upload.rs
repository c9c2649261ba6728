//! Uploads over real loopback sockets into an `UploadReceiver`.

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uplink_protocol::NamingRule;
use uplink_receiver::{ReceiveError, ReceivedFile, UploadReceiver};
use uplink_transfer::{
    DirStore, FailureKind, Status, TokioStack, UploadConfig, send_file, send_file_ok,
};

async fn receiver(dir: &Path) -> (UploadReceiver, TcpListener, SocketAddr) {
    let receiver = UploadReceiver::new(
        dir.to_path_buf(),
        NamingRule::default(),
        CancellationToken::new(),
    );
    let listener = receiver
        .listen("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    (receiver, listener, addr)
}

fn receive_one(
    receiver: UploadReceiver,
    listener: TcpListener,
) -> JoinHandle<Result<ReceivedFile, ReceiveError>> {
    tokio::spawn(async move { receiver.accept_and_receive(&listener).await })
}

fn write_file(dir: &Path, name: &str, data: &[u8]) {
    std::fs::write(dir.join(name), data).unwrap();
}

#[tokio::test]
async fn file_arrives_intact() {
    let outbox = tempfile::tempdir().unwrap();
    let inbox = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    write_file(outbox.path(), "00001.SST", &data);

    let (receiver, listener, addr) = receiver(inbox.path()).await;
    let server = receive_one(receiver, listener);

    let mut stack = TokioStack::default();
    let store = DirStore::new(outbox.path());
    let summary = send_file(
        &mut stack,
        &store,
        &UploadConfig::with_server(addr),
        "00001.SST",
    )
    .await
    .unwrap();

    assert_eq!(summary.sent_len, data.len() as u64);
    assert_eq!(summary.trail.last(), Some(&Status::Success));

    let received = server.await.unwrap().unwrap();
    assert_eq!(received.name, "00001.SST");
    assert_eq!(received.bytes, data.len() as u64);
    assert_eq!(std::fs::read(inbox.path().join("00001.SST")).unwrap(), data);
}

#[tokio::test]
async fn empty_file_sends_header_only() {
    let outbox = tempfile::tempdir().unwrap();
    let inbox = tempfile::tempdir().unwrap();
    write_file(outbox.path(), "00000.SST", b"");

    let (receiver, listener, addr) = receiver(inbox.path()).await;
    let server = receive_one(receiver, listener);

    let mut stack = TokioStack::default();
    let store = DirStore::new(outbox.path());
    let summary = send_file(
        &mut stack,
        &store,
        &UploadConfig::with_server(addr),
        "00000.SST",
    )
    .await
    .unwrap();
    assert_eq!(summary.data_len, 0);

    let received = server.await.unwrap().unwrap();
    assert_eq!(received.bytes, 0);
    assert!(std::fs::read(&received.path).unwrap().is_empty());
}

#[tokio::test]
async fn small_send_buffer_needs_many_writes() {
    let outbox = tempfile::tempdir().unwrap();
    let inbox = tempfile::tempdir().unwrap();
    let data = vec![0x5au8; 50_000];
    write_file(outbox.path(), "12345.SST", &data);

    let (receiver, listener, addr) = receiver(inbox.path()).await;
    let server = receive_one(receiver, listener);

    let mut config = UploadConfig::with_server(addr);
    config.read_buf_len = 300;
    config.send_buffer_len = 128;
    let mut stack = TokioStack::new(config.send_buffer_len);
    let store = DirStore::new(outbox.path());

    let summary = send_file(&mut stack, &store, &config, "12345.SST")
        .await
        .unwrap();
    assert_eq!(summary.sent_len, 50_000);

    let received = server.await.unwrap().unwrap();
    assert_eq!(std::fs::read(received.path).unwrap(), data);
}

#[tokio::test]
async fn refused_connection_is_a_connect_failure() {
    let outbox = tempfile::tempdir().unwrap();
    write_file(outbox.path(), "00001.SST", b"data");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut stack = TokioStack::default();
    let store = DirStore::new(outbox.path());
    let err = send_file(
        &mut stack,
        &store,
        &UploadConfig::with_server(addr),
        "00001.SST",
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Connect);
    assert_eq!(err.status(), Some(Status::Init));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn peer_dropping_the_connection_fails_the_upload() {
    let outbox = tempfile::tempdir().unwrap();
    write_file(outbox.path(), "00002.SST", &vec![1u8; 16 * 1024 * 1024]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let mut config = UploadConfig::with_server(addr);
    config.send_buffer_len = 16 * 1024;
    let mut stack = TokioStack::new(config.send_buffer_len);
    let store = DirStore::new(outbox.path());

    let err = send_file(&mut stack, &store, &config, "00002.SST")
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(matches!(
        err.kind(),
        FailureKind::RemoteClosed | FailureKind::Aborted | FailureKind::Write
    ));
}

#[tokio::test]
async fn stack_is_reusable_across_uploads() {
    let outbox = tempfile::tempdir().unwrap();
    let inbox = tempfile::tempdir().unwrap();
    write_file(outbox.path(), "00001.SST", b"first");
    write_file(outbox.path(), "00002.SST", b"second");

    let (receiver, listener, addr) = receiver(inbox.path()).await;
    let server = tokio::spawn(async move {
        let a = receiver.accept_and_receive(&listener).await.unwrap();
        let b = receiver.accept_and_receive(&listener).await.unwrap();
        (a, b)
    });

    let mut stack = TokioStack::default();
    let store = DirStore::new(outbox.path());
    let config = UploadConfig::with_server(addr);
    assert!(send_file_ok(&mut stack, &store, &config, "00001.SST").await);
    assert!(send_file_ok(&mut stack, &store, &config, "00002.SST").await);

    let (a, b) = server.await.unwrap();
    assert_eq!(std::fs::read(a.path).unwrap(), b"first");
    assert_eq!(std::fs::read(b.path).unwrap(), b"second");
}
