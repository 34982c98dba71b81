//! End-to-end tests: a real TCP server driven by `DevClient`.

use std::net::SocketAddr;
use std::sync::Arc;

use devrpc_client::{ClientError, DevClient, DumpRange, dump_device};
use devrpc_kernel::DeviceRegistry;
use devrpc_server::DevRpcServer;
use serde_json::json;
use tokio::net::TcpListener;

async fn start_server() -> (SocketAddr, Arc<DeviceRegistry>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = DevRpcServer::new(Arc::new(DeviceRegistry::with_builtin_types()));
    let registry = server.registry().clone();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    (addr, registry)
}

fn rpc_code(err: ClientError) -> (i32, String) {
    match err {
        ClientError::Rpc(e) => (e.code, e.message),
        other => panic!("expected RPC error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_device_lifecycle() {
    let (addr, registry) = start_server().await;
    let mut client = DevClient::connect(addr).await.unwrap();

    client
        .create("ram0", "RAM", r#"{"size": 8192, "erase_size": 4096}"#)
        .await
        .unwrap();

    let info = client.get_info("ram0").await.unwrap();
    assert_eq!(info.size, 8192);
    assert_eq!(info.erase_sizes, Some(vec![4096]));

    // Fresh RAM devices read back erased.
    assert_eq!(client.read("ram0", 0, 4).await.unwrap(), vec![0xFF; 4]);

    client.write("ram0", 16, b"hello", 0).await.unwrap();
    assert_eq!(client.read("ram0", 16, 5).await.unwrap(), b"hello");

    // Erase-then-write wipes the rest of the sector.
    client.write("ram0", 0, b"ab", 4096).await.unwrap();
    assert_eq!(client.read("ram0", 0, 2).await.unwrap(), b"ab");
    assert_eq!(client.read("ram0", 16, 5).await.unwrap(), vec![0xFF; 5]);

    client.erase("ram0", 0, 4096).await.unwrap();
    assert_eq!(client.read("ram0", 0, 2).await.unwrap(), vec![0xFF; 2]);

    // Every handler released its handle.
    assert_eq!(registry.open_count("ram0"), Some(0));

    client.remove("ram0").await.unwrap();
    let (code, message) = rpc_code(client.get_info("ram0").await.unwrap_err());
    assert_eq!(code, 500);
    assert_eq!(message, "dev open failed");
}

#[tokio::test]
async fn test_error_codes() {
    let (addr, _registry) = start_server().await;
    let mut client = DevClient::connect(addr).await.unwrap();

    let err = client.call("Dev.Create", json!({"name": "x"})).await.unwrap_err();
    let (code, message) = rpc_code(err);
    assert_eq!((code, message.as_str()), (400, "name and type are required"));

    let (code, message) = rpc_code(client.create("x", "SPI", "").await.unwrap_err());
    assert_eq!((code, message.as_str()), (500, "dev creation failed"));

    let (code, _) = rpc_code(client.call("Dev.Format", json!({})).await.unwrap_err());
    assert_eq!(code, 404);

    client.create("ram0", "RAM", r#"{"size": 4096}"#).await.unwrap();
    let (code, message) = rpc_code(client.read("ram0", 0, 0).await.unwrap_err());
    assert_eq!((code, message.as_str()), (400, "name and len are required"));

    let (code, message) = rpc_code(client.read("ram0", 4000, 200).await.unwrap_err());
    assert_eq!((code, message.as_str()), (500, "read error: -1"));

    // Misaligned erase is rejected by the device before the write runs.
    let (code, message) = rpc_code(client.write("ram0", 1, b"z", 100).await.unwrap_err());
    assert_eq!((code, message.as_str()), (500, "erase error: -1"));
    assert_eq!(client.read("ram0", 1, 1).await.unwrap(), vec![0xFF]);

    // The connection stays usable after errors.
    assert_eq!(client.get_info("ram0").await.unwrap().size, 4096);
}

#[tokio::test]
async fn test_concurrent_clients() {
    let (addr, _registry) = start_server().await;
    let mut setup = DevClient::connect(addr).await.unwrap();
    setup.create("ram0", "RAM", r#"{"size": 4096, "erase_size": 256}"#).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..4u8 {
        tasks.push(tokio::spawn(async move {
            let mut client = DevClient::connect(addr).await.unwrap();
            let offset = u64::from(i) * 256;
            client.write("ram0", offset, &[i; 16], 256).await.unwrap();
            client.read("ram0", offset, 16).await.unwrap()
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), vec![i as u8; 16]);
    }
}

#[tokio::test]
async fn test_dump_device() {
    let (addr, _registry) = start_server().await;
    let mut client = DevClient::connect(addr).await.unwrap();
    client.create("ram0", "RAM", r#"{"size": 1000, "erase_size": 8, "fill": 0}"#).await.unwrap();
    client.write("ram0", 990, b"0123456789", 0).await.unwrap();

    let mut whole = Vec::new();
    let n = dump_device(&mut client, "ram0", DumpRange::default(), 64, &mut whole)
        .await
        .unwrap();
    assert_eq!(n, 1000);
    assert_eq!(&whole[990..], b"0123456789");
    assert!(whole[..990].iter().all(|&b| b == 0));

    let mut part = Vec::new();
    let range = DumpRange {
        offset: 992,
        length: Some(4),
    };
    dump_device(&mut client, "ram0", range, 3, &mut part).await.unwrap();
    assert_eq!(part, b"2345");
}

#[tokio::test]
async fn test_large_read() {
    let (addr, _registry) = start_server().await;
    let mut client = DevClient::connect(addr).await.unwrap();
    let size = 4u64 << 20;
    client
        .create("ram0", "RAM", &format!(r#"{{"size": {size}, "fill": 0}}"#))
        .await
        .unwrap();
    client.write("ram0", (2 << 20) - 4, b"tail", 0).await.unwrap();

    // Response line is well over the request frame limit.
    let data = client.read("ram0", 0, 2 << 20).await.unwrap();
    assert_eq!(data.len(), 2 << 20);
    assert_eq!(&data[data.len() - 4..], b"tail");
}

#[tokio::test]
async fn test_dump_zero_length_reads_whole_device() {
    let (addr, _registry) = start_server().await;
    let mut client = DevClient::connect(addr).await.unwrap();
    client.create("ram0", "RAM", r#"{"size": 256, "erase_size": 256}"#).await.unwrap();

    let mut out = Vec::new();
    let range = DumpRange {
        offset: 0,
        length: Some(0),
    };
    assert_eq!(dump_device(&mut client, "ram0", range, 100, &mut out).await.unwrap(), 256);
    assert_eq!(out, vec![0xFF; 256]);
}
