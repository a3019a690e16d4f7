//! Round trips through a daemon listening on a real socket.

use std::sync::Arc;

use rstest::rstest;
use trellis_client::{CallArgs, Client, ClientError, Remote, SocketTransport};
use trellis_config::{Config, SocketEndpoint};
use trellis_wire::{ErrorKind, Tree};
use trellisd::{Daemon, demo, serve};

fn start(endpoint: SocketEndpoint) -> Daemon {
    let config = Config {
        listen_socket: endpoint,
        ..Config::default()
    };
    let namespace = demo::namespace(&config).expect("demo namespace");
    serve(config, Arc::new(namespace)).expect("daemon")
}

fn exercise(client: &Client<SocketTransport>) -> Result<(), ClientError> {
    let Some(Remote::Object(root)) = client.get("/")?.into_object() else {
        panic!("expected the index");
    };
    assert_eq!(root.kind(), "Index");

    let echoed = client.call("/echo", &CallArgs::new().named("value", "over the wire"))?;
    assert_eq!(echoed, Tree::data("over the wire"));

    let error = client.get("/total/_total").expect_err("private");
    assert_eq!(error.remote_kind(), Some(ErrorKind::Forbidden));
    Ok(())
}

#[rstest]
fn tcp_clients_reach_the_namespace() {
    let daemon = start(SocketEndpoint::tcp("127.0.0.1", 0));
    let address = daemon.local_addr().expect("bound address");
    let client = Client::new(SocketTransport::new(SocketEndpoint::tcp(
        address.ip().to_string(),
        address.port(),
    )));

    exercise(&client).expect("round trips");

    daemon.shutdown();
    daemon.join().expect("clean stop");
}

#[cfg(unix)]
#[rstest]
fn unix_clients_reach_the_namespace() {
    let directory = tempfile::tempdir().expect("temp dir");
    let path = directory
        .path()
        .join("trellis.sock")
        .to_str()
        .map(str::to_owned)
        .expect("utf-8 path");
    let daemon = start(SocketEndpoint::unix(path.as_str()));
    let client = Client::new(SocketTransport::new(SocketEndpoint::unix(path.as_str())));

    exercise(&client).expect("round trips");

    daemon.shutdown();
    daemon.join().expect("clean stop");
}
