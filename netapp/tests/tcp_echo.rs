//! TCP echo: a client sends a typed body to a server, the server's handler
//! echoes a body-less reply back, and the client observes it.

use netapp::facade::MessageDispatcher;
use netapp::tcp::{TcpClient, TcpServer};
use netcore::endpoint::Endpoint;
use netcore::options::TcpOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::worker::WorkerDestroyPolicy;
use netproto::codec::MessageCodec;
use netproto::header::{ArchiveType, DEFAULT_MAGIC_STRING};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Sample {
    name: String,
    data: Vec<f64>,
}

fn wait_for<F: FnMut() -> bool>(mut ready: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !ready() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn server_echoes_to_its_bound_endpoint() {
    let port = portpicker::pick_unused_port().expect("no ports available");
    let listen = Endpoint::new(Ipv4Addr::LOCALHOST, port);

    let reactor = Arc::new(ReactorPool::new(4));

    // Server's fallback is its own bound endpoint, so a header-only reply
    // built with a null response endpoint resolves to exactly that.
    let server_codec = Arc::new(MessageCodec::new(DEFAULT_MAGIC_STRING, Ipv4Addr::LOCALHOST, port).unwrap());
    let server_dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
    let received_body: Arc<Mutex<Option<Sample>>> = Arc::new(Mutex::new(None));
    let server_slot: Arc<Mutex<Option<Arc<TcpServer>>>> = Arc::new(Mutex::new(None));

    {
        let received_body = received_body.clone();
        let server_slot = server_slot.clone();
        let server_codec = server_codec.clone();
        server_dispatcher
            .register_handler(666, move |msg| {
                let sample: Sample = server_codec.deserialize(msg).unwrap();
                *received_body.lock() = Some(sample);
                let reply = server_codec
                    .build_header_only(666, ArchiveType::Raw, Ipv4Addr::UNSPECIFIED, 0)
                    .unwrap();
                if let Some(server) = server_slot.lock().as_ref() {
                    server.send_to_all_clients(&reply);
                }
                true
            })
            .unwrap();
    }

    let server = TcpServer::new(TcpOptions::default(), server_codec, server_dispatcher.on_message(), reactor.clone());
    *server_slot.lock() = Some(server.clone());
    assert!(server.bind(listen.clone()));

    let client_codec = Arc::new(MessageCodec::new(DEFAULT_MAGIC_STRING, Ipv4Addr::UNSPECIFIED, 0).unwrap());
    let client_dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
    let seen_response: Arc<Mutex<Option<Endpoint>>> = Arc::new(Mutex::new(None));
    {
        let seen_response = seen_response.clone();
        client_dispatcher
            .register_handler(666, move |msg| {
                *seen_response.lock() = Some(Endpoint::new(msg.header.response_address, msg.header.response_port));
                true
            })
            .unwrap();
    }

    let client = TcpClient::new(listen.clone(), TcpOptions::default(), client_codec.clone(), client_dispatcher.on_message(), reactor.clone());

    let body = Sample {
        name: "X".into(),
        data: vec![1.0, 2.0],
    };
    let frame = client_codec
        .build(666, ArchiveType::PortableBinary, Ipv4Addr::UNSPECIFIED, 0, &body)
        .unwrap();
    assert!(client.send_sync(&frame));

    wait_for(|| received_body.lock().is_some() && seen_response.lock().is_some());

    assert_eq!(received_body.lock().clone(), Some(body));
    assert_eq!(seen_response.lock().clone(), Some(listen.clone()));

    client.close();
    server.registry().close_all();
    server.close_acceptor();
}
