//! UDP broadcast: a sender with `SO_BROADCAST` fires at the limited
//! broadcast address; a receiver bound in broadcast mode on the same port
//! (with `SO_REUSEADDR`) observes the frame.

use netapp::facade::MessageDispatcher;
use netapp::udp::{UdpReceiver, UdpSender};
use netcore::endpoint::Endpoint;
use netcore::options::{UdpOptions, UdpSendMode};
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
    tag: u32,
}

fn wait_for<F: FnMut() -> bool>(mut ready: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !ready() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn broadcast_receiver_observes_the_frame() {
    let port = portpicker::pick_unused_port().expect("no ports available");
    let reactor = Arc::new(ReactorPool::new(2));

    let codec = Arc::new(MessageCodec::new(DEFAULT_MAGIC_STRING, Ipv4Addr::UNSPECIFIED, 0).unwrap());
    let dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
    let received: Arc<Mutex<Option<Sample>>> = Arc::new(Mutex::new(None));
    {
        let received = received.clone();
        let codec = codec.clone();
        dispatcher
            .register_handler(99, move |msg| {
                *received.lock() = Some(codec.deserialize(msg).unwrap());
                true
            })
            .unwrap();
    }

    let broadcast_opts = UdpOptions {
        mode: UdpSendMode::Broadcast,
        ..UdpOptions::default()
    };
    let receiver = UdpReceiver::bind(port, broadcast_opts, codec.clone(), dispatcher.on_message(), reactor.clone()).unwrap();
    let local = receiver.local_endpoint();

    let sender = UdpSender::new(Endpoint::new(Ipv4Addr::new(255, 255, 255, 255), port), broadcast_opts, reactor.clone()).unwrap();
    let body = Sample { tag: 42 };
    let frame = codec.build(99, ArchiveType::PortableBinary, Ipv4Addr::UNSPECIFIED, 0, &body).unwrap();
    assert!(sender.send(&frame));

    wait_for(|| received.lock().is_some());
    assert_eq!(received.lock().clone(), Some(body));

    drop(receiver);
    let waker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let _ = waker.send_to(&[0u8; 4], local.to_socket_addr());
    std::thread::sleep(Duration::from_millis(50));
}
