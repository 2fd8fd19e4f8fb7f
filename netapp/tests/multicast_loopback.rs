//! Multicast loopback: a receiver joins a group on the default interface;
//! a sender with loopback enabled sends into the same group and the
//! receiver observes the frame within a few seconds.

use netapp::facade::MessageDispatcher;
use netapp::multicast::{MulticastReceiver, MulticastSender};
use netcore::endpoint::Endpoint;
use netcore::options::MulticastOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::worker::WorkerDestroyPolicy;
use netproto::codec::MessageCodec;
use netproto::header::{ArchiveType, DEFAULT_MAGIC_STRING};
use parking_lot::Mutex;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn wait_for<F: FnMut() -> bool>(mut ready: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !ready() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}

#[test]
fn receiver_sees_looped_back_send_within_three_seconds() {
    let port = portpicker::pick_unused_port().expect("no ports available");
    let group = Ipv4Addr::new(226, 0, 0, 1);
    let reactor = Arc::new(ReactorPool::new(2));

    let codec = Arc::new(MessageCodec::new(DEFAULT_MAGIC_STRING, Ipv4Addr::UNSPECIFIED, 0).unwrap());
    let dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
    let hit = Arc::new(Mutex::new(false));
    {
        let hit = hit.clone();
        dispatcher
            .register_handler(1, move |_msg| {
                *hit.lock() = true;
                true
            })
            .unwrap();
    }

    let receiver = MulticastReceiver::join(Ipv4Addr::UNSPECIFIED, port, group, None, codec.clone(), dispatcher.on_message(), reactor.clone()).unwrap();

    let options = MulticastOptions {
        loopback: true,
        ..MulticastOptions::default()
    };
    let sender = MulticastSender::new(Endpoint::new(group, port), options, None, reactor.clone()).unwrap();
    let frame = codec.build_header_only(1, ArchiveType::Raw, Ipv4Addr::UNSPECIFIED, 0).unwrap();
    assert!(sender.send(&frame));

    assert!(wait_for(|| *hit.lock(), Duration::from_secs(3)), "expected loopback delivery within 3 seconds");

    drop(receiver);
    // Wake the still-pending recv on the joined group so the reactor pool
    // can shut its background task down cleanly.
    assert!(sender.send(&codec.build_header_only(1, ArchiveType::Raw, Ipv4Addr::UNSPECIFIED, 0).unwrap()));
    std::thread::sleep(Duration::from_millis(50));
}
