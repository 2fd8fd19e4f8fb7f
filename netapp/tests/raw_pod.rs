//! Raw POD: `archive_type = raw` passes an already-serialized byte buffer
//! straight through; the receiver gets back the identical bytes and a
//! `#[repr(C)]` struct read from them compares field-for-field equal.

use netapp::facade::MessageDispatcher;
use netapp::udp::{UdpReceiver, UdpSender};
use netcore::endpoint::Endpoint;
use netcore::options::UdpOptions;
use netcore::reactor_pool::ReactorPool;
use netcore::worker::WorkerDestroyPolicy;
use netproto::codec::MessageCodec;
use netproto::header::DEFAULT_MAGIC_STRING;
use parking_lot::Mutex;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
struct PodSample {
    id: u32,
    value: u32,
}

fn pod_bytes(pod: &PodSample) -> &[u8] {
    // Safety: `PodSample` is `#[repr(C)]` and contains only `u32` fields, so
    // its in-memory layout has no padding and no niches to misinterpret.
    unsafe { std::slice::from_raw_parts((pod as *const PodSample).cast::<u8>(), std::mem::size_of::<PodSample>()) }
}

fn bytes_to_pod(bytes: &[u8]) -> PodSample {
    assert_eq!(bytes.len(), std::mem::size_of::<PodSample>());
    // Safety: length was just checked; `read_unaligned` tolerates any
    // alignment of `bytes.as_ptr()`.
    unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<PodSample>()) }
}

fn wait_for<F: FnMut() -> bool>(mut ready: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !ready() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn raw_body_compares_field_for_field_equal() {
    let port = portpicker::pick_unused_port().expect("no ports available");
    let reactor = Arc::new(ReactorPool::new(2));

    let codec = Arc::new(MessageCodec::new(DEFAULT_MAGIC_STRING, Ipv4Addr::UNSPECIFIED, 0).unwrap());
    let dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
    let received: Arc<Mutex<Option<PodSample>>> = Arc::new(Mutex::new(None));
    {
        let received = received.clone();
        dispatcher
            .register_handler(5, move |msg| {
                *received.lock() = Some(bytes_to_pod(&msg.body));
                true
            })
            .unwrap();
    }

    let receiver = UdpReceiver::bind(port, UdpOptions::default(), codec.clone(), dispatcher.on_message(), reactor.clone()).unwrap();
    let local = receiver.local_endpoint();

    let sender = UdpSender::new(Endpoint::new(Ipv4Addr::LOCALHOST, port), UdpOptions::default(), reactor.clone()).unwrap();
    let original = PodSample { id: 7, value: 0xDEAD_BEEF };
    let frame = codec.build_raw(5, Ipv4Addr::UNSPECIFIED, 0, pod_bytes(&original)).unwrap();
    assert!(sender.send(&frame));

    wait_for(|| received.lock().is_some());
    assert_eq!(received.lock().clone(), Some(original));

    drop(receiver);
    let waker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let _ = waker.send_to(&[0u8; 4], local.to_socket_addr());
    std::thread::sleep(Duration::from_millis(50));
}
