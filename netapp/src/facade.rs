//! `MessageDispatcher`: wires a transport's `on_message` callback to a
//! [`netcore::worker::MessageQueueWorker`] so application code registers
//! handlers by `message_id` instead of matching on `ReceivedMessage` in the
//! reactor thread itself.

use crate::tcp::connection::OnMessage;
use netcore::error::Result;
use netcore::worker::{MessageQueueWorker, WorkerDestroyPolicy};
use netproto::message::ReceivedMessage;
use std::sync::Arc;

/// Dispatches received messages to per-`message_id` handlers on a
/// dedicated worker thread, decoupling transport reactor threads from
/// application handler code.
pub struct MessageDispatcher {
    worker: MessageQueueWorker<ReceivedMessage>,
}

impl MessageDispatcher {
    pub fn new(destroy_policy: WorkerDestroyPolicy) -> Result<Arc<Self>> {
        let worker = MessageQueueWorker::new(
            |msg: &ReceivedMessage| Some(msg.message_id()),
            |_msg: ReceivedMessage| {},
            destroy_policy,
        )?;
        Ok(Arc::new(Self { worker }))
    }

    /// Bind a handler for `id`. Fails if one is already registered.
    pub fn register_handler(&self, id: u32, handler: impl FnMut(&mut ReceivedMessage) -> bool + Send + 'static) -> Result<()> {
        self.worker.register_handler(id, handler)
    }

    /// The callback to hand to a transport constructor (`TcpServer::new`,
    /// `TcpClient::new`, `UdpReceiver::bind`, `MulticastReceiver::join`, ...).
    #[must_use]
    pub fn on_message(self: &Arc<Self>) -> OnMessage {
        let this = self.clone();
        Arc::new(move |msg: ReceivedMessage| this.worker.push(msg))
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.worker.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcore::endpoint::NULL_CONNECTION;
    use netproto::header::{ArchiveType, MessageHeader, DEFAULT_MAGIC_STRING};
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn registered_handler_observes_pushed_message_id() {
        let dispatcher = MessageDispatcher::new(WorkerDestroyPolicy::ProcessRemaining).unwrap();
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        dispatcher
            .register_handler(666, move |msg| {
                seen2.store(msg.message_id(), Ordering::SeqCst);
                true
            })
            .unwrap();

        let header = MessageHeader::new(DEFAULT_MAGIC_STRING, Ipv4Addr::UNSPECIFIED, 0, 666, ArchiveType::Raw, netproto::header::HEADER_LEN as u32).unwrap();
        let _ = NULL_CONNECTION;
        let msg = ReceivedMessage::new(header, bytes::Bytes::new());
        (dispatcher.on_message())(msg);

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while seen.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(seen.load(Ordering::SeqCst), 666);
    }
}
