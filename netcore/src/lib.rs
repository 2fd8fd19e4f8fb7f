//! Runtime-agnostic building blocks for the async networking core:
//! - Condvar-backed event primitive (`sync_event`)
//! - Blocking/non-blocking MPMC FIFO (`concurrent_queue`)
//! - Dedicated-thread message dispatcher (`worker`)
//! - Pooled `compio` reactor threads (`reactor_pool`)
//! - Per-connection send-buffer pool (`sendpool`)
//! - Endpoint addressing (`endpoint`)
//! - Socket/transport configuration (`options`)
//! - TCP socket helpers (`tcp`)
//! - Error types (`error`)

#![deny(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_pass_by_ref_mut)]
#![allow(clippy::match_same_arms)]

pub mod concurrent_queue;
pub mod endpoint;
pub mod error;
pub mod options;
pub mod reactor_pool;
pub mod sendpool;
pub mod sync_event;
pub mod tcp;
pub mod udp;
pub mod worker;

/// A small prelude to make downstream crates ergonomic.
pub mod prelude {
    pub use crate::concurrent_queue::ConcurrentQueue;
    pub use crate::endpoint::{Endpoint, NULL_CONNECTION};
    pub use crate::error::{NetError, Result};
    pub use crate::options::{
        MulticastOptions, MulticastTtl, NagleOption, SendBufferPoolOptions, TcpOptions, UdpOptions, UdpSendMode,
    };
    pub use crate::reactor_pool::ReactorPool;
    pub use crate::sendpool::{PooledBuffer, SendBufferPool};
    pub use crate::sync_event::{NotifyPolicy, ResetPolicy, SyncEvent};
    pub use crate::worker::{MessageQueueWorker, WorkerDestroyPolicy};
}
