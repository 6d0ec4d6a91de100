#![deny(unsafe_code)]
#![doc = "outfall-core: 非阻塞套接字写路径的协作者契约、完成信号与稳定错误域。"]
#![doc = ""]
#![doc = "== 职责边界 =="]
#![doc = "本 crate 只定义写路径消费的外部协作者契约（套接字写端、反应器与可写观察）、"]
#![doc = "上下游交互的信号类型（完成信号、错误通道钩子）以及稳定错误域。"]
#![doc = "状态机实现位于 `outfall-sink`；连接建立、读取与事件循环调度不属于本工作区。"]
#![doc = ""]
#![doc = "== 并发模型 =="]
#![doc = "所有契约面向单线程协作式反应器：回调类型刻意不要求 `Send`，"]
#![doc = "实现与测试桩均可直接使用 `Rc`/`RefCell` 共享状态。"]

pub mod error;
pub mod reactor;
pub mod signal;
pub mod socket;

/// 测试桩集合：脚本化套接字与手动泵动的反应器。
///
/// # 使用方式（How）
/// - 通过 `use outfall_core::test_stubs::*;` 引入需要的桩类型；
/// - 桩同样遵守契约文本，可用来验证调用方守约与否。
pub mod test_stubs;

pub use error::{ErrorCategory, ErrorCause, Result, SinkError, codes};
pub use reactor::{Reactor, WatchCallback, WatchNotice, WriteWatch};
pub use signal::{CompletionSignal, ErrorHook};
pub use socket::{Socket, SocketId, WriteOutcome};
