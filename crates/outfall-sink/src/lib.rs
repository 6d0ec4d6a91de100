#![doc = r#"
# outfall-sink

## 设计动机（Why）
- **定位**：该 crate 提供单线程反应器上的非阻塞套接字写路径状态机，
  封装部分写重试、流控让渡与可写观察的启停节拍。
- **架构角色**：消费上游生产者的“单缓冲 + 完成信号”推送协议，对接
  `outfall-core` 的套接字、反应器与错误契约，把字节确定性地排空到内核。
- **设计理念**：观察按需启停。可写通知是水平触发原语，常开会在空闲连接
  上制造通知风暴；写端只在被流控挡住时恢复观察，收到一条通知立刻暂停，
  以边沿式节拍消费水平触发事件。

## 核心契约（What）
- **输入条件**：所有调用发生在反应器线程上；同一时刻至多一份在途缓冲，
  违例按协作者缺陷立即恐慌；
- **输出保障**：每份被接收的缓冲要么完整交付后触发完成信号恰好一次，
  要么写端在信号触发前进入终态（显式关闭废弃在途请求，不补发信号）；
  写失败映射为带稳定错误码的 [`SinkError`](outfall_core::SinkError) 并
  恰好一次送入错误通道；
- **前置约束**：终态不可逆，关闭后的提交返回 `sink.closed` 错误。

## 实现策略（How）
- **执行框架**：状态共享在 `Rc<RefCell<_>>` 中，观察回调持弱引用升级后
  驱动状态机，单线程协作模型下无锁；
- **写循环**：部分写在同步循环内收缩 [`Bytes`](bytes::Bytes) 视图重试，
  只有 `WouldBlock` 才让出控制权并恢复观察；
- **重入安全**：完成信号与错误钩子一律在内部借用释放后调用，钩子内可以
  直接发起下一次提交或关闭。

## 风险与考量（Trade-offs）
- **无超时**：对端长期不可写会让写端停留在阻塞态，超时属于上游职责；
- **单缓冲**：不做请求排队，背压经完成信号自然回推给生产者；需要聚合
  时应在生产者一侧合并缓冲。
"#]
#![deny(unsafe_code)]

mod sink;

pub use sink::{SinkPhase, SocketSink};
