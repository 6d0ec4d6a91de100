use crate::error::SinkError;

/// 完成信号：随写请求一并提交的零参延续。
///
/// # 契约说明（What）
/// - 触发即告知生产者“该缓冲已完整交付内核，或写端已失败/关闭”，可以产出
///   下一份缓冲；
/// - 每个被接收的请求，其信号至多触发一次，且一定在事件循环的执行流上；
/// - 唯一不触发的场景是显式关闭／注销导致的在途请求废弃（生产者一旦观察到
///   关闭，即不再被欠任何完成信号）。
///
/// `FnOnce` 所有权本身保证了“至多一次”。
pub type CompletionSignal = Box<dyn FnOnce() + 'static>;

/// 错误通道钩子：生产者/消费者共享的错误上报入口。
///
/// # 契约说明（What）
/// - 写路径对一次生命周期内至多上报一个错误，上报后写端随即进入终态；
/// - 钩子在内部借用全部释放后才被调用，可以安全地重入写端接口（例如在
///   钩子里补一次 `close`）。
pub type ErrorHook = Box<dyn FnMut(SinkError) + 'static>;
