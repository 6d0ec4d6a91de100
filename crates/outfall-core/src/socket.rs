use std::fmt;
use std::io;

/// 套接字描述符标识，用于向反应器登记可写观察。
///
/// # 契约说明（What）
/// - 标识由套接字实现提供，在其生命周期内保持稳定且进程内唯一；
/// - 本层不解释数值含义（平台上可能是 fd、句柄或任意注册号）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketId(u64);

impl SocketId {
    /// 以原始注册号构造标识。
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 返回原始注册号，供反应器实现登记使用。
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// 单次非阻塞写尝试的结果。
///
/// # 设计背景（Why）
/// - 把“内核暂时收不下”编码为取值而非 `io::Error`，调用方就能用穷举匹配
///   区分流控与真实故障，不必在错误分支里二次判断 `ErrorKind`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 内核接收了 `n` 字节（`n` 不超过本次提交的视图长度）。
    Wrote(usize),
    /// 发送缓冲已满，本次未写入任何字节；调用方应等待下一次可写通知。
    WouldBlock,
}

/// 非阻塞套接字写端契约，写路径消费的唯一 I/O 原语。
///
/// # 设计背景（Why）
/// - 写路径只关心“尝试写、会不会阻塞、写了多少”，连接建立与读取属于
///   其他组件；收窄契约面可以让测试桩与真实实现同样轻量。
///
/// # 契约说明（What）
/// - **前置条件**：实现必须处于非阻塞模式；`try_write` 在任何情况下都不得
///   挂起调用线程；
/// - **后置条件**：`Wrote(n)` 保证 `n <= buf.len()`；实现须把底层的
///   `ErrorKind::WouldBlock` 映射为 `Ok(WriteOutcome::WouldBlock)`，
///   `Err` 只保留真实故障（如连接重置）。
///
/// # 设计取舍与风险（Trade-offs）
/// - `close` 不返回错误：写端拆除属于尽力而为的收尾动作，失败时实现应自行
///   记录日志，调用方没有可行的补救手段。
pub trait Socket {
    /// 返回描述符标识，供构造方登记可写观察。
    fn id(&self) -> SocketId;

    /// 执行一次非阻塞写尝试。
    ///
    /// # 契约说明（What）
    /// - **输入**：`buf` 为本次待写的字节视图，可能是上层请求的尾部切片；
    /// - **返回值**：`Ok(Wrote(n))` 表示内核接收了前 `n` 字节；
    ///   `Ok(WouldBlock)` 表示零字节被接收且应等待可写通知；
    ///   `Err` 表示写端已发生不可恢复故障。
    fn try_write(&mut self, buf: &[u8]) -> io::Result<WriteOutcome>;

    /// 关闭写端底层资源。拆除路径保证恰好调用一次。
    fn close(&mut self);
}
