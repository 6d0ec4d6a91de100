use crate::socket::SocketId;

/// 可写观察回调收到的通知类别。
///
/// # 契约说明（What）
/// - `Writable`：描述符当前可以继续接收字节，由反应器在观察处于恢复态时派发；
/// - `Cancelled`：注册已被永久注销（注销方可能是持有者自己，也可能是反应器
///   在关停时强制回收），这是该观察派发的最后一条通知。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchNotice {
    Writable,
    Cancelled,
}

/// 可写观察回调。单线程协作式反应器内不存在跨线程派发，因此刻意不要求
/// `Send`，允许闭包直接捕获 `Rc`/`RefCell` 句柄。
pub type WatchCallback = Box<dyn FnMut(WatchNotice) + 'static>;

/// 单个已登记的可写观察句柄，生命周期与派发开关相互独立。
///
/// # 设计背景（Why）
/// - 可写通知是水平触发的：只要发送缓冲有空位，反应器就会持续派发。写路径
///   只在被流控挡住时才需要通知，因此必须能够随时暂停派发而不销毁注册。
///
/// # 契约说明（What）
/// - **前置条件**：注册时观察处于暂停态，`resume` 之前不会派发任何通知；
/// - **后置条件**：`cancel` 是终态操作，触发最后一条 `Cancelled` 通知；
///   此后对句柄的任何调用都是协议违例，实现可以直接忽略或断言；
/// - 通知一律从反应器的派发循环送达，`resume` 自身绝不同步回调。
///
/// # 设计取舍与风险（Trade-offs）
/// - `suspend`/`resume` 不返回错误：对已注销观察的调用属于调用方缺陷，
///   以契约而非错误码约束，避免每个调用点都背负无意义的错误处理。
pub trait WriteWatch {
    /// 恢复通知派发。重复调用与首次调用等效。
    fn resume(&mut self);

    /// 暂停通知派发，注册本身保持有效。重复调用与首次调用等效。
    fn suspend(&mut self);

    /// 永久注销观察，并派发最后一条 `Cancelled` 通知。
    fn cancel(&mut self);
}

/// 反应器（事件循环）契约：为描述符登记可写观察。
///
/// # 契约说明（What）
/// - **输入**：描述符标识与通知回调；
/// - **后置条件**：返回的观察处于暂停态；通知在反应器自己的执行流中派发，
///   与登记调用不重入；
/// - 写路径对每个套接字至多持有一个观察，重复登记同一描述符的行为由具体
///   反应器定义，本层不依赖。
pub trait Reactor {
    /// 为 `socket` 登记一个处于暂停态的可写观察。
    fn watch_writable(&self, socket: SocketId, callback: WatchCallback) -> Box<dyn WriteWatch>;
}
