//! 写路径协作者的可复用测试桩。
//!
//! # 教案式说明
//! - **意图（Why）**：套接字与反应器都是外部协作者，单元测试与属性测试需要
//!   完全确定性的替身来脚本化“每次写收多少字节、何时流控、何时派发通知”；
//! - **逻辑（How）**：[`ScriptedSocket`] 按预设脚本逐次回答写尝试并累积真实
//!   落盘字节；[`ManualReactor`] 把通知派发权交给测试代码，同时记录
//!   `suspend`/`resume`/`cancel` 的调用序列；
//! - **契约（What）**：桩完全遵守 `Socket` / `Reactor` / `WriteWatch` 的契约
//!   文本（注册即暂停、`cancel` 派发最后一条 `Cancelled`、`resume` 不同步
//!   回调），可直接用于验证调用方是否守约。
//!
//! 与生产代码一致，桩只面向单线程协作模型，共享状态一律使用 `Rc`/`RefCell`。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::reactor::{Reactor, WatchCallback, WatchNotice, WriteWatch};
use crate::signal::CompletionSignal;
use crate::socket::{Socket, SocketId, WriteOutcome};

/// 脚本化套接字单步剧本：下一次 `try_write` 应当返回什么。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStep {
    /// 接收至多 `n` 字节（超过本次视图长度时自动截断）。
    Wrote(usize),
    /// 报告流控，零字节被接收。
    WouldBlock,
    /// 以指定错误种类失败。
    Fail(io::ErrorKind),
}

/// 按剧本回答写尝试的套接字桩。
///
/// # 契约说明（What）
/// - 剧本逐条消耗；耗尽后默认全量接收，便于“先流控后放行”的收敛类测试；
/// - [`transcript`](Self::transcript) 返回的共享句柄记录真实被接收的字节，
///   测试可在桩被移交给写路径后继续读取；
/// - [`close_calls`](Self::close_calls) 统计 `close` 调用次数，用于断言
///   拆除恰好发生一次。
pub struct ScriptedSocket {
    id: SocketId,
    script: VecDeque<WriteStep>,
    transcript: Rc<RefCell<Vec<u8>>>,
    close_calls: Rc<Cell<usize>>,
}

impl ScriptedSocket {
    /// 以描述符标识与写剧本构造桩。
    pub fn new(id: SocketId, script: impl IntoIterator<Item = WriteStep>) -> Self {
        Self {
            id,
            script: script.into_iter().collect(),
            transcript: Rc::new(RefCell::new(Vec::new())),
            close_calls: Rc::new(Cell::new(0)),
        }
    }

    /// 返回落盘字节的共享句柄。
    pub fn transcript(&self) -> Rc<RefCell<Vec<u8>>> {
        Rc::clone(&self.transcript)
    }

    /// 返回 `close` 调用计数的共享句柄。
    pub fn close_calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.close_calls)
    }
}

impl Socket for ScriptedSocket {
    fn id(&self) -> SocketId {
        self.id
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<WriteOutcome> {
        match self.script.pop_front() {
            Some(WriteStep::Wrote(n)) => {
                let accepted = n.min(buf.len());
                self.transcript
                    .borrow_mut()
                    .extend_from_slice(&buf[..accepted]);
                Ok(WriteOutcome::Wrote(accepted))
            }
            Some(WriteStep::WouldBlock) => Ok(WriteOutcome::WouldBlock),
            Some(WriteStep::Fail(kind)) => Err(io::Error::from(kind)),
            None => {
                self.transcript.borrow_mut().extend_from_slice(buf);
                Ok(WriteOutcome::Wrote(buf.len()))
            }
        }
    }

    fn close(&mut self) {
        self.close_calls.set(self.close_calls.get() + 1);
    }
}

/// 观察句柄上发生的操作，按调用顺序记录。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchOp {
    Resume,
    Suspend,
    Cancel,
}

struct WatchSlot {
    socket: SocketId,
    callback: Option<WatchCallback>,
    ops: Rc<RefCell<Vec<WatchOp>>>,
    resumed: bool,
    cancelled: bool,
    // cancel 与一次正在进行的派发撞车时，最后一条 Cancelled 通知由派发方补发。
    pending_cancel_notice: bool,
}

struct ReactorInner {
    watches: Vec<WatchSlot>,
}

/// 手动泵动的反应器桩：通知何时派发完全由测试代码决定。
///
/// # 教案式说明
/// - **意图（Why）**：真实事件循环的派发时机不可控，属性测试需要显式驱动
///   “阻塞 → 通知 → 续写”的节拍；
/// - **逻辑（How）**：注册的观察保存在内部插槽里；
///   [`fire_writable`](Self::fire_writable) 仅在观察处于恢复态时把
///   `Writable` 送进回调，模拟水平触发语义下“暂停即静默”的行为；
/// - **契约（What）**：注册返回的句柄处于暂停态；`cancel` 终结注册并派发
///   最后一条 `Cancelled`；操作序列可经 [`ops`](Self::ops) 取回断言。
pub struct ManualReactor {
    inner: Rc<RefCell<ReactorInner>>,
}

impl ManualReactor {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ReactorInner {
                watches: Vec::new(),
            })),
        }
    }

    /// 返回指定描述符观察的操作记录句柄。
    ///
    /// # Panics
    /// 描述符从未登记过观察时立即恐慌，提示测试装配错误。
    pub fn ops(&self, socket: SocketId) -> Rc<RefCell<Vec<WatchOp>>> {
        let inner = self.inner.borrow();
        match inner.watches.iter().find(|slot| slot.socket == socket) {
            Some(slot) => Rc::clone(&slot.ops),
            None => panic!("{socket} 尚未登记可写观察"),
        }
    }

    /// 查询观察当前是否处于恢复态（未注销且允许派发）。
    pub fn resumed(&self, socket: SocketId) -> bool {
        let inner = self.inner.borrow();
        inner
            .watches
            .iter()
            .find(|slot| slot.socket == socket)
            .map(|slot| slot.resumed && !slot.cancelled)
            .unwrap_or(false)
    }

    /// 查询观察是否已注销。
    pub fn cancelled(&self, socket: SocketId) -> bool {
        let inner = self.inner.borrow();
        inner
            .watches
            .iter()
            .find(|slot| slot.socket == socket)
            .map(|slot| slot.cancelled)
            .unwrap_or(false)
    }

    /// 向处于恢复态的观察派发一条 `Writable` 通知。
    ///
    /// # 契约说明（What）
    /// - **返回值**：`true` 表示通知已送达回调；观察暂停、已注销或从未登记
    ///   时返回 `false` 且不产生任何副作用；
    /// - 回调执行期间允许重入句柄操作（暂停、再注销均可）；若回调中发生
    ///   `cancel`，最后一条 `Cancelled` 通知在本次派发返回前补发。
    pub fn fire_writable(&self, socket: SocketId) -> bool {
        let (index, mut callback) = {
            let mut inner = self.inner.borrow_mut();
            let Some(index) = inner
                .watches
                .iter()
                .position(|slot| slot.socket == socket)
            else {
                return false;
            };
            let slot = &mut inner.watches[index];
            if slot.cancelled || !slot.resumed {
                return false;
            }
            match slot.callback.take() {
                Some(callback) => (index, callback),
                None => return false,
            }
        };

        callback(WatchNotice::Writable);

        {
            let mut inner = self.inner.borrow_mut();
            let slot = &mut inner.watches[index];
            if !slot.pending_cancel_notice {
                slot.callback = Some(callback);
                return true;
            }
            slot.pending_cancel_notice = false;
        }
        callback(WatchNotice::Cancelled);
        true
    }

    /// 由反应器一侧强制注销观察并派发最后一条 `Cancelled` 通知。
    ///
    /// # 契约说明（What）
    /// - 模拟事件循环关停时回收注册的场景；注销不经句柄发起，因此不会
    ///   出现在 [`ops`](Self::ops) 记录里；
    /// - **返回值**：`true` 表示注销生效且最后一条通知已（或将在本轮派发
    ///   返回前）送达回调；观察已注销或从未登记时返回 `false`。
    pub fn fire_cancelled(&self, socket: SocketId) -> bool {
        let mut callback = {
            let mut inner = self.inner.borrow_mut();
            let Some(slot) = inner
                .watches
                .iter_mut()
                .find(|slot| slot.socket == socket)
            else {
                return false;
            };
            if slot.cancelled {
                return false;
            }
            slot.cancelled = true;
            slot.resumed = false;
            match slot.callback.take() {
                Some(callback) => callback,
                None => {
                    // 回调正被 fire_writable 借走：由派发方补发最后一条通知。
                    slot.pending_cancel_notice = true;
                    return true;
                }
            }
        };
        callback(WatchNotice::Cancelled);
        true
    }
}

impl Default for ManualReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor for ManualReactor {
    fn watch_writable(&self, socket: SocketId, callback: WatchCallback) -> Box<dyn WriteWatch> {
        let ops = Rc::new(RefCell::new(Vec::new()));
        let index = {
            let mut inner = self.inner.borrow_mut();
            inner.watches.push(WatchSlot {
                socket,
                callback: Some(callback),
                ops,
                resumed: false,
                cancelled: false,
                pending_cancel_notice: false,
            });
            inner.watches.len() - 1
        };
        Box::new(ManualWatch {
            inner: Rc::clone(&self.inner),
            index,
        })
    }
}

/// [`ManualReactor`] 发出的观察句柄。
pub struct ManualWatch {
    inner: Rc<RefCell<ReactorInner>>,
    index: usize,
}

impl WriteWatch for ManualWatch {
    fn resume(&mut self) {
        let mut inner = self.inner.borrow_mut();
        let slot = &mut inner.watches[self.index];
        if slot.cancelled {
            return;
        }
        slot.resumed = true;
        slot.ops.borrow_mut().push(WatchOp::Resume);
    }

    fn suspend(&mut self) {
        let mut inner = self.inner.borrow_mut();
        let slot = &mut inner.watches[self.index];
        if slot.cancelled {
            return;
        }
        slot.resumed = false;
        slot.ops.borrow_mut().push(WatchOp::Suspend);
    }

    fn cancel(&mut self) {
        let callback = {
            let mut inner = self.inner.borrow_mut();
            let slot = &mut inner.watches[self.index];
            if slot.cancelled {
                return;
            }
            slot.cancelled = true;
            slot.resumed = false;
            slot.ops.borrow_mut().push(WatchOp::Cancel);
            match slot.callback.take() {
                Some(callback) => Some(callback),
                None => {
                    // 回调正被 fire_writable 借走：由派发方补发最后一条通知。
                    slot.pending_cancel_notice = true;
                    None
                }
            }
        };
        if let Some(mut callback) = callback {
            callback(WatchNotice::Cancelled);
        }
    }
}

/// 构造计数型完成信号：触发一次，计数加一。
///
/// # 契约说明（What）
/// - 返回的句柄与信号共享计数；测试据此断言“恰好一次”与“从未触发”。
pub fn counting_signal() -> (CompletionSignal, Rc<Cell<usize>>) {
    let fired = Rc::new(Cell::new(0));
    let handle = Rc::clone(&fired);
    let signal: CompletionSignal = Box::new(move || handle.set(handle.get() + 1));
    (signal, fired)
}
