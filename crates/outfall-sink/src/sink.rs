use std::cell::RefCell;
use std::rc::Rc;

use bytes::{Buf, Bytes};
use outfall_core::{
    CompletionSignal, ErrorHook, Reactor, Result, SinkError, Socket, WatchNotice, WriteOutcome,
    WriteWatch, codes,
};
use tracing::{debug, trace};

/// 写路径状态机的可观测阶段。
///
/// # 契约说明（What）
/// - 阶段之间的迁移完全由提交、写结果与观察通知驱动；
/// - `Closed` 是唯一终态：套接字已关闭、观察已注销，后续输入被确定性拒绝。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkPhase {
    /// 无在途请求，观察处于暂停态。
    Idle,
    /// 正在同步推进一次写循环。
    Writing,
    /// 被流控挡住：观察已恢复，等待下一条可写通知。
    Blocked,
    /// 终态。
    Closed,
}

/// 在途请求：视图随部分写不断收缩，完成信号触发后整体丢弃。
struct InFlight {
    view: Bytes,
    signal: Option<CompletionSignal>,
}

struct SinkCore<S: Socket> {
    socket: S,
    watch: Option<Box<dyn WriteWatch>>,
    in_flight: Option<InFlight>,
    phase: SinkPhase,
    errors: Option<ErrorHook>,
}

impl<S: Socket> SinkCore<S> {
    /// 终态迁移：恰好一次地关闭套接字，并摘除观察句柄与错误通道。
    ///
    /// 返回 `None` 表示早已处于终态，本次调用无副作用。
    fn seal(&mut self) -> Option<(Option<Box<dyn WriteWatch>>, Option<ErrorHook>)> {
        if self.phase == SinkPhase::Closed {
            return None;
        }
        self.phase = SinkPhase::Closed;
        self.socket.close();
        Some((self.watch.take(), self.errors.take()))
    }
}

/// 观察句柄在拆除路径上的处置方式。
enum WatchTeardown {
    /// 由本端注销：调用 `cancel`，随之而来的最后一条通知会看到终态并被忽略。
    Cancel,
    /// 反应器已注销观察：句柄只能丢弃，任何调用都是协议违例。
    AlreadyCancelled,
}

/// 非阻塞套接字写端：消费上游的单缓冲推送协议，经水平触发的可写通知
/// 把字节排空到套接字上。
///
/// # 设计背景（Why）
/// - 可写通知是水平触发的：只要发送缓冲有空位就会持续派发。若观察常开，
///   空闲连接会制造通知风暴；本实现只在真正被流控挡住时恢复观察，收到
///   一条通知后立刻暂停，以按需（边沿式）的节拍消费水平触发原语。
/// - 上游以“单缓冲 + 完成信号”的推送协议供数据：完成信号触发前不得提交
///   下一份缓冲，背压由此天然成立。
///
/// # 逻辑解析（How）
/// - 状态共享在 `Rc<RefCell<_>>` 中，观察回调持 `Weak` 升级后驱动状态机，
///   整个生命周期运行在反应器的单线程执行流上，无锁；
/// - 部分写在同步循环内收缩视图重试，只有 `WouldBlock` 才让出控制权；
/// - 完成信号与错误钩子一律在内部借用释放之后调用，因此钩子内可以安全地
///   重入 `submit`/`close`（链式生产者写法）。
///
/// # 契约说明（What）
/// - **前置条件**：同一时刻至多一份在途缓冲（违例立即恐慌）；所有调用都
///   发生在反应器线程上；
/// - **后置条件**：每份被接收的缓冲要么完整交付内核后触发完成信号一次，
///   要么写端在信号触发前进入终态（显式关闭废弃在途请求，不补发信号）；
/// - 句柄析构等价于显式 `close`。
///
/// # 设计取舍与风险（Trade-offs）
/// - `Wrote(0)` 应答在行为良好的套接字上不该出现，这里按流控处理以保证
///   前进性，而不是在热循环里空转；
/// - 本层不设超时：对端长期不可写会让写端停留在 `Blocked`，该策略属于
///   上游的职责边界。
pub struct SocketSink<S: Socket> {
    core: Rc<RefCell<SinkCore<S>>>,
}

impl<S: Socket> SocketSink<S> {
    /// 绑定套接字并登记可写观察，写端以 `Idle` 状态就绪。
    ///
    /// # 契约说明（What）
    /// - **输入**：`socket` 的独占所有权、一次性借用的反应器引用，以及
    ///   生产者/消费者共享的错误通道钩子；
    /// - **后置条件**：观察已登记且处于暂停态；在首次流控前不会收到任何
    ///   通知。
    pub fn bind(socket: S, reactor: &dyn Reactor, errors: ErrorHook) -> Self
    where
        S: 'static,
    {
        let id = socket.id();
        let core = Rc::new(RefCell::new(SinkCore {
            socket,
            watch: None,
            in_flight: None,
            phase: SinkPhase::Idle,
            errors: Some(errors),
        }));
        let weak = Rc::downgrade(&core);
        let watch = reactor.watch_writable(
            id,
            Box::new(move |notice| {
                if let Some(core) = weak.upgrade() {
                    Self::on_watch_notice(&core, notice);
                }
            }),
        );
        core.borrow_mut().watch = Some(watch);
        debug!(socket = %id, "writability watch registered, sink idle");
        Self { core }
    }

    /// 提交一份缓冲与其完成信号。
    ///
    /// # 契约说明（What）
    /// - **输入**：`view` 为本次请求的字节视图（可为空）；`signal` 在缓冲
    ///   完整交付内核后恰好触发一次；
    /// - **前置条件**：上一份缓冲的完成信号已触发；违例视为生产者缺陷，
    ///   立即恐慌而非降级处理；
    /// - **后置条件**：空视图原地完成（无系统调用、不碰观察）；非空视图
    ///   同步尝试至少一次写。终态后的提交返回 `sink.closed` 错误，传入的
    ///   信号被丢弃不触发，错误返回值即是对生产者的通知。
    pub fn submit(&self, view: Bytes, signal: CompletionSignal) -> Result<()> {
        let mut core = self.core.borrow_mut();
        if core.phase == SinkPhase::Closed {
            return Err(SinkError::new(codes::CLOSED, "submit rejected: sink is closed"));
        }
        assert!(
            core.in_flight.is_none(),
            "写请求重入：上一份缓冲的完成信号尚未触发"
        );
        if view.is_empty() {
            drop(core);
            trace!("empty request completed in place");
            signal();
            return Ok(());
        }
        trace!(len = view.len(), "write request accepted");
        core.phase = SinkPhase::Writing;
        core.in_flight = Some(InFlight {
            view,
            signal: Some(signal),
        });
        drop(core);
        Self::drive(&self.core);
        Ok(())
    }

    /// 关闭写端：注销观察、关闭套接字、进入终态。幂等。
    ///
    /// # 契约说明（What）
    /// - 允许在 `Writing`/`Blocked` 期间调用：在途请求被废弃，其完成信号
    ///   不再触发。这是“完成信号恰好一次”的唯一例外；生产者一旦观察到
    ///   关闭，即不再被欠任何信号。
    pub fn close(&self) {
        if Self::teardown(&self.core, WatchTeardown::Cancel).is_some() {
            debug!("sink closed");
        }
    }

    /// 生产者主动中止：立即关闭写端，并把 `error` 原样转发到错误通道。
    ///
    /// # 契约说明（What）
    /// - 在途请求按 `close` 语义废弃（发起方自己终止了流，不会等待信号）；
    /// - 错误恰好转发一次；终态后的调用按既定契约忽略。
    pub fn fail(&self, error: SinkError) {
        match Self::teardown(&self.core, WatchTeardown::Cancel) {
            Some(mut hook) => {
                debug!(code = error.code(), "producer abort, forwarding error");
                hook(error);
            }
            None => {
                trace!(code = error.code(), "error report after close ignored");
            }
        }
    }

    /// 返回当前可观测阶段。
    pub fn phase(&self) -> SinkPhase {
        self.core.borrow().phase
    }

    /// 写端是否已进入终态。
    pub fn is_closed(&self) -> bool {
        self.phase() == SinkPhase::Closed
    }

    /// 同步写循环：推进在途请求直至排空、被流控挡住或失败。
    ///
    /// 完成信号与错误钩子都会重入生产者代码，必须在内部借用释放后调用；
    /// 循环体内只做状态迁移，所有对外通知集中在尾部。
    fn drive(core: &Rc<RefCell<SinkCore<S>>>) {
        enum Verdict {
            Drained(Option<CompletionSignal>),
            Parked,
            Failed {
                watch: Option<Box<dyn WriteWatch>>,
                hook: Option<ErrorHook>,
                signal: Option<CompletionSignal>,
                error: SinkError,
            },
        }

        let verdict = {
            let mut guard = core.borrow_mut();
            let state = &mut *guard;
            if state.phase != SinkPhase::Writing {
                return;
            }
            debug_assert!(state.in_flight.is_some(), "写循环要求存在在途请求");
            loop {
                let flight = match state.in_flight.as_mut() {
                    Some(flight) => flight,
                    None => return,
                };
                let remaining = flight.view.len();
                let outcome = match state.socket.try_write(&flight.view) {
                    // 非空缓冲上的零字节进展视同流控，避免同步循环空转。
                    Ok(WriteOutcome::Wrote(0)) => Ok(WriteOutcome::WouldBlock),
                    other => other,
                };
                match outcome {
                    Ok(WriteOutcome::Wrote(n)) if n >= remaining => {
                        debug_assert!(n == remaining, "套接字契约要求写入量不超过视图长度");
                        let signal = flight.signal.take();
                        state.in_flight = None;
                        state.phase = SinkPhase::Idle;
                        break Verdict::Drained(signal);
                    }
                    Ok(WriteOutcome::Wrote(n)) => {
                        flight.view.advance(n);
                        trace!(accepted = n, remaining = remaining - n, "partial write, retrying");
                    }
                    Ok(WriteOutcome::WouldBlock) => {
                        if let Some(watch) = state.watch.as_mut() {
                            watch.resume();
                        }
                        state.phase = SinkPhase::Blocked;
                        break Verdict::Parked;
                    }
                    Err(err) => {
                        let signal = flight.signal.take();
                        state.in_flight = None;
                        let error = SinkError::from_io(codes::WRITE, err);
                        let (watch, hook) = match state.seal() {
                            Some(taken) => taken,
                            None => (None, None),
                        };
                        break Verdict::Failed {
                            watch,
                            hook,
                            signal,
                            error,
                        };
                    }
                }
            }
        };

        match verdict {
            Verdict::Drained(signal) => {
                trace!("request drained");
                if let Some(signal) = signal {
                    signal();
                }
            }
            Verdict::Parked => {
                trace!("flow control applied, awaiting writability");
            }
            Verdict::Failed {
                watch,
                hook,
                signal,
                error,
            } => {
                debug!(code = error.code(), "write failed, sink sealed");
                if let Some(mut watch) = watch {
                    watch.cancel();
                }
                if let Some(mut hook) = hook {
                    hook(error);
                }
                if let Some(signal) = signal {
                    signal();
                }
            }
        }
    }

    /// 观察通知入口：可写则按需续写，注销则按强制关停处理。
    fn on_watch_notice(core: &Rc<RefCell<SinkCore<S>>>, notice: WatchNotice) {
        match notice {
            WatchNotice::Writable => {
                {
                    let mut guard = core.borrow_mut();
                    let state = &mut *guard;
                    if state.phase == SinkPhase::Closed {
                        return;
                    }
                    // 水平触发转按需：先暂停派发，再恢复写。
                    if let Some(watch) = state.watch.as_mut() {
                        watch.suspend();
                    }
                    if state.phase != SinkPhase::Blocked {
                        return;
                    }
                    state.phase = SinkPhase::Writing;
                    trace!("writability notice, resuming drain");
                }
                Self::drive(core);
            }
            WatchNotice::Cancelled => {
                if Self::teardown(core, WatchTeardown::AlreadyCancelled).is_some() {
                    debug!("watch cancelled by reactor, sink sealed");
                }
            }
        }
    }

    /// 共享拆除路径。返回 `Some(hook)` 当且仅当本次调用完成了终态迁移
    /// （绑定之后错误通道恒在，只随终态迁移被摘除一次）。
    fn teardown(core: &Rc<RefCell<SinkCore<S>>>, mode: WatchTeardown) -> Option<ErrorHook> {
        let sealed = {
            let mut guard = core.borrow_mut();
            let state = &mut *guard;
            // 在途请求随关闭废弃，完成信号不再触发。
            state.in_flight = None;
            state.seal()
        };
        let (watch, hook) = sealed?;
        if matches!(mode, WatchTeardown::Cancel) {
            if let Some(mut watch) = watch {
                watch.cancel();
            }
        }
        hook
    }
}

impl<S: Socket> Drop for SocketSink<S> {
    fn drop(&mut self) {
        let _ = Self::teardown(&self.core, WatchTeardown::Cancel);
    }
}
