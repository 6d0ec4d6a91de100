//! 最小可运行示例：脚本化套接字 + 手动反应器，跑通“提交 → 流控 → 通知 → 收敛”的完整写路径。
//!
//! # 设计目的 (Why)
//! - 向新同学展示“最少概念”即可运行的端到端流程：套接字桩 → 写端 → 手动泵动通知。
//! - 演示单缓冲推送协议的背压形态：完成信号触发前不提交下一份缓冲。
//!
//! # 使用方式 (How)
//! ```bash
//! cargo run -p outfall-sink --example drain_demo
//! ```
//! 默认以 `trace` 级别输出状态机日志；可经 `RUST_LOG` 覆盖。
//! 输出示例：`[outfall-sink/drain_demo] delivered 30 bytes: "the quick brown fox jumps over"`
//!
//! # 契约说明 (What)
//! - 仅依赖公开接口与 `outfall-core::test_stubs` 的确定性桩，不触碰真实网络；
//! - 剧本刻意混入流控应答，泵动循环对应真实事件循环派发可写通知的时机。
//!
//! # 注意事项 (Trade-offs & Gotchas)
//! - 泵动循环是示例专属：生产环境中通知由事件循环派发，调用方不主动轮询；
//! - 错误通道在本示例中只打印，真实接入方应结合自身的生命周期管理处理。

use std::cell::Cell;
use std::rc::Rc;

use bytes::Bytes;
use outfall_core::test_stubs::{ManualReactor, ScriptedSocket, WriteStep};
use outfall_core::{SinkError, SocketId};
use outfall_sink::SocketSink;
use tracing_subscriber::EnvFilter;

const SOCKET: SocketId = SocketId::new(3);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .init();

    if let Err(error) = run() {
        eprintln!(
            "[outfall-sink/drain_demo] error: [{}] {}",
            error.code(),
            error.message()
        );
        std::process::exit(1);
    }
}

/// 核心逻辑封装在独立函数中，便于在脚本或 CI 中直接判断成功与否。
fn run() -> Result<(), SinkError> {
    // 剧本混入流控与小块部分写，迫使写端经历阻塞与通知驱动两条路径。
    let socket = ScriptedSocket::new(
        SOCKET,
        [
            WriteStep::Wrote(5),
            WriteStep::WouldBlock,
            WriteStep::Wrote(7),
            WriteStep::WouldBlock,
        ],
    );
    let transcript = socket.transcript();
    let reactor = ManualReactor::new();
    let sink = SocketSink::bind(
        socket,
        &reactor,
        Box::new(|err| eprintln!("[outfall-sink/drain_demo] sink error: {err}")),
    );

    for chunk in ["the quick ", "brown fox ", "jumps over"] {
        let done = Rc::new(Cell::new(false));
        let flag = Rc::clone(&done);
        sink.submit(Bytes::from_static(chunk.as_bytes()), Box::new(move || flag.set(true)))?;

        // 手动扮演事件循环：写端被流控挡住时派发一条可写通知。
        while !done.get() {
            assert!(
                reactor.fire_writable(SOCKET),
                "阻塞中的写端必须处于可通知状态"
            );
        }
    }

    sink.close();

    let delivered = transcript.borrow();
    println!(
        "[outfall-sink/drain_demo] delivered {} bytes: \"{}\"",
        delivered.len(),
        String::from_utf8_lossy(&delivered)
    );
    Ok(())
}
