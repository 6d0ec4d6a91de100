use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use outfall_core::SocketId;
use outfall_core::test_stubs::{ManualReactor, ScriptedSocket, WriteStep, counting_signal};
use outfall_sink::SocketSink;

/// 整段一次写完的同步排空基准。
///
/// # 设计目的（Why）
/// - 度量状态机本身的固定开销：绑定、一次 `try_write`、完成信号触发；
///   该路径不经通知驱动，是写端的理论上限。
///
/// # 执行逻辑（How）
/// - 套接字桩剧本为空即默认全量接收，`submit` 在同一调用栈内收敛。
///
/// # 契约说明（What）
/// - 吞吐按载荷字节数折算；断言完成信号恰好触发一次以防基准静默退化。
fn bench_whole_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_whole");
    for size in [1usize << 10, 1 << 14, 1 << 18] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let payload = Bytes::from(vec![0xA5u8; size]);
            b.iter(|| {
                let reactor = ManualReactor::new();
                let socket = ScriptedSocket::new(SocketId::new(1), []);
                let sink = SocketSink::bind(socket, &reactor, Box::new(|_| {}));
                let (signal, fired) = counting_signal();
                sink.submit(payload.clone(), signal).expect("同步排空不应失败");
                assert_eq!(fired.get(), 1);
            });
        });
    }
    group.finish();
}

/// 固定小块部分写下的收缩循环基准。
///
/// # 设计目的（Why）
/// - 度量部分写重试路径的单位开销：视图收缩（`advance`）与剧本消耗的
///   每轮成本，观察块大小对循环次数的放大效应。
///
/// # 执行逻辑（How）
/// - 16 KiB 载荷按 64/256/1024 字节的块逐次接收，剧本耗尽前不出现流控，
///   整个排空仍在一次 `submit` 内完成。
fn bench_chunked_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain_chunked");
    let size = 1usize << 14;
    for chunk in [64usize, 256, 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            let payload = Bytes::from(vec![0x5Au8; size]);
            let script = vec![WriteStep::Wrote(chunk); size / chunk];
            b.iter(|| {
                let reactor = ManualReactor::new();
                let socket = ScriptedSocket::new(SocketId::new(1), script.clone());
                let sink = SocketSink::bind(socket, &reactor, Box::new(|_| {}));
                let (signal, fired) = counting_signal();
                sink.submit(payload.clone(), signal).expect("分块排空不应失败");
                assert_eq!(fired.get(), 1);
            });
        });
    }
    group.finish();
}

criterion_group!(sink_benches, bench_whole_drain, bench_chunked_drain);
criterion_main!(sink_benches);
