use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::io;

/// `SinkError` 是写路径对外暴露的稳定错误域，承载错误码、描述与根因链。
///
/// # 设计背景（Why）
/// - 写路径的故障最终都要汇入生产者/消费者共享的错误通道；若各调用点随意
///   构造字符串，日志聚合与自动化处置都无从谈起。
/// - 错误码采用 `<领域>.<语义>` 的稳定命名（见 [`codes`]），上游可以据此
///   精确区分“写调用失败”与“向已关闭的写端投递”两类截然不同的处置策略。
///
/// # 逻辑解析（How）
/// - 结构体以 Builder 风格方法叠加上下文（底层原因、显式分类），并通过
///   `source()` 暴露完整链路；
/// - `code` 始终为 `'static` 字符串，承载稳定语义；`message` 面向排障人员。
///
/// # 契约说明（What）
/// - **前置条件**：调用方必须使用 [`codes`] 模块或遵循同一命名约定的自定义
///   码值；
/// - **后置条件**：除非显式调用 `with_*` 方法，错误不含额外上下文；返回值
///   满足 `Error + Send + Sync + 'static`，可跨线程传递。
///
/// # 设计取舍与风险（Trade-offs）
/// - 协议违例（同一时刻提交两份缓冲）不会进入该类型：那是生产者缺陷，
///   必须以断言立即暴露，折叠进错误域只会掩盖数据互相穿插的风险。
#[derive(Debug)]
pub struct SinkError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
    category: Option<ErrorCategory>,
}

impl SinkError {
    /// 构造写路径错误。
    ///
    /// # 契约说明（What）
    /// - **输入**：`code` 为稳定错误码；`message` 为面向排障人员的描述，
    ///   可为 `&'static str` 或堆分配字符串；
    /// - **后置条件**：返回值不含底层原因与显式分类，可继续用
    ///   [`with_cause`](Self::with_cause) / [`with_category`](Self::with_category) 补充。
    ///
    /// # 示例（Examples）
    /// ```rust
    /// use outfall_core::error::{codes, SinkError};
    ///
    /// let err = SinkError::new(codes::CLOSED, "sink already closed");
    /// assert_eq!(err.code(), codes::CLOSED);
    /// assert_eq!(err.message(), "sink already closed");
    /// assert!(err.cause().is_none());
    /// ```
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            category: None,
        }
    }

    /// 从底层 I/O 错误构造写路径错误，保留原始错误作为根因。
    ///
    /// # 契约说明（What）
    /// - **输入**：`code` 指明发生故障的操作语义；`err` 为非阻塞写调用返回的
    ///   真实失败（`WouldBlock` 不属于失败，调用方应在进入本函数前剔除）；
    /// - **后置条件**：`message` 采用 `err` 的文本描述，`source()` 可回溯到
    ///   原始 `io::Error`。
    pub fn from_io(code: &'static str, err: io::Error) -> Self {
        let message = err.to_string();
        Self::new(code, message).with_cause(err)
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 为现有错误设置底层原因。
    pub fn set_cause(&mut self, cause: impl Error + Send + Sync + 'static) {
        self.cause = Some(Box::new(cause));
    }

    /// 为错误标记结构化分类，覆盖默认的码值映射。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// 就地更新错误分类。
    pub fn set_category(&mut self, category: ErrorCategory) {
        self.category = Some(category);
    }

    /// 查询结构化错误分类。
    ///
    /// # 契约说明（What）
    /// - 显式设置的分类优先；否则按错误码查静态映射表；
    /// - 查表失败时回退为 [`ErrorCategory::NonRetryable`]，表示默认不触发
    ///   任何自动化补救策略。
    pub fn category(&self) -> ErrorCategory {
        self.category
            .clone()
            .or_else(|| lookup_default_category(self.code))
            .unwrap_or(ErrorCategory::NonRetryable)
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for SinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 错误分类枚举，驱动上游的自动化处置策略。
///
/// # 契约说明（What）
/// - `NonRetryable`：确定性失败，写端实例已不可用，重试须由更上层决定；
/// - `Cancelled`：预期中的关停路径（显式关闭或事件源注销后到达的输入），
///   不应触发告警。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    NonRetryable,
    Cancelled,
}

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 写路径统一的返回值别名，默认错误类型为 [`SinkError`]。
pub type Result<T, E = SinkError> = core::result::Result<T, E>;

/// 写路径内置的错误码常量集合，确保可观测性系统具有稳定识别符。
///
/// # 契约说明（What）
/// - 错误码遵循 `<领域>.<语义>` 命名约定，方便在跨组件日志中检索与聚合；
/// - 实现者应将这些码值封装进 [`SinkError`]，并确保链路日志携带完整上下文。
pub mod codes {
    /// 非阻塞写调用本身失败（例如连接被重置）。
    pub const WRITE: &str = "sink.write";
    /// 写端已进入终态后仍收到输入（提交或错误通报）。
    pub const CLOSED: &str = "sink.closed";
}

/// 根据稳定错误码查找默认分类。
///
/// # 契约说明（What）
/// - **输入**：遵循 `<领域>.<语义>` 规范的稳定错误码；
/// - **返回值**：命中映射表返回 `Some`，否则 `None`，由调用方决定回退策略；
/// - 新增错误码时需同步更新此表与对应测试。
fn lookup_default_category(code: &str) -> Option<ErrorCategory> {
    match code {
        codes::WRITE => Some(ErrorCategory::NonRetryable),
        codes::CLOSED => Some(ErrorCategory::Cancelled),
        _ => None,
    }
}

const _: fn() = || {
    fn assert_error_traits<T: Error + Send + Sync + 'static>() {}

    assert_error_traits::<SinkError>();
};

#[cfg(test)]
mod tests {
    use super::*;

    /// 验证：I/O 适配保留根因链，`source()` 能回溯到原始 `io::Error`。
    #[test]
    fn from_io_preserves_cause_chain() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset");
        let err = SinkError::from_io(codes::WRITE, io_err);

        assert_eq!(err.code(), codes::WRITE);
        assert_eq!(format!("{err}"), "[sink.write] peer reset");

        let source = err.source().expect("io cause must be linked");
        assert_eq!(format!("{source}"), "peer reset");
    }

    /// 验证：分类查询优先使用显式标记，缺省时按码值映射，未知码回退 NonRetryable。
    #[test]
    fn category_lookup_prefers_explicit_mark() {
        let defaulted = SinkError::new(codes::CLOSED, "late submit");
        assert_eq!(defaulted.category(), ErrorCategory::Cancelled);

        let overridden = SinkError::new(codes::CLOSED, "late submit")
            .with_category(ErrorCategory::NonRetryable);
        assert_eq!(overridden.category(), ErrorCategory::NonRetryable);

        let unknown = SinkError::new("sink.unregistered", "no matrix entry");
        assert_eq!(unknown.category(), ErrorCategory::NonRetryable);
    }
}
