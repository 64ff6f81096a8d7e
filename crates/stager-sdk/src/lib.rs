// stager-sdk: Foundation layer for the stager workspace.
// This crate has ZERO dependencies on other stager crates and provides
// process invocation, retry, tracing and argument helpers.

pub mod arg_util;
pub mod io_util;
pub mod process_invoker;
pub mod retry;
pub mod string_util;
pub mod trace;

// Re-export commonly used items at crate root
pub use arg_util::{ArgUtil, InvalidArgument};
pub use io_util::IOUtil;
pub use process_invoker::{ProcessError, ProcessExitCodeError, ProcessInvoker, ProcessOutput};
pub use retry::RetryPolicy;
pub use string_util::StringUtil;
pub use trace::{TraceWriter, TracingTraceWriter};
