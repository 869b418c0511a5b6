//! txscope Intercept
//!
//! The interception point: an explicit wrapper composed around a call to a
//! declared transactional method.
//!
//! Responsibilities:
//! - Resolve the method's declared options
//! - Create, expose, complete or roll back, and always dispose the handle
//! - Run forked bodies on worker threads under a derived activity
//! - Retry top-level invocations claimed by a retry policy

mod error;
mod fork;
mod guard;
mod interceptor;
mod invocation;

pub use error::{InterceptError, InterceptResult, InvocationError};
pub use fork::{ForkHandle, Outcome};
pub use interceptor::Interceptor;
pub use invocation::Invocation;
