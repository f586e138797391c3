use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use futures::FutureExt;

// A dedicated thread drives the timers; callers block on futures from their own threads.
static RUNTIME: LazyLock<tokio::runtime::Handle> = LazyLock::new(|| {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_time()
		.build()
		.expect("failed to build runtime");
	let handle = runtime.handle().clone();

	std::thread::Builder::new()
		.name("omt-lite".into())
		.spawn(move || {
			runtime.block_on(std::future::pending::<()>());
		})
		.expect("failed to spawn runtime thread");

	handle
});

/// Block the calling thread until `fut` completes or `timeout` elapses.
///
/// A zero timeout polls once without touching the runtime.
/// Must not be called from within an async context.
pub(crate) fn wait<F: Future>(timeout: Duration, fut: F) -> Option<F::Output> {
	if timeout.is_zero() {
		return fut.now_or_never();
	}

	RUNTIME.block_on(async move { tokio::time::timeout(timeout, fut).await.ok() })
}
