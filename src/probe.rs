//! Filesystem steps shared by the synchronous and asynchronous cascades.
//!
//! Discovery and library lookup are written once as `async fn`s generic over
//! [`Probe`]. [`Suspending`] yields at every filesystem call through
//! `tokio::fs`; [`Blocking`] answers with already-completed futures, so the
//! synchronous facade can drive the same code with a single poll.

use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::pin;
use std::task::{Context, Poll, Waker};

/// The only I/O the cascade performs.
pub trait Probe {
	/// Read a whole file, `Ok(None)` if it does not exist.
	fn read_optional(&self, path: &Path) -> impl Future<Output = io::Result<Option<String>>>;

	/// Whether `path` is an existing directory.
	fn is_dir(&self, path: &Path) -> impl Future<Output = bool>;
}

/// Blocking `std::fs` steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blocking;

/// Suspending `tokio::fs` steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Suspending;

fn not_found_as_none(result: io::Result<String>) -> io::Result<Option<String>> {
	match result {
		Ok(content) => Ok(Some(content)),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}

impl Probe for Blocking {
	fn read_optional(&self, path: &Path) -> impl Future<Output = io::Result<Option<String>>> {
		std::future::ready(not_found_as_none(std::fs::read_to_string(path)))
	}

	fn is_dir(&self, path: &Path) -> impl Future<Output = bool> {
		std::future::ready(path.is_dir())
	}
}

impl Probe for Suspending {
	fn read_optional(&self, path: &Path) -> impl Future<Output = io::Result<Option<String>>> {
		async move { not_found_as_none(tokio::fs::read_to_string(path).await) }
	}

	fn is_dir(&self, path: &Path) -> impl Future<Output = bool> {
		async move {
			tokio::fs::metadata(path)
				.await
				.map(|meta| meta.is_dir())
				.unwrap_or(false)
		}
	}
}

/// Run a future built only from [`Blocking`] steps to completion.
pub(crate) fn run_blocking<F: Future>(future: F) -> F::Output {
	let mut future = pin!(future);
	let mut cx = Context::from_waker(Waker::noop());
	match future.as_mut().poll(&mut cx) {
		Poll::Ready(output) => output,
		Poll::Pending => unreachable!("blocking probe suspended"),
	}
}
