//! Boxed future wrapper used at the collaborator seams
//!
//! Trait methods cannot return `impl Future` and still be used behind
//! `Arc<dyn Trait>`, so resolver and fetcher implementations hand back an
//! `AsyncTask` instead.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Owned, `Send` future returned by the async collaborator traits
pub struct AsyncTask<T> {
    inner: Pin<Box<dyn Future<Output = T> + Send + 'static>>,
}

impl<T> AsyncTask<T> {
    /// Box a future into a task
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: Box::pin(fut),
        }
    }

    /// A task that resolves immediately with `value`
    pub fn ready(value: T) -> Self
    where
        T: Send + 'static,
    {
        Self::from_future(std::future::ready(value))
    }
}

impl<T> Future for AsyncTask<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}
