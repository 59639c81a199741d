//! Deferred computations.
//!
//! A [`Deferred`] is a cached future: it runs at most once, the first time
//! anyone awaits it, and every clone observes the same realized value.
//! Pure mapping and N-way joining build new deferred values without forcing
//! anything. [`Memo`] adds keyed memoization on top.
//!
//! There is no scheduler here. Whatever executor awaits the value drives it.

mod memo;

use std::fmt;
use std::future::{Future, IntoFuture};

use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::error::{Error, Result};

pub use memo::Memo;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

/// A cacheable, lazily driven value.
pub struct Deferred<T> {
    inner: SharedResult<T>,
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap a future. Nothing runs until the value is awaited.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// An already known value.
    pub fn ready(value: T) -> Self {
        Self::new(future::ready(Ok(value)))
    }

    /// An already known failure.
    pub fn failed(error: Error) -> Self {
        Self::new(future::ready(Err(error)))
    }

    /// Transform the realized value.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Deferred::new(self.inner.map(move |res| res.map(f)))
    }

    /// Transform the realized value with a step that may fail.
    pub fn try_map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        Deferred::new(self.inner.map(move |res| res.and_then(f)))
    }

    /// Join independent computations. The result is available once all of
    /// them are; the first failure wins.
    pub fn join_all<I>(items: I) -> Deferred<Vec<T>>
    where
        I: IntoIterator<Item = Deferred<T>>,
    {
        let futures: Vec<_> = items.into_iter().map(|d| d.inner).collect();
        Deferred::new(future::try_join_all(futures))
    }

    /// Await the value, sharing it with every other holder.
    pub async fn get(&self) -> Result<T> {
        self.inner.clone().await
    }

    /// The value if it has already been realized.
    pub fn peek(&self) -> Option<Result<T>> {
        self.inner.peek().cloned()
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> IntoFuture for Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Result<T>;
    type IntoFuture = SharedResult<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner
    }
}

impl<T> fmt::Debug for Deferred<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(Ok(value)) => f.debug_tuple("Deferred").field(&value).finish(),
            Some(Err(error)) => f.debug_tuple("Deferred").field(&error).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}
