// Handler dispatch plumbing for the continuation chain
//
// Handlers are specialized at compile time for each unique handler type and
// type-erased only at storage time, so the compiler can inline handler
// bodies behind a single vtable hop.

use crate::context::Context;
use crate::http::HttpResponse;
use crate::Error;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Outcome of one handler invocation.
///
/// `Continue` is the `next()` of the continuation protocol: it hands the
/// (possibly modified) context to the next entry in the chain. `Respond`
/// short-circuits the chain with a terminal response.
#[derive(Debug)]
pub enum Flow {
    Continue(Context),
    Respond(Context, HttpResponse),
}

/// A handler that can process one step of the dispatch chain.
///
/// The associated `Future` type keeps invocation monomorphized; boxing
/// happens once, at the type-erasure boundary.
pub trait Handler: Clone + Send + Sync + 'static {
    type Future: Future<Output = Result<Flow, Error>> + Send + 'static;

    fn call(&self, ctx: Context) -> Self::Future;
}

/// Trait for converting various function types into handlers, so route
/// registration accepts plain async closures:
///
/// ```ignore
/// router.get("/users/<:id>", |ctx: Context| async move {
///     Ok(Flow::Respond(ctx, HttpResponse::ok()))
/// }, RouteOptions::default())?;
/// ```
pub trait IntoHandler<Args>: Clone + Send + Sync + 'static {
    type Handler: Handler;

    fn into_handler(self) -> Self::Handler;
}

/// A handler wrapping an async function or closure.
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    #[inline(always)]
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, Error>> + Send + 'static,
{
    type Future = Fut;

    #[inline(always)]
    fn call(&self, ctx: Context) -> Self::Future {
        (self.f)(ctx)
    }
}

impl<F, Fut> IntoHandler<(Context,)> for F
where
    F: Fn(Context) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, Error>> + Send + 'static,
{
    type Handler = FnHandler<F>;

    #[inline(always)]
    fn into_handler(self) -> Self::Handler {
        FnHandler::new(self)
    }
}

/// Type-erased handler for storing mixed handler types in one route table.
pub struct BoxedHandler {
    inner: Arc<dyn ErasedHandler>,
}

impl BoxedHandler {
    #[inline]
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(HandlerWrapper {
                handler,
                _marker: PhantomData,
            }),
        }
    }

    #[inline(always)]
    pub fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Result<Flow, Error>> + Send>> {
        self.inner.call(ctx)
    }
}

impl Clone for BoxedHandler {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Result<Flow, Error>> + Send>>;
}

struct HandlerWrapper<H: Handler> {
    handler: H,
    _marker: PhantomData<fn() -> H::Future>,
}

impl<H: Handler> ErasedHandler for HandlerWrapper<H> {
    #[inline(always)]
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Result<Flow, Error>> + Send>> {
        // handler.call() is monomorphized for the concrete H, so the body
        // can still be inlined behind the vtable hop.
        Box::pin(self.handler.call(ctx))
    }
}

/// Create a type-erased handler from any async function or closure.
#[inline]
pub fn handler<H, Args>(h: H) -> BoxedHandler
where
    H: IntoHandler<Args>,
{
    BoxedHandler::new(h.into_handler())
}
