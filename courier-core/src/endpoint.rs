//! Endpoints: pure build/decode pairs.
//!
//! An [`Endpoint`] describes how to turn a typed input into a wire request and
//! how to turn the wire response back into a typed output. Endpoints hold no
//! mutable state; everything they need arrives through [`BuildContext`] and
//! [`DecodeContext`].
//!
//! Transforms can be chained onto an endpoint with [`EndpointExt`]:
//!
//! ```ignore
//! let endpoint = GetUser
//!     .map_request(|mut request| {
//!         request.headers.push(("x-trace".into(), "1".into()));
//!         Ok(request)
//!     })
//!     .map_output(|user| Ok(user.name));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, EndpointError};
use crate::interface::{Interface, RequestOf, ResponseOf};

/// Everything an endpoint may read while building a request.
pub struct BuildContext<'a, R, O> {
    /// The interface the request is built for.
    pub root: &'a R,
    /// Caller-supplied (or defaulted) options.
    pub options: &'a O,
}

impl<R, O> Clone for BuildContext<'_, R, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, O> Copy for BuildContext<'_, R, O> {}

/// Everything an endpoint may read while decoding a response.
pub struct DecodeContext<'a, R: Interface, I, O> {
    /// The interface the request was built for.
    pub root: &'a R,
    /// The input the request was built from.
    pub input: &'a I,
    /// Options used to build the request.
    pub options: &'a O,
    /// The request that produced the response being decoded.
    pub request: &'a R::Request,
}

impl<R: Interface, I, O> Clone for DecodeContext<'_, R, I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Interface, I, O> Copy for DecodeContext<'_, R, I, O> {}

/// A typed description of one remote operation.
pub trait Endpoint: Send + Sync + 'static {
    /// Interface this endpoint belongs to.
    type Root: Interface;
    /// Caller-supplied input.
    type Input: Send + Sync + 'static;
    /// Decoded output.
    type Output: Send + 'static;
    /// Per-call options.
    type Options: Clone + Default + Send + Sync + 'static;

    /// Options used when the caller supplies none.
    fn default_options(&self) -> Self::Options {
        Self::Options::default()
    }

    /// Builds the wire request for `input`.
    fn build(
        &self,
        input: &Self::Input,
        context: BuildContext<'_, Self::Root, Self::Options>,
    ) -> Result<RequestOf<Self::Root>, BoxError>;

    /// Decodes the wire response into the output type.
    ///
    /// Returning the interface's native request error (boxed) marks the
    /// failure as a bad request rather than a runtime error.
    fn decode(
        &self,
        response: ResponseOf<Self::Root>,
        context: DecodeContext<'_, Self::Root, Self::Input, Self::Options>,
    ) -> Result<Self::Output, BoxError>;
}

impl<E: Endpoint + ?Sized> Endpoint for Arc<E> {
    type Root = E::Root;
    type Input = E::Input;
    type Output = E::Output;
    type Options = E::Options;

    fn default_options(&self) -> Self::Options {
        (**self).default_options()
    }

    fn build(
        &self,
        input: &Self::Input,
        context: BuildContext<'_, Self::Root, Self::Options>,
    ) -> Result<RequestOf<Self::Root>, BoxError> {
        (**self).build(input, context)
    }

    fn decode(
        &self,
        response: ResponseOf<Self::Root>,
        context: DecodeContext<'_, Self::Root, Self::Input, Self::Options>,
    ) -> Result<Self::Output, BoxError> {
        (**self).decode(response, context)
    }
}

/// Type-erased endpoint.
pub type BoxEndpoint<R, I, O, Opt = ()> =
    Arc<dyn Endpoint<Root = R, Input = I, Output = O, Options = Opt>>;

/// Combinators available on every endpoint.
pub trait EndpointExt: Endpoint + Sized {
    /// Runs `transform` on every request after [`Endpoint::build`].
    fn map_request<F>(self, transform: F) -> MapRequest<Self, F>
    where
        F: Fn(RequestOf<Self::Root>) -> Result<RequestOf<Self::Root>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        MapRequest {
            inner: self,
            transform,
        }
    }

    /// Runs `transform` on every output after [`Endpoint::decode`].
    fn map_output<F, T>(self, transform: F) -> MapOutput<Self, F, T>
    where
        F: Fn(Self::Output) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Send + 'static,
    {
        MapOutput {
            inner: self,
            transform,
            _output: PhantomData,
        }
    }

    /// Erases the concrete endpoint type.
    fn boxed(self) -> BoxEndpoint<Self::Root, Self::Input, Self::Output, Self::Options> {
        Arc::new(self)
    }
}

impl<E: Endpoint> EndpointExt for E {}

/// Endpoint with a request transform appended. See [`EndpointExt::map_request`].
pub struct MapRequest<E, F> {
    inner: E,
    transform: F,
}

impl<E, F> Endpoint for MapRequest<E, F>
where
    E: Endpoint,
    F: Fn(RequestOf<E::Root>) -> Result<RequestOf<E::Root>, BoxError> + Send + Sync + 'static,
{
    type Root = E::Root;
    type Input = E::Input;
    type Output = E::Output;
    type Options = E::Options;

    fn default_options(&self) -> Self::Options {
        self.inner.default_options()
    }

    fn build(
        &self,
        input: &Self::Input,
        context: BuildContext<'_, Self::Root, Self::Options>,
    ) -> Result<RequestOf<Self::Root>, BoxError> {
        let request = self.inner.build(input, context)?;
        (self.transform)(request)
    }

    fn decode(
        &self,
        response: ResponseOf<Self::Root>,
        context: DecodeContext<'_, Self::Root, Self::Input, Self::Options>,
    ) -> Result<Self::Output, BoxError> {
        self.inner.decode(response, context)
    }
}

/// Endpoint with an output transform appended. See [`EndpointExt::map_output`].
pub struct MapOutput<E, F, T> {
    inner: E,
    transform: F,
    _output: PhantomData<fn() -> T>,
}

impl<E, F, T> Endpoint for MapOutput<E, F, T>
where
    E: Endpoint,
    F: Fn(E::Output) -> Result<T, BoxError> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Root = E::Root;
    type Input = E::Input;
    type Output = T;
    type Options = E::Options;

    fn default_options(&self) -> Self::Options {
        self.inner.default_options()
    }

    fn build(
        &self,
        input: &Self::Input,
        context: BuildContext<'_, Self::Root, Self::Options>,
    ) -> Result<RequestOf<Self::Root>, BoxError> {
        self.inner.build(input, context)
    }

    fn decode(
        &self,
        response: ResponseOf<Self::Root>,
        context: DecodeContext<'_, Self::Root, Self::Input, Self::Options>,
    ) -> Result<Self::Output, BoxError> {
        let output = self.inner.decode(response, context)?;
        (self.transform)(output)
    }
}

type BuildFn<R, I, O> =
    dyn Fn(&I, BuildContext<'_, R, O>) -> Result<RequestOf<R>, BoxError> + Send + Sync;
type DecodeFn<R, I, O, Out> =
    dyn Fn(ResponseOf<R>, DecodeContext<'_, R, I, O>) -> Result<Out, BoxError> + Send + Sync;

/// Endpoint assembled from a build closure and a decode closure.
///
/// ```ignore
/// let endpoint = FnEndpoint::<Api, u64, String>::new(
///     |id, _ctx| Ok(Api::get(format!("/users/{id}"))),
///     |response, _ctx| Ok(response.text()?),
/// );
/// ```
pub struct FnEndpoint<R: Interface, I, Out, O = ()> {
    build: Arc<BuildFn<R, I, O>>,
    decode: Arc<DecodeFn<R, I, O, Out>>,
}

impl<R: Interface, I, Out, O> Clone for FnEndpoint<R, I, Out, O> {
    fn clone(&self) -> Self {
        Self {
            build: self.build.clone(),
            decode: self.decode.clone(),
        }
    }
}

impl<R: Interface, I, Out, O> fmt::Debug for FnEndpoint<R, I, Out, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint")
            .field("input", &std::any::type_name::<I>())
            .field("output", &std::any::type_name::<Out>())
            .finish()
    }
}

impl<R: Interface, I, Out, O> FnEndpoint<R, I, Out, O> {
    /// Creates an endpoint from its two halves.
    pub fn new<B, D>(build: B, decode: D) -> Self
    where
        B: Fn(&I, BuildContext<'_, R, O>) -> Result<RequestOf<R>, BoxError> + Send + Sync + 'static,
        D: Fn(ResponseOf<R>, DecodeContext<'_, R, I, O>) -> Result<Out, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            build: Arc::new(build),
            decode: Arc::new(decode),
        }
    }
}

impl<R, I, Out, O> Endpoint for FnEndpoint<R, I, Out, O>
where
    R: Interface,
    I: Send + Sync + 'static,
    Out: Send + 'static,
    O: Clone + Default + Send + Sync + 'static,
{
    type Root = R;
    type Input = I;
    type Output = Out;
    type Options = O;

    fn build(
        &self,
        input: &Self::Input,
        context: BuildContext<'_, Self::Root, Self::Options>,
    ) -> Result<RequestOf<Self::Root>, BoxError> {
        (self.build)(input, context)
    }

    fn decode(
        &self,
        response: ResponseOf<Self::Root>,
        context: DecodeContext<'_, Self::Root, Self::Input, Self::Options>,
    ) -> Result<Self::Output, BoxError> {
        (self.decode)(response, context)
    }
}

/// Endpoint that can never be called.
///
/// Used where an interface must name an endpoint it does not support.
/// Both halves fail with [`EndpointError::Unavailable`].
pub struct NeverEndpoint<R, I = (), Out = (), O = ()> {
    name: &'static str,
    _marker: PhantomData<fn() -> (R, I, Out, O)>,
}

impl<R, I, Out, O> NeverEndpoint<R, I, Out, O> {
    /// Creates a placeholder endpoint labelled `name` in error messages.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<R, I, Out, O> fmt::Debug for NeverEndpoint<R, I, Out, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NeverEndpoint").field(&self.name).finish()
    }
}

impl<R, I, Out, O> Endpoint for NeverEndpoint<R, I, Out, O>
where
    R: Interface,
    I: Send + Sync + 'static,
    Out: Send + 'static,
    O: Clone + Default + Send + Sync + 'static,
{
    type Root = R;
    type Input = I;
    type Output = Out;
    type Options = O;

    fn build(
        &self,
        _input: &Self::Input,
        _context: BuildContext<'_, Self::Root, Self::Options>,
    ) -> Result<RequestOf<Self::Root>, BoxError> {
        Err(Box::new(EndpointError::Unavailable(self.name)))
    }

    fn decode(
        &self,
        _response: ResponseOf<Self::Root>,
        _context: DecodeContext<'_, Self::Root, Self::Input, Self::Options>,
    ) -> Result<Self::Output, BoxError> {
        Err(Box::new(EndpointError::Unavailable(self.name)))
    }
}
