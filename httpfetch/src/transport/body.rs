//! Response body type shared by transports and middleware.
//!
//! This module provides [`ResponseBody`], the body of every [`Response`]
//! flowing through the middleware chain. Dropping it releases the underlying
//! connection.
//!
//! [`Response`]: crate::Response

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Incoming;
use pin_project_lite::pin_project;

use crate::ClientError;

pin_project! {
    /// A response body.
    ///
    /// This type can represent:
    /// - Empty bodies
    /// - Full bodies (mocks, replayed responses)
    /// - Bodies streamed from a hyper connection
    /// - Any other body with `Bytes` frames and [`ClientError`] errors
    #[project = ResponseBodyProj]
    pub enum ResponseBody {
        /// Empty response body.
        Empty,
        /// Full response body with all data available.
        Full {
            data: Option<Bytes>,
        },
        /// Body read from a hyper connection.
        Incoming {
            #[pin]
            body: Incoming,
        },
        /// Any other body.
        Boxed {
            #[pin]
            body: UnsyncBoxBody<Bytes, ClientError>,
        },
    }
}

impl ResponseBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        ResponseBody::Empty
    }

    /// Create a body with the given data.
    pub fn full(data: impl Into<Bytes>) -> Self {
        ResponseBody::Full {
            data: Some(data.into()),
        }
    }

    /// Wrap an arbitrary body.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes, Error = ClientError> + Send + 'static,
    {
        ResponseBody::Boxed {
            body: body.boxed_unsync(),
        }
    }
}

impl From<Incoming> for ResponseBody {
    fn from(body: Incoming) -> Self {
        ResponseBody::Incoming { body }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            ResponseBodyProj::Empty => Poll::Ready(None),
            ResponseBodyProj::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            ResponseBodyProj::Incoming { body } => body
                .poll_frame(cx)
                .map(|frame| frame.map(|result| result.map_err(ClientError::transport))),
            ResponseBodyProj::Boxed { body } => body.poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            ResponseBody::Empty => true,
            ResponseBody::Full { data } => data.is_none(),
            ResponseBody::Incoming { body } => body.is_end_stream(),
            ResponseBody::Boxed { body } => body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            ResponseBody::Empty => SizeHint::with_exact(0),
            ResponseBody::Full { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            ResponseBody::Incoming { body } => body.size_hint(),
            ResponseBody::Boxed { body } => body.size_hint(),
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::Empty
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Empty => write!(f, "ResponseBody::Empty"),
            ResponseBody::Full { data } => f
                .debug_struct("ResponseBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
            ResponseBody::Incoming { .. } => write!(f, "ResponseBody::Incoming"),
            ResponseBody::Boxed { .. } => write!(f, "ResponseBody::Boxed"),
        }
    }
}
