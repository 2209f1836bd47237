//! Request core for the InvoiceXpress invoicing API.
//!
//! # Overview
//! Turns an `entity.action` method token, an optional resource id and a set
//! of arguments into a concrete HTTP request, executes it through a
//! `Transport`, and classifies the response into a `RequestOutcome`.
//!
//! # Design
//! - `dispatch` maps method tokens to `RequestPlan`s through static rule
//!   tables; resolution is pure.
//! - `InvoiceXpressClient` keeps the I/O boundary explicit: requests and
//!   responses are plain data, and only `send` talks to the transport.
//! - Credentials are an explicit value held by the client, not global state.
//! - Expected failures (transport, HTML pages, API errors, bad statuses) are
//!   returned as data; `ApiError` covers only problems found before I/O.

pub mod args;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod outcome;

pub use args::Arguments;
pub use client::InvoiceXpressClient;
pub use config::Credentials;
pub use dispatch::{Action, Entity, MethodToken, RequestPlan};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use outcome::{FailureKind, RequestOutcome};
