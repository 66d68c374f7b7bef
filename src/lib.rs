//! Transparent credential rotation for outbound HTTP calls.
//!
//! When an upstream API answers `429 Too Many Requests`, the layer figures out which environment
//! variable supplied the failing credential, asks a local rotation service for a replacement, and
//! replays the request once with the new key. Call sites stay untouched: wrap a transport with
//! [`RotationLayer::install_transport`](intercept::RotationLayer::install_transport) or attach the
//! middleware to a `reqwest-middleware` client with
//! [`RotationLayer::install_middleware`](intercept::RotationLayer::install_middleware).
//!
//! Every failure inside the layer fails open: the caller receives exactly the response it would
//! have received without rotation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod env;
pub mod error;
pub mod http;
pub mod intercept;
pub mod obs;
pub mod rotation;
pub mod secret;
pub mod tracker;

pub use config::RotationConfig;
pub use intercept::RotationLayer;

mod _prelude {
	pub use std::{
		collections::{HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::{
			Arc,
			atomic::{AtomicBool, AtomicU64, Ordering},
		},
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
#[cfg(feature = "middleware")] pub use reqwest_middleware;
pub use url;
#[cfg(test)] use {color_eyre as _, futures as _, httpmock as _};
