//! Rigger Cloud
//!
//! Thin REST adapters exposed to actors as capabilities:
//! - [`transport`] - the `HttpTransport` seam (reqwest in production,
//!   stubs in tests)
//! - [`rest`] - JSON verbs, status classification, location-follow
//! - [`scaler`] - server-array service operations
//! - [`uptime`] - check-monitoring service operations
//!
//! Adapters model conceptual operations (find, clone, launch, pause),
//! not any particular vendor's wire format.

pub mod error;
pub mod params;
pub mod rest;
pub mod scaler;
pub mod transport;
pub mod uptime;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{CloudError, RestError};
pub use rest::RestClient;
pub use scaler::{ArrayRef, InstanceRef, ScalerClient, TaskRef};
pub use transport::{HttpMethod, HttpTransport, ReqwestTransport, RestRequest, RestResponse};
pub use uptime::{CheckRef, UptimeClient};
