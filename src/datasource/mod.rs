// Release lookup layer
// - types.rs: LookupRequest, RawResponse, Release, ReleaseResult
// - error.rs: TransportError, RegistryError, LookupError
// - transport.rs: HttpTransport trait + reqwest implementation
// - normalize.rs: status classification and body normalization
// - registry.rs: Registry trait definition
// - registries/: Registry implementations
//   - devbox.rs: Devbox package search API

pub mod error;
pub mod normalize;
pub mod registries;
pub mod registry;
pub mod transport;
pub mod types;

pub use error::{LookupError, RegistryError, TransportError};
pub use registry::Registry;
pub use types::{LookupRequest, RawResponse, Release, ReleaseResult, ResponseBody};
