//! `/worker-data`: relays requests to the existing data worker and wraps its JSON reply.

mod app;
mod envelope;
mod error;
mod handlers;
mod upstream;

pub use app::App;
pub use envelope::{Envelope, EnvelopeStatus};
pub use error::RelayError;
pub use handlers::{relay, worker_data, Relayed};
pub use upstream::{
    codes_param, encode_uri_component, prepare_upstream_request, upstream_uri, CODES_PARAM,
    UPSTREAM_BASE_URL,
};
