pub mod error;
pub mod negotiation;
pub mod pipeline;
pub mod request_transcoder;
pub mod resolver;
pub mod response_transcoder;

pub use error::{ProxyError, Stage, TranscodeError};
pub use negotiation::{MediaType, NegotiationDirective};
pub use pipeline::{Negotiated, TranscodePipeline};
