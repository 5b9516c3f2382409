mod envelope;
mod messages;
mod request;

mod wire {
    include!(concat!(env!("OUT_DIR"), "/helper.rs"));
}

pub use envelope::{ResultEnvelope, ResultStatus};
pub use messages::{
    PairRequest, PairResponse, RetrieveRequest, RetrieveResponse,
    StoreRequest, StoreResponse, UnpairRequest, UnpairResponse,
    VerifyRequest, VerifyResponse,
};
pub use request::{Request, Response};
