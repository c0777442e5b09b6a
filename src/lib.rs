//! Raincast is an offline trainer that sweeps dense-optical-flow parameter
//! sets over sequences of radar precipitation images.
//!
//! Each candidate parameter set is applied to consecutive image pairs to
//! extrapolate the next frame, the prediction is scored against the real
//! follow-on image with a structural-similarity metric, and one row per
//! (parameter set, image triple) is persisted for later analysis. Channel
//! evaluation inside a trial runs in parallel via the `rayon` feature; the
//! outer sweep is strictly sequential.

pub mod corpus;
pub mod flow;
pub mod pipeline;
pub mod plane;
pub mod score;
pub mod sweep;
mod trace;
pub mod trial;
pub mod util;

#[cfg(feature = "image-io")]
pub mod io;

pub use corpus::{Corpus, CorpusEntry};
pub use flow::{
    AlgorithmGenerator, AlgorithmRegistry, FarnebackFlow, FlowAlgorithm, FlowField,
    PersistenceFlow,
};
pub use pipeline::ChannelPipeline;
pub use plane::{Plane, RasterImage};
pub use score::{FitnessScore, FitnessScorer, SsimScorer};
pub use sweep::{ParameterAxis, ParameterGenerator, ParameterSet, ParameterSpace};
pub use trial::{ResultSink, SweepOutcome, SweepReport, TrialLoop, TrialRecord};
pub use util::{RaincastError, RaincastResult};
