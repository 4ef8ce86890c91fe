//! Test support: recording mock collaborators.

mod mocks;

pub use mocks::{
    MockGraphBuilder, MockInferenceRunner, MockParser, MockRetriever, MockSynthesizer,
};
