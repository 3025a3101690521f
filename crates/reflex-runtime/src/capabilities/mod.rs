//! Collaborator contracts the engine depends on.
//!
//! The engine never talks to a model or an index directly; it only knows
//! these six capabilities. Anything that satisfies the contracts can drive
//! a run, including the scripted fakes the engine tests use.

mod traits;

pub use traits::{
    CapabilityError, Generator, GroundednessGrader, QueryRewriter, RelevanceGrader, Retriever,
    UsefulnessGrader,
};
