pub mod collection;
pub mod parsing;
pub mod replay;
pub mod sampler;
