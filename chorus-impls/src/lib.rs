mod resolvers;

pub use resolvers::*;
