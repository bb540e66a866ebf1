pub mod bangs;
pub mod instant;
pub mod knowledge;
pub mod suggest;
