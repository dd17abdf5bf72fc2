pub mod election;
pub mod region;
pub mod tally;
