pub mod completion;
pub mod dump;
pub mod run;
