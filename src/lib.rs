#![recursion_limit = "256"]

//! Character-level LSTM text generation on burn.
//!
//! `train` learns next-character prediction from a text file using
//! randomly packed batches with a continuation mask; `generate`
//! samples from the trained network with a temperature-scaled softmax
//! over a rolling context window.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
