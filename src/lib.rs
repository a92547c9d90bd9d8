//! Personality quiz: a fixed battery of Likert questions, one language-model
//! call to classify the answers into one of sixteen types, and a shareable
//! results link carrying the whole profile.

pub mod config;
pub mod quiz;
