//! Stillframe - still image + audio track to MP4
//!
//! Combines an image and an audio file into a single video with ffmpeg,
//! looping the image for the length of the audio. Inputs may be local files
//! or URLs; stale inputs and outputs are removed by a periodic cleanup.

pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod janitor;
pub mod media;
pub mod workflow;
