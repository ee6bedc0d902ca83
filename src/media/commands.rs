use std::path::{Path, PathBuf};

use super::Dimensions;

/// One ffmpeg or ffprobe invocation, labelled for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Command with no arguments yet
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Append one argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// `-i <path>`
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(positional(path.as_ref()))
    }

    /// Output path, always the last argument
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(positional(path.as_ref()))
    }

    /// `-y`: replace an existing output file
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Repeat the next input forever (turns a still image into a video source)
    pub fn loop_input(self) -> Self {
        self.arg("-loop").arg("1")
    }

    /// `-c:v <codec>`
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// `-c:a <codec>`
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// `-pix_fmt <format>`
    pub fn pixel_format<S: Into<String>>(self, format: S) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// `-r <fps>`
    pub fn frame_rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    /// `-vf <filtergraph>`
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Limit output duration in seconds
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(seconds.to_string())
    }

    /// Stop encoding when the shortest input ends
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    /// Command line as a single string, for logs
    pub fn command_line(&self) -> String {
        let mut line = self.binary_path.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Path as a command-line operand. A relative path starting with `-` would be
/// read as an option, so it is anchored to the current directory.
fn positional(path: &Path) -> String {
    let text = path.to_string_lossy();
    if path.is_relative() && text.starts_with('-') {
        PathBuf::from(".").join(path).to_string_lossy().to_string()
    } else {
        text.to_string()
    }
}

/// Parameters of a still-image video encode
#[derive(Debug, Clone)]
pub struct StillVideoParams<'a> {
    pub image_path: &'a Path,
    pub audio_path: &'a Path,
    pub output_path: &'a Path,
    pub video_codec: &'a str,
    pub audio_codec: &'a str,
    pub pixel_format: &'a str,
    pub frame_rate: u32,
    pub dimensions: Dimensions,
    pub duration: f64,
}

/// Builder for the ffmpeg and ffprobe invocations this crate needs
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build the image + audio to video command.
    ///
    /// A looped image never ends by itself, so output length is bounded by both
    /// `-t` (the audio duration) and `-shortest`.
    pub fn still_video(&self, params: &StillVideoParams<'_>) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Still image video encoding")
            .overwrite()
            .loop_input()
            .input(params.image_path)
            .input(params.audio_path)
            .video_codec(params.video_codec)
            .audio_codec(params.audio_codec)
            .pixel_format(params.pixel_format)
            .frame_rate(params.frame_rate)
            .video_filter(format!(
                "scale={}:{}",
                params.dimensions.width, params.dimensions.height
            ))
            .duration(params.duration)
            .shortest()
            .output(params.output_path)
    }

    /// Build ffprobe command reporting container format and streams as JSON
    pub fn probe_format_and_streams<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Format probe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .output(path)
    }

    /// Build ffprobe command reporting streams only as JSON
    pub fn probe_streams<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Stream probe")
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .output(path)
    }

    /// `ffmpeg -version`
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check").arg("-version")
    }

    /// `ffprobe -version`
    pub fn probe_version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Probe version check").arg("-version")
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.ffprobe_path
    }
}
