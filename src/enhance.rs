//! Post-download upscaling through ffmpeg.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::error::{Error, Result};

const TOOL: &str = "ffmpeg";

/// Rewrites a downloaded video in place.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, video: &Path) -> Result<()>;
}

/// Scales to a fixed frame size and re-encodes as H.264/AAC.
pub struct FfmpegEnhancer {
    bin: PathBuf,
    width: u32,
    height: u32,
}

impl FfmpegEnhancer {
    pub fn new(bin: impl Into<PathBuf>, (width, height): (u32, u32)) -> Self {
        Self {
            bin: bin.into(),
            width,
            height,
        }
    }

    fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        args.push("-i".into());
        args.push(input.into());
        args.push("-vf".into());
        args.push(format!("scale={}:{}", self.width, self.height).into());
        args.extend(["-c:v", "libx264", "-c:a", "aac"].map(OsString::from));
        args.push(output.into());
        args
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        debug!(input = %input.display(), output = %output.display(), "running ffmpeg");
        let result = Command::new(&self.bin)
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => Error::ToolNotFound(TOOL),
                _ => Error::Spawn { tool: TOOL, source },
            })?;

        if result.status.success() {
            Ok(())
        } else {
            Err(Error::ToolFailed {
                tool: TOOL,
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl Enhancer for FfmpegEnhancer {
    async fn enhance(&self, video: &Path) -> Result<()> {
        if !fs::try_exists(video).await? {
            return Err(Error::MissingFile(video.to_path_buf()));
        }

        let output = enhanced_path(video);
        let replaced: Result<()> = async {
            self.transcode(video, &output).await?;
            fs::rename(&output, video).await?;
            Ok(())
        }
        .await;

        if replaced.is_err() {
            let _ = fs::remove_file(&output).await;
        }
        replaced
    }
}

/// `<dir>/<stem>_enhanced.mp4` next to `video`.
pub fn enhanced_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{stem}_enhanced.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhanced_file_sits_next_to_original() {
        assert_eq!(
            enhanced_path(Path::new("/videos/Lecture 1.mp4")),
            PathBuf::from("/videos/Lecture 1_enhanced.mp4")
        );
    }

    #[test]
    fn ffmpeg_scales_and_reencodes() {
        let enhancer = FfmpegEnhancer::new("ffmpeg", (1920, 1080));
        let args = enhancer.args(Path::new("in.mp4"), Path::new("out.mp4"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-y", "-loglevel", "error", "-i", "in.mp4", "-vf", "scale=1920:1080", "-c:v",
                "libx264", "-c:a", "aac", "out.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let enhancer = FfmpegEnhancer::new("ffmpeg", (1920, 1080));
        let err = enhancer.enhance(&dir.path().join("gone.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::MissingFile(_)));
    }

    /// Shell script standing in for ffmpeg: writes "upscaled" to its last argument.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        const SCRIPT: &str = concat!(
            "#!/bin/sh\n",
            "for arg in \"$@\"; do out=\"$arg\"; done\n",
            "printf upscaled > \"$out\"\n",
        );

        let bin = dir.join("fake-ffmpeg");
        std::fs::write(&bin, SCRIPT).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        bin
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_transcode_replaces_original() {
        let tools = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"original bytes").unwrap();

        let enhancer = FfmpegEnhancer::new(fake_ffmpeg(tools.path()), (1920, 1080));
        enhancer.enhance(&video).await.unwrap();

        assert_eq!(std::fs::read(&video).unwrap(), b"upscaled");
        assert!(!enhanced_path(&video).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_replace_removes_enhanced_output() {
        let tools = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        let video = dir.path().join("clip.mp4");
        std::fs::create_dir(&video).unwrap();
        std::fs::write(video.join("keep"), b"x").unwrap();

        let enhancer = FfmpegEnhancer::new(fake_ffmpeg(tools.path()), (1920, 1080));
        let err = enhancer.enhance(&video).await.unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!enhanced_path(&video).exists());
        assert!(video.join("keep").exists());
    }

    #[tokio::test]
    async fn failed_transcode_leaves_original_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"original bytes").unwrap();

        let enhancer = FfmpegEnhancer::new(dir.path().join("no-ffmpeg-here"), (1920, 1080));
        let err = enhancer.enhance(&video).await.unwrap_err();

        assert!(matches!(err, Error::ToolNotFound("ffmpeg")));
        assert_eq!(std::fs::read(&video).unwrap(), b"original bytes");
        assert!(!enhanced_path(&video).exists());
    }
}
