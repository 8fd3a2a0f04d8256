use async_trait::async_trait;
use berrybox_core::format_iso_duration;
use log::{debug, warn};
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

use crate::util::{URL_SCHEME_REGEX, YOUTUBE_ID_REGEX};

use super::{ResolveError, ResolvedVideo, VideoResolver};

const YT_UNAVAILABLE: &str = "Video unavailable. This video is not available";
const YT_NOT_FOUND: &str = "Video unavailable";
const YT_ID_ERROR: &str = "Incomplete YouTube ID";
const YT_EMBED_DISABLED: &str = "Playback on other websites has been disabled";

/// Resolves YouTube videos with yt-dlp.
#[derive(Debug, Clone)]
pub struct YouTubeResolver {
    program: String,
}

#[derive(Debug, Deserialize)]
struct FlatYouTubeVideo {
    id: String,
    title: String,
    duration: Option<f32>,
    playable_in_embed: Option<bool>,
}

impl YouTubeResolver {
    pub fn new() -> Self {
        Self {
            program: "yt-dlp".to_string(),
        }
    }

    /// Uses a different yt-dlp executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the video id in a YouTube link, or the link itself if it is a bare id.
    pub fn video_id(link: &str) -> Option<String> {
        let link = link.trim();

        if YOUTUBE_ID_REGEX.is_match(link) {
            return Some(link.to_string());
        }

        let link = URL_SCHEME_REGEX.replace(link, "https://");
        let url = Url::parse(&link).ok()?;
        let host = url.host_str()?;

        let id = if host.ends_with("youtube.com") || host.ends_with("youtube-nocookie.com") {
            if url.path().starts_with("/watch") {
                url.query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())
            } else {
                let mut segments = url.path_segments()?;

                match segments.next() {
                    Some("v" | "embed" | "shorts" | "live") => segments.next().map(str::to_string),
                    _ => None,
                }
            }
        } else if host == "youtu.be" {
            url.path_segments()?.next().map(str::to_string)
        } else {
            None
        };

        id.filter(|id| YOUTUBE_ID_REGEX.is_match(id))
    }

    async fn fetch(&self, id: &str) -> Result<FlatYouTubeVideo, ResolveError> {
        let url = format!("https://www.youtube.com/watch?v={}", id);

        let child = Command::new(&self.program)
            // Only metadata is needed
            .arg("--skip-download")
            .arg("--no-playlist")
            // Get a JSON output, in a single line.
            .arg("-J")
            .args(["--", url.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ResolveError::Other(e.to_string()))?;

        // Both pipes are drained together, a full stderr cannot stall stdout
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ResolveError::FetchError(e.to_string()))?;

        if !output.status.success() {
            return Err(classify_error(&String::from_utf8_lossy(&output.stderr)));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| ResolveError::ParseError(e.to_string()))
    }
}

impl Default for YouTubeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoResolver for YouTubeResolver {
    fn identify(&self, link: &str) -> Result<String, ResolveError> {
        Self::video_id(link).ok_or(ResolveError::NoMatch)
    }

    async fn resolve(&self, id: &str) -> Result<ResolvedVideo, ResolveError> {
        debug!("Fetching YouTube video {}", id);

        let video = self.fetch(id).await?;

        if video.playable_in_embed == Some(false) {
            return Err(ResolveError::NotEmbeddable);
        }

        let duration = video.duration.unwrap_or_else(|| {
            warn!("YouTube video {} has no duration", video.id);
            0.
        });

        Ok(ResolvedVideo {
            link: video.id,
            name: video.title,
            duration: format_iso_duration(duration),
        })
    }
}

fn classify_error(error_output: &str) -> ResolveError {
    if error_output.contains(YT_UNAVAILABLE) || error_output.contains(YT_EMBED_DISABLED) {
        return ResolveError::NotEmbeddable;
    }

    if error_output.contains(YT_NOT_FOUND) || error_output.contains(YT_ID_ERROR) {
        return ResolveError::NotFound;
    }

    ResolveError::Other(error_output.trim().to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_video_ids() {
        let id = Some("z09GolEktUw".to_string());

        assert_eq!(
            YouTubeResolver::video_id(
                "https://www.youtube.com/watch?v=JwRWf3ho4B8&list=PL23A657E4BD523733&index=45"
            ),
            Some("JwRWf3ho4B8".to_string())
        );
        assert_eq!(
            YouTubeResolver::video_id("www.youtube.com/watch?v=z09GolEktUw&feature=youtu.be"),
            id
        );
        assert_eq!(
            YouTubeResolver::video_id("https://music.youtube.com/watch?v=-t-75CCdM2o"),
            Some("-t-75CCdM2o".to_string())
        );
        assert_eq!(
            YouTubeResolver::video_id("https://youtube.com/v/z09GolEktUw"),
            id
        );
        assert_eq!(
            YouTubeResolver::video_id("https://www.youtube.com/embed/z09GolEktUw"),
            id
        );
        assert_eq!(YouTubeResolver::video_id("youtu.be/z09GolEktUw"), id);
        assert_eq!(YouTubeResolver::video_id("z09GolEktUw"), id);

        assert_eq!(YouTubeResolver::video_id("https://www.youtube.com/"), None);
        assert_eq!(
            YouTubeResolver::video_id("https://www.youtube.com/@Ayrun"),
            None
        );
        assert_eq!(
            YouTubeResolver::video_id(
                "https://music.youtube.com/playlist?list=OLAK5uy_kKEZSgdsNQxjhnQNwMy63GMNV_ZoTqI0w"
            ),
            None
        );
        assert_eq!(YouTubeResolver::video_id("https://vimeo.com/76979871"), None);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            classify_error("ERROR: [youtube] abc: Video unavailable"),
            ResolveError::NotFound
        );
        assert_eq!(
            classify_error("ERROR: Video unavailable. This video is not available in your country"),
            ResolveError::NotEmbeddable
        );
        assert!(matches!(
            classify_error("ERROR: Unable to download webpage"),
            ResolveError::Other(_)
        ));
    }

    /// Writes an executable script standing in for yt-dlp
    #[cfg(unix)]
    fn fake_program(name: &str, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join(format!("{}-{}", name, std::process::id()));
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_verbose_failure_is_classified() {
        // More than a pipe buffer of warnings before the actual error
        let program = fake_program(
            "berrybox-verbose-yt-dlp",
            "#!/bin/sh\n\
             head -c 300000 /dev/zero | tr '\\0' 'w' >&2\n\
             echo 'ERROR: [youtube] abc: Video unavailable' >&2\n\
             exit 1\n",
        );
        let resolver = YouTubeResolver::with_program(&program);

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            resolver.resolve("dQw4w9WgXcQ"),
        )
        .await
        .expect("yt-dlp output is drained");

        std::fs::remove_file(&program).ok();
        assert_eq!(result, Err(ResolveError::NotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolves_metadata() {
        let program = fake_program(
            "berrybox-json-yt-dlp",
            "#!/bin/sh\n\
             echo '{\"id\":\"dQw4w9WgXcQ\",\"title\":\"Never Gonna Give You Up\",\"duration\":213.0}'\n",
        );
        let resolver = YouTubeResolver::with_program(&program);

        let video = resolver.resolve("dQw4w9WgXcQ").await;
        std::fs::remove_file(&program).ok();

        let video = video.unwrap();
        assert_eq!(video.name, "Never Gonna Give You Up");
        assert_eq!(video.duration, "PT3M33S");
    }
}
